use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant, SystemTime},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    cache::document::ParsedDocument,
    execution::path::{PathSegment, ResultPath},
    instrumentation::{
        context::when_completed,
        parameters::{ExecutionParameters, FieldParameters, ValidationParameters},
        state::InstrumentationState,
        ContextResult, Instrumentation,
    },
    response::{execution_result::ExecutionResult, graphql_error::GraphQLError, value::Value},
};

const TRACING_EXTENSION: &str = "tracing";
const TRACING_VERSION: i64 = 1;

#[derive(Clone, Copy, Debug)]
struct PhaseTiming {
    start_offset: Duration,
    duration: Duration,
}

#[derive(Clone, Debug)]
struct ResolverTiming {
    path: ResultPath,
    parent_type: String,
    field_name: String,
    return_type: String,
    timing: PhaseTiming,
}

#[derive(Debug, Default)]
struct Timings {
    parsing: Option<PhaseTiming>,
    validation: Option<PhaseTiming>,
    resolvers: Vec<ResolverTiming>,
}

/// Timings of one request, shared by the contexts of its phases.
#[derive(Clone, Debug)]
struct TracingRecorder {
    start_time: SystemTime,
    start: Instant,
    timings: Arc<Mutex<Timings>>,
}

impl TracingRecorder {
    fn new() -> Self {
        TracingRecorder {
            start_time: SystemTime::now(),
            start: Instant::now(),
            timings: Arc::new(Mutex::new(Timings::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Timings> {
        self.timings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_phase(&self) -> (Self, Instant) {
        (self.clone(), Instant::now())
    }

    fn timing(&self, started: Instant) -> PhaseTiming {
        PhaseTiming {
            start_offset: started.duration_since(self.start),
            duration: started.elapsed(),
        }
    }

    fn to_value(&self) -> Value {
        let timings = self.lock();
        let end_time = SystemTime::now();
        let mut tracing = vec![
            ("version".to_string(), Value::I64(TRACING_VERSION)),
            (
                "startTime".to_string(),
                Value::from(humantime::format_rfc3339_millis(self.start_time).to_string()),
            ),
            (
                "endTime".to_string(),
                Value::from(humantime::format_rfc3339_millis(end_time).to_string()),
            ),
            ("duration".to_string(), nanos(self.start.elapsed())),
        ];
        if let Some(parsing) = timings.parsing {
            tracing.push(("parsing".to_string(), phase_value(parsing)));
        }
        if let Some(validation) = timings.validation {
            tracing.push(("validation".to_string(), phase_value(validation)));
        }
        let resolvers = timings.resolvers.iter().map(resolver_value).collect();
        tracing.push((
            "execution".to_string(),
            Value::object([("resolvers", Value::Array(resolvers))]),
        ));
        Value::Object(tracing)
    }
}

fn nanos(duration: Duration) -> Value {
    Value::U64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
}

fn phase_value(timing: PhaseTiming) -> Value {
    Value::object([
        ("startOffset", nanos(timing.start_offset)),
        ("duration", nanos(timing.duration)),
    ])
}

fn resolver_value(resolver: &ResolverTiming) -> Value {
    let path = resolver
        .path
        .segments()
        .map(|segment| match segment {
            PathSegment::Key(key) => Value::from(key.as_str()),
            PathSegment::Index(index) => Value::U64(*index as u64),
        })
        .collect();
    Value::object([
        ("path", Value::Array(path)),
        ("parentType", Value::from(resolver.parent_type.as_str())),
        ("fieldName", Value::from(resolver.field_name.as_str())),
        ("returnType", Value::from(resolver.return_type.as_str())),
        ("startOffset", nanos(resolver.timing.start_offset)),
        ("duration", nanos(resolver.timing.duration)),
    ])
}

/// Records per phase and per field timings and reports them under
/// `extensions.tracing` in the Apollo tracing format.
#[derive(Default, Debug, Clone, Copy)]
pub struct TracingInstrumentation;

impl TracingInstrumentation {
    fn recorder(state: &InstrumentationState) -> Option<TracingRecorder> {
        state.get_cloned::<TracingRecorder>()
    }
}

#[async_trait]
impl Instrumentation for TracingInstrumentation {
    fn init_state(&self, state: &InstrumentationState) {
        state.insert(TracingRecorder::new());
    }

    fn begin_parse(
        &self,
        _params: &ExecutionParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<ParsedDocument> {
        let (recorder, started) = Self::recorder(state)?.start_phase();
        when_completed(move |_| {
            let timing = recorder.timing(started);
            recorder.lock().parsing = Some(timing);
        })
    }

    fn begin_validation(
        &self,
        _params: &ValidationParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<Vec<GraphQLError>> {
        let (recorder, started) = Self::recorder(state)?.start_phase();
        when_completed(move |_| {
            let timing = recorder.timing(started);
            recorder.lock().validation = Some(timing);
        })
    }

    fn begin_field_execution(
        &self,
        params: &FieldParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<Value> {
        let (recorder, started) = Self::recorder(state)?.start_phase();
        let step = params.step_info;
        let mut entry = ResolverTiming {
            path: step.path().clone(),
            parent_type: step.object_type_name().to_string(),
            field_name: step.field_name().to_string(),
            return_type: step.field_type().to_string(),
            timing: PhaseTiming {
                start_offset: Duration::ZERO,
                duration: Duration::ZERO,
            },
        };
        when_completed(move |_| {
            entry.timing = recorder.timing(started);
            recorder.lock().resolvers.push(entry);
        })
    }

    async fn instrument_execution_result(
        &self,
        result: ExecutionResult,
        state: &InstrumentationState,
    ) -> ExecutionResult {
        match Self::recorder(state) {
            Some(recorder) => {
                let tracing = recorder.to_value();
                debug!("attaching tracing extension");
                result.with_extension(TRACING_EXTENSION, tracing)
            }
            None => result,
        }
    }
}
