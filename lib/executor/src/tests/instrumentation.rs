use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{
    engine::GraphQLEngine,
    execution::error::FieldError,
    input::ExecutionInput,
    instrumentation::{
        context::when_completed,
        parameters::{ExecutionParameters, FieldParameters},
        ContextResult, Instrumentation, InstrumentationState, PhaseError, TracingInstrumentation,
    },
    response::{execution_result::ExecutionResult, value::Value},
    schema::{
        resolver::{async_resolver_fn, resolver_fn},
        Schema,
    },
    tests::{data_json, run},
};

type Events = Arc<Mutex<Vec<String>>>;

struct Recording {
    name: &'static str,
    events: Events,
}

impl Instrumentation for Recording {
    fn begin_execution(
        &self,
        _params: &ExecutionParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<ExecutionResult> {
        self.events.lock().unwrap().push(format!("{}:begin", self.name));
        let (name, events) = (self.name, self.events.clone());
        when_completed(move |_| events.lock().unwrap().push(format!("{name}:end")))
    }

    fn begin_field_execution(
        &self,
        params: &FieldParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<Value> {
        let field = params.step_info.field_name().to_string();
        let (name, events) = (self.name, self.events.clone());
        when_completed(move |result: Result<&Value, &PhaseError>| {
            let outcome = match result {
                Ok(_) => "done",
                Err(PhaseError::Abandoned) => "abandoned",
                Err(PhaseError::NullPropagated) => "nulled",
                Err(_) => "failed",
            };
            events
                .lock()
                .unwrap()
                .push(format!("{name}:{outcome}:{field}"));
        })
    }

    fn begin_field_fetch(
        &self,
        params: &FieldParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<Value> {
        let field = params.step_info.field_name().to_string();
        let (name, events) = (self.name, self.events.clone());
        when_completed(move |_| events.lock().unwrap().push(format!("{name}:fetched:{field}")))
    }
}

fn hello_schema() -> Schema {
    Schema::builder("type Query { hello: String }")
        .unwrap()
        .resolver("Query", "hello", resolver_fn(|_| Ok(Value::from("world"))))
        .unwrap()
        .build()
}

#[tokio::test]
async fn tracing_records_one_entry_per_field_execution() {
    let engine = GraphQLEngine::builder(hello_schema())
        .instrumentation(Arc::new(TracingInstrumentation))
        .build();

    let result = run(&engine, "{ hello alias: hello alias2: hello }").await;

    assert!(result.errors.is_empty());
    assert_eq!(
        data_json(&result),
        r#"{"hello":"world","alias":"world","alias2":"world"}"#
    );
    let resolvers = result
        .extensions
        .as_ref()
        .and_then(|extensions| extensions.get("tracing"))
        .and_then(|tracing| tracing.get("execution"))
        .and_then(|execution| execution.get("resolvers"))
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(resolvers.len(), 3);
    let mut paths: Vec<_> = resolvers
        .iter()
        .map(|resolver| resolver.get("path").unwrap().to_string())
        .collect();
    paths.sort();
    assert_eq!(paths, vec![r#"["alias"]"#, r#"["alias2"]"#, r#"["hello"]"#]);
    assert!(resolvers
        .iter()
        .all(|resolver| resolver.get("fieldName") == Some(&Value::from("hello"))));
}

#[tokio::test]
async fn chained_contexts_complete_in_reverse_order() {
    let events = Events::default();
    let engine = GraphQLEngine::builder(hello_schema())
        .instrumentation(Arc::new(Recording {
            name: "outer",
            events: events.clone(),
        }))
        .instrumentation(Arc::new(Recording {
            name: "inner",
            events: events.clone(),
        }))
        .build();

    run(&engine, "{ hello }").await;

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "outer:begin",
            "inner:begin",
            "inner:fetched:hello",
            "outer:fetched:hello",
            "inner:done:hello",
            "outer:done:hello",
            "inner:end",
            "outer:end",
        ]
    );
}

#[tokio::test]
async fn timed_out_fields_report_abandoned() {
    let events = Events::default();
    let schema = Schema::builder("type Query { slow: String }")
        .unwrap()
        .resolver(
            "Query",
            "slow",
            async_resolver_fn(|_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Value::from("late"))
            }),
        )
        .unwrap()
        .build();
    let engine = GraphQLEngine::builder(schema)
        .instrumentation(Arc::new(Recording {
            name: "probe",
            events: events.clone(),
        }))
        .build();

    let result = engine
        .execute(ExecutionInput::new("{ slow }").timeout(Duration::from_millis(20)))
        .await;

    assert_eq!(data_json(&result), "null");
    let events = events.lock().unwrap();
    assert!(events.contains(&"probe:abandoned:slow".to_string()));
    assert_eq!(events.last(), Some(&"probe:end".to_string()));
}

#[tokio::test]
async fn failed_and_nulled_fields_complete_with_an_error() {
    let events = Events::default();
    let schema = Schema::builder("type Query { boom: String strict: String! fine: String }")
        .unwrap()
        .resolver("Query", "boom", resolver_fn(|_| Err(FieldError::new("boom"))))
        .unwrap()
        .resolver("Query", "fine", resolver_fn(|_| Ok(Value::Null)))
        .unwrap()
        .build();
    let engine = GraphQLEngine::builder(schema)
        .instrumentation(Arc::new(Recording {
            name: "obs",
            events: events.clone(),
        }))
        .build();

    let result = run(&engine, "{ boom fine }").await;

    assert_eq!(result.errors.len(), 1);
    assert_eq!(data_json(&result), r#"{"boom":null,"fine":null}"#);
    let recorded = events.lock().unwrap().clone();
    assert!(recorded.contains(&"obs:failed:boom".to_string()));
    assert!(recorded.contains(&"obs:done:fine".to_string()));

    events.lock().unwrap().clear();
    let result = run(&engine, "{ strict }").await;

    assert_eq!(data_json(&result), "null");
    assert!(events
        .lock()
        .unwrap()
        .contains(&"obs:nulled:strict".to_string()));
}
