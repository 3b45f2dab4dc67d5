use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    cache::document::ParsedDocument,
    input::ExecutionInput,
    instrumentation::{
        context::{FieldFetchingContext, InstrumentationContext, PhaseError},
        parameters::{
            ExecuteOperationParameters, ExecutionParameters, FieldParameters, ValidationParameters,
        },
        state::InstrumentationState,
        ContextResult, Instrumentation,
    },
    response::{execution_result::ExecutionResult, graphql_error::GraphQLError, value::Value},
    variables::Variables,
};

struct ChainedContext<T: ?Sized + 'static> {
    contexts: Vec<Box<dyn InstrumentationContext<T>>>,
}

impl<T: ?Sized + 'static> InstrumentationContext<T> for ChainedContext<T> {
    fn on_dispatched(&mut self) {
        for context in self.contexts.iter_mut() {
            context.on_dispatched();
        }
    }

    fn on_completed(self: Box<Self>, result: Result<&T, &PhaseError>) {
        for context in self.contexts.into_iter().rev() {
            context.on_completed(result);
        }
    }
}

fn chain_contexts<T: ?Sized + 'static>(
    mut contexts: Vec<Box<dyn InstrumentationContext<T>>>,
) -> ContextResult<T> {
    match contexts.len() {
        0 => None,
        1 => contexts.pop(),
        _ => Some(Box::new(ChainedContext { contexts })),
    }
}

struct ChainedFieldFetchingContext {
    contexts: Vec<Box<dyn FieldFetchingContext>>,
}

impl InstrumentationContext<Value> for ChainedFieldFetchingContext {
    fn on_dispatched(&mut self) {
        for context in self.contexts.iter_mut() {
            context.on_dispatched();
        }
    }

    fn on_completed(self: Box<Self>, result: Result<&Value, &PhaseError>) {
        for context in self.contexts.into_iter().rev() {
            context.on_completed(result);
        }
    }
}

impl FieldFetchingContext for ChainedFieldFetchingContext {
    fn on_fetched_value(&mut self, value: &Value) {
        for context in self.contexts.iter_mut() {
            context.on_fetched_value(value);
        }
    }
}

/// Runs several instrumentations as one.
///
/// Hooks are called in list order, contexts are completed in reverse order so
/// the first instrumentation observes the outermost span.
#[derive(Clone, Default)]
pub struct ChainedInstrumentation {
    instrumentations: Vec<Arc<dyn Instrumentation>>,
}

impl ChainedInstrumentation {
    pub fn new(instrumentations: Vec<Arc<dyn Instrumentation>>) -> Self {
        ChainedInstrumentation { instrumentations }
    }

    pub fn push(&mut self, instrumentation: Arc<dyn Instrumentation>) {
        self.instrumentations.push(instrumentation);
    }

    pub fn len(&self) -> usize {
        self.instrumentations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrumentations.is_empty()
    }

    fn begin_each<T, F>(&self, begin: F) -> ContextResult<T>
    where
        T: ?Sized + 'static,
        F: Fn(&dyn Instrumentation) -> ContextResult<T>,
    {
        chain_contexts(
            self.instrumentations
                .iter()
                .filter_map(|instrumentation| begin(instrumentation.as_ref()))
                .collect(),
        )
    }
}

#[async_trait]
impl Instrumentation for ChainedInstrumentation {
    fn init_state(&self, state: &InstrumentationState) {
        for instrumentation in &self.instrumentations {
            instrumentation.init_state(state);
        }
    }

    fn begin_execution(
        &self,
        params: &ExecutionParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<ExecutionResult> {
        self.begin_each(|i| i.begin_execution(params, state))
    }

    fn begin_parse(
        &self,
        params: &ExecutionParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<ParsedDocument> {
        self.begin_each(|i| i.begin_parse(params, state))
    }

    fn begin_validation(
        &self,
        params: &ValidationParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<Vec<GraphQLError>> {
        self.begin_each(|i| i.begin_validation(params, state))
    }

    fn begin_execute_operation(
        &self,
        params: &ExecuteOperationParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<ExecutionResult> {
        self.begin_each(|i| i.begin_execute_operation(params, state))
    }

    fn begin_field_execution(
        &self,
        params: &FieldParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<Value> {
        self.begin_each(|i| i.begin_field_execution(params, state))
    }

    fn begin_field_fetch(
        &self,
        params: &FieldParameters<'_>,
        state: &InstrumentationState,
    ) -> ContextResult<Value> {
        self.begin_each(|i| i.begin_field_fetch(params, state))
    }

    fn begin_field_fetching(
        &self,
        params: &FieldParameters<'_>,
        state: &InstrumentationState,
    ) -> Option<Box<dyn FieldFetchingContext>> {
        let mut contexts: Vec<_> = self
            .instrumentations
            .iter()
            .filter_map(|i| i.begin_field_fetching(params, state))
            .collect();
        match contexts.len() {
            0 => None,
            1 => contexts.pop(),
            _ => Some(Box::new(ChainedFieldFetchingContext { contexts })),
        }
    }

    fn instrument_execution_input(
        &self,
        input: ExecutionInput,
        state: &InstrumentationState,
    ) -> ExecutionInput {
        self.instrumentations
            .iter()
            .fold(input, |input, i| i.instrument_execution_input(input, state))
    }

    fn instrument_document_and_variables(
        &self,
        document: ParsedDocument,
        variables: Variables,
        state: &InstrumentationState,
    ) -> (ParsedDocument, Variables) {
        self.instrumentations
            .iter()
            .fold((document, variables), |(document, variables), i| {
                i.instrument_document_and_variables(document, variables, state)
            })
    }

    async fn instrument_execution_result(
        &self,
        mut result: ExecutionResult,
        state: &InstrumentationState,
    ) -> ExecutionResult {
        for instrumentation in &self.instrumentations {
            result = instrumentation
                .instrument_execution_result(result, state)
                .await;
        }
        result
    }
}
