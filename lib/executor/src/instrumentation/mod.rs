pub mod chain;
pub mod context;
pub mod parameters;
pub mod state;
pub mod tracing;

use async_trait::async_trait;

use crate::{
    cache::document::ParsedDocument,
    input::ExecutionInput,
    instrumentation::{
        context::{FieldFetchingContext, FieldFetchingContextAdapter, InstrumentationContext},
        parameters::{
            ExecuteOperationParameters, ExecutionParameters, FieldParameters, ValidationParameters,
        },
    },
    response::{execution_result::ExecutionResult, graphql_error::GraphQLError, value::Value},
    variables::Variables,
};

pub use chain::ChainedInstrumentation;
pub use context::{PhaseError, PhaseGuard};
pub use self::tracing::TracingInstrumentation;
pub use state::InstrumentationState;

pub type ContextResult<T> = Option<Box<dyn InstrumentationContext<T>>>;

/// Hooks wrapping every phase of a request.
///
/// Each `begin_*` hook runs when its phase starts and may return a context
/// that is completed when the phase ends. Every hook defaults to doing
/// nothing, implementations override what they observe.
#[async_trait]
pub trait Instrumentation: Send + Sync + 'static {
    /// Seeds per request state. Runs before any other hook of the request.
    fn init_state(&self, _state: &InstrumentationState) {}

    fn begin_execution(
        &self,
        _params: &ExecutionParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<ExecutionResult> {
        None
    }

    fn begin_parse(
        &self,
        _params: &ExecutionParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<ParsedDocument> {
        None
    }

    /// Completed with the validation errors, empty when the document is valid.
    fn begin_validation(
        &self,
        _params: &ValidationParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<Vec<GraphQLError>> {
        None
    }

    fn begin_execute_operation(
        &self,
        _params: &ExecuteOperationParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<ExecutionResult> {
        None
    }

    /// Spans resolving and completing a field, its subtree included.
    fn begin_field_execution(
        &self,
        _params: &FieldParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<Value> {
        None
    }

    /// Spans the resolver call. Completed with the raw resolver output.
    fn begin_field_fetch(
        &self,
        _params: &FieldParameters<'_>,
        _state: &InstrumentationState,
    ) -> ContextResult<Value> {
        None
    }

    /// Incremental variant of [`Instrumentation::begin_field_fetch`].
    ///
    /// Defaults to adapting the context returned by `begin_field_fetch`.
    fn begin_field_fetching(
        &self,
        params: &FieldParameters<'_>,
        state: &InstrumentationState,
    ) -> Option<Box<dyn FieldFetchingContext>> {
        self.begin_field_fetch(params, state).map(|delegate| {
            Box::new(FieldFetchingContextAdapter::new(delegate)) as Box<dyn FieldFetchingContext>
        })
    }

    fn instrument_execution_input(
        &self,
        input: ExecutionInput,
        _state: &InstrumentationState,
    ) -> ExecutionInput {
        input
    }

    fn instrument_document_and_variables(
        &self,
        document: ParsedDocument,
        variables: Variables,
        _state: &InstrumentationState,
    ) -> (ParsedDocument, Variables) {
        (document, variables)
    }

    async fn instrument_execution_result(
        &self,
        result: ExecutionResult,
        _state: &InstrumentationState,
    ) -> ExecutionResult {
        result
    }
}

/// Instrumentation used when none is installed.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {}
