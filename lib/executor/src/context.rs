use std::{any::Any, sync::Arc};

use graphql_parser::query::Document;
use tokio_util::sync::CancellationToken;

use crate::{
    batching::{coordinator::BatchCoordinator, dispatch::LevelDispatchStrategy},
    execution::{
        field_collector::FragmentMap, null_propagation::ErrorCollector,
        operation::SelectedOperation,
    },
    instrumentation::{Instrumentation, InstrumentationState},
    schema::{types::TypeRef, Schema},
    variables::Variables,
};

/// State of one request, shared by every field of its execution.
pub struct ExecutionContext<'exec> {
    pub schema: &'exec Schema,
    pub document: &'exec Document<'static, String>,
    pub operation: SelectedOperation<'exec>,
    pub fragments: FragmentMap<'exec>,
    pub variables: Variables,
    pub instrumentation: &'exec dyn Instrumentation,
    pub instrumentation_state: &'exec InstrumentationState,
    pub errors: ErrorCollector,
    pub batches: Arc<BatchCoordinator>,
    /// Level barrier for batched loads, `None` when no loaders are registered.
    pub dispatcher: Option<LevelDispatchStrategy>,
    pub cancellation: CancellationToken,
    pub request_context: Option<Arc<dyn Any + Send + Sync>>,
    pub root_type: TypeRef,
}

impl<'exec> ExecutionContext<'exec> {
    pub fn root_type_name(&self) -> &str {
        self.root_type.named_type()
    }
}
