use std::{any::Any, sync::Arc, time::Duration};

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::{response::value::Value, variables::Variables};

/// One request to execute.
///
/// `query` may be absent when `extensions.persistedQuery` names a query that
/// was registered before.
#[derive(Clone, Debug, Default)]
pub struct ExecutionInput {
    pub query: Option<String>,
    pub operation_name: Option<String>,
    pub variables: Variables,
    pub extensions: Option<IndexMap<String, Value>>,
    pub context: Option<Arc<dyn Any + Send + Sync>>,
    pub cancellation: Option<CancellationToken>,
    pub timeout: Option<Duration>,
}

impl ExecutionInput {
    pub fn new(query: impl Into<String>) -> Self {
        ExecutionInput {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    pub fn extensions(mut self, extensions: IndexMap<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Value resolvers can read back with `ResolverContext::context`.
    pub fn context<T: Any + Send + Sync>(mut self, context: T) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Overrides the engine wide execution timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
