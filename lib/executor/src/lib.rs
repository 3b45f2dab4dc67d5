pub mod batching;
pub mod cache;
pub mod context;
pub mod engine;
pub mod execution;
pub mod input;
pub mod instrumentation;
pub mod response;
pub mod schema;
pub mod validation;
pub mod variables;

#[cfg(test)]
mod tests;

pub use batching::{batch_loader_fn, BatchLoadError, BatchLoader, LoadedValue};
pub use engine::{GraphQLEngine, GraphQLEngineBuilder};
pub use execution::error::{ExecutionError, FieldError};
pub use input::ExecutionInput;
pub use instrumentation::{Instrumentation, TracingInstrumentation};
pub use response::{execution_result::ExecutionResult, graphql_error::GraphQLError, value::Value};
pub use schema::{
    resolver::{async_resolver_fn, resolver_fn, Resolved, ResolverContext},
    Schema,
};
