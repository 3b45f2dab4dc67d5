use std::{any::Any, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use tokio_util::sync::CancellationToken;

use crate::{
    batching::coordinator::BatchHandle,
    context::ExecutionContext,
    execution::{arguments::Arguments, error::FieldError, path::ResultPath, step_info::StepInfo},
    response::value::Value,
    schema::{Schema, TYPENAME_FIELD_NAME},
    variables::Variables,
};

pub type ResolverFuture = BoxFuture<'static, Result<Value, FieldError>>;

/// What a resolver hands back: a value that is ready, or a future producing one.
pub enum Resolved {
    Value(Value),
    Future(ResolverFuture),
}

impl Resolved {
    pub fn future<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, FieldError>> + Send + 'static,
    {
        Resolved::Future(future.boxed())
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Resolved::Value(value)
    }
}

pub type ResolverResult = Result<Resolved, FieldError>;

/// Produces the value of a field for one parent object.
pub trait Resolver: Send + Sync + 'static {
    fn resolve(&self, ctx: ResolverContext<'_>) -> ResolverResult;
}

/// Picks the concrete object type of a value returned for an interface or union.
pub trait TypeResolver: Send + Sync + 'static {
    fn resolve_type(&self, value: &Value, schema: &Schema) -> Option<String>;
}

/// Everything a resolver may look at while producing a field value.
pub struct ResolverContext<'a> {
    source: &'a Value,
    arguments: &'a Arguments,
    step_info: &'a StepInfo<'a>,
    execution: &'a ExecutionContext<'a>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(
        source: &'a Value,
        arguments: &'a Arguments,
        step_info: &'a StepInfo<'a>,
        execution: &'a ExecutionContext<'a>,
    ) -> Self {
        ResolverContext {
            source,
            arguments,
            step_info,
            execution,
        }
    }

    /// The parent object value.
    pub fn source(&self) -> &'a Value {
        self.source
    }

    pub fn arguments(&self) -> &'a Arguments {
        self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&'a Value> {
        self.arguments.get(name)
    }

    pub fn step_info(&self) -> &'a StepInfo<'a> {
        self.step_info
    }

    pub fn path(&self) -> &'a ResultPath {
        self.step_info.path()
    }

    pub fn field_name(&self) -> &'a str {
        self.step_info.field_name()
    }

    /// Name of the concrete object type this field is resolved on.
    pub fn object_type_name(&self) -> &'a str {
        self.step_info.object_type_name()
    }

    pub fn variables(&self) -> &'a Variables {
        &self.execution.variables
    }

    /// Request scoped value supplied with the execution input.
    pub fn context<T: Any + Send + Sync>(&self) -> Option<&'a T> {
        self.execution
            .request_context
            .as_ref()
            .and_then(|context| context.downcast_ref::<T>())
    }

    /// Fires when the request is cancelled or timed out.
    pub fn cancellation(&self) -> &'a CancellationToken {
        &self.execution.cancellation
    }

    /// Registers `item_key` with the batch loader named `batch_key`.
    ///
    /// The returned handle resolves once the batch for this tree level is
    /// dispatched. Every sibling registering with the same loader ends up in
    /// one loader call.
    pub fn load(&self, batch_key: &str, item_key: impl Into<String>) -> BatchHandle {
        self.execution.batches.register(
            batch_key,
            item_key.into(),
            self.execution
                .dispatcher
                .as_ref()
                .map(|_| self.step_info.path().level()),
        )
    }
}

pub struct FnResolver<F> {
    resolve: F,
}

impl<F> Resolver for FnResolver<F>
where
    F: Fn(ResolverContext<'_>) -> Result<Value, FieldError> + Send + Sync + 'static,
{
    fn resolve(&self, ctx: ResolverContext<'_>) -> ResolverResult {
        (self.resolve)(ctx).map(Resolved::Value)
    }
}

/// Wraps a synchronous closure as a resolver.
pub fn resolver_fn<F>(resolve: F) -> Arc<dyn Resolver>
where
    F: Fn(ResolverContext<'_>) -> Result<Value, FieldError> + Send + Sync + 'static,
{
    Arc::new(FnResolver { resolve })
}

pub struct AsyncFnResolver<F> {
    resolve: F,
}

impl<F, Fut> Resolver for AsyncFnResolver<F>
where
    F: Fn(ResolverContext<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FieldError>> + Send + 'static,
{
    fn resolve(&self, ctx: ResolverContext<'_>) -> ResolverResult {
        Ok(Resolved::future((self.resolve)(ctx)))
    }
}

/// Wraps a closure returning a future as a resolver.
///
/// The closure runs synchronously and must copy out of the context whatever
/// the future needs, for example a batch handle.
pub fn async_resolver_fn<F, Fut>(resolve: F) -> Arc<dyn Resolver>
where
    F: Fn(ResolverContext<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, FieldError>> + Send + 'static,
{
    Arc::new(AsyncFnResolver { resolve })
}

/// Default resolver: reads the field name from the parent object.
pub struct PropertyResolver;

impl Resolver for PropertyResolver {
    fn resolve(&self, ctx: ResolverContext<'_>) -> ResolverResult {
        Ok(Resolved::Value(
            ctx.source()
                .get(ctx.field_name())
                .cloned()
                .unwrap_or(Value::Null),
        ))
    }
}

pub(crate) struct TypenameResolver;

impl Resolver for TypenameResolver {
    fn resolve(&self, ctx: ResolverContext<'_>) -> ResolverResult {
        debug_assert_eq!(ctx.field_name(), TYPENAME_FIELD_NAME);
        Ok(Resolved::Value(Value::from(ctx.object_type_name())))
    }
}

/// Resolves abstract types from the `__typename` entry of the value.
pub struct TypenameFieldTypeResolver;

impl TypeResolver for TypenameFieldTypeResolver {
    fn resolve_type(&self, value: &Value, _schema: &Schema) -> Option<String> {
        value
            .get(TYPENAME_FIELD_NAME)
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

pub struct FnTypeResolver<F> {
    resolve: F,
}

impl<F> TypeResolver for FnTypeResolver<F>
where
    F: Fn(&Value, &Schema) -> Option<String> + Send + Sync + 'static,
{
    fn resolve_type(&self, value: &Value, schema: &Schema) -> Option<String> {
        (self.resolve)(value, schema)
    }
}

pub fn type_resolver_fn<F>(resolve: F) -> Arc<dyn TypeResolver>
where
    F: Fn(&Value, &Schema) -> Option<String> + Send + Sync + 'static,
{
    Arc::new(FnTypeResolver { resolve })
}
