use std::{any::Any, panic::AssertUnwindSafe, sync::Arc, task::Poll};

use futures::{future::BoxFuture, FutureExt};
use tracing::{debug, instrument, warn};

use crate::{
    context::ExecutionContext,
    execution::{
        arguments::resolve_arguments,
        completion::{complete_value, FieldValueInfo},
        concurrency::ConcurrencyScope,
        error::FieldError,
        field_collector::{FieldCollector, MergedSelectionSet},
        merged_field::MergedField,
        null_propagation::{settle, FieldState},
        step_info::StepInfo,
    },
    instrumentation::{
        context::{FieldFetchingGuard, PhaseError, PhaseGuard},
        parameters::FieldParameters,
    },
    response::{graphql_error::GraphQLError, value::Value},
    schema::{
        resolver::{PropertyResolver, Resolved, Resolver, ResolverContext},
        OperationKind,
    },
};

/// Executes the selected operation against `root_value`.
///
/// Returns `NullPropagated` when a null reached the operation root.
#[instrument(level = "trace", skip_all, fields(kind = ctx.operation.kind.as_str()))]
pub(crate) async fn execute_operation<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    root_value: Value,
) -> FieldState {
    let root_type = ctx.root_type.named_type();
    let root = Arc::new(StepInfo::root(&ctx.root_type));
    let fields = FieldCollector::new(ctx.schema, &ctx.fragments, &ctx.variables)
        .collect_fields(root_type, [ctx.operation.selection_set]);
    let source = Arc::new(root_value);

    match ctx.operation.kind {
        OperationKind::Mutation => execute_fields_serially(ctx, root, root_type, source, fields).await,
        OperationKind::Query | OperationKind::Subscription => {
            if let Some(dispatcher) = &ctx.dispatcher {
                dispatcher.begin_root(fields.len());
            }
            execute_fields(ctx, root, root_type, source, fields).await
        }
    }
}

/// Resolves every field of one object concurrently.
///
/// The object keeps the selection order of its fields whatever order they
/// complete in. A field that propagated null nulls the whole object.
pub(crate) fn execute_fields<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    parent: Arc<StepInfo<'exec>>,
    object_type: &'exec str,
    source: Arc<Value>,
    fields: MergedSelectionSet<'exec>,
) -> BoxFuture<'exec, FieldState> {
    async move {
        let mut keys = Vec::with_capacity(fields.len());
        let mut scope = ConcurrencyScope::new();
        for (key, field) in fields {
            keys.push(key);
            scope.spawn(resolve_field(
                ctx,
                parent.clone(),
                object_type,
                source.clone(),
                Arc::new(field),
            ));
        }

        let states = scope.join_all().await;
        if states.iter().any(FieldState::is_null_propagated) {
            return FieldState::NullPropagated;
        }
        FieldState::Resolved(Value::Object(
            keys.into_iter()
                .map(str::to_string)
                .zip(states.into_iter().map(FieldState::into_value))
                .collect(),
        ))
    }
    .boxed()
}

/// Resolves mutation root fields one after another.
///
/// Each field, subtree included, settles before the next resolver runs.
async fn execute_fields_serially<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    parent: Arc<StepInfo<'exec>>,
    object_type: &'exec str,
    source: Arc<Value>,
    fields: MergedSelectionSet<'exec>,
) -> FieldState {
    let mut entries = Vec::with_capacity(fields.len());
    for (key, field) in fields {
        if let Some(dispatcher) = &ctx.dispatcher {
            dispatcher.begin_root(1);
        }
        let state = resolve_field(
            ctx,
            parent.clone(),
            object_type,
            source.clone(),
            Arc::new(field),
        )
        .await;
        if state.is_null_propagated() {
            debug!(field = key, "mutation root nulled, skipping remaining fields");
            return FieldState::NullPropagated;
        }
        entries.push((key.to_string(), state.into_value()));
    }
    FieldState::Resolved(Value::Object(entries))
}

/// Resolves and completes one field and settles it against its type.
fn resolve_field<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    parent: Arc<StepInfo<'exec>>,
    object_type: &'exec str,
    source: Arc<Value>,
    field: Arc<MergedField<'exec>>,
) -> BoxFuture<'exec, FieldState> {
    async move {
        let level = parent.path().level() + 1;
        let Some(definition) = ctx.schema.field_definition(object_type, field.name()) else {
            ctx.errors.add(
                GraphQLError::new(format!(
                    "Field '{}' is not defined on type '{}'",
                    field.name(),
                    object_type
                ))
                .with_path(&parent.path().segment(field.response_key()))
                .with_location(field.position()),
            );
            if let Some(dispatcher) = &ctx.dispatcher {
                dispatcher.field_fetched(level);
                dispatcher.field_value_reported(level, 0);
            }
            return FieldState::Resolved(Value::Null);
        };

        let arguments = Arc::new(resolve_arguments(
            &definition.arguments,
            field.arguments(),
            &ctx.variables,
        ));
        let step = Arc::new(StepInfo::for_field(
            &parent,
            object_type,
            definition,
            field,
            arguments,
        ));
        let execution_guard = PhaseGuard::new(ctx.instrumentation.begin_field_execution(
            &FieldParameters {
                step_info: step.as_ref(),
            },
            ctx.instrumentation_state,
        ));

        let mut failure = None;
        let state = match fetch_field(ctx, &step, &source, level).await {
            Ok(value) => {
                if let Some(dispatcher) = &ctx.dispatcher {
                    let info = FieldValueInfo::of(ctx.schema, step.field_type(), &value);
                    dispatcher.field_value_reported(level, info.object_count());
                }
                complete_value(ctx, step.clone(), value).await
            }
            Err(error) => {
                if let Some(dispatcher) = &ctx.dispatcher {
                    dispatcher.field_value_reported(level, 0);
                }
                ctx.errors.add(fetch_error(&step, error.clone()));
                failure = Some(PhaseError::Field(error));
                FieldState::Failed
            }
        };

        let state = settle(&step, state, &ctx.errors);
        match (&state, failure) {
            (_, Some(error)) => execution_guard.complete(Err(&error)),
            (FieldState::Resolved(value), None) => execution_guard.complete(Ok(value)),
            (_, None) => execution_guard.complete(Err(&PhaseError::NullPropagated)),
        }
        state
    }
    .boxed()
}

/// Invokes the resolver of a field and waits for its value.
///
/// The dispatcher learns that the field was fetched right after the first
/// poll of the resolver's future, so batch loads registered during that poll
/// can be flushed together with the rest of the level.
async fn fetch_field<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    step: &Arc<StepInfo<'exec>>,
    source: &Value,
    level: usize,
) -> Result<Value, FieldError> {
    let mut guard = FieldFetchingGuard::new(ctx.instrumentation.begin_field_fetching(
        &FieldParameters {
            step_info: step.as_ref(),
        },
        ctx.instrumentation_state,
    ));
    let report_fetched = || {
        if let Some(dispatcher) = &ctx.dispatcher {
            dispatcher.field_fetched(level);
        }
    };

    let resolver = step
        .field_definition()
        .and_then(|definition| definition.resolver.clone());
    let invoked = {
        let resolver_ctx = ResolverContext::new(source, step.arguments(), step.as_ref(), ctx);
        std::panic::catch_unwind(AssertUnwindSafe(move || match &resolver {
            Some(resolver) => resolver.resolve(resolver_ctx),
            None => PropertyResolver.resolve(resolver_ctx),
        }))
        .unwrap_or_else(|panic| Err(panicked(step, panic)))
    };

    let result = match invoked {
        Ok(Resolved::Value(value)) => {
            report_fetched();
            Ok(value)
        }
        Ok(Resolved::Future(future)) => {
            let mut future = AssertUnwindSafe(future).catch_unwind();
            let first_poll = futures::poll!(&mut future);
            report_fetched();
            let outcome = match first_poll {
                Poll::Ready(outcome) => outcome,
                Poll::Pending => {
                    guard.dispatched();
                    future.await
                }
            };
            outcome.unwrap_or_else(|panic| Err(panicked(step, panic)))
        }
        Err(error) => {
            report_fetched();
            Err(error)
        }
    };

    match &result {
        Ok(value) => {
            guard.fetched(value);
            guard.complete(Ok(value));
        }
        Err(error) => guard.complete(Err(&PhaseError::Field(error.clone()))),
    }
    result
}

fn panicked(step: &StepInfo<'_>, panic: Box<dyn Any + Send>) -> FieldError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "resolver panicked".to_string());
    warn!(path = %step.path(), %message, "resolver panicked");
    FieldError::new(message)
}

fn fetch_error(step: &StepInfo<'_>, error: FieldError) -> GraphQLError {
    let message = format!(
        "Exception while fetching data ({}) : {}",
        step.path(),
        error.message
    );
    let graphql_error = GraphQLError::new(message)
        .with_path(step.path())
        .with_extensions(error.extensions);
    match step.field() {
        Some(field) => graphql_error.with_location(field.position()),
        None => graphql_error,
    }
}
