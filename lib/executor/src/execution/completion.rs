use std::sync::Arc;

use futures::{future::BoxFuture, FutureExt};
use tracing::trace;

use crate::{
    context::ExecutionContext,
    execution::{
        concurrency::ConcurrencyScope,
        field_collector::FieldCollector,
        null_propagation::{settle, FieldState},
        step_info::StepInfo,
        strategy::execute_fields,
    },
    response::{graphql_error::GraphQLError, value::Value},
    schema::{
        resolver::{TypeResolver, TypenameFieldTypeResolver},
        types::TypeRef,
        Schema, TypeDefinition,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteValueKind {
    Null,
    Scalar,
    Enum,
    Object,
    List,
}

/// Shape of a fetched value measured against the type of its field.
///
/// Lists carry one child per element. It tells the batch dispatcher how many
/// objects a field will start before any of them is completed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValueInfo {
    pub kind: CompleteValueKind,
    pub children: Vec<FieldValueInfo>,
}

impl FieldValueInfo {
    pub fn of(schema: &Schema, field_type: &TypeRef, value: &Value) -> Self {
        let leaf = |kind| FieldValueInfo {
            kind,
            children: Vec::new(),
        };
        if value.is_null() {
            return leaf(CompleteValueKind::Null);
        }
        match field_type.nullable() {
            TypeRef::List(item_type) => match value.as_array() {
                Some(items) => FieldValueInfo {
                    kind: CompleteValueKind::List,
                    children: items
                        .iter()
                        .map(|item| FieldValueInfo::of(schema, item_type, item))
                        .collect(),
                },
                None => leaf(CompleteValueKind::Null),
            },
            TypeRef::Named(name) => match schema.get_type(name) {
                Some(TypeDefinition::Scalar(_)) => leaf(CompleteValueKind::Scalar),
                Some(TypeDefinition::Enum(_)) => leaf(CompleteValueKind::Enum),
                Some(definition) if !definition.is_leaf() => leaf(CompleteValueKind::Object),
                _ => leaf(CompleteValueKind::Null),
            },
            TypeRef::NonNull(_) => leaf(CompleteValueKind::Null),
        }
    }

    /// Objects this value starts, nested lists included.
    pub fn object_count(&self) -> usize {
        match self.kind {
            CompleteValueKind::Object => 1,
            CompleteValueKind::List => self.children.iter().map(FieldValueInfo::object_count).sum(),
            _ => 0,
        }
    }
}

fn completion_error(step: &StepInfo<'_>, message: String) -> GraphQLError {
    let error = GraphQLError::new(message).with_path(step.path());
    match step.field() {
        Some(field) => error.with_location(field.position()),
        None => error,
    }
}

/// Completes `value` for the position described by `step`.
///
/// The returned state is not settled yet: the caller applies the non-null
/// rules of the position.
pub(crate) fn complete_value<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    step: Arc<StepInfo<'exec>>,
    value: Value,
) -> BoxFuture<'exec, FieldState> {
    async move {
        if value.is_null() {
            return FieldState::Resolved(Value::Null);
        }

        match step.field_type().nullable() {
            TypeRef::List(item_type) => complete_list(ctx, step, item_type, value).await,
            TypeRef::Named(type_name) => match ctx.schema.get_type(type_name) {
                Some(TypeDefinition::Scalar(scalar)) => match scalar.serializer.serialize(&value) {
                    Ok(serialized) => FieldState::Resolved(serialized),
                    Err(reason) => serialization_failed(ctx, &step, reason),
                },
                Some(TypeDefinition::Enum(enum_type)) => {
                    let known = value
                        .as_str()
                        .is_some_and(|name| enum_type.values.iter().any(|v| v == name));
                    if known {
                        return FieldState::Resolved(value);
                    }
                    serialization_failed(
                        ctx,
                        &step,
                        format!(
                            "Invalid input for Enum '{}'. No value found for name '{}'",
                            enum_type.name,
                            value.as_str().map_or_else(|| value.to_string(), str::to_string)
                        ),
                    )
                }
                Some(definition) if !definition.is_leaf() => {
                    complete_object_value(ctx, step, type_name, value).await
                }
                _ => serialization_failed(
                    ctx,
                    &step,
                    format!("Type '{}' cannot be used as an output type", type_name),
                ),
            },
            TypeRef::NonNull(_) => serialization_failed(
                ctx,
                &step,
                format!("Invalid output type '{}'", step.field_type()),
            ),
        }
    }
    .boxed()
}

fn serialization_failed(
    ctx: &ExecutionContext<'_>,
    step: &StepInfo<'_>,
    reason: String,
) -> FieldState {
    ctx.errors.add(completion_error(
        step,
        format!("Can't serialize value ({}) : {}", step.path(), reason),
    ));
    FieldState::Failed
}

async fn complete_list<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    step: Arc<StepInfo<'exec>>,
    item_type: &'exec TypeRef,
    value: Value,
) -> FieldState {
    let items = match value {
        Value::Array(items) => items,
        other => {
            ctx.errors.add(completion_error(
                &step,
                format!(
                    "Can't resolve value ({}) : type mismatch error, expected type LIST got {}",
                    step.path(),
                    other.kind()
                ),
            ));
            return FieldState::Failed;
        }
    };

    let mut scope = ConcurrencyScope::new();
    for (index, item) in items.into_iter().enumerate() {
        let item_step = Arc::new(step.transform(item_type, Some(step.clone()), step.path().index(index)));
        scope.spawn(
            async move {
                let state = complete_value(ctx, item_step.clone(), item).await;
                settle(&item_step, state, &ctx.errors)
            }
            .boxed(),
        );
    }

    let states = scope.join_all().await;
    if states.iter().any(FieldState::is_null_propagated) {
        return FieldState::NullPropagated;
    }
    FieldState::Resolved(Value::Array(
        states.into_iter().map(FieldState::into_value).collect(),
    ))
}

/// Concrete object type of a composite value.
fn resolve_object_type<'exec>(
    schema: &'exec Schema,
    type_name: &'exec str,
    value: &Value,
) -> Result<&'exec str, String> {
    let Some(definition) = schema.get_type(type_name) else {
        return Err(format!("Unknown type '{}'", type_name));
    };
    if !definition.is_abstract() {
        return Ok(type_name);
    }

    let resolved = schema
        .type_resolver(type_name)
        .and_then(|resolver| resolver.resolve_type(value, schema))
        .or_else(|| TypenameFieldTypeResolver.resolve_type(value, schema))
        .ok_or_else(|| format!("Could not determine the exact type of '{}'", type_name))?;

    match schema.object_type(&resolved) {
        Some(object) if schema.is_possible_type(type_name, &object.name) => Ok(object.name.as_str()),
        _ => Err(format!(
            "Runtime object type '{}' is not a possible type for '{}'",
            resolved, type_name
        )),
    }
}

async fn complete_object_value<'exec>(
    ctx: &'exec ExecutionContext<'exec>,
    step: Arc<StepInfo<'exec>>,
    type_name: &'exec str,
    value: Value,
) -> FieldState {
    let level = step.path().level();
    let object_type = match resolve_object_type(ctx.schema, type_name, &value) {
        Ok(object_type) => object_type,
        Err(reason) => {
            if let Some(dispatcher) = &ctx.dispatcher {
                dispatcher.object_started(level, 0);
            }
            ctx.errors.add(completion_error(
                &step,
                format!("Can't resolve value ({}) : {}", step.path(), reason),
            ));
            return FieldState::Failed;
        }
    };

    let fields = {
        let collector = FieldCollector::new(ctx.schema, &ctx.fragments, &ctx.variables);
        match step.field() {
            Some(field) => collector.collect_fields(object_type, field.sub_selections()),
            None => collector.collect_fields(object_type, std::iter::empty()),
        }
    };
    trace!(path = %step.path(), object_type, fields = fields.len(), "completing object");

    if let Some(dispatcher) = &ctx.dispatcher {
        dispatcher.object_started(level, fields.len());
    }
    execute_fields(ctx, step, object_type, Arc::new(value), fields).await
}

#[cfg(test)]
mod tests {
    use super::{CompleteValueKind, FieldValueInfo};
    use crate::{
        response::value::Value,
        schema::{types::TypeRef, Schema},
    };

    #[test]
    fn counts_objects_through_nested_lists() {
        let schema = Schema::builder("type Query { users: [[User]] } type User { name: String }")
            .unwrap()
            .build();
        let field_type = TypeRef::list(TypeRef::list(TypeRef::named("User")));
        let value = Value::Array(vec![
            Value::Array(vec![Value::object([("name", Value::from("a"))]), Value::Null]),
            Value::Null,
            Value::Array(vec![Value::object([("name", Value::from("b"))])]),
        ]);

        let info = FieldValueInfo::of(&schema, &field_type, &value);

        assert_eq!(info.kind, CompleteValueKind::List);
        assert_eq!(info.children.len(), 3);
        assert_eq!(info.children[1].kind, CompleteValueKind::Null);
        assert_eq!(info.object_count(), 2);
        assert_eq!(
            FieldValueInfo::of(&schema, &TypeRef::named("String"), &Value::from("x")).object_count(),
            0
        );
    }
}
