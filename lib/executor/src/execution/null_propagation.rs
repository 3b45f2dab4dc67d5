use std::sync::Mutex;

use tracing::trace;

use crate::{
    execution::step_info::StepInfo,
    response::{graphql_error::GraphQLError, value::Value},
};

/// Outcome of completing one node of the result tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldState {
    Resolved(Value),
    /// Resolution failed and the error is already recorded.
    Failed,
    /// A non-null descendant could not be represented; this node has to become null.
    NullPropagated,
}

impl FieldState {
    pub fn is_null_propagated(&self) -> bool {
        matches!(self, FieldState::NullPropagated)
    }

    pub fn into_value(self) -> Value {
        match self {
            FieldState::Resolved(value) => value,
            FieldState::Failed | FieldState::NullPropagated => Value::Null,
        }
    }
}

/// Append-only list of errors shared by every field of one execution.
#[derive(Default, Debug)]
pub struct ErrorCollector {
    errors: Mutex<Vec<GraphQLError>>,
}

impl ErrorCollector {
    pub fn add(&self, error: GraphQLError) {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(error);
    }

    pub fn len(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_errors(self) -> Vec<GraphQLError> {
        self.errors
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) fn non_null_violation(step: &StepInfo<'_>) -> GraphQLError {
    let message = format!(
        "The field at path '{}' was declared as a non null type, but the code involved in retrieving data has wrongly returned a null value.  The graphql specification requires that the parent field be set to null, or if that is non nullable that it bubble up null to its parent and so on. The non-nullable type is '{}' within parent type '{}'",
        step.path(),
        step.field_type().nullable(),
        step.object_type_name(),
    );
    let error = GraphQLError::new(message).with_path(step.path());
    match step.field() {
        Some(field) => error.with_location(field.position()),
        None => error,
    }
}

/// Applies the non-null rules of the position described by `step` to `state`.
///
/// The result is either a representable value or `NullPropagated`, which the
/// enclosing object or list must absorb. Nullable positions absorb everything.
/// Only a plain null in a non-null position records a new error; failures and
/// propagated nulls were reported where they originated.
pub fn settle(step: &StepInfo<'_>, state: FieldState, errors: &ErrorCollector) -> FieldState {
    if !step.is_non_null() {
        return FieldState::Resolved(state.into_value());
    }

    match state {
        FieldState::Resolved(Value::Null) => {
            errors.add(non_null_violation(step));
            trace!(
                path = %step.path(),
                nullable_ancestor = %step
                    .nearest_nullable_ancestor()
                    .map(|ancestor| ancestor.path().to_string())
                    .unwrap_or_else(|| "<root>".to_string()),
                "null in non-null position propagates"
            );
            FieldState::NullPropagated
        }
        FieldState::Resolved(value) => FieldState::Resolved(value),
        FieldState::Failed | FieldState::NullPropagated => FieldState::NullPropagated,
    }
}
