use graphql_parser::query::{
    Definition, Document, OperationDefinition, SelectionSet, VariableDefinition,
};

use crate::{
    execution::{error::ExecutionError, field_collector::FragmentMap},
    schema::OperationKind,
};

/// The operation of a document that a request executes.
#[derive(Debug, Clone, Copy)]
pub struct SelectedOperation<'exec> {
    pub kind: OperationKind,
    pub name: Option<&'exec str>,
    pub selection_set: &'exec SelectionSet<'static, String>,
    pub variable_definitions: &'exec [VariableDefinition<'static, String>],
}

impl<'exec> From<&'exec OperationDefinition<'static, String>> for SelectedOperation<'exec> {
    fn from(operation: &'exec OperationDefinition<'static, String>) -> Self {
        match operation {
            OperationDefinition::SelectionSet(selection_set) => SelectedOperation {
                kind: OperationKind::Query,
                name: None,
                selection_set,
                variable_definitions: &[],
            },
            OperationDefinition::Query(query) => SelectedOperation {
                kind: OperationKind::Query,
                name: query.name.as_deref(),
                selection_set: &query.selection_set,
                variable_definitions: &query.variable_definitions,
            },
            OperationDefinition::Mutation(mutation) => SelectedOperation {
                kind: OperationKind::Mutation,
                name: mutation.name.as_deref(),
                selection_set: &mutation.selection_set,
                variable_definitions: &mutation.variable_definitions,
            },
            OperationDefinition::Subscription(subscription) => SelectedOperation {
                kind: OperationKind::Subscription,
                name: subscription.name.as_deref(),
                selection_set: &subscription.selection_set,
                variable_definitions: &subscription.variable_definitions,
            },
        }
    }
}

/// Picks the operation named `operation_name`, or the only operation.
pub fn select_operation<'exec>(
    document: &'exec Document<'static, String>,
    operation_name: Option<&str>,
) -> Result<SelectedOperation<'exec>, ExecutionError> {
    let mut operations = document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Operation(operation) => Some(SelectedOperation::from(operation)),
            Definition::Fragment(_) => None,
        });

    match operation_name {
        Some(name) => operations
            .find(|operation| operation.name == Some(name))
            .ok_or_else(|| ExecutionError::UnknownOperation(name.to_string())),
        None => {
            let first = operations.next().ok_or(ExecutionError::NoOperation)?;
            if operations.next().is_some() {
                return Err(ExecutionError::MissingOperationName);
            }
            Ok(first)
        }
    }
}

pub fn collect_fragments<'exec>(document: &'exec Document<'static, String>) -> FragmentMap<'exec> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect()
}
