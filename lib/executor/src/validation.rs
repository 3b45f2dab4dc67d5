use std::collections::HashSet;

use graphql_parser::{
    query::{Definition, Document, Selection, SelectionSet, TypeCondition},
    Pos,
};

use crate::{
    execution::operation::SelectedOperation,
    response::graphql_error::GraphQLError,
    schema::{Schema, TypeDefinition},
};

/// Checks a parsed document against a schema before it is executed.
///
/// An empty list means the document may be executed.
pub trait DocumentValidator: Send + Sync + 'static {
    fn validate(
        &self,
        schema: &Schema,
        document: &Document<'static, String>,
        operation_name: Option<&str>,
    ) -> Vec<GraphQLError>;
}

/// Validator covering what execution relies on: supported operations, known
/// fields, fragments and types, and selection sets matching leaf and
/// composite types.
#[derive(Default, Debug, Clone, Copy)]
pub struct BasicValidator;

impl DocumentValidator for BasicValidator {
    fn validate(
        &self,
        schema: &Schema,
        document: &Document<'static, String>,
        _operation_name: Option<&str>,
    ) -> Vec<GraphQLError> {
        let fragments = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Fragment(fragment) => Some(fragment.name.as_str()),
                Definition::Operation(_) => None,
            })
            .collect();
        let mut walker = SelectionWalker {
            schema,
            fragments,
            errors: Vec::new(),
        };

        for definition in &document.definitions {
            match definition {
                Definition::Operation(operation) => {
                    let operation = SelectedOperation::from(operation);
                    match schema.root_type(operation.kind) {
                        Some(root) => walker.selection_set(&root.name, operation.selection_set),
                        None => walker.errors.push(GraphQLError::new(format!(
                            "Schema is not configured for {}s.",
                            operation.kind.as_str()
                        ))),
                    }
                }
                Definition::Fragment(fragment) => {
                    let TypeCondition::On(type_name) = &fragment.type_condition;
                    if walker.check_type_condition(type_name, fragment.position) {
                        walker.selection_set(type_name, &fragment.selection_set);
                    }
                }
            }
        }

        walker.errors
    }
}

struct SelectionWalker<'a> {
    schema: &'a Schema,
    fragments: HashSet<&'a str>,
    errors: Vec<GraphQLError>,
}

impl<'a> SelectionWalker<'a> {
    fn error(&mut self, message: String, position: Pos) {
        self.errors
            .push(GraphQLError::new(message).with_location(position));
    }

    fn check_type_condition(&mut self, type_name: &str, position: Pos) -> bool {
        match self.schema.get_type(type_name) {
            Some(definition) if !definition.is_leaf() && !matches!(definition, TypeDefinition::InputObject(_)) => true,
            Some(_) => {
                self.error(
                    format!("Fragment cannot condition on non composite type '{}'.", type_name),
                    position,
                );
                false
            }
            None => {
                self.error(format!("Unknown type '{}'.", type_name), position);
                false
            }
        }
    }

    fn selection_set(&mut self, parent_type: &str, selection_set: &SelectionSet<'static, String>) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    let Some(definition) = self.schema.field_definition(parent_type, &field.name)
                    else {
                        self.error(
                            format!(
                                "Cannot query field '{}' on type '{}'.",
                                field.name, parent_type
                            ),
                            field.position,
                        );
                        continue;
                    };

                    let field_type = definition.field_type.named_type();
                    let is_leaf = self
                        .schema
                        .get_type(field_type)
                        .map_or(true, TypeDefinition::is_leaf);
                    let has_selection = !field.selection_set.items.is_empty();

                    if is_leaf && has_selection {
                        self.error(
                            format!(
                                "Field '{}' must not have a selection since type '{}' has no subfields.",
                                field.name, definition.field_type
                            ),
                            field.position,
                        );
                    } else if !is_leaf && !has_selection {
                        self.error(
                            format!(
                                "Field '{}' of type '{}' must have a selection of subfields. Did you mean '{} {{ ... }}'?",
                                field.name, definition.field_type, field.name
                            ),
                            field.position,
                        );
                    } else if !is_leaf {
                        self.selection_set(field_type, &field.selection_set);
                    }
                }
                Selection::InlineFragment(fragment) => match &fragment.type_condition {
                    Some(TypeCondition::On(type_name)) => {
                        if self.check_type_condition(type_name, fragment.position) {
                            self.selection_set(type_name, &fragment.selection_set);
                        }
                    }
                    None => self.selection_set(parent_type, &fragment.selection_set),
                },
                Selection::FragmentSpread(spread) => {
                    if !self.fragments.contains(spread.fragment_name.as_str()) {
                        self.error(
                            format!("Unknown fragment '{}'.", spread.fragment_name),
                            spread.position,
                        );
                    }
                }
            }
        }
    }
}
