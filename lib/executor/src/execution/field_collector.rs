use std::collections::{HashMap, HashSet};

use graphql_parser::query::{
    Directive, FragmentDefinition, Selection, SelectionSet, TypeCondition, Value as AstValue,
};
use indexmap::IndexMap;

use crate::{execution::merged_field::MergedField, schema::Schema, variables::Variables};

pub type FragmentMap<'exec> = HashMap<&'exec str, &'exec FragmentDefinition<'static, String>>;

/// Response key to merged field, in first occurrence order.
pub type MergedSelectionSet<'exec> = IndexMap<&'exec str, MergedField<'exec>>;

/// Groups the selections applying to one concrete object type by response key.
pub struct FieldCollector<'a, 'exec> {
    schema: &'exec Schema,
    fragments: &'a FragmentMap<'exec>,
    variables: &'a Variables,
}

impl<'a, 'exec> FieldCollector<'a, 'exec> {
    pub fn new(
        schema: &'exec Schema,
        fragments: &'a FragmentMap<'exec>,
        variables: &'a Variables,
    ) -> Self {
        FieldCollector {
            schema,
            fragments,
            variables,
        }
    }

    pub fn collect_fields<I>(&self, object_type: &str, selection_sets: I) -> MergedSelectionSet<'exec>
    where
        I: IntoIterator<Item = &'exec SelectionSet<'static, String>>,
    {
        let mut fields = MergedSelectionSet::new();
        let mut visited_fragments = HashSet::new();
        for selection_set in selection_sets {
            self.collect(object_type, selection_set, &mut fields, &mut visited_fragments);
        }
        fields
    }

    fn collect(
        &self,
        object_type: &str,
        selection_set: &'exec SelectionSet<'static, String>,
        fields: &mut MergedSelectionSet<'exec>,
        visited_fragments: &mut HashSet<&'exec str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if !self.should_include(&field.directives) {
                        continue;
                    }
                    let response_key = field.alias.as_deref().unwrap_or(&field.name);
                    fields
                        .entry(response_key)
                        .and_modify(|merged| merged.push(field))
                        .or_insert_with(|| MergedField::new(field));
                }
                Selection::InlineFragment(fragment) => {
                    if !self.should_include(&fragment.directives) {
                        continue;
                    }
                    if let Some(TypeCondition::On(condition)) = &fragment.type_condition {
                        if !self.schema.is_possible_type(condition, object_type) {
                            continue;
                        }
                    }
                    self.collect(object_type, &fragment.selection_set, fields, visited_fragments);
                }
                Selection::FragmentSpread(spread) => {
                    if !self.should_include(&spread.directives) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(spread.fragment_name.as_str()) else {
                        continue;
                    };
                    if !visited_fragments.insert(fragment.name.as_str()) {
                        continue;
                    }
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if !self.schema.is_possible_type(condition, object_type) {
                        continue;
                    }
                    self.collect(object_type, &fragment.selection_set, fields, visited_fragments);
                }
            }
        }
    }

    fn should_include(&self, directives: &[Directive<'static, String>]) -> bool {
        let skip = self.directive_condition(directives, "skip").unwrap_or(false);
        let include = self
            .directive_condition(directives, "include")
            .unwrap_or(true);
        !skip && include
    }

    fn directive_condition(&self, directives: &[Directive<'static, String>], name: &str) -> Option<bool> {
        let directive = directives.iter().find(|d| d.name == name)?;
        let (_, value) = directive.arguments.iter().find(|(arg, _)| arg == "if")?;
        match value {
            AstValue::Boolean(b) => Some(*b),
            AstValue::Variable(variable) => self.variables.get(variable)?.as_bool(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use graphql_parser::query::{parse_query, Definition, OperationDefinition};

    use super::{FieldCollector, FragmentMap};
    use crate::{response::value::Value, schema::Schema, variables::Variables};

    const SDL: &str = r#"
        type Query { pet: Pet }
        interface Pet { name: String }
        type Dog implements Pet { name: String barks: Boolean }
        type Cat implements Pet { name: String meows: Boolean }
    "#;

    fn keys(query: &str, object_type: &str, variables: Variables) -> Vec<(String, usize)> {
        let schema = Schema::builder(SDL).unwrap().build();
        let document = parse_query::<String>(query).unwrap().into_static();
        let mut fragments = FragmentMap::new();
        let mut root = None;
        for definition in &document.definitions {
            match definition {
                Definition::Fragment(fragment) => {
                    fragments.insert(fragment.name.as_str(), fragment);
                }
                Definition::Operation(OperationDefinition::Query(query)) => {
                    root = Some(&query.selection_set)
                }
                Definition::Operation(OperationDefinition::SelectionSet(set)) => root = Some(set),
                _ => {}
            }
        }

        let collector = FieldCollector::new(&schema, &fragments, &variables);
        collector
            .collect_fields(object_type, root)
            .iter()
            .map(|(key, merged)| (key.to_string(), merged.fields().len()))
            .collect()
    }

    #[test]
    fn merges_by_response_key_in_first_occurrence_order() {
        let collected = keys(
            "{ b: name ... on Dog { barks name } ... on Cat { meows } name ...F ...F } fragment F on Pet { name }",
            "Dog",
            Variables::new(),
        );

        assert_eq!(
            collected,
            vec![
                ("b".to_string(), 1),
                ("barks".to_string(), 1),
                ("name".to_string(), 3),
            ]
        );
    }

    #[test]
    fn honours_skip_and_include() {
        let mut variables = Variables::new();
        variables.insert("hide".to_string(), Value::Bool(true));

        let collected = keys(
            "query ($hide: Boolean) { name @skip(if: $hide) barks @include(if: true) meows @include(if: false) }",
            "Dog",
            variables,
        );

        assert_eq!(collected, vec![("barks".to_string(), 1)]);
    }
}
