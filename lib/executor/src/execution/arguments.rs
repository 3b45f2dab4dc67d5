use graphql_parser::query::Value as AstValue;
use indexmap::IndexMap;

use crate::{response::value::Value, schema::InputValueDefinition, variables::Variables};

/// Coerced argument values of one field, in definition order.
pub type Arguments = IndexMap<String, Value>;

/// Converts a literal from the document into a value, substituting variables.
///
/// Returns `None` when the literal is a variable that was not provided. Int
/// literals outside the `i64` range never get here: the document fails to parse.
pub fn value_from_ast(value: &AstValue<'_, String>, variables: &Variables) -> Option<Value> {
    Some(match value {
        AstValue::Variable(name) => return variables.get(name).cloned(),
        AstValue::Int(number) => number.as_i64().map(Value::I64).unwrap_or(Value::Null),
        AstValue::Float(float) => Value::F64(*float),
        AstValue::String(s) => Value::String(s.clone()),
        AstValue::Boolean(b) => Value::Bool(*b),
        AstValue::Null => Value::Null,
        AstValue::Enum(name) => Value::String(name.clone()),
        AstValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| value_from_ast(item, variables).unwrap_or(Value::Null))
                .collect(),
        ),
        AstValue::Object(fields) => Value::Object(
            fields
                .iter()
                .filter_map(|(name, value)| {
                    value_from_ast(value, variables).map(|value| (name.clone(), value))
                })
                .collect(),
        ),
    })
}

/// Resolves the argument values of a field.
///
/// Provided literals and variables win, otherwise the definition's default value
/// is used. Arguments without value nor default are left out.
pub fn resolve_arguments(
    definitions: &IndexMap<String, InputValueDefinition>,
    provided: &[(String, AstValue<'static, String>)],
    variables: &Variables,
) -> Arguments {
    let mut arguments = Arguments::with_capacity(definitions.len());
    for (name, definition) in definitions {
        let value = provided
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .and_then(|(_, value)| value_from_ast(value, variables))
            .or_else(|| definition.default_value.clone());

        if let Some(value) = value {
            arguments.insert(name.clone(), value);
        }
    }
    arguments
}
