use graphql_parser::query::VariableDefinition;
use indexmap::IndexMap;

use crate::{
    execution::{arguments::value_from_ast, error::ExecutionError},
    response::value::Value,
    schema::{types::TypeRef, Schema, TypeDefinition},
};

/// Coerced variable values of an operation.
pub type Variables = IndexMap<String, Value>;

/// Coerces the provided variables against the operation's variable definitions.
///
/// Variables that are not declared by the operation are dropped. Declared
/// variables fall back to their default value. A missing or null non-null
/// variable fails the whole request.
pub fn coerce_variable_values(
    schema: &Schema,
    definitions: &[VariableDefinition<'static, String>],
    mut provided: Variables,
) -> Result<Variables, ExecutionError> {
    let mut coerced = Variables::with_capacity(definitions.len());

    for definition in definitions {
        let name = definition.name.as_str();
        let variable_type = TypeRef::from(&definition.var_type);
        let fail = |message: String| ExecutionError::VariableCoercion {
            message,
            position: definition.position,
        };

        match provided.swap_remove(name) {
            Some(Value::Null) if variable_type.is_non_null() => {
                return Err(fail(format!(
                    "Variable '${}' of non-null type '{}' must not be null.",
                    name, variable_type
                )));
            }
            Some(value) => {
                let value = coerce_input_value(schema, &value, &variable_type).map_err(|reason| {
                    fail(format!(
                        "Variable '${}' got invalid value {}; {}",
                        name, value, reason
                    ))
                })?;
                coerced.insert(name.to_string(), value);
            }
            None => {
                if let Some(default_value) = &definition.default_value {
                    if let Some(value) = value_from_ast(default_value, &Variables::new()) {
                        coerced.insert(name.to_string(), value);
                    }
                } else if variable_type.is_non_null() {
                    return Err(fail(format!(
                        "Variable '${}' of required type '{}' was not provided.",
                        name, variable_type
                    )));
                }
            }
        }
    }

    Ok(coerced)
}

fn coerce_input_value(schema: &Schema, value: &Value, type_ref: &TypeRef) -> Result<Value, String> {
    match type_ref {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                return Err(format!("Expected non-nullable type '{}' not to be null", type_ref));
            }
            coerce_input_value(schema, value, inner)
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input_value(schema, item, inner))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            // A single item is accepted where a list is expected.
            single => Ok(Value::Array(vec![coerce_input_value(schema, single, inner)?])),
        },
        TypeRef::Named(name) => match schema.get_type(name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.serializer.parse_value(value),
            Some(TypeDefinition::Enum(enum_type)) => match value {
                Value::String(s) if enum_type.values.iter().any(|v| v == s) => Ok(value.clone()),
                other => Err(format!(
                    "Value {} is not a valid enum value for type '{}'",
                    other, name
                )),
            },
            Some(TypeDefinition::InputObject(input)) => {
                let Value::Object(entries) = value else {
                    return Err(format!("Expected an object for type '{}'", name));
                };
                if let Some((unknown, _)) = entries
                    .iter()
                    .find(|(key, _)| !input.fields.contains_key(key.as_str()))
                {
                    return Err(format!(
                        "Field '{}' is not defined by type '{}'",
                        unknown, name
                    ));
                }

                let mut coerced = Vec::with_capacity(input.fields.len());
                for (field_name, field) in &input.fields {
                    match value.get(field_name) {
                        Some(field_value) => coerced.push((
                            field_name.clone(),
                            coerce_input_value(schema, field_value, &field.value_type)?,
                        )),
                        None => match &field.default_value {
                            Some(default_value) => {
                                coerced.push((field_name.clone(), default_value.clone()))
                            }
                            None if field.value_type.is_non_null() => {
                                return Err(format!(
                                    "Field '{}' of required type '{}' was not provided",
                                    field_name, field.value_type
                                ));
                            }
                            None => {}
                        },
                    }
                }
                Ok(Value::Object(coerced))
            }
            _ => Err(format!("Type '{}' is not an input type", name)),
        },
    }
}
