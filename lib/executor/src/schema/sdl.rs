use std::{collections::HashMap, sync::Arc};

use graphql_parser::schema::{self as ast, parse_schema};
use indexmap::IndexMap;
use tracing::warn;

use crate::{
    execution::arguments::value_from_ast,
    schema::{
        resolver::{Resolver, TypeResolver},
        scalars::{built_in_scalars, PassThroughScalar, ScalarSerializer},
        types::TypeRef,
        EnumType, FieldDefinition, InputObjectType, InputValueDefinition, InterfaceType,
        ObjectType, ScalarType, Schema, TypeDefinition, UnionType,
    },
    variables::Variables,
};

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("Failed to parse schema: {0}")]
    Parse(String),
    #[error("Schema does not define the query root type '{0}'")]
    MissingQueryType(String),
    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),
    #[error("Cannot attach a resolver to '{0}.{1}': no such field")]
    UnknownField(String, String),
    #[error("Cannot attach a type resolver to '{0}': not an interface or union")]
    NotAbstract(String),
    #[error("Cannot attach a serializer to '{0}': not a scalar")]
    NotScalar(String),
}

/// Builds a [`Schema`] from SDL and attaches resolvers to it.
pub struct SchemaBuilder {
    types: HashMap<String, TypeDefinition>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl SchemaBuilder {
    pub fn from_sdl(sdl: &str) -> Result<Self, SchemaError> {
        let document =
            parse_schema::<String>(sdl).map_err(|err| SchemaError::Parse(err.to_string()))?;

        let mut types: HashMap<String, TypeDefinition> = built_in_scalars()
            .into_iter()
            .map(|(name, serializer)| {
                (
                    name.to_string(),
                    TypeDefinition::Scalar(ScalarType {
                        name: name.to_string(),
                        serializer,
                    }),
                )
            })
            .collect();
        let mut roots = (None, None, None);

        for definition in &document.definitions {
            match definition {
                ast::Definition::SchemaDefinition(schema) => {
                    roots = (
                        schema.query.clone(),
                        schema.mutation.clone(),
                        schema.subscription.clone(),
                    );
                }
                ast::Definition::TypeDefinition(type_definition) => {
                    let converted = convert_type_definition(type_definition);
                    let name = converted.name().to_string();
                    let built_in = matches!(
                        types.get(&name),
                        Some(TypeDefinition::Scalar(_)) if matches!(converted, TypeDefinition::Scalar(_))
                    );
                    if built_in {
                        continue;
                    }
                    if types.insert(name.clone(), converted).is_some() {
                        return Err(SchemaError::DuplicateType(name));
                    }
                }
                ast::Definition::TypeExtension(_) | ast::Definition::DirectiveDefinition(_) => {
                    warn!("type extensions and directive definitions are ignored");
                }
            }
        }

        let query_type = roots.0.unwrap_or_else(|| "Query".to_string());
        if !matches!(types.get(&query_type), Some(TypeDefinition::Object(_))) {
            return Err(SchemaError::MissingQueryType(query_type));
        }
        let mutation_type = roots
            .1
            .or_else(|| types.contains_key("Mutation").then(|| "Mutation".to_string()));
        let subscription_type = roots
            .2
            .or_else(|| {
                types
                    .contains_key("Subscription")
                    .then(|| "Subscription".to_string())
            });

        Ok(SchemaBuilder {
            types,
            query_type,
            mutation_type,
            subscription_type,
        })
    }

    /// Attaches a resolver to `type_name.field_name`.
    pub fn resolver(
        mut self,
        type_name: &str,
        field_name: &str,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, SchemaError> {
        let field = match self.types.get_mut(type_name) {
            Some(TypeDefinition::Object(object)) => object.fields.get_mut(field_name),
            Some(TypeDefinition::Interface(interface)) => interface.fields.get_mut(field_name),
            _ => None,
        };
        let field = field.ok_or_else(|| {
            SchemaError::UnknownField(type_name.to_string(), field_name.to_string())
        })?;
        field.resolver = Some(resolver);
        Ok(self)
    }

    pub fn type_resolver(
        mut self,
        type_name: &str,
        type_resolver: Arc<dyn TypeResolver>,
    ) -> Result<Self, SchemaError> {
        match self.types.get_mut(type_name) {
            Some(TypeDefinition::Interface(interface)) => {
                interface.type_resolver = Some(type_resolver)
            }
            Some(TypeDefinition::Union(union)) => union.type_resolver = Some(type_resolver),
            _ => return Err(SchemaError::NotAbstract(type_name.to_string())),
        }
        Ok(self)
    }

    pub fn scalar(
        mut self,
        type_name: &str,
        serializer: Arc<dyn ScalarSerializer>,
    ) -> Result<Self, SchemaError> {
        match self.types.get_mut(type_name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.serializer = serializer,
            _ => return Err(SchemaError::NotScalar(type_name.to_string())),
        }
        Ok(self)
    }

    pub fn build(self) -> Schema {
        Schema::new(
            self.types,
            self.query_type,
            self.mutation_type,
            self.subscription_type,
        )
    }
}

fn convert_input_values(values: &[ast::InputValue<'_, String>]) -> IndexMap<String, InputValueDefinition> {
    let no_variables = Variables::new();
    values
        .iter()
        .map(|value| {
            (
                value.name.clone(),
                InputValueDefinition {
                    name: value.name.clone(),
                    value_type: (&value.value_type).into(),
                    default_value: value
                        .default_value
                        .as_ref()
                        .and_then(|default| value_from_ast(default, &no_variables)),
                },
            )
        })
        .collect()
}

fn convert_fields(fields: &[ast::Field<'_, String>]) -> IndexMap<String, FieldDefinition> {
    fields
        .iter()
        .map(|field| {
            (
                field.name.clone(),
                FieldDefinition {
                    name: field.name.clone(),
                    field_type: TypeRef::from(&field.field_type),
                    arguments: convert_input_values(&field.arguments),
                    resolver: None,
                },
            )
        })
        .collect()
}

fn convert_type_definition(definition: &ast::TypeDefinition<'_, String>) -> TypeDefinition {
    match definition {
        ast::TypeDefinition::Object(object) => TypeDefinition::Object(ObjectType {
            name: object.name.clone(),
            interfaces: object.implements_interfaces.clone(),
            fields: convert_fields(&object.fields),
        }),
        ast::TypeDefinition::Interface(interface) => TypeDefinition::Interface(InterfaceType {
            name: interface.name.clone(),
            fields: convert_fields(&interface.fields),
            type_resolver: None,
        }),
        ast::TypeDefinition::Union(union) => TypeDefinition::Union(UnionType {
            name: union.name.clone(),
            members: union.types.clone(),
            type_resolver: None,
        }),
        ast::TypeDefinition::Enum(enum_type) => TypeDefinition::Enum(EnumType {
            name: enum_type.name.clone(),
            values: enum_type.values.iter().map(|v| v.name.clone()).collect(),
        }),
        ast::TypeDefinition::Scalar(scalar) => TypeDefinition::Scalar(ScalarType {
            name: scalar.name.clone(),
            serializer: Arc::new(PassThroughScalar),
        }),
        ast::TypeDefinition::InputObject(input) => TypeDefinition::InputObject(InputObjectType {
            name: input.name.clone(),
            fields: convert_input_values(&input.fields),
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        response::value::Value,
        schema::{
            resolver::resolver_fn, types::TypeRef, OperationKind, Schema, SchemaError,
            TypeDefinition,
        },
    };

    const SDL: &str = r#"
        schema { query: Root mutation: Writes }
        type Root { node(id: ID!, depth: Int = 3): Node pets: [Pet!]! }
        type Writes { touch: Boolean }
        interface Node { id: ID! }
        type Dog implements Node { id: ID! name: String }
        type Cat implements Node { id: ID! }
        union Pet = Dog | Cat
        enum Color { RED GREEN }
    "#;

    #[test]
    fn reads_roots_types_and_defaults() {
        let schema = Schema::builder(SDL).unwrap().build();

        assert_eq!(schema.query_type().map(|t| t.name.as_str()), Some("Root"));
        assert_eq!(
            schema.root_type(OperationKind::Mutation).map(|t| t.name.as_str()),
            Some("Writes")
        );
        assert!(schema.subscription_type().is_none());

        let node = schema.field_definition("Root", "node").unwrap();
        assert_eq!(node.field_type, TypeRef::named("Node"));
        assert_eq!(
            node.arguments.get("depth").and_then(|a| a.default_value.clone()),
            Some(Value::I64(3))
        );
        assert!(schema.is_possible_type("Node", "Dog"));
        assert!(schema.is_possible_type("Pet", "Cat"));
        assert!(!schema.is_possible_type("Pet", "Root"));
        assert!(matches!(schema.get_type("Color"), Some(TypeDefinition::Enum(e)) if e.values.len() == 2));
        assert!(schema.field_definition("Dog", "__typename").is_some());
    }

    #[test]
    fn rejects_wiring_to_unknown_fields() {
        let result = Schema::builder(SDL)
            .unwrap()
            .resolver("Root", "nope", resolver_fn(|_| Ok(Value::Null)));

        assert!(matches!(result, Err(SchemaError::UnknownField(t, f)) if t == "Root" && f == "nope"));
    }

    #[test]
    fn requires_query_root() {
        assert!(matches!(
            Schema::builder("type Foo { a: Int }"),
            Err(SchemaError::MissingQueryType(name)) if name == "Query"
        ));
    }
}
