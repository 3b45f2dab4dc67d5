pub mod resolver;
pub mod scalars;
pub mod sdl;
pub mod types;

use std::{collections::HashMap, fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    response::value::Value,
    schema::{
        resolver::{Resolver, TypeResolver, TypenameResolver},
        scalars::ScalarSerializer,
        types::TypeRef,
    },
};

pub use sdl::{SchemaBuilder, SchemaError};

pub const TYPENAME_FIELD_NAME: &str = "__typename";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
        }
    }
}

pub struct FieldDefinition {
    pub name: String,
    pub field_type: TypeRef,
    pub arguments: IndexMap<String, InputValueDefinition>,
    pub resolver: Option<Arc<dyn Resolver>>,
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct InputValueDefinition {
    pub name: String,
    pub value_type: TypeRef,
    pub default_value: Option<Value>,
}

pub struct ObjectType {
    pub name: String,
    pub interfaces: Vec<String>,
    pub fields: IndexMap<String, FieldDefinition>,
}

pub struct InterfaceType {
    pub name: String,
    pub fields: IndexMap<String, FieldDefinition>,
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
    pub type_resolver: Option<Arc<dyn TypeResolver>>,
}

pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

pub struct ScalarType {
    pub name: String,
    pub serializer: Arc<dyn ScalarSerializer>,
}

pub struct InputObjectType {
    pub name: String,
    pub fields: IndexMap<String, InputValueDefinition>,
}

pub enum TypeDefinition {
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    Scalar(ScalarType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Object(t) => &t.name,
            TypeDefinition::Interface(t) => &t.name,
            TypeDefinition::Union(t) => &t.name,
            TypeDefinition::Enum(t) => &t.name,
            TypeDefinition::Scalar(t) => &t.name,
            TypeDefinition::InputObject(t) => &t.name,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDefinition::Enum(_) | TypeDefinition::Scalar(_))
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, TypeDefinition::Interface(_) | TypeDefinition::Union(_))
    }
}

/// Executable type system: type definitions plus resolver wiring.
pub struct Schema {
    types: HashMap<String, TypeDefinition>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
    typename_field: FieldDefinition,
}

impl Schema {
    pub(crate) fn new(
        types: HashMap<String, TypeDefinition>,
        query_type: String,
        mutation_type: Option<String>,
        subscription_type: Option<String>,
    ) -> Self {
        Schema {
            types,
            query_type,
            mutation_type,
            subscription_type,
            typename_field: FieldDefinition {
                name: TYPENAME_FIELD_NAME.to_string(),
                field_type: TypeRef::non_null(TypeRef::named("String")),
                arguments: IndexMap::new(),
                resolver: Some(Arc::new(TypenameResolver)),
            },
        }
    }

    pub fn builder(sdl: &str) -> Result<SchemaBuilder, SchemaError> {
        SchemaBuilder::from_sdl(sdl)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    pub fn query_type(&self) -> Option<&ObjectType> {
        self.object_type(&self.query_type)
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.mutation_type
            .as_deref()
            .and_then(|name| self.object_type(name))
    }

    pub fn subscription_type(&self) -> Option<&ObjectType> {
        self.subscription_type
            .as_deref()
            .and_then(|name| self.object_type(name))
    }

    pub fn root_type(&self, kind: OperationKind) -> Option<&ObjectType> {
        match kind {
            OperationKind::Query => self.query_type(),
            OperationKind::Mutation => self.mutation_type(),
            OperationKind::Subscription => self.subscription_type(),
        }
    }

    /// Field definition of a composite type, `__typename` included.
    pub fn field_definition(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        if field_name == TYPENAME_FIELD_NAME {
            return Some(&self.typename_field);
        }
        match self.types.get(type_name)? {
            TypeDefinition::Object(object) => object.fields.get(field_name),
            TypeDefinition::Interface(interface) => interface.fields.get(field_name),
            _ => None,
        }
    }

    /// Whether `object_type` is `type_name` itself or one of its possible types.
    pub fn is_possible_type(&self, type_name: &str, object_type: &str) -> bool {
        if type_name == object_type {
            return true;
        }
        match self.types.get(type_name) {
            Some(TypeDefinition::Union(union)) => union.members.iter().any(|m| m == object_type),
            Some(TypeDefinition::Interface(_)) => self
                .object_type(object_type)
                .is_some_and(|object| object.interfaces.iter().any(|i| i == type_name)),
            _ => false,
        }
    }

    pub fn type_resolver(&self, abstract_type: &str) -> Option<&Arc<dyn TypeResolver>> {
        match self.types.get(abstract_type)? {
            TypeDefinition::Interface(interface) => interface.type_resolver.as_ref(),
            TypeDefinition::Union(union) => union.type_resolver.as_ref(),
            _ => None,
        }
    }
}
