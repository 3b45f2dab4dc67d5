use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::response::{graphql_error::GraphQLError, value::Value};

/// Outcome of one request.
///
/// `data` is absent when the request failed before execution started and
/// `Some(Value::Null)` when a null reached the operation root.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ExecutionResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<IndexMap<String, Value>>,
}

impl ExecutionResult {
    pub fn new(data: Value, errors: Vec<GraphQLError>) -> Self {
        ExecutionResult {
            data: Some(data),
            errors,
            extensions: None,
        }
    }

    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        ExecutionResult {
            data: None,
            errors,
            extensions: None,
        }
    }

    pub fn is_data_present(&self) -> bool {
        self.data.is_some()
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value);
        self
    }
}
