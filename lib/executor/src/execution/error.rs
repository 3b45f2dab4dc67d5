use std::time::Duration;

use graphql_parser::Pos;
use indexmap::IndexMap;
use strum::IntoStaticStr;

use crate::response::{graphql_error::GraphQLError, value::Value};

/// Error produced by a resolver or batch loader for a single field.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct FieldError {
    pub message: String,
    pub extensions: Option<IndexMap<String, Value>>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
        self
    }
}

impl From<String> for FieldError {
    fn from(message: String) -> Self {
        FieldError::new(message)
    }
}

impl From<&str> for FieldError {
    fn from(message: &str) -> Self {
        FieldError::new(message)
    }
}

/// Failure to turn query text into a document.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct DocumentParseError {
    pub message: String,
}

/// Request level failures. None of these produce partial data.
#[derive(thiserror::Error, Debug, Clone, IntoStaticStr)]
pub enum ExecutionError {
    #[error("{0}")]
    #[strum(serialize = "GRAPHQL_PARSE_FAILED")]
    Parse(#[from] DocumentParseError),

    #[error("Validation of the document failed with {} error(s)", .0.len())]
    #[strum(serialize = "GRAPHQL_VALIDATION_FAILED")]
    Validation(Vec<GraphQLError>),

    #[error("Must provide an operation.")]
    #[strum(serialize = "OPERATION_RESOLUTION_FAILURE")]
    NoOperation,

    #[error("Must provide operation name if query contains multiple operations.")]
    #[strum(serialize = "OPERATION_RESOLUTION_FAILURE")]
    MissingOperationName,

    #[error("Unknown operation named '{0}'.")]
    #[strum(serialize = "OPERATION_RESOLUTION_FAILURE")]
    UnknownOperation(String),

    #[error("Schema is not configured to execute {0} operation.")]
    #[strum(serialize = "OPERATION_RESOLUTION_FAILURE")]
    UnsupportedOperation(&'static str),

    #[error("{message}")]
    #[strum(serialize = "BAD_USER_INPUT")]
    VariableCoercion { message: String, position: Pos },

    #[error("Execution timed out after {}", humantime::format_duration(*.0))]
    #[strum(serialize = "EXECUTION_TIMEOUT")]
    Timeout(Duration),

    #[error("Execution was cancelled")]
    #[strum(serialize = "EXECUTION_CANCELLED")]
    Cancelled,

    #[error("PersistedQueryNotFound")]
    #[strum(serialize = "PERSISTED_QUERY_NOT_FOUND")]
    PersistedQueryNotFound,

    #[error("Unsupported persisted query version: {0}")]
    #[strum(serialize = "PERSISTED_QUERY_NOT_SUPPORTED")]
    PersistedQueryVersion(String),
}

impl ExecutionError {
    pub fn error_code(&self) -> &'static str {
        self.into()
    }

    /// Errors as they appear in the response `errors` list.
    pub fn to_graphql_errors(&self) -> Vec<GraphQLError> {
        match self {
            ExecutionError::Validation(errors) => errors.clone(),
            ExecutionError::VariableCoercion { message, position } => {
                vec![GraphQLError::new(message.clone())
                    .with_location(*position)
                    .with_extension("code", self.error_code())]
            }
            other => vec![GraphQLError::new(other.to_string())
                .with_extension("code", other.error_code())],
        }
    }
}
