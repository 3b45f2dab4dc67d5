use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level of the emitted events.
    ///
    /// Overridden by the `LOG_LEVEL` environment variable.
    #[serde(default)]
    pub level: LogLevel,

    /// Overridden by the `LOG_FORMAT` environment variable.
    #[serde(default)]
    pub format: LogFormat,

    /// Per target directives applied on top of `level`, for example
    /// `graphql_execution_engine::batching=trace,moka=off`.
    ///
    /// Overridden by the `LOG_FILTER` environment variable.
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(
    Debug, Deserialize, Serialize, JsonSchema, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }
}

/// Layout of the stdout log lines.
#[derive(
    Debug, Deserialize, Serialize, JsonSchema, Clone, Copy, PartialEq, Eq, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogFormat {
    /// Full events with targets, one per line.
    Text,
    /// Abbreviated events for local development.
    Compact,
    /// One flattened JSON object per event.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            LogFormat::Compact
        } else {
            LogFormat::Json
        }
    }
}
