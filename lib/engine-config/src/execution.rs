use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Upper bound for executing one operation, resolvers included.
    /// When reached, the response carries `data: null` and a single timeout error.
    ///
    /// Unset by default. Can also be set via the `EXECUTION_TIMEOUT` environment variable.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    #[schemars(with = "Option<String>")]
    pub timeout: Option<Duration>,

    /// Dispatches batched loads once per tree level instead of once per resolver.
    ///
    /// Default: `true`.
    #[serde(default = "default_batching")]
    pub batching: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            batching: default_batching(),
        }
    }
}

fn default_batching() -> bool {
    true
}
