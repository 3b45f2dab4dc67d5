use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct DocumentCacheConfig {
    /// Caches parsed documents by query text.
    ///
    /// Can also be set via the `DOCUMENT_CACHE_ENABLED` environment variable.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum number of cached documents.
    ///
    /// Default: 1000.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// How long a cached document lives after it was inserted. Unset means no expiry.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    #[schemars(with = "Option<String>")]
    pub ttl: Option<Duration>,
}

impl Default for DocumentCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_entries: default_max_entries(),
            ttl: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_entries() -> u64 {
    1000
}
