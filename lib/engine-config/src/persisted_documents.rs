use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Clone)]
#[serde(deny_unknown_fields)]
pub struct PersistedDocumentsConfig {
    /// Whether automatic persisted queries (`extensions.persistedQuery`) are accepted.
    #[serde(default)]
    pub enabled: bool,

    /// Maximum number of registered query texts.
    ///
    /// Default: 1000.
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl PersistedDocumentsConfig {
    pub fn is_disabled(&self) -> bool {
        !self.enabled
    }
}

impl Default for PersistedDocumentsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: default_max_entries(),
        }
    }
}

fn default_max_entries() -> u64 {
    1000
}
