use indexmap::IndexMap;
use moka::sync::Cache;
use tracing::{debug, trace};

use crate::{execution::error::ExecutionError, response::value::Value};

const PERSISTED_QUERY_EXTENSION: &str = "persistedQuery";
const SUPPORTED_VERSION: i64 = 1;

/// Automatic persisted queries.
///
/// A request carrying `extensions.persistedQuery.sha256Hash` and the query
/// text registers the text under that hash; a later request with the hash
/// alone is served the registered text.
pub struct PersistedQueryCache {
    queries: Cache<String, String>,
}

impl PersistedQueryCache {
    pub fn new(max_entries: u64) -> Self {
        PersistedQueryCache {
            queries: Cache::new(max_entries),
        }
    }

    /// Query text to execute for a request.
    pub fn resolve(
        &self,
        query: Option<&str>,
        extensions: Option<&IndexMap<String, Value>>,
    ) -> Result<Option<String>, ExecutionError> {
        let Some(persisted) = extensions.and_then(|ext| ext.get(PERSISTED_QUERY_EXTENSION)) else {
            return Ok(query.map(str::to_string));
        };

        match persisted.get("version") {
            Some(version) if version.as_i64() == Some(SUPPORTED_VERSION) => {}
            Some(version) => return Err(ExecutionError::PersistedQueryVersion(version.to_string())),
            None => return Err(ExecutionError::PersistedQueryVersion("null".to_string())),
        }

        let Some(hash) = persisted.get("sha256Hash").and_then(Value::as_str) else {
            return Ok(query.map(str::to_string));
        };

        match query {
            Some(query) => {
                debug!(hash, "registering persisted query");
                self.queries.insert(hash.to_string(), query.to_string());
                Ok(Some(query.to_string()))
            }
            None => {
                let found = self.queries.get(hash);
                trace!(hash, found = found.is_some(), "persisted query lookup");
                found.map(Some).ok_or(ExecutionError::PersistedQueryNotFound)
            }
        }
    }
}
