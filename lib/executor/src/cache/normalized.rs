use std::{
    hash::{Hash, Hasher},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use futures::future::BoxFuture;
use moka::future::Cache;
use tracing::trace;
use xxhash_rust::xxh3::Xxh3;

use crate::{cache::document::ParsedDocument, execution::error::ExecutionError};

/// What identifies a validated document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizationInput {
    pub query: String,
    pub operation_name: Option<String>,
}

impl NormalizationInput {
    pub fn cache_key(&self) -> u64 {
        let mut hasher = Xxh3::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// A document that parsed and passed validation.
#[derive(Clone, Debug)]
pub struct NormalizedDocumentEntry {
    pub document: ParsedDocument,
}

pub type NormalizedDocumentCreator<'a> = BoxFuture<'a, Result<NormalizedDocumentEntry, ExecutionError>>;

/// Asynchronous get-or-create of validated documents.
///
/// The creator runs at most once per input at a time. Failures are handed to
/// every waiting caller and are not cached.
#[async_trait]
pub trait NormalizedDocumentCacheProvider: Send + Sync + 'static {
    async fn get_normalized(
        &self,
        input: &NormalizationInput,
        creator: NormalizedDocumentCreator<'_>,
    ) -> Result<Arc<NormalizedDocumentEntry>, ExecutionError>;
}

#[derive(Default, Debug, Clone, Copy)]
pub struct NoopNormalizedDocumentCache;

#[async_trait]
impl NormalizedDocumentCacheProvider for NoopNormalizedDocumentCache {
    async fn get_normalized(
        &self,
        _input: &NormalizationInput,
        creator: NormalizedDocumentCreator<'_>,
    ) -> Result<Arc<NormalizedDocumentEntry>, ExecutionError> {
        creator.await.map(Arc::new)
    }
}

pub struct MokaNormalizedDocumentCache {
    cache: Cache<u64, Arc<NormalizedDocumentEntry>>,
}

impl MokaNormalizedDocumentCache {
    pub fn new(max_entries: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_entries);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        MokaNormalizedDocumentCache {
            cache: builder.build(),
        }
    }
}

#[async_trait]
impl NormalizedDocumentCacheProvider for MokaNormalizedDocumentCache {
    async fn get_normalized(
        &self,
        input: &NormalizationInput,
        creator: NormalizedDocumentCreator<'_>,
    ) -> Result<Arc<NormalizedDocumentEntry>, ExecutionError> {
        let key = input.cache_key();
        if let Some(entry) = self.cache.get(&key).await {
            trace!(hash = key, "normalized document cache hit");
            return Ok(entry);
        }

        trace!(hash = key, "normalized document cache miss");
        self.cache
            .try_get_with(key, async move { creator.await.map(Arc::new) })
            .await
            .map_err(|error| error.as_ref().clone())
    }
}
