use std::{sync::Arc, time::Duration};

use graphql_parser::query::{parse_query, Document};
use moka::sync::Cache;
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use crate::execution::error::DocumentParseError;

/// A parsed query document together with the hash of its source text.
#[derive(Clone, Debug)]
pub struct ParsedDocument {
    document: Arc<Document<'static, String>>,
    hash: u64,
}

impl ParsedDocument {
    pub fn new(document: Document<'static, String>, hash: u64) -> Self {
        ParsedDocument {
            document: Arc::new(document),
            hash,
        }
    }

    pub fn document(&self) -> &Document<'static, String> {
        &self.document
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }
}

pub type DocumentOrErrors = Result<ParsedDocument, DocumentParseError>;

pub fn parse_document(query: &str) -> DocumentOrErrors {
    let document = parse_query::<String>(query)
        .map_err(|error| DocumentParseError {
            message: error.to_string(),
        })?
        .into_static();
    Ok(ParsedDocument::new(document, xxh3_64(query.as_bytes())))
}

/// Parsed documents keyed by query text.
///
/// `compute` runs at most once per query at a time; concurrent callers for the
/// same query receive the outcome of that single run. Parse failures are not
/// cached.
pub trait DocumentCacheProvider: Send + Sync + 'static {
    fn get(&self, query: &str, compute: Box<dyn FnOnce() -> DocumentOrErrors + '_>)
        -> DocumentOrErrors;
}

/// Parses every time.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoopDocumentCache;

impl DocumentCacheProvider for NoopDocumentCache {
    fn get(
        &self,
        _query: &str,
        compute: Box<dyn FnOnce() -> DocumentOrErrors + '_>,
    ) -> DocumentOrErrors {
        compute()
    }
}

pub struct MokaDocumentCache {
    cache: Cache<u64, ParsedDocument>,
}

impl MokaDocumentCache {
    pub fn new(max_entries: u64, ttl: Option<Duration>) -> Self {
        let mut builder = Cache::builder().max_capacity(max_entries);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        MokaDocumentCache {
            cache: builder.build(),
        }
    }
}

impl DocumentCacheProvider for MokaDocumentCache {
    fn get(
        &self,
        query: &str,
        compute: Box<dyn FnOnce() -> DocumentOrErrors + '_>,
    ) -> DocumentOrErrors {
        let key = xxh3_64(query.as_bytes());
        if let Some(document) = self.cache.get(&key) {
            trace!(hash = key, "document cache hit");
            return Ok(document);
        }

        trace!(hash = key, "document cache miss");
        self.cache
            .try_get_with(key, compute)
            .map_err(|error| error.as_ref().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Barrier,
        },
        thread,
        time::Duration,
    };

    use super::{parse_document, DocumentCacheProvider, MokaDocumentCache, NoopDocumentCache};

    #[test]
    fn concurrent_lookups_compute_once() {
        let cache = Arc::new(MokaDocumentCache::new(100, None));
        let computed = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let computed = computed.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    cache
                        .get(
                            "{ hello }",
                            Box::new(|| {
                                computed.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(Duration::from_millis(50));
                                parse_document("{ hello }")
                            }),
                        )
                        .unwrap()
                        .hash()
                })
            })
            .collect();

        let hashes: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(computed.load(Ordering::SeqCst), 1);
        assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn parse_failures_are_not_cached() {
        let cache = MokaDocumentCache::new(100, None);
        let computed = AtomicUsize::new(0);
        for _ in 0..2 {
            let result = cache.get(
                "{ broken",
                Box::new(|| {
                    computed.fetch_add(1, Ordering::SeqCst);
                    parse_document("{ broken")
                }),
            );
            assert!(result.is_err());
        }
        assert_eq!(computed.load(Ordering::SeqCst), 2);

        let noop = NoopDocumentCache;
        assert!(noop
            .get("{ a }", Box::new(|| parse_document("{ a }")))
            .is_ok());
    }
}
