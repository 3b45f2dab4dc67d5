pub mod document;
pub mod normalized;
pub mod persisted;

pub use document::{
    parse_document, DocumentCacheProvider, DocumentOrErrors, MokaDocumentCache, NoopDocumentCache,
    ParsedDocument,
};
pub use normalized::{
    MokaNormalizedDocumentCache, NoopNormalizedDocumentCache, NormalizationInput,
    NormalizedDocumentCacheProvider, NormalizedDocumentCreator, NormalizedDocumentEntry,
};
pub use persisted::PersistedQueryCache;
