use std::{collections::HashMap, future::Future, sync::Arc};

use async_trait::async_trait;

use crate::{execution::error::FieldError, response::value::Value};

pub type ItemKey = String;

/// Loader output: one entry per item key it could load.
///
/// Keys absent from the map resolve to [`LoadedValue::Missing`].
pub type BatchLoadResult = Result<HashMap<ItemKey, Result<Value, FieldError>>, BatchLoadError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BatchLoadError {
    #[error("No batch loader registered for '{0}'")]
    UnknownLoader(String),
    #[error("Batch loader '{batch_key}' failed: {message}")]
    LoaderFailed { batch_key: String, message: String },
    #[error("Batch '{0}' was dropped before it was dispatched")]
    Dropped(String),
}

impl BatchLoadError {
    pub fn failed(batch_key: impl Into<String>, message: impl Into<String>) -> Self {
        BatchLoadError::LoaderFailed {
            batch_key: batch_key.into(),
            message: message.into(),
        }
    }
}

impl From<BatchLoadError> for FieldError {
    fn from(error: BatchLoadError) -> Self {
        FieldError::new(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadedValue {
    Found(Value),
    Missing,
}

impl LoadedValue {
    /// The loaded value, `null` for missing items.
    pub fn into_value(self) -> Value {
        match self {
            LoadedValue::Found(value) => value,
            LoadedValue::Missing => Value::Null,
        }
    }
}

/// Loads many items of one kind in a single call.
#[async_trait]
pub trait BatchLoader: Send + Sync + 'static {
    async fn load(&self, keys: Vec<ItemKey>) -> BatchLoadResult;
}

pub struct FnBatchLoader<F> {
    load: F,
}

#[async_trait]
impl<F, Fut> BatchLoader for FnBatchLoader<F>
where
    F: Fn(Vec<ItemKey>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BatchLoadResult> + Send + 'static,
{
    async fn load(&self, keys: Vec<ItemKey>) -> BatchLoadResult {
        (self.load)(keys).await
    }
}

pub fn batch_loader_fn<F, Fut>(load: F) -> Arc<dyn BatchLoader>
where
    F: Fn(Vec<ItemKey>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BatchLoadResult> + Send + 'static,
{
    Arc::new(FnBatchLoader { load })
}

/// Loaders by batch key. Shared by every request of an engine.
#[derive(Default, Clone)]
pub struct BatchLoaderRegistry {
    loaders: HashMap<String, Arc<dyn BatchLoader>>,
}

impl BatchLoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, batch_key: impl Into<String>, loader: Arc<dyn BatchLoader>) {
        self.loaders.insert(batch_key.into(), loader);
    }

    pub fn get(&self, batch_key: &str) -> Option<&Arc<dyn BatchLoader>> {
        self.loaders.get(batch_key)
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}
