use std::{
    future::Future,
    panic::AssertUnwindSafe,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard},
    task::{Context, Poll},
};

use ahash::{HashMap, HashSet};
use futures::{
    channel::oneshot,
    future::{BoxFuture, Shared},
    FutureExt,
};
use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::{
    batching::loader::{BatchLoadError, BatchLoadResult, BatchLoaderRegistry, ItemKey, LoadedValue},
    execution::error::FieldError,
};

type SharedBatch = Shared<BoxFuture<'static, Arc<BatchLoadResult>>>;

#[derive(Default)]
struct PendingBatch {
    level: Option<usize>,
    waiters: IndexMap<ItemKey, Vec<oneshot::Sender<SharedBatch>>>,
}

#[derive(Default)]
struct CoordinatorState {
    pending: IndexMap<(String, Option<usize>), PendingBatch>,
    loaded: HashMap<String, HashMap<ItemKey, SharedBatch>>,
    dispatched_levels: HashSet<usize>,
}

/// Per request registration table for batched loads.
///
/// Resolvers register item keys, the dispatch strategy decides when pending
/// registrations are flushed to their loaders. Loaded items are memoized for
/// the rest of the request.
pub struct BatchCoordinator {
    loaders: Arc<BatchLoaderRegistry>,
    state: Mutex<CoordinatorState>,
}

impl BatchCoordinator {
    pub fn new(loaders: Arc<BatchLoaderRegistry>) -> Self {
        BatchCoordinator {
            loaders,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `item_key` with the loader of `batch_key`.
    ///
    /// `level` binds the registration to a tree level. Without a level the
    /// handle flushes its batch as soon as it is polled.
    pub fn register(
        self: &Arc<Self>,
        batch_key: &str,
        item_key: ItemKey,
        level: Option<usize>,
    ) -> BatchHandle {
        let mut handle = BatchHandle {
            batch_key: batch_key.to_string(),
            item_key,
            level,
            flushed: false,
            coordinator: self.clone(),
            state: HandleState::Done,
        };

        if self.loaders.get(batch_key).is_none() {
            handle.state = HandleState::Failed(BatchLoadError::UnknownLoader(batch_key.to_string()));
            return handle;
        }

        let mut state = self.lock();
        if let Some(shared) = state
            .loaded
            .get(batch_key)
            .and_then(|items| items.get(&handle.item_key))
        {
            trace!(batch_key, item_key = %handle.item_key, "batch item served from request cache");
            handle.state = HandleState::Loading(shared.clone());
            return handle;
        }

        let (sender, receiver) = oneshot::channel();
        let pending = state
            .pending
            .entry((batch_key.to_string(), level))
            .or_default();
        pending.level = level;
        pending
            .waiters
            .entry(handle.item_key.clone())
            .or_default()
            .push(sender);
        handle.state = HandleState::Waiting(receiver);
        handle
    }

    /// Number of registrations waiting for a dispatch.
    pub fn pending_len(&self) -> usize {
        self.lock()
            .pending
            .values()
            .map(|batch| batch.waiters.len())
            .sum()
    }

    /// Flushes every pending registration.
    pub fn dispatch(&self) {
        let batches: Vec<_> = self.lock().pending.drain(..).collect();
        for ((batch_key, _), batch) in batches {
            self.start_batch(batch_key, batch);
        }
    }

    /// Flushes pending registrations of one loader.
    pub fn dispatch_key(&self, batch_key: &str) {
        self.dispatch_matching(|key, _| key == batch_key);
    }

    /// Flushes the registrations of one loader that are unbound or bound to a
    /// passed level. Deeper levels keep collecting until their barrier.
    fn dispatch_ready(&self, batch_key: &str) {
        self.dispatch_matching(|key, passed| key == batch_key && passed);
    }

    fn dispatch_matching<F>(&self, matches: F)
    where
        F: Fn(&str, bool) -> bool,
    {
        let batches: Vec<_> = {
            let mut state = self.lock();
            let keys: Vec<_> = state
                .pending
                .iter()
                .filter(|((key, _), batch)| {
                    let passed = batch
                        .level
                        .map_or(true, |level| state.dispatched_levels.contains(&level));
                    matches(key, passed)
                })
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| state.pending.swap_remove_entry(&key))
                .collect()
        };
        for ((batch_key, _), batch) in batches {
            self.start_batch(batch_key, batch);
        }
    }

    /// Marks `level` as passed and flushes registrations bound to it or above it.
    pub(crate) fn dispatch_level(&self, level: usize) {
        let batches: Vec<_> = {
            let mut state = self.lock();
            state.dispatched_levels.insert(level);
            let keys: Vec<_> = state
                .pending
                .iter()
                .filter(|(_, batch)| batch.level.map_or(true, |l| l <= level))
                .map(|(key, _)| key.clone())
                .collect();
            keys.into_iter()
                .filter_map(|key| state.pending.swap_remove_entry(&key))
                .collect()
        };
        for ((batch_key, _), batch) in batches {
            self.start_batch(batch_key, batch);
        }
    }

    pub(crate) fn reset_levels(&self) {
        self.lock().dispatched_levels.clear();
    }

    pub fn is_level_dispatched(&self, level: usize) -> bool {
        self.lock().dispatched_levels.contains(&level)
    }

    fn start_batch(&self, batch_key: String, batch: PendingBatch) {
        let keys: Vec<ItemKey> = batch.waiters.keys().cloned().collect();
        trace!(batch_key = %batch_key, items = keys.len(), "dispatching batch");

        let shared: SharedBatch = match self.loaders.get(&batch_key).cloned() {
            Some(loader) => {
                let loader_key = batch_key.clone();
                async move {
                    let result = AssertUnwindSafe(loader.load(keys))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| {
                            warn!(batch_key = %loader_key, "batch loader panicked");
                            Err(BatchLoadError::failed(loader_key, "loader panicked"))
                        });
                    Arc::new(result)
                }
                .boxed()
                .shared()
            }
            None => {
                let error = BatchLoadError::UnknownLoader(batch_key.clone());
                async move { Arc::new(Err(error)) }.boxed().shared()
            }
        };

        {
            let mut state = self.lock();
            let memo = state.loaded.entry(batch_key).or_default();
            for item_key in batch.waiters.keys() {
                memo.insert(item_key.clone(), shared.clone());
            }
        }

        for (_, senders) in batch.waiters {
            for sender in senders {
                // The receiving handle may already be gone with its field.
                let _ = sender.send(shared.clone());
            }
        }
    }
}

enum HandleState {
    Waiting(oneshot::Receiver<SharedBatch>),
    Loading(SharedBatch),
    Failed(BatchLoadError),
    Done,
}

/// Future resolving to one item of a batch.
pub struct BatchHandle {
    batch_key: String,
    item_key: ItemKey,
    level: Option<usize>,
    flushed: bool,
    coordinator: Arc<BatchCoordinator>,
    state: HandleState,
}

impl BatchHandle {
    pub fn item_key(&self) -> &str {
        &self.item_key
    }

    fn may_flush(&self) -> bool {
        match self.level {
            None => true,
            Some(level) => self.coordinator.is_level_dispatched(level),
        }
    }
}

impl Future for BatchHandle {
    type Output = Result<LoadedValue, FieldError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                HandleState::Waiting(receiver) => match Pin::new(receiver).poll(cx) {
                    Poll::Ready(Ok(shared)) => this.state = HandleState::Loading(shared),
                    Poll::Ready(Err(_)) => {
                        this.state = HandleState::Done;
                        return Poll::Ready(Err(
                            BatchLoadError::Dropped(this.batch_key.clone()).into()
                        ));
                    }
                    Poll::Pending => {
                        // Registered after its level was dispatched: nobody else will flush it.
                        if !this.flushed && this.may_flush() {
                            this.flushed = true;
                            this.coordinator.dispatch_ready(&this.batch_key);
                            continue;
                        }
                        return Poll::Pending;
                    }
                },
                HandleState::Loading(shared) => {
                    let result = match Pin::new(shared).poll(cx) {
                        Poll::Ready(result) => result,
                        Poll::Pending => return Poll::Pending,
                    };
                    this.state = HandleState::Done;
                    return Poll::Ready(match result.as_ref() {
                        Ok(items) => match items.get(&this.item_key) {
                            Some(Ok(value)) => Ok(LoadedValue::Found(value.clone())),
                            Some(Err(error)) => Err(error.clone()),
                            None => Ok(LoadedValue::Missing),
                        },
                        Err(error) => Err(error.clone().into()),
                    });
                }
                HandleState::Failed(error) => {
                    let error = error.clone();
                    this.state = HandleState::Done;
                    return Poll::Ready(Err(error.into()));
                }
                HandleState::Done => {
                    return Poll::Ready(Err(FieldError::new("batch handle polled after completion")))
                }
            }
        }
    }
}
