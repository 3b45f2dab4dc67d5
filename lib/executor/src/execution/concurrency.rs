use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};

/// Runs a set of futures concurrently and hands back their outputs in spawn order.
pub(crate) struct ConcurrencyScope<'exec, T> {
    jobs: FuturesUnordered<BoxFuture<'exec, (usize, T)>>,
    spawned: usize,
}

impl<'exec, T: Send + 'exec> ConcurrencyScope<'exec, T> {
    pub(crate) fn new() -> Self {
        Self {
            jobs: FuturesUnordered::new(),
            spawned: 0,
        }
    }

    pub(crate) fn spawn(&mut self, future: BoxFuture<'exec, T>) {
        let index = self.spawned;
        self.spawned += 1;
        self.jobs.push(Box::pin(async move { (index, future.await) }));
    }

    pub(crate) async fn join_all(mut self) -> Vec<T> {
        let mut results: Vec<Option<T>> = Vec::with_capacity(self.spawned);
        results.resize_with(self.spawned, || None);
        while let Some((index, result)) = self.jobs.next().await {
            results[index] = Some(result);
        }
        results.into_iter().flatten().collect()
    }
}
