use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use crate::batching::coordinator::BatchCoordinator;

#[derive(Default, Debug, Clone, PartialEq)]
struct LevelCounters {
    expected_fields: usize,
    fetched_fields: usize,
    reported_fields: usize,
    expected_objects: usize,
    started_objects: usize,
    dispatched: bool,
}

#[derive(Default, Debug)]
struct CallStack {
    levels: Vec<LevelCounters>,
}

impl CallStack {
    fn level_mut(&mut self, level: usize) -> &mut LevelCounters {
        if self.levels.len() <= level {
            self.levels.resize_with(level + 1, LevelCounters::default);
        }
        &mut self.levels[level]
    }

    /// Levels that just became ready for dispatch.
    ///
    /// The fields of level `L` are all known once every object of level
    /// `L - 1` has started, and those objects are all known once every field of
    /// level `L - 1` reported how many child objects it has. A level is ready
    /// when all of its fields are known and each of them invoked its resolver.
    fn take_ready(&mut self) -> Vec<usize> {
        let mut ready = Vec::new();
        let mut objects_known = true;
        for level in 1..self.levels.len() {
            let parent = &self.levels[level - 1];
            if !(objects_known && parent.started_objects == parent.expected_objects) {
                break;
            }
            let current = &mut self.levels[level];
            if !current.dispatched && current.fetched_fields == current.expected_fields {
                current.dispatched = true;
                ready.push(level);
            }
            objects_known = current.reported_fields == current.expected_fields;
        }
        ready
    }
}

/// Dispatches batched loads level by level.
///
/// The execution strategy reports tree progress here; once every field of a
/// level that may register a batch item has invoked its resolver, the pending
/// batches of that level are flushed in one go.
pub struct LevelDispatchStrategy {
    coordinator: Arc<BatchCoordinator>,
    stack: Mutex<CallStack>,
}

impl LevelDispatchStrategy {
    pub fn new(coordinator: Arc<BatchCoordinator>) -> Self {
        LevelDispatchStrategy {
            coordinator,
            stack: Mutex::new(CallStack::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CallStack> {
        self.stack
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts counting from the operation root with `field_count` root fields.
    ///
    /// Serial mutation roots call this once per root field.
    pub fn begin_root(&self, field_count: usize) {
        {
            let mut stack = self.lock();
            *stack = CallStack::default();
            let root = stack.level_mut(0);
            root.expected_objects = 1;
            root.started_objects = 1;
            stack.level_mut(1).expected_fields = field_count;
        }
        self.coordinator.reset_levels();
        self.dispatch_ready();
    }

    /// An object at `level` starts executing `field_count` fields at `level + 1`.
    pub fn object_started(&self, level: usize, field_count: usize) {
        {
            let mut stack = self.lock();
            stack.level_mut(level).started_objects += 1;
            stack.level_mut(level + 1).expected_fields += field_count;
        }
        self.dispatch_ready();
    }

    /// A field at `level` invoked its resolver and polled the result once.
    pub fn field_fetched(&self, level: usize) {
        self.lock().level_mut(level).fetched_fields += 1;
        self.dispatch_ready();
    }

    /// A field at `level` resolved and will start `child_objects` objects at `level`.
    pub fn field_value_reported(&self, level: usize, child_objects: usize) {
        {
            let mut stack = self.lock();
            let counters = stack.level_mut(level);
            counters.reported_fields += 1;
            counters.expected_objects += child_objects;
        }
        self.dispatch_ready();
    }

    fn dispatch_ready(&self) {
        let ready = self.lock().take_ready();
        for level in ready {
            trace!(level, "dispatching batches of level");
            self.coordinator.dispatch_level(level);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use super::LevelDispatchStrategy;
    use crate::batching::{
        coordinator::BatchCoordinator,
        loader::{batch_loader_fn, BatchLoaderRegistry},
    };

    fn coordinator(calls: Arc<Mutex<Vec<Vec<String>>>>) -> Arc<BatchCoordinator> {
        let mut registry = BatchLoaderRegistry::new();
        registry.register(
            "items",
            batch_loader_fn(move |keys| {
                calls.lock().unwrap().push(keys);
                async { Ok(HashMap::new()) }
            }),
        );
        Arc::new(BatchCoordinator::new(Arc::new(registry)))
    }

    #[test]
    fn waits_for_every_field_of_a_level() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let coordinator = coordinator(calls.clone());
        let strategy = LevelDispatchStrategy::new(coordinator.clone());

        strategy.begin_root(2);
        let _first = coordinator.register("items", "a".to_string(), Some(1));
        strategy.field_fetched(1);
        assert!(!coordinator.is_level_dispatched(1));

        let _second = coordinator.register("items", "b".to_string(), Some(1));
        strategy.field_fetched(1);
        assert!(coordinator.is_level_dispatched(1));
        assert_eq!(coordinator.pending_len(), 0);
        assert!(!coordinator.is_level_dispatched(2));
    }

    #[test]
    fn next_level_waits_for_child_object_counts() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let coordinator = coordinator(calls);
        let strategy = LevelDispatchStrategy::new(coordinator.clone());

        strategy.begin_root(2);
        strategy.field_fetched(1);
        strategy.field_fetched(1);
        assert!(coordinator.is_level_dispatched(1));

        // First root field returns a list of two objects, each with one field.
        strategy.field_value_reported(1, 2);
        strategy.object_started(1, 1);
        strategy.object_started(1, 1);
        strategy.field_fetched(2);
        strategy.field_fetched(2);
        assert!(!coordinator.is_level_dispatched(2));

        // Second root field is a leaf.
        strategy.field_value_reported(1, 0);
        assert!(coordinator.is_level_dispatched(2));
    }
}
