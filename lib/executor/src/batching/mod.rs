pub mod coordinator;
pub mod dispatch;
pub mod loader;

pub use coordinator::{BatchCoordinator, BatchHandle};
pub use dispatch::LevelDispatchStrategy;
pub use loader::{
    batch_loader_fn, BatchLoadError, BatchLoadResult, BatchLoader, BatchLoaderRegistry, ItemKey,
    LoadedValue,
};
