pub mod arguments;
pub mod completion;
pub(crate) mod concurrency;
pub mod error;
pub mod field_collector;
pub mod merged_field;
pub mod null_propagation;
pub mod operation;
pub mod path;
pub mod step_info;
pub(crate) mod strategy;
