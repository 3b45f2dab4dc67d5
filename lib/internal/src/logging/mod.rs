pub mod stdout;
pub mod utils;

use graphql_execution_config::log::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Registry};

use crate::logging::{
    stdout::build_stdout_layer,
    utils::{DynLayer, LoggingError},
};

pub fn logging_layers_from_logger_config<S>(
    config: &LoggingConfig,
) -> Result<(Vec<DynLayer<S>>, Vec<WorkerGuard>), LoggingError>
where
    S: tracing::Subscriber
        + for<'span> tracing_subscriber::registry::LookupSpan<'span>
        + Send
        + Sync,
{
    let (layer, guard) = build_stdout_layer(config)?;
    Ok((vec![layer], vec![guard]))
}

/// Installs the global subscriber described by `config`.
///
/// Keep the returned guards alive for as long as logs should be flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Vec<WorkerGuard>, LoggingError> {
    let (layers, guards) = logging_layers_from_logger_config::<Registry>(config)?;
    tracing_subscriber::registry().with(layers).try_init()?;
    Ok(guards)
}
