use graphql_execution_config::log::{LogLevel, LoggingConfig};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::{ParseError, Targets},
    util::TryInitError,
    Layer,
};

pub type DynLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, ParseError),
    #[error("Failed to install the global subscriber: {0}")]
    Init(#[from] TryInitError),
}

pub fn level_filter(log_level: LogLevel) -> LevelFilter {
    match log_level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

/// Target filter of the configured level, refined by the `filter` directives
/// (`target=level,...`) when present.
pub fn create_targets_filter(config: &LoggingConfig) -> Result<Targets, LoggingError> {
    let default_level = level_filter(config.level);
    let Some(filter) = config.filter.as_deref() else {
        return Ok(Targets::new().with_default(default_level));
    };

    let directives = filter
        .parse::<Targets>()
        .map_err(|err| LoggingError::InvalidFilter(filter.to_string(), err))?;
    Ok(directives.with_default(default_level))
}
