pub mod document_cache;
mod env_overrides;
pub mod execution;
pub mod log;
pub mod persisted_documents;

use std::path::PathBuf;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    document_cache::DocumentCacheConfig,
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    execution::ExecutionConfig,
    log::LoggingConfig,
    persisted_documents::PersistedDocumentsConfig,
};

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// The logger configuration.
    ///
    /// The engine is mostly silent at `info` level, printing only warnings and errors.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Operation execution settings: timeout and batched loading.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Cache of parsed documents, keyed by query text.
    #[serde(default)]
    pub document_cache: DocumentCacheConfig,

    /// Automatic persisted queries.
    #[serde(default)]
    pub persisted_documents: PersistedDocumentsConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "engine.config.yaml",
    "engine.config.yml",
    "engine.config.json",
];

/// Loads the configuration from `config_path`, or from the first default file
/// name found in the working directory, then applies environment overrides.
pub fn load_config(config_path: Option<String>) -> Result<EngineConfig, EngineConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();

    match config_path {
        Some(path) => {
            let as_file: File<FileSourceFile, _> = PathBuf::from(path).into();
            config = config.add_source(as_file.required(true));
        }
        None => {
            for name in DEFAULT_FILE_NAMES {
                config = config.add_source(File::with_name(name).required(false));
            }
        }
    }

    config = env_overrides.apply_overrides(config)?;

    Ok(config.build()?.try_deserialize::<EngineConfig>()?)
}

pub fn parse_yaml_config(config_raw: &str) -> Result<EngineConfig, EngineConfigError> {
    Config::builder()
        .add_source(File::from_str(config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<EngineConfig>()
        .map_err(EngineConfigError::ConfigLoadError)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use config::{Config, File, FileFormat};

    use crate::{
        env_overrides::EnvVarOverrides,
        log::{LogFormat, LogLevel},
        parse_yaml_config, EngineConfig,
    };

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_yaml_config("").unwrap();

        assert_eq!(config.execution.timeout, None);
        assert!(config.execution.batching);
        assert!(config.document_cache.enabled);
        assert_eq!(config.document_cache.max_entries, 1000);
        assert!(config.persisted_documents.is_disabled());
    }

    #[test]
    fn parses_durations_and_sections() {
        let config = parse_yaml_config(
            r#"
log:
  level: warn
  format: json
execution:
  timeout: 1500ms
  batching: false
document_cache:
  max_entries: 10
  ttl: 5m
persisted_documents:
  enabled: true
"#,
        )
        .unwrap();

        assert_eq!(config.log.level, LogLevel::Warn);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.execution.timeout, Some(Duration::from_millis(1500)));
        assert!(!config.execution.batching);
        assert_eq!(config.document_cache.max_entries, 10);
        assert_eq!(config.document_cache.ttl, Some(Duration::from_secs(300)));
        assert!(config.persisted_documents.enabled);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(parse_yaml_config("execution:\n  retries: 3\n").is_err());
    }

    #[test]
    fn env_overrides_take_precedence_over_file() {
        let overrides = EnvVarOverrides {
            log_level: Some(LogLevel::Error),
            log_format: None,
            log_filter: Some("graphql_execution_engine=trace".to_string()),
            execution_timeout: Some("2s".to_string()),
            document_cache_enabled: Some(false),
        };
        let builder = Config::builder().add_source(File::from_str(
            "log:\n  level: debug\nexecution:\n  timeout: 10s\n",
            FileFormat::Yaml,
        ));

        let config = overrides
            .apply_overrides(builder)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<EngineConfig>()
            .unwrap();

        assert_eq!(config.log.level, LogLevel::Error);
        assert_eq!(
            config.log.filter.as_deref(),
            Some("graphql_execution_engine=trace")
        );
        assert_eq!(config.execution.timeout, Some(Duration::from_secs(2)));
        assert!(!config.document_cache.enabled);
    }

    #[test]
    fn invalid_timeout_override_is_rejected() {
        let overrides = EnvVarOverrides {
            log_level: None,
            log_format: None,
            log_filter: None,
            execution_timeout: Some("soon".to_string()),
            document_cache_enabled: None,
        };

        assert!(overrides.apply_overrides(Config::builder()).is_err());
    }

    #[test]
    fn json_schema_describes_every_section() {
        let schema = schemars::schema_for!(EngineConfig);
        let properties = schema
            .as_value()
            .get("properties")
            .and_then(serde_json::Value::as_object)
            .unwrap();

        let mut sections: Vec<_> = properties.keys().map(String::as_str).collect();
        sections.sort();
        assert_eq!(
            sections,
            vec!["document_cache", "execution", "log", "persisted_documents"]
        );
    }
}
