//! # Chronoq Configuration System
//!
//! Hierarchical configuration for the deterministic event scheduler.
//!
//! ## Features
//! - **Unified Configuration**: one container for scheduler and telemetry settings
//! - **Validation**: runtime validation of pool sizing and log levels
//! - **Environment Awareness**: `CHRONOQ_*` overrides on top of YAML files

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod scheduler;
mod telemetry;
mod validation;

pub use error::ConfigError;
pub use scheduler::PoolConfig;
pub use scheduler::SchedulerConfig;
pub use telemetry::TelemetryConfig;

/// Default location of the base configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/chronoq.yaml";

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "CHRONOQ_";

/// Top‑level configuration container.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone, PartialEq)]
pub struct ChronoqConfig {
    /// Scheduler parameters (epoch, record pool).
    #[serde(default)]
    #[validate(nested)]
    pub scheduler: SchedulerConfig,

    /// Logging and metrics parameters.
    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl ChronoqConfig {
    /// Load configuration from the default file and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/chronoq.yaml`, skipped when missing
    /// 3. `CHRONOQ_*` environment variables, `__` separating nested keys
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ChronoqConfig::default()));

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }

        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific path, with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        Self::extract(
            Figment::from(Serialized::defaults(ChronoqConfig::default()))
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn default_config_validates() {
        let config = ChronoqConfig::default();
        config.validate().expect("default config should validate");
    }

    #[test]
    fn environment_override() {
        Jail::expect_with(|jail| {
            jail.set_env("CHRONOQ_SCHEDULER__EPOCH_NS", "1000");
            jail.set_env("CHRONOQ_SCHEDULER__POOL__CAPACITY", "64");
            let config = ChronoqConfig::load().expect("load");
            assert_eq!(config.scheduler.epoch_ns, 1000);
            assert_eq!(config.scheduler.pool.capacity, Some(64));
            Ok(())
        });
    }

    #[test]
    fn yaml_file_is_merged_over_defaults() {
        Jail::expect_with(|jail| {
            std::fs::create_dir(jail.directory().join("config")).expect("config dir");
            jail.create_file(
                "config/chronoq.yaml",
                r#"
scheduler:
  pool:
    chunk_size: 128
telemetry:
  log_level: debug
"#,
            )?;
            let config = ChronoqConfig::load().expect("load");
            assert_eq!(config.scheduler.pool.chunk_size, 128);
            assert_eq!(config.scheduler.epoch_ns, 0);
            assert_eq!(config.telemetry.log_level, "debug");
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ChronoqConfig::load_from_path("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bad.yaml",
                r#"
scheduler:
  pool:
    chunk_size: 100
"#,
            )?;
            let err = ChronoqConfig::load_from_path("bad.yaml").unwrap_err();
            assert!(matches!(err, ConfigError::Validation(_)));
            Ok(())
        });
    }
}
