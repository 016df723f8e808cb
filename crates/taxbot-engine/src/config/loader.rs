use super::schema::TaxbotConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid value in config file {path:?}: {field}: {reason}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: String,
    },
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./taxbot.yaml
    /// 2. ~/.taxbot/config.yaml
    /// 3. Default configuration
    pub async fn load_default() -> Result<TaxbotConfig, ConfigError> {
        for candidate in Self::default_locations() {
            if candidate.exists() {
                return Self::load_from(&candidate).await;
            }
        }
        Ok(TaxbotConfig::default())
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from("./taxbot.yaml")];
        if let Some(home) = dirs::home_dir() {
            locations.push(home.join(".taxbot").join("config.yaml"));
        }
        locations
    }

    /// Read `path`. An empty file yields the defaults.
    pub async fn load_from(path: &Path) -> Result<TaxbotConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if content.trim().is_empty() {
            return Ok(TaxbotConfig::default());
        }
        let config: TaxbotConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::validate(path, &config)?;
        Ok(config)
    }

    fn validate(path: &Path, config: &TaxbotConfig) -> Result<(), ConfigError> {
        let secs = config.interpreter.lookup_timeout_secs;
        if secs.is_nan() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                field: "interpreter.lookup_timeout_secs",
                reason: "not a number".into(),
            });
        }
        Duration::try_from_secs_f64(secs.max(0.0)).map_err(|e| ConfigError::Invalid {
            path: path.to_path_buf(),
            field: "interpreter.lookup_timeout_secs",
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
