use super::Script;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Invalid jurisdiction code '{0}'")]
    InvalidFips(String),
    #[error("Failed to read script {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse script {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Loads directive scripts from `<dir>/<fips>.yaml`.
#[derive(Debug, Clone)]
pub struct ScriptLoader {
    dir: PathBuf,
}

impl ScriptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, fips: &str) -> Result<PathBuf, ScriptError> {
        let valid = !fips.is_empty()
            && fips
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(ScriptError::InvalidFips(fips.to_string()));
        }
        Ok(self.dir.join(format!("{fips}.yaml")))
    }

    pub async fn load(&self, fips: &str) -> Result<Script, ScriptError> {
        let path = self.path_for(fips)?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ScriptError::Io {
                path: path.clone(),
                source,
            })?;
        Script::from_yaml(&content).map_err(|source| ScriptError::Parse { path, source })
    }
}
