use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxbotConfig {
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub interpreter: InterpreterConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    #[serde(default = "default_scripts_dir")]
    pub dir: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            dir: default_scripts_dir(),
        }
    }
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("yamls")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    #[serde(default = "default_lookup_timeout_secs")]
    pub lookup_timeout_secs: f64,
}

impl InterpreterConfig {
    /// Negative values clamp to zero; values no `Duration` can hold fall back
    /// to the default. `ConfigLoader` rejects those before they get here.
    pub fn lookup_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.lookup_timeout_secs.max(0.0))
            .unwrap_or_else(|_| Duration::from_secs_f64(default_lookup_timeout_secs()))
    }
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

fn default_lookup_timeout_secs() -> f64 {
    3.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
    /// Chromium binary handed to the WebDriver server.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    #[serde(default = "default_browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            binary: None,
            args: default_browser_args(),
        }
    }
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_browser_args() -> Vec<String> {
    [
        "--headless",
        "--disable-gpu",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu-sandbox",
        "--single-process",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_jobs_file")]
    pub jobs_file: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    /// Only run the first `limit` jobs.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            jobs_file: default_jobs_file(),
            output_file: default_output_file(),
            limit: None,
        }
    }
}

fn default_jobs_file() -> PathBuf {
    PathBuf::from("test.json")
}

fn default_output_file() -> PathBuf {
    PathBuf::from("out.json")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Where to save `<pid>.png` when a workflow aborts.
    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,
}
