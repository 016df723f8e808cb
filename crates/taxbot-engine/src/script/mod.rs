//! Per-jurisdiction directive scripts.

pub mod loader;

pub use loader::{ScriptError, ScriptLoader};

use crate::directive::Directive;
use serde::Deserialize;

/// A parsed `<fips>.yaml` file. Only `form.steps` is read.
#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    pub form: Form,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Form {
    pub steps: Vec<Directive>,
}

impl Script {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn steps(&self) -> &[Directive] {
        &self.form.steps
    }

    pub fn into_steps(self) -> Vec<Directive> {
        self.form.steps
    }
}
