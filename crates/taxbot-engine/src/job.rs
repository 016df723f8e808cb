use serde::{Deserialize, Serialize};

/// Marks a directive value as a symbolic alias.
pub const ALIAS_PREFIX: char = '$';

/// One unit of work: a property in a jurisdiction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub pid: String,
    pub fips: String,
}

impl Job {
    pub fn new(pid: impl Into<String>, fips: impl Into<String>) -> Self {
        Self {
            pid: pid.into(),
            fips: fips.into(),
        }
    }

    /// Resolve a directive value against this job's aliases.
    ///
    /// Values without the `$` prefix are returned as written. Unknown alias
    /// names come back as the bare name.
    pub fn resolve_alias(&self, value: &str) -> String {
        let Some(rest) = value.strip_prefix(ALIAS_PREFIX) else {
            return value.to_string();
        };
        let name = rest.trim_start_matches(ALIAS_PREFIX);
        match name {
            "PID" => self.pid.clone(),
            _ => name.to_string(),
        }
    }
}
