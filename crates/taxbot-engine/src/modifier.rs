use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static NON_NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.]").unwrap());
static NEWLINE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\r?\n)+").unwrap());

/// Post-processing tag carried by a directive record's `mod` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modifier {
    /// Keep only digits and `.`.
    CleanInt,
    /// Collapse line-break runs into single spaces.
    CleanNewline,
    /// Element-not-found on this record is not fatal.
    Try,
}

impl Modifier {
    /// Transform extracted text. `Try` only changes failure policy.
    pub fn apply(&self, text: &str) -> String {
        match self {
            Modifier::CleanInt => clean_int(text),
            Modifier::CleanNewline => clean_newline(text),
            Modifier::Try => text.to_string(),
        }
    }
}

pub fn clean_int(text: &str) -> String {
    NON_NUMERIC_RE.replace_all(text, "").into_owned()
}

pub fn clean_newline(text: &str) -> String {
    NEWLINE_RUN_RE.replace_all(text, " ").trim().to_string()
}
