use serde::{Deserialize, Serialize};
use std::fmt;

/// How a page element is looked up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "strategy", content = "value")]
pub enum Locator {
    Id(String),
    Css(String),
    ClassName(String),
    Name(String),
    XPath(String),
}

impl Locator {
    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::Css(_) => "css selector",
            Locator::ClassName(_) => "class name",
            Locator::Name(_) => "name",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::Css(v)
            | Locator::ClassName(v)
            | Locator::Name(v)
            | Locator::XPath(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.strategy(), self.value())
    }
}

/// Opaque handle to an element the capability has located.
///
/// Handles are only meaningful to the backend that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub u32);

impl ElementRef {
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
