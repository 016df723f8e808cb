//! Directive model for county workflow scripts.
//!
//! A script step is a single-key mapping from a directive tag to its data.
//! The data shape varies in YAML (a scalar for attribute-free directives, one
//! record or a list of records for element directives); it is normalized here
//! so the interpreter only ever sees a `Directive` with typed payloads.

use crate::modifier::Modifier;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_yaml::Value;
use std::time::Duration;
use taxbot_common::locator::Locator;

/// Record fields that name a selector strategy, in lookup priority order.
pub const SELECTOR_FIELDS: [&str; 5] = ["id", "selector", "class", "name", "xpath"];

#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    #[error("A step must be a mapping with exactly one directive, found {0} keys")]
    NotSingleKey(usize),

    #[error("A step must be a mapping, found {0}")]
    NotAMapping(String),

    #[error("Directive tag must be a string")]
    NonStringTag,

    #[error("Unknown directive '{0}'")]
    UnknownTag(String),

    #[error("Invalid data for '{tag}': {reason}")]
    InvalidData { tag: String, reason: String },
}

/// Directives that act on a located page element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementAction {
    EnterIframe,
    FillIn,
    ClickOn,
    Select,
    Return,
}

impl ElementAction {
    pub fn tag(&self) -> &'static str {
        match self {
            ElementAction::EnterIframe => "enter_iframe",
            ElementAction::FillIn => "fill_in",
            ElementAction::ClickOn => "click_on",
            ElementAction::Select => "select",
            ElementAction::Return => "return",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "enter_iframe" => Some(ElementAction::EnterIframe),
            "fill_in" => Some(ElementAction::FillIn),
            "click_on" => Some(ElementAction::ClickOn),
            "select" => Some(ElementAction::Select),
            "return" => Some(ElementAction::Return),
            _ => None,
        }
    }
}

/// One workflow step.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Visit(String),
    Wait(f64),
    Back,
    ExitIframe,
    Element {
        action: ElementAction,
        records: Vec<DirectiveRecord>,
    },
}

impl Directive {
    pub fn tag(&self) -> &'static str {
        match self {
            Directive::Visit(_) => "visit",
            Directive::Wait(_) => "wait",
            Directive::Back => "back",
            Directive::ExitIframe => "exit_iframe",
            Directive::Element { action, .. } => action.tag(),
        }
    }

    /// Build a directive from one raw script step.
    pub fn from_value(value: Value) -> Result<Self, DirectiveError> {
        let mapping = match value {
            Value::Mapping(m) => m,
            other => return Err(DirectiveError::NotAMapping(describe(&other).into())),
        };
        if mapping.len() != 1 {
            return Err(DirectiveError::NotSingleKey(mapping.len()));
        }
        let Some((key, data)) = mapping.into_iter().next() else {
            return Err(DirectiveError::NotSingleKey(0));
        };
        let Value::String(tag) = key else {
            return Err(DirectiveError::NonStringTag);
        };

        match tag.as_str() {
            "visit" => match data {
                Value::String(url) => Ok(Directive::Visit(url)),
                other => Err(invalid(&tag, format!("expected a URL, found {}", describe(&other)))),
            },
            "wait" => {
                let seconds = match &data {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                };
                match seconds {
                    Some(s) if s >= 0.0 && Duration::try_from_secs_f64(s).is_ok() => {
                        Ok(Directive::Wait(s))
                    }
                    _ => Err(invalid(
                        &tag,
                        "expected a non-negative number of seconds within range",
                    )),
                }
            }
            "back" => Ok(Directive::Back),
            "exit_iframe" => Ok(Directive::ExitIframe),
            other => {
                let action = ElementAction::from_tag(other)
                    .ok_or_else(|| DirectiveError::UnknownTag(other.to_string()))?;
                let records = records_from(&tag, data)?;
                Ok(Directive::Element { action, records })
            }
        }
    }
}

impl<'de> Deserialize<'de> for Directive {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Directive::from_value(value).map_err(de::Error::custom)
    }
}

fn records_from(tag: &str, data: Value) -> Result<Vec<DirectiveRecord>, DirectiveError> {
    let parse = |v: Value| {
        serde_yaml::from_value::<DirectiveRecord>(v).map_err(|e| invalid(tag, e.to_string()))
    };
    match data {
        Value::Sequence(items) => items.into_iter().map(parse).collect(),
        Value::Mapping(_) => Ok(vec![parse(data)?]),
        other => Err(invalid(
            tag,
            format!("expected a record or a list of records, found {}", describe(&other)),
        )),
    }
}

fn invalid(tag: &str, reason: impl Into<String>) -> DirectiveError {
    DirectiveError::InvalidData {
        tag: tag.to_string(),
        reason: reason.into(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Parameters for one application of an element directive.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DirectiveRecord {
    #[serde(default, deserialize_with = "scalar_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub selector: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub class: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub xpath: Option<String>,
    /// Literal to write, option to choose, or output key to bind.
    #[serde(default, deserialize_with = "scalar_string")]
    pub value: Option<String>,
    #[serde(default, rename = "mod")]
    pub modifier: Option<Modifier>,
    /// Fallback CSS selectors, tried in order.
    #[serde(default, deserialize_with = "alt_selectors")]
    pub alt_selector: Vec<String>,
}

impl DirectiveRecord {
    /// The authoritative locator: the first selector field present in
    /// `SELECTOR_FIELDS` order.
    pub fn locator(&self) -> Option<Locator> {
        if let Some(id) = &self.id {
            return Some(Locator::Id(id.clone()));
        }
        if let Some(selector) = &self.selector {
            return Some(Locator::Css(selector.clone()));
        }
        if let Some(class) = &self.class {
            return Some(Locator::ClassName(class.clone()));
        }
        if let Some(name) = &self.name {
            return Some(Locator::Name(name.clone()));
        }
        self.xpath.as_ref().map(|x| Locator::XPath(x.clone()))
    }

    pub fn is_try(&self) -> bool {
        self.modifier == Some(Modifier::Try)
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(v) => scalar_to_string(v).map(Some).map_err(de::Error::custom),
    }
}

fn scalar_to_string(value: Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected a scalar, found {}", describe(&other))),
    }
}

fn alt_selectors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(m)) => m.into_iter().map(|(_, v)| v).collect(),
        Some(Value::Sequence(items)) => items,
        Some(v) => vec![v],
    };
    values
        .into_iter()
        .map(|v| scalar_to_string(v).map_err(de::Error::custom))
        .collect()
}
