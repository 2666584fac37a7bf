//! Page-object locator registry
//!
//! Maps aliases to element finder strategies so page objects can refer to
//! elements by name.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use fixturekit_common::{FixtureError, FixtureResult};

/// Element finder strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Id,
    Name,
    ClassName,
    CssSelector,
    XPath,
    LinkText,
    PartialLinkText,
    TagName,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Id => "id",
            Strategy::Name => "name",
            Strategy::ClassName => "class name",
            Strategy::CssSelector => "css selector",
            Strategy::XPath => "xpath",
            Strategy::LinkText => "link text",
            Strategy::PartialLinkText => "partial link text",
            Strategy::TagName => "tag name",
        }
    }
}

impl FromStr for Strategy {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Strategy::Id),
            "name" => Ok(Strategy::Name),
            "class name" | "class" => Ok(Strategy::ClassName),
            "css selector" | "css" => Ok(Strategy::CssSelector),
            "xpath" => Ok(Strategy::XPath),
            "link text" => Ok(Strategy::LinkText),
            "partial link text" => Ok(Strategy::PartialLinkText),
            "tag name" => Ok(Strategy::TagName),
            other => Err(FixtureError::invalid_argument(format!(
                "unknown locator strategy: {:?}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A strategy and the value it searches for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub strategy: Strategy,
    pub value: String,
}

impl Location {
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn as_pair(&self) -> (&'static str, &str) {
        (self.strategy.as_str(), &self.value)
    }

    /// Find-element request body.
    ///
    /// W3C endpoints only accept CSS, XPath, link text and tag name, so id,
    /// name and class lookups are rewritten as CSS selectors.
    pub fn to_request(&self) -> Value {
        let (using, value) = match self.strategy {
            Strategy::Id => ("css selector", format!("[id=\"{}\"]", escape_css(&self.value))),
            Strategy::Name => ("css selector", format!("[name=\"{}\"]", escape_css(&self.value))),
            Strategy::ClassName => ("css selector", format!(".{}", self.value)),
            other => (other.as_str(), self.value.clone()),
        };
        json!({ "using": using, "value": value })
    }
}

fn escape_css(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Alias registry
#[derive(Debug, Clone, Default)]
pub struct Locator {
    locations: BTreeMap<String, Location>,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `alias` for a `(strategy, value)` pair.
    ///
    /// An existing alias is only replaced when `overwrite` is set.
    pub fn add_location(
        &mut self,
        alias: &str,
        (strategy, value): (&str, &str),
        overwrite: bool,
    ) -> FixtureResult<()> {
        if alias.trim().is_empty() {
            return Err(FixtureError::invalid_argument("locator alias must not be empty"));
        }
        if value.is_empty() {
            return Err(FixtureError::invalid_argument(format!(
                "locator {:?} has an empty value",
                alias
            )));
        }
        let strategy: Strategy = strategy.parse()?;
        if strategy == Strategy::ClassName && value.chars().any(char::is_whitespace) {
            return Err(FixtureError::invalid_argument(format!(
                "locator {:?}: class name {:?} must be a single class",
                alias, value
            )));
        }

        if !overwrite && self.locations.contains_key(alias) {
            return Err(FixtureError::invalid_state(format!(
                "locator {:?} already exists",
                alias
            )));
        }

        self.locations
            .insert(alias.to_string(), Location::new(strategy, value));
        Ok(())
    }

    pub fn get_location(&self, alias: &str) -> FixtureResult<&Location> {
        self.locations
            .get(alias)
            .ok_or_else(|| FixtureError::invalid_argument(format!("unknown locator {:?}", alias)))
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.locations.contains_key(alias)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }
}
