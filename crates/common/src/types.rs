//! Core types for fixturekit

use serde::{Deserialize, Serialize};

/// Per-case sharing configuration.
///
/// Resolved once when a case begins and threaded through every later phase
/// of that case. The next case resolves its own policy from scratch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharingPolicy {
    /// Keep one application instance for every method of the case
    pub share_app: bool,

    /// Keep loaded table fixtures across methods
    pub share_db_fixture: bool,

    /// Keep one browser session across methods
    pub share_browser_session: bool,

    /// Keep browser cookies across methods (only meaningful with a shared session)
    pub share_cookies: bool,

    /// Tables requiring fixture data
    pub tables: Vec<String>,
}

impl SharingPolicy {
    /// Policy that shares every fixture
    pub fn shared() -> Self {
        Self {
            share_app: true,
            share_db_fixture: true,
            share_browser_session: true,
            share_cookies: true,
            tables: Vec::new(),
        }
    }

    pub fn with_tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables = tables.into_iter().map(Into::into).collect();
        self
    }
}

/// A test-case type: its name, its declared policy, and whether it needs a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseType {
    pub name: String,

    #[serde(default)]
    pub policy: SharingPolicy,

    /// Marker for cases that drive a browser
    #[serde(default)]
    pub requires_browser: bool,
}

impl CaseType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: SharingPolicy::default(),
            requires_browser: false,
        }
    }

    /// Browser-driven case
    pub fn browser(name: impl Into<String>) -> Self {
        Self {
            requires_browser: true,
            ..Self::new(name)
        }
    }

    pub fn with_policy(mut self, policy: SharingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Tables requiring fixture data
    pub fn fixture_tables(&self) -> &[String] {
        &self.policy.tables
    }
}

impl std::fmt::Display for CaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
