//! Lifecycle phase events

use parking_lot::Mutex;
use std::sync::Arc;

use crate::browser::BrowserSession;
use fixturekit_common::CaseType;

/// Lifecycle phase kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    BeforeClass,
    BeforeTest,
    AfterTest,
    AfterClass,
    EndOfCase,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::BeforeClass => write!(f, "before_class"),
            Phase::BeforeTest => write!(f, "before_test"),
            Phase::AfterTest => write!(f, "after_test"),
            Phase::AfterClass => write!(f, "after_class"),
            Phase::EndOfCase => write!(f, "end_of_case"),
        }
    }
}

/// One lifecycle phase transition.
///
/// Built once per phase and handed by reference to every observer of that
/// dispatch.
#[derive(Debug, Clone, Copy)]
pub enum PhaseEvent<'a> {
    BeforeClass { case: &'a CaseType },
    BeforeTest { test: &'a TestMethod },
    AfterTest { test: &'a TestMethod },
    AfterClass { case: &'a CaseType, case_ended: bool },
    EndOfCase { case: &'a CaseType },
}

impl PhaseEvent<'_> {
    pub fn kind(&self) -> Phase {
        match self {
            PhaseEvent::BeforeClass { .. } => Phase::BeforeClass,
            PhaseEvent::BeforeTest { .. } => Phase::BeforeTest,
            PhaseEvent::AfterTest { .. } => Phase::AfterTest,
            PhaseEvent::AfterClass { .. } => Phase::AfterClass,
            PhaseEvent::EndOfCase { .. } => Phase::EndOfCase,
        }
    }

    /// Name of the case or test the event refers to
    pub fn subject(&self) -> String {
        match self {
            PhaseEvent::BeforeClass { case }
            | PhaseEvent::AfterClass { case, .. }
            | PhaseEvent::EndOfCase { case } => case.name.clone(),
            PhaseEvent::BeforeTest { test } | PhaseEvent::AfterTest { test } => {
                format!("{}::{}", test.case_name(), test.name())
            }
        }
    }
}

/// A running test method
#[derive(Debug)]
pub struct TestMethod {
    case: String,
    name: String,

    /// Runs in its own OS process, separate from the rest of the case
    isolated: bool,

    browser: Mutex<Option<Arc<BrowserSession>>>,
}

impl TestMethod {
    pub fn new(case: &CaseType, name: impl Into<String>) -> Self {
        Self {
            case: case.name.clone(),
            name: name.into(),
            isolated: false,
            browser: Mutex::new(None),
        }
    }

    pub fn isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }

    pub fn case_name(&self) -> &str {
        &self.case
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_isolated(&self) -> bool {
        self.isolated
    }

    /// Live browser session attached for this method, if the case drives a browser
    pub fn browser(&self) -> Option<Arc<BrowserSession>> {
        self.browser.lock().clone()
    }

    pub fn attach_browser(&self, session: Arc<BrowserSession>) {
        *self.browser.lock() = Some(session);
    }
}
