//! fixturekit: fixture lifecycle orchestration
//!
//! Manages expensive shared resources across a test suite so each test
//! method can assume a known-good environment:
//! - the application instance
//! - database table contents
//! - a remote browser automation session
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Harness                                                    │
//! │    before_class / before_test / after_test / after_class    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FixturesManager (captures initial pid)                     │
//! │    └── Dispatcher: observers in registration order          │
//! │          ├── ApplicationFixtureManager   (ApplicationSlot)  │
//! │          ├── DatabaseFixtureManager      (TableStore)       │
//! │          └── BrowserSessionFixtureManager (RemoteEndpoint)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each manager reads the case's [`SharingPolicy`] at `BeforeClass` and uses
//! it to decide between reuse and recreation for the rest of the case.

pub mod application;
pub mod browser;
pub mod database;
pub mod dispatcher;
pub mod event;
pub mod locator;
pub mod orchestrator;
pub mod runner;
pub mod webdriver;

pub use application::{
    Application, ApplicationFactory, ApplicationFixtureManager, ApplicationHandle, ApplicationSlot,
    ConfigProvider,
};
pub use browser::{BrowserSession, BrowserSessionFixtureManager, Cookie, RemoteEndpoint, SessionOptions};
pub use database::{DatabaseFixtureManager, TableFixtures};
pub use dispatcher::{Dispatcher, FixtureObserver};
pub use event::{Phase, PhaseEvent, TestMethod};
pub use locator::{Location, Locator, Strategy};
pub use orchestrator::FixturesManager;
pub use runner::{CaseReport, CaseRunner, MethodSpec};
pub use webdriver::WebDriverClient;

pub use fixturekit_common::{CaseType, FixtureError, FixtureResult, FixturesConfig, SharingPolicy};
