//! Fixture lifecycle orchestrator
//!
//! The test harness calls the four phase entry points; the orchestrator turns
//! each call into a [`PhaseEvent`] and hands it to the dispatcher.

use std::sync::Arc;
use tracing::{debug, info};

use crate::application::{ApplicationFactory, ApplicationFixtureManager, ApplicationSlot};
use crate::browser::BrowserSessionFixtureManager;
use crate::database::{DatabaseFixtureManager, TableFixtures};
use crate::dispatcher::{Dispatcher, FixtureObserver};
use crate::event::{PhaseEvent, TestMethod};
use fixturekit_common::{CaseType, FixtureError, FixtureResult, FixturesConfig, SqliteTableStore};

/// Reports the id of the current OS process
pub type PidSource = Arc<dyn Fn() -> u32 + Send + Sync>;

/// Id of the calling process
pub fn current_pid() -> u32 {
    nix::unistd::getpid().as_raw() as u32
}

/// Fixture lifecycle orchestrator
pub struct FixturesManager {
    dispatcher: Dispatcher,
    pid_source: PidSource,

    /// Process that constructed the orchestrator
    initial_pid: u32,
}

impl FixturesManager {
    pub fn new() -> Self {
        Self::with_pid_source(Arc::new(current_pid))
    }

    /// Orchestrator with a custom pid source, captured immediately as the initial pid
    pub fn with_pid_source(pid_source: PidSource) -> Self {
        let initial_pid = pid_source();
        debug!("Fixture orchestrator created in process {}", initial_pid);
        Self {
            dispatcher: Dispatcher::new(),
            pid_source,
            initial_pid,
        }
    }

    /// Orchestrator with the standard managers registered in dependency order:
    /// application, database, then browser.
    pub fn from_config(
        config: &FixturesConfig,
        factory: Arc<dyn ApplicationFactory>,
        slot: ApplicationSlot,
    ) -> FixtureResult<(Self, TableFixtures)> {
        let mut manager = Self::new();

        let application = ApplicationFixtureManager::new(factory, slot)
            .with_provider(Arc::new(config.application.clone()));
        manager.register(application);

        let store = SqliteTableStore::open(&config.database.path, &config.database.fixtures_dir)?;
        let database = DatabaseFixtureManager::new(Arc::new(store));
        let fixtures = database.fixtures();
        manager.register(database);

        manager.register(BrowserSessionFixtureManager::from_config(&config.webdriver)?);

        info!("Registered fixture observers: {}", manager.dispatcher.observer_names().join(", "));
        Ok((manager, fixtures))
    }

    pub fn register<O: FixtureObserver + 'static>(&mut self, observer: O) {
        self.dispatcher.register(observer);
    }

    pub fn register_boxed(&mut self, observer: Box<dyn FixtureObserver>) {
        self.dispatcher.register_boxed(observer);
    }

    pub fn initial_pid(&self) -> u32 {
        self.initial_pid
    }

    pub async fn before_class(&mut self, case: &CaseType) -> FixtureResult<()> {
        self.dispatch(PhaseEvent::BeforeClass { case }).await
    }

    pub async fn before_test(&mut self, test: &TestMethod) -> FixtureResult<()> {
        self.dispatch(PhaseEvent::BeforeTest { test }).await
    }

    pub async fn after_test(&mut self, test: &TestMethod) -> FixtureResult<()> {
        self.dispatch(PhaseEvent::AfterTest { test }).await
    }

    /// Dispatch `AfterClass`, then `EndOfCase`.
    ///
    /// `case_ended` is false when called from a process other than the one
    /// that built the orchestrator, i.e. an isolated child whose case goes on
    /// in the parent.
    pub async fn after_class(&mut self, case: &CaseType) -> FixtureResult<()> {
        let case_ended = (self.pid_source)() == self.initial_pid;
        self.dispatch(PhaseEvent::AfterClass { case, case_ended }).await?;
        self.dispatch(PhaseEvent::EndOfCase { case }).await
    }

    async fn dispatch(&mut self, event: PhaseEvent<'_>) -> FixtureResult<()> {
        if self.dispatcher.is_empty() {
            return Err(FixtureError::configuration(format!(
                "no fixture observers registered before {}",
                event.kind()
            )));
        }
        self.dispatcher.dispatch(&event).await
    }
}

impl Default for FixturesManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FixturesManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixturesManager")
            .field("dispatcher", &self.dispatcher)
            .field("initial_pid", &self.initial_pid)
            .finish()
    }
}
