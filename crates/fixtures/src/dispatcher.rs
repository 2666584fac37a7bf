//! Observer registry and phase dispatch

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::event::{PhaseEvent, TestMethod};
use fixturekit_common::{CaseType, FixtureResult};

/// A fixture manager reacting to lifecycle phases.
///
/// Every handler defaults to a no-op, so an observer only implements the
/// phases it cares about.
#[async_trait]
pub trait FixtureObserver: Send {
    /// Name used in logs
    fn name(&self) -> &str;

    async fn on_before_class(&mut self, _case: &CaseType) -> FixtureResult<()> {
        Ok(())
    }

    async fn on_before_test(&mut self, _test: &TestMethod) -> FixtureResult<()> {
        Ok(())
    }

    async fn on_after_test(&mut self, _test: &TestMethod) -> FixtureResult<()> {
        Ok(())
    }

    /// `case_ended` is false when running inside an isolated child process
    async fn on_after_class(&mut self, _case: &CaseType, _case_ended: bool) -> FixtureResult<()> {
        Ok(())
    }

    async fn on_end_of_case(&mut self, _case: &CaseType) -> FixtureResult<()> {
        Ok(())
    }
}

/// Ordered observer registry.
///
/// Observers run strictly in registration order, so register them in
/// dependency order: application, then database, then browser.
#[derive(Default)]
pub struct Dispatcher {
    observers: Vec<Box<dyn FixtureObserver>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<O: FixtureObserver + 'static>(&mut self, observer: O) {
        self.register_boxed(Box::new(observer));
    }

    pub fn register_boxed(&mut self, observer: Box<dyn FixtureObserver>) {
        debug!("Registered fixture observer: {}", observer.name());
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn observer_names(&self) -> Vec<String> {
        self.observers.iter().map(|o| o.name().to_string()).collect()
    }

    /// Deliver an event to every observer in order.
    ///
    /// Stops at the first failing handler; later observers are not invoked.
    pub async fn dispatch(&mut self, event: &PhaseEvent<'_>) -> FixtureResult<()> {
        let phase = event.kind();

        for observer in self.observers.iter_mut() {
            debug!(%phase, observer = observer.name(), subject = %event.subject(), "Dispatching");

            let result = match *event {
                PhaseEvent::BeforeClass { case } => observer.on_before_class(case).await,
                PhaseEvent::BeforeTest { test } => observer.on_before_test(test).await,
                PhaseEvent::AfterTest { test } => observer.on_after_test(test).await,
                PhaseEvent::AfterClass { case, case_ended } => {
                    observer.on_after_class(case, case_ended).await
                }
                PhaseEvent::EndOfCase { case } => observer.on_end_of_case(case).await,
            };

            if let Err(e) = result {
                warn!(%phase, observer = observer.name(), "Fixture observer failed: {}", e);
                return Err(e);
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("observers", &self.observer_names())
            .finish()
    }
}
