//! Table fixture manager

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::dispatcher::FixtureObserver;
use crate::event::TestMethod;
use fixturekit_common::{CaseType, FixtureResult, TableStore};

/// Handle for loading and unloading tables from inside a test.
///
/// Unloading a table marks it for reload before the next test method, even
/// when the case shares its table fixtures.
#[derive(Clone)]
pub struct TableFixtures {
    store: Arc<dyn TableStore>,
    loaded: Arc<Mutex<BTreeSet<String>>>,
}

impl TableFixtures {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            store,
            loaded: Arc::new(Mutex::new(BTreeSet::new())),
        }
    }

    pub fn load(&self, tables: &[String]) -> FixtureResult<()> {
        if tables.is_empty() {
            return Ok(());
        }
        self.store.load(tables)?;
        self.loaded.lock().extend(tables.iter().cloned());
        Ok(())
    }

    pub fn unload(&self, tables: &[String]) -> FixtureResult<()> {
        if tables.is_empty() {
            return Ok(());
        }
        self.store.unload(tables)?;
        let mut loaded = self.loaded.lock();
        for table in tables {
            loaded.remove(table);
        }
        Ok(())
    }

    pub fn is_loaded(&self, table: &str) -> bool {
        self.loaded.lock().contains(table)
    }

    pub fn loaded_tables(&self) -> Vec<String> {
        self.loaded.lock().iter().cloned().collect()
    }

    /// Forget what is loaded so every table is reloaded on next use
    fn forget(&self) {
        self.loaded.lock().clear();
    }
}

/// Fixture manager for table contents
pub struct DatabaseFixtureManager {
    fixtures: TableFixtures,
    share_fixture: bool,
    tables: Vec<String>,
}

impl DatabaseFixtureManager {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            fixtures: TableFixtures::new(store),
            share_fixture: false,
            tables: Vec::new(),
        }
    }

    pub fn fixtures(&self) -> TableFixtures {
        self.fixtures.clone()
    }
}

#[async_trait]
impl FixtureObserver for DatabaseFixtureManager {
    fn name(&self) -> &str {
        "database"
    }

    async fn on_before_class(&mut self, case: &CaseType) -> FixtureResult<()> {
        // Contents left by a case that never reached EndOfCase are not trusted
        self.fixtures.forget();
        self.share_fixture = case.policy.share_db_fixture;
        self.tables = case.fixture_tables().to_vec();
        Ok(())
    }

    async fn on_before_test(&mut self, _test: &TestMethod) -> FixtureResult<()> {
        let pending: Vec<String> = if self.share_fixture {
            self.tables
                .iter()
                .filter(|t| !self.fixtures.is_loaded(t))
                .cloned()
                .collect()
        } else {
            self.tables.clone()
        };

        if !pending.is_empty() {
            debug!("Loading fixture tables: {}", pending.join(", "));
        }
        self.fixtures.load(&pending)
    }

    async fn on_after_class(&mut self, case: &CaseType, case_ended: bool) -> FixtureResult<()> {
        // Table contents are shared with the parent process, which still runs the case
        if !case_ended {
            debug!("Keeping tables of {} loaded for the parent process", case);
            return Ok(());
        }
        self.fixtures.unload(&self.fixtures.loaded_tables())
    }

    async fn on_end_of_case(&mut self, _case: &CaseType) -> FixtureResult<()> {
        self.share_fixture = false;
        self.tables.clear();
        Ok(())
    }
}
