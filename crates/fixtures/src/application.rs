//! Application fixture
//!
//! Owns the single application instance of the process through an explicit
//! [`ApplicationSlot`]. The instance is built from a configuration provider:
//! server variables are exported, bootstrap scripts run once per process, and
//! the factory constructs the application from the configuration blob.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::dispatcher::FixtureObserver;
use crate::event::TestMethod;
use fixturekit_common::{ApplicationConfig, CaseType, FixtureError, FixtureResult};

/// Source of everything needed to build the application
pub trait ConfigProvider: Send + Sync {
    /// Bootstrap scripts, in execution order
    fn bootstrap_files(&self) -> Vec<PathBuf>;

    /// Environment variables exported before each build
    fn server_vars(&self) -> BTreeMap<String, String>;

    /// Opaque construction blob handed to the factory
    fn app_config(&self) -> serde_json::Value;
}

impl ConfigProvider for ApplicationConfig {
    fn bootstrap_files(&self) -> Vec<PathBuf> {
        self.bootstrap_files.clone()
    }

    fn server_vars(&self) -> BTreeMap<String, String> {
        self.server_vars.clone()
    }

    fn app_config(&self) -> serde_json::Value {
        self.app_config.clone()
    }
}

/// A running application instance
pub trait Application: Send + Sync {
    fn name(&self) -> &str;

    /// Release resources held by the instance
    fn shutdown(&self) {}
}

/// Builds application instances
pub trait ApplicationFactory: Send + Sync {
    fn build(&self, config: &serde_json::Value) -> FixtureResult<Arc<dyn Application>>;
}

impl<F> ApplicationFactory for F
where
    F: Fn(&serde_json::Value) -> FixtureResult<Arc<dyn Application>> + Send + Sync,
{
    fn build(&self, config: &serde_json::Value) -> FixtureResult<Arc<dyn Application>> {
        self(config)
    }
}

/// Runs bootstrap scripts
#[async_trait]
pub trait BootstrapExecutor: Send + Sync {
    async fn execute(&self, path: &Path, env: &BTreeMap<String, String>) -> FixtureResult<()>;
}

/// Runs each bootstrap script with `sh` as a child process
#[derive(Debug, Clone, Default)]
pub struct ProcessBootstrap;

#[async_trait]
impl BootstrapExecutor for ProcessBootstrap {
    async fn execute(&self, path: &Path, env: &BTreeMap<String, String>) -> FixtureResult<()> {
        let status = Command::new("sh")
            .arg(path)
            .envs(env)
            .status()
            .await
            .map_err(|e| FixtureError::Bootstrap {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(FixtureError::Bootstrap {
                path: path.display().to_string(),
                reason: status.to_string(),
            });
        }
        Ok(())
    }
}

/// The installed application plus the build it came from
#[derive(Clone)]
pub struct ApplicationHandle {
    instance: Arc<dyn Application>,
    generation: u64,
}

impl ApplicationHandle {
    pub fn instance(&self) -> &Arc<dyn Application> {
        &self.instance
    }

    /// 1 for the first build of the process, incremented on each rebuild
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for ApplicationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationHandle")
            .field("name", &self.instance.name())
            .field("generation", &self.generation)
            .finish()
    }
}

/// Single-owner slot holding at most one application instance.
///
/// Clones share the same slot, so tests read the current instance through
/// their own clone while the manager replaces it.
#[derive(Clone, Default)]
pub struct ApplicationSlot {
    inner: Arc<Mutex<Option<ApplicationHandle>>>,
}

impl ApplicationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ApplicationHandle> {
        self.inner.lock().clone()
    }

    pub fn is_occupied(&self) -> bool {
        self.inner.lock().is_some()
    }

    fn install(&self, handle: ApplicationHandle) {
        *self.inner.lock() = Some(handle);
    }

    fn take(&self) -> Option<ApplicationHandle> {
        self.inner.lock().take()
    }
}

/// Create and destroy counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationStats {
    pub created: u64,
    pub destroyed: u64,
}

/// Fixture manager for the application instance
pub struct ApplicationFixtureManager {
    provider: Option<Arc<dyn ConfigProvider>>,
    factory: Arc<dyn ApplicationFactory>,
    executor: Arc<dyn BootstrapExecutor>,
    slot: ApplicationSlot,

    /// Bootstrap scripts already run in this process
    bootstrapped: HashSet<PathBuf>,

    share_app: bool,
    stats: ApplicationStats,
}

impl ApplicationFixtureManager {
    pub fn new(factory: Arc<dyn ApplicationFactory>, slot: ApplicationSlot) -> Self {
        Self {
            provider: None,
            factory,
            executor: Arc::new(ProcessBootstrap),
            slot,
            bootstrapped: HashSet::new(),
            share_app: false,
            stats: ApplicationStats::default(),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn BootstrapExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn slot(&self) -> &ApplicationSlot {
        &self.slot
    }

    pub fn stats(&self) -> ApplicationStats {
        self.stats
    }

    /// Build a fresh application and install it, replacing any current one
    pub async fn create(&mut self) -> FixtureResult<()> {
        let provider = self.provider.clone().ok_or_else(|| {
            FixtureError::configuration("application config provider was not set before create")
        })?;

        if self.slot.is_occupied() {
            self.destroy();
        }

        let vars = provider.server_vars();
        for (name, value) in &vars {
            std::env::set_var(name, value);
        }

        for path in provider.bootstrap_files() {
            if self.bootstrapped.contains(&path) {
                continue;
            }
            debug!("Running bootstrap {}", path.display());
            self.executor.execute(&path, &vars).await?;
            self.bootstrapped.insert(path);
        }

        let instance = self.factory.build(&provider.app_config())?;
        self.stats.created += 1;
        info!("Created application {} (build {})", instance.name(), self.stats.created);

        self.slot.install(ApplicationHandle {
            instance,
            generation: self.stats.created,
        });
        Ok(())
    }

    /// Shut down and remove the current application; no-op when the slot is empty
    pub fn destroy(&mut self) {
        if let Some(handle) = self.slot.take() {
            handle.instance.shutdown();
            self.stats.destroyed += 1;
            debug!("Destroyed application build {}", handle.generation);
        }
    }
}

#[async_trait]
impl FixtureObserver for ApplicationFixtureManager {
    fn name(&self) -> &str {
        "application"
    }

    async fn on_before_class(&mut self, case: &CaseType) -> FixtureResult<()> {
        self.share_app = case.policy.share_app;
        self.create().await
    }

    async fn on_after_test(&mut self, test: &TestMethod) -> FixtureResult<()> {
        // The isolated child is about to exit; after_class cleans up
        if test.is_isolated() {
            return Ok(());
        }

        if self.slot.is_occupied() && !self.share_app {
            self.destroy();
        }

        // The next method must always start with a live instance
        if !self.slot.is_occupied() {
            self.create().await?;
        }
        Ok(())
    }

    async fn on_after_class(&mut self, _case: &CaseType, _case_ended: bool) -> FixtureResult<()> {
        self.destroy();
        Ok(())
    }
}
