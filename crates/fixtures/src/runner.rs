//! Case runner that drives a case through the orchestrator

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::event::TestMethod;
use crate::orchestrator::FixturesManager;
use fixturekit_common::{CaseType, FixtureError, FixtureResult};

type MethodBody = Box<dyn Fn(Arc<TestMethod>) -> BoxFuture<'static, FixtureResult<()>> + Send + Sync>;

/// A test method to run: its name, isolation flag and body
pub struct MethodSpec {
    name: String,
    isolated: bool,
    body: MethodBody,
}

impl MethodSpec {
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(Arc<TestMethod>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FixtureResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            isolated: false,
            body: Box::new(move |test| body(test).boxed()),
        }
    }

    /// Mark the method as running in its own process
    pub fn isolated(mut self) -> Self {
        self.isolated = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Result of one test method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of one case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub case: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<MethodResult>,
}

impl CaseReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// Write the report as JSON into `output_dir`
    pub fn write(&self, output_dir: &Path) -> FixtureResult<PathBuf> {
        std::fs::create_dir_all(output_dir)?;

        let path = output_dir.join(format!("{}.json", self.case));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Runs the methods of a case with fixtures managed around each of them.
///
/// A failing method body is recorded and the case continues. A failing
/// fixture phase aborts the case: `after_class` is still attempted and the
/// phase error is returned.
pub struct CaseRunner<'a> {
    manager: &'a mut FixturesManager,
}

impl<'a> CaseRunner<'a> {
    pub fn new(manager: &'a mut FixturesManager) -> Self {
        Self { manager }
    }

    pub async fn run(&mut self, case: &CaseType, methods: &[MethodSpec]) -> FixtureResult<CaseReport> {
        let start = Instant::now();
        info!("Running case {} ({} method(s))", case, methods.len());

        if let Err(e) = self.manager.before_class(case).await {
            return Err(self.abort(case, e).await);
        }

        let mut results = Vec::with_capacity(methods.len());
        for method in methods {
            let test = Arc::new(TestMethod::new(case, method.name()).isolated(method.isolated));

            if let Err(e) = self.manager.before_test(&test).await {
                return Err(self.abort(case, e).await);
            }

            debug!("Running {}::{}", case, method.name());
            let method_start = Instant::now();
            let outcome = (method.body)(test.clone()).await;
            let duration_ms = method_start.elapsed().as_millis() as u64;

            match &outcome {
                Ok(()) => info!("✓ {} ({} ms)", method.name(), duration_ms),
                Err(e) => error!("✗ {} - {}", method.name(), e),
            }
            results.push(MethodResult {
                name: method.name().to_string(),
                success: outcome.is_ok(),
                duration_ms,
                error: outcome.err().map(|e| e.to_string()),
            });

            if let Err(e) = self.manager.after_test(&test).await {
                return Err(self.abort(case, e).await);
            }
        }

        self.manager.after_class(case).await?;

        let passed = results.iter().filter(|r| r.success).count();
        let report = CaseReport {
            case: case.name.clone(),
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms: start.elapsed().as_millis() as u64,
            results,
        };
        info!(
            "Case {}: {} passed, {} failed ({} ms)",
            report.case, report.passed, report.failed, report.duration_ms
        );
        Ok(report)
    }

    /// Tear the case down after a phase failure and hand back the original error
    async fn abort(&mut self, case: &CaseType, cause: FixtureError) -> FixtureError {
        error!("Aborting case {}: {}", case, cause);
        if let Err(e) = self.manager.after_class(case).await {
            warn!("Teardown of aborted case {} also failed: {}", case, e);
        }
        cause
    }
}
