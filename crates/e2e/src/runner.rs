//! Main test runner: one isolated session per spec, retention at teardown

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use pwdemo_retention::{
    ArtifactKind, BrowserSession, Outcome, RetentionConfig, RetentionController, RetentionReport,
    TestExecutionRecord,
};

use crate::error::{E2eError, E2eResult};
use crate::playwright::{PlaywrightConfig, PlaywrightLauncher};
use crate::spec::TestSpec;

/// How a spec's steps went
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// 1-based index of the failing step
    pub failed_step: Option<usize>,
    pub error: Option<String>,
    /// Debug captures taken during the run
    pub screenshots: Vec<PathBuf>,
}

/// A browser session that can run a whole spec
#[async_trait]
pub trait SpecSession: BrowserSession {
    async fn execute(&self, spec: &TestSpec) -> E2eResult<ExecutionOutcome>;
}

/// Opens a fresh session for each test
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: SpecSession;

    async fn launch(&self, spec: &TestSpec, controller: &RetentionController) -> E2eResult<Self::Session>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub error: Option<String>,
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    pub artifacts: ArtifactSummary,
}

/// What retention left on disk for a test
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub video: Option<PathBuf>,
    pub screenshot: Option<PathBuf>,
    pub debug_screenshots: Vec<PathBuf>,
    /// Retention problems; informational, never affect `success`
    pub issues: Vec<String>,
}

impl ArtifactSummary {
    fn from_report(report: &RetentionReport, debug_screenshots: Vec<PathBuf>) -> Self {
        Self {
            video: report.retained_of(ArtifactKind::Video).map(|a| a.path.clone()),
            screenshot: report.retained_of(ArtifactKind::Screenshot).map(|a| a.path.clone()),
            debug_screenshots,
            issues: report.issue_messages(),
        }
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    pub fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }

    /// Only test outcomes count; retention issues never fail the suite
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub retention: RetentionConfig,
    pub specs_dir: PathBuf,
    /// Where `test-results.json` goes
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        let retention = RetentionConfig::default();
        Self {
            playwright: PlaywrightConfig::default(),
            output_dir: retention.work_dir.clone(),
            retention,
            specs_dir: PathBuf::from("tests/e2e/specs"),
        }
    }
}

/// Main E2E test runner
pub struct TestRunner<L: SessionLauncher = PlaywrightLauncher> {
    launcher: L,
    controller: RetentionController,
    specs_dir: PathBuf,
    output_dir: PathBuf,
}

impl TestRunner<PlaywrightLauncher> {
    /// Runner backed by real Playwright sessions
    pub fn with_config(config: RunnerConfig) -> E2eResult<Self> {
        config.retention.validate()?;
        let launcher = PlaywrightLauncher::new(config.playwright.clone())?;
        Ok(Self::with_launcher(config, launcher))
    }
}

impl<L: SessionLauncher> TestRunner<L> {
    pub fn with_launcher(config: RunnerConfig, launcher: L) -> Self {
        Self {
            launcher,
            controller: RetentionController::new(config.retention),
            specs_dir: config.specs_dir,
            output_dir: config.output_dir,
        }
    }

    pub fn controller(&self) -> &RetentionController {
        &self.controller
    }

    /// Run all tests in the specs directory
    pub async fn run_all(&self) -> E2eResult<TestSuiteResult> {
        let specs = TestSpec::load_all(&self.specs_dir)?;
        Ok(self.run_specs(&specs).await)
    }

    /// Run tests matching a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<TestSuiteResult> {
        let specs: Vec<TestSpec> = TestSpec::load_all(&self.specs_dir)?
            .into_iter()
            .filter(|s| s.has_tag(tag))
            .collect();
        Ok(self.run_specs(&specs).await)
    }

    /// Run a specific test by name
    pub async fn run_test(&self, name: &str) -> E2eResult<TestSuiteResult> {
        let spec = TestSpec::load_all(&self.specs_dir)?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::TestNotFound(name.to_string()))?;
        Ok(self.run_specs(std::slice::from_ref(&spec)).await)
    }

    /// Run a list of test specs. A spec that cannot even start counts as
    /// a failed test rather than aborting the suite.
    pub async fn run_specs(&self, specs: &[TestSpec]) -> TestSuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());

        info!("Running {} test(s)...", specs.len());

        for spec in specs {
            let result = match self.run_spec(spec).await {
                Ok(result) => result,
                Err(e) => TestResult {
                    name: spec.name.clone(),
                    success: false,
                    duration_ms: 0,
                    steps: vec![],
                    error: Some(e.to_string()),
                    artifacts: ArtifactSummary::default(),
                },
            };

            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let suite = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        suite
    }

    /// Run a single test spec, then apply retention to its artifacts
    pub async fn run_spec(&self, spec: &TestSpec) -> E2eResult<TestResult> {
        let start = Instant::now();
        debug!("Running test: {}", spec.name);

        let mut record = TestExecutionRecord::start(&spec.name);
        let session = self.launcher.launch(spec, &self.controller).await?;

        let execution = match session.execute(spec).await {
            Ok(execution) => execution,
            Err(e) => {
                warn!("[{}] Session error: {}", spec.name, e);
                ExecutionOutcome {
                    success: false,
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };

        record.complete(Outcome::from_success(execution.success));
        let report = self.controller.finalize(&mut record, &session).await;

        let steps = step_results(spec, &execution);
        let duration_ms = start.elapsed().as_millis() as u64;

        Ok(TestResult {
            name: spec.name.clone(),
            success: execution.success,
            duration_ms,
            steps,
            error: execution.error,
            artifacts: ArtifactSummary::from_report(&report, execution.screenshots),
        })
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let path = self.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

/// Per-step view of a run: everything before the failing step passed,
/// steps after it never ran
fn step_results(spec: &TestSpec, execution: &ExecutionOutcome) -> Vec<StepResult> {
    let ran = match execution.failed_step {
        Some(n) if !execution.success => n.min(spec.steps.len()),
        _ if execution.success => spec.steps.len(),
        _ => 0,
    };

    spec.steps
        .iter()
        .take(ran)
        .enumerate()
        .map(|(i, step)| {
            let failed = !execution.success && i + 1 == ran;
            StepResult {
                success: !failed,
                step_name: step.label(),
                error: if failed { execution.error.clone() } else { None },
            }
        })
        .collect()
}
