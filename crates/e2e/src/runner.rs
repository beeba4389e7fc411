//! Test runner: bounded worker pool, per-attempt timeout, retries and reporting

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::RunnerSettings;
use crate::error::{E2eError, E2eResult};
use crate::harness::{Suite, TestCase};

/// Name of the JSON report inside the output directory
pub const RESULTS_FILE: &str = "results.json";

/// Outcome of a case after all of its attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    /// Passed on a retry
    Flaky,
    Failed,
    TimedOut,
}

impl CaseStatus {
    pub fn is_success(self) -> bool {
        matches!(self, CaseStatus::Passed | CaseStatus::Flaky)
    }
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub project: String,
    pub status: CaseStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl TestResult {
    pub fn success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub flaky: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    fn from_results(results: Vec<TestResult>, duration_ms: u64) -> Self {
        let count = |status: CaseStatus| results.iter().filter(|r| r.status == status).count();
        let passed = count(CaseStatus::Passed);
        let flaky = count(CaseStatus::Flaky);
        Self {
            total: results.len(),
            passed,
            flaky,
            failed: results.len() - passed - flaky,
            duration_ms,
            results,
        }
    }

    /// Flaky cases count as passing
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Selects which registered cases run
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    /// Exact project name
    pub project: Option<String>,
    /// Substring of the case name
    pub grep: Option<String>,
}

impl CaseFilter {
    pub fn matches(&self, case: &TestCase) -> bool {
        let project_ok = self.project.as_deref().map_or(true, |p| case.project == p);
        let grep_ok = self.grep.as_deref().map_or(true, |g| case.name.contains(g));
        project_ok && grep_ok
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub workers: usize,
    pub retries: u32,
    pub timeout: Duration,
    pub output_dir: PathBuf,
    pub filter: CaseFilter,
}

impl RunnerConfig {
    /// Resolve defaults; CI runs serially with a larger retry budget
    pub fn from_settings(settings: &RunnerSettings, ci: bool) -> Self {
        let (workers, retries) = if ci { (1, 2) } else { (3, 1) };
        Self {
            workers: settings.workers.unwrap_or(workers).max(1),
            retries: settings.retries.unwrap_or(retries),
            timeout: Duration::from_millis(settings.timeout_ms),
            output_dir: settings.output_dir.clone(),
            filter: CaseFilter::default(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_settings(&RunnerSettings::default(), false)
    }
}

/// Aborts the spawned attempt if the runner stops waiting for it
struct AbortOnDrop(JoinHandle<E2eResult<()>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Main test runner
pub struct TestRunner {
    config: RunnerConfig,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Cases the filter selects, in registration order
    pub fn selected<'s>(&self, suite: &'s Suite) -> Vec<&'s TestCase> {
        suite
            .cases()
            .iter()
            .filter(|case| self.config.filter.matches(case))
            .collect()
    }

    /// Run every selected case; results keep registration order
    pub async fn run(&self, suite: &Suite) -> TestSuiteResult {
        let start = Instant::now();
        let selected = self.selected(suite);

        info!(
            "Running {} test(s) using {} worker(s)...",
            selected.len(),
            self.config.workers
        );

        let mut indexed: Vec<(usize, TestResult)> = stream::iter(selected.into_iter().enumerate())
            .map(|(index, case)| async move { (index, self.run_case(suite, case).await) })
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);

        let results = indexed.into_iter().map(|(_, result)| result).collect();
        let summary = TestSuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Test Results: {} passed, {} flaky, {} failed ({} ms)",
            summary.passed, summary.flaky, summary.failed, summary.duration_ms
        );
        summary
    }

    /// Run one case through its retry budget
    pub async fn run_case(&self, suite: &Suite, case: &TestCase) -> TestResult {
        let start = Instant::now();
        let max_attempts = self.config.retries + 1;
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                warn!(
                    "Retrying {} (attempt {}/{})",
                    case.name,
                    attempt + 1,
                    max_attempts
                );
            }
            debug!("Running test: {} [{}]", case.name, case.project);

            match self.attempt(suite, case, attempt).await {
                Ok(()) => {
                    let status = if attempt == 0 {
                        CaseStatus::Passed
                    } else {
                        CaseStatus::Flaky
                    };
                    let duration_ms = start.elapsed().as_millis() as u64;
                    info!("✓ {} ({} ms)", case.name, duration_ms);
                    return TestResult {
                        name: case.name.clone(),
                        project: case.project.clone(),
                        status,
                        attempts: attempt + 1,
                        duration_ms,
                        error: None,
                    };
                }
                Err(e) => {
                    debug!("{} attempt {} failed: {}", case.name, attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        let status = match last_error {
            Some(E2eError::Timeout(_)) => CaseStatus::TimedOut,
            _ => CaseStatus::Failed,
        };
        let error = last_error.map(|e| e.to_string());
        error!(
            "✗ {} - {}",
            case.name,
            error.as_deref().unwrap_or("unknown error")
        );

        TestResult {
            name: case.name.clone(),
            project: case.project.clone(),
            status,
            attempts: max_attempts,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
        }
    }

    /// Hooks, fixtures and body for one attempt, under the timeout
    async fn attempt(&self, suite: &Suite, case: &TestCase, attempt: u32) -> E2eResult<()> {
        let timeout = self.config.timeout;
        let run = async {
            let ctx = suite.prepare(case, attempt)?;
            let mut task = AbortOnDrop(tokio::spawn(case.invoke(ctx)));
            match (&mut task.0).await {
                Ok(result) => result,
                Err(join) if join.is_panic() => Err(E2eError::AssertionFailed(panic_message(
                    join.into_panic(),
                ))),
                Err(join) => Err(E2eError::StepFailed {
                    step: "run".to_string(),
                    reason: join.to_string(),
                }),
            }
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(result) => result,
            Err(_) => Err(E2eError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Write test results to `<output_dir>/results.json`
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

pub fn write_results(output_dir: &Path, results: &TestSuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(RESULTS_FILE);
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
