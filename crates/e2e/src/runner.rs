//! Main test runner: one fresh browser session per check

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::checks::{CheckOutcome, ReviewCheck, DEFAULT_TARGET_URL};
use crate::driver;
use crate::error::E2eResult;
use crate::preflight;
use crate::session::{BrowserSession, SessionConfig};
use crate::wait::WaitConfig;

/// Result of running a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub success: bool,
    pub outcome: Option<CheckOutcome>,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub screenshot_path: Option<PathBuf>,
}

impl TestResult {
    fn from_run(
        check: ReviewCheck,
        result: &E2eResult<CheckOutcome>,
        duration: Duration,
        screenshot_path: Option<PathBuf>,
    ) -> Self {
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome.clone()), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            name: check.name().to_string(),
            success: error.is_none(),
            outcome,
            duration_ms: duration.as_millis() as u64,
            error,
            screenshot_path,
        }
    }
}

/// Result of running all checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub target_url: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    fn collect(target_url: &str, started_at: DateTime<Utc>, duration: Duration, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            target_url: target_url.to_string(),
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms: duration.as_millis() as u64,
            results,
        }
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub target_url: String,
    pub session: SessionConfig,
    pub wait: WaitConfig,

    /// Output directory for results and failure screenshots
    pub output_dir: PathBuf,

    /// Run `npx playwright install` for the configured browser before the first check
    pub install_browser: bool,

    /// Fetch the target page over HTTP before launching any browser
    pub preflight: bool,

    pub screenshot_on_failure: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            session: SessionConfig::default(),
            wait: WaitConfig::default(),
            output_dir: PathBuf::from("test-results"),
            install_browser: true,
            preflight: true,
            screenshot_on_failure: true,
        }
    }
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,
    prepared: bool,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self {
            config,
            prepared: false,
        }
    }

    /// Make sure the driver is installed and the target answers
    pub async fn prepare(&mut self) -> E2eResult<()> {
        if self.prepared {
            return Ok(());
        }

        let version = driver::ensure_playwright().await?;
        info!("Using Playwright {}", version);

        if self.config.install_browser {
            driver::install_browser(self.config.session.browser).await?;
        }
        if self.config.preflight {
            preflight::check_reachable(&self.config.target_url, self.config.wait.timeout).await?;
        }

        self.prepared = true;
        Ok(())
    }

    /// Run every check
    pub async fn run_all(&mut self) -> E2eResult<TestSuiteResult> {
        self.run_checks(&ReviewCheck::ALL).await
    }

    /// Run a specific check by name
    pub async fn run_named(&mut self, name: &str) -> E2eResult<TestSuiteResult> {
        let check: ReviewCheck = name.parse()?;
        self.run_checks(&[check]).await
    }

    /// Run a list of checks, each in its own session
    pub async fn run_checks(&mut self, checks: &[ReviewCheck]) -> E2eResult<TestSuiteResult> {
        self.prepare().await?;

        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(checks.len());

        info!("Running {} check(s) against {}", checks.len(), self.config.target_url);

        for &check in checks {
            let result = self.run_check(check).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let suite = TestSuiteResult::collect(&self.config.target_url, started_at, start.elapsed(), results);

        info!("");
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    /// Run a single check in a fresh session; failures stay inside the result
    pub async fn run_check(&self, check: ReviewCheck) -> TestResult {
        let start = Instant::now();
        debug!("Starting check: {}", check);

        let session = match BrowserSession::launch(&self.config.session).await {
            Ok(session) => session,
            Err(e) => return TestResult::from_run(check, &Err(e), start.elapsed(), None),
        };

        let result = match session.goto(&self.config.target_url).await {
            Ok(()) => check.run(&session, &self.config.wait).await,
            Err(e) => Err(e),
        };

        let screenshot_path = match &result {
            Err(_) if self.config.screenshot_on_failure => self.capture_failure(&session, check).await,
            _ => None,
        };

        if let Err(e) = session.close().await {
            warn!("Closing session for {} failed: {}", check, e);
        }

        TestResult::from_run(check, &result, start.elapsed(), screenshot_path)
    }

    async fn capture_failure(&self, session: &BrowserSession, check: ReviewCheck) -> Option<PathBuf> {
        let dir = self.config.output_dir.join("screenshots");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Cannot create {}: {}", dir.display(), e);
            return None;
        }

        // The bridge runs in its own temp dir, so hand it an absolute path
        let path = match std::fs::canonicalize(&dir) {
            Ok(dir) => dir.join(format!("{}.png", check.name())),
            Err(e) => {
                warn!("Cannot resolve {}: {}", dir.display(), e);
                return None;
            }
        };
        match session.screenshot(&path).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Failure screenshot for {} not taken: {}", check, e);
                None
            }
        }
    }

    /// Write test results to JSON file
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Comma-separated names accepted by `--name`
pub fn describe_checks() -> String {
    ReviewCheck::ALL
        .iter()
        .map(ReviewCheck::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether a live run was asked for, via `--live` or a truthy `REVIEW_E2E_LIVE`.
///
/// The harness uses this to decide if unparseable arguments (such as a
/// `cargo test` name filter) are an error or just a reason to skip.
pub fn live_requested<S: AsRef<str>>(args: &[S], env_value: Option<&str>) -> bool {
    let flag = args.iter().any(|arg| arg.as_ref() == "--live");
    let env = env_value.is_some_and(|value| {
        !matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "n" | "no" | "f" | "false" | "off"
        )
    });
    flag || env
}
