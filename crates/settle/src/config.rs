//! Timing and runner configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::result::{SettleError, SettleResult};
use crate::wait::{WaitBudget, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS};

/// Timeouts and cadence shared by every wait in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Default timeout for explicit waits
    pub timeout_ms: u64,
    /// Default poll interval
    pub poll_interval_ms: u64,
    /// Timeout for the implicit wait before a click
    pub action_timeout_ms: u64,
    /// Timeout for assertions to start holding
    pub assertion_timeout_ms: u64,
    /// Wait implicitly before clicks and assertions
    pub auto_wait: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            action_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            assertion_timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            auto_wait: true,
        }
    }
}

impl TimingConfig {
    /// Create default timing
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the explicit wait timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the implicit click wait timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout_ms: u64) -> Self {
        self.action_timeout_ms = timeout_ms;
        self
    }

    /// Set the assertion timeout
    #[must_use]
    pub const fn with_assertion_timeout(mut self, timeout_ms: u64) -> Self {
        self.assertion_timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable implicit waits
    #[must_use]
    pub const fn with_auto_wait(mut self, auto_wait: bool) -> Self {
        self.auto_wait = auto_wait;
        self
    }

    /// Check every configured timeout against the poll interval
    pub fn validate(&self) -> SettleResult<()> {
        for timeout in [
            self.timeout_ms,
            self.action_timeout_ms,
            self.assertion_timeout_ms,
        ] {
            WaitBudget::new(timeout, self.poll_interval_ms)?;
        }
        Ok(())
    }

    /// Budget for an explicit wait, with optional per-wait overrides
    pub fn budget(
        &self,
        timeout_ms: Option<u64>,
        poll_interval_ms: Option<u64>,
    ) -> SettleResult<WaitBudget> {
        WaitBudget::new(
            timeout_ms.unwrap_or(self.timeout_ms),
            poll_interval_ms.unwrap_or(self.poll_interval_ms),
        )
    }

    /// Budget for the implicit wait before a click
    pub fn action_budget(&self) -> SettleResult<WaitBudget> {
        WaitBudget::new(self.action_timeout_ms, self.poll_interval_ms)
    }

    /// Budget for an assertion, with an optional per-step timeout
    pub fn assertion_budget(&self, timeout_ms: Option<u64>) -> SettleResult<WaitBudget> {
        WaitBudget::new(
            timeout_ms.unwrap_or(self.assertion_timeout_ms),
            self.poll_interval_ms,
        )
    }

    /// Poll interval as a duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// What happens after a scenario fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Stop the run at the first non-passing scenario
    AndonCord,
    /// Run every scenario and report all failures
    #[default]
    CollectAll,
}

/// Configuration of a [`ScenarioRunner`](crate::runner::ScenarioRunner)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Timing
    pub timing: TimingConfig,
    /// Failure mode
    pub failure_mode: FailureMode,
}

impl RunnerConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timing
    #[must_use]
    pub const fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set failure mode
    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Stop at the first failing scenario
    #[must_use]
    pub const fn fail_fast(self) -> Self {
        self.with_failure_mode(FailureMode::AndonCord)
    }
}

/// Chromium launch options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Chromium executable, auto-detected when `None`
    pub chromium_path: Option<String>,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            sandbox: true,
            viewport_width: 1280,
            viewport_height: 800,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the Chromium executable
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable the sandbox (needed in most containers)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set viewport size
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Reject sizes Chromium refuses to lay out
    pub fn validate(&self) -> SettleResult<()> {
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(SettleError::BrowserLaunchError {
                message: format!(
                    "viewport must be non-empty, got {}x{}",
                    self.viewport_width, self.viewport_height
                ),
            });
        }
        Ok(())
    }
}
