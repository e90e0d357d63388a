//! ScenarioRunner: dispatch → wait → assert, strictly in sequence.
//!
//! # State machine
//!
//! ```text
//!             first step
//!   Init ───────────────► Running ──── all steps ok ────► Passed
//!                            │
//!                            ├──── Timeout ─────────────► TimedOut
//!                            │
//!                            └──── any other error ─────► Failed
//! ```
//!
//! A failing step aborts the rest of its scenario. A lost UI surface
//! additionally aborts the whole run once the current result is emitted.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::assertion::{Assertion, Diagnostic};
use crate::config::{FailureMode, RunnerConfig, TimingConfig};
use crate::dispatch::{Action, ActionDispatcher};
use crate::driver::UiDriver;
use crate::query::{Property, StateQuery};
use crate::reporter::ScenarioObserver;
use crate::result::{ErrorKind, SettleError, SettleResult};
use crate::scenario::{Scenario, ScenarioSource, Step};
use crate::selector::Selector;
use crate::wait::Waiter;

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Scenario lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    /// Not started
    Init,
    /// Executing steps
    Running,
    /// Every step passed
    Passed,
    /// A step or the baseline failed
    Failed,
    /// A wait ran out of time
    TimedOut,
}

impl ScenarioState {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::TimedOut)
    }

    /// Check if the scenario passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Lower-case label
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed out",
        }
    }
}

/// Outcome of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step completed
    Pass,
    /// Step failed
    Fail,
    /// Step's wait timed out
    Timeout,
}

/// Record of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Zero-based index within the scenario
    pub index: usize,
    /// The step
    pub step: Step,
    /// Human-readable step description
    pub description: String,
    /// Status
    pub status: StepStatus,
    /// Error message when the step did not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Expected and observed values of a failed assertion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mismatch: Option<Diagnostic>,
    /// Error category when the step did not pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Wall time spent on the step
    pub duration_ms: u64,
}

impl StepOutcome {
    fn passed(index: usize, step: &Step, elapsed: Duration) -> Self {
        Self {
            index,
            step: step.clone(),
            description: step.to_string(),
            status: StepStatus::Pass,
            diagnostic: None,
            mismatch: None,
            error_kind: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    fn failed(index: usize, step: &Step, elapsed: Duration, err: &SettleError) -> Self {
        let status = match err {
            SettleError::Timeout { .. } => StepStatus::Timeout,
            _ => StepStatus::Fail,
        };
        let mismatch = match err {
            SettleError::AssertionMismatch {
                subject,
                expected,
                observed,
            } => Some(Diagnostic::new(subject, expected, observed)),
            _ => None,
        };
        Self {
            index,
            step: step.clone(),
            description: step.to_string(),
            status,
            diagnostic: Some(err.to_string()),
            mismatch,
            error_kind: Some(err.kind()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Result of one scenario execution. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Scenario name
    pub scenario_name: String,
    /// Terminal state
    pub state: ScenarioState,
    /// Executed steps, in order
    pub outcomes: Vec<StepOutcome>,
    /// Baseline failure, if the scenario never started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_error: Option<String>,
    /// The UI surface was lost during this scenario
    #[serde(default)]
    pub fatal: bool,
    /// Total wall time
    pub duration_ms: u64,
}

impl RunResult {
    /// Check if the scenario passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.state.is_passed()
    }

    /// The step that ended the scenario early
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.status != StepStatus::Pass)
    }

    /// Why the scenario did not pass
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.baseline_error
            .as_deref()
            .or_else(|| self.failed_step().and_then(|o| o.diagnostic.as_deref()))
    }
}

/// Results of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Results in execution order
    pub results: Vec<RunResult>,
    /// Scenarios never started because the run stopped early
    #[serde(default)]
    pub skipped: Vec<String>,
    /// Reason the run stopped on a lost surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl RunSummary {
    /// Number of passed scenarios
    #[must_use]
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Number of scenarios that ran and did not pass
    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.passed()
    }

    /// True iff every scenario ran and passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.fatal.is_none() && self.skipped.is_empty() && self.failed() == 0
    }

    /// Process exit code: 0 iff every scenario passed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }
}

// =============================================================================
// STEP EXECUTION
// =============================================================================

/// Executes single steps against a driver
#[derive(Debug)]
pub struct StepExecutor<'a, D: ?Sized> {
    driver: &'a D,
    timing: &'a TimingConfig,
}

impl<'a, D: UiDriver + ?Sized> StepExecutor<'a, D> {
    /// Create an executor
    #[must_use]
    pub const fn new(driver: &'a D, timing: &'a TimingConfig) -> Self {
        Self { driver, timing }
    }

    /// Execute one step, including its implicit waits
    pub async fn execute(&self, step: &Step) -> SettleResult<()> {
        let dispatcher = ActionDispatcher::new(self.driver);
        match step {
            Step::Type(text) => dispatcher.dispatch(&Action::TypeText(text.clone())).await,
            Step::MouseMove(points) => {
                dispatcher
                    .dispatch(&Action::PointerPath(points.clone()))
                    .await
            }
            Step::Click(selector) => {
                if self.timing.auto_wait {
                    let budget = self.timing.action_budget()?;
                    Waiter::new(self.driver)
                        .poll(selector, budget, &format!("{selector} to be present"), |m| {
                            !m.is_empty()
                        })
                        .await?;
                }
                dispatcher.dispatch(&Action::Click(selector.clone())).await
            }
            Step::WaitFor(spec) => Waiter::new(self.driver)
                .wait_for(spec, self.timing)
                .await
                .map(|_| ()),
            Step::AssertEqual {
                selector,
                property,
                expected,
                timeout_ms,
            } => {
                self.assert_equal(selector, property, expected, *timeout_ms)
                    .await
            }
            Step::AssertCount {
                selector,
                expected,
                timeout_ms,
            } => self.assert_count(selector, *expected, *timeout_ms).await,
        }
    }

    async fn assert_equal(
        &self,
        selector: &Selector,
        property: &Property,
        expected: &str,
        timeout_ms: Option<u64>,
    ) -> SettleResult<()> {
        let subject = format!("{property} of {selector}");
        if self.timing.auto_wait {
            let budget = self.timing.assertion_budget(timeout_ms)?;
            let waited = Waiter::new(self.driver)
                .poll_derived(
                    selector,
                    property,
                    budget,
                    &format!("{subject} == {expected:?}"),
                    |value| value == Some(expected),
                )
                .await;
            match waited {
                Ok(_) => return Ok(()),
                // the final read below reports what the UI shows now
                Err(SettleError::Timeout { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        let observed = StateQuery::new(self.driver).derive(selector, property).await?;
        Assertion::text_equals(&subject, observed.as_deref(), expected).into_result()
    }

    async fn assert_count(
        &self,
        selector: &Selector,
        expected: usize,
        timeout_ms: Option<u64>,
    ) -> SettleResult<()> {
        let subject = format!("count of {selector}");
        if self.timing.auto_wait {
            let budget = self.timing.assertion_budget(timeout_ms)?;
            return match Waiter::new(self.driver)
                .poll(selector, budget, &format!("{subject} == {expected}"), |m| {
                    m.len() == expected
                })
                .await
            {
                Ok(settled) => {
                    Assertion::count_equals(&subject, settled.matched.len(), expected).into_result()
                }
                Err(SettleError::Timeout { last_observed, .. }) => {
                    Assertion::count_equals(&subject, last_observed.len(), expected).into_result()
                }
                Err(other) => Err(other),
            };
        }
        let observed = StateQuery::new(self.driver).count(selector).await?;
        Assertion::count_equals(&subject, observed, expected).into_result()
    }
}

// =============================================================================
// BASELINE
// =============================================================================

/// Resets the UI to a known state before each scenario
#[async_trait]
pub trait BaselineSetup<D: UiDriver + ?Sized>: Send + Sync {
    /// Bring the UI into the scenario's starting state
    async fn establish(&self, driver: &D, timing: &TimingConfig) -> SettleResult<()>;
}

/// Baseline that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBaseline;

#[async_trait]
impl<D: UiDriver + ?Sized> BaselineSetup<D> for NoBaseline {
    async fn establish(&self, _driver: &D, _timing: &TimingConfig) -> SettleResult<()> {
        Ok(())
    }
}

/// Baseline that replays a fixed list of steps
#[derive(Debug, Clone, Default)]
pub struct StepsBaseline {
    steps: Vec<Step>,
}

impl StepsBaseline {
    /// Replay `steps` before each scenario
    #[must_use]
    pub fn new(steps: impl Into<Vec<Step>>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// Steps replayed
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

#[async_trait]
impl<D: UiDriver + ?Sized> BaselineSetup<D> for StepsBaseline {
    async fn establish(&self, driver: &D, timing: &TimingConfig) -> SettleResult<()> {
        let executor = StepExecutor::new(driver, timing);
        for step in &self.steps {
            executor.execute(step).await?;
        }
        Ok(())
    }
}

// =============================================================================
// RUNNER
// =============================================================================

/// Owns the UI session for the duration of a run
#[derive(Debug)]
pub struct ScenarioRunner<D> {
    driver: D,
    config: RunnerConfig,
}

impl<D: UiDriver> ScenarioRunner<D> {
    /// Create a runner owning `driver`
    #[must_use]
    pub const fn new(driver: D, config: RunnerConfig) -> Self {
        Self { driver, config }
    }

    /// Borrow the driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Give the driver back
    #[must_use]
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Runner configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run one scenario without a baseline
    pub async fn run_scenario(&self, scenario: &Scenario) -> RunResult {
        self.run_with_baseline(scenario, &NoBaseline).await
    }

    /// Establish the baseline, then run one scenario
    pub async fn run_with_baseline<B>(&self, scenario: &Scenario, baseline: &B) -> RunResult
    where
        B: BaselineSetup<D> + ?Sized,
    {
        let span = info_span!("scenario", name = scenario.name());
        self.execute(scenario, baseline).instrument(span).await
    }

    async fn execute<B>(&self, scenario: &Scenario, baseline: &B) -> RunResult
    where
        B: BaselineSetup<D> + ?Sized,
    {
        let timing = &self.config.timing;
        let start = Instant::now();
        let mut state = ScenarioState::Init;
        let mut outcomes = Vec::with_capacity(scenario.steps().len());
        let mut fatal = false;

        if let Err(e) = baseline.establish(&self.driver, timing).await {
            warn!(error = %e, "baseline failed");
            return RunResult {
                scenario_name: scenario.name().to_string(),
                state: ScenarioState::Failed,
                outcomes,
                baseline_error: Some(e.to_string()),
                fatal: e.is_fatal(),
                duration_ms: start.elapsed().as_millis() as u64,
            };
        }

        let executor = StepExecutor::new(&self.driver, timing);
        for (index, step) in scenario.steps().iter().enumerate() {
            state = ScenarioState::Running;
            let step_start = Instant::now();
            debug!(index, step = %step, "step");
            match executor.execute(step).await {
                Ok(()) => outcomes.push(StepOutcome::passed(index, step, step_start.elapsed())),
                Err(e) => {
                    state = match e {
                        SettleError::Timeout { .. } => ScenarioState::TimedOut,
                        _ => ScenarioState::Failed,
                    };
                    fatal = e.is_fatal();
                    if fatal {
                        error!(index, step = %step, error = %e, "UI surface lost");
                    } else {
                        warn!(index, step = %step, error = %e, "step failed");
                    }
                    outcomes.push(StepOutcome::failed(index, step, step_start.elapsed(), &e));
                    break;
                }
            }
        }
        if !state.is_terminal() {
            state = ScenarioState::Passed;
        }

        info!(state = state.as_str(), steps = outcomes.len(), "scenario complete");
        RunResult {
            scenario_name: scenario.name().to_string(),
            state,
            outcomes,
            baseline_error: None,
            fatal,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run every scenario of `source`, reporting each result to `observer`
    pub async fn run_all<S, B, O>(
        &self,
        source: &S,
        baseline: &B,
        observer: &mut O,
    ) -> SettleResult<RunSummary>
    where
        S: ScenarioSource + ?Sized,
        B: BaselineSetup<D> + ?Sized,
        O: ScenarioObserver + ?Sized,
    {
        let scenarios = source.scenarios()?;
        let mut summary = RunSummary::default();

        for (position, scenario) in scenarios.iter().enumerate() {
            let result = self.run_with_baseline(scenario, baseline).await;
            observer.on_scenario_complete(&result);

            let stop = if result.fatal {
                summary.fatal = Some(
                    result
                        .failure_reason()
                        .unwrap_or("UI surface unavailable")
                        .to_string(),
                );
                true
            } else {
                !result.passed() && self.config.failure_mode == FailureMode::AndonCord
            };
            summary.results.push(result);

            if stop {
                summary.skipped = scenarios[position + 1..]
                    .iter()
                    .map(|s| s.name().to_string())
                    .collect();
                if !summary.skipped.is_empty() {
                    warn!(skipped = summary.skipped.len(), "run stopped early");
                }
                break;
            }
        }

        observer.on_run_complete(&summary);
        Ok(summary)
    }
}
