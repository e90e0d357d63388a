//! Waiter: poll the UI until a predicate holds or a deadline passes.
//!
//! ## Poll loop
//!
//! ```text
//!  t=0        t=P        t=2P              t=T (deadline)
//!   │ resolve  │ resolve  │ resolve   ...    │ resolve → Timeout
//!   └─ ok? ────┴─ ok? ────┴─ ok? ─────────── ┘
//! ```
//!
//! - the first evaluation is immediate
//! - elapsed time is monotonic (`tokio::time::Instant`), never an iteration count
//! - the last sleep is clamped to the deadline
//! - a lost surface aborts immediately

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace, warn};

use crate::config::TimingConfig;
use crate::driver::{ElementSnapshot, UiDriver};
use crate::query::{Match, Property, StateQuery};
use crate::result::{SettleError, SettleResult};
use crate::selector::Selector;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for wait operations (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

// =============================================================================
// PREDICATES
// =============================================================================

/// Programmatic predicate over a match
#[derive(Clone)]
pub struct CustomPredicate {
    description: String,
    check: Arc<dyn Fn(&Match) -> bool + Send + Sync>,
}

impl CustomPredicate {
    /// Create a custom predicate
    pub fn new<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Match) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            check: Arc::new(check),
        }
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PartialEq for CustomPredicate {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description && Arc::ptr_eq(&self.check, &other.check)
    }
}

/// Condition on the elements a selector resolves to
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// At least one element
    #[default]
    Exists,
    /// No elements
    Absent,
    /// Exactly `n` elements
    Count(usize),
    /// At least `n` elements
    AtLeast(usize),
    /// First element's text equals the literal
    TextEquals(String),
    /// First element's text contains the literal
    TextContains(String),
    /// First element's attribute equals the literal
    AttributeEquals {
        /// Attribute name
        name: String,
        /// Expected value
        value: String,
    },
    /// At least one element, none disabled
    Enabled,
    /// At least one element, all disabled
    Disabled,
    /// At least one element, all rendered with layout
    Visible,
    /// Programmatic predicate
    #[serde(skip)]
    Custom(CustomPredicate),
}

impl Predicate {
    /// Custom predicate from a closure
    pub fn custom<F>(description: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Match) -> bool + Send + Sync + 'static,
    {
        Self::Custom(CustomPredicate::new(description, check))
    }

    /// Evaluate against one observation. Pure.
    #[must_use]
    pub fn evaluate(&self, observed: &Match) -> bool {
        let first = observed.first();
        match self {
            Self::Exists => !observed.is_empty(),
            Self::Absent => observed.is_empty(),
            Self::Count(n) => observed.len() == *n,
            Self::AtLeast(n) => observed.len() >= *n,
            Self::TextEquals(text) => first.is_some_and(|e| e.text == *text),
            Self::TextContains(text) => first.is_some_and(|e| e.text.contains(text.as_str())),
            Self::AttributeEquals { name, value } => {
                first.is_some_and(|e| e.attribute(name) == Some(value.as_str()))
            }
            Self::Enabled => !observed.is_empty() && observed.iter().all(|e| !e.disabled),
            Self::Disabled => !observed.is_empty() && observed.iter().all(|e| e.disabled),
            Self::Visible => {
                !observed.is_empty() && observed.iter().all(ElementSnapshot::is_visible)
            }
            Self::Custom(custom) => (custom.check)(observed),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exists => write!(f, "exists"),
            Self::Absent => write!(f, "is absent"),
            Self::Count(n) => write!(f, "has count {n}"),
            Self::AtLeast(n) => write!(f, "has at least {n}"),
            Self::TextEquals(text) => write!(f, "has text {text:?}"),
            Self::TextContains(text) => write!(f, "contains text {text:?}"),
            Self::AttributeEquals { name, value } => write!(f, "has {name}={value:?}"),
            Self::Enabled => write!(f, "is enabled"),
            Self::Disabled => write!(f, "is disabled"),
            Self::Visible => write!(f, "is visible"),
            Self::Custom(custom) => write!(f, "{}", custom.description),
        }
    }
}

// =============================================================================
// WAIT SPEC
// =============================================================================

/// Declarative wait: selector, predicate, optional budget overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSpec {
    /// Selector polled on every evaluation
    pub selector: Selector,
    /// Condition to wait for
    #[serde(default)]
    pub predicate: Predicate,
    /// Timeout override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Poll interval override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl WaitSpec {
    /// Wait for `selector` to satisfy `predicate`
    #[must_use]
    pub const fn new(selector: Selector, predicate: Predicate) -> Self {
        Self {
            selector,
            predicate,
            timeout_ms: None,
            poll_interval_ms: None,
            description: None,
        }
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = Some(poll_interval_ms);
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Description used in logs and errors
    #[must_use]
    pub fn describe(&self) -> String {
        self.description
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.selector, self.predicate))
    }
}

/// Validated timeout and poll interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBudget {
    /// Total time allowed
    pub timeout: Duration,
    /// Time between evaluations
    pub poll_interval: Duration,
}

impl WaitBudget {
    /// Build a budget; both values positive and the interval no longer than the timeout
    pub fn new(timeout_ms: u64, poll_interval_ms: u64) -> SettleResult<Self> {
        if timeout_ms == 0 {
            return Err(SettleError::InvalidWaitSpec {
                message: "timeout must be positive".to_string(),
            });
        }
        if poll_interval_ms == 0 {
            return Err(SettleError::InvalidWaitSpec {
                message: "poll interval must be positive".to_string(),
            });
        }
        if poll_interval_ms > timeout_ms {
            return Err(SettleError::InvalidWaitSpec {
                message: format!(
                    "poll interval {poll_interval_ms}ms exceeds timeout {timeout_ms}ms"
                ),
            });
        }
        Ok(Self {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }

    /// Timeout in milliseconds
    #[must_use]
    pub const fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}

/// Successful wait
#[derive(Debug, Clone)]
pub struct Settled {
    /// Observation that satisfied the predicate
    pub matched: Match,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of evaluations
    pub polls: u32,
}

// =============================================================================
// WAITER
// =============================================================================

/// Polls fresh state queries until satisfied
#[derive(Debug)]
pub struct Waiter<'a, D: ?Sized> {
    driver: &'a D,
}

impl<'a, D: UiDriver + ?Sized> Waiter<'a, D> {
    /// Create a waiter over `driver`
    #[must_use]
    pub const fn new(driver: &'a D) -> Self {
        Self { driver }
    }

    /// Resolve `selector` until `satisfied` returns true or the budget runs out
    pub async fn poll<F>(
        &self,
        selector: &Selector,
        budget: WaitBudget,
        description: &str,
        satisfied: F,
    ) -> SettleResult<Settled>
    where
        F: Fn(&Match) -> bool,
    {
        let query = StateQuery::new(self.driver);
        let start = Instant::now();
        let deadline = start + budget.timeout;
        let mut polls = 0u32;

        loop {
            let observed = query.resolve(selector).await?;
            polls += 1;
            trace!(poll = polls, observed = %observed, "poll");

            if satisfied(&observed) {
                let elapsed = start.elapsed();
                debug!(
                    waited_for = description,
                    elapsed_ms = elapsed.as_millis() as u64,
                    polls,
                    "settled"
                );
                return Ok(Settled {
                    matched: observed,
                    elapsed,
                    polls,
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    waited_for = description,
                    timeout_ms = budget.timeout_ms(),
                    polls,
                    last_observed = %observed,
                    "wait timed out"
                );
                return Err(SettleError::Timeout {
                    timeout_ms: budget.timeout_ms(),
                    description: description.to_string(),
                    last_observed: Box::new(observed),
                    polls,
                });
            }
            sleep_until((now + budget.poll_interval).min(deadline)).await;
        }
    }

    /// Poll the derived `property` of the first match until `satisfied`
    /// accepts it. Reads go through [`StateQuery::derive_first`], so the value
    /// seen here is the value a single read would see.
    pub async fn poll_derived<F>(
        &self,
        selector: &Selector,
        property: &Property,
        budget: WaitBudget,
        description: &str,
        satisfied: F,
    ) -> SettleResult<Option<String>>
    where
        F: Fn(Option<&str>) -> bool,
    {
        let query = StateQuery::new(self.driver);
        let start = Instant::now();
        let deadline = start + budget.timeout;
        let mut polls = 0u32;

        loop {
            let observed = query.resolve(selector).await?;
            // an element replaced between resolve and read is still settling
            let value = match query.derive_first(&observed, property).await {
                Err(SettleError::ElementNotFound { .. }) => None,
                other => other?,
            };
            polls += 1;
            trace!(poll = polls, observed = %observed, value = ?value, "poll");

            if satisfied(value.as_deref()) {
                debug!(
                    waited_for = description,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    polls,
                    "settled"
                );
                return Ok(value);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    waited_for = description,
                    timeout_ms = budget.timeout_ms(),
                    polls,
                    last_value = ?value,
                    "wait timed out"
                );
                return Err(SettleError::Timeout {
                    timeout_ms: budget.timeout_ms(),
                    description: description.to_string(),
                    last_observed: Box::new(observed),
                    polls,
                });
            }
            sleep_until((now + budget.poll_interval).min(deadline)).await;
        }
    }

    /// Run a declarative wait, filling missing budget values from `timing`
    pub async fn wait_for(&self, spec: &WaitSpec, timing: &TimingConfig) -> SettleResult<Settled> {
        let budget = timing.budget(spec.timeout_ms, spec.poll_interval_ms)?;
        let predicate = &spec.predicate;
        self.poll(&spec.selector, budget, &spec.describe(), |m| {
            predicate.evaluate(m)
        })
        .await
    }
}
