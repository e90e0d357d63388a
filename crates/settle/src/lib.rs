//! Settle: scripted UI scenarios over eventually-consistent interfaces.
//!
//! A scenario is an ordered list of steps (type, click, move the pointer,
//! wait, assert). Every read polls the live UI until it settles or a timeout
//! expires, so a scenario never races the asynchronous updates the UI makes
//! in response to its own input.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SETTLE Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Suite YAML │    │ Scenario   │    │ UiDriver   │            │
//! │   │ / Rust     │───►│ Runner     │───►│ Chromium / │            │
//! │   │ builders   │    │ wait+assert│    │ MockUi     │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │                           │                                     │
//! │                           ▼                                     │
//! │                     ┌────────────┐                              │
//! │                     │ Reporter   │  text / JSON / JUnit         │
//! │                     └────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

mod assertion;
#[cfg(feature = "browser")]
mod browser;
mod config;
mod dispatch;
mod driver;
pub mod mock;
mod query;
mod reporter;
mod result;
#[allow(clippy::missing_errors_doc)]
mod runner;
mod scenario;
pub mod selector;
mod suite;
#[allow(clippy::missing_errors_doc)]
mod wait;

pub use assertion::{Assertion, Diagnostic, Verdict, NO_MATCH};
#[cfg(feature = "browser")]
pub use browser::ChromiumDriver;
pub use config::{BrowserConfig, FailureMode, RunnerConfig, TimingConfig};
pub use dispatch::{Action, ActionDispatcher};
pub use driver::{BoundingBox, ElementSnapshot, Point, UiDriver};
pub use query::{Match, Property, StateQuery};
pub use reporter::{Reporter, RunReport, ScenarioObserver};
pub use result::{ErrorKind, SettleError, SettleResult};
pub use runner::{
    BaselineSetup, NoBaseline, RunResult, RunSummary, ScenarioRunner, ScenarioState,
    StepExecutor, StepOutcome, StepStatus, StepsBaseline,
};
pub use scenario::{Scenario, ScenarioBuilder, ScenarioSource, Step};
pub use selector::{Selector, TextMatch, TextQuery};
pub use suite::{Suite, SUITE_VERSION};
pub use wait::{
    CustomPredicate, Predicate, Settled, WaitBudget, WaitSpec, Waiter, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Everything a scenario author usually needs
pub mod prelude {
    pub use super::mock::{Document, El, MockUi};
    pub use super::{
        Action, BaselineSetup, FailureMode, Match, Predicate, Reporter, RunResult, RunnerConfig,
        Scenario, ScenarioObserver, ScenarioRunner, ScenarioState, Selector, SettleError,
        SettleResult, Step, StepsBaseline, Suite, TimingConfig, UiDriver, WaitSpec,
    };
    #[cfg(feature = "browser")]
    pub use super::{BrowserConfig, ChromiumDriver};
}
