//! Scenarios: named, ordered step lists.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::driver::Point;
use crate::query::Property;
use crate::result::SettleResult;
use crate::selector::Selector;
use crate::wait::{Predicate, WaitSpec};

/// One scripted step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Type literal text at the current focus
    Type(String),
    /// Click the first element matching the selector
    Click(Selector),
    /// Move the pointer through one or more points
    MouseMove(Vec<Point>),
    /// Explicit wait
    WaitFor(WaitSpec),
    /// Derived value equals a literal
    AssertEqual {
        /// Selector to read from
        selector: Selector,
        /// Property to derive
        #[serde(default)]
        property: Property,
        /// Expected literal
        expected: String,
        /// Per-step assertion timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
    /// Number of matches equals a literal
    AssertCount {
        /// Selector to count
        selector: Selector,
        /// Expected count
        expected: usize,
        /// Per-step assertion timeout
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout_ms: Option<u64>,
    },
}

impl Step {
    /// Type text
    #[must_use]
    pub fn type_text(text: impl Into<String>) -> Self {
        Self::Type(text.into())
    }

    /// Click a selector
    #[must_use]
    pub const fn click(selector: Selector) -> Self {
        Self::Click(selector)
    }

    /// Move the pointer through `points`
    #[must_use]
    pub fn mouse_move(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::MouseMove(points.into_iter().map(|(x, y)| Point::new(x, y)).collect())
    }

    /// Wait for a predicate
    #[must_use]
    pub const fn wait_for(spec: WaitSpec) -> Self {
        Self::WaitFor(spec)
    }

    /// Wait for a selector to resolve to at least one element
    #[must_use]
    pub const fn wait_exists(selector: Selector) -> Self {
        Self::WaitFor(WaitSpec::new(selector, Predicate::Exists))
    }

    /// Assert on text content
    #[must_use]
    pub fn assert_text(selector: Selector, expected: impl Into<String>) -> Self {
        Self::AssertEqual {
            selector,
            property: Property::Text,
            expected: expected.into(),
            timeout_ms: None,
        }
    }

    /// Assert on an attribute
    #[must_use]
    pub fn assert_attribute(
        selector: Selector,
        name: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::AssertEqual {
            selector,
            property: Property::Attribute(name.into()),
            expected: expected.into(),
            timeout_ms: None,
        }
    }

    /// Assert on a match count
    #[must_use]
    pub const fn assert_count(selector: Selector, expected: usize) -> Self {
        Self::AssertCount {
            selector,
            expected,
            timeout_ms: None,
        }
    }

    /// Selector the step reads or targets
    #[must_use]
    pub const fn selector(&self) -> Option<&Selector> {
        match self {
            Self::Click(selector)
            | Self::AssertEqual { selector, .. }
            | Self::AssertCount { selector, .. } => Some(selector),
            Self::WaitFor(spec) => Some(&spec.selector),
            Self::Type(_) | Self::MouseMove(_) => None,
        }
    }

    /// Step kind name
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Click(_) => "click",
            Self::MouseMove(_) => "mouse_move",
            Self::WaitFor(_) => "wait_for",
            Self::AssertEqual { .. } => "assert_equal",
            Self::AssertCount { .. } => "assert_count",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(text) => write!(f, "type {text:?}"),
            Self::Click(selector) => write!(f, "click {selector}"),
            Self::MouseMove(points) => {
                let path: Vec<String> = points.iter().map(|p| format!("({}, {})", p.x, p.y)).collect();
                write!(f, "mouse move {}", path.join(" -> "))
            }
            Self::WaitFor(spec) => write!(f, "wait for {}", spec.describe()),
            Self::AssertEqual {
                selector,
                property,
                expected,
                ..
            } => write!(f, "assert {property} of {selector} == {expected:?}"),
            Self::AssertCount {
                selector, expected, ..
            } => write!(f, "assert count of {selector} == {expected}"),
        }
    }
}

/// Named, ordered sequence of steps. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    name: String,
    #[serde(default)]
    description: String,
    steps: Vec<Step>,
}

impl Scenario {
    /// Start building a scenario
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ScenarioBuilder {
        ScenarioBuilder {
            name: name.into(),
            description: String::new(),
            steps: Vec::new(),
        }
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Scenario description
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Steps in execution order
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

/// Builder for [`Scenario`]
#[derive(Debug, Clone)]
pub struct ScenarioBuilder {
    name: String,
    description: String,
    steps: Vec<Step>,
}

impl ScenarioBuilder {
    /// Set the description
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> Scenario {
        Scenario {
            name: self.name,
            description: self.description,
            steps: self.steps,
        }
    }
}

/// Supplies the scenarios of a run, in order
pub trait ScenarioSource {
    /// Scenarios to execute
    fn scenarios(&self) -> SettleResult<Vec<Scenario>>;
}

impl ScenarioSource for Vec<Scenario> {
    fn scenarios(&self) -> SettleResult<Vec<Scenario>> {
        Ok(self.clone())
    }
}

impl ScenarioSource for [Scenario] {
    fn scenarios(&self) -> SettleResult<Vec<Scenario>> {
        Ok(self.to_vec())
    }
}
