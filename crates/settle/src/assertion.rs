//! Assertion reporter: exact comparisons with diagnostic context.

use serde::{Deserialize, Serialize};

use crate::result::{SettleError, SettleResult};

/// Observed value used when a selector matched nothing
pub const NO_MATCH: &str = "<no match>";

/// Context of a failed comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// What was compared (selector and property)
    pub subject: String,
    /// Expected literal
    pub expected: String,
    /// Observed value
    pub observed: String,
}

impl Diagnostic {
    /// Build a diagnostic
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        expected: impl Into<String>,
        observed: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            expected: expected.into(),
            observed: observed.into(),
        }
    }
}

/// Outcome of one comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Observed equals expected
    Pass,
    /// Observed differs
    Fail(Diagnostic),
}

impl Verdict {
    /// Whether the comparison passed
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// `Ok(())` on pass, [`SettleError::AssertionMismatch`] on failure
    pub fn into_result(self) -> SettleResult<()> {
        match self {
            Self::Pass => Ok(()),
            Self::Fail(d) => Err(SettleError::AssertionMismatch {
                subject: d.subject,
                expected: d.expected,
                observed: d.observed,
            }),
        }
    }
}

/// Assertion helpers
#[derive(Debug)]
pub struct Assertion;

impl Assertion {
    /// Exact text equality. `None` means nothing matched.
    #[must_use]
    pub fn text_equals(subject: &str, observed: Option<&str>, expected: &str) -> Verdict {
        match observed {
            Some(text) if text == expected => Verdict::Pass,
            other => Verdict::Fail(Diagnostic::new(
                subject,
                expected,
                other.unwrap_or(NO_MATCH),
            )),
        }
    }

    /// Exact count equality
    #[must_use]
    pub fn count_equals(subject: &str, observed: usize, expected: usize) -> Verdict {
        if observed == expected {
            Verdict::Pass
        } else {
            Verdict::Fail(Diagnostic::new(
                subject,
                expected.to_string(),
                observed.to_string(),
            ))
        }
    }
}
