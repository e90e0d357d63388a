//! YAML suite files.
//!
//! ```yaml
//! version: "1"
//! name: editor modes
//! url: http://localhost:8889/wp-admin/post-new.php
//! timing:
//!   timeout_ms: 5000
//! baseline:
//!   - click: { css: .block-editor-default-block-appender__content }
//!   - type: Hello world!
//! scenarios:
//!   - name: html round trip
//!     steps:
//!       - assert_count: { selector: { css: textarea }, expected: 1 }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::TimingConfig;
use crate::result::{SettleError, SettleResult};
use crate::scenario::{Scenario, ScenarioSource, Step};

/// Supported suite schema version
pub const SUITE_VERSION: &str = "1";

/// A suite file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    /// Schema version (must be "1")
    pub version: String,
    /// Suite name
    #[serde(default)]
    pub name: String,
    /// Page the scenarios run against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Timing defaults
    #[serde(default)]
    pub timing: TimingConfig,
    /// Steps replayed before every scenario
    #[serde(default)]
    pub baseline: Vec<Step>,
    /// Scenarios in execution order
    pub scenarios: Vec<Scenario>,
}

impl Suite {
    /// Parse YAML
    pub fn from_yaml(yaml: &str) -> SettleResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a suite file
    pub fn load(path: impl AsRef<Path>) -> SettleResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> SettleResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check everything that can be checked without a UI
    pub fn validate(&self) -> SettleResult<()> {
        if self.version != SUITE_VERSION {
            return Err(SettleError::invalid_suite(format!(
                "unsupported version {:?}, expected {SUITE_VERSION:?}",
                self.version
            )));
        }
        self.timing.validate()?;
        if self.scenarios.is_empty() {
            return Err(SettleError::invalid_suite("suite has no scenarios"));
        }

        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            let name = scenario.name();
            if name.trim().is_empty() {
                return Err(SettleError::invalid_suite("scenario name is empty"));
            }
            if !seen.insert(name) {
                return Err(SettleError::invalid_suite(format!(
                    "duplicate scenario name {name:?}"
                )));
            }
            if scenario.steps().is_empty() {
                return Err(SettleError::invalid_suite(format!(
                    "scenario {name:?} has no steps"
                )));
            }
            self.validate_steps(name, scenario.steps())?;
        }
        self.validate_steps("baseline", &self.baseline)
    }

    fn validate_steps(&self, owner: &str, steps: &[Step]) -> SettleResult<()> {
        for (index, step) in steps.iter().enumerate() {
            let context = |e: SettleError| {
                SettleError::invalid_suite(format!("{owner}, step {}: {e}", index + 1))
            };
            if let Some(selector) = step.selector() {
                selector.validate().map_err(context)?;
            }
            match step {
                Step::WaitFor(spec) => {
                    self.timing
                        .budget(spec.timeout_ms, spec.poll_interval_ms)
                        .map_err(context)?;
                }
                Step::AssertEqual { timeout_ms, .. } | Step::AssertCount { timeout_ms, .. } => {
                    self.timing.assertion_budget(*timeout_ms).map_err(context)?;
                }
                Step::MouseMove(points) if points.is_empty() => {
                    return Err(context(SettleError::InputError {
                        message: "mouse move has no points".to_string(),
                    }));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Keep scenarios whose name contains `pattern`
    #[must_use]
    pub fn filter(mut self, pattern: &str) -> Self {
        self.scenarios.retain(|s| s.name().contains(pattern));
        self
    }

    /// Total number of steps across scenarios
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.scenarios.iter().map(|s| s.steps().len()).sum()
    }
}

impl ScenarioSource for Suite {
    fn scenarios(&self) -> SettleResult<Vec<Scenario>> {
        Ok(self.scenarios.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    const EDITOR_MODES: &str = include_str!("../../../demos/editor-modes.yaml");

    fn minimal(scenarios: &str) -> String {
        format!("version: \"1\"\nname: t\nscenarios:\n{scenarios}")
    }

    mod parse_tests {
        use super::*;

        #[test]
        fn test_demo_suite_is_valid() {
            let suite = Suite::from_yaml(EDITOR_MODES).unwrap();
            suite.validate().unwrap();
            assert_eq!(suite.scenarios.len(), 4);
            assert!(!suite.baseline.is_empty());
            assert!(suite.url.is_some());
        }

        #[test]
        fn test_demo_suite_html_expectation() {
            let suite = Suite::from_yaml(EDITOR_MODES).unwrap();
            let expects_html = suite.scenarios.iter().flat_map(|s| s.steps()).any(|step| {
                matches!(step, Step::AssertEqual { expected, .. } if expected == "<p>Hello world!</p>")
            });
            assert!(expects_html);
        }

        #[test]
        fn test_timing_block_defaults() {
            let suite = Suite::from_yaml(&minimal(
                "  - name: a\n    steps:\n      - type: x\n",
            ))
            .unwrap();
            assert_eq!(suite.timing, TimingConfig::default());
        }

        #[test]
        fn test_yaml_round_trip_preserves_suite() {
            let suite = Suite::from_yaml(EDITOR_MODES).unwrap();
            let again = Suite::from_yaml(&suite.to_yaml().unwrap()).unwrap();
            assert_eq!(suite, again);
        }

        #[test]
        fn test_load_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("suite.yaml");
            std::fs::write(&path, EDITOR_MODES).unwrap();
            assert_eq!(Suite::load(&path).unwrap().scenarios.len(), 4);
            assert!(matches!(
                Suite::load(dir.path().join("missing.yaml")),
                Err(SettleError::Io(_))
            ));
        }
    }

    mod validate_tests {
        use super::*;

        fn invalid(yaml: &str) -> String {
            match Suite::from_yaml(yaml).unwrap().validate() {
                Err(SettleError::InvalidSuite { message }) => message,
                Err(other) => panic!("unexpected error {other}"),
                Ok(()) => panic!("suite unexpectedly valid"),
            }
        }

        #[test]
        fn test_wrong_version() {
            let yaml = "version: \"2\"\nscenarios:\n  - name: a\n    steps:\n      - type: x\n";
            assert!(invalid(yaml).contains("unsupported version"));
        }

        #[test]
        fn test_no_scenarios() {
            assert!(invalid("version: \"1\"\nscenarios: []\n").contains("no scenarios"));
        }

        #[test]
        fn test_duplicate_names() {
            let yaml = minimal(
                "  - name: a\n    steps:\n      - type: x\n  - name: a\n    steps:\n      - type: y\n",
            );
            assert!(invalid(&yaml).contains("duplicate"));
        }

        #[test]
        fn test_empty_steps() {
            assert!(invalid(&minimal("  - name: a\n    steps: []\n")).contains("no steps"));
        }

        #[test]
        fn test_bad_selector_names_step() {
            let yaml = minimal("  - name: a\n    steps:\n      - type: x\n      - click: { css: \"\" }\n");
            assert!(invalid(&yaml).contains("a, step 2"));
        }

        #[test]
        fn test_bad_wait_budget() {
            let yaml = minimal(
                "  - name: a\n    steps:\n      - wait_for: { selector: { css: p }, timeout_ms: 10, poll_interval_ms: 20 }\n",
            );
            assert!(invalid(&yaml).contains("poll interval"));
        }

        #[test]
        fn test_bad_baseline_step() {
            let yaml = "version: \"1\"\nbaseline:\n  - mouse_move: []\nscenarios:\n  - name: a\n    steps:\n      - type: x\n";
            assert!(invalid(yaml).contains("baseline, step 1"));
        }
    }

    #[test]
    fn test_filter_by_name() {
        let suite = Suite::from_yaml(EDITOR_MODES).unwrap().filter("code editor");
        assert_eq!(suite.scenarios.len(), 1);
        assert!(suite.scenarios[0].steps().iter().any(|s| {
            s.selector() == Some(&Selector::css(".block-editor-block-inspector__no-blocks"))
        }));
    }

    #[test]
    fn test_suite_is_a_source() {
        let suite = Suite::from_yaml(EDITOR_MODES).unwrap();
        assert_eq!(suite.scenarios().unwrap().len(), 4);
        assert!(suite.step_count() > 4);
    }
}
