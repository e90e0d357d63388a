//! Reporter - collects run results for text, JSON and JUnit output.
//!
//! The runner pushes every [`RunResult`] into a [`ScenarioObserver`] as soon
//! as the scenario reaches a terminal state, so a run that stops on a lost
//! UI surface still reports the scenario that lost it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::result::SettleResult;
use crate::runner::{RunResult, RunSummary, ScenarioState};

/// Receives results while a run is in progress
pub trait ScenarioObserver {
    /// Called once per executed scenario, in execution order
    fn on_scenario_complete(&mut self, result: &RunResult);

    /// Called once after the last scenario
    fn on_run_complete(&mut self, _summary: &RunSummary) {}
}

/// Serialized run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique id of this run
    pub run_id: String,
    /// Suite name
    pub suite: String,
    /// RFC 3339 start timestamp
    pub started_at: String,
    /// RFC 3339 finish timestamp
    pub finished_at: String,
    /// Passed scenarios
    pub passed: usize,
    /// Scenarios that ran and did not pass
    pub failed: usize,
    /// Scenarios never started
    pub skipped: Vec<String>,
    /// Reason the run stopped on a lost surface
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
    /// Per-scenario results
    pub results: Vec<RunResult>,
}

/// Collecting observer
#[derive(Debug)]
pub struct Reporter {
    run_id: Uuid,
    suite_name: String,
    started_at: String,
    results: Vec<RunResult>,
    skipped: Vec<String>,
    fatal: Option<String>,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Create new reporter
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            suite_name: "Scenario Suite".to_string(),
            started_at: now(),
            results: Vec::new(),
            skipped: Vec::new(),
            fatal: None,
        }
    }

    /// Set suite name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Run id
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Collected results
    #[must_use]
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    /// Get number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed()).count()
    }

    /// Get number of scenarios that did not pass
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    /// True iff nothing failed, nothing was skipped and the surface survived
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0 && self.skipped.is_empty() && self.fatal.is_none()
    }

    /// Process exit code: 0 iff every scenario passed
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.all_passed())
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {}/{} passed",
            self.suite_name,
            self.passed_count(),
            self.results.len()
        );
        if !self.skipped.is_empty() {
            line.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        line
    }

    /// Plain-text report
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for result in &self.results {
            let label = match result.state {
                ScenarioState::Passed => "PASS",
                ScenarioState::TimedOut => "TIME",
                _ => "FAIL",
            };
            out.push_str(&format!(
                "{label} {} ({}ms)\n",
                result.scenario_name, result.duration_ms
            ));
            if let Some(error) = &result.baseline_error {
                out.push_str(&format!("     baseline: {error}\n"));
            }
            if let Some(step) = result.failed_step() {
                out.push_str(&format!("     step {}: {}\n", step.index + 1, step.description));
                if let Some(diagnostic) = &step.diagnostic {
                    out.push_str(&format!("     {diagnostic}\n"));
                }
            }
        }
        for name in &self.skipped {
            out.push_str(&format!("SKIP {name}\n"));
        }
        if let Some(fatal) = &self.fatal {
            out.push_str(&format!("run aborted: {fatal}\n"));
        }
        out.push_str(&self.summary());
        out.push('\n');
        out
    }

    /// Build the serializable report
    #[must_use]
    pub fn report(&self) -> RunReport {
        RunReport {
            run_id: self.run_id.to_string(),
            suite: self.suite_name.clone(),
            started_at: self.started_at.clone(),
            finished_at: now(),
            passed: self.passed_count(),
            failed: self.failed_count(),
            skipped: self.skipped.clone(),
            fatal: self.fatal.clone(),
            results: self.results.clone(),
        }
    }

    /// JSON report
    pub fn to_json(&self) -> SettleResult<String> {
        Ok(serde_json::to_string_pretty(&self.report())?)
    }

    /// Write the JSON report to `path`
    pub fn write_json(&self, path: &Path) -> SettleResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let total_ms: u64 = self.results.iter().map(|r| r.duration_ms).sum();
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.results.len() + self.skipped.len(),
            self.failed_count(),
            self.skipped.len(),
            total_ms as f64 / 1000.0
        ));
        xml.push('\n');

        for result in &self.results {
            xml.push_str(&format!(
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&result.scenario_name),
                result.duration_ms as f64 / 1000.0
            ));
            xml.push('\n');
            if let Some(reason) = result.failure_reason() {
                xml.push_str(&format!(
                    r#"    <failure message="{}">{}</failure>"#,
                    escape_xml(reason),
                    escape_xml(reason)
                ));
                xml.push('\n');
            }
            xml.push_str("  </testcase>\n");
        }
        for name in &self.skipped {
            xml.push_str(&format!(
                "  <testcase name=\"{}\">\n    <skipped/>\n  </testcase>\n",
                escape_xml(name)
            ));
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

impl ScenarioObserver for Reporter {
    fn on_scenario_complete(&mut self, result: &RunResult) {
        self.results.push(result.clone());
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.skipped.clone_from(&summary.skipped);
        self.fatal.clone_from(&summary.fatal);
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
