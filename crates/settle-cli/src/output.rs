//! Console output and progress reporting

use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use settle::{Reporter, RunResult, RunSummary, ScenarioObserver, ScenarioState};

/// Prints results as scenarios finish and keeps the full report
#[derive(Debug)]
pub struct ConsoleReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    report: Reporter,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl ConsoleReporter {
    /// Create a console reporter around a collecting [`Reporter`]
    #[must_use]
    pub fn new(report: Reporter, use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            report,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
    }

    /// The collected report
    #[must_use]
    pub const fn report(&self) -> &Reporter {
        &self.report
    }

    /// Give the collected report back
    #[must_use]
    pub fn into_report(self) -> Reporter {
        self.report
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "PASS".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a failure message
    pub fn failure(&self, message: &str) {
        // Always print failures, even in quiet mode
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "FAIL".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(&format!("{prefix} {message}"));
    }

    /// Print an indented detail line
    pub fn detail(&self, message: &str) {
        let message = if self.use_color {
            style(message).dim().to_string()
        } else {
            message.to_string()
        };
        self.line(&format!("    {message}"));
    }

    fn line(&self, text: &str) {
        match &self.progress_bar {
            Some(pb) => pb.println(text),
            None => {
                let _ = self.term.write_line(text);
            }
        }
    }
}

impl ScenarioObserver for ConsoleReporter {
    fn on_scenario_complete(&mut self, result: &RunResult) {
        self.report.on_scenario_complete(result);
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
            pb.set_message(result.scenario_name.clone());
        }

        let title = format!("{} ({}ms)", result.scenario_name, result.duration_ms);
        if result.passed() {
            self.success(&title);
            return;
        }
        match result.state {
            ScenarioState::TimedOut => self.failure(&format!("{title} timed out")),
            _ => self.failure(&title),
        }
        if let Some(error) = &result.baseline_error {
            self.detail(&format!("baseline: {error}"));
        }
        if let Some(step) = result.failed_step() {
            self.detail(&format!("step {}: {}", step.index + 1, step.description));
            if let Some(mismatch) = &step.mismatch {
                self.detail(&format!("expected: {:?}", mismatch.expected));
                self.detail(&format!("observed: {:?}", mismatch.observed));
            } else if let Some(diagnostic) = &step.diagnostic {
                self.detail(diagnostic);
            }
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        self.report.on_run_complete(summary);
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
        for name in &summary.skipped {
            self.warning(&format!("skipped {name}"));
        }
        if let Some(fatal) = &summary.fatal {
            self.failure(&format!("run aborted: {fatal}"));
        }
        if !self.quiet {
            let line = self.report.summary();
            let line = if !self.use_color {
                line
            } else if summary.all_passed() {
                style(line).green().to_string()
            } else {
                style(line).red().to_string()
            };
            let _ = self.term.write_line(&line);
        }
    }
}
