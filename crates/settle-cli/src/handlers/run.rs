//! Run command handler

use settle::{Reporter, Suite, TimingConfig};

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::handlers::load_suite;
use crate::output::ConsoleReporter;

/// Apply `--timeout-ms` and `--poll-ms` to the suite timing
pub fn apply_overrides(timing: TimingConfig, args: &RunArgs) -> CliResult<TimingConfig> {
    let mut timing = timing;
    if let Some(ms) = args.timeout_ms {
        timing = timing
            .with_timeout(ms)
            .with_action_timeout(ms)
            .with_assertion_timeout(ms);
    }
    if let Some(ms) = args.poll_ms {
        timing = timing.with_poll_interval(ms);
    }
    timing
        .validate()
        .map_err(|e| CliError::invalid_argument(e.to_string()))?;
    Ok(timing)
}

/// Page to open before each scenario: `--url`, else the suite's `url`
pub fn resolve_url(suite: &Suite, args: &RunArgs) -> CliResult<String> {
    args.url
        .clone()
        .or_else(|| suite.url.clone())
        .ok_or_else(|| CliError::invalid_argument("no URL: pass --url or set `url` in the suite"))
}

/// Run a suite against Chromium
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let mut suite = load_suite(&args.suite, args.filter.as_deref())?;
    if suite.scenarios.is_empty() {
        return Err(CliError::invalid_argument("no scenario matches the filter"));
    }
    suite.timing = apply_overrides(suite.timing, args)?;
    let url = resolve_url(&suite, args)?;
    let console = ConsoleReporter::new(
        Reporter::new().with_name(&suite.name),
        config.color.should_color(),
        config.verbosity.is_quiet(),
    );
    browser::run(console, suite, url, args)
}

#[cfg(feature = "browser")]
mod browser {
    use async_trait::async_trait;
    use settle::{
        BaselineSetup, BrowserConfig, ChromiumDriver, FailureMode, RunnerConfig, ScenarioRunner,
        SettleResult, StepsBaseline, Suite, TimingConfig,
    };
    use tracing::warn;

    use super::{CliError, CliResult, ConsoleReporter, RunArgs};

    /// Reload the page, then replay the suite baseline
    struct NavigateBaseline {
        url: String,
        steps: StepsBaseline,
    }

    #[async_trait]
    impl BaselineSetup<ChromiumDriver> for NavigateBaseline {
        async fn establish(&self, driver: &ChromiumDriver, timing: &TimingConfig) -> SettleResult<()> {
            driver.navigate(&self.url).await?;
            self.steps.establish(driver, timing).await
        }
    }

    pub(super) fn run(
        mut console: ConsoleReporter,
        suite: Suite,
        url: String,
        args: &RunArgs,
    ) -> CliResult<()> {
        let mut browser = BrowserConfig::default().with_headless(!args.headful);
        if args.no_sandbox {
            browser = browser.with_no_sandbox();
        }
        if let Some(path) = &args.chromium_path {
            browser = browser.with_chromium_path(path.clone());
        }
        let failure_mode = if args.fail_fast {
            FailureMode::AndonCord
        } else {
            FailureMode::CollectAll
        };
        let config = RunnerConfig::new()
            .with_timing(suite.timing)
            .with_failure_mode(failure_mode);
        let baseline = NavigateBaseline {
            url,
            steps: StepsBaseline::new(suite.baseline.clone()),
        };

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        let summary = runtime.block_on(async {
            let driver = ChromiumDriver::launch(&browser).await?;
            let runner = ScenarioRunner::new(driver, config);
            console.start_progress(suite.scenarios.len() as u64);
            let summary = runner.run_all(&suite, &baseline, &mut console).await;
            if let Err(e) = runner.into_driver().close().await {
                warn!(error = %e, "closing chromium failed");
            }
            summary
        })?;

        let report = console.into_report();
        if let Some(path) = &args.json {
            report.write_json(path)?;
        }
        if let Some(path) = &args.junit {
            std::fs::write(path, report.render_junit())?;
        }
        if summary.all_passed() {
            Ok(())
        } else {
            Err(CliError::ScenariosFailed {
                failed: summary.failed() + summary.skipped.len(),
                total: summary.results.len() + summary.skipped.len(),
            })
        }
    }
}

#[cfg(not(feature = "browser"))]
mod browser {
    use settle::Suite;

    use super::{CliError, CliResult, ConsoleReporter, RunArgs};

    pub(super) fn run(
        _console: ConsoleReporter,
        _suite: Suite,
        _url: String,
        _args: &RunArgs,
    ) -> CliResult<()> {
        Err(CliError::config(
            "settle was built without the `browser` feature; rebuild with --features browser",
        ))
    }
}
