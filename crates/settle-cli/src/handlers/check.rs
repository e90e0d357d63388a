//! Check command handler

use crate::commands::SuiteArgs;
use crate::error::CliResult;
use crate::handlers::load_suite;
use crate::output::ConsoleReporter;

/// Validate a suite file and print what it contains
pub fn execute_check(console: &ConsoleReporter, args: &SuiteArgs) -> CliResult<()> {
    let suite = load_suite(&args.suite, args.filter.as_deref())?;
    if suite.scenarios.is_empty() {
        console.warning("no scenario matches the filter");
        return Ok(());
    }
    console.success(&format!(
        "{} is valid: {} scenarios, {} steps, {} baseline steps",
        args.suite.display(),
        suite.scenarios.len(),
        suite.step_count(),
        suite.baseline.len()
    ));
    if suite.url.is_none() {
        console.warning("suite has no url; `settle run` will need --url");
    }
    Ok(())
}
