//! List command handler

use settle::Suite;

use crate::commands::SuiteArgs;
use crate::error::CliResult;
use crate::handlers::load_suite;

/// Print scenarios and their steps
pub fn execute_list(args: &SuiteArgs) -> CliResult<()> {
    let suite = load_suite(&args.suite, args.filter.as_deref())?;
    print!("{}", render_listing(&suite));
    Ok(())
}

/// Plain-text listing of a suite
#[must_use]
pub fn render_listing(suite: &Suite) -> String {
    let mut out = format!("{}\n", suite.name);
    if !suite.baseline.is_empty() {
        out.push_str("  baseline\n");
        for (i, step) in suite.baseline.iter().enumerate() {
            out.push_str(&format!("    {}. {step}\n", i + 1));
        }
    }
    for scenario in &suite.scenarios {
        out.push_str(&format!("  {}\n", scenario.name()));
        for (i, step) in scenario.steps().iter().enumerate() {
            out.push_str(&format!("    {}. {step}\n", i + 1));
        }
    }
    out
}
