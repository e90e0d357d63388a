//! Command handlers - extracted from main.rs for testability

pub mod check;
pub mod list;
pub mod run;

pub use check::execute_check;
pub use list::{execute_list, render_listing};
pub use run::{apply_overrides, execute_run, resolve_url};

use std::path::Path;

use settle::Suite;

use crate::error::CliResult;

/// Load and validate a suite, keeping only scenarios matching `filter`
pub fn load_suite(path: &Path, filter: Option<&str>) -> CliResult<Suite> {
    let suite = Suite::load(path)?;
    suite.validate()?;
    Ok(match filter {
        Some(pattern) => suite.filter(pattern),
        None => suite,
    })
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_load_with_filter() {
        let suite = load_suite(&fixtures::demo_suite(), Some("sidebar")).unwrap();
        assert_eq!(suite.scenarios.len(), 2);
    }

    #[test]
    fn test_load_rejects_invalid_suite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "version: \"1\"\nscenarios: []\n").unwrap();
        assert!(matches!(load_suite(&path, None), Err(CliError::Settle(_))));
    }
}
