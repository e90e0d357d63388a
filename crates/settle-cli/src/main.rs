//! Settle CLI: run scripted UI scenarios from YAML suites
//!
//! ## Usage
//!
//! ```bash
//! settle check demos/editor-modes.yaml           # Validate a suite
//! settle list demos/editor-modes.yaml            # Show scenarios and steps
//! settle run demos/editor-modes.yaml --url URL   # Run against Chromium
//! ```

use clap::Parser;
use settle::Reporter;
use settle_cli::{
    handlers::{execute_check, execute_list, execute_run},
    logging::init_tracing,
    Cli, CliConfig, CliResult, ColorChoice, Commands, ConsoleReporter, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_tracing(config.verbosity);

    match cli.command {
        Commands::Check(args) => {
            let console = ConsoleReporter::new(
                Reporter::new(),
                config.color.should_color(),
                config.verbosity.is_quiet(),
            );
            execute_check(&console, &args)
        }
        Commands::List(args) => execute_list(&args),
        Commands::Run(args) => execute_run(&config, &args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.verbose, cli.quiet);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
