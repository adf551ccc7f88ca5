#![warn(rust_2018_idioms, unused_lifetimes)]
#![allow(clippy::print_stderr, clippy::print_stdout)]

use clap::Parser;
use pipeline_driver::error::USAGE_EXIT_CODE;
use pipeline_driver::models::args::Cli;
use pipeline_logger::Logger;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger = Logger::builder().name(env!("CARGO_BIN_NAME")).verbosity(cli.verbose);
    if let Some(dir) = &cli.log_dir {
        logger = logger.path(dir);
    }
    let _logger = match logger.init() {
        Ok(logger) => logger,
        Err(err) => {
            eprintln!("❌ {err}");
            return ExitCode::from(USAGE_EXIT_CODE);
        },
    };

    match pipeline_driver::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(?err, "Pipeline aborted");
            eprintln!("❌ {err}");
            ExitCode::from(err.exit_code())
        },
    }
}
