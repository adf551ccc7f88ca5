//! # Pipeline driver
//!
//! Sequences the CI/test workflow of the application: optional virtualenv
//! setup, optional lint, version computation, optional image build and push,
//! and the test suite. All work is delegated to external programs through a
//! [`CommandRunner`](services::runner::CommandRunner); the first failure ends the run.

#![warn(rust_2018_idioms, unused_lifetimes)]
#![allow(clippy::print_stderr, clippy::print_stdout)]

pub mod error;
pub mod handlers;
pub mod models;
pub mod services;

use crate::error::{PipelineErrorExt, Result};
use crate::handlers::pipeline::{PipelineContext, run_pipeline};
use crate::models::args::Cli;
use crate::models::environment::Environment;
use crate::models::run_config::RunConfig;
use crate::models::settings::Settings;
use crate::services::runner::{CommandRunner, DryRunner, SystemRunner};
use tracing::debug;

/// Resolves the invocation and runs the pipeline in the current directory.
///
/// # Errors
/// Returns the first validation or stage error; see [`error::PipelineError::exit_code`].
pub fn run(cli: &Cli) -> Result<()> {
    let root = std::env::current_dir().context("Failed to resolve the working directory")?;
    let env = Environment::capture();
    let settings = Settings::load(&root, cli.config.as_deref(), &env)?;
    let config = RunConfig::from_cli(cli);
    debug!(?config, "Resolved run configuration");

    let dry_runner = DryRunner::default();
    let runner: &dyn CommandRunner = if config.dry_run { &dry_runner } else { &SystemRunner };

    run_pipeline(PipelineContext { config: &config, settings: &settings, root, runner, env })
}
