//! # CLI Argument Definitions
//!
//! This module defines the command-line surface of the pipeline driver using the `clap` crate.
//! Every flag is independent except `--circle`, which replaces several of them with the CI profile.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// The main CLI structure parsing command-line arguments.
#[derive(Debug, Default, Parser)]
#[command(name = "pipeline")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sets up, lints, builds, pushes and tests the application in one pass")]
pub struct Cli {
    /// Use the fixed CI profile (overrides --registry, --version-suffix, --lint,
    /// --manage-virtualenv and --build-and-push)
    #[arg(long)]
    pub circle: bool,

    /// Container registry the images are pushed to
    #[arg(long, value_name = "REGISTRY")]
    pub registry: Option<String>,

    /// Build and push the container images
    #[arg(long)]
    pub build_and_push: bool,

    /// Version suffix template; supports the {OS} and {TIME} placeholders
    #[arg(long, value_name = "FMT", default_value = "", allow_hyphen_values = true)]
    pub version_suffix: String,

    /// Recreate the virtualenv before doing anything else
    #[arg(long)]
    pub manage_virtualenv: bool,

    /// Skip the test suite
    #[arg(long)]
    pub no_tests: bool,

    /// Run the linters and the license header check
    #[arg(long)]
    pub lint: bool,

    /// Extra environment entry for the test run (repeatable, ignored with --circle)
    #[arg(long = "test-env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub test_env: Vec<(String, String)>,

    /// Let the test runner distribute tests over several workers
    #[arg(long)]
    pub parallel: bool,

    /// Print the commands that would run instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// Settings file (defaults to ./pipeline.toml when present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Also write the run log into this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Arguments passed verbatim to the test runner
    #[arg(value_name = "TEST_ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub test_args: Vec<String>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        },
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}
