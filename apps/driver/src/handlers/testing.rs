use crate::error::Result;
use crate::handlers::pipeline::PipelineContext;
use crate::handlers::setup::cache_privileges;
use std::collections::BTreeMap;

/// Registry the test suite pulls images from.
pub const REGISTRY_VAR: &str = "PIPELINE_REGISTRY";
/// Version of the images under test.
pub const VERSION_VAR: &str = "PIPELINE_VERSION";
/// Keeps the application from reporting usage while under test.
pub const TELEMETRY_OPT_OUT: (&str, &str) = ("DO_NOT_TRACK", "1");

/// Fixed runner arguments: verbose output and a per-test timeout enforced by the runner.
const BASE_ARGS: [&str; 3] = ["-v", "--timeout=360", "--timeout_method=thread"];

/// Environment entries added for the test run; caller overrides win.
///
/// `registry` is the validated registry the images were pushed to.
#[must_use]
pub fn test_environment(
    ctx: &PipelineContext<'_>,
    registry: Option<&str>,
    version: &str,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if let Some(registry) = registry {
        env.insert(REGISTRY_VAR.to_owned(), registry.to_owned());
    }
    env.insert(VERSION_VAR.to_owned(), version.to_owned());
    env.insert(TELEMETRY_OPT_OUT.0.to_owned(), TELEMETRY_OPT_OUT.1.to_owned());
    env.extend(ctx.config.test_env.clone());
    env
}

/// Runner arguments: the fixed base, optional worker count, then the caller's arguments.
#[must_use]
pub fn runner_args(ctx: &PipelineContext<'_>) -> Vec<String> {
    let mut args: Vec<String> = BASE_ARGS.iter().map(|a| (*a).to_owned()).collect();
    if ctx.config.parallel {
        args.push("-n".to_owned());
        args.push(ctx.env.test_parallelism().to_owned());
    }
    args.extend(ctx.config.test_args.iter().cloned());
    args
}

/// Runs the test suite against the images tagged `version`.
///
/// # Errors
/// Returns an error if `sudo` fails or the test runner exits unsuccessfully.
pub fn run_tests(ctx: &PipelineContext<'_>, registry: Option<&str>, version: &str) -> Result<()> {
    cache_privileges(ctx)?;

    println!("🧪 Running tests via '{}'...", ctx.settings.tests.runner);
    let command = ctx
        .command(ctx.settings.tests.runner.clone())
        .args(runner_args(ctx))
        .envs(test_environment(ctx, registry, version));
    ctx.runner.run(&command, &ctx.env)
}
