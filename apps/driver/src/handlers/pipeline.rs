use crate::error::{PipelineError, Result};
use crate::handlers::{images, lint, setup, testing};
use crate::models::environment::Environment;
use crate::models::run_config::RunConfig;
use crate::models::settings::Settings;
use crate::services::runner::{CommandRunner, CommandSpec};
use crate::services::version;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything a stage needs: what to do, where, and how to run commands.
#[derive(Debug)]
pub struct PipelineContext<'a> {
    pub config: &'a RunConfig,
    pub settings: &'a Settings,
    pub root: PathBuf,
    pub runner: &'a dyn CommandRunner,
    pub env: Environment,
}

impl PipelineContext<'_> {
    /// A command rooted at the project directory.
    #[must_use]
    pub fn command(&self, program: impl Into<String>) -> CommandSpec {
        CommandSpec::new(program).current_dir(&self.root)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Runs the stages in their fixed order: validation, privileges, virtualenv,
/// lint, version, images, tests.
///
/// # Errors
/// Returns the first validation error or the first failing stage's error.
pub fn run_pipeline(mut ctx: PipelineContext<'_>) -> Result<()> {
    let registry = validate(&ctx)?;

    if ctx.config.run_tests {
        setup::cache_privileges(&ctx)?;
    }

    if ctx.config.manage_virtualenv {
        ctx.env = setup::recreate_virtualenv(&ctx)?;
    }

    if ctx.config.lint {
        lint::run_lint(&ctx)?;
    }

    let version =
        version::compute_version(ctx.runner, &ctx.env, &ctx.root, &ctx.config.version_suffix)?;
    println!("🏷️  Version: {version}");

    if ctx.config.build_and_push
        && let Some(registry) = registry.as_deref()
    {
        images::build_and_push(&ctx, registry, &version)?;
    }

    if ctx.config.run_tests {
        testing::run_tests(&ctx, registry.as_deref(), &version)?;
    }

    info!("Pipeline finished");
    Ok(())
}

/// Checks user input before anything with side effects runs.
///
/// Returns the normalized registry: surrounding whitespace and trailing `/` removed,
/// blank treated as absent.
fn validate(ctx: &PipelineContext<'_>) -> Result<Option<String>> {
    if ctx.config.run_tests {
        let tool = &ctx.settings.tests.required_tool;
        if ctx.env.locate(tool).is_none() {
            return Err(PipelineError::MissingTool {
                tool: tool.clone(),
                context: Some("required to run the test suite; pass --no-tests to skip it".into()),
            });
        }
    }

    let registry = ctx
        .config
        .registry
        .as_deref()
        .map(|r| r.trim().trim_end_matches('/'))
        .filter(|r| !r.is_empty())
        .map(str::to_owned);

    if ctx.config.build_and_push && registry.is_none() {
        return Err(PipelineError::MissingRegistry {
            context: Some("pass --registry REGISTRY".into()),
        });
    }
    Ok(registry)
}
