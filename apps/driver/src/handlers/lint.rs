use crate::error::{PipelineError, Result};
use crate::handlers::pipeline::PipelineContext;
use crate::services::license::find_missing_headers;
use crate::services::runner::{Step, run_steps};
use tracing::info;

/// Runs every configured linter, then the license header check.
///
/// # Errors
/// Returns the first failing linter's error, or [`PipelineError::LicenseHeader`]
/// listing the files without the header.
pub fn run_lint(ctx: &PipelineContext<'_>) -> Result<()> {
    println!("🔍 Running linters...");
    let steps: Vec<Step> = ctx
        .settings
        .lint
        .commands
        .iter()
        .filter_map(|command| {
            let (program, args) = command.split_first()?;
            let command = ctx.command(program.clone()).args(args.iter().cloned());
            Some(Step::new(program.clone(), command))
        })
        .collect();
    run_steps(ctx.runner, &steps, &ctx.env)?;

    check_license_headers(ctx)
}

fn check_license_headers(ctx: &PipelineContext<'_>) -> Result<()> {
    let license = &ctx.settings.license;
    let missing = find_missing_headers(ctx.root(), license)?;

    if missing.is_empty() {
        info!(extension = %license.extension, "License headers present");
        return Ok(());
    }

    println!("❌ The following files are missing the license header \"{}\":", license.header);
    for file in &missing {
        println!("  {}", file.display());
    }
    Err(PipelineError::LicenseHeader { files: missing })
}
