use crate::error::Result;
use crate::handlers::pipeline::PipelineContext;
use crate::models::environment::Environment;
use tracing::info;

/// Asks for the `sudo` password now, so that no prompt shows up halfway through the run.
///
/// # Errors
/// Returns an error if `sudo` cannot be run or the authentication fails.
pub fn cache_privileges(ctx: &PipelineContext<'_>) -> Result<()> {
    println!("🔐 Caching sudo credentials...");
    ctx.runner.run(&ctx.command("sudo").arg("true"), &ctx.env)
}

/// Deletes and recreates the virtualenv, then installs the development dependencies.
///
/// # Result
/// Returns the environment later stages run in: the virtualenv's `bin` leads `PATH`
/// and `VIRTUAL_ENV` points at it.
///
/// # Errors
/// Returns an error if the old tree cannot be removed or `virtualenv`/`pip` fail.
pub fn recreate_virtualenv(ctx: &PipelineContext<'_>) -> Result<Environment> {
    let venv = ctx.root().join(&ctx.settings.virtualenv.path);
    let bin = venv.join(if cfg!(windows) { "Scripts" } else { "bin" });

    println!("🐍 Recreating virtualenv at {}...", venv.display());
    ctx.runner.remove_dir_all(&venv)?;

    let create = ctx
        .command("virtualenv")
        .arg(format!("--python={}", ctx.settings.virtualenv.python))
        .arg(venv.display().to_string());
    ctx.runner.run(&create, &ctx.env)?;

    let pip = bin.join("pip");
    let install = ctx
        .command(pip.display().to_string())
        .arg("install")
        .args(ctx.settings.virtualenv.install.iter().cloned());
    ctx.runner.run(&install, &ctx.env)?;

    info!(path = %venv.display(), "Virtualenv ready");
    let env = ctx.env.with_path_prefix(&bin)?;
    Ok(env.with_var("VIRTUAL_ENV", venv.as_os_str()))
}
