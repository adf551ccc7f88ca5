use crate::error::Result;
use crate::handlers::pipeline::PipelineContext;
use crate::services::docker::ImageBuilder;
use crate::services::runner::run_steps;

/// Builds every image, then pushes every image.
///
/// # Errors
/// Returns the first failing `docker` invocation's error; nothing is pushed if a build fails.
pub fn build_and_push(ctx: &PipelineContext<'_>, registry: &str, version: &str) -> Result<()> {
    let builder = ImageBuilder::new(ctx.root(), registry, version, &ctx.settings.images.0);

    println!("🐳 Building images...");
    run_steps(ctx.runner, &builder.build_steps(), &ctx.env)?;

    println!("📤 Pushing images to {registry}...");
    run_steps(ctx.runner, &builder.push_steps(), &ctx.env)
}
