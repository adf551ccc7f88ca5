use crate::models::settings::ImageSettings;
use crate::services::runner::{CommandSpec, Step};
use std::path::{Path, PathBuf};

/// Builds the `docker` invocations for a set of images tagged with one version.
#[derive(Debug)]
pub struct ImageBuilder<'a> {
    root: PathBuf,
    registry: &'a str,
    version: &'a str,
    images: &'a [ImageSettings],
}

impl<'a> ImageBuilder<'a> {
    /// Creates a builder resolving image contexts against `root`.
    #[must_use]
    pub fn new(
        root: &Path,
        registry: &'a str,
        version: &'a str,
        images: &'a [ImageSettings],
    ) -> Self {
        Self { root: root.to_path_buf(), registry: registry.trim_end_matches('/'), version, images }
    }

    /// Full reference an image is built and pushed under.
    #[must_use]
    pub fn tag(&self, image: &ImageSettings) -> String {
        format!("{}/{}:{}", self.registry, image.name, self.version)
    }

    /// `docker build` for every image, in declaration order.
    #[must_use]
    pub fn build_steps(&self) -> Vec<Step> {
        self.images
            .iter()
            .map(|image| {
                let command = self
                    .docker()
                    .arg("build")
                    .arg("-f")
                    .arg(image.dockerfile.display().to_string())
                    .arg("-t")
                    .arg(self.tag(image))
                    .arg(image.context.display().to_string());
                Step::new(format!("build {}", image.name), command)
            })
            .collect()
    }

    /// `docker push` for every image, in declaration order.
    #[must_use]
    pub fn push_steps(&self) -> Vec<Step> {
        self.images
            .iter()
            .map(|image| {
                let command = self.docker().arg("push").arg(self.tag(image));
                Step::new(format!("push {}", image.name), command)
            })
            .collect()
    }

    fn docker(&self) -> CommandSpec {
        CommandSpec::new("docker").current_dir(&self.root)
    }
}
