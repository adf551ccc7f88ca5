use crate::error::{PipelineErrorExt, Result};
use crate::models::environment::Environment;
use config::{Config, File, FileFormat, Map};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings file picked up from the working directory when `--config` is absent.
pub const DEFAULT_SETTINGS_FILE: &str = "pipeline.toml";
/// Environment prefix for overrides (e.g. `PIPELINE__TESTS__RUNNER=py.test`).
pub const SETTINGS_ENV_PREFIX: &str = "PIPELINE";

/// Project layout the pipeline operates on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub virtualenv: VirtualenvSettings,
    pub lint: LintSettings,
    pub license: LicenseSettings,
    pub images: ImageList,
    pub tests: TestSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VirtualenvSettings {
    /// Directory of the virtualenv, relative to the project root.
    pub path: PathBuf,
    pub python: String,
    /// Arguments handed to `pip install`.
    pub install: Vec<String>,
}

impl Default for VirtualenvSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("virtualenv"),
            python: "python3".to_owned(),
            install: ["-r", "dev-requirements.txt", "-e", "."].map(str::to_owned).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LintSettings {
    /// Each entry is a program followed by its arguments, run in order.
    pub commands: Vec<Vec<String>>,
}

impl Default for LintSettings {
    fn default() -> Self {
        let commands: [&[&str]; 3] = [
            &["flake8", "src", "tests"],
            &["mypy", "src"],
            &["yapf", "--diff", "--recursive", "src", "tests"],
        ];
        Self {
            commands: commands
                .iter()
                .map(|command| command.iter().map(|part| (*part).to_owned()).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LicenseSettings {
    /// Text that must appear somewhere in every tracked file.
    pub header: String,
    pub directories: Vec<PathBuf>,
    /// Extension without the leading dot.
    pub extension: String,
}

impl Default for LicenseSettings {
    fn default() -> Self {
        Self {
            header: "Licensed under the Apache License, Version 2.0".to_owned(),
            directories: vec![PathBuf::from("src"), PathBuf::from("tests")],
            extension: "py".to_owned(),
        }
    }
}

/// One container image built from a local context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageSettings {
    pub name: String,
    pub context: PathBuf,
    pub dockerfile: PathBuf,
}

impl ImageSettings {
    fn new(name: &str, context: &str, dockerfile: &str) -> Self {
        Self {
            name: name.to_owned(),
            context: PathBuf::from(context),
            dockerfile: PathBuf::from(dockerfile),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ImageList(pub Vec<ImageSettings>);

impl Default for ImageList {
    fn default() -> Self {
        Self(vec![
            ImageSettings::new("app-k8s", "k8s-proxy", "k8s-proxy/Dockerfile"),
            ImageSettings::new("app-k8s-priv", "k8s-proxy", "k8s-proxy/Dockerfile.priv"),
            ImageSettings::new("app-local", "local-docker", "local-docker/Dockerfile"),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TestSettings {
    pub runner: String,
    /// Tool the test suite drives; its absence aborts the run up front.
    pub required_tool: String,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self { runner: "pytest".to_owned(), required_tool: "kubectl".to_owned() }
    }
}

impl Settings {
    /// Loads settings from built-in defaults, a TOML file and `PIPELINE__` variables.
    ///
    /// 1. **Defaults**: every field has a built-in value.
    /// 2. **File**: `path` if given (must exist), otherwise `pipeline.toml` in `root` if present.
    /// 3. **Environment**: `PIPELINE__SECTION__KEY` entries of `env` override scalar values.
    ///
    /// # Errors
    /// Returns [`crate::error::PipelineError::Settings`] if an explicit file is missing,
    /// a file is malformed, or a value has the wrong type.
    pub fn load(root: &Path, path: Option<&Path>, env: &Environment) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).format(FileFormat::Toml).required(true),
            None => {
                let default = root.join(DEFAULT_SETTINGS_FILE);
                File::from(default).format(FileFormat::Toml).required(false)
            },
        };

        match path {
            Some(p) => info!("Loading settings from {}", p.display()),
            None => debug!("Looking for optional settings in {}", root.display()),
        }

        let overrides: Map<String, String> =
            env.iter_utf8().map(|(k, v)| (k.to_owned(), v.to_owned())).collect();

        Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(SETTINGS_ENV_PREFIX)
                    .separator("__")
                    .source(Some(overrides)),
            )
            .build()
            .context("Failed to build settings")?
            .try_deserialize::<Self>()
            .context("Failed to deserialize settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_describe_three_images() {
        let settings = Settings::default();
        let names: Vec<_> = settings.images.0.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["app-k8s", "app-k8s-priv", "app-local"]);
        assert_eq!(settings.lint.commands.len(), 3);
        assert_eq!(settings.license.extension, "py");
        assert_eq!(settings.tests.required_tool, "kubectl");
    }

    #[test]
    fn missing_optional_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path(), None, &Environment::default()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_SETTINGS_FILE),
            r#"
[lint]
commands = [["ruff", "check", "."]]

[license]
header = "Copyright Example"
extension = "rs"

[[images]]
name = "solo"
context = "."
dockerfile = "Dockerfile"
"#,
        )
        .unwrap();

        let settings = Settings::load(dir.path(), None, &Environment::default()).unwrap();
        assert_eq!(settings.lint.commands, [["ruff", "check", "."]]);
        assert_eq!(settings.license.header, "Copyright Example");
        assert_eq!(settings.license.directories, LicenseSettings::default().directories);
        assert_eq!(settings.images.0, [ImageSettings::new("solo", ".", "Dockerfile")]);
        assert_eq!(settings.tests, TestSettings::default());
    }

    #[test]
    fn explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = Settings::load(dir.path(), Some(&missing), &Environment::default()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::USAGE_EXIT_CODE);
    }

    #[test]
    fn overrides_come_from_the_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::from_vars([
            ("PIPELINE__TESTS__RUNNER", "py.test"),
            ("UNRELATED", "ignored"),
        ]);

        let settings = Settings::load(dir.path(), None, &env).unwrap();
        assert_eq!(settings.tests.runner, "py.test");
        assert_eq!(settings.tests.required_tool, "kubectl");

        let plain = Settings::load(dir.path(), None, &Environment::default()).unwrap();
        assert_eq!(plain.tests.runner, "pytest");
    }
}
