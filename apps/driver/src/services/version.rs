use crate::error::{PipelineError, Result};
use crate::models::environment::Environment;
use crate::services::runner::{CommandRunner, CommandSpec};
use chrono::Utc;
use std::fmt;
use std::path::Path;

const OS_PLACEHOLDER: &str = "{OS}";
const TIME_PLACEHOLDER: &str = "{TIME}";

/// Operating system tag substituted for `{OS}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsTag {
    Linux,
    Osx,
}

impl OsTag {
    /// Tag of the platform the driver was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") { Self::Osx } else { Self::Linux }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Osx => "osx",
        }
    }
}

impl fmt::Display for OsTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expands `{OS}` and `{TIME}` in a suffix template.
#[must_use]
pub fn render_suffix(template: &str, os: OsTag, unix_seconds: i64) -> String {
    template
        .replace(OS_PLACEHOLDER, os.as_str())
        .replace(TIME_PLACEHOLDER, &unix_seconds.to_string())
}

/// Joins `git describe` output with an already rendered suffix.
///
/// # Errors
/// Returns [`PipelineError::Version`] if `describe` is blank.
pub fn compose_version(describe: &str, suffix: &str) -> Result<String> {
    let tag = describe.trim();
    if tag.is_empty() {
        return Err(PipelineError::Version {
            message: "git describe returned no tag".into(),
            context: Some("Is there at least one tag in the repository?".into()),
        });
    }
    Ok(format!("{tag}{suffix}"))
}

/// Computes the image version for this run from `git describe --tags` in `root`.
///
/// # Errors
/// Returns an error if `git` fails or prints nothing.
pub fn compute_version(
    runner: &dyn CommandRunner,
    env: &Environment,
    root: &Path,
    template: &str,
) -> Result<String> {
    let describe = runner
        .capture(&CommandSpec::new("git").args(["describe", "--tags"]).current_dir(root), env)?;
    compose_version(&describe, &render_suffix(template, OsTag::current(), Utc::now().timestamp()))
}
