use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Injected by the macOS framework Python; breaks virtualenv shebangs when inherited.
pub const PYVENV_LAUNCHER: &str = "__PYVENV_LAUNCHER__";
/// Presence of this variable means the run happens on CI.
pub const CI_DETECTION_VAR: &str = "CIRCLECI";

const PATH_VAR: &str = "PATH";

/// Immutable snapshot of the variables every subprocess inherits.
///
/// The process environment is read once; derived environments are new values.
/// Names and values are kept as raw OS strings so nothing is lost on the way to a child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Snapshots the current process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    /// Builds a snapshot from explicit pairs, dropping [`PYVENV_LAUNCHER`].
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let mut vars: BTreeMap<OsString, OsString> =
            vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        vars.remove(OsStr::new(PYVENV_LAUNCHER));
        Self { vars }
    }

    /// Value of `key`, if it is set and valid UTF-8.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_os(key).and_then(OsStr::to_str)
    }

    #[must_use]
    pub fn get_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }

    /// Entries whose name and value are both valid UTF-8.
    pub fn iter_utf8(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter_map(|(k, v)| Some((k.to_str()?, v.to_str()?)))
    }

    #[must_use]
    pub fn is_ci(&self) -> bool {
        self.vars.contains_key(OsStr::new(CI_DETECTION_VAR))
    }

    /// Worker count handed to the test runner: CI machines get a reduced fixed level.
    #[must_use]
    pub fn test_parallelism(&self) -> &'static str {
        if self.is_ci() { "2" } else { "auto" }
    }

    /// Returns a copy with `key` set to `value`.
    #[must_use]
    pub fn with_var(&self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(key.into(), value.into());
        Self { vars }
    }

    /// Returns a copy whose `PATH` starts with `dir`.
    ///
    /// # Errors
    /// Returns [`PipelineError::InvalidArgument`] if `dir` contains the path separator.
    pub fn with_path_prefix(&self, dir: &Path) -> Result<Self> {
        let existing = self.get_os(PATH_VAR).into_iter().flat_map(std::env::split_paths);
        let joined = std::env::join_paths(std::iter::once(dir.to_path_buf()).chain(existing))
            .map_err(|e| PipelineError::InvalidArgument {
                message: e.to_string().into(),
                context: Some(format!("Prepending {} to PATH", dir.display()).into()),
            })?;

        Ok(self.with_var(PATH_VAR, joined))
    }

    /// Resolves `program` against this snapshot's `PATH`.
    ///
    /// Names containing a path separator are checked as given.
    #[must_use]
    pub fn locate(&self, program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 {
            return is_executable(candidate).then(|| candidate.to_path_buf());
        }

        let search = self.get_os(PATH_VAR)?;
        std::env::split_paths(search)
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.join(format!("{program}{}", std::env::consts::EXE_SUFFIX)))
            .find(|path| is_executable(path))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
