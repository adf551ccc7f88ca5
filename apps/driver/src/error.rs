use std::borrow::Cow;
use std::path::PathBuf;

/// Exit status reserved for user-input errors (missing tool, missing registry, bad settings).
pub const USAGE_EXIT_CODE: u8 = 2;
/// Exit status used when an external program cannot be started at all.
pub const SPAWN_EXIT_CODE: u8 = 127;

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Every way a pipeline run can terminate early.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A tool required by the requested stages is not on `PATH`.
    #[error("Required tool '{tool}' was not found on PATH{}", format_context(.context))]
    MissingTool { tool: String, context: Option<Cow<'static, str>> },

    /// Images must be pushed somewhere.
    #[error("A registry is required to build and push images{}", format_context(.context))]
    MissingRegistry { context: Option<Cow<'static, str>> },

    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The layered settings could not be built or deserialized.
    #[error("Settings error{}: {source}", format_context(.context))]
    Settings { source: config::ConfigError, context: Option<Cow<'static, str>> },

    /// An external command ran and reported failure.
    #[error("'{command}' failed with {}", describe_code(.code))]
    CommandFailed { command: String, code: Option<i32> },

    /// An external command could not be started.
    #[error("Failed to execute '{program}'{}: {source}", format_context(.context))]
    Spawn { program: String, source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("{} file(s) are missing the license header", .files.len())]
    LicenseHeader { files: Vec<PathBuf> },

    #[error("Version error{}: {message}", format_context(.context))]
    Version { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },
}

impl PipelineError {
    /// Maps the error onto the process exit status.
    ///
    /// Failed commands hand their own status through; a command killed by a
    /// signal has no status and maps to `1`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingTool { .. }
            | Self::MissingRegistry { .. }
            | Self::InvalidArgument { .. }
            | Self::Settings { .. } => USAGE_EXIT_CODE,
            Self::CommandFailed { code, .. } => {
                code.and_then(|c| u8::try_from(c).ok()).filter(|c| *c != 0).unwrap_or(1)
            },
            Self::Spawn { .. } => SPAWN_EXIT_CODE,
            Self::LicenseHeader { .. } | Self::Version { .. } | Self::Io { .. } => 1,
        }
    }
}

/// Adds `.context(...)` to results whose error converts into [`PipelineError`].
pub trait PipelineErrorExt<T> {
    /// Attaches a human readable context to the error.
    ///
    /// # Errors
    /// Returns the wrapped error with the context attached.
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T> PipelineErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| PipelineError::Io { source, context: Some(context.into()) })
    }
}

impl<T> PipelineErrorExt<T> for std::result::Result<T, config::ConfigError> {
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| PipelineError::Settings { source, context: Some(context.into()) })
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source, context: None }
    }
}

impl From<config::ConfigError> for PipelineError {
    fn from(source: config::ConfigError) -> Self {
        Self::Settings { source, context: None }
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

fn describe_code(code: &Option<i32>) -> String {
    code.map_or_else(
        || "no exit status (terminated by signal)".to_owned(),
        |c| format!("exit status {c}"),
    )
}
