use crate::error::{PipelineError, PipelineErrorExt, Result};
use crate::models::environment::Environment;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// An external program invocation: program, arguments, extra environment and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    envs: BTreeMap<String, String>,
    current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), envs: BTreeMap::new(), current_dir: None }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds environment entries on top of the inherited snapshot.
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.envs.extend(envs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub const fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.envs
    }

    fn to_command(&self, env: &Environment) -> Command {
        let program = env.locate(&self.program).unwrap_or_else(|| PathBuf::from(&self.program));
        let mut command = Command::new(program);
        command.args(&self.args).env_clear().envs(env.iter()).envs(&self.envs);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(part: &str) -> String {
    if !part.is_empty() && !part.contains(|c: char| c.is_whitespace() || c == '\'' || c == '"') {
        return part.to_owned();
    }
    format!("'{}'", part.replace('\'', r"'\''"))
}

/// A named entry in an ordered list of pipeline commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub command: CommandSpec,
}

impl Step {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self { name: name.into(), command }
    }
}

/// Executes external commands on behalf of the pipeline.
pub trait CommandRunner: fmt::Debug {
    /// Runs `command` to completion with inherited stdio.
    ///
    /// # Errors
    /// Returns [`PipelineError::Spawn`] if the program cannot start and
    /// [`PipelineError::CommandFailed`] if it exits unsuccessfully.
    fn run(&self, command: &CommandSpec, env: &Environment) -> Result<()>;

    /// Runs a read-only query and returns its stdout.
    ///
    /// # Errors
    /// Same as [`CommandRunner::run`].
    fn capture(&self, command: &CommandSpec, env: &Environment) -> Result<String>;

    /// Deletes a directory tree if it exists.
    ///
    /// # Errors
    /// Returns [`PipelineError::Io`] if the tree exists but cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Runs every step in order, stopping at the first failure.
///
/// # Errors
/// Returns the error of the first failing step.
pub fn run_steps(runner: &dyn CommandRunner, steps: &[Step], env: &Environment) -> Result<()> {
    for step in steps {
        debug!(step = %step.name, "Starting step");
        runner.run(&step.command, env)?;
    }
    Ok(())
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec, env: &Environment) -> Result<()> {
        info!("$ {command}");
        if !command.env_overrides().is_empty() {
            debug!(env = ?command.env_overrides(), "Environment overrides");
        }

        let status = command
            .to_command(env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| spawn_error(command, source))?;

        if !status.success() {
            return Err(PipelineError::CommandFailed {
                command: command.to_string(),
                code: status.code(),
            });
        }
        Ok(())
    }

    fn capture(&self, command: &CommandSpec, env: &Environment) -> Result<String> {
        debug!("$ {command}");
        let output = command
            .to_command(env)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| spawn_error(command, source))?;

        if !output.status.success() {
            return Err(PipelineError::CommandFailed {
                command: command.to_string(),
                code: output.status.code(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        info!("Removing {}", path.display());
        std::fs::remove_dir_all(path).context(format!("Failed to remove {}", path.display()))
    }
}

fn spawn_error(command: &CommandSpec, source: std::io::Error) -> PipelineError {
    PipelineError::Spawn {
        program: command.program().to_owned(),
        source,
        context: Some("Is it installed and on PATH?".into()),
    }
}

/// Prints side-effecting commands instead of running them.
///
/// Read-only queries still run so that derived values (the version tag) are real.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunner {
    queries: SystemRunner,
}

impl CommandRunner for DryRunner {
    fn run(&self, command: &CommandSpec, _env: &Environment) -> Result<()> {
        println!("[dry-run] {command}");
        Ok(())
    }

    fn capture(&self, command: &CommandSpec, env: &Environment) -> Result<String> {
        self.queries.capture(command, env)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        println!("[dry-run] rm -rf {}", quote(&path.display().to_string()));
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fake::RecordingRunner;
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let command = CommandSpec::new("docker").args(["build", "-t", "a b", "", "it's"]);
        assert_eq!(command.to_string(), r"docker build -t 'a b' '' 'it'\''s'");
    }

    #[test]
    fn steps_stop_at_first_failure() {
        let runner = RecordingRunner::failing("", "mypy", 4);
        let steps = [
            Step::new("flake8", CommandSpec::new("flake8").arg("src")),
            Step::new("mypy", CommandSpec::new("mypy").arg("src")),
            Step::new("yapf", CommandSpec::new("yapf").arg("--diff")),
        ];

        let err = run_steps(&runner, &steps, &Environment::default()).unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert_eq!(runner.lines(), ["flake8 src", "mypy src"]);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_status() {
        let env = Environment::from_vars([("PATH", "/bin:/usr/bin")]);
        let command = CommandSpec::new("sh").args(["-c", "exit 7"]);
        let err = SystemRunner.run(&command, &env).unwrap_err();
        assert!(matches!(err, PipelineError::CommandFailed { code: Some(7), .. }));
        assert_eq!(err.exit_code(), 7);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_passes_snapshot_and_overrides() {
        let env = Environment::from_vars([("PATH", "/bin:/usr/bin"), ("FROM_SNAPSHOT", "a")]);
        let command = CommandSpec::new("sh")
            .args(["-c", "printf '%s-%s' \"$FROM_SNAPSHOT\" \"$FROM_OVERRIDE\""])
            .envs([("FROM_OVERRIDE", "b")]);
        assert_eq!(SystemRunner.capture(&command, &env).unwrap(), "a-b");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_variables_reach_the_child() {
        use std::os::unix::ffi::OsStrExt;

        let env = Environment::from_vars([("PATH", "/bin:/usr/bin")])
            .with_var("LATIN", std::ffi::OsStr::from_bytes(b"caf\xe9"));
        let command = CommandSpec::new("sh").args(["-c", "printf '%s' \"$LATIN\" | od -An -tx1"]);
        let dump = SystemRunner.capture(&command, &env).unwrap();
        assert_eq!(dump.split_whitespace().collect::<Vec<_>>(), ["63", "61", "66", "e9"]);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = SystemRunner
            .run(&CommandSpec::new("definitely-not-a-real-tool-4711"), &Environment::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Spawn { .. }));
        assert_eq!(err.exit_code(), crate::error::SPAWN_EXIT_CODE);
    }

    #[test]
    fn dry_runner_leaves_directories_alone() {
        let dir = tempfile::tempdir().unwrap();
        DryRunner::default().remove_dir_all(dir.path()).unwrap();
        assert!(dir.path().exists());
    }
}
