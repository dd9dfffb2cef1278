//! Process execution for git invocations.
//!
//! Everything that launches `git` goes through the [`Executor`] trait so that
//! the guard and the diff runner can be driven by a fake in tests. The real
//! implementation, [`SystemExecutor`], is a thin layer over
//! [`std::process::Command`].
//!
//! A non-zero exit status is *not* an error at this layer: the caller decides
//! what an exit code means, because `git diff` reports differences with exit 1.

use error_set::error_set;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

error_set! {
    /// Errors from launching an external command
    ExecError := {
        /// The process could not be spawned or waited on
        #[display("Failed to run '{command}': {message}")]
        Launch { command: String, message: String },
    }
}

/// A fully described external command: program, arguments, working
/// directory and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// The child's complete environment. Nothing is inherited.
    pub env: HashMap<String, String>,
    /// Log the command and its result at `info` instead of `debug`
    pub verbose: bool,
}

impl CommandLine {
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
            env: HashMap::new(),
            verbose: false,
        }
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

    #[must_use]
    pub fn envs(mut self, env: &HashMap<String, String>) -> Self {
        self.env
            .extend(env.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a command that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Exit status as shown in error messages
    pub fn status_description(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs a [`CommandLine`] and captures its output.
pub trait Executor {
    /// Returns `Err` only when the process could not be launched or waited
    /// on; a non-zero exit is reported through [`CommandOutput::exit_code`].
    fn execute(&self, command: &CommandLine) -> Result<CommandOutput, ExecError>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, command: &CommandLine) -> Result<CommandOutput, ExecError> {
        (**self).execute(command)
    }
}

/// Find `program` in the `PATH` of `env`, not the current process.
///
/// Names containing a path separator are used as given, and so is a name that
/// no `PATH` entry provides.
pub fn resolve_program(program: &str, env: &HashMap<String, String>) -> PathBuf {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return PathBuf::from(program);
    }
    env.get("PATH")
        .and_then(|paths| {
            std::env::split_paths(paths)
                .map(|dir| dir.join(program))
                .find(|candidate| candidate.is_file())
        })
        .unwrap_or_else(|| PathBuf::from(program))
}

/// [`Executor`] backed by [`std::process::Command`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, command: &CommandLine) -> Result<CommandOutput, ExecError> {
        if command.verbose {
            tracing::info!(cwd = %command.cwd.display(), "Executing: {}", command);
        } else {
            tracing::debug!(cwd = %command.cwd.display(), "Executing: {}", command);
        }

        let output = Command::new(resolve_program(&command.program, &command.env))
            .args(&command.args)
            .current_dir(&command.cwd)
            .env_clear()
            .envs(&command.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExecError::Launch {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        let output = CommandOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if command.verbose {
            tracing::info!(
                stdout_bytes = output.stdout.len(),
                stderr = %output.stderr_lossy().trim_end(),
                "'{}' finished with {}",
                command.program,
                output.status_description()
            );
        } else {
            tracing::debug!(
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "'{}' finished with {}",
                command.program,
                output.status_description()
            );
        }

        Ok(output)
    }
}

/// Scripted [`Executor`] that records every command it is asked to run.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct FakeExecutor {
        responses: RefCell<VecDeque<Result<CommandOutput, ExecError>>>,
        calls: RefCell<Vec<CommandLine>>,
    }

    impl FakeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a completed run
        pub fn respond(self, exit_code: i32, stdout: &[u8], stderr: &str) -> Self {
            self.responses.borrow_mut().push_back(Ok(CommandOutput {
                exit_code: Some(exit_code),
                stdout: stdout.to_vec(),
                stderr: stderr.as_bytes().to_vec(),
            }));
            self
        }

        /// Queue a launch failure
        pub fn fail_launch(self, message: &str) -> Self {
            self.responses
                .borrow_mut()
                .push_back(Err(ExecError::Launch {
                    command: "git".to_string(),
                    message: message.to_string(),
                }));
            self
        }

        pub fn calls(&self) -> Vec<CommandLine> {
            self.calls.borrow().clone()
        }
    }

    impl Executor for FakeExecutor {
        fn execute(&self, command: &CommandLine) -> Result<CommandOutput, ExecError> {
            self.calls.borrow_mut().push(command.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ExecError::Launch {
                        command: command.to_string(),
                        message: "no scripted response".to_string(),
                    })
                })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn command_line_display_joins_args() {
        let cmd = CommandLine::new("git", "/tmp").args(["diff", "--no-color", "--", "a", "b"]);
        assert_eq!(cmd.to_string(), "git diff --no-color -- a b");
    }

    #[test]
    fn envs_accumulate() {
        let mut first = HashMap::new();
        first.insert("HOME".to_string(), "/home/me".to_string());
        let mut second = HashMap::new();
        second.insert("LANG".to_string(), "C".to_string());

        let cmd = CommandLine::new("git", "/tmp").envs(&first).envs(&second);
        assert_eq!(cmd.env.len(), 2);
        assert_eq!(cmd.env["LANG"], "C");
    }

    #[test]
    fn output_success_requires_zero_exit() {
        let ok = CommandOutput {
            exit_code: Some(0),
            ..Default::default()
        };
        let differ = CommandOutput {
            exit_code: Some(1),
            ..Default::default()
        };
        let killed = CommandOutput::default();

        assert!(ok.success());
        assert!(!differ.success());
        assert!(!killed.success());
        assert_eq!(differ.status_description(), "exit status 1");
        assert_eq!(killed.status_description(), "terminated by signal");
    }

    #[test]
    fn system_executor_reports_missing_program_as_launch_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let cmd = CommandLine::new("definitely-not-a-real-binary-8c1f", dir.path());

        let result = SystemExecutor.execute(&cmd);
        assert!(matches!(result, Err(ExecError::Launch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn child_sees_only_configured_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut env = HashMap::new();
        env.insert("TREE_DIFF_MARKER".to_string(), "kept".to_string());

        // PATH, HOME and the CARGO_* variables of this process must not leak
        let cmd = CommandLine::new("/usr/bin/env", dir.path()).envs(&env);
        let output = SystemExecutor.execute(&cmd).unwrap();

        assert!(output.success());
        assert_eq!(output.stdout_lossy(), "TREE_DIFF_MARKER=kept\n");
    }

    #[cfg(unix)]
    #[test]
    fn program_is_found_through_configured_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        std::fs::create_dir(&bin).unwrap();
        let tool = bin.join("fake-git");
        std::fs::write(&tool, "#!/bin/sh\necho resolved\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut env = HashMap::new();
        env.insert("PATH".to_string(), bin.display().to_string());

        assert_eq!(resolve_program("fake-git", &env), tool);
        assert_eq!(
            resolve_program("fake-git", &HashMap::new()),
            PathBuf::from("fake-git")
        );

        let cmd = CommandLine::new("fake-git", dir.path()).envs(&env);
        let output = SystemExecutor.execute(&cmd).unwrap();
        assert_eq!(output.stdout_lossy(), "resolved\n");
    }

    #[test]
    fn paths_are_used_as_given() {
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), "/nowhere".to_string());
        assert_eq!(
            resolve_program("/opt/git/bin/git", &env),
            PathBuf::from("/opt/git/bin/git")
        );
    }
}
