//! `git diff` between two sibling directories.
//!
//! Outside a repository git falls back to comparing plain paths, so two
//! sibling trees can be diffed by running `git diff` from their common parent
//! with both directory names as arguments. [`FoldersDiff`] builds that
//! invocation and maps git's exit codes onto "identical", "different" and
//! "failed":
//!
//! | exit | stderr    | result                         |
//! |------|-----------|--------------------------------|
//! | 0    | any       | empty diff                     |
//! | != 0 | empty     | stdout is the diff             |
//! | != 0 | non-empty | [`TreeDiffError::DiffExitError`] |

use crate::exec::{CommandLine, ExecError, Executor};
use crate::guard::check_not_inside_git_repo;
use crate::{GIT_BINARY, TreeDiffError};
use std::collections::HashMap;
use std::path::Path;

/// The `git diff` switches [`FoldersDiff`] can toggle.
///
/// Every `with_*` method returns a modified copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DiffFlags {
    /// `--name-status`
    pub name_status: bool,
    /// `--no-renames`
    pub no_renames: bool,
    /// `-z`
    pub nul_delimited: bool,
    /// `--no-index`. Not part of plain sibling diffing, which always runs the
    /// repository guard and never passes this switch. When set, the switch is
    /// emitted and the guard is skipped, since git then ignores any enclosing
    /// repository.
    pub no_index: bool,
}

impl DiffFlags {
    #[must_use]
    pub fn with_name_status(self) -> Self {
        Self {
            name_status: true,
            ..self
        }
    }

    #[must_use]
    pub fn with_no_renames(self) -> Self {
        Self {
            no_renames: true,
            ..self
        }
    }

    #[must_use]
    pub fn with_nul_delimited(self) -> Self {
        Self {
            nul_delimited: true,
            ..self
        }
    }

    #[must_use]
    pub fn with_no_index(self) -> Self {
        Self {
            no_index: true,
            ..self
        }
    }
}

/// A configured `git diff` between two sibling folders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldersDiff {
    flags: DiffFlags,
    verbose: bool,
    environment: HashMap<String, String>,
}

impl FoldersDiff {
    pub fn new(verbose: bool, environment: HashMap<String, String>) -> Self {
        Self {
            flags: DiffFlags::default(),
            verbose,
            environment,
        }
    }

    pub fn flags(&self) -> DiffFlags {
        self.flags
    }

    #[must_use]
    pub fn with_flags(self, flags: DiffFlags) -> Self {
        Self { flags, ..self }
    }

    #[must_use]
    pub fn with_name_status(self) -> Self {
        let flags = self.flags.with_name_status();
        self.with_flags(flags)
    }

    #[must_use]
    pub fn with_no_renames(self) -> Self {
        let flags = self.flags.with_no_renames();
        self.with_flags(flags)
    }

    #[must_use]
    pub fn with_nul_delimited(self) -> Self {
        let flags = self.flags.with_nul_delimited();
        self.with_flags(flags)
    }

    #[must_use]
    pub fn with_no_index(self) -> Self {
        let flags = self.flags.with_no_index();
        self.with_flags(flags)
    }

    /// Build the `git diff` command line, relative to the common parent.
    ///
    /// # Errors
    ///
    /// [`TreeDiffError::NotSiblingDirectories`] unless `one` and `other` have
    /// the same parent.
    pub fn command(&self, one: &Path, other: &Path) -> Result<CommandLine, TreeDiffError> {
        let not_siblings = || TreeDiffError::NotSiblingDirectories {
            one: one.display().to_string(),
            other: other.display().to_string(),
        };

        let root = match (one.parent(), other.parent()) {
            (Some(a), Some(b)) if a == b => a,
            _ => return Err(not_siblings()),
        };
        let rel_one = one.strip_prefix(root).map_err(|_| not_siblings())?;
        let rel_other = other.strip_prefix(root).map_err(|_| not_siblings())?;

        // Bare names like "one" have an empty parent
        let cwd = if root.as_os_str().is_empty() {
            Path::new(".")
        } else {
            root
        };

        let mut cmd = CommandLine::new(GIT_BINARY, cwd).args(["diff", "--no-color"]);
        if self.flags.no_index {
            cmd = cmd.arg("--no-index");
        }
        if self.flags.name_status {
            cmd = cmd.arg("--name-status");
        }
        if self.flags.no_renames {
            cmd = cmd.arg("--no-renames");
        }
        if self.flags.nul_delimited {
            cmd = cmd.arg("-z");
        }

        Ok(cmd
            .arg("--")
            .arg(rel_one.to_string_lossy())
            .arg(rel_other.to_string_lossy())
            .envs(&self.environment)
            .verbose(self.verbose))
    }

    /// Diff `one` against `other`.
    ///
    /// Returns an empty vector when the trees are identical, otherwise git's
    /// stdout bytes.
    ///
    /// # Errors
    ///
    /// - [`TreeDiffError::NotSiblingDirectories`] before anything is run
    /// - [`GuardError`](crate::GuardError) variants if `one` is inside a git
    ///   repository (not checked in `--no-index` mode)
    /// - [`TreeDiffError::DiffLaunchFailed`] if git cannot be run
    /// - [`TreeDiffError::DiffExitError`] if git fails with a message on stderr
    pub fn run<E: Executor>(
        &self,
        executor: &E,
        one: &Path,
        other: &Path,
    ) -> Result<Vec<u8>, TreeDiffError> {
        let cmd = self.command(one, other)?;

        if !self.flags.no_index {
            check_not_inside_git_repo(executor, one, self.verbose, &self.environment)?;
        }

        let output = executor
            .execute(&cmd)
            .map_err(|ExecError::Launch { message, .. }| TreeDiffError::DiffLaunchFailed {
                message,
            })?;

        if output.success() {
            return Ok(Vec::new());
        }

        // Exit 1 with a quiet stderr is git's way of saying "the trees differ"
        if !output.stderr.is_empty() {
            return Err(TreeDiffError::DiffExitError {
                status: output.status_description(),
                stderr: output.stderr_lossy(),
            });
        }

        tracing::debug!(bytes = output.stdout.len(), "Trees differ");
        Ok(output.stdout)
    }
}
