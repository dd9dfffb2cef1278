use error_set::error_set;
use std::collections::HashMap;
use std::path::Path;

pub mod changes;
pub mod colorize;
pub mod exec;
mod folders;
mod guard;

pub use changes::{ChangeParseError, FileChange, Operation, parse_changes};
pub use colorize::{AnsiColor, AnsiConsole, Console, colorize};
pub use exec::{CommandLine, CommandOutput, ExecError, Executor, SystemExecutor};
pub use folders::{DiffFlags, FoldersDiff};
pub use guard::check_not_inside_git_repo;

/// Program run for every git invocation
pub const GIT_BINARY: &str = "git";

error_set! {
    /// Top-level error for diffing two directory trees
    TreeDiffError := {
        /// `one` and `other` do not share a parent directory
        #[display("Paths '{one}' and '{other}' must be sibling directories.")]
        NotSiblingDirectories { one: String, other: String },
        #[display("Error executing 'git diff': {message}")]
        DiffLaunchFailed { message: String },
        #[display("Error executing 'git diff': {status}. Stderr:\n{stderr}")]
        DiffExitError { status: String, stderr: String },
        ChangeParseError(ChangeParseError),
    } || GuardError

    /// Errors from checking that a directory is outside any git repository
    GuardError := {
        /// `git rev-parse --git-dir` succeeded, so the path is tracked
        #[display("Cannot diff/patch because the temporary directory ({path}) is inside a git directory ({git_dir}).")]
        InsideGitRepo { path: String, git_dir: String },
        /// `git rev-parse` failed for a reason other than "not a git repository"
        #[display("Error executing rev-parse: {stderr}")]
        RevParseFailed { stderr: String },
        /// `git rev-parse` could not be launched
        #[display("Error executing rev-parse: {message}")]
        RevParseLaunchFailed { message: String },
    }
}

/// Main interface for diffing sibling directory trees
pub struct TreeDiffer<E = SystemExecutor> {
    executor: E,
    verbose: bool,
    environment: HashMap<String, String>,
}

impl TreeDiffer<SystemExecutor> {
    /// Create a differ that runs the real `git` binary
    pub fn new(verbose: bool, environment: HashMap<String, String>) -> Self {
        Self::with_executor(SystemExecutor, verbose, environment)
    }
}

impl<E: Executor> TreeDiffer<E> {
    pub fn with_executor(executor: E, verbose: bool, environment: HashMap<String, String>) -> Self {
        Self {
            executor,
            verbose,
            environment,
        }
    }

    fn folders_diff(&self) -> FoldersDiff {
        FoldersDiff::new(self.verbose, self.environment.clone())
    }

    /// Compute the diff between two sibling directory trees.
    ///
    /// The result is git's raw output, an encoding-independent byte stream
    /// that can be written to a file or fed to `git apply`. It is empty when
    /// the trees are identical.
    ///
    /// # Examples
    /// ```no_run
    /// # use tree_diff::TreeDiffer;
    /// # use std::collections::HashMap;
    /// # use std::path::Path;
    /// let differ = TreeDiffer::new(false, HashMap::new());
    /// let patch = differ.diff(Path::new("/tmp/work/before"), Path::new("/tmp/work/after")).unwrap();
    /// ```
    pub fn diff(&self, one: &Path, other: &Path) -> Result<Vec<u8>, TreeDiffError> {
        self.folders_diff().run(&self.executor, one, other)
    }

    /// List the files that differ between two sibling trees, without rename
    /// detection.
    ///
    /// Each name is relative to `one`/`other`.
    pub fn diff_files(&self, one: &Path, other: &Path) -> Result<Vec<FileChange>, TreeDiffError> {
        let output = self
            .folders_diff()
            .with_nul_delimited()
            .with_name_status()
            .with_no_renames()
            .run(&self.executor, one, other)?;

        Ok(parse_changes(&String::from_utf8_lossy(&output))?)
    }

    /// Fail if `path` is inside a git working tree
    pub fn check_not_inside_git_repo(&self, path: &Path) -> Result<(), GuardError> {
        guard::check_not_inside_git_repo(&self.executor, path, self.verbose, &self.environment)
    }
}

/// [`TreeDiffer::diff`] with the system `git`
pub fn diff(
    one: &Path,
    other: &Path,
    verbose: bool,
    environment: HashMap<String, String>,
) -> Result<Vec<u8>, TreeDiffError> {
    TreeDiffer::new(verbose, environment).diff(one, other)
}

/// [`TreeDiffer::diff_files`] with the system `git`
pub fn diff_files(
    one: &Path,
    other: &Path,
    verbose: bool,
    environment: HashMap<String, String>,
) -> Result<Vec<FileChange>, TreeDiffError> {
    TreeDiffer::new(verbose, environment).diff_files(one, other)
}
