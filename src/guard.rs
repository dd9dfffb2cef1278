//! Refuse to work inside an existing git working tree.
//!
//! It is very common for users to keep their `$HOME` under git to version
//! their configuration files. A scratch directory created under `$HOME` then
//! silently belongs to that repository, and `git diff` on it would compare
//! against the ambient index instead of the two trees. The guard detects this
//! before any diff is computed.

use crate::exec::{CommandLine, ExecError, Executor};
use crate::{GIT_BINARY, GuardError};
use std::collections::HashMap;
use std::path::Path;

/// Substring of git's "not a git repository" message. Some git versions
/// capitalize the first letter and some do not.
const NOT_A_REPOSITORY: &str = "ot a git repository";

/// Check that `path` is not inside a git working tree.
///
/// A *successful* `git rev-parse --git-dir` is the failure case here: it means
/// git found a repository enclosing `path`.
///
/// # Errors
///
/// - [`GuardError::InsideGitRepo`] with the discovered git directory
/// - [`GuardError::RevParseFailed`] if git fails with an unexpected message
/// - [`GuardError::RevParseLaunchFailed`] if git cannot be run at all
pub fn check_not_inside_git_repo<E: Executor>(
    executor: &E,
    path: &Path,
    verbose: bool,
    environment: &HashMap<String, String>,
) -> Result<(), GuardError> {
    let cmd = CommandLine::new(GIT_BINARY, path)
        .args(["rev-parse", "--git-dir"])
        .envs(environment)
        .verbose(verbose);

    let output = executor
        .execute(&cmd)
        .map_err(|ExecError::Launch { message, .. }| GuardError::RevParseLaunchFailed {
            message,
        })?;

    if output.success() {
        let git_dir = output.stdout_lossy().trim().to_string();
        tracing::debug!(path = %path.display(), git_dir = %git_dir, "Path is inside a git repository");
        return Err(GuardError::InsideGitRepo {
            path: path.display().to_string(),
            git_dir,
        });
    }

    let stderr = output.stderr_lossy();
    if !stderr.contains(NOT_A_REPOSITORY) {
        return Err(GuardError::RevParseFailed { stderr });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exec::fake::FakeExecutor;
    use similar_asserts::assert_eq;

    fn env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("GIT_CONFIG_NOSYSTEM".to_string(), "1".to_string());
        env
    }

    #[test]
    fn runs_rev_parse_in_candidate_directory() {
        let executor = FakeExecutor::new().respond(
            128,
            b"",
            "fatal: not a git repository (or any of the parent directories): .git\n",
        );

        check_not_inside_git_repo(&executor, Path::new("/tmp/work"), true, &env()).unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "git");
        assert_eq!(calls[0].args, vec!["rev-parse", "--git-dir"]);
        assert_eq!(calls[0].cwd, Path::new("/tmp/work"));
        assert_eq!(calls[0].env, env());
        assert!(calls[0].verbose);
    }

    #[test]
    fn accepts_capitalized_message() {
        let executor = FakeExecutor::new().respond(
            128,
            b"",
            "fatal: Not a git repository (or any of the parent directories): .git\n",
        );

        assert!(check_not_inside_git_repo(&executor, Path::new("/tmp/work"), false, &env()).is_ok());
    }

    #[test]
    fn successful_probe_is_a_violation() {
        let executor = FakeExecutor::new().respond(0, b"/home/me/.git\n", "");

        let err = check_not_inside_git_repo(&executor, Path::new("/home/me/tmp"), false, &env())
            .unwrap_err();

        match &err {
            GuardError::InsideGitRepo { path, git_dir } => {
                assert_eq!(path, "/home/me/tmp");
                assert_eq!(git_dir, "/home/me/.git");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        insta::assert_snapshot!(err.to_string(), @"Cannot diff/patch because the temporary directory (/home/me/tmp) is inside a git directory (/home/me/.git).");
    }

    #[test]
    fn unexpected_stderr_is_an_io_failure() {
        let executor = FakeExecutor::new().respond(128, b"", "fatal: unsafe repository\n");

        let result = check_not_inside_git_repo(&executor, Path::new("/tmp/work"), false, &env());
        assert!(matches!(result, Err(GuardError::RevParseFailed { stderr }) if stderr.contains("unsafe")));
    }

    #[test]
    fn launch_failure_is_an_io_failure() {
        let executor = FakeExecutor::new().fail_launch("No such file or directory");

        let result = check_not_inside_git_repo(&executor, Path::new("/tmp/work"), false, &env());
        assert!(matches!(
            result,
            Err(GuardError::RevParseLaunchFailed { message }) if message == "No such file or directory"
        ));
    }
}
