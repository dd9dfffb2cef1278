//! Parsing for `git diff --name-status --no-renames -z` output.
//!
//! With `-z`, git separates every field with a NUL byte, so the listing is a
//! flat stream of `<op>\0<path>\0` pairs:
//!
//! ```text
//! A\0other/new.txt\0M\0other/lib/mod.rs\0D\0other/old.txt\0
//! ```
//!
//! Paths are relative to the common parent of the two trees, so every path
//! starts with the name of one of the tree directories. That first segment is
//! stripped to make the names relative to the trees themselves.
//!
//! # Examples
//!
//! ```
//! use tree_diff::changes::{parse_changes, FileChange, Operation};
//!
//! let changes = parse_changes("A\0other/new.txt\0D\0one/old.txt\0").unwrap();
//! assert_eq!(changes, vec![
//!     FileChange::new("new.txt", Operation::Add),
//!     FileChange::new("old.txt", Operation::Delete),
//! ]);
//! ```

use error_set::error_set;
use phf::phf_map;
use std::fmt;

error_set! {
    /// Errors from parsing a NUL-delimited name-status listing
    ChangeParseError := {
        /// Status code other than A, D or M
        #[display("Unknown type '{code}'. Text:\n{text}")]
        UnknownOperation { code: String, text: String },
        /// Status code at the end of the stream with no path after it
        #[display("Missing path after type '{code}'")]
        MissingPath { code: String },
        /// Path without the leading tree directory
        #[display("Path '{path}' does not contain a '/' separator")]
        MissingSeparator { path: String },
        /// Path that is only the tree directory, like `one/`
        #[display("Path '{path}' has no file name after the tree directory")]
        EmptyName { path: String },
    }
}

/// Kind of change git reported for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Add,
    Delete,
    Modified,
}

static OP_BY_CODE: phf::Map<&'static str, Operation> = phf_map! {
    "A" => Operation::Add,
    "D" => Operation::Delete,
    "M" => Operation::Modified,
};

impl Operation {
    /// Decode a `--name-status` code
    pub fn from_code(code: &str) -> Option<Self> {
        OP_BY_CODE.get(code).copied()
    }

    /// The `--name-status` code for this operation
    pub fn code(self) -> &'static str {
        match self {
            Operation::Add => "A",
            Operation::Delete => "D",
            Operation::Modified => "M",
        }
    }
}

/// A file that differs between the two trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileChange {
    /// Path relative to the compared trees
    pub name: String,
    pub operation: Operation,
}

impl FileChange {
    pub fn new(name: impl Into<String>, operation: Operation) -> Self {
        Self {
            name: name.into(),
            operation,
        }
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.operation.code(), self.name)
    }
}

/// Parse NUL-delimited name-status output into file changes, in input order.
///
/// Empty tokens where a status code is expected are skipped, which absorbs the
/// trailing NUL git writes after the last path.
///
/// # Errors
///
/// Returns [`ChangeParseError`] if a status code is not one of `A`, `D`, `M`,
/// if a status code has no path after it, or if a path has no `/` or nothing
/// after it. Any of
/// these means git produced output in a shape this parser does not know, so
/// nothing is skipped silently.
pub fn parse_changes(text: &str) -> Result<Vec<FileChange>, ChangeParseError> {
    let mut tokens = text.split('\0');
    let mut changes = Vec::new();

    while let Some(code) = tokens.next() {
        if code.is_empty() {
            continue;
        }

        let operation =
            Operation::from_code(code).ok_or_else(|| ChangeParseError::UnknownOperation {
                code: code.to_string(),
                text: text.to_string(),
            })?;

        let path = tokens.next().ok_or_else(|| ChangeParseError::MissingPath {
            code: code.to_string(),
        })?;

        let (_, name) = path
            .split_once('/')
            .ok_or_else(|| ChangeParseError::MissingSeparator {
                path: path.to_string(),
            })?;
        if name.is_empty() {
            return Err(ChangeParseError::EmptyName {
                path: path.to_string(),
            });
        }

        changes.push(FileChange::new(name, operation));
    }

    Ok(changes)
}
