//! Execution locations for diagnostics.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A (file, line) pair naming the statement being evaluated.
///
/// Line 0 means "the file as a whole", used while a file is entered or left.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    /// Resolved path (or identity) of the source file.
    pub file: Arc<PathBuf>,
    /// 1-based line number, or 0.
    pub line: u32,
}

impl Location {
    /// Creates a new location.
    #[must_use]
    pub fn new(file: Arc<PathBuf>, line: u32) -> Self {
        Self { file, line }
    }

    /// Returns the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Returns a copy of this location moved to `line`.
    #[must_use]
    pub fn at_line(&self, line: u32) -> Self {
        Self {
            file: Arc::clone(&self.file),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "{}:{}", self.file.display(), self.line)
        } else {
            write!(f, "{}", self.file.display())
        }
    }
}
