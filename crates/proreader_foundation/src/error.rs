//! Error types for the proreader system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::location::Location;

/// The main error type for proreader operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a parse error.
    #[must_use]
    pub fn parse(file: impl Into<PathBuf>, line: u32, column: u32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError {
            message: message.into(),
            file: file.into(),
            line,
            column,
        })
    }

    /// Creates an I/O error for a path.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::new(ErrorKind::Io {
            path: path.into(),
            message: err.to_string(),
        })
    }

    /// Creates a generic evaluation error.
    #[must_use]
    pub fn eval(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Eval(message.into()))
    }

    /// Creates an unknown function error.
    #[must_use]
    pub fn unknown_function(name: impl Into<String>, kind: FunctionKind) -> Self {
        Self::new(ErrorKind::UnknownFunction {
            name: name.into(),
            kind,
        })
    }

    /// Creates an arity mismatch error.
    #[must_use]
    pub fn arity_mismatch(function: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        Self::new(ErrorKind::ArityMismatch {
            function: function.into(),
            expected: expected.into(),
            actual,
        })
    }

    /// Creates an evaluation limit error.
    #[must_use]
    pub fn limit_exceeded(limit: EvalLimit) -> Self {
        Self::new(ErrorKind::LimitExceeded(limit))
    }

    /// Returns true if this error came from the parser.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self.kind, ErrorKind::ParseError { .. })
    }
}

/// Whether a function is used in expression or condition position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    /// Replace function, called as `$$name(...)`, yields a value list.
    Replace,
    /// Test function, called as `name(...)` in a condition, yields pass/fail.
    Test,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace function"),
            Self::Test => f.write_str("test function"),
        }
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Malformed project file syntax.
    #[error("{}:{line}: {message}", file.display())]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// File (or identity) being parsed.
        file: PathBuf,
        /// Line number (1-indexed).
        line: u32,
        /// Column number (1-indexed).
        column: u32,
    },

    /// A file could not be read or written.
    #[error("cannot access {}: {message}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error message.
        message: String,
    },

    /// Function was not defined as a builtin or user function.
    #[error("'{name}' is not a recognized {kind}")]
    UnknownFunction {
        /// The function name.
        name: String,
        /// Where it was called.
        kind: FunctionKind,
    },

    /// Wrong number of arguments to a builtin function.
    #[error("{function}({expected}) requires a different number of arguments, got {actual}")]
    ArityMismatch {
        /// The function name.
        function: String,
        /// Description of the expected arguments.
        expected: String,
        /// Actual number of arguments.
        actual: usize,
    },

    /// Explicit `error()` call from project content.
    #[error("{0}")]
    UserError(String),

    /// `break()`, `next()` or `return()` used where no loop or function can take it.
    #[error("unexpected {0}()")]
    UnexpectedControl(&'static str),

    /// A file includes itself, directly or indirectly.
    #[error("circular inclusion of {}", .0.display())]
    CircularInclusion(PathBuf),

    /// An evaluation limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(EvalLimit),

    /// A regular expression did not compile.
    #[error("invalid regular expression '{pattern}': {message}")]
    InvalidRegex {
        /// The pattern as written.
        pattern: String,
        /// The compiler's complaint.
        message: String,
    },

    /// Other evaluation failure.
    #[error("{0}")]
    Eval(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Evaluation limits that stop runaway recursion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalLimit {
    /// Nested user-function calls.
    MaxCallDepth {
        /// The configured limit.
        limit: usize,
        /// The function that exceeded the limit.
        function: Option<String>,
    },
    /// Nested file inclusions.
    MaxIncludeDepth {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for EvalLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxCallDepth { limit, function } => {
                write!(f, "max call depth ({limit}) exceeded")?;
                if let Some(name) = function {
                    write!(f, " in {name}")?;
                }
                Ok(())
            }
            Self::MaxIncludeDepth { limit } => {
                write!(f, "max include depth ({limit}) exceeded")
            }
        }
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Location of the failing statement.
    pub location: Option<Location>,
    /// Include and call stack, outermost first.
    pub stack: Vec<Location>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: Location) -> Self {
        self.stack.push(frame);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(location) = &self.location {
            write!(f, "at {location}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in self.stack.iter().rev() {
                writeln!(f, "  from {frame}")?;
            }
        }
        Ok(())
    }
}
