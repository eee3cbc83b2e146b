//! Message sink for the parser and evaluator.
//!
//! The evaluator never prints. Diagnostics, `message()`/`warning()`/`error()`
//! output and file enter/leave notifications all go through a
//! [`MessageHandler`]; every method defaults to doing nothing.

use std::fmt;
use std::path::{Path, PathBuf};

use proreader_foundation::Location;

/// Category of a diagnostic produced by the reader itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Syntax error in a project file.
    ParseError,
    /// A file could not be read.
    IoError,
    /// Evaluation failed.
    EvalError,
    /// Questionable but accepted construct.
    LanguageWarning,
    /// Use of a deprecated variable or function.
    DeprecationWarning,
    /// Informational note.
    Info,
}

impl MessageKind {
    /// Returns true for the error categories.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::ParseError | Self::IoError | Self::EvalError)
    }

    /// Returns true for the warning categories.
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(self, Self::LanguageWarning | Self::DeprecationWarning)
    }
}

/// Category of output requested by project content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileMessageKind {
    /// `message()`
    Message,
    /// `warning()`
    Warning,
    /// `error()`
    Error,
    /// `log()`, written without a trailing newline.
    Log,
    /// `debug()`
    Debug,
}

/// Why a file is being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalFileType {
    /// The top-level project file.
    Project,
    /// `include()`
    Include,
    /// `.qmake.conf`, `.qmake.cache`, the mkspec.
    Config,
    /// A `.prf` feature file.
    Feature,
    /// A file evaluated into a separate map (`fromfile()`, `infile()`).
    Aux,
}

impl fmt::Display for EvalFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Project => "project",
            Self::Include => "include",
            Self::Config => "config",
            Self::Feature => "feature",
            Self::Aux => "aux",
        })
    }
}

/// Receives diagnostics and evaluation notifications.
pub trait MessageHandler {
    /// A diagnostic from the parser or evaluator.
    fn message(&mut self, kind: MessageKind, text: &str, location: Option<&Location>) {
        let _ = (kind, text, location);
    }

    /// Output requested by the project (`message()`, `warning()`, ...).
    fn file_message(&mut self, kind: FileMessageKind, text: &str) {
        let _ = (kind, text);
    }

    /// A file is about to be evaluated.
    fn about_to_eval(&mut self, parent: Option<&Path>, file: &Path, kind: EvalFileType) {
        let _ = (parent, file, kind);
    }

    /// Evaluation of the most recently entered file has finished.
    fn done_with_eval(&mut self, parent: Option<&Path>) {
        let _ = parent;
    }
}

/// Handler that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHandler;

impl MessageHandler for NullHandler {}

/// A diagnostic captured by [`CollectingHandler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Category.
    pub kind: MessageKind,
    /// Text.
    pub text: String,
    /// Where it was raised.
    pub location: Option<Location>,
}

/// Handler that records everything it receives.
#[derive(Clone, Debug, Default)]
pub struct CollectingHandler {
    /// Diagnostics, in order.
    pub diagnostics: Vec<Diagnostic>,
    /// Project output, in order.
    pub output: Vec<(FileMessageKind, String)>,
    /// Files entered, in order.
    pub evaluated: Vec<(PathBuf, EvalFileType)>,
    /// Current nesting of entered files.
    pub depth: usize,
}

impl CollectingHandler {
    /// Creates an empty handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if any error diagnostic was received.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind.is_error())
    }

    /// Texts of project output of the given kind.
    #[must_use]
    pub fn output_of(&self, kind: FileMessageKind) -> Vec<&str> {
        self.output
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

impl MessageHandler for CollectingHandler {
    fn message(&mut self, kind: MessageKind, text: &str, location: Option<&Location>) {
        self.diagnostics.push(Diagnostic {
            kind,
            text: text.to_string(),
            location: location.cloned(),
        });
    }

    fn file_message(&mut self, kind: FileMessageKind, text: &str) {
        self.output.push((kind, text.to_string()));
    }

    fn about_to_eval(&mut self, _parent: Option<&Path>, file: &Path, kind: EvalFileType) {
        self.evaluated.push((file.to_path_buf(), kind));
        self.depth += 1;
    }

    fn done_with_eval(&mut self, _parent: Option<&Path>) {
        self.depth = self.depth.saturating_sub(1);
    }
}
