//! Project data extraction.
//!
//! [`ProjectReader`] evaluates one project file (body only, no mkspec or
//! feature files) and exposes the file lists an IDE importer needs.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proreader_foundation::{Error, Location, Result, ValueMap};
use proreader_language::{
    Diagnostic, EvalFileType, Evaluator, FileMessageKind, Flow, Globals, LoadFlags, MessageHandler, MessageKind,
    ParseCache, Parser,
};
use tracing::{debug, error, info, warn};

/// Records diagnostics and mirrors them to `tracing`.
#[derive(Default)]
struct ReaderHandler {
    diagnostics: Vec<Diagnostic>,
    output: Vec<(FileMessageKind, String)>,
}

impl MessageHandler for ReaderHandler {
    fn message(&mut self, kind: MessageKind, text: &str, location: Option<&Location>) {
        let at = location.map(ToString::to_string).unwrap_or_default();
        if kind.is_error() {
            error!(?kind, location = %at, "{text}");
        } else if kind.is_warning() {
            warn!(?kind, location = %at, "{text}");
        } else {
            info!(?kind, location = %at, "{text}");
        }
        self.diagnostics.push(Diagnostic {
            kind,
            text: text.to_string(),
            location: location.cloned(),
        });
    }

    fn file_message(&mut self, kind: FileMessageKind, text: &str) {
        match kind {
            FileMessageKind::Error => error!("{text}"),
            FileMessageKind::Warning => warn!("{text}"),
            FileMessageKind::Message => info!("{text}"),
            FileMessageKind::Log | FileMessageKind::Debug => debug!("{text}"),
        }
        self.output.push((kind, text.to_string()));
    }

    fn about_to_eval(&mut self, parent: Option<&Path>, file: &Path, kind: EvalFileType) {
        debug!(file = %file.display(), parent = ?parent, %kind, "evaluating");
    }
}

/// Reads the file lists and the `flat` flag of a qmake project.
pub struct ProjectReader {
    globals: Globals,
    cache: Arc<ParseCache>,
    variables: ValueMap,
    valid: bool,
    flat: bool,
    diagnostics: Vec<Diagnostic>,
    output: Vec<(FileMessageKind, String)>,
}

impl Default for ProjectReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectReader {
    /// Creates a reader with default configuration and an empty parse cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_globals(Globals::new())
    }

    /// Creates a reader that evaluates with `globals`.
    #[must_use]
    pub fn with_globals(globals: Globals) -> Self {
        Self {
            globals,
            cache: Arc::new(ParseCache::new()),
            variables: ValueMap::new(),
            valid: false,
            flat: false,
            diagnostics: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Sets the Qt installation used for `$$[QT_*]` properties.
    pub fn set_qt_dir(&mut self, dir: impl Into<PathBuf>) {
        self.globals.qt_dir = Some(dir.into());
    }

    /// The configured Qt installation.
    #[must_use]
    pub fn qt_dir(&self) -> Option<&Path> {
        self.globals.qt_dir.as_deref()
    }

    /// Parse cache shared by every read.
    #[must_use]
    pub fn cache(&self) -> &Arc<ParseCache> {
        &self.cache
    }

    /// Evaluates `path`. Returns false, with every list empty, if the file
    /// is missing or evaluation fails.
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> bool {
        match self.try_read_file(path.as_ref()) {
            Ok(()) => true,
            Err(err) => {
                warn!(path = %path.as_ref().display(), error = %err, "could not read project");
                false
            }
        }
    }

    /// Like [`read_file`](Self::read_file), returning the failure.
    ///
    /// # Errors
    /// Missing file, parse errors and evaluation errors.
    pub fn try_read_file(&mut self, path: &Path) -> Result<()> {
        self.reset();
        if path.as_os_str().is_empty() {
            return Err(Error::eval("No project file given."));
        }

        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            let text = format!("Project path {} is relative; resolving it against the working directory.", path.display());
            warn!("{text}");
            self.diagnostics.push(Diagnostic {
                kind: MessageKind::LanguageWarning,
                text,
                location: None,
            });
            std::env::current_dir().map_err(|e| Error::io(".", &e))?.join(path)
        };

        let mut handler = ReaderHandler::default();
        let result = {
            let parser = Parser::with_cache(Arc::clone(&self.cache));
            let mut evaluator = Evaluator::new(Arc::new(self.globals.clone()), parser, &mut handler);
            if let Some(dir) = path.parent() {
                evaluator.set_output_dir(dir);
            }
            match evaluator.try_evaluate_file(&path, EvalFileType::Project, LoadFlags::PRO_ONLY) {
                Ok(Flow::True) => Ok(evaluator.variables().clone()),
                Ok(_) => Err(Error::io(&path, &io::Error::from(io::ErrorKind::NotFound))),
                Err(err) => Err(err),
            }
        };
        self.diagnostics.append(&mut handler.diagnostics);
        self.output = handler.output;

        self.variables = result?;
        self.flat = self
            .variables
            .get("CONFIG")
            .is_some_and(|config| config.contains_str("flat"));
        self.valid = true;
        debug!(path = %path.display(), sources = self.source_files().len(), "project read");
        Ok(())
    }

    fn reset(&mut self) {
        self.variables = ValueMap::new();
        self.valid = false;
        self.flat = false;
        self.diagnostics.clear();
        self.output.clear();
    }

    fn list(&self, name: &str) -> &[String] {
        self.variables.get(name).map_or(&[], |values| &values[..])
    }

    /// `SOURCES` of the last successful read.
    #[must_use]
    pub fn source_files(&self) -> &[String] {
        self.list("SOURCES")
    }

    /// `HEADERS` of the last successful read.
    #[must_use]
    pub fn header_files(&self) -> &[String] {
        self.list("HEADERS")
    }

    /// `RESOURCES` of the last successful read.
    #[must_use]
    pub fn resource_files(&self) -> &[String] {
        self.list("RESOURCES")
    }

    /// `FORMS` of the last successful read.
    #[must_use]
    pub fn form_files(&self) -> &[String] {
        self.list("FORMS")
    }

    /// Any global variable of the last successful read.
    #[must_use]
    pub fn values(&self, name: &str) -> &[String] {
        self.list(name)
    }

    /// True if the last read completed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True if `CONFIG` contains `flat`.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.flat
    }

    /// Diagnostics of the last read.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// `message()`, `warning()` and `error()` output of the last read.
    #[must_use]
    pub fn project_output(&self) -> &[(FileMessageKind, String)] {
        &self.output
    }
}
