//! Tree-walking interpreter for qmake token streams.
//!
//! The [`Evaluator`] executes parsed files against a [`ScopeStack`], loading
//! included files and features through a shared [`Parser`] as it goes.
//!
//! # Control flow
//!
//! Every statement returns `Result<Flow>`. `Break`, `Next` and `Return` are
//! ordinary [`Flow`] values absorbed by the nearest loop or function; only
//! genuine failures travel as `Err`. An error is reported to the
//! [`MessageHandler`] once, by the innermost block that sees it, and then
//! unwinds every pending block, loop, call and include.
//!
//! # Load pipeline
//!
//! [`LoadFlags::PRE_FILES`] loads `.qmake.conf`, `.qmake.cache`, the mkspec,
//! `default_pre.prf` and the command-line assignments before the project
//! body; [`LoadFlags::POST_FILES`] runs the `-after` assignments,
//! `default_post.prf` and every feature named in `CONFIG` afterwards.

#![allow(clippy::too_many_lines)]
#![allow(clippy::module_name_repetitions)]

mod block;
mod builtin;
mod expand;
mod functions;
mod scope;

pub use expand::deprecated_replacement;
pub use functions::{FunctionDef, FunctionDefs};
pub use scope::ScopeStack;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bitflags::bitflags;
use proreader_foundation::{
    Error, ErrorContext, ErrorKind, EvalLimit, FunctionKind, Location, Result, ValueList, ValueMap,
};
use tracing::{debug, trace};

use crate::globals::{EvalLimits, Globals};
use crate::handler::{EvalFileType, MessageHandler, MessageKind};
use crate::ioutils;
use crate::opcode::ProFile;
use crate::parser::Parser;

bitflags! {
    /// Which parts of the load pipeline surround the project body.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct LoadFlags: u8 {
        /// Configuration files, mkspec, `default_pre`, pre-assignments.
        const PRE_FILES = 0x01;
        /// Post-assignments, `default_post`, `CONFIG` features.
        const POST_FILES = 0x02;
        /// Both.
        const ALL = Self::PRE_FILES.bits() | Self::POST_FILES.bits();
        /// A missing file is not reported.
        const SILENT = 0x10;
    }
}

impl LoadFlags {
    /// Only the project body.
    pub const PRO_ONLY: Self = Self::empty();
}

/// Outcome of evaluating a file, as seen by callers that do not want the
/// error value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisitReturn {
    /// Condition failed or file missing.
    False,
    /// Success.
    True,
    /// Evaluation failed; the handler has been told why.
    Error,
    /// `break()`
    Break,
    /// `next()`
    Next,
    /// `return()`
    Return,
}

/// Result of a statement or block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Last condition held.
    True,
    /// Last condition failed.
    False,
    /// Leave the innermost loop.
    Break,
    /// Continue with the next loop iteration.
    Next,
    /// Leave the current function.
    Return,
}

impl From<bool> for Flow {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl From<Flow> for VisitReturn {
    fn from(flow: Flow) -> Self {
        match flow {
            Flow::True => Self::True,
            Flow::False => Self::False,
            Flow::Break => Self::Break,
            Flow::Next => Self::Next,
            Flow::Return => Self::Return,
        }
    }
}

/// A statement position: the file holding it and its line.
#[derive(Clone, Debug)]
struct Position {
    file: Arc<ProFile>,
    line: u32,
}

impl Position {
    fn new(file: &Arc<ProFile>) -> Self {
        Self {
            file: Arc::clone(file),
            line: 0,
        }
    }

    fn location(&self) -> Location {
        Location::new(Arc::clone(self.file.path_arc()), self.line)
    }
}

/// Interpreter for parsed project files.
pub struct Evaluator<'h> {
    globals: Arc<Globals>,
    parser: Parser,
    handler: &'h mut dyn MessageHandler,
    limits: EvalLimits,
    scopes: ScopeStack,
    functions: FunctionDefs,
    /// Statement being evaluated.
    current: Option<Position>,
    /// Saved positions, pushed on file and call entry.
    location_stack: Vec<Option<Position>>,
    /// Files being evaluated, outermost first. Function calls do not push.
    profile_stack: Vec<Arc<ProFile>>,
    /// Files being evaluated by the evaluators that spawned this one.
    caller_files: Vec<PathBuf>,
    /// Files read by `fromfile()`/`infile()` in this evaluator's ancestry.
    reading_files: Vec<PathBuf>,
    call_depth: usize,
    return_value: ValueList,
    output_dir: Option<String>,
    list_count: usize,
    qmakespec: Option<String>,
    superfile: Option<String>,
    conffile: Option<String>,
    cachefile: Option<String>,
    source_root: Option<String>,
    build_root: Option<String>,
    qmakepath: Vec<String>,
    qmakefeatures: Vec<String>,
    feature_roots: Option<Vec<String>>,
}

impl<'h> Evaluator<'h> {
    /// Creates an evaluator with an empty global frame.
    pub fn new(globals: Arc<Globals>, parser: Parser, handler: &'h mut dyn MessageHandler) -> Self {
        Self {
            source_root: globals.source_root.clone(),
            build_root: globals.build_root.clone(),
            globals,
            parser,
            handler,
            limits: EvalLimits::default(),
            scopes: ScopeStack::new(),
            functions: FunctionDefs::new(),
            current: None,
            location_stack: Vec::new(),
            profile_stack: Vec::new(),
            caller_files: Vec::new(),
            reading_files: Vec::new(),
            call_depth: 0,
            return_value: ValueList::new(),
            output_dir: None,
            list_count: 0,
            qmakespec: None,
            superfile: None,
            conffile: None,
            cachefile: None,
            qmakepath: Vec::new(),
            qmakefeatures: Vec::new(),
            feature_roots: None,
        }
    }

    /// Replaces the recursion limits.
    #[must_use]
    pub fn with_limits(mut self, limits: EvalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the build directory reported as `OUT_PWD`.
    pub fn set_output_dir(&mut self, dir: impl AsRef<Path>) {
        self.output_dir = Some(ioutils::clean_path(&ioutils::path_to_string(dir.as_ref())));
    }

    /// A child evaluator for `fromfile()`, `infile()` and `include(.., into)`.
    /// A `chained` child continues this evaluator's include chain.
    fn aux_evaluator(&mut self, chained: bool) -> Evaluator<'_> {
        let mut aux = Evaluator::new(Arc::clone(&self.globals), self.parser.clone(), &mut *self.handler);
        aux.limits = self.limits;
        aux.output_dir.clone_from(&self.output_dir);
        aux.feature_roots.clone_from(&self.feature_roots);
        aux.functions = self.functions.clone();
        aux.reading_files.clone_from(&self.reading_files);
        if chained {
            aux.caller_files = self.caller_files.clone();
            aux.caller_files
                .extend(self.profile_stack.iter().map(|pro| pro.path().to_path_buf()));
        }
        aux
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Evaluates a file. Errors are reported to the handler and collapse to
    /// [`VisitReturn::Error`].
    pub fn evaluate_file(&mut self, path: &Path, kind: EvalFileType, flags: LoadFlags) -> VisitReturn {
        match self.try_evaluate_file(path, kind, flags) {
            Ok(flow) => flow.into(),
            Err(_) => VisitReturn::Error,
        }
    }

    /// Evaluates a file, returning the error itself on failure.
    ///
    /// A missing file yields `Ok(Flow::False)`; a file that evaluates
    /// completely yields `Ok(Flow::True)`.
    ///
    /// # Errors
    /// Parse errors, evaluation errors, circular inclusion and exceeded
    /// limits. The handler has already been told.
    pub fn try_evaluate_file(&mut self, path: &Path, kind: EvalFileType, flags: LoadFlags) -> Result<Flow> {
        let path = PathBuf::from(ioutils::clean_path(&ioutils::path_to_string(path)));

        if self
            .profile_stack
            .iter()
            .map(|pro| pro.path())
            .chain(self.caller_files.iter().map(PathBuf::as_path))
            .any(|p| p == path.as_path())
        {
            return Err(self.fail(Error::new(ErrorKind::CircularInclusion(path))));
        }
        if self.profile_stack.len() >= self.limits.max_include_depth {
            return Err(self.fail(Error::limit_exceeded(EvalLimit::MaxIncludeDepth {
                limit: self.limits.max_include_depth,
            })));
        }
        if !path.is_file() {
            if !flags.contains(LoadFlags::SILENT) {
                let text = format!("WARNING: Include file {} not found", path.display());
                self.report(MessageKind::IoError, &text);
            }
            return Ok(Flow::False);
        }

        let file = match self.parser.parse_file(&path) {
            Ok(file) => file,
            Err(err) => return Err(self.fail(err)),
        };

        self.location_stack.push(self.current.take());
        let result = self.visit_file(&file, kind, flags);
        self.current = self.location_stack.pop().flatten();

        if result.is_ok() {
            let included = self.scopes.global_mut().entry("QMAKE_INTERNAL_INCLUDED_FILES");
            let name = ioutils::path_to_string(&path);
            if !included.contains_str(&name) {
                included.push(name);
            }
        }
        result
    }

    /// Runs `commands` (qmake statements) as if they were a file called
    /// `identity`.
    ///
    /// # Errors
    /// Parse or evaluation errors.
    pub fn evaluate_command(&mut self, commands: &str, identity: &str) -> Result<()> {
        if commands.trim().is_empty() {
            return Ok(());
        }
        let file = match self.parser.parse_text(commands, Path::new(identity), 1) {
            Ok(file) => file,
            Err(err) => return Err(self.fail(err)),
        };
        self.location_stack.push(self.current.take());
        let result = self
            .visit_block(&file, 0, file.ops().len())
            .and_then(|flow| self.top_level_flow(flow));
        self.current = self.location_stack.pop().flatten();
        result.map(|_| ())
    }

    /// Evaluates `condition` as a one-line conditional.
    ///
    /// # Errors
    /// Parse or evaluation errors.
    pub fn evaluate_conditional(&mut self, condition: &str, identity: &str, line: u32) -> Result<bool> {
        let file = match self.parser.parse_text(condition, Path::new(identity), line.max(1)) {
            Ok(file) => file,
            Err(err) => return Err(self.fail(err)),
        };
        self.location_stack.push(self.current.take());
        let result = self.visit_block(&file, 0, file.ops().len());
        self.current = self.location_stack.pop().flatten();
        Ok(result? == Flow::True)
    }

    // =========================================================================
    // Variable access
    // =========================================================================

    /// Values of a variable: the scope stack, then the built-in variables.
    /// An unbound name yields an empty list.
    #[must_use]
    pub fn values(&self, name: &str) -> ValueList {
        if let Some(values) = self.scopes.get(name) {
            return values.clone();
        }
        self.magic_value(name).unwrap_or_default()
    }

    /// First value of a variable, or `""`.
    #[must_use]
    pub fn first(&self, name: &str) -> String {
        self.scopes
            .get(name)
            .and_then(|values| values.first().cloned())
            .or_else(|| self.magic_value(name).and_then(|values| values.first().cloned()))
            .unwrap_or_default()
    }

    /// Binds a variable in the current scope.
    pub fn set_values(&mut self, name: &str, values: ValueList) {
        self.scopes.set(name, values);
    }

    /// The global variable frame.
    #[must_use]
    pub fn variables(&self) -> &ValueMap {
        self.scopes.global()
    }

    /// Returns true if `config` is the mkspec name or a `CONFIG` value. With
    /// `wildcard`, `*` and `?` match as in shell patterns.
    #[must_use]
    pub fn is_active_config(&self, config: &str, wildcard: bool) -> bool {
        match config {
            "true" => return true,
            "false" => return false,
            _ => {}
        }
        let spec_name = self.qmakespec.as_deref().map(ioutils::file_name);
        let configs = self.scopes.get("CONFIG");

        if wildcard && config.contains(['*', '?']) {
            let Ok(re) = regex::Regex::new(&ioutils::wildcard_to_regex(config)) else {
                return false;
            };
            spec_name.is_some_and(|name| re.is_match(name))
                || configs.is_some_and(|values| values.iter().any(|v| re.is_match(v)))
        } else {
            spec_name == Some(config) || configs.is_some_and(|values| values.contains_str(config))
        }
    }

    /// Looks up `$$[name]`.
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<String> {
        self.globals.property_value(name)
    }

    /// Returns true if a test function (built-in or user) has that name.
    #[must_use]
    pub fn is_test_function_defined(&self, name: &str) -> bool {
        builtin::TestFunc::from_name(name).is_some() || self.functions.contains(FunctionKind::Test, name)
    }

    /// Returns true if a replace function (built-in or user) has that name.
    #[must_use]
    pub fn is_replace_function_defined(&self, name: &str) -> bool {
        builtin::ExpandFunc::from_name(name).is_some()
            || self.functions.contains(FunctionKind::Replace, name)
    }

    // =========================================================================
    // Diagnostics state
    // =========================================================================

    /// File and line of the statement being evaluated.
    #[must_use]
    pub fn current_location(&self) -> Option<Location> {
        self.current.as_ref().map(Position::location)
    }

    /// Number of saved locations (pending includes and calls).
    #[must_use]
    pub fn location_depth(&self) -> usize {
        self.location_stack.len()
    }

    /// Number of variable frames, including the global one.
    #[must_use]
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    fn error_context(&self) -> ErrorContext {
        let mut context = ErrorContext::new();
        if let Some(location) = self.current_location() {
            context = context.with_location(location);
        }
        for position in self.location_stack.iter().flatten() {
            context = context.with_frame(position.location());
        }
        context
    }

    /// Reports an error that has not been reported yet and attaches the
    /// location stack to it.
    fn fail(&mut self, err: Error) -> Error {
        if err.context.is_some() {
            return err;
        }
        let (kind, location) = match err.kind {
            ErrorKind::ParseError { .. } => (MessageKind::ParseError, None),
            ErrorKind::Io { .. } => (MessageKind::IoError, self.current_location()),
            _ => (MessageKind::EvalError, self.current_location()),
        };
        debug!(error = %err, "evaluation failed");
        self.handler.message(kind, &err.to_string(), location.as_ref());
        err.with_context(self.error_context())
    }

    /// Sends a non-fatal diagnostic at the current location.
    fn report(&mut self, kind: MessageKind, text: &str) {
        let location = self.current_location();
        self.handler.message(kind, text, location.as_ref());
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// Directory of the innermost file being evaluated (includes only).
    fn current_directory(&self) -> String {
        match self.profile_stack.last() {
            Some(pro) => ioutils::path_to_string(pro.directory()),
            None => std::env::current_dir()
                .map(|dir| ioutils::path_to_string(&dir))
                .unwrap_or_default(),
        }
    }

    /// Directory of the file holding the current statement (`$$PWD`).
    fn statement_directory(&self) -> String {
        match &self.current {
            Some(pos) if !pos.file.directory().as_os_str().is_empty() => {
                ioutils::path_to_string(pos.file.directory())
            }
            _ => self.current_directory(),
        }
    }

    /// Build directory (`$$OUT_PWD`).
    fn output_directory(&self) -> String {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        let source = self
            .profile_stack
            .first()
            .map_or_else(|| self.current_directory(), |pro| ioutils::path_to_string(pro.directory()));
        let shadowed = self.globals.shadowed_path(&source);
        if shadowed.is_empty() { source } else { shadowed }
    }

    /// Resolves `file` against the current directory.
    fn resolve_path(&self, file: &str) -> String {
        ioutils::resolve_path(&self.current_directory(), file)
    }

    // =========================================================================
    // Files
    // =========================================================================

    fn visit_file(&mut self, file: &Arc<ProFile>, kind: EvalFileType, flags: LoadFlags) -> Result<Flow> {
        let parent = self.profile_stack.last().map(|pro| pro.path().to_path_buf());
        self.handler.about_to_eval(parent.as_deref(), file.path(), kind);
        self.profile_stack.push(Arc::clone(file));
        self.current = Some(Position::new(file));
        debug!(path = %file.path().display(), %kind, "visiting file");

        let result = match self.visit_file_body(file, flags) {
            Err(err) => Err(self.fail(err)),
            ok => ok,
        };

        self.profile_stack.pop();
        self.handler.done_with_eval(parent.as_deref());
        trace!(path = %file.path().display(), "done visiting file");
        result
    }

    fn visit_file_body(&mut self, file: &Arc<ProFile>, flags: LoadFlags) -> Result<Flow> {
        if flags.contains(LoadFlags::PRE_FILES) {
            self.setup_project(file);
            self.load_pre_files(file)?;
            self.current = Some(Position::new(file));
        }

        let flow = self.visit_block(file, 0, file.ops().len())?;
        self.top_level_flow(flow)?;

        if flags.contains(LoadFlags::POST_FILES) {
            self.load_post_files()?;
        }
        Ok(Flow::True)
    }

    /// Rejects `break()` and `next()` that escaped every loop.
    fn top_level_flow(&mut self, flow: Flow) -> Result<Flow> {
        match flow {
            Flow::Break => Err(self.fail(Error::new(ErrorKind::UnexpectedControl("break")))),
            Flow::Next => Err(self.fail(Error::new(ErrorKind::UnexpectedControl("next")))),
            Flow::True | Flow::False | Flow::Return => Ok(flow),
        }
    }

    /// Evaluates `path` in a fresh evaluator on this include chain and
    /// returns its global frame. `Ok(None)` when the file does not exist.
    fn evaluate_file_into(&mut self, path: &str, flags: LoadFlags) -> Result<Option<ValueMap>> {
        self.evaluate_aux(path, flags, None)
    }

    /// Like [`Self::evaluate_file_into`], but off the include chain, so a
    /// project may read itself. A nested read of a file that is already
    /// being read yields `Ok(None)`.
    fn read_file_values(&mut self, path: &str, flags: LoadFlags) -> Result<Option<ValueMap>> {
        let path = PathBuf::from(ioutils::clean_path(path));
        if self.reading_files.contains(&path) {
            debug!(path = %path.display(), "file is already being read");
            return Ok(None);
        }
        self.evaluate_aux(&ioutils::path_to_string(&path), flags, Some(path))
    }

    fn evaluate_aux(&mut self, path: &str, flags: LoadFlags, reading: Option<PathBuf>) -> Result<Option<ValueMap>> {
        let mut aux = self.aux_evaluator(reading.is_none());
        aux.reading_files.extend(reading);
        let flow = aux.try_evaluate_file(Path::new(path), EvalFileType::Aux, flags)?;
        if flow != Flow::True {
            return Ok(None);
        }
        let values = aux.scopes.global().clone();

        let included = self.scopes.global_mut().entry("QMAKE_INTERNAL_INCLUDED_FILES");
        if let Some(files) = values.get("QMAKE_INTERNAL_INCLUDED_FILES") {
            included.append_unique(files.iter().cloned());
        }
        Ok(Some(values))
    }

    // =========================================================================
    // Load pipeline
    // =========================================================================

    fn setup_project(&mut self, file: &Arc<ProFile>) {
        self.set_template();
        let base = file
            .path()
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.scopes.global_mut().entry("TARGET").push(base);
    }

    /// Normalizes `TEMPLATE` to one value, applying `-t` and `-tp`.
    fn set_template(&mut self) {
        let mut template = self.scopes.get("TEMPLATE").and_then(|v| v.first().cloned());
        if let Some(user) = &self.globals.user_template {
            template = Some(user.clone());
        }
        let mut template = template.unwrap_or_else(|| "app".to_string());
        if let Some(prefix) = &self.globals.user_template_prefix {
            if !template.starts_with(prefix.as_str()) {
                template.insert_str(0, prefix);
            }
        }
        self.scopes.set("TEMPLATE", ValueList::single(template));
    }

    /// Finds `.qmake.super`, `.qmake.conf` and `.qmake.cache` for a project
    /// in `in_dir`.
    fn prepare_project(&mut self, in_dir: &Path) {
        let out_dir = self.output_directory();
        let out_dir = Path::new(&out_dir);

        if self.globals.do_cache {
            self.superfile = out_dir
                .ancestors()
                .map(|dir| dir.join(".qmake.super"))
                .find(|candidate| candidate.is_file())
                .map(|path| ioutils::path_to_string(&path));
        }

        if let Some(cachefile) = self.globals.cachefile.as_deref().filter(|_| self.globals.do_cache) {
            self.cachefile = Some(ioutils::path_to_string(cachefile));
            self.build_root = cachefile.parent().map(ioutils::path_to_string);
        }

        let mut source = Some(in_dir);
        let mut build = Some(out_dir);
        while let (Some(sdir), Some(bdir)) = (source, build) {
            let conf = sdir.join(".qmake.conf");
            let cache = bdir.join(".qmake.cache");
            let has_conf = conf.is_file();
            let has_cache = self.globals.do_cache && self.cachefile.is_none() && cache.is_file();
            if has_conf || has_cache {
                if has_conf {
                    self.conffile = Some(ioutils::path_to_string(&conf));
                }
                if has_cache {
                    self.cachefile = Some(ioutils::path_to_string(&cache));
                }
                if sdir != bdir {
                    self.source_root = Some(ioutils::path_to_string(sdir));
                }
                self.build_root = Some(ioutils::path_to_string(bdir));
                break;
            }
            source = sdir.parent();
            build = bdir.parent();
        }
        trace!(conf = ?self.conffile, cache = ?self.cachefile, "located project configuration");
    }

    fn load_pre_files(&mut self, file: &Arc<ProFile>) -> Result<()> {
        self.prepare_project(file.directory());

        for config in [self.superfile.clone(), self.conffile.clone(), self.cachefile.clone()]
            .into_iter()
            .flatten()
        {
            self.try_evaluate_file(Path::new(&config), EvalFileType::Config, LoadFlags::PRO_ONLY)?;
        }
        self.qmakepath = self.values("QMAKEPATH").into_vec();
        self.qmakefeatures = self.values("QMAKEFEATURES").into_vec();

        self.load_spec()?;

        self.evaluate_feature_file("default_pre", true)?;
        let precmds = self.globals.precmds.join("\n");
        self.evaluate_command(&precmds, "(command line)")
    }

    fn load_post_files(&mut self) -> Result<()> {
        let postcmds = self.globals.postcmds.join("\n");
        self.evaluate_command(&postcmds, "(command line -after)")?;
        self.evaluate_feature_file("default_post", true)?;
        self.evaluate_config_features()
    }

    fn mkspec_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        let roots = self
            .globals
            .env_path_list("QMAKEPATH")
            .into_iter()
            .map(|p| ioutils::path_to_string(&p))
            .chain(self.qmakepath.iter().cloned())
            .chain(self.globals.qmake_paths.iter().map(|p| ioutils::path_to_string(p)))
            .chain(self.build_root.iter().cloned())
            .chain(self.source_root.iter().cloned())
            .chain(self.globals.property_value("QT_HOST_DATA/get"));
        for root in roots {
            let path = format!("{root}/mkspecs");
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Locates and loads the mkspec's `qmake.conf`.
    fn load_spec(&mut self) -> Result<()> {
        let explicit = self.globals.qmakespec.as_deref().map(|spec| self.globals.expand_env_vars(spec));
        let requested = explicit
            .clone()
            .or_else(|| Some(self.first("QMAKESPEC")).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "default".to_string());

        let spec = if ioutils::is_absolute_path(&requested) {
            Some(requested.clone())
        } else {
            self.mkspec_paths()
                .into_iter()
                .map(|root| format!("{root}/{requested}"))
                .find(|candidate| Path::new(candidate).is_dir())
        };

        let Some(spec) = spec else {
            if explicit.is_some() {
                return Err(Error::eval(format!(
                    "Could not find qmake configuration file {requested}."
                )));
            }
            debug!(spec = %requested, "no mkspec found");
            return Ok(());
        };

        self.qmakespec = Some(ioutils::clean_path(&spec));
        self.feature_roots = None;
        self.evaluate_feature_file("spec_pre", true)?;
        let conf = format!("{spec}/qmake.conf");
        if self.try_evaluate_file(Path::new(&conf), EvalFileType::Config, LoadFlags::PRO_ONLY)? != Flow::True {
            return Err(Error::eval(format!("Could not read qmake configuration file {conf}.")));
        }
        self.feature_roots = None;
        self.evaluate_feature_file("spec_post", true)?;
        Ok(())
    }

    /// Loads each `CONFIG` value that names a feature, last first, each at
    /// most once. Starts over whenever a feature loads, since it may have
    /// changed `CONFIG`.
    fn evaluate_config_features(&mut self) -> Result<()> {
        let mut processed = HashSet::new();
        loop {
            let mut finished = true;
            let configs = self.values("CONFIG");
            for config in configs.iter().rev() {
                let config = config.to_lowercase();
                if processed.insert(config.clone()) && self.evaluate_feature_file(&config, true)? == Flow::True {
                    finished = false;
                    break;
                }
            }
            if finished {
                return Ok(());
            }
        }
    }

    /// Directories searched for `.prf` files, each ending in `/`.
    fn feature_roots(&mut self) -> Vec<String> {
        if let Some(roots) = &self.feature_roots {
            return roots.clone();
        }

        let mut roots: Vec<String> = self
            .globals
            .env_path_list("QMAKEFEATURES")
            .into_iter()
            .map(|p| ioutils::path_to_string(&p))
            .chain(self.qmakefeatures.iter().cloned())
            .chain(self.globals.feature_paths.iter().map(|p| ioutils::path_to_string(p)))
            .collect();

        let mut bases: Vec<String> = Vec::new();
        bases.extend(self.build_root.iter().map(|root| format!("{root}/mkspecs")));
        bases.extend(self.source_root.iter().map(|root| format!("{root}/mkspecs")));
        bases.extend(
            self.globals
                .env_path_list("QMAKEPATH")
                .into_iter()
                .chain(self.globals.qmake_paths.iter().cloned())
                .map(|p| format!("{}/mkspecs", ioutils::path_to_string(&p))),
        );
        bases.extend(self.qmakepath.iter().map(|root| format!("{root}/mkspecs")));
        if let Some(spec) = &self.qmakespec {
            roots.push(format!("{spec}/features"));
            if let Some(mkspecs) = Path::new(spec)
                .ancestors()
                .skip(1)
                .find(|dir| dir.ends_with("mkspecs"))
            {
                bases.push(ioutils::path_to_string(mkspecs));
            }
        }
        bases.extend(
            self.globals
                .property_value("QT_HOST_DATA/get")
                .map(|data| format!("{data}/mkspecs")),
        );

        let platforms = self.values("QMAKE_PLATFORM");
        for base in bases {
            for platform in &platforms {
                roots.push(format!("{base}/features/{platform}"));
            }
            roots.push(format!("{base}/features"));
        }

        let mut unique = Vec::new();
        for mut root in roots {
            if !root.ends_with('/') {
                root.push('/');
            }
            if !unique.contains(&root) && Path::new(&root).is_dir() {
                unique.push(root);
            }
        }
        trace!(roots = ?unique, "feature roots");
        self.feature_roots = Some(unique.clone());
        unique
    }

    /// Loads a feature by name or path.
    ///
    /// A name is searched in the feature roots; a feature file that loads its
    /// own name continues the search after its own root. A feature already
    /// loaded is not loaded again.
    fn evaluate_feature_file(&mut self, name: &str, silent: bool) -> Result<Flow> {
        let mut file_name = name.to_string();
        if !file_name.ends_with(".prf") {
            file_name.push_str(".prf");
        }

        let path = if file_name.contains('/') && ioutils::exists(Path::new(&self.resolve_path(&file_name))) {
            self.resolve_path(&file_name)
        } else {
            let roots = self.feature_roots();
            let current = self
                .current
                .as_ref()
                .map(|pos| ioutils::path_to_string(pos.file.path()))
                .unwrap_or_default();
            let start = roots
                .iter()
                .position(|root| current == format!("{root}{file_name}"))
                .map_or(0, |i| i + 1);

            let found = roots[start..]
                .iter()
                .map(|root| format!("{root}{file_name}"))
                .find(|candidate| Path::new(candidate).is_file());
            let Some(found) = found else {
                if !silent {
                    self.report(MessageKind::EvalError, &format!("Cannot find feature {name}"));
                }
                return Ok(Flow::False);
            };

            let loaded = self.scopes.global_mut().entry("QMAKE_INTERNAL_INCLUDED_FEATURES");
            if loaded.contains_str(&found) {
                if !silent {
                    self.report(
                        MessageKind::LanguageWarning,
                        &format!("Feature {name} already included"),
                    );
                }
                return Ok(Flow::True);
            }
            loaded.push(found.clone());
            found
        };

        self.try_evaluate_file(Path::new(&path), EvalFileType::Feature, LoadFlags::PRO_ONLY)
    }
}
