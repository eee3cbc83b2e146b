//! Expression expansion: word pieces to value lists.

use std::sync::Arc;

use proreader_foundation::{Error, ErrorKind, Result, ValueList};

use super::Evaluator;
use crate::handler::MessageKind;
use crate::ioutils;
use crate::opcode::{Opcode, ProFile};

/// Deprecated variable names and their replacements.
const DEPRECATED_VARIABLES: &[(&str, &str)] = &[
    ("INTERFACES", "FORMS"),
    ("QMAKE_POST_BUILD", "QMAKE_POST_LINK"),
    ("TARGETDEPS", "POST_TARGETDEPS"),
    ("LIBPATH", "QMAKE_LIBDIR"),
    ("QMAKE_EXT_MOC", "QMAKE_EXT_CPP_MOC"),
    ("QMAKE_MOD_MOC", "QMAKE_H_MOD_MOC"),
    ("QMAKE_LFLAGS_SHAPP", "QMAKE_LFLAGS_APP"),
    ("PRECOMPH", "PRECOMPILED_HEADER"),
    ("PRECOMPCPP", "PRECOMPILED_SOURCE"),
    ("INCPATH", "INCLUDEPATH"),
    ("QMAKE_EXTRA_WIN_COMPILERS", "QMAKE_EXTRA_COMPILERS"),
    ("QMAKE_EXTRA_UNIX_COMPILERS", "QMAKE_EXTRA_COMPILERS"),
    ("QMAKE_EXTRA_WIN_TARGETS", "QMAKE_EXTRA_TARGETS"),
    ("QMAKE_EXTRA_UNIX_TARGETS", "QMAKE_EXTRA_TARGETS"),
    ("QMAKE_EXTRA_UNIX_INCLUDES", "QMAKE_EXTRA_INCLUDES"),
    ("QMAKE_EXTRA_UNIX_VARIABLES", "QMAKE_EXTRA_VARIABLES"),
    ("QMAKE_RPATH", "QMAKE_LFLAGS_RPATH"),
    ("QMAKE_FRAMEWORKDIR", "QMAKE_FRAMEWORKPATH"),
    ("QMAKE_FRAMEWORKDIR_FLAGS", "QMAKE_FRAMEWORKPATH_FLAGS"),
    ("IN_PWD", "PWD"),
    ("DEPLOYMENT", "INSTALLS"),
];

/// Returns the replacement for a deprecated variable name.
#[must_use]
pub fn deprecated_replacement(name: &str) -> Option<&'static str> {
    DEPRECATED_VARIABLES
        .iter()
        .find(|(old, _)| *old == name)
        .map(|(_, new)| *new)
}

/// Accumulates expanded pieces into words.
#[derive(Debug)]
pub(super) struct Words {
    list: ValueList,
    /// The next piece starts a new word.
    pending: bool,
}

impl Words {
    pub(super) fn new() -> Self {
        Self {
            list: ValueList::new(),
            pending: true,
        }
    }

    fn break_word(&mut self) {
        self.pending = true;
    }

    pub(super) fn push_literal(&mut self, text: &str) {
        if self.pending {
            self.list.push(text);
            self.pending = false;
        } else if let Some(last) = self.list.iter_mut().last() {
            last.push_str(text);
        }
    }

    /// Splices a value list in: the first value joins the current word, the
    /// rest become words of their own.
    pub(super) fn push_values(&mut self, values: ValueList) {
        for (i, value) in values.into_iter().enumerate() {
            if i > 0 {
                self.pending = true;
            }
            self.push_literal(&value);
        }
    }

    pub(super) fn finish(self) -> ValueList {
        self.list
    }
}

/// Returns true for opcodes that belong to an expression.
fn is_piece(op: Opcode) -> bool {
    matches!(
        op,
        Opcode::Literal(_)
            | Opcode::Variable { .. }
            | Opcode::Property { .. }
            | Opcode::Environment { .. }
            | Opcode::FuncCall { .. }
            | Opcode::WordBreak
    )
}

/// Advances `pc` past a call's arguments and its terminator.
pub(super) fn skip_args(ops: &[Opcode], pc: &mut usize) {
    let mut depth = 1usize;
    while let Some(op) = ops.get(*pc) {
        *pc += 1;
        match op {
            Opcode::FuncCall { .. } | Opcode::TestCall(_) => depth += 1,
            Opcode::FuncTerminator => {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
            _ => {}
        }
    }
}

/// Advances `pc` past the expression pieces at `pc` without expanding them.
pub(super) fn skip_words(ops: &[Opcode], pc: &mut usize) {
    while let Some(&op) = ops.get(*pc) {
        if !is_piece(op) {
            return;
        }
        *pc += 1;
        if matches!(op, Opcode::FuncCall { .. }) {
            skip_args(ops, pc);
        }
    }
}

impl Evaluator<'_> {
    // =========================================================================
    // Pieces
    // =========================================================================

    /// Expands the pieces starting at `pc` into words, stopping at the first
    /// opcode that is not part of an expression.
    pub(super) fn expand_words(&mut self, file: &Arc<ProFile>, pc: &mut usize) -> Result<ValueList> {
        let ops = file.ops();
        let mut words = Words::new();
        while let Some(&op) = ops.get(*pc) {
            if !is_piece(op) {
                break;
            }
            *pc += 1;
            match op {
                Opcode::Literal(id) => words.push_literal(file.string(id)),
                Opcode::WordBreak => words.break_word(),
                Opcode::Variable { name, joined } => {
                    let values = self.variable_values(file.string(name));
                    push_expansion(&mut words, values, joined);
                }
                Opcode::Property { name, joined } => {
                    let values: ValueList = self
                        .globals
                        .property_value(file.string(name))
                        .into_iter()
                        .collect();
                    push_expansion(&mut words, values, joined);
                }
                Opcode::Environment { name, joined } => {
                    let values: ValueList = self.globals.get_env(file.string(name)).into_iter().collect();
                    push_expansion(&mut words, values, joined);
                }
                Opcode::FuncCall { name, joined } => {
                    let args = self.expand_args(file, pc)?;
                    let values = self.call_replace(file.string(name), args)?;
                    push_expansion(&mut words, values, joined);
                }
                _ => {}
            }
        }
        Ok(words.finish())
    }

    /// Expands call arguments through the closing `FuncTerminator`.
    pub(super) fn expand_args(&mut self, file: &Arc<ProFile>, pc: &mut usize) -> Result<Vec<ValueList>> {
        let ops = file.ops();
        let mut args = Vec::new();
        if ops.get(*pc) == Some(&Opcode::FuncTerminator) {
            *pc += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expand_words(file, pc)?);
            match ops.get(*pc) {
                Some(Opcode::ArgSeparator) => *pc += 1,
                Some(Opcode::FuncTerminator) => {
                    *pc += 1;
                    return Ok(args);
                }
                other => {
                    return Err(Error::new(ErrorKind::Internal(format!(
                        "unexpected {other:?} in argument list"
                    ))));
                }
            }
        }
    }

    // =========================================================================
    // Variables
    // =========================================================================

    /// Maps a deprecated variable name to its replacement, with a warning.
    pub(super) fn map_variable<'a>(&mut self, name: &'a str) -> &'a str {
        match deprecated_replacement(name) {
            Some(new) => {
                let text = format!("Variable {name} is deprecated; use {new} instead.");
                let location = self.current_location();
                self.handler
                    .message(MessageKind::DeprecationWarning, &text, location.as_ref());
                new
            }
            None => name,
        }
    }

    /// `$$NAME`: the scope stack first, then the built-in variables.
    pub(super) fn variable_values(&mut self, name: &str) -> ValueList {
        let name = self.map_variable(name);
        self.values(name)
    }

    /// Values of a built-in variable, if `name` is one.
    pub(super) fn magic_value(&self, name: &str) -> Option<ValueList> {
        let single = |value: String| Some(ValueList::single(value));
        match name {
            "PWD" => single(self.statement_directory()),
            "OUT_PWD" => single(self.output_directory()),
            "_PRO_FILE_" => self
                .profile_stack
                .first()
                .map(|pro| ValueList::single(ioutils::path_to_string(pro.path()))),
            "_PRO_FILE_PWD_" => self
                .profile_stack
                .first()
                .map(|pro| ValueList::single(ioutils::path_to_string(pro.directory()))),
            "_FILE_" => self
                .current
                .as_ref()
                .map(|pos| ValueList::single(ioutils::path_to_string(pos.file.path()))),
            "_LINE_" => single(self.current.as_ref().map_or(0, |pos| pos.line).to_string()),
            "LITERAL_HASH" => single("#".to_string()),
            "LITERAL_DOLLAR" => single("$".to_string()),
            "LITERAL_WHITESPACE" => single("\t".to_string()),
            "DIR_SEPARATOR" | "QMAKE_DIR_SEP" => single(self.globals.dir_sep.clone()),
            "DIRLIST_SEPARATOR" => single(self.globals.dirlist_sep.clone()),
            "QMAKE_QMAKE" => single(
                self.globals
                    .qmake_abslocation
                    .as_deref()
                    .map_or_else(|| "qmake".to_string(), ioutils::path_to_string),
            ),
            "_QMAKE_CACHE_" => self.cachefile.clone().map(ValueList::single),
            "_QMAKE_CONF_" => self.conffile.clone().map(ValueList::single),
            "_QMAKE_SUPER_CACHE_" => self.superfile.clone().map(ValueList::single),
            "QMAKESPEC" => self.qmakespec.clone().map(ValueList::single),
            _ => name.strip_prefix("QMAKE_HOST.").and_then(host_value).map(ValueList::single),
        }
    }
}

fn push_expansion(words: &mut Words, values: ValueList, joined: bool) {
    if joined {
        words.push_literal(&values.join(" "));
    } else {
        words.push_values(values);
    }
}

fn host_value(key: &str) -> Option<String> {
    match key {
        "os" => Some(
            match std::env::consts::OS {
                "linux" => "Linux",
                "windows" => "Windows",
                "macos" => "Darwin",
                other => other,
            }
            .to_string(),
        ),
        "arch" => Some(std::env::consts::ARCH.to_string()),
        "name" => std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .or_else(|| Some("localhost".to_string())),
        "cpu_count" => Some(
            std::thread::available_parallelism()
                .map_or(1, std::num::NonZeroUsize::get)
                .to_string(),
        ),
        _ => None,
    }
}
