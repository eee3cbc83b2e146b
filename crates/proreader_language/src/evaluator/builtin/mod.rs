//! Built-in replace and test functions.
//!
//! - `replace`: `$$name(...)` functions that yield value lists
//! - `test`: `name(...)` functions used as conditions
//!
//! Built-ins receive each argument expanded and joined into a single string.
//! Helpers shared by both kinds live here.

#[allow(clippy::unnecessary_wraps)]
#[allow(clippy::match_same_arms)]
mod replace;

use std::path::Path;
use std::process::{Command, Stdio};

use proreader_foundation::{Error, Result};

use super::Evaluator;
use crate::handler::{FileMessageKind, MessageKind};
use crate::ioutils;

macro_rules! builtin_table {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => [$($fname:literal),+], $min:expr, $max:expr, $usage:literal;)*
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                #[doc = concat!($("`", $fname, "` "),+)]
                $variant,
            )*
        }

        impl $name {
            /// Looks up a built-in by its qmake name.
            pub(crate) fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($($fname)|+ => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Minimum and maximum argument counts plus a usage string.
            pub(crate) const fn arity(self) -> (usize, Option<usize>, &'static str) {
                match self {
                    $(Self::$variant => ($min, $max, $usage),)*
                }
            }

            /// Fails unless `count` arguments are acceptable.
            pub(crate) fn check_arity(self, name: &str, count: usize) -> Result<()> {
                let (min, max, usage) = self.arity();
                if count < min || max.is_some_and(|max| count > max) {
                    return Err(Error::arity_mismatch(name, usage, count));
                }
                Ok(())
            }
        }
    };
}

builtin_table! {
    /// Built-in replace functions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) enum ExpandFunc {
        Member => ["member"], 1, Some(3), "var, [start, [end]]";
        StrMember => ["str_member"], 1, Some(3), "str, [start, [end]]";
        First => ["first"], 1, Some(1), "var";
        Last => ["last"], 1, Some(1), "var";
        TakeFirst => ["take_first"], 1, Some(1), "var";
        TakeLast => ["take_last"], 1, Some(1), "var";
        Size => ["size"], 1, Some(1), "var";
        StrSize => ["str_size"], 1, Some(1), "str";
        Cat => ["cat"], 1, Some(2), "file, [mode=true|blob|lines]";
        FromFile => ["fromfile"], 2, Some(2), "file, var";
        Eval => ["eval"], 1, Some(1), "var";
        List => ["list"], 0, None, "vars";
        Sprintf => ["sprintf"], 1, None, "format, ...";
        FormatNumber => ["format_number"], 1, Some(2), "number, [options...]";
        NumAdd => ["num_add"], 1, None, "num, ...";
        Join => ["join"], 1, Some(4), "var, [glue, [before, [after]]]";
        Split => ["split"], 1, Some(2), "var, sep";
        Basename => ["basename"], 1, Some(1), "var";
        Dirname => ["dirname"], 1, Some(1), "var";
        Section => ["section"], 3, Some(4), "var, sep, begin, [end]";
        Find => ["find"], 2, Some(2), "var, str";
        System => ["system"], 1, Some(3), "command, [mode], [stsvar]";
        Unique => ["unique"], 1, Some(1), "var";
        Sorted => ["sorted"], 1, Some(1), "var";
        Reverse => ["reverse"], 1, Some(1), "var";
        Quote => ["quote"], 0, None, "string";
        EscapeExpand => ["escape_expand"], 0, None, "arg, ...";
        Upper => ["upper"], 0, None, "string, ...";
        Lower => ["lower"], 0, None, "string, ...";
        Title => ["title"], 0, None, "string, ...";
        ReEscape => ["re_escape"], 0, None, "string, ...";
        ValEscape => ["val_escape"], 1, Some(1), "var";
        Files => ["files"], 1, Some(2), "pattern, [recursive=false]";
        Replace => ["replace"], 3, Some(3), "var, before, after";
        GetEnv => ["getenv"], 1, Some(1), "arg";
        AbsolutePath => ["absolute_path"], 1, Some(2), "path, [base]";
        RelativePath => ["relative_path"], 1, Some(2), "path, [base]";
        CleanPath => ["clean_path"], 1, Some(1), "path";
        SystemPath => ["system_path"], 1, Some(1), "path";
        ShellPath => ["shell_path"], 1, Some(1), "path";
        SystemQuote => ["system_quote"], 1, Some(1), "arg";
        ShellQuote => ["shell_quote"], 1, Some(1), "arg";
        Shadowed => ["shadowed"], 1, Some(1), "path";
        EnumerateVars => ["enumerate_vars"], 0, Some(0), "";
        ResolveDepends => ["resolve_depends"], 1, Some(4), "var, [prefix, [suffixes, [prio-suffix]]]";
    }
}

builtin_table! {
    /// Built-in test functions.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub(crate) enum TestFunc {
        Requires => ["requires"], 0, None, "conditions";
        GreaterThan => ["greaterThan"], 2, Some(2), "variable, value";
        LessThan => ["lessThan"], 2, Some(2), "variable, value";
        Equals => ["equals", "isEqual"], 2, Some(2), "variable, value";
        VersionAtLeast => ["versionAtLeast"], 2, Some(2), "variable, versionNumber";
        VersionAtMost => ["versionAtMost"], 2, Some(2), "variable, versionNumber";
        Exists => ["exists"], 1, Some(1), "file";
        Export => ["export"], 1, Some(1), "variable";
        Clear => ["clear"], 1, Some(1), "variable";
        Unset => ["unset"], 1, Some(1), "variable";
        Eval => ["eval"], 1, None, "expression";
        Config => ["CONFIG"], 1, Some(2), "config, [mutuals]";
        If => ["if"], 1, Some(1), "condition";
        Defined => ["defined"], 1, Some(2), "object, [\"test\"|\"replace\"|\"var\"]";
        Contains => ["contains"], 2, Some(3), "variable, value, [mutuals]";
        Infile => ["infile"], 2, Some(3), "file, var, [values]";
        Count => ["count"], 2, Some(3), "variable, count, [op=operator]";
        IsEmpty => ["isEmpty"], 1, Some(1), "var";
        Include => ["include"], 1, Some(3), "file, [into, [silent]]";
        Load => ["load"], 1, Some(2), "feature, [ignore_errors=false]";
        Debug => ["debug"], 2, Some(2), "level, message";
        Log => ["log"], 1, Some(1), "message";
        Message => ["message"], 1, Some(1), "message";
        Warning => ["warning"], 1, Some(1), "message";
        Error => ["error"], 0, Some(1), "message";
        Mkpath => ["mkpath"], 1, Some(1), "path";
        WriteFile => ["write_file"], 1, Some(3), "name, [content var, [append] [exe]]";
        Touch => ["touch"], 2, Some(2), "file, reffile";
        Cache => ["cache"], 1, Some(3), "var, [set|add|sub] [transient] [super|stash], [srcvar]";
        ReloadProperties => ["reload_properties"], 0, Some(0), "";
        System => ["system"], 1, Some(1), "exec";
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

/// qmake's notion of a true flag argument.
pub(crate) fn is_true(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value.parse::<i64>().is_ok_and(|n| n != 0)
}

/// Quotes a value so that reading it back as qmake source yields it again.
pub(crate) fn quote_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut quote = value.is_empty();
    let mut escaping = false;
    for c in value.chars() {
        if (c as u32) < 32 {
            if !escaping {
                escaping = true;
                out.push_str("$$escape_expand(");
            }
            match c {
                '\r' => out.push_str("\\\\r"),
                '\n' => out.push_str("\\\\n"),
                '\t' => out.push_str("\\\\t"),
                _ => out.push_str(&format!("\\\\x{:02x}", c as u32)),
            }
            continue;
        }
        if escaping {
            escaping = false;
            out.push(')');
        }
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '$' => out.push_str("\\$"),
            '#' => out.push_str("$${LITERAL_HASH}"),
            ' ' => {
                quote = true;
                out.push(' ');
            }
            c => out.push(c),
        }
    }
    if escaping {
        out.push(')');
    }
    if quote {
        out.insert(0, '"');
        out.push('"');
    }
    out
}

/// Numeric segments of a version string, stopping at the first segment
/// that does not start with a digit.
pub(crate) fn version_segments(text: &str) -> Vec<u64> {
    let mut segments = Vec::new();
    for part in text.trim().split('.') {
        let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
        let Ok(number) = digits.parse() else {
            break;
        };
        segments.push(number);
        if digits.len() != part.len() {
            break;
        }
    }
    segments
}

/// Fields `start..=end` of `text` split on `sep`; negative indices count
/// from the end.
pub(crate) fn section(text: &str, sep: &str, start: i64, end: i64) -> String {
    if sep.is_empty() {
        return String::new();
    }
    let fields: Vec<&str> = text.split(sep).collect();
    let len = i64::try_from(fields.len()).unwrap_or(i64::MAX);
    let start = if start < 0 { start + len } else { start };
    let end = if end < 0 { end + len } else { end };
    if start >= len || end < 0 || start > end {
        return String::new();
    }
    fields
        .iter()
        .enumerate()
        .filter(|(i, _)| {
            let i = i64::try_from(*i).unwrap_or(i64::MAX);
            i >= start && i <= end
        })
        .map(|(_, field)| *field)
        .collect::<Vec<_>>()
        .join(sep)
}

/// Expands `\n`, `\t` and `\r`; `\\` is left alone.
pub(crate) fn escape_expand(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('\\') => {
                out.push_str("\\\\");
                chars.next();
            }
            Some('n') => {
                out.push('\n');
                chars.next();
            }
            Some('t') => {
                out.push('\t');
                chars.next();
            }
            Some('r') => {
                out.push('\r');
                chars.next();
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Replaces every occurrence of the lowest-numbered `%N` placeholder.
pub(crate) fn substitute_lowest_placeholder(text: &str, arg: &str) -> String {
    let placeholders = || {
        let bytes = text.as_bytes();
        (0..bytes.len()).filter_map(move |i| {
            if bytes[i] != b'%' {
                return None;
            }
            let digits: String = text[i + 1..]
                .chars()
                .take(2)
                .take_while(char::is_ascii_digit)
                .collect();
            let number: u32 = digits.parse().ok()?;
            (number > 0).then_some((i, digits.len(), number))
        })
    };
    let Some(lowest) = placeholders().map(|(_, _, n)| n).min() else {
        return text.to_string();
    };

    let mut out = String::with_capacity(text.len() + arg.len());
    let mut last = 0;
    for (pos, len, number) in placeholders() {
        if number == lowest && pos >= last {
            out.push_str(&text[last..pos]);
            out.push_str(arg);
            last = pos + 1 + len;
        }
    }
    out.push_str(&text[last..]);
    out
}

/// Formats `value` in `base` (2..=36) with lowercase digits.
pub(crate) fn format_radix(mut value: u64, base: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let base = u64::from(base.clamp(2, 36));
    let mut digits = Vec::new();
    while value > 0 {
        let digit = u32::try_from(value % base).unwrap_or(0);
        digits.push(char::from_digit(digit, 36).unwrap_or('0'));
        value /= base;
    }
    digits.iter().rev().collect()
}

#[cfg(unix)]
fn set_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl Evaluator<'_> {
    /// Resolves a file argument after expanding `$(VAR)` references.
    pub(in crate::evaluator) fn file_path_arg(&self, arg: &str) -> String {
        self.resolve_path(&self.globals.expand_env_vars(arg))
    }

    /// Runs `command` through the shell in the current directory, returning
    /// its standard output and exit code. Anything the command writes to
    /// standard error is passed on to the handler as log output.
    pub(in crate::evaluator) fn run_command(&mut self, command: &str, capture: bool) -> (Vec<u8>, i32) {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/c") } else { ("sh", "-c") };
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(command).stdin(Stdio::null());
        let dir = self.current_directory();
        if Path::new(&dir).is_dir() {
            cmd.current_dir(&dir);
        }
        if !capture {
            cmd.stdout(Stdio::null());
        }
        tracing::debug!(command, "running system command");
        match cmd.output() {
            Ok(output) => {
                if !output.stderr.is_empty() {
                    let text = String::from_utf8_lossy(&output.stderr);
                    self.handler.file_message(FileMessageKind::Log, &text);
                }
                (output.stdout, output.status.code().unwrap_or(-1))
            }
            Err(err) => {
                tracing::warn!(command, error = %err, "failed to run command");
                (Vec::new(), -1)
            }
        }
    }

    /// Writes `contents` to `path`, creating its directory. An unchanged file
    /// is left alone when truncating. Failures are reported and yield false.
    pub(in crate::evaluator) fn write_text(
        &mut self,
        context: &str,
        path: &str,
        append: bool,
        executable: bool,
        contents: &str,
    ) -> bool {
        let target = Path::new(path);
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            if append {
                use std::io::Write;
                let mut file = std::fs::OpenOptions::new().create(true).append(true).open(target)?;
                file.write_all(contents.as_bytes())?;
            } else if std::fs::read_to_string(target).ok().as_deref() != Some(contents) {
                std::fs::write(target, contents)?;
            }
            if executable {
                set_executable(target)?;
            }
            Ok(())
        })();

        if let Some(cache) = self.parser.cache() {
            cache.discard(target);
        }
        match result {
            Ok(()) => true,
            Err(err) => {
                let text = format!("Cannot write {context}file {}: {err}.", ioutils::to_native_separators(path, &self.globals.dir_sep));
                self.report(MessageKind::EvalError, &text);
                false
            }
        }
    }
}
