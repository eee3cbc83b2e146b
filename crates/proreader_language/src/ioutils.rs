//! Path and file helpers.
//!
//! Project files are written with `/` separators on every platform, so most
//! helpers here work on strings rather than [`Path`]s.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use proreader_foundation::ValueList;

/// What a path points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileType {
    /// Nothing.
    NotFound,
    /// A regular file (or anything that is not a directory).
    Regular,
    /// A directory.
    Directory,
}

/// Returns what `path` points at.
#[must_use]
pub fn file_type(path: &Path) -> FileType {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => FileType::Directory,
        Ok(_) => FileType::Regular,
        Err(_) => FileType::NotFound,
    }
}

/// Returns true if `path` exists.
#[must_use]
pub fn exists(path: &Path) -> bool {
    file_type(path) != FileType::NotFound
}

/// Modification time of `path`, if it can be read.
#[must_use]
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Returns true for `/x`, `\\server`, and drive-letter paths like `C:/x`.
#[must_use]
pub fn is_absolute_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    match bytes {
        [b'/' | b'\\', ..] => true,
        [drive, b':', b'/' | b'\\', ..] => drive.is_ascii_alphabetic(),
        _ => false,
    }
}

/// Lossy `&Path` to `String` with `/` separators.
#[must_use]
pub fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalizes separators to `/`, removes `.` and empty components, and
/// resolves `..` lexically. An empty path stays empty.
#[must_use]
pub fn clean_path(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let path = path.replace('\\', "/");
    let (prefix, rest) = split_root(&path);

    let mut parts: Vec<&str> = Vec::new();
    for component in rest.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if prefix.is_empty() {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if prefix.is_empty() && joined.is_empty() {
        ".".to_string()
    } else {
        format!("{prefix}{joined}")
    }
}

fn split_root(path: &str) -> (&str, &str) {
    let bytes = path.as_bytes();
    match bytes {
        [b'/', b'/', ..] => path.split_at(2),
        [b'/', ..] => path.split_at(1),
        [drive, b':', b'/', ..] if drive.is_ascii_alphabetic() => path.split_at(3),
        _ => ("", path),
    }
}

/// Resolves `file` against `base` and cleans the result.
///
/// An empty `file` resolves to an empty string.
#[must_use]
pub fn resolve_path(base: &str, file: &str) -> String {
    if file.is_empty() {
        return String::new();
    }
    if is_absolute_path(file) {
        clean_path(file)
    } else {
        clean_path(&format!("{base}/{file}"))
    }
}

/// Expresses `path` relative to `base`. Both should be absolute and clean.
#[must_use]
pub fn relative_path(path: &str, base: &str) -> String {
    let path_parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    let base_parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = Vec::new();
    out.extend(std::iter::repeat_n("..", base_parts.len() - common));
    out.extend(&path_parts[common..]);
    if out.is_empty() {
        ".".to_string()
    } else {
        out.join("/")
    }
}

/// The part of `path` after its last separator.
#[must_use]
pub fn file_name(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or(path, |i| &path[i + 1..])
}

/// The part of `path` before its last separator, or `""`.
#[must_use]
pub fn dir_name(path: &str) -> &str {
    path.rfind(['/', '\\']).map_or("", |i| &path[..i])
}

/// Converts `/` to the given separator.
#[must_use]
pub fn to_native_separators(path: &str, dir_sep: &str) -> String {
    if dir_sep == "/" {
        path.to_string()
    } else {
        path.replace('/', dir_sep)
    }
}

/// Walks from `start` towards the root looking for a file called `name`.
#[must_use]
pub fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Sets the modification time of `path` to that of `reference`.
///
/// # Errors
/// Returns any I/O error from reading or updating the timestamps.
pub fn touch(path: &Path, reference: &Path) -> io::Result<()> {
    let modified = fs::metadata(reference)?.modified()?;
    let file = fs::OpenOptions::new().write(true).open(path)?;
    file.set_modified(modified)
}

// =============================================================================
// Quoting and splitting
// =============================================================================

/// Quotes `arg` for a POSIX shell if it contains anything special.
#[must_use]
pub fn shell_quote_unix(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let safe = arg
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,^".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// Quotes `arg` for `cmd.exe` if it contains anything special.
#[must_use]
pub fn shell_quote_win(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }
    if !arg.chars().any(|c| " \t&|<>^()\"%!".contains(c)) {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.extend(std::iter::repeat_n('\\', backslashes + 1));
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
        out.push(c);
    }
    out.extend(std::iter::repeat_n('\\', backslashes));
    out.push('"');
    out
}

/// Splits `text` on blanks and newlines outside quotes and parentheses.
/// Quote characters are removed.
#[must_use]
pub fn split_value_list(text: &str) -> ValueList {
    let mut values = ValueList::new();
    let mut word = String::new();
    let mut has_word = false;
    let mut quote: Option<char> = None;
    let mut parens = 0usize;

    for c in text.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '"' | '\'') => {
                quote = Some(c);
                has_word = true;
            }
            (None, '(') => {
                parens += 1;
                word.push(c);
            }
            (None, ')') => {
                parens = parens.saturating_sub(1);
                word.push(c);
            }
            (None, c) if c.is_whitespace() && parens == 0 => {
                if has_word || !word.is_empty() {
                    values.push(std::mem::take(&mut word));
                }
                has_word = false;
            }
            (_, c) => word.push(c),
        }
    }
    if has_word || !word.is_empty() {
        values.push(word);
    }
    values
}

/// Returns true if `pattern` contains shell wildcard characters.
#[must_use]
pub fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Translates a shell wildcard into an anchored regular expression.
#[must_use]
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');
    let mut in_class = false;
    for c in pattern.chars() {
        match c {
            '*' if !in_class => out.push_str(".*"),
            '?' if !in_class => out.push('.'),
            '[' if !in_class => {
                in_class = true;
                out.push('[');
            }
            ']' if in_class => {
                in_class = false;
                out.push(']');
            }
            c if in_class => {
                if c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    if in_class {
        out.push(']');
    }
    out.push('$');
    out
}
