//! Replace functions: `$$name(args)`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use proreader_foundation::{Error, ErrorKind, Result, ValueList};
use regex::Regex;
use walkdir::WalkDir;

use super::{
    escape_expand, format_radix, is_true, quote_value, section, substitute_lowest_placeholder,
    ExpandFunc,
};
use crate::evaluator::block::convert_replacement;
use crate::evaluator::{Evaluator, LoadFlags};
use crate::ioutils;

/// Output shaping shared by `cat()` and `system()`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum TextMode {
    /// Split each line into words.
    Words,
    /// Split each line into words and add a `"\n"` value after each line.
    WordsWithNewlines,
    /// One value per line.
    Lines,
    /// Everything as one value.
    Blob,
}

impl TextMode {
    fn from_arg(arg: Option<&String>) -> Self {
        match arg.map(|a| a.to_ascii_lowercase()).as_deref() {
            Some("false") => Self::WordsWithNewlines,
            Some("blob") => Self::Blob,
            Some("lines") => Self::Lines,
            _ => Self::Words,
        }
    }

    fn apply(self, text: &str) -> ValueList {
        let mut out = ValueList::new();
        match self {
            Self::Blob => out.push(text),
            Self::Lines => out.append(text.lines().map(str::to_string)),
            Self::Words | Self::WordsWithNewlines => {
                for line in text.lines() {
                    out.append(ioutils::split_value_list(line.trim()));
                    if self == Self::WordsWithNewlines {
                        out.push("\n");
                    }
                }
            }
        }
        out
    }
}

fn parse_index(func: &str, which: &str, text: &str) -> Result<i64> {
    text.trim()
        .parse()
        .map_err(|_| Error::eval(format!("{func}() argument {which} '{text}' invalid.")))
}

/// Resolves `member()`-style arguments to an inclusive index pair.
/// `Ok(None)` when either index falls outside `len`.
fn member_range(func: &str, len: usize, args: &[String]) -> Result<Option<(usize, usize)>> {
    let (mut start, mut end) = (0i64, 0i64);
    if let Some(start_arg) = args.get(1) {
        match start_arg.trim().parse::<i64>() {
            Ok(n) => {
                start = n;
                end = match args.get(2) {
                    Some(end_arg) => parse_index(func, "3 (end)", end_arg)?,
                    None => n,
                };
            }
            Err(_) => {
                let range = (args.len() == 2)
                    .then(|| start_arg.split_once(".."))
                    .flatten()
                    .and_then(|(a, b)| Some((a.trim().parse().ok()?, b.trim().parse().ok()?)));
                let Some((a, b)) = range else {
                    return Err(Error::eval(format!(
                        "{func}() argument 2 (start) '{start_arg}' invalid."
                    )));
                };
                start = a;
                end = b;
            }
        }
    }

    let len = i64::try_from(len).unwrap_or(i64::MAX);
    if start < 0 {
        start += len;
    }
    if end < 0 {
        end += len;
    }
    if start < 0 || start >= len || end < 0 || end >= len {
        return Ok(None);
    }
    Ok(Some((
        usize::try_from(start).unwrap_or_default(),
        usize::try_from(end).unwrap_or_default(),
    )))
}

/// Indices `start..=end`, walking backwards when `start > end`.
fn inclusive_indices(start: usize, end: usize) -> Box<dyn Iterator<Item = usize>> {
    if start <= end {
        Box::new(start..=end)
    } else {
        Box::new((end..=start).rev())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|err| {
        Error::new(ErrorKind::InvalidRegex {
            pattern: pattern.to_string(),
            message: err.to_string(),
        })
    })
}

impl Evaluator<'_> {
    pub(in crate::evaluator) fn evaluate_builtin_expand(
        &mut self,
        func: ExpandFunc,
        args: &[String],
    ) -> Result<ValueList> {
        let arg = |i: usize| args.get(i).map_or("", String::as_str);
        let mut ret = ValueList::new();

        match func {
            ExpandFunc::Member => {
                let src = self.variable_values(arg(0));
                if let Some((start, end)) = member_range("member", src.len(), args)? {
                    ret.append(inclusive_indices(start, end).map(|i| src[i].clone()));
                }
            }
            ExpandFunc::StrMember => {
                let chars: Vec<char> = arg(0).chars().collect();
                if let Some((start, end)) = member_range("str_member", chars.len(), args)? {
                    ret.push(inclusive_indices(start, end).map(|i| chars[i]).collect::<String>());
                }
            }
            ExpandFunc::First | ExpandFunc::Last => {
                let values = self.variable_values(arg(0));
                let picked = if func == ExpandFunc::First {
                    values.first()
                } else {
                    values.last()
                };
                if let Some(value) = picked {
                    ret.push(value.clone());
                }
            }
            ExpandFunc::TakeFirst | ExpandFunc::TakeLast => {
                let name = self.map_variable(arg(0)).to_string();
                let values = self.scopes.entry(&name);
                let taken = if func == ExpandFunc::TakeFirst {
                    values.take_first()
                } else {
                    values.take_last()
                };
                if let Some(value) = taken {
                    ret.push(value);
                }
            }
            ExpandFunc::Size => ret.push(self.variable_values(arg(0)).len().to_string()),
            ExpandFunc::StrSize => ret.push(arg(0).chars().count().to_string()),
            ExpandFunc::Cat => {
                let path = self.file_path_arg(arg(0));
                if let Ok(text) = std::fs::read_to_string(&path) {
                    ret = TextMode::from_arg(args.get(1)).apply(&text);
                }
            }
            ExpandFunc::FromFile => {
                let path = self.file_path_arg(arg(0));
                if let Some(vars) = self.read_file_values(&path, LoadFlags::PRO_ONLY)? {
                    let name = self.map_variable(arg(1)).to_string();
                    ret = vars.get(&name).cloned().unwrap_or_default();
                }
            }
            ExpandFunc::Eval => ret = self.variable_values(arg(0)),
            ExpandFunc::List => {
                let name = format!(".QMAKE_INTERNAL_TMP_variableName_{}", self.list_count);
                self.list_count += 1;
                let mut list = ValueList::new();
                for value in args {
                    list.append(ioutils::split_value_list(value));
                }
                self.scopes.declare_local(&name, list);
                ret.push(name);
            }
            ExpandFunc::Sprintf => {
                let text = args[1..]
                    .iter()
                    .fold(arg(0).to_string(), |text, a| substitute_lowest_placeholder(&text, a));
                ret = ioutils::split_value_list(&text);
            }
            ExpandFunc::FormatNumber => ret.push(format_number(arg(0), args.get(1))?),
            ExpandFunc::NumAdd => {
                let mut sum = 0i64;
                for value in args {
                    if value.contains('.') {
                        return Err(Error::eval("num_add(): floats are currently not supported."));
                    }
                    let number: i64 = value
                        .trim()
                        .parse()
                        .map_err(|_| Error::eval(format!("num_add(): malformed number {value}.")))?;
                    sum = sum.wrapping_add(number);
                }
                ret.push(sum.to_string());
            }
            ExpandFunc::Join => {
                let values = self.variable_values(arg(0));
                if !values.is_empty() {
                    let joined = format!("{}{}{}", arg(2), values.join(arg(1)), arg(3));
                    ret = ioutils::split_value_list(&joined);
                }
            }
            ExpandFunc::Split => {
                let sep = args.get(1).map_or(" ", String::as_str);
                for value in &self.variable_values(arg(0)) {
                    ret.append(value.split(sep).map(str::to_string));
                }
            }
            ExpandFunc::Basename | ExpandFunc::Dirname | ExpandFunc::Section => {
                let (sep, start, end) = match func {
                    ExpandFunc::Section => {
                        let start = parse_index("section", "3 (begin)", arg(2))?;
                        let end = match args.get(3) {
                            Some(end) => parse_index("section", "4 (end)", end)?,
                            None => -1,
                        };
                        (arg(1), start, end)
                    }
                    ExpandFunc::Dirname => ("/", 0, -2),
                    _ => ("/", -1, -1),
                };
                for value in &self.variable_values(arg(0)) {
                    ret.push(section(value, sep, start, end));
                }
            }
            ExpandFunc::Find => {
                let re = compile(arg(1))?;
                ret.append(
                    self.variable_values(arg(0))
                        .into_iter()
                        .filter(|value| re.is_match(value)),
                );
            }
            ExpandFunc::System => {
                let (output, status) = self.run_command(arg(0), true);
                if let Some(var) = args.get(2).filter(|v| !v.is_empty()) {
                    self.scopes
                        .declare_local(var, ValueList::single(status.to_string()));
                }
                let text = String::from_utf8_lossy(&output);
                ret = match TextMode::from_arg(args.get(1)) {
                    mode @ (TextMode::Lines | TextMode::Blob) => mode.apply(&text),
                    TextMode::Words => ioutils::split_value_list(&text.replace(['\t', '\n'], " ")),
                    TextMode::WordsWithNewlines => ioutils::split_value_list(&text.replace('\t', " ")),
                };
            }
            ExpandFunc::Unique => {
                ret = self.variable_values(arg(0));
                ret.remove_duplicates();
            }
            ExpandFunc::Sorted => {
                ret = self.variable_values(arg(0));
                ret.sort();
            }
            ExpandFunc::Reverse => {
                ret = self.variable_values(arg(0));
                ret.reverse();
            }
            ExpandFunc::Quote => ret.append(args.iter().cloned()),
            ExpandFunc::EscapeExpand => ret.append(args.iter().map(|a| escape_expand(a))),
            ExpandFunc::Upper => ret.append(args.iter().map(|a| a.to_uppercase())),
            ExpandFunc::Lower => ret.append(args.iter().map(|a| a.to_lowercase())),
            ExpandFunc::Title => ret.append(args.iter().map(|a| title_case(a))),
            ExpandFunc::ReEscape => ret.append(args.iter().map(|a| regex::escape(a))),
            ExpandFunc::ValEscape => {
                ret.append(self.variable_values(arg(0)).iter().map(|v| quote_value(v)));
            }
            ExpandFunc::Files => ret = self.list_files(arg(0), args.get(1).is_some_and(|a| is_true(a)))?,
            ExpandFunc::Replace => {
                let re = compile(arg(1))?;
                let after = convert_replacement(arg(2));
                ret.append(
                    self.variable_values(arg(0))
                        .iter()
                        .map(|value| re.replace_all(value, after.as_str()).into_owned()),
                );
            }
            ExpandFunc::GetEnv => ret.push(self.globals.get_env(arg(0)).unwrap_or_default()),
            ExpandFunc::AbsolutePath | ExpandFunc::RelativePath => {
                let base = match args.get(1) {
                    Some(base) if !base.is_empty() => self.resolve_path(base),
                    _ => self.current_directory(),
                };
                let path = if arg(0).is_empty() {
                    base.clone()
                } else {
                    ioutils::resolve_path(&base, arg(0))
                };
                ret.push(if func == ExpandFunc::AbsolutePath {
                    path
                } else {
                    ioutils::relative_path(&path, &base)
                });
            }
            ExpandFunc::CleanPath => ret.push(ioutils::clean_path(arg(0))),
            ExpandFunc::SystemPath => {
                let sep = std::path::MAIN_SEPARATOR.to_string();
                ret.push(ioutils::to_native_separators(&arg(0).replace('\\', "/"), &sep));
            }
            ExpandFunc::ShellPath => {
                ret.push(ioutils::to_native_separators(&arg(0).replace('\\', "/"), &self.globals.dir_sep));
            }
            ExpandFunc::SystemQuote => ret.push(if cfg!(windows) {
                ioutils::shell_quote_win(arg(0))
            } else {
                ioutils::shell_quote_unix(arg(0))
            }),
            ExpandFunc::ShellQuote => ret.push(if self.globals.dir_sep == "\\" {
                ioutils::shell_quote_win(arg(0))
            } else {
                ioutils::shell_quote_unix(arg(0))
            }),
            ExpandFunc::Shadowed => {
                let shadowed = self.globals.shadowed_path(&self.resolve_path(arg(0)));
                if !shadowed.is_empty() {
                    ret.push(shadowed);
                }
            }
            ExpandFunc::EnumerateVars => ret.append(self.scopes.visible_names()),
            ExpandFunc::ResolveDepends => ret = self.resolve_depends(args),
        }
        Ok(ret)
    }

    /// `$$files()`: names matching a wildcard, relative as written.
    fn list_files(&self, pattern: &str, recursive: bool) -> Result<ValueList> {
        let pattern = self.globals.expand_env_vars(pattern).replace('\\', "/");
        let (dir, name) = match pattern.rfind('/') {
            Some(i) => (&pattern[..=i], &pattern[i + 1..]),
            None => ("", pattern.as_str()),
        };
        let prefix = if ioutils::is_absolute_path(&pattern) {
            String::new()
        } else {
            format!("{}/", self.current_directory().trim_end_matches('/'))
        };
        let re = compile(&ioutils::wildcard_to_regex(name))?;

        let root = format!("{prefix}{dir}");
        let walker = WalkDir::new(if root.is_empty() { "." } else { root.as_str() })
            .min_depth(1)
            .max_depth(if recursive { usize::MAX } else { 1 })
            .sort_by_file_name();

        let mut found: Vec<String> = walker
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| re.is_match(&entry.file_name().to_string_lossy()))
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(Path::new(&root)).ok()?;
                Some(format!("{dir}{}", ioutils::path_to_string(relative)))
            })
            .collect();
        found.sort();
        Ok(ValueList::from(found))
    }

    /// Orders `var`'s values so that each comes after everything it depends
    /// on, reading `<prefix><value><suffix>` for dependencies and
    /// `<prefix><value><prio-suffix>` for tie-breaking priorities.
    fn resolve_depends(&self, args: &[String]) -> ValueList {
        let original = self.values(&args[0]);
        let prefix = args.get(1).map_or("", String::as_str);
        let suffixes = args.get(2).map_or_else(
            || ValueList::single(".depends"),
            |s| ioutils::split_value_list(s),
        );
        let prio_suffix = args.get(3).map_or(".priority", String::as_str);

        let mut state = DependState::default();
        self.populate_deps(&original, prefix, &suffixes, prio_suffix, &mut state);

        let mut ret: Vec<String> = Vec::new();
        while let Some(item) = state.pop_root() {
            ret.insert(0, item.clone());
            for dependee in state.dependees.get(&item).cloned().unwrap_or_default() {
                let pending = state.dependencies.entry(dependee.clone()).or_default();
                pending.remove(&item);
                if pending.is_empty() {
                    let priority = self.priority(prefix, &dependee, prio_suffix);
                    state.roots.entry(priority).or_default().push(dependee);
                }
            }
        }
        ValueList::from(ret)
    }

    fn priority(&self, prefix: &str, item: &str, suffix: &str) -> i64 {
        self.first(&format!("{prefix}{item}{suffix}")).trim().parse().unwrap_or(0)
    }

    fn populate_deps(
        &self,
        items: &[String],
        prefix: &str,
        suffixes: &[String],
        prio_suffix: &str,
        state: &mut DependState,
    ) {
        for item in items {
            if state.dependencies.contains_key(item) {
                continue;
            }
            state.dependencies.insert(item.clone(), HashSet::new());
            let mut depends = ValueList::new();
            for suffix in suffixes {
                depends.append(self.values(&format!("{prefix}{item}{suffix}")));
            }
            if depends.is_empty() {
                let priority = self.priority(prefix, item, prio_suffix);
                state.roots.entry(priority).or_default().push(item.clone());
            } else {
                for dep in &depends {
                    if let Some(set) = state.dependencies.get_mut(item) {
                        set.insert(dep.clone());
                    }
                    state.dependees.entry(dep.clone()).or_default().push(item.clone());
                }
                self.populate_deps(&depends, prefix, suffixes, prio_suffix, state);
            }
        }
    }
}

#[derive(Default)]
struct DependState {
    /// Item to the dependencies it still waits for.
    dependencies: HashMap<String, HashSet<String>>,
    /// Item to the items that depend on it.
    dependees: HashMap<String, Vec<String>>,
    /// Ready items by priority; the newest of equal priority comes first.
    roots: BTreeMap<i64, Vec<String>>,
}

impl DependState {
    fn pop_root(&mut self) -> Option<String> {
        let mut entry = self.roots.first_entry()?;
        let item = entry.get_mut().pop();
        if entry.get().is_empty() {
            entry.remove();
        }
        item
    }
}

fn title_case(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn format_number(number: &str, options: Option<&String>) -> Result<String> {
    let mut ibase = 10;
    let mut obase = 10;
    let mut width = 0usize;
    let mut zeropad = false;
    let mut leftalign = false;
    let mut sign = "";

    let parse_base = |text: &str| -> Result<u32> {
        text.parse::<u32>()
            .ok()
            .filter(|b| (2..=36).contains(b))
            .ok_or_else(|| Error::eval(format!("format_number(): invalid base {text}.")))
    };
    for option in options.map(|o| ioutils::split_value_list(o)).unwrap_or_default() {
        if let Some(value) = option.strip_prefix("ibase=") {
            ibase = parse_base(value)?;
        } else if let Some(value) = option.strip_prefix("obase=") {
            obase = parse_base(value)?;
        } else if let Some(value) = option.strip_prefix("width=") {
            width = value.parse().unwrap_or(0);
        } else {
            match option.as_str() {
                "zeropad" => zeropad = true,
                "padsign" => sign = " ",
                "alwayssign" => sign = "+",
                "leftalign" => leftalign = true,
                _ => {
                    return Err(Error::eval(format!(
                        "format_number(): invalid format option {option}."
                    )));
                }
            }
        }
    }

    if number.contains('.') {
        return Err(Error::eval("format_number(): floats are currently not supported."));
    }
    let value = i64::from_str_radix(number.trim(), ibase).map_err(|_| {
        Error::eval(format!("format_number(): malformed number {number} for base {ibase}."))
    })?;

    let prefix = if value < 0 { "-" } else { sign };
    let digits = format_radix(value.unsigned_abs(), obase);
    let space = width.saturating_sub(prefix.len() + digits.len());
    Ok(if space == 0 {
        format!("{prefix}{digits}")
    } else if leftalign {
        format!("{prefix}{digits}{}", " ".repeat(space))
    } else if zeropad {
        format!("{prefix}{}{digits}", "0".repeat(space))
    } else {
        format!("{}{prefix}{digits}", " ".repeat(space))
    })
}
