//! Reader-wide configuration.
//!
//! [`Globals`] holds everything that is fixed for the lifetime of a read:
//! the Qt installation, the mkspec, property values, environment overrides,
//! shadow-build roots, and assignments given on the command line. It is
//! built with `with_*` setters and shared read-only through an `Arc`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ioutils;

/// Property name suffixes that select a variant of the same value.
const PROPERTY_SUFFIXES: &[&str] = &["/get", "/src", "/raw", "/dev"];

/// Limits that stop runaway recursion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvalLimits {
    /// Nested user-function calls.
    pub max_call_depth: usize,
    /// Nested file inclusions.
    pub max_include_depth: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 100,
            max_include_depth: 100,
        }
    }
}

impl EvalLimits {
    /// Sets the call-depth limit.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Sets the include-depth limit.
    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

/// A rejected qmake-style command-line argument.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    /// An option that takes a value was last on the line.
    #[error("option {0} requires an argument")]
    MissingValue(String),
    /// An option that is not understood.
    #[error("unknown option {0}")]
    Unknown(String),
}

/// Reader-wide configuration.
#[derive(Clone, Debug)]
pub struct Globals {
    /// Whether `.qmake.cache` files are looked for and `cache()` may write.
    pub do_cache: bool,
    /// Directory separator reported to projects.
    pub dir_sep: String,
    /// Separator between entries of path lists (`PATH`-style).
    pub dirlist_sep: String,
    /// Explicit cache file, overriding the search.
    pub cachefile: Option<PathBuf>,
    /// Explicit mkspec name or path.
    pub qmakespec: Option<String>,
    /// Root of the Qt installation.
    pub qt_dir: Option<PathBuf>,
    /// Location of the qmake binary, reported as `QMAKE_QMAKE`.
    pub qmake_abslocation: Option<PathBuf>,
    /// `-t` template override.
    pub user_template: Option<String>,
    /// `-tp` template prefix.
    pub user_template_prefix: Option<String>,
    /// Assignments run before the project body.
    pub precmds: Vec<String>,
    /// Assignments run after the project body.
    pub postcmds: Vec<String>,
    /// `-config` values added before the project body.
    pub preconfigs: Vec<String>,
    /// `-config` values added after the project body.
    pub postconfigs: Vec<String>,
    /// Environment overrides consulted before the process environment.
    pub environment: HashMap<String, String>,
    /// `$$[...]` property values.
    pub properties: HashMap<String, String>,
    /// Extra feature directories.
    pub feature_paths: Vec<PathBuf>,
    /// Extra qmake roots; each contributes `mkspecs/features`.
    pub qmake_paths: Vec<PathBuf>,
    /// Source side of a shadow build.
    pub source_root: Option<String>,
    /// Build side of a shadow build.
    pub build_root: Option<String>,
    /// Threshold for `debug(level, ...)`.
    pub debug_level: u32,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            do_cache: true,
            dir_sep: if cfg!(windows) { "\\" } else { "/" }.to_string(),
            dirlist_sep: if cfg!(windows) { ";" } else { ":" }.to_string(),
            cachefile: None,
            qmakespec: None,
            qt_dir: None,
            qmake_abslocation: None,
            user_template: None,
            user_template_prefix: None,
            precmds: Vec::new(),
            postcmds: Vec::new(),
            preconfigs: Vec::new(),
            postconfigs: Vec::new(),
            environment: HashMap::new(),
            properties: HashMap::new(),
            feature_paths: Vec::new(),
            qmake_paths: Vec::new(),
            source_root: None,
            build_root: None,
            debug_level: 0,
        }
    }
}

impl Globals {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Builder
    // =========================================================================

    /// Sets the Qt installation root.
    #[must_use]
    pub fn with_qt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.qt_dir = Some(dir.into());
        self
    }

    /// Sets the mkspec.
    #[must_use]
    pub fn with_spec(mut self, spec: impl Into<String>) -> Self {
        self.qmakespec = Some(spec.into());
        self
    }

    /// Enables or disables cache files.
    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.do_cache = enabled;
        self
    }

    /// Uses `path` as the cache file.
    #[must_use]
    pub fn with_cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cachefile = Some(path.into());
        self
    }

    /// Sets a property.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Overrides an environment variable.
    #[must_use]
    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// Adds a feature directory.
    #[must_use]
    pub fn with_feature_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.feature_paths.push(dir.into());
        self
    }

    /// Adds an assignment to run before the project body.
    #[must_use]
    pub fn with_precmd(mut self, cmd: impl Into<String>) -> Self {
        self.precmds.push(cmd.into());
        self
    }

    /// Adds an assignment to run after the project body.
    #[must_use]
    pub fn with_postcmd(mut self, cmd: impl Into<String>) -> Self {
        self.postcmds.push(cmd.into());
        self
    }

    /// Records a shadow build from `input_dir` into `output_dir`.
    #[must_use]
    pub fn with_directories(mut self, input_dir: &Path, output_dir: &Path) -> Self {
        self.set_directories(input_dir, output_dir);
        self
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Looks up `$$[name]`. Variant suffixes (`/get`, `/src`, ...) are
    /// ignored; `QT_*` locations default to paths under the Qt directory.
    #[must_use]
    pub fn property_value(&self, name: &str) -> Option<String> {
        let base = PROPERTY_SUFFIXES
            .iter()
            .find_map(|suffix| name.strip_suffix(suffix))
            .unwrap_or(name);

        if let Some(value) = self.properties.get(base).or_else(|| self.properties.get(name)) {
            return Some(value.clone());
        }

        if matches!(base, "QMAKE_SPEC" | "QMAKE_XSPEC") {
            return self.qmakespec.clone();
        }

        let qt_dir = ioutils::path_to_string(self.qt_dir.as_deref()?);
        let sub = match base {
            "QT_INSTALL_PREFIX" | "QT_HOST_PREFIX" | "QT_INSTALL_DATA" | "QT_HOST_DATA"
            | "QT_INSTALL_ARCHDATA" | "QT_EXT_PREFIX" => "",
            "QT_INSTALL_HEADERS" => "include",
            "QT_INSTALL_LIBS" | "QT_HOST_LIBS" => "lib",
            "QT_INSTALL_BINS" | "QT_HOST_BINS" | "QT_INSTALL_LIBEXECS" => "bin",
            "QT_INSTALL_PLUGINS" => "plugins",
            "QT_INSTALL_IMPORTS" => "imports",
            "QT_INSTALL_QML" => "qml",
            "QT_INSTALL_TRANSLATIONS" => "translations",
            "QT_INSTALL_DOCS" => "doc",
            "QT_INSTALL_CONFIGURATION" => "etc/xdg",
            "QT_INSTALL_EXAMPLES" => "examples",
            "QT_INSTALL_TESTS" => "tests",
            "QMAKE_MKSPECS" => "mkspecs",
            _ => return None,
        };
        Some(if sub.is_empty() {
            qt_dir
        } else {
            format!("{qt_dir}/{sub}")
        })
    }

    /// Reads an environment variable, overrides first.
    #[must_use]
    pub fn get_env(&self, name: &str) -> Option<String> {
        self.environment
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }

    /// Replaces every `$(NAME)` in `text` with the variable's value.
    #[must_use]
    pub fn expand_env_vars(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("$(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find(')') {
                Some(end) => {
                    out.push_str(&self.get_env(&after[..end]).unwrap_or_default());
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Maps a source path into the build tree of a shadow build.
    ///
    /// Returns the path unchanged when there is no shadow build, and an empty
    /// string when the path lies outside the source tree.
    #[must_use]
    pub fn shadowed_path(&self, file: &str) -> String {
        let (Some(source), Some(build)) = (&self.source_root, &self.build_root) else {
            return file.to_string();
        };
        match file.strip_prefix(source.as_str()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("{build}{rest}"),
            _ => String::new(),
        }
    }

    /// Environment list variable split on the list separator.
    #[must_use]
    pub fn env_path_list(&self, name: &str) -> Vec<PathBuf> {
        self.get_env(name)
            .map(|value| {
                value
                    .split(self.dirlist_sep.as_str())
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    // =========================================================================
    // Command line
    // =========================================================================

    /// Derives the shadow-build roots by stripping the common trailing path
    /// components of `input_dir` and `output_dir`.
    pub fn set_directories(&mut self, input_dir: &Path, output_dir: &Path) {
        let input = ioutils::clean_path(&ioutils::path_to_string(input_dir));
        let output = ioutils::clean_path(&ioutils::path_to_string(output_dir));
        if input == output || output.is_empty() {
            self.source_root = None;
            self.build_root = None;
            return;
        }

        let mut src: Vec<&str> = input.split('/').collect();
        let mut dst: Vec<&str> = output.split('/').collect();
        while src.len() > 1 && dst.len() > 1 && src.last() == dst.last() {
            src.pop();
            dst.pop();
        }
        self.source_root = Some(src.join("/"));
        self.build_root = Some(dst.join("/"));
    }

    /// Applies qmake-style arguments: `VAR=value` assignments, `-after`,
    /// `-config X`, `-spec X`, `-cache F`, `-nocache`, `-t X`, `-tp X`, `-d`.
    /// Returns the arguments that are neither (normally project files).
    ///
    /// # Errors
    /// Returns an error for an unknown option or a missing option value.
    pub fn add_command_line_arguments(&mut self, args: &[String]) -> Result<Vec<String>, ArgumentError> {
        let mut after = false;
        let mut rest = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let mut value_for = |option: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| ArgumentError::MissingValue(option.to_string()))
            };
            match arg.as_str() {
                "-after" => after = true,
                "-before" => after = false,
                "-nocache" => self.do_cache = false,
                "-d" => self.debug_level += 1,
                "-config" => {
                    let value = value_for(arg)?;
                    if after {
                        self.postconfigs.push(value);
                    } else {
                        self.preconfigs.push(value);
                    }
                }
                "-spec" | "-platform" => self.qmakespec = Some(value_for(arg)?),
                "-cache" => self.cachefile = Some(PathBuf::from(value_for(arg)?)),
                "-t" | "-template" => self.user_template = Some(value_for(arg)?),
                "-tp" | "-template_prefix" => self.user_template_prefix = Some(value_for(arg)?),
                _ if arg.contains('=') && !arg.starts_with('-') => {
                    if after {
                        self.postcmds.push(arg.clone());
                    } else {
                        self.precmds.push(arg.clone());
                    }
                }
                _ if arg.starts_with('-') && arg.len() > 1 => {
                    return Err(ArgumentError::Unknown(arg.clone()));
                }
                _ => rest.push(arg.clone()),
            }
        }

        if !self.preconfigs.is_empty() {
            self.precmds.push(format!("CONFIG += {}", self.preconfigs.join(" ")));
            self.preconfigs.clear();
        }
        if !self.postconfigs.is_empty() {
            self.postcmds.push(format!("CONFIG += {}", self.postconfigs.join(" ")));
            self.postconfigs.clear();
        }
        Ok(rest)
    }
}
