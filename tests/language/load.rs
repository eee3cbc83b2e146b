//! Integration tests for project loading
//!
//! Tests the mkspec, feature, configuration file and command line stages
//! that run around a project body.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use proreader_language::{
    CollectingHandler, EvalFileType, Evaluator, Flow, Globals, LoadFlags, MessageKind, Parser,
    ValueList,
};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

struct Tree {
    dir: TempDir,
}

impl Tree {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

struct Loaded {
    result: proreader_language::Result<Flow>,
    handler: CollectingHandler,
    values: Vec<(String, ValueList)>,
}

impl Loaded {
    fn values(&self, name: &str) -> ValueList {
        self.values
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    fn assert_ok(&self) {
        if let Err(e) = &self.result {
            panic!("load failed: {e}\n{:?}", self.handler.diagnostics);
        }
    }
}

fn load(globals: Globals, project: &Path, flags: LoadFlags, probe: &[&str]) -> Loaded {
    let mut handler = CollectingHandler::new();
    let (result, values) = {
        let mut evaluator = Evaluator::new(Arc::new(globals), Parser::new(), &mut handler);
        let result = evaluator.try_evaluate_file(project, EvalFileType::Project, flags);
        let values = probe
            .iter()
            .map(|name| ((*name).to_string(), evaluator.values(name)))
            .collect();
        (result, values)
    };
    Loaded {
        result,
        handler,
        values,
    }
}

/// A qmake root with a `default` mkspec and a few features.
fn qmake_root(tree: &Tree) -> PathBuf {
    tree.file(
        "qt/mkspecs/default/qmake.conf",
        "QMAKE_PLATFORM = unix linux\nCONFIG += unix spec_config\nQMAKE_CXX = g++\n",
    );
    tree.file("qt/mkspecs/features/spec_pre.prf", "SPEC_PRE = loaded\n");
    tree.file("qt/mkspecs/features/default_pre.prf", "CONFIG += from_default_pre\n");
    tree.file("qt/mkspecs/features/default_post.prf", "POST_SOURCES = $$SOURCES\n");
    tree.file("qt/mkspecs/features/extra.prf", "EXTRA_LOADED = 1\nCONFIG += chained\n");
    tree.file("qt/mkspecs/features/chained.prf", "CHAINED_LOADED = 1\n");
    tree.file("qt/mkspecs/features/linux/platform.prf", "PLATFORM_FEATURE = linux\n");
    tree.file("qt/mkspecs/features/platform.prf", "PLATFORM_FEATURE = generic\n");
    tree.path("qt")
}

fn globals_for(root: PathBuf) -> Globals {
    Globals {
        qmake_paths: vec![root],
        ..Globals::new().with_cache(false)
    }
}

// =============================================================================
// Mkspec and Features
// =============================================================================

#[test]
fn full_load_runs_every_stage() {
    let tree = Tree::new();
    let root = qmake_root(&tree);
    let project = tree.file(
        "src/app/app.pro",
        "SOURCES = main.cpp\nunix: IS_UNIX = 1\nCONFIG += extra\n",
    );

    let loaded = load(
        globals_for(root),
        &project,
        LoadFlags::ALL,
        &[
            "SPEC_PRE",
            "QMAKE_CXX",
            "CONFIG",
            "IS_UNIX",
            "POST_SOURCES",
            "EXTRA_LOADED",
            "CHAINED_LOADED",
            "TARGET",
            "TEMPLATE",
        ],
    );
    loaded.assert_ok();

    assert_eq!(loaded.values("SPEC_PRE"), ["loaded"]);
    assert_eq!(loaded.values("QMAKE_CXX"), ["g++"]);
    assert!(loaded.values("CONFIG").contains_str("from_default_pre"));
    assert_eq!(loaded.values("IS_UNIX"), ["1"]);
    assert_eq!(loaded.values("POST_SOURCES"), ["main.cpp"]);
    assert_eq!(loaded.values("EXTRA_LOADED"), ["1"]);
    assert_eq!(loaded.values("CHAINED_LOADED"), ["1"]);
    assert_eq!(loaded.values("TARGET"), ["app"]);
    assert_eq!(loaded.values("TEMPLATE"), ["app"]);
}

#[test]
fn evaluated_files_are_announced() {
    let tree = Tree::new();
    let root = qmake_root(&tree);
    let project = tree.file("app.pro", "SOURCES = a.cpp\n");

    let loaded = load(globals_for(root), &project, LoadFlags::ALL, &[]);
    loaded.assert_ok();

    let kind_of = |suffix: &str| {
        loaded
            .handler
            .evaluated
            .iter()
            .find(|(path, _)| path.ends_with(suffix))
            .map(|(_, kind)| *kind)
    };
    assert_eq!(kind_of("app.pro"), Some(EvalFileType::Project));
    assert_eq!(kind_of("default/qmake.conf"), Some(EvalFileType::Config));
    assert_eq!(kind_of("spec_pre.prf"), Some(EvalFileType::Feature));
    assert_eq!(kind_of("default_post.prf"), Some(EvalFileType::Feature));
}

#[test]
fn project_only_skips_the_pipeline() {
    let tree = Tree::new();
    let root = qmake_root(&tree);
    let project = tree.file("app.pro", "SOURCES = a.cpp\n");

    let loaded = load(
        globals_for(root),
        &project,
        LoadFlags::PRO_ONLY,
        &["SPEC_PRE", "POST_SOURCES", "TARGET"],
    );
    loaded.assert_ok();
    assert!(loaded.values("SPEC_PRE").is_empty());
    assert!(loaded.values("POST_SOURCES").is_empty());
    assert!(loaded.values("TARGET").is_empty());
}

#[test]
fn platform_feature_directory_comes_first() {
    let tree = Tree::new();
    let root = qmake_root(&tree);
    let project = tree.file("app.pro", "load(platform)\n");

    let loaded = load(globals_for(root), &project, LoadFlags::ALL, &["PLATFORM_FEATURE"]);
    loaded.assert_ok();
    assert_eq!(loaded.values("PLATFORM_FEATURE"), ["linux"]);
}

#[test]
fn explicit_spec_must_exist() {
    let tree = Tree::new();
    let root = qmake_root(&tree);
    let project = tree.file("app.pro", "SOURCES = a.cpp\n");

    let globals = Globals {
        qmakespec: Some("no-such-spec".to_string()),
        ..globals_for(root)
    };
    let loaded = load(globals, &project, LoadFlags::ALL, &[]);
    let message = loaded.result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("Could not find qmake configuration file"), "{message}");
}

#[test]
fn missing_default_spec_is_not_an_error() {
    let tree = Tree::new();
    let project = tree.file("app.pro", "SOURCES = a.cpp\n");

    let loaded = load(Globals::new().with_cache(false), &project, LoadFlags::ALL, &["SOURCES"]);
    loaded.assert_ok();
    assert_eq!(loaded.values("SOURCES"), ["a.cpp"]);
}

// =============================================================================
// Feature Search
// =============================================================================

#[test]
fn feature_reloading_itself_continues_the_search() {
    let tree = Tree::new();
    tree.file("first/shared.prf", "FIRST = 1\nload(shared)\n");
    tree.file("second/shared.prf", "SECOND = 1\nCOUNT += x\n");
    let project = tree.file("app.pro", "load(shared)\nload(shared)\n");

    let globals = Globals::new()
        .with_feature_path(tree.path("first"))
        .with_feature_path(tree.path("second"));
    let loaded = load(globals, &project, LoadFlags::PRO_ONLY, &["FIRST", "SECOND", "COUNT"]);
    loaded.assert_ok();

    assert_eq!(loaded.values("FIRST"), ["1"]);
    assert_eq!(loaded.values("SECOND"), ["1"]);
    assert_eq!(loaded.values("COUNT"), ["x"]);
}

#[test]
fn missing_feature_fails_the_condition() {
    let tree = Tree::new();
    let project = tree.file("app.pro", "!load(nothing_here): MISSING = 1\n");

    let loaded = load(Globals::new(), &project, LoadFlags::PRO_ONLY, &["MISSING"]);
    loaded.assert_ok();
    assert_eq!(loaded.values("MISSING"), ["1"]);
    assert!(
        loaded
            .handler
            .diagnostics
            .iter()
            .any(|d| d.kind == MessageKind::EvalError && d.text.contains("nothing_here"))
    );
}

// =============================================================================
// Configuration Files
// =============================================================================

#[test]
fn qmake_conf_in_parent_directory() {
    let tree = Tree::new();
    tree.file(".qmake.conf", "ROOT_DEFINES = FROM_CONF\n");
    let project = tree.file(
        "sub/app/app.pro",
        "DEFINES += $$ROOT_DEFINES\nCONF = $$_QMAKE_CONF_\n",
    );

    let loaded = load(
        Globals::new().with_cache(false),
        &project,
        LoadFlags::ALL,
        &["DEFINES", "CONF"],
    );
    loaded.assert_ok();
    assert_eq!(loaded.values("DEFINES"), ["FROM_CONF"]);
    assert!(loaded.values("CONF").iter().any(|c| c.ends_with("/.qmake.conf")));
}

#[test]
fn cache_writes_and_is_read_back() {
    let tree = Tree::new();
    let writer = tree.file("writer.pro", "CACHED = a b\ncache(CACHED)\n");
    let loaded = load(Globals::new(), &writer, LoadFlags::ALL, &[]);
    loaded.assert_ok();

    let cache = tree.path(".qmake.cache");
    let text = fs::read_to_string(&cache).unwrap();
    assert!(text.contains("CACHED ="), "{text}");
    assert!(
        loaded
            .handler
            .diagnostics
            .iter()
            .any(|d| d.text.starts_with("creating cache file"))
    );

    let reader = tree.file("reader.pro", "SEEN = $$CACHED\n");
    let loaded = load(Globals::new(), &reader, LoadFlags::ALL, &["SEEN"]);
    loaded.assert_ok();
    assert_eq!(loaded.values("SEEN"), ["a", "b"]);
}

#[test]
fn nocache_skips_cache_files() {
    let tree = Tree::new();
    tree.file(".qmake.cache", "CACHED = stale\n");
    let project = tree.file("app.pro", "SEEN = $$CACHED\ncache(OTHER, set, SEEN)\n");

    let loaded = load(Globals::new().with_cache(false), &project, LoadFlags::ALL, &["SEEN"]);
    loaded.assert_ok();
    assert!(loaded.values("SEEN").is_empty());
    let text = fs::read_to_string(tree.path(".qmake.cache")).unwrap();
    assert_eq!(text, "CACHED = stale\n");
}

// =============================================================================
// Command Line
// =============================================================================

#[test]
fn command_line_assignments_wrap_the_project() {
    let tree = Tree::new();
    let project = tree.file("app.pro", "DEFINES += APP\nSEEN_POST = $$POST\n");

    let mut globals = Globals::new().with_cache(false);
    let args: Vec<String> = ["DEFINES=CLI", "-config", "cli_cfg", "-t", "lib", "-after", "POST=late", "app.pro"]
        .iter()
        .map(ToString::to_string)
        .collect();
    let rest = globals.add_command_line_arguments(&args).unwrap();
    assert_eq!(rest, ["app.pro"]);

    let loaded = load(
        globals,
        &project,
        LoadFlags::ALL,
        &["DEFINES", "SEEN_POST", "POST", "CONFIG", "TEMPLATE"],
    );
    loaded.assert_ok();
    assert_eq!(loaded.values("DEFINES"), ["CLI", "APP"]);
    assert!(loaded.values("SEEN_POST").is_empty());
    assert_eq!(loaded.values("POST"), ["late"]);
    assert!(loaded.values("CONFIG").contains_str("cli_cfg"));
    assert_eq!(loaded.values("TEMPLATE"), ["lib"]);
}
