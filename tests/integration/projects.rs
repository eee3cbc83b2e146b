//! Multi-file project scenarios
//!
//! Shared include files, helper functions, features and subproject reads.

use std::fs;
use std::path::{Path, PathBuf};

use proreader_language::{Globals, MessageKind};
use proreader_runtime::{ProjectReader, Report};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
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

    fn root(&self) -> &Path {
        self.dir.path()
    }
}

// =============================================================================
// Shared Configuration
// =============================================================================

#[test]
fn helper_functions_from_shared_include() {
    let ws = Workspace::new();
    ws.file(
        "common/helpers.pri",
        "defineReplace(sourcesFor) {\n\
             result =\n\
             for(name, 1): result += $${name}.cpp\n\
             return($$result)\n\
         }\n\
         defineReplace(headersFor) {\n\
             result =\n\
             for(name, 1): result += $${name}.h\n\
             return($$result)\n\
         }\n",
    );
    let pro = ws.file(
        "app/app.pro",
        "include(../common/helpers.pri)\n\
         CLASSES = window dialog model\n\
         SOURCES = main.cpp $$sourcesFor($$CLASSES)\n\
         HEADERS = $$headersFor($$CLASSES)\n",
    );

    let mut reader = ProjectReader::new();
    assert!(reader.read_file(&pro), "{:?}", reader.diagnostics());
    assert_eq!(
        reader.source_files(),
        ["main.cpp", "window.cpp", "dialog.cpp", "model.cpp"]
    );
    assert_eq!(reader.header_files(), ["window.h", "dialog.h", "model.h"]);
}

#[test]
fn feature_from_configured_path() {
    let ws = Workspace::new();
    ws.file(
        "features/uitools.prf",
        "FORMS += $$files($$_PRO_FILE_PWD_/ui/*.ui)\nDEFINES += HAVE_UITOOLS\n",
    );
    ws.file("app/ui/main.ui", "<ui/>");
    ws.file("app/ui/about.ui", "<ui/>");
    let pro = ws.file("app/app.pro", "SOURCES = main.cpp\nload(uitools)\n");

    let globals = Globals::new().with_feature_path(ws.root().join("features"));
    let mut reader = ProjectReader::with_globals(globals);
    assert!(reader.read_file(&pro), "{:?}", reader.diagnostics());

    let ui = ws.root().join("app/ui").to_string_lossy().into_owned();
    assert_eq!(
        reader.form_files(),
        [format!("{ui}/about.ui"), format!("{ui}/main.ui")]
    );
    assert_eq!(reader.values("DEFINES"), ["HAVE_UITOOLS"]);
}

#[test]
fn subprojects_are_read_one_at_a_time() {
    let ws = Workspace::new();
    let top = ws.file("top.pro", "TEMPLATE = subdirs\nSUBDIRS = core gui\n");
    ws.file("core/core.pro", "TEMPLATE = lib\nSOURCES = core.cpp\nHEADERS = core.h\n");
    ws.file("gui/gui.pro", "TEMPLATE = app\nSOURCES = gui.cpp\nRESOURCES = gui.qrc\nCONFIG += flat\n");

    let mut reader = ProjectReader::new();
    assert!(reader.read_file(&top));
    let subdirs = reader.values("SUBDIRS").to_vec();
    assert_eq!(subdirs, ["core", "gui"]);
    assert!(reader.source_files().is_empty());

    let mut sources = Vec::new();
    let mut flat = Vec::new();
    for sub in &subdirs {
        let path = ws.root().join(sub).join(format!("{sub}.pro"));
        assert!(reader.read_file(&path));
        sources.extend(reader.source_files().iter().cloned());
        flat.push(reader.is_flat());
    }
    assert_eq!(sources, ["core.cpp", "gui.cpp"]);
    assert_eq!(flat, [false, true]);
}

// =============================================================================
// Data Files
// =============================================================================

#[test]
fn values_from_other_files() {
    let ws = Workspace::new();
    ws.file("version.pri", "VERSION = 2.4.1\nLICENSE = MIT\n");
    ws.file("files.txt", "alpha.cpp\nbeta.cpp\n");
    let pro = ws.file(
        "app.pro",
        "VERSION = $$fromfile(version.pri, VERSION)\n\
         infile(version.pri, LICENSE, MIT): DEFINES += PERMISSIVE\n\
         SOURCES = $$cat(files.txt, lines)\n",
    );

    let mut reader = ProjectReader::new();
    assert!(reader.read_file(&pro), "{:?}", reader.diagnostics());
    assert_eq!(reader.values("VERSION"), ["2.4.1"]);
    assert_eq!(reader.values("DEFINES"), ["PERMISSIVE"]);
    assert_eq!(reader.source_files(), ["alpha.cpp", "beta.cpp"]);
}

#[test]
fn project_reads_its_own_values() {
    let ws = Workspace::new();
    ws.file("flags.pri", "infile($$_PRO_FILE_, SOURCES, main.cpp): CONFIG += flat\n");
    let pro = ws.file(
        "app.pro",
        "SOURCES = main.cpp util.cpp\n\
         infile($$_PRO_FILE_, SOURCES, util.cpp): DEFINES += HAS_UTIL\n\
         LISTED = $$fromfile($$_PRO_FILE_, SOURCES)\n\
         include(flags.pri)\n",
    );

    let mut reader = ProjectReader::new();
    assert!(reader.read_file(&pro), "{:?}", reader.diagnostics());
    assert_eq!(reader.values("DEFINES"), ["HAS_UTIL"]);
    assert_eq!(reader.values("LISTED"), ["main.cpp", "util.cpp"]);
    assert!(reader.is_flat());
    assert!(reader.diagnostics().is_empty(), "{:?}", reader.diagnostics());
}

#[test]
fn generated_include_file() {
    let ws = Workspace::new();
    let pro = ws.file(
        "app.pro",
        "GENERATED = \"SOURCES += gen.cpp\"\n\
         write_file($$OUT_PWD/generated.pri, GENERATED)\n\
         include($$OUT_PWD/generated.pri)\n\
         SOURCES += main.cpp\n",
    );

    let mut reader = ProjectReader::new();
    assert!(reader.read_file(&pro), "{:?}", reader.diagnostics());
    assert_eq!(reader.source_files(), ["gen.cpp", "main.cpp"]);
    assert!(ws.root().join("generated.pri").is_file());
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn error_in_nested_include_is_located() {
    let ws = Workspace::new();
    ws.file("deps/check.pri", "A = 1\n\n!exists(missing.h): error(dependency not found)\n");
    let pro = ws.file("app.pro", "SOURCES = a.cpp\ninclude(deps/check.pri)\n");

    let mut reader = ProjectReader::new();
    let err = reader.try_read_file(&pro).err();
    let location = err
        .as_ref()
        .and_then(|e| e.context.as_ref())
        .and_then(|c| c.location.clone());
    assert!(
        location.as_ref().is_some_and(|l| l.file.ends_with("deps/check.pri") && l.line == 3),
        "{location:?}"
    );
    assert!(
        reader
            .project_output()
            .iter()
            .any(|(_, text)| text.contains("dependency not found"))
    );
    assert!(!Report::from_reader(&reader).valid);
}

#[test]
fn missing_include_is_reported_but_not_fatal() {
    let ws = Workspace::new();
    let pro = ws.file("app.pro", "include(nowhere.pri)\nSOURCES = a.cpp\n");

    let mut reader = ProjectReader::new();
    assert!(reader.read_file(&pro));
    assert_eq!(reader.source_files(), ["a.cpp"]);
    assert!(
        reader
            .diagnostics()
            .iter()
            .any(|d| d.kind == MessageKind::IoError && d.text.contains("nowhere.pri"))
    );
}

#[test]
fn circular_include_fails_the_read() {
    let ws = Workspace::new();
    ws.file("a.pri", "include(b.pri)\n");
    ws.file("b.pri", "include(a.pri)\n");
    let pro = ws.file("app.pro", "include(a.pri)\nSOURCES = never.cpp\n");

    let mut reader = ProjectReader::new();
    let err = reader.try_read_file(&pro).err().map(|e| e.to_string()).unwrap_or_default();
    assert!(err.contains("circular inclusion"), "{err}");
    assert!(reader.source_files().is_empty());
}
