//! Integration tests for the evaluator
//!
//! Tests evaluation of project statements through the public API.

use std::fs;
use std::sync::Arc;

use proreader_language::{
    CollectingHandler, EvalFileType, EvalLimits, Evaluator, FileMessageKind, Globals, LoadFlags,
    Parser, ValueList, VisitReturn,
};

const IDENTITY: &str = "/work/app/app.pro";

fn evaluate(source: &str) -> (Vec<(String, Vec<String>)>, CollectingHandler) {
    let mut handler = CollectingHandler::new();
    let vars = {
        let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler);
        if let Err(e) = evaluator.evaluate_command(source, IDENTITY) {
            panic!("evaluation failed: {e}");
        }
        evaluator
            .variables()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_vec()))
            .collect()
    };
    (vars, handler)
}

fn value(vars: &[(String, Vec<String>)], name: &str) -> Vec<String> {
    vars.iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

// =============================================================================
// Project Snippets
// =============================================================================

#[test]
fn typical_application_project() {
    let (vars, _) = evaluate(
        "TEMPLATE = app\n\
         QT += core gui\n\
         greaterThan(QT_MAJOR_VERSION, 4): QT += widgets\n\
         CONFIG += c++17\n\
         SOURCES += \\\n    main.cpp \\\n    mainwindow.cpp\n\
         HEADERS += mainwindow.h\n\
         FORMS += mainwindow.ui\n\
         unix:!macx: LIBS += -lm\n",
    );
    assert_eq!(value(&vars, "TEMPLATE"), ["app"]);
    assert_eq!(value(&vars, "SOURCES"), ["main.cpp", "mainwindow.cpp"]);
    assert_eq!(value(&vars, "HEADERS"), ["mainwindow.h"]);
    assert_eq!(value(&vars, "FORMS"), ["mainwindow.ui"]);
    assert_eq!(value(&vars, "QT"), ["core", "gui"]);
}

#[test]
fn make_brace_references_stay_literal() {
    let (vars, handler) = evaluate(
        "QMAKE_LFLAGS = -Wl,-rpath,${ORIGIN}\n\
         unix {\n    QMAKE_RPATHDIR += ${ORIGIN}/../lib\n}\n\
         true { LIBS += -L${BUILD}/lib -lcore }\n",
    );
    assert_eq!(value(&vars, "QMAKE_LFLAGS"), ["-Wl,-rpath,${ORIGIN}"]);
    assert_eq!(value(&vars, "LIBS"), ["-L${BUILD}/lib", "-lcore"]);
    assert!(!handler.has_errors());
}

#[test]
fn reevaluation_is_deterministic() {
    let source = "TEMPLATE = app\n\
                  MODULES = net io gui\n\
                  defineReplace(wrap) {\n  return(<$$1>)\n}\n\
                  for(m, MODULES): SOURCES += src/$${m}.cpp\n\
                  OBJECTS = $$replace(SOURCES, .cpp, .o)\n\
                  WRAPPED = $$wrap($$first(SOURCES))\n\
                  SOURCES *= src/net.cpp extra.cpp\n\
                  CONFIG += debug\n\
                  debug|release: DEFINES += BUILD_$$upper($$TEMPLATE)\n";
    let (first, _) = evaluate(source);
    let (second, _) = evaluate(source);
    let sorted = |mut vars: Vec<(String, Vec<String>)>| {
        vars.sort();
        vars
    };
    let first = sorted(first);
    assert!(!first.is_empty());
    assert_eq!(first, sorted(second));
}

#[test]
fn generated_file_lists() {
    let (vars, _) = evaluate(
        "MODULES = net io gui\n\
         for(m, MODULES) {\n\
             SOURCES += src/$${m}/$${m}.cpp\n\
             HEADERS += include/$${m}.h\n\
         }\n\
         OBJECTS = $$replace(SOURCES, .cpp, .o)\n",
    );
    assert_eq!(value(&vars, "SOURCES"), ["src/net/net.cpp", "src/io/io.cpp", "src/gui/gui.cpp"]);
    assert_eq!(value(&vars, "HEADERS"), ["include/net.h", "include/io.h", "include/gui.h"]);
    assert_eq!(value(&vars, "OBJECTS"), ["src/net/net.o", "src/io/io.o", "src/gui/gui.o"]);
}

#[test]
fn helper_functions_build_values() {
    let (vars, _) = evaluate(
        "defineReplace(prefixed) {\n\
             for(f, $$1): out += $$2/$$f\n\
             return($$out)\n\
         }\n\
         defineTest(hasModule) {\n\
             contains(QT, $$1): return(true)\n\
             return(false)\n\
         }\n\
         QT = core network\n\
         FILES = a.cpp b.cpp\n\
         SOURCES = $$prefixed(FILES, src)\n\
         hasModule(network): DEFINES += HAVE_NETWORK\n\
         hasModule(sql): DEFINES += HAVE_SQL\n",
    );
    assert_eq!(value(&vars, "SOURCES"), ["src/a.cpp", "src/b.cpp"]);
    assert_eq!(value(&vars, "DEFINES"), ["HAVE_NETWORK"]);
}

#[test]
fn string_and_list_builtins() {
    let (vars, _) = evaluate(
        "P = src/widgets/button.cpp\n\
         B = $$basename(P)\n\
         D = $$dirname(P)\n\
         S = $$section(P, /, 1, 1)\n\
         V = c-a-b-a\n\
         PARTS = $$split(V, -)\n\
         U = $$unique(PARTS)\n\
         SORTED = $$sorted(PARTS)\n\
         R = $$reverse(U)\n\
         N = $$num_add(2, 3, -1)\n\
         F = $$sprintf(%1.%2, lib, so)\n\
         SZ = $$size(PARTS)\n",
    );
    assert_eq!(value(&vars, "B"), ["button.cpp"]);
    assert_eq!(value(&vars, "D"), ["src/widgets"]);
    assert_eq!(value(&vars, "S"), ["widgets"]);
    assert_eq!(value(&vars, "PARTS"), ["c", "a", "b", "a"]);
    assert_eq!(value(&vars, "U"), ["c", "a", "b"]);
    assert_eq!(value(&vars, "SORTED"), ["a", "a", "b", "c"]);
    assert_eq!(value(&vars, "R"), ["b", "a", "c"]);
    assert_eq!(value(&vars, "N"), ["4"]);
    assert_eq!(value(&vars, "F"), ["lib.so"]);
    assert_eq!(value(&vars, "SZ"), ["4"]);
}

#[test]
fn project_output_reaches_handler() {
    let (_, handler) = evaluate("message(configuring)\nwarning(deprecated option)\n");
    assert_eq!(handler.output_of(FileMessageKind::Message), ["Project MESSAGE: configuring"]);
    assert_eq!(
        handler.output_of(FileMessageKind::Warning),
        ["Project WARNING: deprecated option"]
    );
    assert!(!handler.has_errors());
}

#[test]
fn decided_conditions_skip_remaining_terms() {
    let (vars, _) = evaluate(
        "defineReplace(mark) {\n\
             MARKED += $$1\n\
             return(yes)\n\
         }\n\
         CONFIG += yes\n\
         true|$$mark(or_skipped): A = 1\n\
         false:!$$mark(and_skipped): B = 1\n\
         false|$$mark(or_taken): C = 1\n\
         true:$$mark(and_taken): D = 1\n",
    );
    assert_eq!(value(&vars, "MARKED"), ["or_taken", "and_taken"]);
    assert_eq!(value(&vars, "A"), ["1"]);
    assert!(value(&vars, "B").is_empty());
    assert_eq!(value(&vars, "C"), ["1"]);
    assert_eq!(value(&vars, "D"), ["1"]);
}

// =============================================================================
// Public API
// =============================================================================

#[test]
fn conditional_evaluation() {
    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler);
    evaluator.set_values("CONFIG", ValueList::from(["debug", "shared"]));

    assert!(evaluator.evaluate_conditional("debug", IDENTITY, 1).unwrap());
    assert!(evaluator.evaluate_conditional("debug:shared", IDENTITY, 1).unwrap());
    assert!(!evaluator.evaluate_conditional("release", IDENTITY, 1).unwrap());
    assert!(evaluator.evaluate_conditional("release|!static", IDENTITY, 1).unwrap());
    assert!(evaluator.is_active_config("sha*", true));
    assert!(!evaluator.is_active_config("sha*", false));
}

#[test]
fn function_lookup() {
    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler);
    evaluator
        .evaluate_command("defineTest(mine) {\n  return(true)\n}\n", IDENTITY)
        .unwrap();

    assert!(evaluator.is_test_function_defined("mine"));
    assert!(evaluator.is_test_function_defined("contains"));
    assert!(!evaluator.is_replace_function_defined("mine"));
    assert!(evaluator.is_replace_function_defined("join"));
}

#[test]
fn state_is_restored_after_failure() {
    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler);
    let result = evaluator.evaluate_command(
        "defineTest(boom) {\n  error(inside)\n}\nboom()\n",
        IDENTITY,
    );

    assert!(result.is_err());
    assert_eq!(evaluator.scope_depth(), 1);
    assert_eq!(evaluator.location_depth(), 0);
    evaluator.evaluate_command("AFTER = ok", IDENTITY).unwrap();
    assert_eq!(evaluator.first("AFTER"), "ok");
}

#[test]
fn properties_come_from_globals() {
    let globals = Globals::new()
        .with_qt_dir("/opt/qt6")
        .with_property("QT_VERSION", "6.5.0");
    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(globals), Parser::new(), &mut handler);
    evaluator
        .evaluate_command(
            "INC = $$[QT_INSTALL_HEADERS]\nV = $$[QT_VERSION]\nversionAtLeast(V, 6.0): SIX = 1\n",
            IDENTITY,
        )
        .unwrap();

    assert_eq!(evaluator.first("INC"), "/opt/qt6/include");
    assert_eq!(evaluator.first("V"), "6.5.0");
    assert_eq!(evaluator.first("SIX"), "1");
}

#[test]
fn environment_overrides() {
    let globals = Globals::new().with_env("PROREADER_TEST_VAR", "from-globals");
    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(globals), Parser::new(), &mut handler);
    evaluator
        .evaluate_command("A = $$(PROREADER_TEST_VAR)\nB = $$getenv(PROREADER_TEST_VAR)\n", IDENTITY)
        .unwrap();

    assert_eq!(evaluator.first("A"), "from-globals");
    assert_eq!(evaluator.first("B"), "from-globals");
}

#[test]
fn include_limit_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
        fs::write(
            dir.path().join(format!("level{i}.pri")),
            format!("include(level{}.pri)\n", i + 1),
        )
        .unwrap();
    }
    fs::write(dir.path().join("level5.pri"), "DEEP = yes\n").unwrap();

    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler)
        .with_limits(EvalLimits::default().with_max_include_depth(3));
    let result = evaluator.evaluate_file(
        &dir.path().join("level0.pri"),
        EvalFileType::Project,
        LoadFlags::PRO_ONLY,
    );

    assert_eq!(result, VisitReturn::Error);
    assert!(evaluator.values("DEEP").is_empty());
    drop(evaluator);
    assert!(handler.has_errors());
}

#[test]
fn files_lists_matching_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src/sub")).unwrap();
    for name in ["src/a.cpp", "src/b.cpp", "src/notes.txt", "src/sub/c.cpp"] {
        fs::write(dir.path().join(name), "").unwrap();
    }
    let pro = dir.path().join("app.pro");
    fs::write(&pro, "FLAT = $$files(src/*.cpp)\nDEEP = $$files(src/*.cpp, true)\n").unwrap();

    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler);
    let result = evaluator.evaluate_file(&pro, EvalFileType::Project, LoadFlags::PRO_ONLY);
    assert_eq!(result, VisitReturn::True);

    let mut flat = evaluator.values("FLAT").into_vec();
    flat.sort();
    assert_eq!(flat, ["src/a.cpp", "src/b.cpp"]);
    assert_eq!(evaluator.values("DEEP").len(), 3);
}
