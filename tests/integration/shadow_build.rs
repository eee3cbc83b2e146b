//! Shadow build scenarios
//!
//! Source and build trees in different directories.

use std::fs;
use std::sync::Arc;

use proreader_language::{CollectingHandler, EvalFileType, Evaluator, Globals, LoadFlags, Parser};

#[test]
fn out_pwd_maps_into_build_tree() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("src/app");
    let build = dir.path().join("build/app");
    fs::create_dir_all(&source).unwrap();
    let pro = source.join("app.pro");
    fs::write(
        &pro,
        "OUT = $$OUT_PWD\nIN = $$_PRO_FILE_PWD_\nMAPPED = $$shadowed($$PWD/sub)\nOUTSIDE = $$shadowed(/elsewhere)\n",
    )
    .unwrap();

    let globals = Globals::new().with_directories(&source, &build);
    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(globals), Parser::new(), &mut handler);
    evaluator
        .try_evaluate_file(&pro, EvalFileType::Project, LoadFlags::PRO_ONLY)
        .unwrap();

    let build = build.to_string_lossy().into_owned();
    assert_eq!(evaluator.first("OUT"), build);
    assert_eq!(evaluator.first("IN"), source.to_string_lossy());
    assert_eq!(evaluator.first("MAPPED"), format!("{build}/sub"));
    assert!(evaluator.values("OUTSIDE").is_empty());
}

#[test]
fn explicit_output_dir_wins() {
    let dir = tempfile::tempdir().unwrap();
    let pro = dir.path().join("app.pro");
    fs::write(&pro, "OUT = $$OUT_PWD\n").unwrap();

    let mut handler = CollectingHandler::new();
    let mut evaluator = Evaluator::new(Arc::new(Globals::new()), Parser::new(), &mut handler);
    evaluator.set_output_dir(dir.path().join("out/../build"));
    evaluator
        .try_evaluate_file(&pro, EvalFileType::Project, LoadFlags::PRO_ONLY)
        .unwrap();

    let expected = dir.path().join("build").to_string_lossy().into_owned();
    assert_eq!(evaluator.first("OUT"), expected);
}

#[test]
fn same_directories_are_not_a_shadow_build() {
    let dir = tempfile::tempdir().unwrap();
    let globals = Globals::new().with_directories(dir.path(), dir.path());
    assert!(globals.source_root.is_none());
    assert!(globals.build_root.is_none());
    assert_eq!(globals.shadowed_path("/any/path"), "/any/path");
}
