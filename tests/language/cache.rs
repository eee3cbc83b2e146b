//! Integration tests for the parse cache
//!
//! Tests that files are parsed once and re-parsed after they change.

use std::fs::{self, File};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use proreader_language::{
    CollectingHandler, EvalFileType, Evaluator, Globals, LoadFlags, ParseCache, Parser,
};

#[test]
fn second_parse_is_a_hit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.pro");
    fs::write(&path, "SOURCES = a.cpp\n").unwrap();

    let cache = Arc::new(ParseCache::new());
    let parser = Parser::with_cache(Arc::clone(&cache));
    let first = parser.parse_file(&path).unwrap();
    let second = parser.parse_file(&path).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[test]
fn modified_file_is_reparsed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.pro");
    fs::write(&path, "A = 1\n").unwrap();

    let cache = Arc::new(ParseCache::new());
    let parser = Parser::with_cache(Arc::clone(&cache));
    let before = parser.parse_file(&path).unwrap();

    fs::write(&path, "A = 1\nB = 2\n").unwrap();
    let later = SystemTime::now() + Duration::from_secs(60);
    File::options().write(true).open(&path).unwrap().set_modified(later).unwrap();

    let after = parser.parse_file(&path).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(after.ops().len() > before.ops().len());
    assert_eq!(cache.stats().misses, 2);
    assert_eq!(cache.len(), 1);
}

#[test]
fn cache_is_shared_between_evaluators() {
    let dir = tempfile::tempdir().unwrap();
    let common = dir.path().join("common.pri");
    let app = dir.path().join("app.pro");
    fs::write(&common, "DEFINES += COMMON\n").unwrap();
    fs::write(&app, "include(common.pri)\n").unwrap();

    let cache = Arc::new(ParseCache::new());
    let globals = Arc::new(Globals::new());
    for _ in 0..2 {
        let mut handler = CollectingHandler::new();
        let mut evaluator = Evaluator::new(
            Arc::clone(&globals),
            Parser::with_cache(Arc::clone(&cache)),
            &mut handler,
        );
        evaluator
            .try_evaluate_file(&app, EvalFileType::Project, LoadFlags::PRO_ONLY)
            .unwrap();
        assert_eq!(evaluator.values("DEFINES"), ["COMMON"]);
    }

    let stats = cache.stats();
    assert_eq!(stats.entries, 2);
    assert_eq!(stats.hits, 2);
}

#[test]
fn discard_and_clear() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.pro");
    fs::write(&path, "A = 1\n").unwrap();

    let cache = Arc::new(ParseCache::new());
    let parser = Parser::with_cache(Arc::clone(&cache));
    parser.parse_file(&path).unwrap();
    assert!(cache.contains(&path));
    assert!(cache.discard(&path));
    assert!(!cache.discard(&path));

    parser.parse_file(&path).unwrap();
    cache.clear();
    assert!(cache.is_empty());
}
