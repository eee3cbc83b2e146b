//! Integration tests for the `serde` feature
//!
//! Variable snapshots written as JSON, as a tool would persist them.

use std::path::PathBuf;
use std::sync::Arc;

use proreader_foundation::{Location, ValueList, ValueMap};

#[test]
fn value_list_is_a_json_array_in_order() {
    let list: ValueList = ["main.cpp", "a.cpp", "main.cpp"].into_iter().collect();
    let json = serde_json::to_string(&list).unwrap();
    assert_eq!(json, r#"["main.cpp","a.cpp","main.cpp"]"#);
}

#[test]
fn value_map_snapshot_restores() {
    let mut map = ValueMap::new();
    map.insert("SOURCES", ["main.cpp", "util.cpp"].into_iter().collect());
    map.insert("EMPTY", ValueList::new());
    map.entry("CONFIG").push("flat");

    let json = serde_json::to_string(&map).unwrap();
    let restored: ValueMap = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, map);
    assert!(restored.contains("EMPTY"));
    assert_eq!(restored.get("CONFIG").map(|v| v.to_vec()), Some(vec!["flat".to_string()]));
}

#[test]
fn location_serializes_file_and_line() {
    let location = Location::new(Arc::new(PathBuf::from("/src/app.pro")), 12);
    let value = serde_json::to_value(&location).unwrap();
    assert_eq!(value["line"], 12);
    assert_eq!(value["file"], "/src/app.pro");
}
