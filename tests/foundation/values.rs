//! Integration tests for ValueList and Location
//!
//! Tests list operations behind the assignment operators.

use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;
use proreader_foundation::{Location, ValueList};

// =============================================================================
// Construction
// =============================================================================

#[test]
fn list_construction() {
    assert!(ValueList::new().is_empty());
    assert_eq!(ValueList::single("a"), ["a"]);
    assert_eq!(ValueList::from(["a", "b"]).len(), 2);
    let collected: ValueList = ["x", "y"].into_iter().collect();
    assert_eq!(collected, ["x", "y"]);
}

#[test]
fn list_display_and_join() {
    let list = ValueList::from(["a", "b", "c"]);
    assert_eq!(format!("{list}"), "a b c");
    assert_eq!(list.join(","), "a,b,c");
}

// =============================================================================
// Operators
// =============================================================================

#[test]
fn append_keeps_duplicates() {
    let mut list = ValueList::from(["a"]);
    list.append(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(list, ["a", "a", "b"]);
}

#[test]
fn append_unique_only_adds_missing() {
    let mut list = ValueList::from(["a", "b"]);
    list.append_unique(vec!["b".to_string(), "c".to_string(), "c".to_string()]);
    assert_eq!(list, ["a", "b", "c"]);
}

#[test]
fn remove_all_occurrences() {
    let mut list = ValueList::from(["a", "b", "a", "c"]);
    list.remove_all(&["a".to_string()]);
    assert_eq!(list, ["b", "c"]);
}

#[test]
fn take_first_and_last() {
    let mut list = ValueList::from(["a", "b", "c"]);
    assert_eq!(list.take_first().as_deref(), Some("a"));
    assert_eq!(list.take_last().as_deref(), Some("c"));
    assert_eq!(list, ["b"]);
    list.clear();
    assert_eq!(list.take_first(), None);
}

#[test]
fn sort_and_reverse() {
    let mut list = ValueList::from(["b", "c", "a"]);
    list.sort();
    assert_eq!(list, ["a", "b", "c"]);
    list.reverse();
    assert_eq!(list, ["c", "b", "a"]);
}

// =============================================================================
// Location
// =============================================================================

#[test]
fn location_display() {
    let file = Arc::new(PathBuf::from("/p/app.pro"));
    assert_eq!(Location::new(Arc::clone(&file), 3).to_string(), "/p/app.pro:3");
    assert_eq!(Location::new(file, 0).to_string(), "/p/app.pro");
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn remove_duplicates_is_idempotent_and_order_preserving(items in prop::collection::vec("[a-d]", 0..20)) {
        let mut list: ValueList = items.iter().cloned().collect();
        list.remove_duplicates();
        let once = list.clone();
        list.remove_duplicates();
        prop_assert_eq!(&list, &once);

        let mut expected: Vec<String> = Vec::new();
        for item in &items {
            if !expected.contains(item) {
                expected.push(item.clone());
            }
        }
        prop_assert_eq!(list.into_vec(), expected);
    }

    #[test]
    fn remove_all_leaves_no_removed_value(
        items in prop::collection::vec("[a-d]", 0..20),
        removed in prop::collection::vec("[a-d]", 0..4),
    ) {
        let mut list: ValueList = items.into_iter().collect();
        list.remove_all(&removed);
        prop_assert!(list.iter().all(|v| !removed.contains(v)));
    }
}
