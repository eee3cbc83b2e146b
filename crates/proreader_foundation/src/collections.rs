//! Variable maps with structural sharing.
//!
//! A [`ValueMap`] is a thin wrapper around `im::HashMap`, so cloning a whole
//! frame (for `include(file, into)` or `fromfile()`) is O(1) and later edits
//! only copy the touched nodes.

use std::fmt;
use std::iter::FromIterator;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::ValueList;

/// Mapping from variable name to its value list.
///
/// Reading an absent variable is not an error; callers get `None` and treat it
/// as an empty list.
#[derive(Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValueMap(im::HashMap<String, ValueList>);

impl ValueMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(im::HashMap::new())
    }

    /// Returns the number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no variable is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Gets the values of a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ValueList> {
        self.0.get(name)
    }

    /// Gets a mutable reference to the values of a variable.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ValueList> {
        self.0.get_mut(name)
    }

    /// Returns the values of a variable, creating an empty binding first if needed.
    pub fn entry(&mut self, name: &str) -> &mut ValueList {
        self.0.entry(name.to_string()).or_default()
    }

    /// Returns true if the variable is bound (even to an empty list).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Binds a variable, returning the previous values.
    pub fn insert(&mut self, name: impl Into<String>, values: ValueList) -> Option<ValueList> {
        self.0.insert(name.into(), values)
    }

    /// Removes a variable, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<ValueList> {
        self.0.remove(name)
    }

    /// Returns an iterator over bindings in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValueList)> {
        self.0.iter()
    }

    /// Returns the variable names sorted, for deterministic output.
    #[must_use]
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ValueMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in self.sorted_names() {
            map.entry(&name, &self.0[name]);
        }
        map.finish()
    }
}

impl<K: Into<String>> FromIterator<(K, ValueList)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, ValueList)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
