//! The value list, qmake's only aggregate type.

use std::fmt;
use std::ops::Deref;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered list of strings bound to a variable.
///
/// Element order is meaningful (file lists, flag order) and every operation
/// here preserves it unless its name says it sorts or dedups.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValueList(Vec<String>);

impl ValueList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Creates a list holding one value.
    #[must_use]
    pub fn single(value: impl Into<String>) -> Self {
        Self(vec![value.into()])
    }

    /// Appends a value.
    pub fn push(&mut self, value: impl Into<String>) {
        self.0.push(value.into());
    }

    /// Appends every value of `other`.
    pub fn append(&mut self, other: impl IntoIterator<Item = String>) {
        self.0.extend(other);
    }

    /// Appends each value of `other` that is not already present (`*=`).
    pub fn append_unique(&mut self, other: impl IntoIterator<Item = String>) {
        for value in other {
            if !self.0.contains(&value) {
                self.0.push(value);
            }
        }
    }

    /// Removes every occurrence of every value in `other` (`-=`).
    pub fn remove_all(&mut self, other: &[String]) {
        self.0.retain(|v| !other.contains(v));
    }

    /// Removes later duplicates, keeping the first occurrence of each value.
    pub fn remove_duplicates(&mut self) {
        let mut seen = std::collections::HashSet::with_capacity(self.0.len());
        self.0.retain(|v| seen.insert(v.clone()));
    }

    /// Removes and returns the first value.
    pub fn take_first(&mut self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.remove(0))
        }
    }

    /// Removes and returns the last value.
    pub fn take_last(&mut self) -> Option<String> {
        self.0.pop()
    }

    /// Removes all values.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Joins the values with a separator.
    #[must_use]
    pub fn join(&self, sep: &str) -> String {
        self.0.join(sep)
    }

    /// Returns true if any value equals `value`.
    #[must_use]
    pub fn contains_str(&self, value: &str) -> bool {
        self.0.iter().any(|v| v == value)
    }

    /// Mutable access to the values.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, String> {
        self.0.iter_mut()
    }

    /// Sorts the values lexicographically.
    pub fn sort(&mut self) {
        self.0.sort();
    }

    /// Reverses the order of the values.
    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    /// Consumes the list, returning the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for ValueList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Debug for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

impl fmt::Display for ValueList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl From<Vec<String>> for ValueList {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl<const N: usize> From<[&str; N]> for ValueList {
    fn from(values: [&str; N]) -> Self {
        Self(values.iter().map(|v| (*v).to_string()).collect())
    }
}

impl From<&[&str]> for ValueList {
    fn from(values: &[&str]) -> Self {
        Self(values.iter().map(|v| (*v).to_string()).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for ValueList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl IntoIterator for ValueList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValueList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl PartialEq<[&str]> for ValueList {
    fn eq(&self, other: &[&str]) -> bool {
        self.0.len() == other.len() && self.0.iter().zip(other).all(|(a, b)| a == b)
    }
}

impl<const N: usize> PartialEq<[&str; N]> for ValueList {
    fn eq(&self, other: &[&str; N]) -> bool {
        *self == other[..]
    }
}
