//! String interning for token streams.
//!
//! Every literal, variable name and function name in a parsed file is
//! interned once, and opcodes carry the small [`StrId`] instead of the text.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interned string identifier.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrId(pub(crate) usize);

impl StrId {
    /// The empty string, always interned at index 0.
    pub const EMPTY: StrId = StrId(0);

    /// Returns the raw index of this string.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrId({})", self.0)
    }
}

/// Maps strings to unique IDs and back.
///
/// Not thread-safe on its own; a finished interner is frozen inside an
/// immutable token stream and only read afterwards.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interner {
    /// String storage.
    strings: Vec<Arc<str>>,
    /// Map from string to index.
    string_to_index: HashMap<Arc<str>, usize>,
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Interner {
    /// Creates a new interner with the empty string pre-interned.
    #[must_use]
    pub fn new() -> Self {
        let mut interner = Self {
            strings: Vec::new(),
            string_to_index: HashMap::new(),
        };
        let empty = interner.intern("");
        debug_assert_eq!(empty, StrId::EMPTY);
        interner
    }

    /// Interns a string, returning its ID.
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(&idx) = self.string_to_index.get(s) {
            return StrId(idx);
        }

        let idx = self.strings.len();
        let text: Arc<str> = s.into();
        self.strings.push(Arc::clone(&text));
        self.string_to_index.insert(text, idx);
        StrId(idx)
    }

    /// Gets a string by its ID.
    #[must_use]
    pub fn get(&self, id: StrId) -> Option<&str> {
        self.strings.get(id.0).map(AsRef::as_ref)
    }

    /// Gets a string by its ID, yielding `""` for an unknown ID.
    #[must_use]
    pub fn resolve(&self, id: StrId) -> &str {
        self.get(id).unwrap_or("")
    }

    /// Returns the number of interned strings (including the empty string).
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if only the empty string is interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.len() <= 1
    }
}

impl PartialEq for Interner {
    fn eq(&self, other: &Self) -> bool {
        self.strings == other.strings
    }
}

impl Eq for Interner {}
