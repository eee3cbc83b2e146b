//! Core types for proreader.
//!
//! This crate provides:
//! - [`ValueList`] - An ordered list of strings, qmake's only aggregate type
//! - [`ValueMap`] - Variable name to value list, with cheap snapshots
//! - [`Interner`] - String interning for token streams
//! - [`Location`] - (file, line) pairs for diagnostics
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod collections;
mod error;
mod intern;
mod location;
mod value;

pub use collections::ValueMap;
pub use error::{Error, ErrorContext, ErrorKind, EvalLimit, FunctionKind};
pub use intern::{Interner, StrId};
pub use location::Location;
pub use value::ValueList;

/// Result type alias using the proreader Error type.
pub type Result<T> = std::result::Result<T, Error>;
