//! proreader - qmake project file reader
//!
//! This crate re-exports all layers of the proreader system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: proreader_runtime    - Project data extractor, XML report, CLI
//! Layer 1: proreader_language   - Lexer, parser, token stream cache, evaluator
//! Layer 0: proreader_foundation - Core types (ValueList, Location, Error)
//! ```

pub use proreader_foundation as foundation;
pub use proreader_language as language;
pub use proreader_runtime as runtime;
