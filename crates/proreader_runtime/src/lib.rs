//! Project data extraction and reporting for proreader.
//!
//! This crate provides:
//! - [`ProjectReader`] - Reads one project's file lists and `flat` flag
//! - [`Report`] - The XML report printed by the `proreader` binary
//! - [`init_tracing`] - Logging setup for binaries and tests

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod logging;
mod reader;
mod report;

pub use logging::init_tracing;
pub use reader::ProjectReader;
pub use report::{Report, escape};
