//! Integration tests across all layers
//!
//! Tests complete multi-file projects from source on disk to the XML report.

mod projects;
mod shadow_build;
