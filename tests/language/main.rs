//! Integration tests for Layer 1: Language
//!
//! Tests for the lexer, parser, parse cache and evaluator.

mod cache;
mod evaluator;
mod lexer;
mod load;
