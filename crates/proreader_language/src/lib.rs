//! Lexer, parser, parse cache and evaluator for qmake project files.
//!
//! This crate provides:
//! - [`Lexer`] - Context-sensitive tokenization of project source
//! - [`Parser`] - Parsing tokens into a flat [`Opcode`] stream
//! - [`ParseCache`] - Token streams shared between evaluators
//! - [`Evaluator`] - Runs token streams against a variable scope
//! - [`Globals`] - Reader-wide configuration (spec, properties, environment)
//! - [`MessageHandler`] - Sink for diagnostics and project output

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod evaluator;
pub mod globals;
pub mod handler;
pub mod ioutils;
pub mod lexer;
pub mod opcode;
pub mod parser;
pub mod token;


pub use cache::{CacheStats, ParseCache};
pub use evaluator::{Evaluator, Flow, FunctionDef, FunctionDefs, LoadFlags, ScopeStack, VisitReturn};
pub use globals::{ArgumentError, EvalLimits, Globals};
pub use handler::{
    CollectingHandler, Diagnostic, EvalFileType, FileMessageKind, MessageHandler, MessageKind, NullHandler,
};
pub use lexer::Lexer;
pub use opcode::{Opcode, ProFile, TokenStream};
pub use parser::{Parser, TEXT_IDENTITY, parse};
pub use token::{AssignOp, Span, Token, TokenKind};

pub use proreader_foundation::{Error, ErrorKind, Location, Result, ValueList, ValueMap};
