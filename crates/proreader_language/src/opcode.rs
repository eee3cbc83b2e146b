//! Token stream instruction set.
//!
//! A parsed file is a flat sequence of [`Opcode`]s. Word pieces are pushed
//! into the current expression; the statement opcode that follows them
//! (`Assign`, `Condition`, `TestCall`, `Return`, ...) consumes it. Blocks are
//! stored inline and skipped by length, so the evaluator never allocates a
//! tree.
//!
//! Layouts:
//!
//! ```text
//! assignment   <lhs pieces> Assign(op) <rhs pieces> ValueTerminator
//! condition    <pieces> Condition
//! test call    TestCall(name) <arg> ArgSeparator <arg> ... FuncTerminator
//! branch       Branch{then_len, else_len} <then ops> <else ops>
//! for loop     ForLoop{var, expr_len, body_len} <expr pieces> <body ops>
//! definition   FunctionDef{kind, name, body_len} <body ops>
//! return       <pieces> Return
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use proreader_foundation::{FunctionKind, Interner, StrId};

use crate::token::AssignOp;

/// A single token stream instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    // === Markers ===
    /// Source line of the statement that follows.
    Line(u32),

    // === Word pieces ===
    /// Literal text appended to the current word.
    Literal(StrId),
    /// `$$NAME`; `joined` when inside quotes.
    Variable {
        /// Variable name.
        name: StrId,
        /// Join the values with a space into one word.
        joined: bool,
    },
    /// `$$[NAME]`
    Property {
        /// Property name, possibly with a `/get`-style suffix.
        name: StrId,
        /// Inside quotes.
        joined: bool,
    },
    /// `$$(NAME)`
    Environment {
        /// Environment variable name.
        name: StrId,
        /// Inside quotes.
        joined: bool,
    },
    /// `$$name(args)`; arguments follow, closed by `FuncTerminator`.
    FuncCall {
        /// Function name.
        name: StrId,
        /// Inside quotes.
        joined: bool,
    },
    /// Starts a new word for the next piece.
    WordBreak,

    // === Calls ===
    /// `name(args)` in condition position.
    TestCall(StrId),
    /// Separates two call arguments.
    ArgSeparator,
    /// Ends a call's argument list.
    FuncTerminator,

    // === Statements ===
    /// Assignment; the left hand side precedes it, the value follows.
    Assign(AssignOp),
    /// Ends an assignment value.
    ValueTerminator,
    /// Tests the current expression as a config word.
    Condition,
    /// `!` negates the next term.
    Not,
    /// `:` between terms.
    And,
    /// `|` between terms.
    Or,
    /// Conditional block; taken when the pending condition holds.
    Branch {
        /// Number of opcodes in the then-block.
        then_len: usize,
        /// Number of opcodes in the else-block.
        else_len: usize,
    },
    /// `for(var, expr)`; `var` is empty for `for(ever)`.
    ForLoop {
        /// Loop variable name.
        var: StrId,
        /// Number of opcodes in the list expression.
        expr_len: usize,
        /// Number of opcodes in the body.
        body_len: usize,
    },
    /// `defineTest(name)` or `defineReplace(name)`.
    FunctionDef {
        /// Test or replace function.
        kind: FunctionKind,
        /// Function name.
        name: StrId,
        /// Number of opcodes in the body.
        body_len: usize,
    },
    /// `return(expr)`; the value precedes it.
    Return,
    /// `break()`
    Break,
    /// `next()`
    Next,
}

/// A sequence of opcodes plus the strings they refer to.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenStream {
    /// The instructions.
    pub ops: Vec<Opcode>,
    /// Literal and name table.
    pub strings: Interner,
}

impl TokenStream {
    /// Creates an empty token stream.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, op: Opcode) -> usize {
        let idx = self.ops.len();
        self.ops.push(op);
        idx
    }

    /// Adds a sequence of instructions.
    pub fn extend(&mut self, ops: impl IntoIterator<Item = Opcode>) {
        self.ops.extend(ops);
    }

    /// Interns a string into this stream's table.
    pub fn intern(&mut self, s: &str) -> StrId {
        self.strings.intern(s)
    }

    /// Resolves an interned string.
    #[must_use]
    pub fn string(&self, id: StrId) -> &str {
        self.strings.resolve(id)
    }

    /// Returns the current instruction count (next instruction index).
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if there are no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Closes the then-block of the branch at `idx` at the current end.
    ///
    /// # Panics
    /// Panics if the instruction at `idx` is not a branch.
    pub fn patch_then(&mut self, idx: usize) {
        let end = self.ops.len();
        match &mut self.ops[idx] {
            Opcode::Branch { then_len, .. } => *then_len = end - idx - 1,
            other => panic!("Cannot patch non-branch instruction: {other:?}"),
        }
    }

    /// Extends the else-block of the branch at `idx` to the current end.
    ///
    /// # Panics
    /// Panics if the instruction at `idx` is not a branch.
    pub fn patch_else(&mut self, idx: usize) {
        let end = self.ops.len();
        match &mut self.ops[idx] {
            Opcode::Branch { then_len, else_len } => *else_len = end - idx - 1 - *then_len,
            other => panic!("Cannot patch non-branch instruction: {other:?}"),
        }
    }

    /// Returns the index just past the then-block of the branch at `idx`.
    #[must_use]
    pub fn else_start(&self, idx: usize) -> Option<usize> {
        match self.ops.get(idx) {
            Some(Opcode::Branch { then_len, .. }) => Some(idx + 1 + then_len),
            _ => None,
        }
    }

    /// Closes the body of the loop or definition at `idx` at the current end.
    ///
    /// # Panics
    /// Panics if the instruction at `idx` has no body.
    pub fn patch_body(&mut self, idx: usize) {
        let end = self.ops.len();
        match &mut self.ops[idx] {
            Opcode::ForLoop {
                expr_len, body_len, ..
            } => *body_len = end - idx - 1 - *expr_len,
            Opcode::FunctionDef { body_len, .. } => *body_len = end - idx - 1,
            other => panic!("Cannot patch instruction without a body: {other:?}"),
        }
    }
}

/// A parsed project file: its identity and its token stream.
#[derive(Debug, PartialEq, Eq)]
pub struct ProFile {
    path: Arc<PathBuf>,
    directory: PathBuf,
    stream: TokenStream,
}

impl ProFile {
    /// Creates a parsed file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, stream: TokenStream) -> Self {
        let path: PathBuf = path.into();
        let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path: Arc::new(path),
            directory,
            stream,
        }
    }

    /// The file's path (or identity for parsed text).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Shared handle to the path, for locations.
    #[must_use]
    pub fn path_arc(&self) -> &Arc<PathBuf> {
        &self.path
    }

    /// Directory containing the file.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The instructions.
    #[must_use]
    pub fn ops(&self) -> &[Opcode] {
        &self.stream.ops
    }

    /// The token stream.
    #[must_use]
    pub fn stream(&self) -> &TokenStream {
        &self.stream
    }

    /// Resolves an interned string.
    #[must_use]
    pub fn string(&self, id: StrId) -> &str {
        self.stream.string(id)
    }
}
