//! User-defined function table.

use std::sync::Arc;

use proreader_foundation::FunctionKind;

use crate::opcode::ProFile;

/// Where a user function's body lives.
#[derive(Clone, Debug)]
pub struct FunctionDef {
    file: Arc<ProFile>,
    start: usize,
    len: usize,
}

impl FunctionDef {
    /// A body of `len` opcodes starting at `start` in `file`.
    #[must_use]
    pub fn new(file: Arc<ProFile>, start: usize, len: usize) -> Self {
        Self { file, start, len }
    }

    /// The file holding the body.
    #[must_use]
    pub fn file(&self) -> &Arc<ProFile> {
        &self.file
    }

    /// First opcode of the body.
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last opcode of the body.
    #[must_use]
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Test and replace functions defined by project code.
///
/// Backed by `im` maps so auxiliary evaluators can start from a cheap copy.
#[derive(Clone, Debug, Default)]
pub struct FunctionDefs {
    test: im::HashMap<String, FunctionDef>,
    replace: im::HashMap<String, FunctionDef>,
}

impl FunctionDefs {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: FunctionKind) -> &im::HashMap<String, FunctionDef> {
        match kind {
            FunctionKind::Test => &self.test,
            FunctionKind::Replace => &self.replace,
        }
    }

    /// Defines or redefines a function.
    pub fn define(&mut self, kind: FunctionKind, name: &str, def: FunctionDef) {
        let table = match kind {
            FunctionKind::Test => &mut self.test,
            FunctionKind::Replace => &mut self.replace,
        };
        table.insert(name.to_string(), def);
    }

    /// Looks up a function.
    #[must_use]
    pub fn get(&self, kind: FunctionKind, name: &str) -> Option<&FunctionDef> {
        self.table(kind).get(name)
    }

    /// Returns true if a function of that kind is defined.
    #[must_use]
    pub fn contains(&self, kind: FunctionKind, name: &str) -> bool {
        self.table(kind).contains_key(name)
    }
}
