//! Parser for the qmake project language.
//!
//! The parser reads tokens from the [`Lexer`] and emits a flat
//! [`TokenStream`] (see [`crate::opcode`] for the layouts). It fails fast:
//! the first syntax error aborts the file.
//!
//! [`Parser`] is the file-level entry point and consults a shared
//! [`ParseCache`] when it has one.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use proreader_foundation::{Error, FunctionKind, Result, StrId};
use tracing::debug;

use crate::cache::ParseCache;
use crate::ioutils;
use crate::lexer::Lexer;
use crate::opcode::{Opcode, ProFile, TokenStream};
use crate::token::{Token, TokenKind};

/// Identity used for text parsed without a file.
pub const TEXT_IDENTITY: &str = "(text)";

/// Parses project-file text into a token stream.
///
/// # Errors
/// Returns a parse error for the first syntax error found.
pub fn parse(source: &str) -> Result<TokenStream> {
    parse_source(source, Path::new(TEXT_IDENTITY), 1)
}

fn parse_source(source: &str, file: &Path, line: u32) -> Result<TokenStream> {
    StatementParser::new(source, file, line).parse_file()
}

/// File-level parser with optional caching.
#[derive(Clone, Debug, Default)]
pub struct Parser {
    cache: Option<Arc<ParseCache>>,
}

impl Parser {
    /// Creates a parser without a cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser that shares `cache`.
    #[must_use]
    pub fn with_cache(cache: Arc<ParseCache>) -> Self {
        Self { cache: Some(cache) }
    }

    /// Returns the shared cache, if any.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ParseCache>> {
        self.cache.as_ref()
    }

    /// Reads and parses the file at `path`.
    ///
    /// A cached token stream is returned when the file's modification time
    /// has not changed since it was parsed.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be read, or a parse error.
    pub fn parse_file(&self, path: &Path) -> Result<Arc<ProFile>> {
        let modified = ioutils::modified_time(path);
        if let Some(cache) = &self.cache {
            if let Some(file) = cache.lookup(path, modified) {
                return Ok(file);
            }
        }

        let bytes = fs::read(path).map_err(|e| Error::io(path, &e))?;
        let text = String::from_utf8_lossy(&bytes);
        let stream = parse_source(&text, path, 1)?;
        debug!(path = %path.display(), ops = stream.len(), "parsed project file");

        let file = Arc::new(ProFile::new(path, stream));
        if let Some(cache) = &self.cache {
            cache.insert(path, modified, Arc::clone(&file));
        }
        Ok(file)
    }

    /// Parses `text` as if it appeared in `identity` at `line`.
    ///
    /// Used for `eval()`, `if()` and command-line assignments. Never cached.
    ///
    /// # Errors
    /// Returns a parse error.
    pub fn parse_text(&self, text: &str, identity: &Path, line: u32) -> Result<Arc<ProFile>> {
        let stream = parse_source(text, identity, line)?;
        Ok(Arc::new(ProFile::new(identity, stream)))
    }
}

/// Names handled by the parser rather than dispatched as test calls.
fn is_statement_keyword(name: &str) -> bool {
    matches!(
        name,
        "for" | "defineTest" | "defineReplace" | "return" | "break" | "next"
    )
}

struct StatementParser<'src> {
    lexer: Lexer<'src>,
    current: Token,
    file: &'src Path,
    out: TokenStream,
    /// Branches whose else-block ends at the current end of the stream, so a
    /// following `else` may extend them. Innermost last.
    else_chain: Vec<usize>,
}

impl<'src> StatementParser<'src> {
    fn new(source: &'src str, file: &'src Path, line: u32) -> Self {
        let mut lexer = Lexer::with_line(source, line);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            file,
            out: TokenStream::new(),
            else_chain: Vec::new(),
        }
    }

    fn parse_file(mut self) -> Result<TokenStream> {
        self.parse_block(false)?;
        Ok(self.out)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Parses statements until end of input, or until the closing brace when
    /// `braced`.
    fn parse_block(&mut self, braced: bool) -> Result<()> {
        self.else_chain.clear();
        loop {
            self.skip_blank_lines();
            match &self.current.kind {
                TokenKind::Eof if braced => return Err(self.error("Missing closing brace")),
                TokenKind::Eof => return Ok(()),
                TokenKind::RBrace if braced => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::RBrace => return Err(self.error("Excess closing brace")),
                _ => {
                    let chain = self.parse_statement()?;
                    self.else_chain = chain;
                }
            }
        }
    }

    /// Parses one statement and returns the branches a following `else`
    /// would attach to.
    fn parse_statement(&mut self) -> Result<Vec<usize>> {
        if matches!(&self.current.kind, TokenKind::Text(t) if t == "else") {
            return self.parse_else();
        }

        self.out.emit(Opcode::Line(self.current.span.line));
        let mut has_cond = false;
        let mut after_term = false;

        loop {
            self.skip_spaces();
            if after_term && (self.current.is_word_piece() || matches!(self.current.kind, TokenKind::Call(_) | TokenKind::Bang)) {
                return Err(self.error("Extra characters after test expression"));
            }

            match &self.current.kind {
                TokenKind::Bang => {
                    self.advance();
                    self.out.emit(Opcode::Not);
                }
                TokenKind::Call(name) if is_statement_keyword(name) => {
                    let name = name.clone();
                    let branch = self.open_branch(has_cond);
                    self.parse_keyword_statement(&name)?;
                    return Ok(self.close_branch(branch));
                }
                TokenKind::Call(name) => {
                    let id = self.out.intern(name);
                    self.advance();
                    let args = self.parse_arg_list()?;
                    let mut ops = vec![Opcode::TestCall(id)];
                    push_call_args(&mut ops, args);
                    self.out.extend(ops);
                    has_cond = true;
                    after_term = true;
                }
                _ if self.current.is_word_piece() => {
                    let mut word = Vec::new();
                    self.parse_word(&mut word)?;
                    self.skip_spaces();
                    if let TokenKind::Assign(op) = self.current.kind {
                        let branch = self.open_branch(has_cond);
                        self.advance();
                        self.out.extend(word);
                        self.out.emit(Opcode::Assign(op));
                        self.parse_value()?;
                        self.out.emit(Opcode::ValueTerminator);
                        return Ok(self.close_branch(branch));
                    }
                    self.out.extend(word);
                    self.out.emit(Opcode::Condition);
                    has_cond = true;
                    after_term = true;
                }
                TokenKind::Colon | TokenKind::Pipe if has_cond && after_term => {
                    let op = if self.current.kind == TokenKind::Colon {
                        Opcode::And
                    } else {
                        Opcode::Or
                    };
                    self.advance();
                    self.out.emit(op);
                    after_term = false;
                }
                TokenKind::LBrace if has_cond => {
                    self.advance();
                    let branch = self.open_branch(true);
                    self.parse_block(true)?;
                    return Ok(self.close_branch(branch));
                }
                TokenKind::Assign(_) => {
                    return Err(self.error("Assignment needs exactly one word on the left hand side"));
                }
                TokenKind::Newline | TokenKind::Eof | TokenKind::RBrace => {
                    return Ok(Vec::new());
                }
                TokenKind::Error(msg) => return Err(self.error(msg)),
                other => {
                    return Err(self.error(&format!("Unexpected {}", other.describe())));
                }
            }
        }
    }

    fn parse_else(&mut self) -> Result<Vec<usize>> {
        let chain = std::mem::take(&mut self.else_chain);
        if chain.is_empty() {
            return Err(self.error("Unexpected 'else'"));
        }
        self.advance();
        self.skip_spaces();

        let inner = match self.current.kind {
            TokenKind::LBrace => {
                self.advance();
                self.parse_block(true)?;
                Vec::new()
            }
            TokenKind::Colon => {
                self.advance();
                self.skip_spaces();
                if self.current.is_line_end() {
                    return Err(self.error("Missing statement after 'else:'"));
                }
                self.parse_statement()?
            }
            _ => return Err(self.error("Unexpected 'else'")),
        };

        for &branch in &chain {
            self.out.patch_else(branch);
        }
        if inner.is_empty() {
            Ok(Vec::new())
        } else {
            let mut chain = chain;
            chain.extend(inner);
            Ok(chain)
        }
    }

    fn parse_keyword_statement(&mut self, name: &str) -> Result<()> {
        self.advance();
        let args = self.parse_arg_list()?;
        match name {
            "for" => self.parse_for(args),
            "defineTest" => self.parse_definition(FunctionKind::Test, name, args),
            "defineReplace" => self.parse_definition(FunctionKind::Replace, name, args),
            "return" => {
                if args.len() > 1 {
                    return Err(self.error("return() requires zero or one argument"));
                }
                if let Some(value) = args.into_iter().next() {
                    self.out.extend(value);
                }
                self.out.emit(Opcode::Return);
                Ok(())
            }
            _ => {
                if !args.is_empty() {
                    return Err(self.error(&format!("{name}() requires zero arguments")));
                }
                self.out.emit(if name == "break" {
                    Opcode::Break
                } else {
                    Opcode::Next
                });
                Ok(())
            }
        }
    }

    fn parse_for(&mut self, mut args: Vec<Vec<Opcode>>) -> Result<()> {
        let (var, expr) = match args.len() {
            1 => (StrId::EMPTY, args.remove(0)),
            2 => {
                let expr = args.remove(1);
                let Some(var) = single_literal(&args[0]) else {
                    return Err(self.error("The first argument of a for() header must be a literal"));
                };
                (var, expr)
            }
            _ => {
                return Err(self.error(
                    "Syntax is for(var, list), for(var, forever) or for(ever)",
                ));
            }
        };

        let idx = self.out.emit(Opcode::ForLoop {
            var,
            expr_len: expr.len(),
            body_len: 0,
        });
        self.out.extend(expr);
        self.parse_body("for()")?;
        self.out.patch_body(idx);
        Ok(())
    }

    fn parse_definition(&mut self, kind: FunctionKind, what: &str, args: Vec<Vec<Opcode>>) -> Result<()> {
        let name = match args.as_slice() {
            [arg] => single_literal(arg),
            _ => None,
        };
        let Some(name) = name else {
            return Err(self.error(&format!("{what}(function) requires one literal argument")));
        };

        let idx = self.out.emit(Opcode::FunctionDef {
            kind,
            name,
            body_len: 0,
        });
        self.parse_body(what)?;
        self.out.patch_body(idx);
        Ok(())
    }

    /// Parses `{ block }` or `: statement` after a loop or definition header.
    fn parse_body(&mut self, what: &str) -> Result<()> {
        self.skip_spaces();
        match self.current.kind {
            TokenKind::LBrace => {
                self.advance();
                self.parse_block(true)
            }
            TokenKind::Colon => {
                self.advance();
                self.skip_spaces();
                if self.current.is_line_end() {
                    return Err(self.error(&format!("Missing body for {what}")));
                }
                self.parse_statement()?;
                self.else_chain.clear();
                Ok(())
            }
            _ => Err(self.error(&format!("Missing body for {what}"))),
        }
    }

    fn open_branch(&mut self, has_cond: bool) -> Option<usize> {
        has_cond.then(|| {
            self.out.emit(Opcode::Branch {
                then_len: 0,
                else_len: 0,
            })
        })
    }

    fn close_branch(&mut self, branch: Option<usize>) -> Vec<usize> {
        match branch {
            Some(idx) => {
                self.out.patch_then(idx);
                vec![idx]
            }
            None => Vec::new(),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Parses an assignment value up to the end of the line or a closing brace.
    fn parse_value(&mut self) -> Result<()> {
        let mut ops = Vec::new();
        loop {
            match &self.current.kind {
                TokenKind::Newline | TokenKind::Eof | TokenKind::RBrace => break,
                TokenKind::Space => {
                    self.advance();
                    push_word_break(&mut ops);
                }
                TokenKind::Error(msg) => return Err(self.error(msg)),
                _ if self.current.is_word_piece() => self.parse_piece(&mut ops, false)?,
                other => {
                    return Err(self.error(&format!("Unexpected {}", other.describe())));
                }
            }
        }
        trim_word_break(&mut ops);
        self.out.extend(ops);
        Ok(())
    }

    /// Parses one word: adjacent pieces with no blank between them.
    fn parse_word(&mut self, ops: &mut Vec<Opcode>) -> Result<()> {
        while self.current.is_word_piece() {
            self.parse_piece(ops, false)?;
        }
        Ok(())
    }

    fn parse_piece(&mut self, ops: &mut Vec<Opcode>, joined: bool) -> Result<()> {
        let kind = self.current.kind.clone();
        match kind {
            TokenKind::Text(text) => {
                self.advance();
                let id = self.out.intern(&text);
                ops.push(Opcode::Literal(id));
            }
            TokenKind::Quote => {
                self.advance();
                ops.push(Opcode::Literal(StrId::EMPTY));
                loop {
                    match &self.current.kind {
                        TokenKind::Quote => {
                            self.advance();
                            break;
                        }
                        TokenKind::Error(msg) => return Err(self.error(msg)),
                        _ if self.current.is_word_piece() => self.parse_piece(ops, true)?,
                        _ => return Err(self.error("Missing closing quote")),
                    }
                }
            }
            TokenKind::Variable(name) => {
                self.advance();
                let name = self.out.intern(&name);
                ops.push(Opcode::Variable { name, joined });
            }
            TokenKind::Property(name) => {
                self.advance();
                let name = self.out.intern(&name);
                ops.push(Opcode::Property { name, joined });
            }
            TokenKind::Environment(name) => {
                self.advance();
                let name = self.out.intern(&name);
                ops.push(Opcode::Environment { name, joined });
            }
            TokenKind::Function(name) => {
                self.advance();
                let name = self.out.intern(&name);
                let args = self.parse_arg_list()?;
                ops.push(Opcode::FuncCall { name, joined });
                push_call_args(ops, args);
            }
            TokenKind::Error(msg) => return Err(self.error(&msg)),
            other => {
                return Err(self.error(&format!("Unexpected {}", other.describe())));
            }
        }
        Ok(())
    }

    /// Parses call arguments after the opening parenthesis, through the
    /// closing one. `f()` has no arguments; `f(,)` has two empty ones.
    fn parse_arg_list(&mut self) -> Result<Vec<Vec<Opcode>>> {
        let mut args = Vec::new();
        let mut current = Vec::new();
        let mut separated = false;
        loop {
            match &self.current.kind {
                TokenKind::RParen => {
                    self.advance();
                    trim_word_break(&mut current);
                    if separated || !current.is_empty() {
                        args.push(current);
                    }
                    return Ok(args);
                }
                TokenKind::Comma => {
                    self.advance();
                    trim_word_break(&mut current);
                    args.push(std::mem::take(&mut current));
                    separated = true;
                }
                TokenKind::Space => {
                    self.advance();
                    push_word_break(&mut current);
                }
                TokenKind::Newline | TokenKind::Eof => {
                    return Err(self.error("Missing closing parenthesis in function call"));
                }
                TokenKind::Error(msg) => return Err(self.error(msg)),
                _ if self.current.is_word_piece() => self.parse_piece(&mut current, false)?,
                other => {
                    return Err(self.error(&format!("Unexpected {} in argument list", other.describe())));
                }
            }
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn skip_spaces(&mut self) {
        while self.current.kind == TokenKind::Space {
            self.advance();
        }
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.current.kind, TokenKind::Space | TokenKind::Newline) {
            self.advance();
        }
    }

    fn advance(&mut self) {
        self.current = self.lexer.next_token();
    }

    /// Creates a parse error at the current position.
    fn error(&self, message: &str) -> Error {
        let span = self.current.span;
        Error::parse(self.file, span.line, span.column, message)
    }
}

fn push_word_break(ops: &mut Vec<Opcode>) {
    if !ops.is_empty() && ops.last() != Some(&Opcode::WordBreak) {
        ops.push(Opcode::WordBreak);
    }
}

fn trim_word_break(ops: &mut Vec<Opcode>) {
    if ops.last() == Some(&Opcode::WordBreak) {
        ops.pop();
    }
}

fn push_call_args(ops: &mut Vec<Opcode>, args: Vec<Vec<Opcode>>) {
    for (i, arg) in args.into_iter().enumerate() {
        if i > 0 {
            ops.push(Opcode::ArgSeparator);
        }
        ops.extend(arg);
    }
    ops.push(Opcode::FuncTerminator);
}

fn single_literal(ops: &[Opcode]) -> Option<StrId> {
    match ops {
        [Opcode::Literal(id)] if *id != StrId::EMPTY => Some(*id),
        _ => None,
    }
}
