//! Token types for the qmake project language.
//!
//! Tokens are the output of the lexer and input to the parser. The lexer is
//! context sensitive (condition, value and argument contexts), so the same
//! character may produce different tokens depending on where it appears.

use std::fmt;

/// A span of source text.
///
/// Tracks byte offsets and line/column positions for error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset where this span starts.
    pub start: usize,
    /// Byte offset where this span ends (exclusive).
    pub end: usize,
    /// 1-based line number where this span starts.
    pub line: u32,
    /// 1-based column number where this span starts.
    pub column: u32,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Returns the text this span covers in the given source.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }
}

/// A token from lexical analysis.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The type and value of this token.
    pub kind: TokenKind,
    /// Source location of this token.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this token is part of a word (text or expansion).
    #[must_use]
    pub const fn is_word_piece(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Text(_)
                | TokenKind::Quote
                | TokenKind::Variable(_)
                | TokenKind::Property(_)
                | TokenKind::Environment(_)
                | TokenKind::Function(_)
        )
    }

    /// Returns true if this token ends a logical line.
    #[must_use]
    pub const fn is_line_end(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::Eof)
    }
}

/// The five assignment operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignOp {
    /// `=` replaces the value.
    Set,
    /// `+=` appends.
    Append,
    /// `*=` appends values not yet present.
    AppendUnique,
    /// `-=` removes every occurrence.
    Remove,
    /// `~=` applies a `s/re/repl/` substitution.
    Replace,
}

impl AssignOp {
    /// Returns the operator as written in source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "=",
            Self::Append => "+=",
            Self::AppendUnique => "*=",
            Self::Remove => "-=",
            Self::Replace => "~=",
        }
    }

    /// Maps the character before `=` to an operator.
    #[must_use]
    pub const fn from_prefix(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Append),
            '*' => Some(Self::AppendUnique),
            '-' => Some(Self::Remove),
            '~' => Some(Self::Replace),
            _ => None,
        }
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token types for the qmake project language.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Word pieces
    /// A run of literal text, with escapes already resolved.
    Text(String),
    /// An opening or closing quote (the lexer tracks which).
    Quote,
    /// `$$NAME` or `$${NAME}`
    Variable(String),
    /// `$$[NAME]`
    Property(String),
    /// `$$(NAME)`
    Environment(String),
    /// `$$NAME(`, the opening parenthesis is consumed.
    Function(String),

    // Calls
    /// `NAME(` at the start of a condition term.
    Call(String),
    /// `,` separating call arguments.
    Comma,
    /// `)` closing a call.
    RParen,

    // Statement structure
    /// A run of blanks (or a line continuation).
    Space,
    /// `:`
    Colon,
    /// `|`
    Pipe,
    /// `!` at the start of a condition term.
    Bang,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// An assignment operator.
    Assign(AssignOp),
    /// End of a logical line.
    Newline,

    // Special
    /// End of input.
    Eof,
    /// Lexer error.
    Error(String),
}

impl TokenKind {
    /// Returns a short description for error messages.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Text(text) => format!("'{text}'"),
            Self::Quote => "quote".to_string(),
            Self::Variable(name) => format!("$${name}"),
            Self::Property(name) => format!("$$[{name}]"),
            Self::Environment(name) => format!("$$({name})"),
            Self::Function(name) => format!("$${name}("),
            Self::Call(name) => format!("{name}("),
            Self::Comma => "','".to_string(),
            Self::RParen => "')'".to_string(),
            Self::Space => "whitespace".to_string(),
            Self::Colon => "':'".to_string(),
            Self::Pipe => "'|'".to_string(),
            Self::Bang => "'!'".to_string(),
            Self::LBrace => "'{'".to_string(),
            Self::RBrace => "'}'".to_string(),
            Self::Assign(op) => format!("'{op}'"),
            Self::Newline => "end of line".to_string(),
            Self::Eof => "end of file".to_string(),
            Self::Error(msg) => msg.clone(),
        }
    }
}
