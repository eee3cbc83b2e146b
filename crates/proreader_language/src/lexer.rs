//! Lexer for the qmake project language.
//!
//! The lexer converts source text into a stream of tokens. qmake syntax is
//! context sensitive, so the lexer keeps a little state:
//!
//! - *condition* context at the start of a statement, where `:`, `|`, `!`,
//!   `{`, `}` and the assignment operators are punctuation,
//! - *value* context after an assignment operator, where only blanks,
//!   quotes, expansions and a block-closing `}` are special (braces opened
//!   inside the value, as in make's `${VAR}`, are text and nest),
//! - a stack of *argument* contexts for open calls, where `,` and `)` are
//!   punctuation and bare parentheses nest.
//!
//! A newline resets everything back to condition context.

use crate::token::{AssignOp, Span, Token, TokenKind};

/// Characters that a backslash escapes.
const ESCAPABLE: &[char] = &['[', ']', '{', '}', '(', ')', '$', '\\', '\'', '"'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Condition,
    Value,
}

/// An open call's argument list.
#[derive(Clone, Copy, Debug)]
struct ArgContext {
    /// Bare parentheses opened inside the arguments.
    depth: u32,
    /// Quote that was open when the call started, restored at `)`.
    outer_quote: Option<char>,
}

/// Lexer for qmake source text.
pub struct Lexer<'src> {
    /// Source text being tokenized.
    source: &'src str,
    /// Remaining source text.
    rest: &'src str,
    /// Current byte offset in source.
    position: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    column: u32,
    mode: Mode,
    args: Vec<ArgContext>,
    quote: Option<char>,
    /// Braces opened inside the current value.
    value_braces: u32,
    /// True when the previous token was part of a word.
    in_word: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    #[must_use]
    pub fn new(source: &'src str) -> Self {
        Self::with_line(source, 1)
    }

    /// Creates a lexer whose first line is numbered `line`.
    #[must_use]
    pub fn with_line(source: &'src str, line: u32) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            source,
            rest: source,
            position: 0,
            line: line.max(1),
            column: 1,
            mode: Mode::Condition,
            args: Vec::new(),
            quote: None,
            value_braces: 0,
            in_word: false,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        let start = self.position;
        let line = self.line;
        let column = self.column;
        let kind = self.scan();
        Token::new(kind, Span::new(start, self.position, line, column))
    }

    /// Tokenizes the entire source, ending with `Eof`.
    ///
    /// Stops after the first error token.
    #[must_use]
    pub fn tokenize_all(source: &'src str) -> Vec<Token> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = matches!(token.kind, TokenKind::Eof | TokenKind::Error(_));
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    /// Returns the number of argument lists currently open.
    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.args.len()
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn scan(&mut self) -> TokenKind {
        if let Some(quote) = self.quote {
            return self.scan_quoted(quote);
        }

        let Some(c) = self.peek_char() else {
            return TokenKind::Eof;
        };

        match c {
            ' ' | '\t' | '\r' | '\u{c}' | '\u{b}' => {
                self.skip_blanks();
                self.in_word = false;
                TokenKind::Space
            }
            '\n' => {
                self.advance();
                self.end_line();
                TokenKind::Newline
            }
            '#' => {
                self.skip_comment();
                self.scan()
            }
            '\\' => self.scan_backslash(),
            '"' | '\'' => {
                self.advance();
                self.quote = Some(c);
                self.in_word = true;
                TokenKind::Quote
            }
            '$' => self.scan_dollar(),
            _ if !self.args.is_empty() => self.scan_argument(c),
            _ => match self.mode {
                Mode::Condition => self.scan_condition(c),
                Mode::Value => self.scan_value(c),
            },
        }
    }

    fn end_line(&mut self) {
        self.mode = Mode::Condition;
        self.args.clear();
        self.quote = None;
        self.value_braces = 0;
        self.in_word = false;
    }

    // =========================================================================
    // Contexts
    // =========================================================================

    fn scan_quoted(&mut self, quote: char) -> TokenKind {
        match self.peek_char() {
            None | Some('\n') => {
                self.quote = None;
                TokenKind::Error(format!("Missing closing {quote} quote"))
            }
            Some(c) if c == quote => {
                self.advance();
                self.quote = None;
                TokenKind::Quote
            }
            Some('$') => self.scan_dollar(),
            Some('\\') => self.scan_backslash(),
            Some('#') => {
                self.skip_comment();
                self.scan_quoted(quote)
            }
            Some(_) => {
                let text = self.take_while(|c| c != quote && !matches!(c, '$' | '\\' | '#' | '\n'));
                TokenKind::Text(text.to_string())
            }
        }
    }

    fn scan_argument(&mut self, c: char) -> TokenKind {
        match c {
            '(' => {
                self.advance();
                if let Some(ctx) = self.args.last_mut() {
                    ctx.depth += 1;
                }
                self.in_word = true;
                TokenKind::Text("(".to_string())
            }
            ')' => {
                self.advance();
                self.in_word = true;
                match self.args.last_mut() {
                    Some(ctx) if ctx.depth > 0 => {
                        ctx.depth -= 1;
                        TokenKind::Text(")".to_string())
                    }
                    _ => {
                        let ctx = self.args.pop();
                        self.quote = ctx.and_then(|c| c.outer_quote);
                        TokenKind::RParen
                    }
                }
            }
            ',' => {
                self.advance();
                if self.args.last().is_some_and(|ctx| ctx.depth > 0) {
                    self.in_word = true;
                    TokenKind::Text(",".to_string())
                } else {
                    self.in_word = false;
                    TokenKind::Comma
                }
            }
            _ => {
                self.in_word = true;
                let text = self.take_while(|c| {
                    !is_blank(c)
                        && !matches!(c, '\n' | '#' | '\\' | '"' | '\'' | '$' | '(' | ')' | ',')
                });
                TokenKind::Text(text.to_string())
            }
        }
    }

    fn scan_condition(&mut self, c: char) -> TokenKind {
        let punct = match c {
            ':' => Some(TokenKind::Colon),
            '|' => Some(TokenKind::Pipe),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '!' if !self.in_word => Some(TokenKind::Bang),
            _ => None,
        };
        if let Some(kind) = punct {
            self.advance();
            self.in_word = false;
            return kind;
        }

        if let Some(op) = self.assign_op_at(c) {
            self.advance();
            if op != AssignOp::Set {
                self.advance();
            }
            self.mode = Mode::Value;
            self.value_braces = 0;
            self.in_word = false;
            return TokenKind::Assign(op);
        }

        if matches!(c, '(' | ')' | ',') {
            self.advance();
            return TokenKind::Error(format!("Unexpected '{c}'"));
        }

        let at_word_start = !self.in_word;
        let rest = self.rest;
        let mut len = 0;
        for (i, ch) in rest.char_indices() {
            if is_condition_stop(ch)
                || (AssignOp::from_prefix(ch).is_some() && rest[i + 1..].starts_with('='))
            {
                break;
            }
            len = i + ch.len_utf8();
        }
        let text = &rest[..len];
        self.advance_by(len);
        self.in_word = true;

        if self.peek_char() == Some('(') {
            if at_word_start && is_identifier(text) {
                self.advance();
                self.push_args();
                return TokenKind::Call(text.to_string());
            }
            self.advance();
            return TokenKind::Error("Unexpected '('".to_string());
        }
        TokenKind::Text(text.to_string())
    }

    fn scan_value(&mut self, c: char) -> TokenKind {
        match c {
            '{' => {
                self.advance();
                self.value_braces += 1;
                self.in_word = true;
                TokenKind::Text("{".to_string())
            }
            '}' if self.value_braces > 0 => {
                self.advance();
                self.value_braces -= 1;
                self.in_word = true;
                TokenKind::Text("}".to_string())
            }
            '}' => {
                self.advance();
                self.mode = Mode::Condition;
                self.in_word = false;
                TokenKind::RBrace
            }
            _ => {
                self.in_word = true;
                let text = self.take_while(|c| {
                    !is_blank(c) && !matches!(c, '\n' | '#' | '\\' | '"' | '\'' | '$' | '{' | '}')
                });
                TokenKind::Text(text.to_string())
            }
        }
    }

    // =========================================================================
    // Shared scanners
    // =========================================================================

    /// Scans an escape, a line continuation, or a literal backslash.
    fn scan_backslash(&mut self) -> TokenKind {
        if let Some(next) = self.peek_char_n(1) {
            if ESCAPABLE.contains(&next) {
                self.advance();
                self.advance();
                self.in_word = true;
                return TokenKind::Text(next.to_string());
            }
        }

        if self.at_continuation() {
            self.advance();
            self.skip_blanks();
            if self.peek_char() == Some('\n') {
                self.advance();
            }
            self.skip_comment_lines();
            if self.quote.is_some() {
                return TokenKind::Text(" ".to_string());
            }
            self.in_word = false;
            return TokenKind::Space;
        }

        self.advance();
        self.in_word = true;
        TokenKind::Text("\\".to_string())
    }

    /// Scans `$$` expansions. A single `$` is literal.
    fn scan_dollar(&mut self) -> TokenKind {
        self.in_word = true;
        if !self.rest.starts_with("$$") {
            self.advance();
            return TokenKind::Text("$".to_string());
        }
        self.advance();
        self.advance();

        match self.peek_char() {
            Some('{') => self.scan_delimited('}', TokenKind::Variable),
            Some('[') => self.scan_delimited(']', TokenKind::Property),
            Some('(') => self.scan_delimited(')', TokenKind::Environment),
            Some(c) if is_name_char(c) => {
                let name = self.take_while(is_name_char).to_string();
                if self.peek_char() == Some('(') {
                    self.advance();
                    self.push_args();
                    TokenKind::Function(name)
                } else {
                    TokenKind::Variable(name)
                }
            }
            _ => TokenKind::Error("Missing name in expansion".to_string()),
        }
    }

    fn scan_delimited(&mut self, close: char, make: fn(String) -> TokenKind) -> TokenKind {
        self.advance();
        let name = self.take_while(|c| c != close && c != '\n').to_string();
        if self.peek_char() != Some(close) {
            return TokenKind::Error(format!("Missing {close} terminator"));
        }
        self.advance();
        if name.is_empty() {
            return TokenKind::Error("Missing name in expansion".to_string());
        }
        // `$${name(args)}` is not supported; `$${name}(` is plain text.
        make(name)
    }

    fn push_args(&mut self) {
        self.args.push(ArgContext {
            depth: 0,
            outer_quote: self.quote.take(),
        });
        self.in_word = false;
    }

    fn assign_op_at(&self, c: char) -> Option<AssignOp> {
        if c == '=' {
            return Some(AssignOp::Set);
        }
        if self.peek_char_n(1) == Some('=') {
            AssignOp::from_prefix(c)
        } else {
            None
        }
    }

    /// True if a backslash at the cursor is followed only by blanks up to the
    /// end of the line (or of the input).
    fn at_continuation(&self) -> bool {
        self.rest[1..]
            .chars()
            .find(|&c| !is_blank(c))
            .is_none_or(|c| c == '\n')
    }

    fn skip_blanks(&mut self) {
        while self.peek_char().is_some_and(is_blank) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek_char().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// After a continuation, lines holding only a comment do not end the
    /// statement.
    fn skip_comment_lines(&mut self) {
        loop {
            let blanks = self.rest.len() - self.rest.trim_start_matches(is_blank).len();
            if !self.rest[blanks..].starts_with('#') {
                return;
            }
            self.skip_blanks();
            self.skip_comment();
            if self.peek_char() == Some('\n') {
                self.advance();
            }
        }
    }

    // =========================================================================
    // Cursor
    // =========================================================================

    fn peek_char(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.position += c.len_utf8();
        self.rest = &self.source[self.position..];
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, bytes: usize) {
        let target = self.position + bytes;
        while self.position < target && self.advance().is_some() {}
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'src str {
        let start = self.position;
        while self.peek_char().is_some_and(&pred) {
            self.advance();
        }
        &self.source[start..self.position]
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\u{c}' | '\u{b}')
}

fn is_condition_stop(c: char) -> bool {
    is_blank(c)
        || matches!(
            c,
            '\n' | ':' | '|' | '{' | '}' | '(' | ')' | ',' | '=' | '"' | '\'' | '$' | '#' | '\\'
        )
}

/// Returns true if `c` may appear in a variable or function name.
#[must_use]
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
