//! Integration tests for the lexer
//!
//! Tests tokenization of project-file source.

use proreader_language::{AssignOp, Lexer, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::tokenize_all(source).into_iter().map(|t| t.kind).collect()
}

fn text(s: &str) -> TokenKind {
    TokenKind::Text(s.to_string())
}

// =============================================================================
// Statements
// =============================================================================

#[test]
fn tokenize_empty() {
    assert_eq!(kinds(""), [TokenKind::Eof]);
}

#[test]
fn tokenize_assignment() {
    assert_eq!(
        kinds("SOURCES += main.cpp"),
        [
            text("SOURCES"),
            TokenKind::Space,
            TokenKind::Assign(AssignOp::Append),
            TokenKind::Space,
            text("main.cpp"),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn tokenize_every_operator() {
    for op in [
        AssignOp::Set,
        AssignOp::Append,
        AssignOp::AppendUnique,
        AssignOp::Remove,
        AssignOp::Replace,
    ] {
        let source = format!("VAR{}x", op.as_str());
        assert_eq!(kinds(&source)[1], TokenKind::Assign(op), "{source}");
    }
}

#[test]
fn tokenize_scope_condition() {
    let tokens = kinds("!win32:unix|macx {");
    assert_eq!(tokens[0], TokenKind::Bang);
    assert_eq!(tokens[2], TokenKind::Colon);
    assert_eq!(tokens[4], TokenKind::Pipe);
    assert!(tokens.contains(&TokenKind::LBrace));
}

#[test]
fn tokenize_newlines_between_statements() {
    let tokens = kinds("A = 1\nB = 2\n");
    assert_eq!(tokens.iter().filter(|k| **k == TokenKind::Newline).count(), 2);
}

// =============================================================================
// Expansions
// =============================================================================

#[test]
fn tokenize_expansion_forms() {
    let tokens = kinds("X = $$VAR $${BRACED} $$[QT_VERSION] $$(HOME)");
    assert!(tokens.contains(&TokenKind::Variable("VAR".into())));
    assert!(tokens.contains(&TokenKind::Variable("BRACED".into())));
    assert!(tokens.contains(&TokenKind::Property("QT_VERSION".into())));
    assert!(tokens.contains(&TokenKind::Environment("HOME".into())));
}

#[test]
fn tokenize_replace_function_call() {
    let tokens = kinds("X = $$join(LIST, \",\")");
    assert!(tokens.contains(&TokenKind::Function("join".into())));
    assert!(tokens.contains(&TokenKind::Comma));
    assert!(tokens.contains(&TokenKind::Quote));
}

#[test]
fn tokenize_test_function_call() {
    let tokens = kinds("contains(CONFIG, debug)");
    assert_eq!(tokens[0], TokenKind::Call("contains".into()));
    assert_eq!(tokens.last(), Some(&TokenKind::Eof));
}

#[test]
fn make_variable_stays_literal() {
    let tokens = kinds("X = $(MAKE)");
    assert!(!tokens.iter().any(|k| matches!(k, TokenKind::Environment(_))));
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn comments_are_skipped() {
    assert_eq!(kinds("# just a comment"), [TokenKind::Eof]);
    assert_eq!(kinds("X = a # trailing")[4], text("a"));
}

#[test]
fn line_continuation_joins_lines() {
    let tokens = kinds("X = a \\\n    b");
    assert!(!tokens.contains(&TokenKind::Newline));
    assert!(tokens.contains(&text("b")));
}

#[test]
fn spans_track_lines() {
    let tokens = Lexer::tokenize_all("A = 1\nB = 2");
    let b = tokens
        .iter()
        .find(|t| t.kind == text("B"))
        .map(|t| t.span.line);
    assert_eq!(b, Some(2));
}

#[test]
fn unterminated_quote_is_an_error_token() {
    let tokens = kinds("X = \"open\n");
    assert!(tokens.iter().any(|k| matches!(k, TokenKind::Error(_))));
}
