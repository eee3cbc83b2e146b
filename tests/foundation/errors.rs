//! Integration tests for Error types
//!
//! Tests error construction, display, context, and error kinds.

use std::path::PathBuf;
use std::sync::Arc;

use proreader_foundation::{Error, ErrorContext, ErrorKind, EvalLimit, FunctionKind, Location};

// =============================================================================
// Error Construction
// =============================================================================

#[test]
fn error_parse() {
    let err = Error::parse("/src/app.pro", 7, 3, "Extra characters after test expression.");
    assert!(err.is_parse_error());
    let msg = format!("{err}");
    assert!(msg.contains("/src/app.pro:7"));
    assert!(msg.contains("Extra characters"));
}

#[test]
fn error_io() {
    let io = std::io::Error::from(std::io::ErrorKind::NotFound);
    let err = Error::io("/missing.pri", &io);
    assert!(matches!(err.kind, ErrorKind::Io { .. }));
    assert!(!err.is_parse_error());
    assert!(format!("{err}").contains("/missing.pri"));
}

#[test]
fn error_unknown_function() {
    let err = Error::unknown_function("frobnicate", FunctionKind::Replace);
    let msg = format!("{err}");
    assert!(msg.contains("frobnicate"));
    assert!(msg.contains("replace function"));

    let err = Error::unknown_function("frob", FunctionKind::Test);
    assert!(format!("{err}").contains("test function"));
}

#[test]
fn error_arity_mismatch() {
    let err = Error::arity_mismatch("member", "var, [start, [end]]", 4);
    assert!(matches!(err.kind, ErrorKind::ArityMismatch { actual: 4, .. }));
    let msg = format!("{err}");
    assert!(msg.contains("member(var, [start, [end]])"));
    assert!(msg.contains('4'));
}

#[test]
fn error_limits() {
    let err = Error::limit_exceeded(EvalLimit::MaxCallDepth {
        limit: 100,
        function: Some("recurse".to_string()),
    });
    assert_eq!(format!("{err}"), "limit exceeded: max call depth (100) exceeded in recurse");

    let err = Error::limit_exceeded(EvalLimit::MaxIncludeDepth { limit: 3 });
    assert_eq!(format!("{err}"), "limit exceeded: max include depth (3) exceeded");
}

#[test]
fn error_kinds_display() {
    let cases = [
        (ErrorKind::UserError("stop".into()), "stop"),
        (ErrorKind::UnexpectedControl("break"), "unexpected break()"),
        (ErrorKind::CircularInclusion(PathBuf::from("/a.pri")), "circular inclusion of /a.pri"),
        (ErrorKind::Eval("bad".into()), "bad"),
        (ErrorKind::Internal("oops".into()), "internal error: oops"),
    ];
    for (kind, expected) in cases {
        assert_eq!(format!("{}", Error::new(kind)), expected);
    }
}

#[test]
fn error_invalid_regex() {
    let err = Error::new(ErrorKind::InvalidRegex {
        pattern: "(".into(),
        message: "unclosed group".into(),
    });
    assert!(format!("{err}").contains("'('"));
}

// =============================================================================
// Error Context
// =============================================================================

#[test]
fn context_location_and_stack() {
    let inner = Arc::new(PathBuf::from("/p/inc.pri"));
    let outer = Arc::new(PathBuf::from("/p/app.pro"));
    let err = Error::eval("failed").with_context(
        ErrorContext::new()
            .with_location(Location::new(Arc::clone(&inner), 4))
            .with_frame(Location::new(Arc::clone(&outer), 12)),
    );

    let ctx = err.context.as_ref().unwrap();
    assert_eq!(ctx.location.as_ref().unwrap().line, 4);
    assert_eq!(ctx.stack.len(), 1);

    let shown = format!("{ctx}");
    assert!(shown.contains("at /p/inc.pri:4"));
    assert!(shown.contains("from /p/app.pro:12"));
}

#[test]
fn context_without_location_is_empty() {
    assert_eq!(format!("{}", ErrorContext::new()), "");
}

#[test]
fn error_is_std_error() {
    fn assert_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
    assert_error(&Error::eval("x"));
}
