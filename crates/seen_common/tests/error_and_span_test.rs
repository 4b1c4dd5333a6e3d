use seen_common::{Position, SeenError, Severity, Span, Spanned};

#[test]
fn pass_precondition_is_not_fatal() {
    let err = SeenError::pass_precondition("cfg-analysis", "terminator missing");
    assert!(!err.is_fatal());
}

#[test]
fn malformed_ir_is_fatal() {
    let err = SeenError::malformed_ir("main", "entry", "missing terminator");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("main"));
}

#[test]
fn span_combine_takes_the_widest_range() {
    let a = Span::single(Position::new(1, 1, 0), 0);
    let b = Span::single(Position::new(1, 5, 4), 0);
    let combined = a.combine(b);
    assert_eq!(combined.start, a.start);
    assert_eq!(combined.end, b.end);
}

#[test]
fn spanned_map_preserves_span() {
    let spanned = Spanned::new(41, Span::single(Position::start(), 0));
    let mapped = spanned.map(|v| v + 1);
    assert_eq!(mapped.value, 42);
    assert_eq!(mapped.span, spanned.span);
}

#[test]
fn diagnostic_from_error_is_an_error_severity() {
    let diag: seen_common::Diagnostic = SeenError::unsupported("struct globals").into();
    assert_eq!(diag.severity, Severity::Error);
}
