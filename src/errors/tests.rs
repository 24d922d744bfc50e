//! Unit tests for error handling.

use crate::errors::diagnostics::{Diagnostic, Diagnostics, Label, Level};
use crate::errors::errors::{Error, ErrorImpl, Stage};
use crate::Span;

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "$".to_string(),
        },
        Span::new(10, 10),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.stage(), Stage::Tokenizer);
    assert_eq!(error.get_span(), Some(Span::new(10, 10)));
}

#[test]
fn test_parser_messages() {
    assert_eq!(
        ErrorImpl::UnexpectedEndOfFile.to_string(),
        "end of file is unexpected here"
    );
    assert_eq!(
        ErrorImpl::UnexpectedToken {
            token: ")".to_string()
        }
        .to_string(),
        "token ')' is unexpected here"
    );
    assert_eq!(
        ErrorImpl::UnexpectedTokenOfType {
            token: "42".to_string(),
            kind: "integer".to_string()
        }
        .to_string(),
        "token '42' (of type 'integer') is unexpected here"
    );
}

#[test]
fn test_stage_grouping() {
    assert_eq!(ErrorImpl::InconsistentIndentation.stage(), Stage::Tokenizer);
    assert_eq!(ErrorImpl::UnexpectedNewline.stage(), Stage::Parser);
    assert_eq!(
        ErrorImpl::AmbiguousSyntax {
            token: "+".to_string()
        }
        .stage(),
        Stage::Parser
    );
    assert_eq!(ErrorImpl::DivisionByZero.stage(), Stage::Semantic);
    assert_eq!(ErrorImpl::intrinsic("boom").stage(), Stage::Semantic);
}

#[test]
fn test_error_without_span() {
    let error = Error::without_span(ErrorImpl::FileRead {
        path: "missing.py".to_string(),
        reason: "not found".to_string(),
    });

    assert!(error.get_span().is_none());
    let diagnostic = Diagnostic::from(error);
    assert!(diagnostic.labels.is_empty());
    assert!(diagnostic.primary_span().is_none());
}

#[test]
fn test_diagnostic_from_error() {
    let error = Error::new(
        ErrorImpl::VariableNotDeclared {
            variable: "y".to_string(),
        },
        Span::new(4, 4),
    );
    let diagnostic = Diagnostic::from(error);

    assert_eq!(diagnostic.level, Level::Error);
    assert_eq!(diagnostic.stage, Stage::Semantic);
    assert_eq!(diagnostic.message, "variable \"y\" not declared");
    assert_eq!(diagnostic.primary_span(), Some(Span::new(4, 4)));
}

#[test]
fn test_diagnostics_has_error() {
    let mut diagnostics = Diagnostics::new();
    assert!(!diagnostics.has_error());

    diagnostics.push(Diagnostic::new("unused import", Level::Warning, Stage::Semantic));
    assert!(!diagnostics.has_error());

    diagnostics.push(
        Diagnostic::new("bad", Level::Error, Stage::Parser)
            .with_label(Label::primary("here", vec![Span::new(0, 2)])),
    );
    assert!(diagnostics.has_error());
    assert_eq!(diagnostics.len(), 2);
}

#[test]
fn test_diagnostic_display() {
    let diagnostic = Diagnostic::new("newline is unexpected here", Level::Error, Stage::Parser)
        .with_label(Label::primary("", vec![Span::new(5, 5)]));

    assert_eq!(
        diagnostic.to_string(),
        "error (syntax error): newline is unexpected here\n  --> 5:5"
    );
}
