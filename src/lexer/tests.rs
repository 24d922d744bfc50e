//! Unit tests for the lexer module.
//!
//! Covers keywords and identifiers, numeric and string literals, operators,
//! the indentation stack and the error cases.

use num_bigint::BigInt;
use pretty_assertions::assert_eq;

use super::{
    lexer::{tokenize, Lexer},
    tokens::{pickle_tokens, TokenKind, TokenValue},
};
use crate::{errors::errors::ErrorImpl, Span};

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    let tokens = kinds("def if elif else while for in return import from as pass break continue");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Def,
            TokenKind::If,
            TokenKind::Elif,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::For,
            TokenKind::In,
            TokenKind::Return,
            TokenKind::Import,
            TokenKind::From,
            TokenKind::As,
            TokenKind::Pass,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Newline,
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo baz_123 _under True").unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Name);
    assert_eq!(tokens[0].value, TokenValue::Str("foo".to_string()));
    assert_eq!(tokens[1].value, TokenValue::Str("baz_123".to_string()));
    assert_eq!(tokens[2].value, TokenValue::Str("_under".to_string()));
    assert_eq!(tokens[3].kind, TokenKind::True);
    assert_eq!(tokens[3].value, TokenValue::None);
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("42 3.14 1_000 0x1F 0o17 0b101 2e3 .5 4j").unwrap();

    assert_eq!(tokens[0].value, TokenValue::Integer(BigInt::from(42)));
    assert_eq!(tokens[1].value, TokenValue::Real(3.14));
    assert_eq!(tokens[2].value, TokenValue::Integer(BigInt::from(1000)));
    assert_eq!(tokens[3].value, TokenValue::Integer(BigInt::from(31)));
    assert_eq!(tokens[4].value, TokenValue::Integer(BigInt::from(15)));
    assert_eq!(tokens[5].value, TokenValue::Integer(BigInt::from(5)));
    assert_eq!(tokens[6].value, TokenValue::Real(2000.0));
    assert_eq!(tokens[7].value, TokenValue::Real(0.5));
    assert_eq!(tokens[8].kind, TokenKind::Imaginary);
    assert_eq!(tokens[8].value, TokenValue::Imaginary(4.0));
}

#[test]
fn test_huge_integer_is_kept_exact() {
    let tokens = tokenize("123456789012345678901234567890").unwrap();
    let expected: BigInt = "123456789012345678901234567890".parse().unwrap();

    assert_eq!(tokens[0].value, TokenValue::Integer(expected));
}

#[test]
fn test_tokenize_strings() {
    let tokens = tokenize(r#""hello" 'world' "a\tb\n" "\x41""#).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, TokenValue::Str("hello".to_string()));
    assert_eq!(tokens[1].value, TokenValue::Str("world".to_string()));
    assert_eq!(tokens[2].value, TokenValue::Str("a\tb\n".to_string()));
    assert_eq!(tokens[3].value, TokenValue::Str("A".to_string()));
}

#[test]
fn test_triple_quoted_string_spans_lines() {
    let tokens = tokenize("x = \"\"\"one\ntwo\"\"\"\n").unwrap();

    assert_eq!(tokens[2].value, TokenValue::Str("one\ntwo".to_string()));
    assert_eq!(tokens[2].span, Span::new(4, 16));
    assert_eq!(tokens[3].kind, TokenKind::Newline);
}

#[test]
fn test_operators_prefer_longest_match() {
    let tokens = kinds("** **= // < <= << <<= -> != ==");

    assert_eq!(
        &tokens[..10],
        &[
            TokenKind::DoubleStar,
            TokenKind::DoubleStarEquals,
            TokenKind::DoubleSlash,
            TokenKind::Less,
            TokenKind::LessEquals,
            TokenKind::LeftShift,
            TokenKind::LeftShiftEquals,
            TokenKind::Arrow,
            TokenKind::NotEquals,
            TokenKind::Equals,
        ]
    );
}

#[test]
fn test_spans_are_inclusive_byte_ranges() {
    let tokens = tokenize("x = 1 + 2\n").unwrap();

    assert_eq!(tokens[0].span, Span::new(0, 0));
    assert_eq!(tokens[1].span, Span::new(2, 2));
    assert_eq!(tokens[3].span, Span::new(6, 6));
    assert_eq!(tokens[5].kind, TokenKind::Newline);
    assert_eq!(tokens[5].span, Span::new(9, 9));
}

#[test]
fn test_indent_and_dedent() {
    let tokens = kinds("if x:\n    y = 1\nz = 2\n");

    assert_eq!(
        tokens,
        vec![
            TokenKind::If,
            TokenKind::Name,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Name,
            TokenKind::Assignment,
            TokenKind::Integer,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Name,
            TokenKind::Assignment,
            TokenKind::Integer,
            TokenKind::Newline,
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn test_multiple_dedents_at_end_of_input() {
    let tokens = kinds("if a:\n  if b:\n    c\n");
    let dedents = tokens
        .iter()
        .filter(|kind| **kind == TokenKind::Dedent)
        .count();

    assert_eq!(dedents, 2);
    assert_eq!(tokens.last(), Some(&TokenKind::EndOfFile));
}

#[test]
fn test_blank_and_comment_lines_are_ignored() {
    let tokens = kinds("x = 1\n\n   # comment\n\t\ny = 2  # trailing\n");

    assert_eq!(
        tokens,
        vec![
            TokenKind::Name,
            TokenKind::Assignment,
            TokenKind::Integer,
            TokenKind::Newline,
            TokenKind::Name,
            TokenKind::Assignment,
            TokenKind::Integer,
            TokenKind::Newline,
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn test_newlines_inside_brackets_are_ignored() {
    let tokens = kinds("x = (1,\n      2)\n");

    assert_eq!(
        tokens.iter().filter(|kind| **kind == TokenKind::Newline).count(),
        1
    );
    assert!(!tokens.contains(&TokenKind::Indent));
}

#[test]
fn test_backslash_continuation() {
    let tokens = kinds("x = 1 + \\\n    2\n");

    assert!(!tokens.contains(&TokenKind::Indent));
    assert_eq!(
        tokens.iter().filter(|kind| **kind == TokenKind::Newline).count(),
        1
    );
}

#[test]
fn test_missing_trailing_newline_is_supplied() {
    assert_eq!(kinds("x"), kinds("x\n"));
}

#[test]
fn test_inconsistent_indentation() {
    let error = tokenize("if x:\n    y\n   z\n").unwrap_err();

    assert_eq!(error.get_kind(), &ErrorImpl::InconsistentIndentation);
    assert_eq!(error.get_span(), Some(Span::new(12, 14)));
}

#[test]
fn test_inconsistent_indentation_in_nested_blocks() {
    let error = tokenize("if a:\n  if b:\n    c\n   d\n").unwrap_err();

    assert_eq!(error.get_kind(), &ErrorImpl::InconsistentIndentation);
    assert_eq!(error.get_span(), Some(Span::new(20, 22)));
}

#[test]
fn test_indentation_round_trip_across_blank_and_comment_lines() {
    let tokens = kinds("if a:\n  if b:\n\n    # c\n    x\n  y\nz\n");

    assert_eq!(
        tokens,
        vec![
            TokenKind::If,
            TokenKind::Name,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::If,
            TokenKind::Name,
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Name,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Name,
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Name,
            TokenKind::Newline,
            TokenKind::EndOfFile,
        ]
    );
}

#[test]
fn test_unterminated_string() {
    let error = tokenize("s = \"abc\n").unwrap_err();

    assert_eq!(error.get_kind(), &ErrorImpl::UnterminatedString);
    assert_eq!(error.get_span(), Some(Span::new(4, 7)));
}

#[test]
fn test_malformed_numbers() {
    for source in ["12abc", "0x", "0b102", "1e"] {
        let error = tokenize(source).unwrap_err();
        assert!(
            matches!(error.get_kind(), ErrorImpl::MalformedNumber { .. }),
            "{source} should be malformed"
        );
    }
}

#[test]
fn test_unrecognised_token() {
    let error = tokenize("x = $").unwrap_err();

    assert_eq!(
        error.get_kind(),
        &ErrorImpl::UnrecognisedToken {
            token: "$".to_string()
        }
    );
    assert_eq!(error.get_span(), Some(Span::new(4, 4)));
}

#[test]
fn test_unmatched_closing_bracket() {
    let error = tokenize("x = 1)\n").unwrap_err();

    assert_eq!(
        error.get_kind(),
        &ErrorImpl::UnmatchedBracket { bracket: ')' }
    );
}

#[test]
fn test_end_of_file_is_sticky() {
    let mut lexer = Lexer::new("");

    let first = lexer.lex().unwrap();
    assert_eq!(first.kind, TokenKind::EndOfFile);
    assert_eq!(first.span, Span::new(0, 0));
    assert_eq!(lexer.lex().unwrap().kind, TokenKind::EndOfFile);
}

#[test]
fn test_pickle_tokens() {
    let tokens = tokenize("x = \"a\"").unwrap();

    assert_eq!(
        pickle_tokens(&tokens, true),
        "NAME x 0:0\n= 2:2\nSTRING \"a\" 4:6\nNEWLINE 7:7\nEOF 7:7\n"
    );
    assert_eq!(
        pickle_tokens(&tokens, false),
        "NAME x\n=\nSTRING \"a\"\nNEWLINE\nEOF\n"
    );
}
