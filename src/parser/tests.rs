//! Unit tests for the parser module.
//!
//! Covers statement forms, operator precedence, suites, spans and the
//! first-error reporting of syntax errors.

use std::{io, path::Path};

use pretty_assertions::assert_eq;

use super::{
    expr::parse_primary_expr,
    parser::{parse, parse_file, Parser},
};
use crate::{
    arena::Arena,
    ast::{
        ast::AstArena,
        pickle::pickle_ast,
        statements::StmtKind,
    },
    errors::errors::{ErrorImpl, Stage},
    lexer::tokens::TokenKind,
    pickle::PickleOptions,
    source::SourceReader,
    Span,
};

fn pickled(source: &str) -> String {
    let mut arena = Arena::new();
    let module = parse(&mut arena, source).unwrap();
    pickle_ast(&arena.ast, &module, PickleOptions::default())
}

fn syntax_error(source: &str) -> (String, Option<Span>) {
    let mut arena = Arena::new();
    let diagnostic = parse(&mut arena, source).unwrap_err();
    (diagnostic.message.clone(), diagnostic.primary_span())
}

#[test]
fn test_parse_assignment() {
    assert_eq!(
        pickled("x = 1 + 2"),
        "(Module [(Assign [(Name x Store)] (BinOp (ConstantInt 1) Add (ConstantInt 2)))])"
    );
}

#[test]
fn test_parse_chained_assignment() {
    assert_eq!(
        pickled("a = b = 0\n"),
        "(Module [(Assign [(Name a Store) (Name b Store)] (ConstantInt 0))])"
    );
}

#[test]
fn test_parse_tuple_unpacking() {
    assert_eq!(
        pickled("a, b = 1, 2\n"),
        "(Module [(Assign [(Tuple [(Name a Store) (Name b Store)] Store)] (Tuple [(ConstantInt 1) (ConstantInt 2)] Load))])"
    );
}

#[test]
fn test_parse_annotated_and_augmented_assignment() {
    assert_eq!(
        pickled("x: int = 5\nx += 1\n"),
        "(Module [(AnnAssign (Name x Store) (Name int Load) (ConstantInt 5)) (AugAssign (Name x Store) Add (ConstantInt 1))])"
    );
}

#[test]
fn test_multiplicative_binds_tighter() {
    assert_eq!(
        pickled("1 + 2 * 3\n"),
        "(Module [(Expr (BinOp (ConstantInt 1) Add (BinOp (ConstantInt 2) Mult (ConstantInt 3))))])"
    );
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(
        pickled("2 ** 3 ** 2\n"),
        "(Module [(Expr (BinOp (ConstantInt 2) Pow (BinOp (ConstantInt 3) Pow (ConstantInt 2))))])"
    );
}

#[test]
fn test_unary_minus_binds_looser_than_power() {
    assert_eq!(
        pickled("-2 ** 2\n"),
        "(Module [(Expr (UnaryOp USub (BinOp (ConstantInt 2) Pow (ConstantInt 2))))])"
    );
    assert_eq!(
        pickled("2 ** -1\n"),
        "(Module [(Expr (BinOp (ConstantInt 2) Pow (UnaryOp USub (ConstantInt 1))))])"
    );
}

#[test]
fn test_parse_boolean_operators() {
    assert_eq!(
        pickled("a or b and not c\n"),
        "(Module [(Expr (BoolOp Or [(Name a Load) (BoolOp And [(Name b Load) (UnaryOp Not (Name c Load))])]))])"
    );
}

#[test]
fn test_parse_comparison_chain() {
    assert_eq!(
        pickled("a < b <= c\n"),
        "(Module [(Expr (Compare (Name a Load) [Lt LtE] [(Name b Load) (Name c Load)]))])"
    );
    assert_eq!(
        pickled("a not in b\n"),
        "(Module [(Expr (Compare (Name a Load) [NotIn] [(Name b Load)]))])"
    );
}

#[test]
fn test_parse_function_call() {
    assert_eq!(
        pickled("f(1, k=2)\n"),
        "(Module [(Expr (Call (Name f Load) [(ConstantInt 1)] [(keyword k (ConstantInt 2))]))])"
    );
}

#[test]
fn test_parse_subscript_and_slice() {
    assert_eq!(
        pickled("a[1]\nb[1:2]\n"),
        "(Module [(Expr (Subscript (Name a Load) (ConstantInt 1) Load)) (Expr (Subscript (Name b Load) (Slice (ConstantInt 1) (ConstantInt 2) ()) Load))])"
    );
}

#[test]
fn test_parse_displays() {
    assert_eq!(
        pickled("[1, 2]\n{}\n{1: 'a'}\n{3}\n()\n"),
        "(Module [(Expr (List [(ConstantInt 1) (ConstantInt 2)] Load)) (Expr (Dict [] [])) (Expr (Dict [(ConstantInt 1)] [(ConstantStr \"a\")])) (Expr (Set [(ConstantInt 3)])) (Expr (Tuple [] Load))])"
    );
}

#[test]
fn test_parse_literals() {
    assert_eq!(
        pickled("1.5\n2j\nTrue\nNone\n'a' 'b'\n"),
        "(Module [(Expr (ConstantFloat 1.5)) (Expr (ConstantComplex 2.0j)) (Expr (ConstantBool True)) (Expr (ConstantNone)) (Expr (ConstantStr \"ab\"))])"
    );
}

#[test]
fn test_parse_if_elif_else() {
    assert_eq!(
        pickled("if a:\n    x = 1\nelif b:\n    pass\nelse:\n    x = 2\n"),
        "(Module [(If (Name a Load) [(Assign [(Name x Store)] (ConstantInt 1))] [(If (Name b Load) [(Pass)] [(Assign [(Name x Store)] (ConstantInt 2))])])])"
    );
}

#[test]
fn test_parse_loops() {
    assert_eq!(
        pickled("for i in range(3):\n    continue\nwhile x:\n    break\n"),
        "(Module [(For (Name i Store) (Call (Name range Load) [(ConstantInt 3)] []) [(Continue)] []) (While (Name x Load) [(Break)] [])])"
    );
}

#[test]
fn test_parse_function_definition() {
    assert_eq!(
        pickled("def add(a: int, b: int) -> int:\n    return a + b\n"),
        "(Module [(FunctionDef add [(arg a (Name int Load)) (arg b (Name int Load))] (Name int Load) [(Return (BinOp (Name a Load) Add (Name b Load)))])])"
    );
}

#[test]
fn test_parse_imports() {
    assert_eq!(
        pickled("import os.path as p, sys\nfrom m import (a, b as c,)\n"),
        "(Module [(Import [(alias os.path p) (alias sys ())]) (ImportFrom m [(alias a ()) (alias b c)])])"
    );
}

#[test]
fn test_parse_simple_statement_list() {
    assert_eq!(
        pickled("x = 1; y = 2;\n"),
        "(Module [(Assign [(Name x Store)] (ConstantInt 1)) (Assign [(Name y Store)] (ConstantInt 2))])"
    );
}

#[test]
fn test_parse_single_line_suite() {
    assert_eq!(
        pickled("if x: pass\n"),
        "(Module [(If (Name x Load) [(Pass)] [])])"
    );
}

#[test]
fn test_nested_blocks_close_together() {
    assert_eq!(
        pickled("if a:\n    if b:\n        x = 1\ny = 2\n"),
        "(Module [(If (Name a Load) [(If (Name b Load) [(Assign [(Name x Store)] (ConstantInt 1))] [])] []) (Assign [(Name y Store)] (ConstantInt 2))])"
    );
}

#[test]
fn test_statement_and_module_spans() {
    let mut arena = Arena::new();
    let module = parse(&mut arena, "if x:\n    y = 1\nz = 2\n").unwrap();

    assert_eq!(module.body.len(), 2);
    assert_eq!(arena.ast.stmt(module.body[0]).span, Span::new(0, 14));
    assert_eq!(arena.ast.stmt(module.body[1]).span, Span::new(16, 20));
    assert_eq!(module.span, Span::new(0, 20));
}

#[test]
fn test_parse_empty_program() {
    let mut arena = Arena::new();
    let module = parse(&mut arena, "\n# only a comment\n").unwrap();

    assert!(module.body.is_empty());
    assert_eq!(module.span, Span::new(0, 0));
}

#[test]
fn test_if_with_test_and_body() {
    let mut arena = Arena::new();
    let module = parse(&mut arena, "if x:\n    y = 1\n").unwrap();

    let StmtKind::If { body, orelse, .. } = &arena.ast.stmt(module.body[0]).kind else {
        panic!("expected an if statement");
    };
    assert_eq!(body.len(), 1);
    assert!(orelse.is_empty());
}

#[test]
fn test_syntax_error_unexpected_token() {
    let (message, span) = syntax_error("x = = 1\n");

    assert_eq!(message, "token '=' is unexpected here");
    assert_eq!(span, Some(Span::new(4, 4)));
}

#[test]
fn test_syntax_error_token_of_type() {
    let (message, _) = syntax_error("x = 1 2\n");

    assert_eq!(message, "token '2' (of type 'integer') is unexpected here");
}

#[test]
fn test_syntax_error_unexpected_newline() {
    let (message, span) = syntax_error("x = 1 +\n");

    assert_eq!(message, "newline is unexpected here");
    assert_eq!(span, Some(Span::new(7, 7)));
}

#[test]
fn test_syntax_error_unexpected_end_of_file() {
    let (message, _) = syntax_error("x = (1, 2");

    assert_eq!(message, "end of file is unexpected here");
}

#[test]
fn test_missing_indented_block() {
    let (message, _) = syntax_error("if x:\ny = 1\n");

    assert_eq!(message, "token 'y' (of type 'identifier') is unexpected here");
}

#[test]
fn test_invalid_assignment_target() {
    let (message, span) = syntax_error("1 = x\n");

    assert_eq!(message, ErrorImpl::InvalidAssignmentTarget.to_string());
    assert_eq!(span, Some(Span::new(0, 0)));
}

#[test]
fn test_integer_literal_too_large() {
    let (message, _) = syntax_error("x = 99999999999999999999\n");

    assert_eq!(
        message,
        "integer literal 99999999999999999999 does not fit in 64 bits"
    );
}

#[test]
fn test_tokenizer_errors_surface_through_parse() {
    let mut arena = Arena::new();
    let diagnostic = parse(&mut arena, "if x:\n    y = 1\n   z = 2\n").unwrap_err();

    assert_eq!(diagnostic.stage, Stage::Tokenizer);
    assert_eq!(diagnostic.message, "inconsistent indentation");
}

#[test]
fn test_duplicate_registration_is_ambiguous() {
    let mut arena = AstArena::default();
    let mut parser = Parser::new("x\n", &mut arena).unwrap();
    assert!(parser.check_grammar().is_ok());

    parser.nud(TokenKind::Name, parse_primary_expr);
    let error = parser.check_grammar().unwrap_err();

    assert!(matches!(error.get_kind(), ErrorImpl::AmbiguousSyntax { .. }));
    assert!(error.get_span().is_none());
    assert!(error
        .get_kind()
        .to_string()
        .starts_with("internal compiler error: syntax is ambiguous in the parser"));
}

struct MemoryReader(&'static str);

impl SourceReader for MemoryReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        if path == Path::new("main.py") {
            Ok(self.0.to_string())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }
    }
}

#[test]
fn test_parse_file_uses_reader() {
    let mut arena = Arena::new();
    let reader = MemoryReader("x = 1\n");

    let module = parse_file(&mut arena, Path::new("main.py"), &reader).unwrap();
    assert_eq!(module.body.len(), 1);

    let diagnostic = parse_file(&mut arena, Path::new("other.py"), &reader).unwrap_err();
    assert!(diagnostic.message.starts_with("unable to read \"other.py\""));
    assert!(diagnostic.primary_span().is_none());
}
