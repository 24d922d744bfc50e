//! Integration tests for end-to-end compilation.
//!
//! These tests drive the complete pipeline through the public API, from
//! source text through tokenization, parsing and semantic analysis, and check
//! the dumps and diagnostics a driver would show.

use std::{collections::HashMap, io, path::Path};

use compy::{
    arena::Arena,
    ast::pickle::pickle_ast,
    compile_file, compile_source,
    errors::errors::Stage,
    lexer::{lexer::tokenize, tokens::pickle_tokens},
    parser::parser::parse,
    pickle::PickleOptions,
    semantics::{
        asr::{ExprKind, StmtKind},
        ast_to_asr::SemanticAnalyzer,
        pickle::pickle_asr,
        symbol_table::Symbol,
        types::INTEGER,
    },
    source::SourceReader,
    CompilerOptions, Span,
};
use pretty_assertions::assert_eq;

struct MemoryReader(HashMap<&'static str, &'static str>);

impl SourceReader for MemoryReader {
    fn read_source(&self, path: &Path) -> io::Result<String> {
        path.to_str()
            .and_then(|name| self.0.get(name))
            .map(|source| source.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
    }
}

fn module_options() -> CompilerOptions {
    CompilerOptions {
        main_module: false,
        ..CompilerOptions::default()
    }
}

#[test]
fn test_compile_simple_program() {
    let mut arena = Arena::new();
    let unit = compile_source(&mut arena, "x = 1 + 2\n", &module_options()).unwrap();

    let scope = arena.asr.scope(unit.global_scope);
    let x = scope.get("x").unwrap();
    assert_eq!(arena.asr.symbol(x).ty(), Some(INTEGER));

    let StmtKind::Assignment { value, .. } = &arena.asr.stmt(unit.body[0]).kind else {
        panic!("expected an assignment");
    };
    let expr = arena.asr.expr(*value);
    assert!(matches!(expr.kind, ExprKind::BinOp { .. }));
    let folded = arena.asr.expr(expr.value.unwrap());
    assert_eq!(folded.kind, ExprKind::IntegerConstant(3));
    assert_eq!(folded.ty, INTEGER);
}

#[test]
fn test_compile_program_with_functions() {
    let source = "\
def fib(n: int) -> int:
    if n < 2:
        return n
    return fib(n - 1) + fib(n - 2)

def report(label: str, value: int):
    print(label, value)

total: int = 0
for i in range(10):
    total += fib(i)
report('total', total)
";
    let mut arena = Arena::new();
    let unit = compile_source(&mut arena, source, &CompilerOptions::default()).unwrap();
    let asr = pickle_asr(&arena.asr, &unit, PickleOptions::default());

    assert!(asr.starts_with("(TranslationUnit (SymbolTable 1 [(Function fib (SymbolTable 2"));
    assert!(asr.contains("(Program main_program [(Assignment (Var total) (IntegerConstant 0 i64))"));
    assert!(asr.contains("(SubroutineCall report [(StringConstant \"total\" str) (Var total)])"));
    assert!(asr.contains("(FunctionCall fib [(BinOp (Var n) Sub (IntegerConstant 1 i64) i64 ())] i64 ())"));
    assert!(asr.contains("(Variable i Local i64) (Program main_program"));
    assert!(asr.ends_with("(Variable total Local i64)]) [])"));
}

#[test]
fn test_inconsistent_indentation_is_a_tokenizer_error() {
    let source = "if True:\n    x = 1\n   y = 2\n";
    let mut arena = Arena::new();
    let diagnostics = compile_source(&mut arena, source, &CompilerOptions::default()).unwrap_err();

    assert_eq!(diagnostics.len(), 1);
    let diagnostic = diagnostics.first().unwrap();
    assert_eq!(diagnostic.stage, Stage::Tokenizer);
    assert_eq!(diagnostic.message, "inconsistent indentation");
    assert_eq!(diagnostic.primary_span(), Some(Span::new(19, 21)));
}

#[test]
fn test_syntax_error_stops_before_analysis() {
    let mut arena = Arena::new();
    let diagnostics =
        compile_source(&mut arena, "x = (1 +\n", &CompilerOptions::default()).unwrap_err();
    assert!(diagnostics.has_error());
    assert!(arena.asr.exprs.is_empty());
}

#[test]
fn test_semantic_error_reports_one_diagnostic() {
    let mut arena = Arena::new();
    let diagnostics =
        compile_source(&mut arena, "x = 'a' + 1\ny = z\n", &CompilerOptions::default()).unwrap_err();

    assert!(diagnostics.has_error());
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = diagnostics.first().unwrap();
    assert_eq!(diagnostic.stage, Stage::Semantic);
    assert_eq!(
        diagnostic.to_string(),
        "error (semantic error): type mismatch in binary operation: 'str' and 'i64'\n  --> 4:10"
    );
}

#[test]
fn test_tokenize_matches_what_the_parser_sees() {
    let source = "def f(a: int) -> int:\n    return a * 2\n";
    let first = pickle_tokens(&tokenize(source).unwrap(), true);
    let second = pickle_tokens(&tokenize(source).unwrap(), true);
    assert_eq!(first, second);
    assert!(first.starts_with("def 0:2\nNAME f 4:4\n"));
    assert!(first.lines().last().unwrap().starts_with("EOF"));

    // A missing final newline is supplied the same way by both entry points.
    let mut arena = Arena::new();
    let with_newline = parse(&mut arena, "x = 1\n").unwrap();
    let without_newline = parse(&mut arena, "x = 1").unwrap();
    assert_eq!(
        pickle_ast(&arena.ast, &with_newline, PickleOptions::default()),
        pickle_ast(&arena.ast, &without_newline, PickleOptions::default())
    );
}

#[test]
fn test_pickles_are_pure() {
    let mut arena = Arena::new();
    let module = parse(&mut arena, "a = [1, 2, 3]\nb = len(a) > 2\n").unwrap();
    let first = pickle_ast(&arena.ast, &module, PickleOptions::default());
    let second = pickle_ast(&arena.ast, &module, PickleOptions::default());
    assert_eq!(first, second);

    let unit = SemanticAnalyzer::new(&mut arena)
        .analyze(&module, true, false)
        .unwrap();
    let options = PickleOptions {
        indent: true,
        colors: false,
    };
    assert_eq!(
        pickle_asr(&arena.asr, &unit, options),
        pickle_asr(&arena.asr, &unit, options)
    );
}

#[test]
fn test_compile_file_through_a_reader() {
    let reader = MemoryReader(HashMap::from([("main.py", "x: int = 4\ny = x * 2\n")]));
    let mut arena = Arena::new();
    let unit = compile_file(&mut arena, Path::new("main.py"), &reader, &module_options()).unwrap();
    assert_eq!(unit.body.len(), 2);

    let mut arena = Arena::new();
    let diagnostics = compile_file(
        &mut arena,
        Path::new("missing.py"),
        &reader,
        &CompilerOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        diagnostics.first().unwrap().message,
        "unable to read \"missing.py\": no such file"
    );
}

#[test]
fn test_units_import_each_other() {
    let mut library_arena = Arena::new();
    let library = compile_source(
        &mut library_arena,
        "scale: float = 2.5\ndef area(w: float, h: float) -> float:\n    return w * h * scale\n",
        &module_options(),
    )
    .unwrap();
    let interface = library.interface(&library_arena.asr, "geometry");

    let mut arena = Arena::new();
    let module = parse(&mut arena, "from geometry import area\nimport geometry as g\na = area(2, g.scale)\n").unwrap();
    let unit = SemanticAnalyzer::new(&mut arena)
        .with_interface(interface)
        .analyze(&module, true, false)
        .unwrap();

    let scope = arena.asr.scope(unit.global_scope);
    assert!(matches!(
        arena.asr.symbol(scope.get("g").unwrap()),
        Symbol::ExternalModule { module, .. } if module == "geometry"
    ));
    assert_eq!(
        arena.asr.symbol(scope.get("a").unwrap()).ty().unwrap().to_string(),
        "f64"
    );
}

#[test]
fn test_symtab_only_mode() {
    let options = CompilerOptions {
        symtab_only: true,
        ..CompilerOptions::default()
    };
    let mut arena = Arena::new();
    let unit = compile_source(
        &mut arena,
        "def f(x: int) -> int:\n    return not_declared\n",
        &options,
    )
    .unwrap();
    let asr = pickle_asr(&arena.asr, &unit, PickleOptions::default());
    assert_eq!(
        asr,
        "(TranslationUnit (SymbolTable 1 [(Function f (SymbolTable 2 [(Variable x In i64)]) [(Var x)] i64 []) (Program main_program [])]) [])"
    );
}
