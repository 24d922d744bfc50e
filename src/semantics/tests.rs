//! Unit tests for semantic analysis: typing, symbol tables, constant
//! folding and the diagnostics raised for ill-typed programs.

use pretty_assertions::assert_eq;

use super::{
    asr::{AsrArena, ExprKind, ModuleInterface, StmtKind, TranslationUnit},
    ast_to_asr::{ast_to_asr, SemanticAnalyzer},
    fold::Scalar,
    intrinsics,
    pickle::{pickle_asr, pickle_asr_expr},
    symbol_table::Symbol,
    types::{promote, Signature, Ttype, INTEGER, REAL},
};
use crate::{arena::Arena, errors::errors::ErrorImpl, parser::parser::parse, pickle::PickleOptions, Span};

fn analyze(source: &str) -> (Arena, TranslationUnit) {
    let mut arena = Arena::new();
    let module = parse(&mut arena, source).unwrap();
    let unit = ast_to_asr(&mut arena, &module, false, false).unwrap();
    (arena, unit)
}

fn dump(source: &str, main_module: bool) -> String {
    let mut arena = Arena::new();
    let module = parse(&mut arena, source).unwrap();
    let unit = ast_to_asr(&mut arena, &module, main_module, false).unwrap();
    pickle_asr(&arena.asr, &unit, PickleOptions::default())
}

fn semantic_error(source: &str) -> String {
    let mut arena = Arena::new();
    let module = parse(&mut arena, source).unwrap();
    let diagnostics = ast_to_asr(&mut arena, &module, false, false).unwrap_err();
    diagnostics.first().unwrap().message.clone()
}

/// Folded value of the right-hand side of the last assignment.
fn folded(source: &str) -> Option<String> {
    let (arena, unit) = analyze(source);
    let last = *unit.body.last().unwrap();
    let StmtKind::Assignment { value, .. } = &arena.asr.stmt(last).kind else {
        panic!("last statement is not an assignment");
    };
    arena
        .asr
        .value_of(*value)
        .map(|id| pickle_asr_expr(&arena.asr, id, PickleOptions::default()))
}

fn global_type(arena: &Arena, unit: &TranslationUnit, name: &str) -> Option<Ttype> {
    let symbol = arena.asr.scope(unit.global_scope).get(name)?;
    arena.asr.symbol(symbol).ty()
}

#[test]
fn test_main_program_dump() {
    assert_eq!(
        dump("x = 1 + 2\n", true),
        "(TranslationUnit (SymbolTable 1 [(Program main_program [(Assignment (Var x) (BinOp (IntegerConstant 1 i64) Add (IntegerConstant 2 i64) i64 (IntegerConstant 3 i64)))]) (Variable x Local i64)]) [])"
    );
}

#[test]
fn test_function_dump() {
    assert_eq!(
        dump("def add(a: int, b: int) -> int:\n    return a + b\n", false),
        "(TranslationUnit (SymbolTable 1 [(Function add (SymbolTable 2 [(Variable a In i64) (Variable b In i64)]) [(Var a) (Var b)] i64 [(Return (BinOp (Var a) Add (Var b) i64 ()))])]) [])"
    );
}

#[test]
fn test_variable_types_are_inferred() {
    let (arena, unit) = analyze("a = 1\nb = 2.5\nc = True\nd = 'hi'\ne = [1, 2]\nf = 1j\n");
    assert_eq!(global_type(&arena, &unit, "a"), Some(INTEGER));
    assert_eq!(global_type(&arena, &unit, "b"), Some(REAL));
    assert_eq!(global_type(&arena, &unit, "c"), Some(Ttype::Logical));
    assert_eq!(global_type(&arena, &unit, "d"), Some(Ttype::Character));
    assert_eq!(
        global_type(&arena, &unit, "e"),
        Some(Ttype::Array(Box::new(INTEGER)))
    );
    assert_eq!(global_type(&arena, &unit, "f").unwrap().to_string(), "c64");
}

#[test]
fn test_annotations_fix_the_type() {
    let (arena, unit) = analyze("x: float = 1\ny: list[int] = []\nz: dict[str, i32] = {'a': 1}\n");
    assert_eq!(global_type(&arena, &unit, "x"), Some(REAL));
    assert_eq!(global_type(&arena, &unit, "y").unwrap().to_string(), "list[i64]");
    assert_eq!(
        global_type(&arena, &unit, "z").unwrap().to_string(),
        "dict[str, i32]"
    );
}

#[test]
fn test_integer_widens_to_real_on_assignment() {
    let out = dump("x = 1.0\nx = 2\n", false);
    assert!(out.contains(
        "(Assignment (Var x) (Cast (IntegerConstant 2 i64) IntegerToReal f64 (RealConstant 2.0 f64)))"
    ));
}

#[test]
fn test_arithmetic_folding() {
    assert_eq!(folded("x = 2 * 3 + 4\n").unwrap(), "(IntegerConstant 10 i64)");
    assert_eq!(folded("x = 1 / 2\n").unwrap(), "(RealConstant 0.5 f64)");
    assert_eq!(folded("x = -7 // 2\n").unwrap(), "(IntegerConstant -4 i64)");
    assert_eq!(folded("x = 7 % -3\n").unwrap(), "(IntegerConstant -2 i64)");
    assert_eq!(folded("x = 1 + 2.5\n").unwrap(), "(RealConstant 3.5 f64)");
    assert_eq!(folded("x = True + True\n").unwrap(), "(IntegerConstant 2 i64)");
    assert_eq!(folded("x = 'ab' + 'c'\n").unwrap(), "(StringConstant \"abc\" str)");
}

#[test]
fn test_power_folding() {
    assert_eq!(folded("x = 2 ** 10\n").unwrap(), "(IntegerConstant 1024 i64)");
    assert_eq!(folded("x = 2 ** -1\n").unwrap(), "(RealConstant 0.5 f64)");
    let (arena, unit) = analyze("x = 2 ** -1\n");
    assert_eq!(global_type(&arena, &unit, "x"), Some(REAL));
}

#[test]
fn test_no_folding_through_variables() {
    assert_eq!(folded("a = 1\nb = a + 1\n"), None);
}

#[test]
fn test_comparison_folding() {
    assert_eq!(folded("x = 1 < 2 < 3\n").unwrap(), "(LogicalConstant True bool)");
    assert_eq!(folded("x = 3 > 2 > 5\n").unwrap(), "(LogicalConstant False bool)");
    assert_eq!(folded("x = 'a' in 'abc'\n").unwrap(), "(LogicalConstant True bool)");
    assert_eq!(folded("x = 3 not in [1, 2]\n").unwrap(), "(LogicalConstant True bool)");
    assert_eq!(folded("x = not (True and False)\n").unwrap(), "(LogicalConstant True bool)");
}

#[test]
fn test_intrinsic_folding() {
    assert_eq!(folded("x = abs(-5)\n").unwrap(), "(IntegerConstant 5 i64)");
    assert_eq!(folded("x = abs(-2.5)\n").unwrap(), "(RealConstant 2.5 f64)");
    assert_eq!(folded("x = len('abc')\n").unwrap(), "(IntegerConstant 3 i64)");
    assert_eq!(folded("x = len([1, 2, 2])\n").unwrap(), "(IntegerConstant 3 i64)");
    assert_eq!(folded("x = len({1, 1, 2})\n").unwrap(), "(IntegerConstant 3 i64)");
    assert_eq!(folded("x = len({1: 2, 1: 3})\n").unwrap(), "(IntegerConstant 2 i64)");
    assert_eq!(folded("x = str(42)\n").unwrap(), "(StringConstant \"42\" str)");
    assert_eq!(folded("x = str(True)\n").unwrap(), "(StringConstant \"True\" str)");
    assert_eq!(folded("x = bool(0)\n").unwrap(), "(LogicalConstant False bool)");
    assert_eq!(folded("x = bool('a')\n").unwrap(), "(LogicalConstant True bool)");
    assert_eq!(folded("x = round(2.5)\n").unwrap(), "(IntegerConstant 2 i64)");
    assert_eq!(folded("x = round(3.5)\n").unwrap(), "(IntegerConstant 4 i64)");
    assert_eq!(folded("x = pow(2, 3)\n").unwrap(), "(IntegerConstant 8 i64)");
    assert_eq!(folded("x = pow(2, -1)\n").unwrap(), "(RealConstant 0.5 f64)");
    assert_eq!(folded("x = min('b', 'a')\n").unwrap(), "(StringConstant \"a\" str)");
}

#[test]
fn test_extremes_return_first_winning_argument() {
    for (source, intrinsic, winner) in [
        ("x = max(3, 7, 2)\n", "max", 1),
        ("x = max(3, 7, 7)\n", "max", 1),
        ("x = min(2, 1, 1)\n", "min", 1),
    ] {
        let (arena, unit) = analyze(source);
        let StmtKind::Assignment { value, .. } = &arena.asr.stmt(unit.body[0]).kind else {
            panic!("expected an assignment");
        };
        let call = arena.asr.expr(*value);
        let ExprKind::IntrinsicCall { name, args } = &call.kind else {
            panic!("expected an intrinsic call");
        };
        assert_eq!(*name, intrinsic);
        assert_eq!(call.value, Some(args[winner]));
    }
    assert_eq!(folded("x = min(2, 1, 1)\n").unwrap(), "(IntegerConstant 1 i64)");
}

#[test]
fn test_extremes_need_an_argument() {
    assert_eq!(semantic_error("x = max()\n"), "max() expects at least one argument");
    assert_eq!(semantic_error("x = min()\n"), "min() expects at least one argument");
}

#[test]
fn test_complex_intrinsics() {
    assert_eq!(folded("x = abs(3 + 4j)\n").unwrap(), "(RealConstant 5.0 f64)");
    assert_eq!(folded("x = bool(0j)\n").unwrap(), "(LogicalConstant False bool)");
    assert_eq!(folded("x = bool(2j)\n").unwrap(), "(LogicalConstant True bool)");
}

#[test]
fn test_negative_integer_power_is_real() {
    let (arena, unit) = analyze("a: int = 3\nb = a ** -1\nc = pow(a, -2)\nd = a ** 2\n");
    assert_eq!(global_type(&arena, &unit, "b"), Some(REAL));
    assert_eq!(global_type(&arena, &unit, "c"), Some(REAL));
    assert_eq!(global_type(&arena, &unit, "d"), Some(INTEGER));

    assert_eq!(
        semantic_error("def f(a: int) -> int:\n    return a ** -1\n"),
        "types do not match: expected 'i64', received 'f64'"
    );
}

#[test]
fn test_pow_folding_respects_integer_width() {
    let byte = Ttype::Integer { bits: 8 };
    let span = Span::new(0, 0);
    let pow = intrinsics::lookup("pow").unwrap();
    let mut asr = AsrArena::default();

    let base = Scalar::Integer(2).alloc(&mut asr, byte.clone(), span);
    let fits = Scalar::Integer(6).alloc(&mut asr, byte.clone(), span);
    let value = pow.comptime_eval(&mut asr, span, &[base, fits]).unwrap().unwrap();
    assert_eq!(asr.expr(value).kind, ExprKind::IntegerConstant(64));
    assert_eq!(asr.expr(value).ty, byte);

    let too_big = Scalar::Integer(7).alloc(&mut asr, byte, span);
    let error = pow.comptime_eval(&mut asr, span, &[base, too_big]).unwrap_err();
    assert_eq!(error.get_kind(), &ErrorImpl::ConstantOverflow);
}

#[test]
fn test_intrinsic_errors() {
    assert_eq!(
        semantic_error("x = pow(0, -1)\n"),
        "0.0 cannot be raised to a negative power."
    );
    assert_eq!(
        semantic_error("x = abs('a')\n"),
        "Argument of the abs function must be Integer, Real, Logical or Complex"
    );
    assert_eq!(
        semantic_error("x = max(1, 'a')\n"),
        "type of arg in index [1] is not comparable"
    );
    assert_eq!(
        semantic_error("x = str(1, 2)\n"),
        "str() takes at most one argument (2 given)"
    );
    assert_eq!(
        semantic_error("x = len(1)\n"),
        "len() only works on strings, lists, tuples, dictionaries and sets"
    );
    assert_eq!(
        semantic_error("x = abs(x=1)\n"),
        "abs() takes no keyword arguments"
    );
}

#[test]
fn test_constant_errors() {
    assert_eq!(semantic_error("x = 1 // 0\n"), "division by zero in constant expression");
    assert_eq!(semantic_error("x = 5 % 0\n"), "division by zero in constant expression");
    assert_eq!(
        semantic_error("x = 9223372036854775807 + 1\n"),
        "integer overflow in constant expression"
    );
    assert_eq!(semantic_error("x = 1 << -1\n"), "negative shift count");
    assert_eq!(
        semantic_error("x: i8 = 300\n"),
        "integer overflow in constant expression"
    );
}

#[test]
fn test_type_errors() {
    assert_eq!(
        semantic_error("x = 'a' + 1\n"),
        "type mismatch in binary operation: 'str' and 'i64'"
    );
    assert_eq!(
        semantic_error("x = 1\nx = 'a'\n"),
        "types do not match: expected 'i64', received 'str'"
    );
    assert_eq!(
        semantic_error("x = 1\nx = 2.5\n"),
        "types do not match: expected 'i64', received 'f64'"
    );
    assert_eq!(
        semantic_error("x = [1, 'a']\n"),
        "types do not match: expected 'i64', received 'str'"
    );
    assert_eq!(
        semantic_error("x = 'a' - 'b'\n"),
        "operator '-' is not supported for 'str'"
    );
    assert_eq!(
        semantic_error("x = 1j < 2j\n"),
        "operator '<' is not supported for 'c64'"
    );
}

#[test]
fn test_name_errors() {
    assert_eq!(semantic_error("y = z + 1\n"), "variable \"z\" not declared");
    assert_eq!(
        semantic_error("x: int = 1\nx: int = 2\n"),
        "variable \"x\" already declared with type 'i64'"
    );
    assert_eq!(semantic_error("x: foo = 1\n"), "unknown type foo found");
    assert_eq!(semantic_error("x: list[foo] = []\n"), "unknown type foo found");
}

#[test]
fn test_control_flow_errors() {
    assert_eq!(
        semantic_error("if 1:\n    pass\n"),
        "condition must be 'bool', received 'i64'"
    );
    assert_eq!(semantic_error("break\n"), "'break' outside loop");
    assert_eq!(semantic_error("return 1\n"), "'return' outside function");
    assert_eq!(
        semantic_error("while True:\n    pass\nelse:\n    pass\n"),
        "else clause on loops is not supported"
    );
    assert_eq!(semantic_error("for c in 5:\n    pass\n"), "'i64' is not iterable");
    assert_eq!(
        semantic_error("for i in range(0, 10, 0):\n    pass\n"),
        "range() arg 3 must not be zero"
    );
}

#[test]
fn test_function_errors() {
    let add = "def f(a: int) -> int:\n    return a\n";
    assert_eq!(
        semantic_error("def f(a):\n    pass\n"),
        "parameter \"a\" needs a type annotation"
    );
    assert_eq!(
        semantic_error(&format!("{add}x = f(1, 2)\n")),
        "\"f\" takes 1 arguments, received 2"
    );
    assert_eq!(
        semantic_error(&format!("{add}x = f('s')\n")),
        "argument 0 of \"f\" expects 'i64', received 'str'"
    );
    assert_eq!(
        semantic_error(&format!("{add}def f() -> int:\n    return 1\n")),
        "function \"f\" already declared"
    );
    assert_eq!(
        semantic_error("def g() -> None:\n    pass\nx = g()\n"),
        "function \"g\" does not return a value"
    );
    assert_eq!(
        semantic_error("def g() -> int:\n    return\n"),
        "function \"g\" must return a value of type 'i64'"
    );
    assert_eq!(
        semantic_error("def g():\n    return 1\n"),
        "function \"g\" does not declare a return type"
    );
}

#[test]
fn test_collection_errors() {
    assert_eq!(
        semantic_error("x = []\n"),
        "cannot infer the element type of an empty list without an annotation"
    );
    assert_eq!(
        semantic_error("x = (1, 2)\ny = x[5]\n"),
        "index 5 is out of range for 'tuple[i64, i64]'"
    );
    assert_eq!(semantic_error("x = 1\ny = x[0]\n"), "'i64' is not subscriptable");
    assert_eq!(semantic_error("x = 1\ny = x(0)\n"), "\"x\" is not callable");
}

#[test]
fn test_functions_may_be_called_before_their_definition() {
    let (arena, unit) = analyze("x = twice(4)\ndef twice(n: int) -> int:\n    return n * 2\n");
    assert_eq!(global_type(&arena, &unit, "x"), Some(INTEGER));
    assert_eq!(
        global_type(&arena, &unit, "twice"),
        Some(Ttype::Function(Box::new(Signature {
            params: Box::new([INTEGER]),
            returns: Some(INTEGER),
        })))
    );
}

#[test]
fn test_function_arguments_are_cast() {
    let out = dump("def f(a: float) -> float:\n    return a\nx = f(1)\n", false);
    assert!(out.contains(
        "(FunctionCall f [(Cast (IntegerConstant 1 i64) IntegerToReal f64 (RealConstant 1.0 f64))] f64 ())"
    ));
}

#[test]
fn test_subroutine_call_statement() {
    let out = dump("def show(a: int):\n    print(a)\nshow(1)\n", false);
    assert!(out.contains("(SubroutineCall show [(IntegerConstant 1 i64)])"));
    assert!(out.contains("[(Print [(Var a)])]"));
}

#[test]
fn test_range_loop_lowers_to_do_loop() {
    let out = dump("for i in range(10):\n    print(i)\n", false);
    assert!(out.contains(
        "(DoLoop (Var i) (IntegerConstant 0 i64) (IntegerConstant 10 i64) (IntegerConstant 1 i64) [(Print [(Var i)])])"
    ));
}

#[test]
fn test_for_each_over_collections() {
    let (arena, unit) = analyze("for c in 'abc':\n    pass\nfor k in {'a': 1}:\n    continue\n");
    assert_eq!(global_type(&arena, &unit, "c"), Some(Ttype::Character));
    assert_eq!(global_type(&arena, &unit, "k"), Some(Ttype::Character));
    assert!(matches!(
        arena.asr.stmt(unit.body[1]).kind,
        StmtKind::ForEach { .. }
    ));
}

#[test]
fn test_tuple_unpacking_and_chained_assignment() {
    let (arena, unit) = analyze("a, b = 1, 'x'\nc = d = 2.0\n");
    assert_eq!(global_type(&arena, &unit, "a"), Some(INTEGER));
    assert_eq!(global_type(&arena, &unit, "b"), Some(Ttype::Character));
    assert_eq!(global_type(&arena, &unit, "d"), Some(REAL));
    assert_eq!(unit.body.len(), 3);
}

#[test]
fn test_augmented_assignment() {
    let out = dump("x = 1.5\nx += 1\n", false);
    assert!(out.contains(
        "(Assignment (Var x) (BinOp (Var x) Add (Cast (IntegerConstant 1 i64) IntegerToReal f64 (RealConstant 1.0 f64)) f64 ()))"
    ));
}

#[test]
fn test_raise_becomes_error_stop() {
    let out = dump("x = 1\nif x > 0:\n    raise ValueError('bad')\n", false);
    assert!(out.contains("[(ErrorStop)]"));
}

#[test]
fn test_imports_resolve_through_interfaces() {
    let source = "import m\nfrom m import g as h\nx = h(m.v)\n";
    let mut arena = Arena::new();
    let module = parse(&mut arena, source).unwrap();
    let interface = ModuleInterface::new("m")
        .with_symbol("v", INTEGER)
        .with_symbol(
            "g",
            Ttype::Function(Box::new(Signature {
                params: Box::new([INTEGER]),
                returns: Some(REAL),
            })),
        );
    let unit = SemanticAnalyzer::new(&mut arena)
        .with_interface(interface)
        .analyze(&module, false, false)
        .unwrap();

    let scope = arena.asr.scope(unit.global_scope);
    let names: Vec<&str> = scope.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["h", "m", "m.v", "x"]);
    assert!(matches!(
        arena.asr.symbol(scope.get("h").unwrap()),
        Symbol::ExternalSymbol(external) if external.original_name == "g"
    ));
    assert_eq!(global_type(&arena, &unit, "x"), Some(REAL));
}

#[test]
fn test_import_errors() {
    assert_eq!(semantic_error("import m\n"), "module \"m\" not found");

    let mut arena = Arena::new();
    let module = parse(&mut arena, "from m import w\n").unwrap();
    let diagnostics = SemanticAnalyzer::new(&mut arena)
        .with_interface(ModuleInterface::new("m"))
        .analyze(&module, false, false)
        .unwrap_err();
    assert_eq!(
        diagnostics.first().unwrap().message,
        "\"w\" is not exported by module \"m\""
    );
}

#[test]
fn test_interface_exports_globals_and_functions() {
    let (arena, unit) = analyze("x = 1\ndef f() -> int:\n    return x\n");
    let interface = unit.interface(&arena.asr, "lib");
    assert_eq!(interface.name, "lib");
    assert_eq!(interface.symbols.get("x"), Some(&INTEGER));
    assert!(matches!(interface.symbols.get("f"), Some(Ttype::Function(_))));
}

#[test]
fn test_symtab_only_skips_bodies() {
    let mut arena = Arena::new();
    let module = parse(
        &mut arena,
        "def f(a: int) -> int:\n    return a + undefined\ny: int\nx = 1\n",
    )
    .unwrap();
    let unit = ast_to_asr(&mut arena, &module, false, true).unwrap();

    assert!(unit.body.is_empty());
    let scope = arena.asr.scope(unit.global_scope);
    assert!(scope.contains("f"));
    assert!(scope.contains("y"));
    assert!(!scope.contains("x"));
    let Symbol::Function(function) = arena.asr.symbol(scope.get("f").unwrap()) else {
        panic!("f is not a function");
    };
    assert!(function.body.is_empty());
}

#[test]
fn test_errors_carry_the_offending_span() {
    let mut arena = Arena::new();
    let module = parse(&mut arena, "x = 1\ny = x + 'a'\n").unwrap();
    let diagnostics = ast_to_asr(&mut arena, &module, true, false).unwrap_err();
    let diagnostic = diagnostics.first().unwrap();
    assert_eq!(diagnostic.primary_span(), Some(crate::Span::new(10, 16)));
}

#[test]
fn test_promote_joins_numeric_families() {
    assert_eq!(promote(&INTEGER, &REAL), Some(REAL));
    assert_eq!(
        promote(&Ttype::Integer { bits: 32 }, &INTEGER),
        Some(INTEGER)
    );
    assert_eq!(promote(&INTEGER, &Ttype::Character), None);
}
