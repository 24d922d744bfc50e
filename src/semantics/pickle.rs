use crate::pickle::{PickleOptions, Pickler};

use super::{
    asr::{AsrArena, ExprId, ExprKind, ScopeId, StmtId, StmtKind, TranslationUnit},
    symbol_table::Symbol,
};

/// Renders a translation unit as an S-expression. Symbol tables are
/// numbered from 1 in allocation order and list their symbols by name.
///
/// Every non-constant expression ends with its type and folded value, e.g.
/// `(BinOp (IntegerConstant 1 i64) Add (IntegerConstant 2 i64) i64 (IntegerConstant 3 i64))`.
pub fn pickle_asr(asr: &AsrArena, unit: &TranslationUnit, options: PickleOptions) -> String {
    let mut pickler = Pickler::new(options);
    pickler.open("TranslationUnit");
    symbol_table(&mut pickler, asr, unit.global_scope);
    block(&mut pickler, asr, &unit.body);
    pickler.close();
    pickler.finish()
}

/// Renders a single expression subtree.
pub fn pickle_asr_expr(asr: &AsrArena, id: ExprId, options: PickleOptions) -> String {
    let mut pickler = Pickler::new(options);
    expr(&mut pickler, asr, id);
    pickler.finish()
}

fn symbol_table(p: &mut Pickler, asr: &AsrArena, scope: ScopeId) {
    p.open("SymbolTable");
    p.atom(scope.index() + 1);
    p.open_list();
    for (_, id) in asr.scope(scope).iter() {
        symbol(p, asr, asr.symbol(id));
    }
    p.close_list();
    p.close();
}

fn symbol(p: &mut Pickler, asr: &AsrArena, symbol: &Symbol) {
    match symbol {
        Symbol::Variable(variable) => {
            p.open("Variable");
            p.atom(&variable.name);
            p.atom(variable.intent);
            p.atom(&variable.ty);
        }
        Symbol::Function(function) => {
            p.open("Function");
            p.atom(&function.name);
            symbol_table(p, asr, function.scope);
            p.open_list();
            for param in function.params.iter() {
                p.open("Var");
                p.atom(asr.symbol(*param).name());
                p.close();
            }
            p.close_list();
            match &function.signature.returns {
                Some(ty) => p.atom(ty),
                None => p.none(),
            }
            block(p, asr, &function.body);
        }
        Symbol::Program(program) => {
            p.open("Program");
            p.atom(&program.name);
            block(p, asr, &program.body);
        }
        Symbol::ExternalSymbol(external) => {
            p.open("ExternalSymbol");
            p.atom(&external.name);
            p.atom(&external.module);
            p.atom(&external.original_name);
            p.atom(&external.ty);
        }
        Symbol::ExternalModule { name, module } => {
            p.open("ExternalModule");
            p.atom(name);
            p.atom(module);
        }
    }
    p.close();
}

fn block(p: &mut Pickler, asr: &AsrArena, body: &[StmtId]) {
    p.open_list();
    for id in body {
        stmt(p, asr, *id);
    }
    p.close_list();
}

fn expr_list(p: &mut Pickler, asr: &AsrArena, ids: &[ExprId]) {
    p.open_list();
    for id in ids {
        expr(p, asr, *id);
    }
    p.close_list();
}

fn optional_expr(p: &mut Pickler, asr: &AsrArena, id: Option<ExprId>) {
    match id {
        Some(id) => expr(p, asr, id),
        None => p.none(),
    }
}

fn stmt(p: &mut Pickler, asr: &AsrArena, id: StmtId) {
    match &asr.stmt(id).kind {
        StmtKind::Assignment { target, value } => {
            p.open("Assignment");
            expr(p, asr, *target);
            expr(p, asr, *value);
        }
        StmtKind::If { test, body, orelse } => {
            p.open("If");
            expr(p, asr, *test);
            block(p, asr, body);
            block(p, asr, orelse);
        }
        StmtKind::WhileLoop { test, body } => {
            p.open("WhileLoop");
            expr(p, asr, *test);
            block(p, asr, body);
        }
        StmtKind::DoLoop {
            var,
            start,
            end,
            step,
            body,
        } => {
            p.open("DoLoop");
            expr(p, asr, *var);
            expr(p, asr, *start);
            expr(p, asr, *end);
            expr(p, asr, *step);
            block(p, asr, body);
        }
        StmtKind::ForEach {
            var,
            container,
            body,
        } => {
            p.open("ForEach");
            expr(p, asr, *var);
            expr(p, asr, *container);
            block(p, asr, body);
        }
        StmtKind::Return(value) => {
            p.open("Return");
            optional_expr(p, asr, *value);
        }
        StmtKind::Break => p.open("Break"),
        StmtKind::Continue => p.open("Continue"),
        StmtKind::Print(args) => {
            p.open("Print");
            expr_list(p, asr, args);
        }
        StmtKind::SubroutineCall { function, args } => {
            p.open("SubroutineCall");
            p.atom(asr.symbol(*function).name());
            expr_list(p, asr, args);
        }
        StmtKind::ExprStmt(value) => {
            p.open("ExprStmt");
            expr(p, asr, *value);
        }
        StmtKind::ErrorStop => p.open("ErrorStop"),
    }
    p.close();
}

fn expr(p: &mut Pickler, asr: &AsrArena, id: ExprId) {
    let node = asr.expr(id);
    match &node.kind {
        ExprKind::IntegerConstant(value) => {
            p.open("IntegerConstant");
            p.literal(value);
            p.atom(&node.ty);
            p.close();
            return;
        }
        ExprKind::RealConstant(value) => {
            p.open("RealConstant");
            p.literal(format!("{:?}", value));
            p.atom(&node.ty);
            p.close();
            return;
        }
        ExprKind::ComplexConstant { re, im } => {
            p.open("ComplexConstant");
            p.literal(format!("{:?}", re));
            p.literal(format!("{:?}", im));
            p.atom(&node.ty);
            p.close();
            return;
        }
        ExprKind::LogicalConstant(value) => {
            p.open("LogicalConstant");
            p.literal(if *value { "True" } else { "False" });
            p.atom(&node.ty);
            p.close();
            return;
        }
        ExprKind::StringConstant(value) => {
            p.open("StringConstant");
            p.literal(format!("{:?}", value));
            p.atom(&node.ty);
            p.close();
            return;
        }
        ExprKind::Var(symbol) => {
            p.open("Var");
            p.atom(asr.symbol(*symbol).name());
            p.close();
            return;
        }
        ExprKind::ListConstant(elements) => {
            p.open("ListConstant");
            expr_list(p, asr, elements);
        }
        ExprKind::TupleConstant(elements) => {
            p.open("TupleConstant");
            expr_list(p, asr, elements);
        }
        ExprKind::SetConstant(elements) => {
            p.open("SetConstant");
            expr_list(p, asr, elements);
        }
        ExprKind::DictConstant { keys, values } => {
            p.open("DictConstant");
            expr_list(p, asr, keys);
            expr_list(p, asr, values);
        }
        ExprKind::BinOp { left, op, right } => {
            p.open("BinOp");
            expr(p, asr, *left);
            p.atom(op);
            expr(p, asr, *right);
        }
        ExprKind::StringConcat { left, right } => {
            p.open("StringConcat");
            expr(p, asr, *left);
            expr(p, asr, *right);
        }
        ExprKind::Compare { left, op, right } => {
            p.open("Compare");
            expr(p, asr, *left);
            p.atom(op);
            expr(p, asr, *right);
        }
        ExprKind::Membership {
            element,
            container,
            negated,
        } => {
            p.open("Membership");
            expr(p, asr, *element);
            p.atom(if *negated { "NotIn" } else { "In" });
            expr(p, asr, *container);
        }
        ExprKind::LogicalBinOp { left, op, right } => {
            p.open("LogicalBinOp");
            expr(p, asr, *left);
            p.atom(op);
            expr(p, asr, *right);
        }
        ExprKind::UnaryOp { op, operand } => {
            p.open("UnaryOp");
            p.atom(op);
            expr(p, asr, *operand);
        }
        ExprKind::Cast { arg, kind } => {
            p.open("Cast");
            expr(p, asr, *arg);
            p.atom(kind);
        }
        ExprKind::IntrinsicCall { name, args } => {
            p.open("IntrinsicCall");
            p.atom(name);
            expr_list(p, asr, args);
        }
        ExprKind::FunctionCall { function, args } => {
            p.open("FunctionCall");
            p.atom(asr.symbol(*function).name());
            expr_list(p, asr, args);
        }
        ExprKind::Item { value, index } => {
            p.open("Item");
            expr(p, asr, *value);
            expr(p, asr, *index);
        }
        ExprKind::Section {
            value,
            lower,
            upper,
            step,
        } => {
            p.open("Section");
            expr(p, asr, *value);
            optional_expr(p, asr, *lower);
            optional_expr(p, asr, *upper);
            optional_expr(p, asr, *step);
        }
    }
    p.atom(&node.ty);
    optional_expr(p, asr, node.value);
    p.close();
}
