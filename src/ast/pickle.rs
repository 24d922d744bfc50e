use crate::pickle::{PickleOptions, Pickler};

use super::{
    ast::{AstArena, ExprId, Module, StmtId},
    expressions::ExprKind,
    statements::{Alias, StmtKind},
};

/// Renders a parsed module as an S-expression, e.g.
/// `(Module [(Assign [(Name x Store)] (BinOp (ConstantInt 1) Add (ConstantInt 2)))])`.
pub fn pickle_ast(arena: &AstArena, module: &Module, options: PickleOptions) -> String {
    let mut pickler = Pickler::new(options);
    pickler.open("Module");
    pickle_block(&mut pickler, arena, &module.body);
    pickler.close();
    pickler.finish()
}

/// Renders a single expression subtree.
pub fn pickle_expr(arena: &AstArena, id: ExprId, options: PickleOptions) -> String {
    let mut pickler = Pickler::new(options);
    expr(&mut pickler, arena, id);
    pickler.finish()
}

fn pickle_block(p: &mut Pickler, arena: &AstArena, body: &[StmtId]) {
    p.open_list();
    for id in body {
        stmt(p, arena, *id);
    }
    p.close_list();
}

fn expr_list(p: &mut Pickler, arena: &AstArena, ids: &[ExprId]) {
    p.open_list();
    for id in ids {
        expr(p, arena, *id);
    }
    p.close_list();
}

fn optional_expr(p: &mut Pickler, arena: &AstArena, id: Option<ExprId>) {
    match id {
        Some(id) => expr(p, arena, id),
        None => p.none(),
    }
}

fn aliases(p: &mut Pickler, names: &[Alias]) {
    p.open_list();
    for alias in names {
        p.open("alias");
        p.atom(&alias.name);
        match &alias.asname {
            Some(asname) => p.atom(asname),
            None => p.none(),
        }
        p.close();
    }
    p.close_list();
}

fn stmt(p: &mut Pickler, arena: &AstArena, id: StmtId) {
    match &arena.stmt(id).kind {
        StmtKind::Assign { targets, value } => {
            p.open("Assign");
            expr_list(p, arena, targets);
            expr(p, arena, *value);
        }
        StmtKind::AnnotatedAssign {
            target,
            annotation,
            value,
        } => {
            p.open("AnnAssign");
            expr(p, arena, *target);
            expr(p, arena, *annotation);
            optional_expr(p, arena, *value);
        }
        StmtKind::AugmentedAssign { target, op, value } => {
            p.open("AugAssign");
            expr(p, arena, *target);
            p.atom(op);
            expr(p, arena, *value);
        }
        StmtKind::If { test, body, orelse } => {
            p.open("If");
            expr(p, arena, *test);
            pickle_block(p, arena, body);
            pickle_block(p, arena, orelse);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            p.open("For");
            expr(p, arena, *target);
            expr(p, arena, *iter);
            pickle_block(p, arena, body);
            pickle_block(p, arena, orelse);
        }
        StmtKind::While { test, body, orelse } => {
            p.open("While");
            expr(p, arena, *test);
            pickle_block(p, arena, body);
            pickle_block(p, arena, orelse);
        }
        StmtKind::FunctionDef {
            name,
            args,
            returns,
            body,
        } => {
            p.open("FunctionDef");
            p.atom(name);
            p.open_list();
            for arg in args.iter() {
                p.open("arg");
                p.atom(&arg.name);
                optional_expr(p, arena, arg.annotation);
                p.close();
            }
            p.close_list();
            optional_expr(p, arena, *returns);
            pickle_block(p, arena, body);
        }
        StmtKind::Return(value) => {
            p.open("Return");
            optional_expr(p, arena, *value);
        }
        StmtKind::Import(names) => {
            p.open("Import");
            aliases(p, names);
        }
        StmtKind::ImportFrom { module, names } => {
            p.open("ImportFrom");
            p.atom(module);
            aliases(p, names);
        }
        StmtKind::Raise(value) => {
            p.open("Raise");
            optional_expr(p, arena, *value);
        }
        StmtKind::Pass => p.open("Pass"),
        StmtKind::Break => p.open("Break"),
        StmtKind::Continue => p.open("Continue"),
        StmtKind::Expr(value) => {
            p.open("Expr");
            expr(p, arena, *value);
        }
    }
    p.close();
}

fn expr(p: &mut Pickler, arena: &AstArena, id: ExprId) {
    match &arena.expr(id).kind {
        ExprKind::BinaryOp { left, op, right } => {
            p.open("BinOp");
            expr(p, arena, *left);
            p.atom(op);
            expr(p, arena, *right);
        }
        ExprKind::BoolOp { op, values } => {
            p.open("BoolOp");
            p.atom(op);
            expr_list(p, arena, values);
        }
        ExprKind::UnaryOp { op, operand } => {
            p.open("UnaryOp");
            p.atom(op);
            expr(p, arena, *operand);
        }
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => {
            p.open("Compare");
            expr(p, arena, *left);
            p.open_list();
            for op in ops.iter() {
                p.atom(op);
            }
            p.close_list();
            expr_list(p, arena, comparators);
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            p.open("Call");
            expr(p, arena, *func);
            expr_list(p, arena, args);
            p.open_list();
            for keyword in keywords.iter() {
                p.open("keyword");
                p.atom(&keyword.arg);
                expr(p, arena, keyword.value);
                p.close();
            }
            p.close_list();
        }
        ExprKind::Name { id, ctx } => {
            p.open("Name");
            p.atom(id);
            p.atom(ctx);
        }
        ExprKind::Attribute { value, attr, ctx } => {
            p.open("Attribute");
            expr(p, arena, *value);
            p.atom(attr);
            p.atom(ctx);
        }
        ExprKind::Subscript { value, slice, ctx } => {
            p.open("Subscript");
            expr(p, arena, *value);
            expr(p, arena, *slice);
            p.atom(ctx);
        }
        ExprKind::Slice { lower, upper, step } => {
            p.open("Slice");
            optional_expr(p, arena, *lower);
            optional_expr(p, arena, *upper);
            optional_expr(p, arena, *step);
        }
        ExprKind::IntegerLiteral(value) => {
            p.open("ConstantInt");
            p.literal(value);
        }
        ExprKind::FloatLiteral(value) => {
            p.open("ConstantFloat");
            p.literal(format!("{:?}", value));
        }
        ExprKind::ComplexLiteral(imaginary) => {
            p.open("ConstantComplex");
            p.literal(format!("{:?}j", imaginary));
        }
        ExprKind::StringLiteral(value) => {
            p.open("ConstantStr");
            p.literal(format!("{:?}", value));
        }
        ExprKind::BoolLiteral(value) => {
            p.open("ConstantBool");
            p.literal(if *value { "True" } else { "False" });
        }
        ExprKind::NoneLiteral => p.open("ConstantNone"),
        ExprKind::Tuple { elements, ctx } => {
            p.open("Tuple");
            expr_list(p, arena, elements);
            p.atom(ctx);
        }
        ExprKind::List { elements, ctx } => {
            p.open("List");
            expr_list(p, arena, elements);
            p.atom(ctx);
        }
        ExprKind::Dict { keys, values } => {
            p.open("Dict");
            expr_list(p, arena, keys);
            expr_list(p, arena, values);
        }
        ExprKind::Set { elements } => {
            p.open("Set");
            expr_list(p, arena, elements);
        }
    }
    p.close();
}
