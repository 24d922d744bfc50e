use crate::Span;

use super::{
    ast::{ExprId, StmtId},
    expressions::Operator,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub annotation: Option<ExprId>,
    pub span: Span,
}

/// `name [as asname]` in an import list.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `a = b = value` has two targets.
    Assign {
        targets: Box<[ExprId]>,
        value: ExprId,
    },
    AnnotatedAssign {
        target: ExprId,
        annotation: ExprId,
        value: Option<ExprId>,
    },
    AugmentedAssign {
        target: ExprId,
        op: Operator,
        value: ExprId,
    },
    /// `elif` chains nest as a single `If` in `orelse`.
    If {
        test: ExprId,
        body: Box<[StmtId]>,
        orelse: Box<[StmtId]>,
    },
    For {
        target: ExprId,
        iter: ExprId,
        body: Box<[StmtId]>,
        orelse: Box<[StmtId]>,
    },
    While {
        test: ExprId,
        body: Box<[StmtId]>,
        orelse: Box<[StmtId]>,
    },
    FunctionDef {
        name: String,
        args: Box<[Arg]>,
        returns: Option<ExprId>,
        body: Box<[StmtId]>,
    },
    Return(Option<ExprId>),
    Import(Box<[Alias]>),
    ImportFrom {
        module: String,
        names: Box<[Alias]>,
    },
    Raise(Option<ExprId>),
    Pass,
    Break,
    Continue,
    Expr(ExprId),
}
