use crate::{
    arena::{Idx, Pool},
    Span,
};

use super::{
    expressions::{Expr, ExprKind},
    statements::{Stmt, StmtKind},
};

pub type ExprId = Idx<Expr>;
pub type StmtId = Idx<Stmt>;

/// Storage for the syntax tree of one compilation unit.
#[derive(Debug, Default)]
pub struct AstArena {
    pub exprs: Pool<Expr>,
    pub stmts: Pool<Stmt>,
}

impl AstArena {
    pub fn with_capacity(capacity: usize) -> Self {
        AstArena {
            exprs: Pool::with_capacity(capacity),
            stmts: Pool::with_capacity(capacity / 4 + 1),
        }
    }

    pub fn alloc_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.exprs.alloc(Expr { kind, span })
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.stmts.alloc(Stmt { kind, span })
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }
}

/// Root of a parsed compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Box<[StmtId]>,
    /// First to last top-level statement; `0:0` for an empty module.
    pub span: Span,
}
