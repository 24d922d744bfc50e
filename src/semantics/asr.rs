//! Abstract Semantic Representation: the typed tree produced by
//! [`ast_to_asr`](super::ast_to_asr::ast_to_asr).
//!
//! Every expression carries its resolved [`Ttype`] and, when it is known at
//! compile time, a handle to the constant node holding its value. Folding
//! never replaces a node; the original operator and operands stay in place
//! next to the folded value.

use std::collections::BTreeMap;

use crate::{
    arena::{Idx, Pool},
    ast::expressions::{BoolOperator, CompareOperator, Operator, UnaryOperator},
    Span,
};

use super::{
    symbol_table::{Symbol, SymbolTable},
    types::{Family, Ttype},
};

pub type ExprId = Idx<Expr>;
pub type StmtId = Idx<Stmt>;
pub type SymbolId = Idx<Symbol>;
pub type ScopeId = Idx<SymbolTable>;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Ttype,
    /// Compile-time value. Literal constants are their own value and leave
    /// this empty; see [`AsrArena::value_of`].
    pub value: Option<ExprId>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    LogicalToInteger,
    LogicalToReal,
    LogicalToComplex,
    IntegerToInteger,
    IntegerToReal,
    IntegerToComplex,
    RealToReal,
    RealToComplex,
    ComplexToComplex,
}

impl CastKind {
    pub fn between(from: Family, to: Family) -> Option<CastKind> {
        let kind = match (from, to) {
            (Family::Logical, Family::Integer) => CastKind::LogicalToInteger,
            (Family::Logical, Family::Real) => CastKind::LogicalToReal,
            (Family::Logical, Family::Complex) => CastKind::LogicalToComplex,
            (Family::Integer, Family::Integer) => CastKind::IntegerToInteger,
            (Family::Integer, Family::Real) => CastKind::IntegerToReal,
            (Family::Integer, Family::Complex) => CastKind::IntegerToComplex,
            (Family::Real, Family::Real) => CastKind::RealToReal,
            (Family::Real, Family::Complex) => CastKind::RealToComplex,
            (Family::Complex, Family::Complex) => CastKind::ComplexToComplex,
            _ => return None,
        };
        Some(kind)
    }
}

impl std::fmt::Display for CastKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntegerConstant(i64),
    RealConstant(f64),
    ComplexConstant { re: f64, im: f64 },
    LogicalConstant(bool),
    StringConstant(String),
    ListConstant(Box<[ExprId]>),
    TupleConstant(Box<[ExprId]>),
    DictConstant {
        keys: Box<[ExprId]>,
        values: Box<[ExprId]>,
    },
    SetConstant(Box<[ExprId]>),
    Var(SymbolId),
    BinOp {
        left: ExprId,
        op: Operator,
        right: ExprId,
    },
    StringConcat {
        left: ExprId,
        right: ExprId,
    },
    Compare {
        left: ExprId,
        op: CompareOperator,
        right: ExprId,
    },
    Membership {
        element: ExprId,
        container: ExprId,
        negated: bool,
    },
    LogicalBinOp {
        left: ExprId,
        op: BoolOperator,
        right: ExprId,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: ExprId,
    },
    Cast {
        arg: ExprId,
        kind: CastKind,
    },
    IntrinsicCall {
        name: &'static str,
        args: Box<[ExprId]>,
    },
    FunctionCall {
        function: SymbolId,
        args: Box<[ExprId]>,
    },
    Item {
        value: ExprId,
        index: ExprId,
    },
    Section {
        value: ExprId,
        lower: Option<ExprId>,
        upper: Option<ExprId>,
        step: Option<ExprId>,
    },
}

impl ExprKind {
    /// Scalar literal nodes.
    pub fn is_scalar_constant(&self) -> bool {
        matches!(
            self,
            ExprKind::IntegerConstant(_)
                | ExprKind::RealConstant(_)
                | ExprKind::ComplexConstant { .. }
                | ExprKind::LogicalConstant(_)
                | ExprKind::StringConstant(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Assignment {
        target: ExprId,
        value: ExprId,
    },
    If {
        test: ExprId,
        body: Box<[StmtId]>,
        orelse: Box<[StmtId]>,
    },
    WhileLoop {
        test: ExprId,
        body: Box<[StmtId]>,
    },
    /// `for var in range(start, end, step)`; `end` is exclusive.
    DoLoop {
        var: ExprId,
        start: ExprId,
        end: ExprId,
        step: ExprId,
        body: Box<[StmtId]>,
    },
    ForEach {
        var: ExprId,
        container: ExprId,
        body: Box<[StmtId]>,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Print(Box<[ExprId]>),
    SubroutineCall {
        function: SymbolId,
        args: Box<[ExprId]>,
    },
    ExprStmt(ExprId),
    ErrorStop,
}

/// Storage for the typed tree and its symbol tables.
#[derive(Debug, Default)]
pub struct AsrArena {
    pub exprs: Pool<Expr>,
    pub stmts: Pool<Stmt>,
    pub symbols: Pool<Symbol>,
    pub scopes: Pool<SymbolTable>,
}

impl AsrArena {
    pub fn with_capacity(capacity: usize) -> Self {
        AsrArena {
            exprs: Pool::with_capacity(capacity),
            stmts: Pool::with_capacity(capacity / 4 + 1),
            symbols: Pool::new(),
            scopes: Pool::new(),
        }
    }

    pub fn alloc_expr(&mut self, kind: ExprKind, ty: Ttype, value: Option<ExprId>, span: Span) -> ExprId {
        self.exprs.alloc(Expr {
            kind,
            ty,
            value,
            span,
        })
    }

    pub fn alloc_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.stmts.alloc(Stmt { kind, span })
    }

    pub fn alloc_symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.alloc(symbol)
    }

    pub fn alloc_scope(&mut self, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.alloc(SymbolTable::new(parent))
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

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn scope(&self, id: ScopeId) -> &SymbolTable {
        &self.scopes[id]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut SymbolTable {
        &mut self.scopes[id]
    }

    /// Resolves `name` in `scope` or any enclosing scope.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = self.scope(id);
            if let Some(symbol) = table.get(name) {
                return Some(symbol);
            }
            current = table.parent;
        }
        None
    }

    /// Whether `id` is a literal: a scalar constant, or a collection
    /// display whose elements are all literals.
    pub fn is_literal(&self, id: ExprId) -> bool {
        match &self.expr(id).kind {
            kind if kind.is_scalar_constant() => true,
            ExprKind::ListConstant(elements)
            | ExprKind::TupleConstant(elements)
            | ExprKind::SetConstant(elements) => elements.iter().all(|e| self.is_literal(*e)),
            ExprKind::DictConstant { keys, values } => keys
                .iter()
                .chain(values.iter())
                .all(|e| self.is_literal(*e)),
            _ => false,
        }
    }

    /// Compile-time value of `id`: the node itself for literals, otherwise
    /// its folded value if any.
    pub fn value_of(&self, id: ExprId) -> Option<ExprId> {
        if self.is_literal(id) {
            return Some(id);
        }
        self.expr(id).value
    }
}

/// Result of analysing one compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationUnit {
    pub global_scope: ScopeId,
    /// Top-level statements when the unit is not the main module. For the
    /// main module they live in the `main_program` symbol instead.
    pub body: Box<[StmtId]>,
    pub is_main: bool,
}

impl TranslationUnit {
    /// Exported names of this unit, for importing it into another one.
    /// Functions and global variables are exported; imported names are not.
    pub fn interface(&self, asr: &AsrArena, name: impl Into<String>) -> ModuleInterface {
        let mut symbols = BTreeMap::new();
        for (symbol_name, id) in asr.scope(self.global_scope).iter() {
            match asr.symbol(id) {
                Symbol::Variable(variable) => {
                    symbols.insert(symbol_name.to_string(), variable.ty.clone());
                }
                Symbol::Function(function) => {
                    symbols.insert(
                        symbol_name.to_string(),
                        Ttype::Function(Box::new(function.signature.clone())),
                    );
                }
                _ => {}
            }
        }
        ModuleInterface {
            name: name.into(),
            symbols,
        }
    }
}

/// What one module exposes to `import` statements in another.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModuleInterface {
    pub name: String,
    pub symbols: BTreeMap<String, Ttype>,
}

impl ModuleInterface {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleInterface {
            name: name.into(),
            symbols: BTreeMap::new(),
        }
    }

    pub fn with_symbol(mut self, name: impl Into<String>, ty: Ttype) -> Self {
        self.symbols.insert(name.into(), ty);
        self
    }
}
