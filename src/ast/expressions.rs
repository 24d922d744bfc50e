use std::fmt::Display;

use crate::Span;

use super::ast::ExprId;

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Whether a name-like expression is read or written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Load,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Invert,
    Not,
    UAdd,
    USub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl Operator {
    /// Source spelling, for diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mult => "*",
            Operator::MatMult => "@",
            Operator::Div => "/",
            Operator::FloorDiv => "//",
            Operator::Mod => "%",
            Operator::Pow => "**",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
            Operator::BitOr => "|",
            Operator::BitXor => "^",
            Operator::BitAnd => "&",
        }
    }
}

impl CompareOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOperator::Eq => "==",
            CompareOperator::NotEq => "!=",
            CompareOperator::Lt => "<",
            CompareOperator::LtE => "<=",
            CompareOperator::Gt => ">",
            CompareOperator::GtE => ">=",
            CompareOperator::Is => "is",
            CompareOperator::IsNot => "is not",
            CompareOperator::In => "in",
            CompareOperator::NotIn => "not in",
        }
    }
}

// Debug names double as the pickle spelling.
impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for BoolOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for CompareOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Display for ExprContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// `name=value` argument of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyword {
    pub arg: String,
    pub value: ExprId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    BinaryOp {
        left: ExprId,
        op: Operator,
        right: ExprId,
    },
    /// `a and b and c` is one node with three values.
    BoolOp {
        op: BoolOperator,
        values: Box<[ExprId]>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: ExprId,
    },
    /// `a < b < c` keeps both operators; `ops.len() == comparators.len()`.
    Compare {
        left: ExprId,
        ops: Box<[CompareOperator]>,
        comparators: Box<[ExprId]>,
    },
    Call {
        func: ExprId,
        args: Box<[ExprId]>,
        keywords: Box<[Keyword]>,
    },
    Name {
        id: String,
        ctx: ExprContext,
    },
    Attribute {
        value: ExprId,
        attr: String,
        ctx: ExprContext,
    },
    Subscript {
        value: ExprId,
        slice: ExprId,
        ctx: ExprContext,
    },
    /// Only ever appears as (part of) a subscript.
    Slice {
        lower: Option<ExprId>,
        upper: Option<ExprId>,
        step: Option<ExprId>,
    },
    IntegerLiteral(i64),
    FloatLiteral(f64),
    /// Imaginary part of a `4j` literal.
    ComplexLiteral(f64),
    StringLiteral(String),
    BoolLiteral(bool),
    NoneLiteral,
    Tuple {
        elements: Box<[ExprId]>,
        ctx: ExprContext,
    },
    List {
        elements: Box<[ExprId]>,
        ctx: ExprContext,
    },
    Dict {
        keys: Box<[ExprId]>,
        values: Box<[ExprId]>,
    },
    Set {
        elements: Box<[ExprId]>,
    },
}
