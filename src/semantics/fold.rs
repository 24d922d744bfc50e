//! Compile-time evaluation of scalar constants.
//!
//! Operands reach these functions already cast to a common family, so each
//! operator only has to handle like-typed pairs.

use std::cmp::Ordering;

use num_complex::Complex64;

use crate::{
    ast::expressions::{CompareOperator, Operator, UnaryOperator},
    errors::errors::ErrorImpl,
    Span,
};

use super::{
    asr::{AsrArena, ExprId, ExprKind},
    types::{Family, Ttype},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Real(f64),
    Complex(Complex64),
    Logical(bool),
    Str(String),
}

impl Scalar {
    /// Reads a scalar literal node. Anything else yields `None`.
    pub fn read(asr: &AsrArena, id: ExprId) -> Option<Scalar> {
        let scalar = match &asr.expr(id).kind {
            ExprKind::IntegerConstant(n) => Scalar::Integer(*n),
            ExprKind::RealConstant(r) => Scalar::Real(*r),
            ExprKind::ComplexConstant { re, im } => Scalar::Complex(Complex64::new(*re, *im)),
            ExprKind::LogicalConstant(b) => Scalar::Logical(*b),
            ExprKind::StringConstant(s) => Scalar::Str(s.clone()),
            _ => return None,
        };
        Some(scalar)
    }

    /// Allocates the literal node for this value.
    pub fn alloc(self, asr: &mut AsrArena, ty: Ttype, span: Span) -> ExprId {
        let kind = match self {
            Scalar::Integer(n) => ExprKind::IntegerConstant(n),
            Scalar::Real(r) => ExprKind::RealConstant(r),
            Scalar::Complex(c) => ExprKind::ComplexConstant { re: c.re, im: c.im },
            Scalar::Logical(b) => ExprKind::LogicalConstant(b),
            Scalar::Str(s) => ExprKind::StringConstant(s),
        };
        asr.alloc_expr(kind, ty, None, span)
    }

    pub fn family(&self) -> Family {
        match self {
            Scalar::Integer(_) => Family::Integer,
            Scalar::Real(_) => Family::Real,
            Scalar::Complex(_) => Family::Complex,
            Scalar::Logical(_) => Family::Logical,
            Scalar::Str(_) => Family::Character,
        }
    }

    /// Widens the value into `family`. Narrowing is not defined.
    pub fn cast(self, family: Family) -> Option<Scalar> {
        let scalar = match (self, family) {
            (scalar, family) if scalar.family() == family => scalar,
            (Scalar::Logical(b), Family::Integer) => Scalar::Integer(b as i64),
            (Scalar::Logical(b), Family::Real) => Scalar::Real(if b { 1.0 } else { 0.0 }),
            (Scalar::Logical(b), Family::Complex) => {
                Scalar::Complex(Complex64::new(if b { 1.0 } else { 0.0 }, 0.0))
            }
            (Scalar::Integer(n), Family::Real) => Scalar::Real(n as f64),
            (Scalar::Integer(n), Family::Complex) => Scalar::Complex(Complex64::new(n as f64, 0.0)),
            (Scalar::Real(r), Family::Complex) => Scalar::Complex(Complex64::new(r, 0.0)),
            _ => return None,
        };
        Some(scalar)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(n) => Some(*n as f64),
            Scalar::Real(r) => Some(*r),
            Scalar::Logical(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Python's textual form, as produced by `str()`.
    pub fn to_python_string(&self) -> String {
        match self {
            Scalar::Integer(n) => n.to_string(),
            Scalar::Real(r) => format!("{:.6}", r),
            Scalar::Complex(c) => format!("({:.6}+{:.6}j)", c.re, c.im),
            Scalar::Logical(b) => if *b { "True" } else { "False" }.to_string(),
            Scalar::Str(s) => s.clone(),
        }
    }

    /// Python truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Integer(n) => *n != 0,
            Scalar::Real(r) => *r != 0.0,
            Scalar::Complex(c) => c.re != 0.0 || c.im != 0.0,
            Scalar::Logical(b) => *b,
            Scalar::Str(s) => !s.is_empty(),
        }
    }
}

/// Reads the compile-time value of `id` as a scalar, if it has one.
pub fn constant_of(asr: &AsrArena, id: ExprId) -> Option<Scalar> {
    asr.value_of(id).and_then(|value| Scalar::read(asr, value))
}

/// Rejects integers that do not fit in `ty`'s width.
pub fn check_width(scalar: &Scalar, ty: &Ttype) -> Result<(), ErrorImpl> {
    if let (Scalar::Integer(n), Ttype::Integer { bits }) = (scalar, ty) {
        if *bits < 64 {
            let limit = 1i64 << (bits - 1);
            if *n < -limit || *n >= limit {
                return Err(ErrorImpl::ConstantOverflow);
            }
        }
    }
    Ok(())
}

/// Floored integer modulus, the sign follows the divisor.
pub fn floored_mod_int(a: i64, b: i64) -> Result<i64, ErrorImpl> {
    if b == 0 {
        return Err(ErrorImpl::DivisionByZero);
    }
    let r = a.wrapping_rem(b);
    Ok(if r != 0 && (r < 0) != (b < 0) { r + b } else { r })
}

pub fn floored_mod_real(a: f64, b: f64) -> Result<f64, ErrorImpl> {
    if b == 0.0 {
        return Err(ErrorImpl::DivisionByZero);
    }
    let r = a % b;
    Ok(if r != 0.0 && (r < 0.0) != (b < 0.0) { r + b } else { r })
}

fn floor_div_int(a: i64, b: i64) -> Result<i64, ErrorImpl> {
    if b == 0 {
        return Err(ErrorImpl::DivisionByZero);
    }
    let q = a.checked_div(b).ok_or(ErrorImpl::ConstantOverflow)?;
    Ok(if a % b != 0 && (a < 0) != (b < 0) { q - 1 } else { q })
}

fn shift(a: i64, b: i64, left: bool) -> Result<i64, ErrorImpl> {
    if b < 0 {
        return Err(ErrorImpl::NegativeShiftCount);
    }
    if left {
        if a == 0 {
            return Ok(0);
        }
        let amount = u32::try_from(b).map_err(|_| ErrorImpl::ConstantOverflow)?;
        let shifted = a.checked_shl(amount).ok_or(ErrorImpl::ConstantOverflow)?;
        if shifted >> amount != a {
            return Err(ErrorImpl::ConstantOverflow);
        }
        Ok(shifted)
    } else if b >= 64 {
        Ok(if a < 0 { -1 } else { 0 })
    } else {
        Ok(a >> b)
    }
}

/// Folds a binary operator over two like-typed scalars. `**` and `%` are
/// folded by the `pow` and `_mod` intrinsics instead.
pub fn fold_binop(op: Operator, left: Scalar, right: Scalar) -> Result<Scalar, ErrorImpl> {
    use Operator::*;

    let unsupported = |operand: &str| ErrorImpl::UnsupportedOperator {
        operator: op.symbol().to_string(),
        operand: operand.to_string(),
    };

    let result = match (left, right) {
        (Scalar::Integer(a), Scalar::Integer(b)) => match op {
            Add => Scalar::Integer(a.checked_add(b).ok_or(ErrorImpl::ConstantOverflow)?),
            Sub => Scalar::Integer(a.checked_sub(b).ok_or(ErrorImpl::ConstantOverflow)?),
            Mult => Scalar::Integer(a.checked_mul(b).ok_or(ErrorImpl::ConstantOverflow)?),
            Div => {
                if b == 0 {
                    return Err(ErrorImpl::DivisionByZero);
                }
                Scalar::Real(a as f64 / b as f64)
            }
            FloorDiv => Scalar::Integer(floor_div_int(a, b)?),
            BitAnd => Scalar::Integer(a & b),
            BitOr => Scalar::Integer(a | b),
            BitXor => Scalar::Integer(a ^ b),
            LShift => Scalar::Integer(shift(a, b, true)?),
            RShift => Scalar::Integer(shift(a, b, false)?),
            Mod | Pow | MatMult => return Err(unsupported("i64")),
        },
        (Scalar::Real(a), Scalar::Real(b)) => match op {
            Add => Scalar::Real(a + b),
            Sub => Scalar::Real(a - b),
            Mult => Scalar::Real(a * b),
            Div => {
                if b == 0.0 {
                    return Err(ErrorImpl::DivisionByZero);
                }
                Scalar::Real(a / b)
            }
            FloorDiv => {
                if b == 0.0 {
                    return Err(ErrorImpl::DivisionByZero);
                }
                Scalar::Real((a / b).floor())
            }
            _ => return Err(unsupported("f64")),
        },
        (Scalar::Complex(a), Scalar::Complex(b)) => match op {
            Add => Scalar::Complex(a + b),
            Sub => Scalar::Complex(a - b),
            Mult => Scalar::Complex(a * b),
            Div => {
                if b.re == 0.0 && b.im == 0.0 {
                    return Err(ErrorImpl::DivisionByZero);
                }
                Scalar::Complex(a / b)
            }
            _ => return Err(unsupported("c64")),
        },
        (Scalar::Logical(a), Scalar::Logical(b)) => match op {
            BitAnd => Scalar::Logical(a & b),
            BitOr => Scalar::Logical(a | b),
            BitXor => Scalar::Logical(a ^ b),
            _ => return Err(unsupported("bool")),
        },
        (Scalar::Str(a), Scalar::Str(b)) => match op {
            Add => Scalar::Str(a + &b),
            _ => return Err(unsupported("str")),
        },
        (left, _) => {
            let ty = Ttype::with_family(left.family(), 64)
                .map(|ty| ty.to_string())
                .unwrap_or_default();
            return Err(unsupported(&ty));
        }
    };
    Ok(result)
}

pub fn fold_compare(op: CompareOperator, left: &Scalar, right: &Scalar) -> Option<bool> {
    let ordering = match (left, right) {
        (Scalar::Integer(a), Scalar::Integer(b)) => a.partial_cmp(b),
        (Scalar::Real(a), Scalar::Real(b)) => a.partial_cmp(b),
        (Scalar::Logical(a), Scalar::Logical(b)) => a.partial_cmp(b),
        (Scalar::Str(a), Scalar::Str(b)) => a.partial_cmp(b),
        (Scalar::Complex(a), Scalar::Complex(b)) => {
            return match op {
                CompareOperator::Eq => Some(a == b),
                CompareOperator::NotEq => Some(a != b),
                _ => None,
            };
        }
        _ => None,
    };

    // NaN compares unequal to everything.
    let Some(ordering) = ordering else {
        return Some(op == CompareOperator::NotEq);
    };
    let result = match op {
        CompareOperator::Eq => ordering == Ordering::Equal,
        CompareOperator::NotEq => ordering != Ordering::Equal,
        CompareOperator::Lt => ordering == Ordering::Less,
        CompareOperator::LtE => ordering != Ordering::Greater,
        CompareOperator::Gt => ordering == Ordering::Greater,
        CompareOperator::GtE => ordering != Ordering::Less,
        _ => return None,
    };
    Some(result)
}

pub fn fold_unary(op: UnaryOperator, operand: Scalar) -> Result<Scalar, ErrorImpl> {
    let unsupported = |operand: &str| ErrorImpl::UnsupportedOperator {
        operator: unary_symbol(op).to_string(),
        operand: operand.to_string(),
    };

    let result = match (op, operand) {
        (UnaryOperator::Not, Scalar::Logical(b)) => Scalar::Logical(!b),
        (UnaryOperator::UAdd, scalar @ (Scalar::Integer(_) | Scalar::Real(_) | Scalar::Complex(_))) => scalar,
        (UnaryOperator::USub, Scalar::Integer(n)) => {
            Scalar::Integer(n.checked_neg().ok_or(ErrorImpl::ConstantOverflow)?)
        }
        (UnaryOperator::USub, Scalar::Real(r)) => Scalar::Real(-r),
        (UnaryOperator::USub, Scalar::Complex(c)) => Scalar::Complex(-c),
        (UnaryOperator::Invert, Scalar::Integer(n)) => Scalar::Integer(!n),
        (_, Scalar::Str(_)) => return Err(unsupported("str")),
        (_, other) => {
            let ty = Ttype::with_family(other.family(), 64)
                .map(|ty| ty.to_string())
                .unwrap_or_default();
            return Err(unsupported(&ty));
        }
    };
    Ok(result)
}

pub fn unary_symbol(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Invert => "~",
        UnaryOperator::Not => "not",
        UnaryOperator::UAdd => "+",
        UnaryOperator::USub => "-",
    }
}
