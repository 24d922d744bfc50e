//! Built-in functions the analyzer knows how to type and fold.
//!
//! Each entry has a result-type rule, applied to every call, and an
//! evaluation rule that only runs when every argument has a compile-time
//! value. The evaluation rule receives those value nodes, never the
//! original argument expressions.

use std::{cmp::Ordering, collections::HashMap};

use lazy_static::lazy_static;
use tracing::debug;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Span,
};

use super::{
    asr::{AsrArena, ExprId, ExprKind},
    fold::{check_width, constant_of, floored_mod_int, floored_mod_real, Scalar},
    types::{promote, Family, Ttype, INTEGER, REAL},
};

pub type ResultTypeRule = fn(&[Ttype], Span) -> Result<Ttype, Error>;
pub type EvalRule = fn(&mut AsrArena, Span, &[ExprId]) -> Result<ExprId, Error>;

pub struct Intrinsic {
    pub name: &'static str,
    /// Module the run-time implementation lives in.
    pub module: &'static str,
    pub result_type: ResultTypeRule,
    pub eval: EvalRule,
}

const BUILTIN: &str = "builtin_functions";

fn intrinsic(name: &'static str, result_type: ResultTypeRule, eval: EvalRule) -> (&'static str, Intrinsic) {
    (
        name,
        Intrinsic {
            name,
            module: BUILTIN,
            result_type,
            eval,
        },
    )
}

lazy_static! {
    static ref INTRINSICS: HashMap<&'static str, Intrinsic> = HashMap::from([
        intrinsic("abs", abs_type, eval_abs),
        intrinsic("str", str_type, eval_str),
        intrinsic("bool", bool_type, eval_bool),
        intrinsic("len", len_type, eval_len),
        intrinsic("pow", pow_type, eval_pow),
        intrinsic("round", round_type, eval_round),
        intrinsic("max", max_type, eval_max),
        intrinsic("min", min_type, eval_min),
        intrinsic("_mod", mod_type, eval_mod),
    ]);
}

pub fn lookup(name: &str) -> Option<&'static Intrinsic> {
    INTRINSICS.get(name)
}

pub fn is_intrinsic(name: &str) -> bool {
    INTRINSICS.contains_key(name)
}

impl Intrinsic {
    /// Folds a call whose arguments are `args`. Returns `Ok(None)` when some
    /// argument has no compile-time value.
    pub fn comptime_eval(
        &self,
        asr: &mut AsrArena,
        span: Span,
        args: &[ExprId],
    ) -> Result<Option<ExprId>, Error> {
        let Some(values) = args
            .iter()
            .map(|arg| asr.value_of(*arg))
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(None);
        };

        let value = (self.eval)(asr, span, &values)?;
        debug!(intrinsic = self.name, "folded intrinsic call");
        Ok(Some(value))
    }

    /// Result type of a call over lowered `args`. Same as `result_type`,
    /// except that `pow` of an integer base and a constant negative integer
    /// exponent is Real whether or not the base is known.
    pub fn call_type(&self, asr: &AsrArena, args: &[ExprId], span: Span) -> Result<Ttype, Error> {
        let ty = (self.result_type)(&types_of(asr, args), span)?;
        if self.name == "pow" && ty.family() == Family::Integer {
            if let Some(Scalar::Integer(exponent)) = args.get(1).and_then(|e| constant_of(asr, *e)) {
                if exponent < 0 {
                    return Ok(REAL);
                }
            }
        }
        Ok(ty)
    }
}

fn fail(message: impl Into<String>, span: Span) -> Error {
    Error::new(ErrorImpl::intrinsic(message), span)
}

fn exactly_one(name: &str, count: usize, span: Span) -> Result<(), Error> {
    if count != 1 {
        return Err(fail(
            format!("{}() takes exactly one argument ({} given)", name, count),
            span,
        ));
    }
    Ok(())
}

fn scalars(asr: &AsrArena, args: &[ExprId], span: Span) -> Result<Vec<Scalar>, Error> {
    args.iter()
        .map(|arg| {
            Scalar::read(asr, *arg)
                .ok_or_else(|| fail("argument is not a compile-time scalar", span))
        })
        .collect()
}

fn types_of(asr: &AsrArena, args: &[ExprId]) -> Vec<Ttype> {
    args.iter().map(|arg| asr.expr(*arg).ty.clone()).collect()
}

const ABS_MESSAGE: &str = "Argument of the abs function must be Integer, Real, Logical or Complex";

fn abs_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    exactly_one("abs", args.len(), span)?;
    match &args[0] {
        Ttype::Logical => Ok(INTEGER),
        Ttype::Integer { bits } => Ok(Ttype::Integer { bits: *bits }),
        Ttype::Real { bits } | Ttype::Complex { bits } => Ok(Ttype::Real { bits: *bits }),
        _ => Err(fail(ABS_MESSAGE, span)),
    }
}

fn eval_abs(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    let ty = abs_type(&types_of(asr, args), span)?;
    let value = match scalars(asr, args, span)?.remove(0) {
        Scalar::Integer(n) => Scalar::Integer(
            n.checked_abs()
                .ok_or_else(|| Error::new(ErrorImpl::ConstantOverflow, span))?,
        ),
        Scalar::Logical(b) => Scalar::Integer(b as i64),
        Scalar::Real(r) => Scalar::Real(r.abs()),
        Scalar::Complex(c) => Scalar::Real(c.norm()),
        Scalar::Str(_) => return Err(fail(ABS_MESSAGE, span)),
    };
    Ok(value.alloc(asr, ty, span))
}

fn str_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    match args {
        [] => Ok(Ttype::Character),
        [ty] if matches!(
            ty.family(),
            Family::Integer | Family::Real | Family::Logical | Family::Character
        ) =>
        {
            Ok(Ttype::Character)
        }
        [ty] => Err(fail(
            format!(
                "str() argument must be real, integer, logical, or a string, not '{}'",
                ty
            ),
            span,
        )),
        _ => Err(fail(
            format!("str() takes at most one argument ({} given)", args.len()),
            span,
        )),
    }
}

fn eval_str(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    str_type(&types_of(asr, args), span)?;
    let text = match scalars(asr, args, span)?.first() {
        Some(scalar) => scalar.to_python_string(),
        None => String::new(),
    };
    Ok(Scalar::Str(text).alloc(asr, Ttype::Character, span))
}

fn bool_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    exactly_one("bool", args.len(), span)?;
    if args[0].is_numeric() || args[0] == Ttype::Character {
        return Ok(Ttype::Logical);
    }
    Err(fail(
        format!(
            "bool() must have one real, integer, character, complex, or logical argument, not '{}'",
            args[0]
        ),
        span,
    ))
}

fn eval_bool(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    bool_type(&types_of(asr, args), span)?;
    let truthy = scalars(asr, args, span)?[0].truthy();
    Ok(Scalar::Logical(truthy).alloc(asr, Ttype::Logical, span))
}

const LEN_MESSAGE: &str = "len() only works on strings, lists, tuples, dictionaries and sets";

fn len_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    exactly_one("len", args.len(), span)?;
    match &args[0] {
        Ttype::Character | Ttype::Array(_) | Ttype::Tuple(_) | Ttype::Dict(..) | Ttype::Set(_) => {
            Ok(INTEGER)
        }
        _ => Err(fail(LEN_MESSAGE, span)),
    }
}

fn eval_len(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    exactly_one("len", args.len(), span)?;
    let count = match &asr.expr(args[0]).kind {
        ExprKind::StringConstant(s) => s.chars().count(),
        ExprKind::ListConstant(elements)
        | ExprKind::TupleConstant(elements)
        | ExprKind::SetConstant(elements) => elements.len(),
        ExprKind::DictConstant { keys, .. } => keys.len(),
        _ => return Err(fail(LEN_MESSAGE, span)),
    };
    let count = i64::try_from(count).map_err(|_| Error::new(ErrorImpl::ConstantOverflow, span))?;
    Ok(Scalar::Integer(count).alloc(asr, INTEGER, span))
}

const POW_MESSAGE: &str = "pow() only works on integer, real, logical, and complex types";
const NEGATIVE_POWER: &str = "0.0 cannot be raised to a negative power.";

fn pow_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    if args.len() != 2 {
        return Err(fail(
            format!("pow() takes exactly two arguments ({} given)", args.len()),
            span,
        ));
    }
    let (base, exponent) = (&args[0], &args[1]);
    match (base.family(), exponent.family()) {
        (Family::Integer, Family::Integer)
        | (Family::Real, Family::Real)
        | (Family::Integer, Family::Real)
        | (Family::Real, Family::Integer) => {
            promote(base, exponent).ok_or_else(|| fail(POW_MESSAGE, span))
        }
        (Family::Logical, Family::Logical) => Ok(INTEGER),
        (Family::Complex, Family::Integer) => Ok(base.clone()),
        _ => Err(fail(POW_MESSAGE, span)),
    }
}

fn eval_pow(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    let ty = pow_type(&types_of(asr, args), span)?;
    let overflow = || Error::new(ErrorImpl::ConstantOverflow, span);

    let mut operands = scalars(asr, args, span)?.into_iter();
    let (Some(base), Some(exponent)) = (operands.next(), operands.next()) else {
        return Err(fail(POW_MESSAGE, span));
    };

    let (value, ty) = match (base, exponent) {
        (Scalar::Integer(a), Scalar::Integer(b)) => {
            if a == 0 && b < 0 {
                return Err(fail(NEGATIVE_POWER, span));
            }
            if b < 0 {
                (Scalar::Real((a as f64).powf(b as f64)), REAL)
            } else {
                let b = u32::try_from(b).map_err(|_| overflow())?;
                let value = Scalar::Integer(a.checked_pow(b).ok_or_else(overflow)?);
                check_width(&value, &ty).map_err(|e| Error::new(e, span))?;
                (value, ty)
            }
        }
        (Scalar::Logical(a), Scalar::Logical(b)) => {
            (Scalar::Integer(if b { a as i64 } else { 1 }), ty)
        }
        (Scalar::Complex(c), Scalar::Integer(b)) => {
            let b = i32::try_from(b).map_err(|_| overflow())?;
            (Scalar::Complex(c.powi(b)), ty)
        }
        (base, exponent) => {
            let (Some(a), Some(b)) = (base.as_f64(), exponent.as_f64()) else {
                return Err(fail(POW_MESSAGE, span));
            };
            if a == 0.0 && b < 0.0 {
                return Err(fail(NEGATIVE_POWER, span));
            }
            (Scalar::Real(a.powf(b)), ty)
        }
    };
    Ok(value.alloc(asr, ty, span))
}

fn round_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    if args.len() != 1 {
        return Err(fail("round() missing required argument 'number' (pos 1)", span));
    }
    match args[0].family() {
        Family::Real | Family::Integer | Family::Logical => Ok(INTEGER),
        _ => Err(fail(
            format!(
                "round() argument must be float, integer, or logical for now, not '{}'",
                args[0]
            ),
            span,
        )),
    }
}

fn eval_round(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    let types = types_of(asr, args);
    let ty = round_type(&types, span)?;
    let value = match scalars(asr, args, span)?.remove(0) {
        Scalar::Integer(n) => n,
        Scalar::Logical(b) => b as i64,
        Scalar::Real(r) => {
            let rounded = r.round_ties_even();
            if !rounded.is_finite() || rounded < i64::MIN as f64 || rounded >= i64::MAX as f64 {
                return Err(Error::new(ErrorImpl::ConstantOverflow, span));
            }
            rounded as i64
        }
        _ => {
            return Err(fail(
                format!(
                    "round() argument must be float, integer, or logical for now, not '{}'",
                    types[0]
                ),
                span,
            ))
        }
    };
    Ok(Scalar::Integer(value).alloc(asr, ty, span))
}

fn extreme_type(name: &str, args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    let Some(first) = args.first() else {
        return Err(fail(format!("{}() expects at least one argument", name), span));
    };
    if !matches!(
        first.family(),
        Family::Integer | Family::Real | Family::Character
    ) {
        return Err(fail(
            format!(
                "{}() arguments must be integers, reals or strings, not '{}'",
                name, first
            ),
            span,
        ));
    }
    for (i, ty) in args.iter().enumerate().skip(1) {
        if ty != first {
            return Err(fail(
                format!("type of arg in index [{}] is not comparable", i),
                span,
            ));
        }
    }
    Ok(first.clone())
}

/// Returns the argument node that wins under `wanted`. Comparison is strict,
/// so the first of several equal extremes is kept.
fn eval_extreme(
    name: &str,
    wanted: Ordering,
    asr: &mut AsrArena,
    span: Span,
    args: &[ExprId],
) -> Result<ExprId, Error> {
    extreme_type(name, &types_of(asr, args), span)?;

    let values = scalars(asr, args, span)?;
    let mut best = 0;
    for i in 1..values.len() {
        let ordering = match (&values[i], &values[best]) {
            (Scalar::Integer(a), Scalar::Integer(b)) => a.partial_cmp(b),
            (Scalar::Real(a), Scalar::Real(b)) => a.partial_cmp(b),
            (Scalar::Str(a), Scalar::Str(b)) => a.partial_cmp(b),
            _ => None,
        };
        if ordering == Some(wanted) {
            best = i;
        }
    }
    Ok(args[best])
}

fn max_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    extreme_type("max", args, span)
}

fn min_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    extreme_type("min", args, span)
}

fn eval_max(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    eval_extreme("max", Ordering::Greater, asr, span, args)
}

fn eval_min(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    eval_extreme("min", Ordering::Less, asr, span, args)
}

fn mod_type(args: &[Ttype], span: Span) -> Result<Ttype, Error> {
    let [left, right] = args else {
        return Err(fail("_mod() must have two integer/real arguments.", span));
    };
    if left == right && (left.is_integer() || left.is_real()) {
        return Ok(left.clone());
    }
    Err(fail(
        "_mod() must have both integer or both real arguments.",
        span,
    ))
}

fn eval_mod(asr: &mut AsrArena, span: Span, args: &[ExprId]) -> Result<ExprId, Error> {
    let ty = mod_type(&types_of(asr, args), span)?;
    let operands = scalars(asr, args, span)?;
    let value = match (&operands[0], &operands[1]) {
        (Scalar::Integer(a), Scalar::Integer(b)) => {
            Scalar::Integer(floored_mod_int(*a, *b).map_err(|e| Error::new(e, span))?)
        }
        (Scalar::Real(a), Scalar::Real(b)) => {
            Scalar::Real(floored_mod_real(*a, *b).map_err(|e| Error::new(e, span))?)
        }
        _ => {
            return Err(fail(
                "_mod() must have both integer or both real arguments.",
                span,
            ))
        }
    };
    Ok(value.alloc(asr, ty, span))
}
