use std::fmt::Display;

/// Resolved type of an ASR expression or symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ttype {
    Integer { bits: u8 },
    Real { bits: u8 },
    Complex { bits: u8 },
    Logical,
    Character,
    Array(Box<Ttype>),
    Tuple(Box<[Ttype]>),
    Dict(Box<Ttype>, Box<Ttype>),
    Set(Box<Ttype>),
    Function(Box<Signature>),
}

/// Parameter and return types of a callable. `returns: None` marks a
/// subroutine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Box<[Ttype]>,
    pub returns: Option<Ttype>,
}

/// Coarse classification used by the promotion lattice.
///
/// The numeric families are ordered `Logical < Integer < Real < Complex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Logical,
    Integer,
    Real,
    Complex,
    Character,
    Other,
}

impl Family {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Family::Logical | Family::Integer | Family::Real | Family::Complex
        )
    }
}

pub const INTEGER: Ttype = Ttype::Integer { bits: 64 };
pub const REAL: Ttype = Ttype::Real { bits: 64 };
pub const COMPLEX: Ttype = Ttype::Complex { bits: 64 };

impl Ttype {
    pub fn family(&self) -> Family {
        match self {
            Ttype::Logical => Family::Logical,
            Ttype::Integer { .. } => Family::Integer,
            Ttype::Real { .. } => Family::Real,
            Ttype::Complex { .. } => Family::Complex,
            Ttype::Character => Family::Character,
            _ => Family::Other,
        }
    }

    pub fn bits(&self) -> Option<u8> {
        match self {
            Ttype::Integer { bits } | Ttype::Real { bits } | Ttype::Complex { bits } => Some(*bits),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.family().is_numeric()
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Ttype::Integer { .. })
    }

    pub fn is_real(&self) -> bool {
        matches!(self, Ttype::Real { .. })
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Ttype::Complex { .. })
    }

    /// Integers and booleans, the operands accepted by bitwise operators.
    pub fn is_integral(&self) -> bool {
        matches!(self, Ttype::Integer { .. } | Ttype::Logical)
    }

    /// Same family at the given width. Families without a width ignore it.
    pub fn with_family(family: Family, bits: u8) -> Option<Ttype> {
        let ty = match family {
            Family::Logical => Ttype::Logical,
            Family::Integer => Ttype::Integer { bits },
            Family::Real => Ttype::Real { bits },
            Family::Complex => Ttype::Complex { bits },
            Family::Character => Ttype::Character,
            Family::Other => return None,
        };
        Some(ty)
    }

    /// Booleans take part in arithmetic as 64-bit integers.
    pub fn arithmetic(&self) -> Ttype {
        match self {
            Ttype::Logical => INTEGER,
            other => other.clone(),
        }
    }
}

/// Joins two types on the promotion lattice.
///
/// Numeric operands meet at the higher family, taking the widest bit width
/// found in that family. Identical non-numeric types join to themselves;
/// anything else (notably `str` against a number) has no join.
pub fn promote(left: &Ttype, right: &Ttype) -> Option<Ttype> {
    if left == right {
        return Some(left.clone());
    }

    let (lf, rf) = (left.family(), right.family());
    if !lf.is_numeric() || !rf.is_numeric() {
        return None;
    }

    let family = lf.max(rf);
    let bits = [left, right]
        .iter()
        .filter(|ty| ty.family() == family)
        .filter_map(|ty| ty.bits())
        .max()
        .unwrap_or(64);
    Ttype::with_family(family, bits)
}

/// Whether a value of type `value` may be stored into `target`, possibly
/// after a widening cast.
pub fn assignable(target: &Ttype, value: &Ttype) -> bool {
    if target == value {
        return true;
    }
    let (tf, vf) = (target.family(), value.family());
    tf.is_numeric() && vf.is_numeric() && vf <= tf
}

impl Display for Ttype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ttype::Integer { bits } => write!(f, "i{}", bits),
            Ttype::Real { bits } => write!(f, "f{}", bits),
            Ttype::Complex { bits } => write!(f, "c{}", bits),
            Ttype::Logical => write!(f, "bool"),
            Ttype::Character => write!(f, "str"),
            Ttype::Array(element) => write!(f, "list[{}]", element),
            Ttype::Tuple(elements) => {
                write!(f, "tuple[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Ttype::Dict(key, value) => write!(f, "dict[{}, {}]", key, value),
            Ttype::Set(element) => write!(f, "set[{}]", element),
            Ttype::Function(signature) => write!(f, "{}", signature),
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        match &self.returns {
            Some(returns) => write!(f, ") -> {}", returns),
            None => write!(f, ") -> None"),
        }
    }
}
