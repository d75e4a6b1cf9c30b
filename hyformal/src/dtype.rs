//! Data types and literal values of the formula language.
//!
//! Role
//! - [`DataType`] describes the domain of a state variable. Bounded integers carry an
//!   inclusive `[min, max]` range which finite-domain back-ends rely on.
//! - [`Value`] is a literal produced by evaluation or read back from a solver model.
use std::fmt;

use strum::{EnumIs, EnumTryAs};

/// Domain of a variable or sort of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIs)]
pub enum DataType {
    /// Booleans.
    Bool,
    /// Mathematical integers.
    Int,
    /// Integers restricted to the inclusive range `min..=max`.
    BoundedInt { min: i64, max: i64 },
}

impl DataType {
    /// Create a bounded integer type. `min` and `max` are swapped if given in the wrong order.
    pub fn bounded(min: i64, max: i64) -> Self {
        if min <= max {
            DataType::BoundedInt { min, max }
        } else {
            DataType::BoundedInt { min: max, max: min }
        }
    }

    /// Coarse sort of the type: bounded integers collapse to [`DataType::Int`].
    #[inline]
    pub fn sort(&self) -> DataType {
        match self {
            DataType::Bool => DataType::Bool,
            DataType::Int | DataType::BoundedInt { .. } => DataType::Int,
        }
    }

    /// Whether values of this type are integers (bounded or not).
    #[inline]
    pub fn is_integer(&self) -> bool {
        !self.is_bool()
    }

    /// Inclusive range of an integer type, `None` for booleans and unbounded integers.
    pub fn range(&self) -> Option<(i64, i64)> {
        match self {
            DataType::BoundedInt { min, max } => Some((*min, *max)),
            _ => None,
        }
    }

    /// Number of values in the domain, `None` when infinite.
    pub fn domain_size(&self) -> Option<u128> {
        match self {
            DataType::Bool => Some(2),
            DataType::Int => None,
            DataType::BoundedInt { min, max } => Some((*max as i128 - *min as i128 + 1) as u128),
        }
    }

    /// Enumerate the values of a finite domain in increasing order, `None` when infinite.
    pub fn values(&self) -> Option<Box<dyn Iterator<Item = Value>>> {
        match *self {
            DataType::Bool => Some(Box::new([false, true].into_iter().map(Value::Bool))),
            DataType::Int => None,
            DataType::BoundedInt { min, max } => Some(Box::new((min..=max).map(Value::Int))),
        }
    }

    /// Whether `value` belongs to the domain.
    pub fn contains(&self, value: Value) -> bool {
        match (self, value) {
            (DataType::Bool, Value::Bool(_)) => true,
            (DataType::Int, Value::Int(_)) => true,
            (DataType::BoundedInt { min, max }, Value::Int(v)) => *min <= v && v <= *max,
            _ => false,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Int => write!(f, "int"),
            DataType::BoundedInt { min, max } => write!(f, "int[{min}..{max}]"),
        }
    }
}

/// Literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIs, EnumTryAs)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    /// Sort of the value.
    pub fn dtype(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Bool,
            Value::Int(_) => DataType::Int,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
        }
    }
}
