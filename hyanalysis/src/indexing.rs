//! Version numbers of state variables along an unrolled trace.
//!
//! A [`VarIndexing`] maps every variable to the index of its current version: the variable
//! `x` at indexing `i` stands for the constant `x@i[x]`. Variables without an explicit entry
//! use the default index, so `VarIndexing::all(n)` covers every variable ever declared.
use std::{collections::BTreeMap, fmt};

use hyformal::variable::VarDecl;

use crate::error::{AnalysisError, AnalysisResult};

/// Immutable map from variables to non-negative indices.
///
/// Entries equal to the default index are never stored, so two indexings are equal exactly
/// when they agree on every variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VarIndexing {
    default: u32,
    indices: BTreeMap<VarDecl, u32>,
}

impl VarIndexing {
    /// Every variable at index `n`.
    pub fn all(n: u32) -> Self {
        Self {
            default: n,
            indices: BTreeMap::new(),
        }
    }

    fn normalized(mut self) -> Self {
        let default = self.default;
        self.indices.retain(|_, i| *i != default);
        self
    }

    /// Copy of `self` with `var` at `index`.
    pub fn with(&self, var: &VarDecl, index: u32) -> Self {
        let mut out = self.clone();
        out.indices.insert(var.clone(), index);
        out.normalized()
    }

    #[inline]
    pub fn get(&self, var: &VarDecl) -> u32 {
        self.indices.get(var).copied().unwrap_or(self.default)
    }

    #[inline]
    pub fn default_index(&self) -> u32 {
        self.default
    }

    /// Variables whose index differs from the default.
    pub fn iter(&self) -> impl Iterator<Item = (&VarDecl, u32)> {
        self.indices.iter().map(|(v, i)| (v, *i))
    }

    /// Copy of `self` with the index of `var` increased by one.
    pub fn inc(&self, var: &VarDecl) -> Self {
        self.with(var, self.get(var) + 1)
    }

    fn pointwise(&self, other: &Self, op: impl Fn(u32, u32) -> u32) -> Self {
        let vars = self.indices.keys().chain(other.indices.keys());
        Self {
            default: op(self.default, other.default),
            indices: vars
                .map(|v| (v.clone(), op(self.get(v), other.get(v))))
                .collect(),
        }
        .normalized()
    }

    /// Pointwise sum, used to advance an indexing by the delta of a transition.
    pub fn add(&self, other: &Self) -> Self {
        self.pointwise(other, |a, b| a + b)
    }

    /// Pointwise difference. Fails if any index would become negative.
    pub fn sub(&self, other: &Self) -> AnalysisResult<Self> {
        let negative =
            |var: String, lhs: u32, rhs: u32| AnalysisError::NegativeIndex { var, lhs, rhs };
        if self.default < other.default {
            return Err(negative("_".into(), self.default, other.default));
        }
        for v in self.indices.keys().chain(other.indices.keys()) {
            let (lhs, rhs) = (self.get(v), other.get(v));
            if lhs < rhs {
                return Err(negative(v.name().to_string(), lhs, rhs));
            }
        }
        Ok(self.pointwise(other, |a, b| a - b))
    }

    /// Pointwise maximum.
    pub fn join(&self, other: &Self) -> Self {
        self.pointwise(other, u32::max)
    }
}

impl fmt::Display for VarIndexing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (var, index) in self.iter() {
            write!(f, "{var}: {index}, ")?;
        }
        write!(f, "_: {}}}", self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::dtype::DataType;

    #[test]
    fn lookups_fall_back_to_the_default() {
        let x = VarDecl::new("x", DataType::Bool);
        let y = VarDecl::new("y", DataType::Bool);
        let idx = VarIndexing::all(2).inc(&x);
        assert_eq!(idx.get(&x), 3);
        assert_eq!(idx.get(&y), 2);
        assert_eq!(idx.to_string(), "{x: 3, _: 2}");
    }

    #[test]
    fn arithmetic_is_pointwise() {
        let x = VarDecl::new("x", DataType::Bool);
        let y = VarDecl::new("y", DataType::Bool);
        let a = VarIndexing::all(0).inc(&x).inc(&x);
        let b = VarIndexing::all(1).with(&y, 4);

        let sum = a.add(&b);
        assert_eq!((sum.get(&x), sum.get(&y), sum.default_index()), (3, 4, 1));
        assert_eq!(sum.sub(&b).unwrap(), a);
        assert!(a.sub(&b).unwrap_err().is_negative_index());

        let joined = a.join(&b);
        assert_eq!((joined.get(&x), joined.get(&y), joined.default_index()), (2, 4, 1));
    }

    #[test]
    fn equality_ignores_redundant_entries() {
        let x = VarDecl::new("x", DataType::Bool);
        assert_eq!(VarIndexing::all(1).with(&x, 1), VarIndexing::all(1));
        assert_eq!(
            VarIndexing::all(0).inc(&x).add(&VarIndexing::all(1)),
            VarIndexing::all(1).inc(&x)
        );
    }
}
