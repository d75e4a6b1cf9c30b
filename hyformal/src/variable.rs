//! State variables, their versioned constants, and solver symbols.
//!
//! Role
//! - [`VarDecl`] names a typed state variable. Identity is a process-unique id so two
//!   declarations with the same name stay distinct.
//! - [`IndexedConst`] is the version `index` of a variable, as produced when a formula is
//!   unrolled. Creating one is a pure function of `(var, index)`.
//! - [`Symbol`] is anything a model may assign a value to.
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering as AtomicOrdering},
    },
};

use strum::{EnumIs, EnumTryAs};

use crate::{dtype::DataType, expr::Expr};

static NEXT_VAR_ID: AtomicU32 = AtomicU32::new(0);

#[derive(Debug)]
struct VarDeclInner {
    id: u32,
    name: String,
    dtype: DataType,
}

/// Declaration of a state variable.
///
/// Cloning is cheap (reference counted). Equality, hashing and ordering only look at the
/// identifier, never at the name.
#[derive(Clone)]
pub struct VarDecl(Arc<VarDeclInner>);

impl VarDecl {
    /// Declare a fresh variable.
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        let id = NEXT_VAR_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Self(Arc::new(VarDeclInner {
            id,
            name: name.into(),
            dtype,
        }))
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.0.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn dtype(&self) -> DataType {
        self.0.dtype
    }

    /// The constant standing for this variable at version `index`.
    #[inline]
    pub fn at(&self, index: u32) -> IndexedConst {
        IndexedConst {
            var: self.clone(),
            index,
        }
    }

    /// Reference to the un-versioned variable.
    #[inline]
    pub fn to_expr(&self) -> Expr {
        Expr::Var(self.clone())
    }

    /// Reference to the next-state value of the variable: `x'`.
    #[inline]
    pub fn primed(&self) -> Expr {
        Expr::Prime(Box::new(self.to_expr()))
    }
}

impl PartialEq for VarDecl {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for VarDecl {}

impl Hash for VarDecl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialOrd for VarDecl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VarDecl {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id().cmp(&other.id())
    }
}

impl fmt::Debug for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.name(), self.id(), self.dtype())
    }
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Version `index` of a state variable, written `x@index`.
///
/// Ordered by index first so that the constants of an unrolled trace sort step by step.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IndexedConst {
    pub var: VarDecl,
    pub index: u32,
}

impl IndexedConst {
    #[inline]
    pub fn dtype(&self) -> DataType {
        self.var.dtype()
    }

    #[inline]
    pub fn to_expr(&self) -> Expr {
        Expr::Const(self.clone())
    }
}

impl PartialOrd for IndexedConst {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexedConst {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.var.cmp(&other.var))
    }
}

impl fmt::Debug for IndexedConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.var.name(), self.var.id(), self.index)
    }
}

impl fmt::Display for IndexedConst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.var.name(), self.index)
    }
}

/// Anything a valuation can assign: an un-versioned variable or a versioned constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIs, EnumTryAs)]
pub enum Symbol {
    Var(VarDecl),
    Const(IndexedConst),
}

impl Symbol {
    /// Underlying state variable.
    pub fn var(&self) -> &VarDecl {
        match self {
            Symbol::Var(v) => v,
            Symbol::Const(c) => &c.var,
        }
    }

    #[inline]
    pub fn dtype(&self) -> DataType {
        self.var().dtype()
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            Symbol::Var(v) => v.to_expr(),
            Symbol::Const(c) => c.to_expr(),
        }
    }
}

impl From<VarDecl> for Symbol {
    fn from(v: VarDecl) -> Self {
        Symbol::Var(v)
    }
}

impl From<IndexedConst> for Symbol {
    fn from(c: IndexedConst) -> Self {
        Symbol::Const(c)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Var(v) => write!(f, "{v}"),
            Symbol::Const(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_with_same_name_are_distinct() {
        let a = VarDecl::new("x", DataType::Bool);
        let b = VarDecl::new("x", DataType::Bool);
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn constants_sort_by_index_first() {
        let x = VarDecl::new("x", DataType::Int);
        let y = VarDecl::new("y", DataType::Int);
        let mut consts = vec![y.at(1), x.at(1), y.at(0), x.at(0)];
        consts.sort();
        assert_eq!(consts, vec![x.at(0), y.at(0), x.at(1), y.at(1)]);
        assert_eq!(x.at(3).to_string(), "x@3");
    }
}
