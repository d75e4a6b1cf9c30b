//! Quantifier-free expressions over Booleans and integers.
//!
//! Role
//! - [`Expr`] is an owned expression tree covering Boolean connectives, integer arithmetic,
//!   comparisons and conditionals, together with the three ways of referring to state:
//!   [`Expr::Var`] (current state), [`Expr::Prime`] (next state) and [`Expr::Const`]
//!   (a versioned constant of an unrolled formula).
//! - Builders live in [`func`]: they simplify Boolean constants and flatten nested
//!   conjunctions/disjunctions. The variants can also be built directly when the exact shape
//!   matters (e.g. in tests).
//!
//! Example
//! ```
//! use hyformal::prelude::*;
//!
//! let x = VarDecl::new("x", DataType::bounded(0, 7));
//! let step = eq(x.primed(), x.to_expr() + int(1));
//! assert_eq!(step.to_string(), "x' = x + 1");
//! assert_eq!(step.dtype().unwrap(), DataType::Bool);
//! ```
pub mod func;
pub mod pretty;

use smallvec::SmallVec;
use strum::{EnumDiscriminants, EnumIs, EnumIter};

use crate::{
    dtype::DataType,
    error::{FormalError, FormalResult},
    variable::{IndexedConst, VarDecl},
};

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIs, EnumDiscriminants)]
#[strum_discriminants(derive(Hash, PartialOrd, Ord, EnumIter))]
#[strum_discriminants(name(ExprType))]
#[strum_discriminants(vis(pub))]
pub enum Expr {
    // Literals
    True,
    False,
    Int(i64),

    // State references
    Var(VarDecl),
    Const(IndexedConst),
    Prime(Box<Expr>),

    // Logic
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),

    // Comparisons
    Eq(Box<Expr>, Box<Expr>),
    Neq(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Leq(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Geq(Box<Expr>, Box<Expr>),

    // Arithmetic
    Add(Vec<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Vec<Expr>),
    Neg(Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),

    // Conditional
    Ite {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

impl Expr {
    /// Kind of the outer constructor.
    #[inline]
    pub fn type_(&self) -> ExprType {
        ExprType::from(self)
    }

    /// Borrow the direct children, left to right.
    pub fn children(&self) -> SmallVec<&Expr, 3> {
        let mut out = SmallVec::new();
        match self {
            Expr::True | Expr::False | Expr::Int(_) | Expr::Var(_) | Expr::Const(_) => {}
            Expr::Prime(e) | Expr::Not(e) | Expr::Neg(e) => out.push(&**e),
            Expr::And(es) | Expr::Or(es) | Expr::Add(es) | Expr::Mul(es) => out.extend(es.iter()),
            Expr::Implies(l, r)
            | Expr::Iff(l, r)
            | Expr::Eq(l, r)
            | Expr::Neq(l, r)
            | Expr::Lt(l, r)
            | Expr::Leq(l, r)
            | Expr::Gt(l, r)
            | Expr::Geq(l, r)
            | Expr::Sub(l, r)
            | Expr::Div(l, r)
            | Expr::Mod(l, r) => {
                out.push(&**l);
                out.push(&**r);
            }
            Expr::Ite {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(&**condition);
                out.push(&**then_branch);
                out.push(&**else_branch);
            }
        }
        out
    }

    /// Rebuild this node with every direct child replaced by `f(child)`.
    ///
    /// The constructor is preserved as-is; no simplification takes place.
    pub fn try_map_children<E>(
        &self,
        mut f: impl FnMut(&Expr) -> Result<Expr, E>,
    ) -> Result<Expr, E> {
        let mut bx = |e: &Expr| -> Result<Box<Expr>, E> { f(e).map(Box::new) };
        Ok(match self {
            Expr::True | Expr::False | Expr::Int(_) | Expr::Var(_) | Expr::Const(_) => {
                self.clone()
            }
            Expr::Prime(e) => Expr::Prime(bx(e)?),
            Expr::Not(e) => Expr::Not(bx(e)?),
            Expr::Neg(e) => Expr::Neg(bx(e)?),
            Expr::And(es) => Expr::And(
                es.iter().map(|e| bx(e).map(|b| *b)).collect::<Result<_, _>>()?,
            ),
            Expr::Or(es) => Expr::Or(
                es.iter().map(|e| bx(e).map(|b| *b)).collect::<Result<_, _>>()?,
            ),
            Expr::Add(es) => Expr::Add(
                es.iter().map(|e| bx(e).map(|b| *b)).collect::<Result<_, _>>()?,
            ),
            Expr::Mul(es) => Expr::Mul(
                es.iter().map(|e| bx(e).map(|b| *b)).collect::<Result<_, _>>()?,
            ),
            Expr::Implies(l, r) => Expr::Implies(bx(l)?, bx(r)?),
            Expr::Iff(l, r) => Expr::Iff(bx(l)?, bx(r)?),
            Expr::Eq(l, r) => Expr::Eq(bx(l)?, bx(r)?),
            Expr::Neq(l, r) => Expr::Neq(bx(l)?, bx(r)?),
            Expr::Lt(l, r) => Expr::Lt(bx(l)?, bx(r)?),
            Expr::Leq(l, r) => Expr::Leq(bx(l)?, bx(r)?),
            Expr::Gt(l, r) => Expr::Gt(bx(l)?, bx(r)?),
            Expr::Geq(l, r) => Expr::Geq(bx(l)?, bx(r)?),
            Expr::Sub(l, r) => Expr::Sub(bx(l)?, bx(r)?),
            Expr::Div(l, r) => Expr::Div(bx(l)?, bx(r)?),
            Expr::Mod(l, r) => Expr::Mod(bx(l)?, bx(r)?),
            Expr::Ite {
                condition,
                then_branch,
                else_branch,
            } => Expr::Ite {
                condition: bx(condition)?,
                then_branch: bx(then_branch)?,
                else_branch: bx(else_branch)?,
            },
        })
    }

    /// Infallible variant of [`Expr::try_map_children`].
    pub fn map_children(&self, mut f: impl FnMut(&Expr) -> Expr) -> Expr {
        match self.try_map_children(|e| Ok::<_, std::convert::Infallible>(f(e))) {
            Ok(e) => e,
            Err(never) => match never {},
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        let mut count = 0;
        crate::walker::walk(self, |_| {
            count += 1;
            true
        });
        count
    }

    /// Compute the sort of the expression (`Bool` or `Int`), checking operand sorts on the way.
    pub fn dtype(&self) -> FormalResult<DataType> {
        let expect = |e: &Expr, expected: DataType| -> FormalResult<()> {
            let found = e.dtype()?;
            if found == expected {
                Ok(())
            } else {
                Err(FormalError::TypeMismatch {
                    expected,
                    found,
                    expr: e.to_string(),
                })
            }
        };

        Ok(match self {
            Expr::True | Expr::False => DataType::Bool,
            Expr::Int(_) => DataType::Int,
            Expr::Var(v) => v.dtype().sort(),
            Expr::Const(c) => c.dtype().sort(),
            Expr::Prime(e) => e.dtype()?,
            Expr::Not(e) => {
                expect(e, DataType::Bool)?;
                DataType::Bool
            }
            Expr::And(es) | Expr::Or(es) => {
                for e in es {
                    expect(e, DataType::Bool)?;
                }
                DataType::Bool
            }
            Expr::Implies(l, r) | Expr::Iff(l, r) => {
                expect(l, DataType::Bool)?;
                expect(r, DataType::Bool)?;
                DataType::Bool
            }
            Expr::Eq(l, r) | Expr::Neq(l, r) => {
                let lt = l.dtype()?;
                expect(r, lt)?;
                DataType::Bool
            }
            Expr::Lt(l, r) | Expr::Leq(l, r) | Expr::Gt(l, r) | Expr::Geq(l, r) => {
                expect(l, DataType::Int)?;
                expect(r, DataType::Int)?;
                DataType::Bool
            }
            Expr::Add(es) | Expr::Mul(es) => {
                for e in es {
                    expect(e, DataType::Int)?;
                }
                DataType::Int
            }
            Expr::Neg(e) => {
                expect(e, DataType::Int)?;
                DataType::Int
            }
            Expr::Sub(l, r) | Expr::Div(l, r) | Expr::Mod(l, r) => {
                expect(l, DataType::Int)?;
                expect(r, DataType::Int)?;
                DataType::Int
            }
            Expr::Ite {
                condition,
                then_branch,
                else_branch,
            } => {
                expect(condition, DataType::Bool)?;
                let ty = then_branch.dtype()?;
                expect(else_branch, ty)?;
                ty
            }
        })
    }

    /// Top-level conjuncts: the children of an `And`, or the expression itself.
    pub fn conjuncts(&self) -> &[Expr] {
        match self {
            Expr::And(es) => es,
            other => std::slice::from_ref(other),
        }
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        if b { Expr::True } else { Expr::False }
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Int(v)
    }
}

impl From<VarDecl> for Expr {
    fn from(v: VarDecl) -> Self {
        Expr::Var(v)
    }
}

impl From<&VarDecl> for Expr {
    fn from(v: &VarDecl) -> Self {
        Expr::Var(v.clone())
    }
}

impl From<IndexedConst> for Expr {
    fn from(c: IndexedConst) -> Self {
        Expr::Const(c)
    }
}

impl From<crate::dtype::Value> for Expr {
    fn from(v: crate::dtype::Value) -> Self {
        match v {
            crate::dtype::Value::Bool(b) => b.into(),
            crate::dtype::Value::Int(i) => Expr::Int(i),
        }
    }
}

// Lightweight operator sugar, routed through the simplifying builders.
impl std::ops::BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        func::and([self, rhs])
    }
}

impl std::ops::BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        func::or([self, rhs])
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        func::not(self)
    }
}

impl std::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        func::add([self, rhs])
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        func::sub(self, rhs)
    }
}

impl std::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        func::mul([self, rhs])
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        func::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::func::*;

    #[test]
    fn children_are_left_to_right() {
        let x = VarDecl::new("x", DataType::Int);
        let e = ite(lt(x.to_expr(), int(3)), int(1), int(2));
        let kids = e.children();
        assert_eq!(kids.len(), 3);
        assert_eq!(kids[1], &Expr::Int(1));
        assert_eq!(e.type_(), ExprType::Ite);
    }

    #[test]
    fn type_errors_are_reported() {
        let b = VarDecl::new("b", DataType::Bool);
        let bad = Expr::Add(vec![b.to_expr(), Expr::Int(1)]);
        assert!(matches!(
            bad.dtype(),
            Err(FormalError::TypeMismatch {
                expected: DataType::Int,
                found: DataType::Bool,
                ..
            })
        ));
    }

    #[test]
    fn map_children_keeps_shape() {
        let x = VarDecl::new("x", DataType::Int);
        let e = Expr::Add(vec![x.to_expr(), Expr::Int(1), Expr::Int(2)]);
        let swapped = e.map_children(|c| match c {
            Expr::Int(v) => Expr::Int(v * 10),
            other => other.clone(),
        });
        assert_eq!(
            swapped,
            Expr::Add(vec![x.to_expr(), Expr::Int(10), Expr::Int(20)])
        );
        assert_eq!(e.size(), 4);
    }
}
