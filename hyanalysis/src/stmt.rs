//! Guarded-command statements and their lowering to unrolled formulas.
//!
//! Lowering is SSA-like: each assignment or havoc gives the variable a fresh version, so a
//! statement unfolds into a list of constraints between the versions at the start indexing
//! and the versions at the returned one.
use std::{collections::BTreeSet, fmt};

use hyformal::{
    expr::{Expr, func::*},
    variable::VarDecl,
    walker,
};

use crate::{indexing::VarIndexing, path::unfold};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Skip,
    /// `x := e`
    Assign(VarDecl, Expr),
    /// Blocks executions where the condition does not hold.
    Assume(Expr),
    /// Arbitrary new value for the variable.
    Havoc(VarDecl),
    Sequence(Vec<Stmt>),
    /// Any one of the branches. No branch behaves as [`Stmt::Skip`].
    NonDet(Vec<Stmt>),
}

/// Constraints produced by [`Stmt::unfold`] and the indexing reached at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StmtUnfoldResult {
    pub exprs: Vec<Expr>,
    pub indexing: VarIndexing,
}

impl StmtUnfoldResult {
    /// Conjunction of the constraints.
    pub fn to_expr(&self) -> Expr {
        and(self.exprs.iter().cloned())
    }
}

impl Stmt {
    pub fn assign(var: &VarDecl, e: impl Into<Expr>) -> Self {
        Stmt::Assign(var.clone(), e.into())
    }

    pub fn assume(cond: impl Into<Expr>) -> Self {
        Stmt::Assume(cond.into())
    }

    pub fn havoc(var: &VarDecl) -> Self {
        Stmt::Havoc(var.clone())
    }

    /// Lower the statement starting from `indexing`.
    pub fn unfold(&self, indexing: &VarIndexing) -> StmtUnfoldResult {
        let mut exprs = Vec::new();
        let indexing = self.unfold_into(indexing.clone(), &mut exprs);
        StmtUnfoldResult { exprs, indexing }
    }

    fn unfold_into(&self, indexing: VarIndexing, exprs: &mut Vec<Expr>) -> VarIndexing {
        match self {
            Stmt::Skip => indexing,
            Stmt::Assign(var, e) => {
                let next = indexing.inc(var);
                exprs.push(eq(var.at(next.get(var)).to_expr(), unfold(e, &indexing)));
                next
            }
            Stmt::Assume(cond) => {
                exprs.push(unfold(cond, &indexing));
                indexing
            }
            Stmt::Havoc(var) => indexing.inc(var),
            Stmt::Sequence(stmts) => stmts
                .iter()
                .fold(indexing, |idx, stmt| stmt.unfold_into(idx, exprs)),
            Stmt::NonDet(branches) if branches.is_empty() => indexing,
            Stmt::NonDet(branches) => {
                let unfolded: Vec<_> = branches.iter().map(|b| b.unfold(&indexing)).collect();
                let joined = unfolded
                    .iter()
                    .fold(indexing.clone(), |acc, r| acc.join(&r.indexing));

                // Branches that touched fewer versions are padded with frame equalities so
                // that every branch ends on the joined indexing.
                let alternatives = unfolded.into_iter().map(|branch| {
                    let padding = joined.iter().filter_map(|(var, target)| {
                        let reached = branch.indexing.get(var);
                        (reached < target)
                            .then(|| eq(var.at(target).to_expr(), var.at(reached).to_expr()))
                    });
                    and(branch.exprs.into_iter().chain(padding))
                });
                exprs.push(or(alternatives));
                joined
            }
        }
    }

    /// Variables read or written by the statement.
    pub fn vars(&self) -> BTreeSet<VarDecl> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<VarDecl>) {
        match self {
            Stmt::Skip => {}
            Stmt::Assign(var, e) => {
                out.insert(var.clone());
                out.extend(walker::vars(e));
            }
            Stmt::Assume(cond) => out.extend(walker::vars(cond)),
            Stmt::Havoc(var) => {
                out.insert(var.clone());
            }
            Stmt::Sequence(stmts) | Stmt::NonDet(stmts) => {
                for stmt in stmts {
                    stmt.collect_vars(out);
                }
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Skip => write!(f, "skip"),
            Stmt::Assign(var, e) => write!(f, "{var} := {e}"),
            Stmt::Assume(cond) => write!(f, "assume {cond}"),
            Stmt::Havoc(var) => write!(f, "havoc {var}"),
            Stmt::Sequence(stmts) => {
                write!(f, "{{ ")?;
                for (i, stmt) in stmts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{stmt}")?;
                }
                write!(f, " }}")
            }
            Stmt::NonDet(branches) => {
                write!(f, "choice")?;
                for (i, branch) in branches.iter().enumerate() {
                    let sep = if i == 0 { "" } else { " or" };
                    write!(f, "{sep} {{ {branch} }}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::dtype::DataType;

    #[test]
    fn assignments_create_fresh_versions() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let y = VarDecl::new("y", DataType::bounded(0, 9));
        let stmt = Stmt::Sequence(vec![
            Stmt::assign(&x, x.to_expr() + int(1)),
            Stmt::assume(lt(x.to_expr(), y.to_expr())),
            Stmt::havoc(&y),
        ]);

        let result = stmt.unfold(&VarIndexing::all(0));
        assert_eq!(
            result.exprs,
            vec![
                eq(x.at(1).to_expr(), x.at(0).to_expr() + int(1)),
                lt(x.at(1).to_expr(), y.at(0).to_expr()),
            ]
        );
        assert_eq!(result.indexing, VarIndexing::all(0).inc(&x).inc(&y));
        assert_eq!(stmt.to_string(), "{ x := x + 1; assume x < y; havoc y }");
    }

    #[test]
    fn nondet_branches_are_padded_to_the_join() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let y = VarDecl::new("y", DataType::bounded(0, 9));
        let stmt = Stmt::NonDet(vec![
            Stmt::assign(&x, int(0)),
            Stmt::Sequence(vec![Stmt::assign(&y, int(1)), Stmt::assign(&y, int(2))]),
        ]);

        let result = stmt.unfold(&VarIndexing::all(0));
        let (x0, x1) = (x.at(0).to_expr(), x.at(1).to_expr());
        let (y0, y1, y2) = (y.at(0).to_expr(), y.at(1).to_expr(), y.at(2).to_expr());
        assert_eq!(
            result.exprs,
            vec![or([
                and([eq(x1.clone(), int(0)), eq(y2.clone(), y0)]),
                and([eq(y1.clone(), int(1)), eq(y2, int(2)), eq(x1, x0)]),
            ])]
        );
        assert_eq!(result.indexing, VarIndexing::all(0).inc(&x).inc(&y).inc(&y));
    }

    #[test]
    fn empty_nondet_is_skip() {
        let result = Stmt::NonDet(vec![]).unfold(&VarIndexing::all(3));
        assert!(result.exprs.is_empty());
        assert_eq!(result.indexing, VarIndexing::all(3));
        assert_eq!(result.to_expr(), Expr::True);
    }
}
