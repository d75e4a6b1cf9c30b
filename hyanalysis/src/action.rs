//! Transition relations as seen by the model checkers.
use std::collections::BTreeMap;

use hyformal::{
    expr::{Expr, func::and},
    variable::VarDecl,
};

use crate::{
    error::AnalysisResult,
    indexing::VarIndexing,
    path::foldin,
    stmt::Stmt,
};

/// One step of a transition system.
///
/// [`as_formula`](TransitionAction::as_formula) relates the current state (plain variables)
/// to the next one (primed variables). A variable may be primed several times when the step
/// goes through intermediate versions; [`next_index_delta`](TransitionAction::next_index_delta)
/// tells by how much each variable's version advances over the whole step.
pub trait TransitionAction {
    fn as_formula(&self) -> Expr;

    fn next_index_delta(&self) -> VarIndexing;
}

/// Transition given by a statement.
#[derive(Debug, Clone)]
pub struct StmtAction {
    stmt: Stmt,
    formula: Expr,
    delta: VarIndexing,
}

impl StmtAction {
    pub fn new(stmt: Stmt) -> AnalysisResult<Self> {
        let base = VarIndexing::all(0);
        let unfolded = stmt.unfold(&base);
        let formula = foldin(&unfolded.to_expr(), &base)?;
        Ok(Self {
            stmt,
            formula,
            delta: unfolded.indexing,
        })
    }

    pub fn stmt(&self) -> &Stmt {
        &self.stmt
    }
}

impl TransitionAction for StmtAction {
    fn as_formula(&self) -> Expr {
        self.formula.clone()
    }

    fn next_index_delta(&self) -> VarIndexing {
        self.delta.clone()
    }
}

/// Transition given directly as a primed formula, e.g. `x' = x + 1`.
///
/// Variables that never appear primed keep their version, so they are left unchanged by the
/// step.
#[derive(Debug, Clone)]
pub struct ExprAction {
    formula: Expr,
    delta: VarIndexing,
}

impl ExprAction {
    pub fn new(formula: impl Into<Expr>) -> Self {
        let formula = formula.into();
        let mut depths = BTreeMap::new();
        prime_depths(&formula, 0, &mut depths);
        let delta = depths
            .iter()
            .fold(VarIndexing::all(0), |idx, (var, depth)| idx.with(var, *depth));
        Self { formula, delta }
    }

    /// Conjunction of several primed constraints.
    pub fn from_parts(parts: impl IntoIterator<Item = Expr>) -> Self {
        Self::new(and(parts))
    }
}

fn prime_depths(expr: &Expr, primes: u32, out: &mut BTreeMap<VarDecl, u32>) {
    match expr {
        Expr::Var(v) => {
            let depth = out.entry(v.clone()).or_insert(0);
            *depth = (*depth).max(primes);
        }
        Expr::Prime(inner) => prime_depths(inner, primes + 1, out),
        _ => {
            for child in expr.children() {
                prime_depths(child, primes, out);
            }
        }
    }
}

impl TransitionAction for ExprAction {
    fn as_formula(&self) -> Expr {
        self.formula.clone()
    }

    fn next_index_delta(&self) -> VarIndexing {
        self.delta.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::unfold;
    use hyformal::prelude::*;

    #[test]
    fn expr_action_delta_is_the_prime_depth() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let y = VarDecl::new("y", DataType::bounded(0, 9));
        let z = VarDecl::new("z", DataType::Bool);
        let action = ExprAction::from_parts([
            eq(prime(x.primed()), x.to_expr() + y.to_expr()),
            eq(y.primed(), y.to_expr()),
            z.to_expr(),
        ]);

        let delta = action.next_index_delta();
        assert_eq!((delta.get(&x), delta.get(&y), delta.get(&z)), (2, 1, 0));
        assert_eq!(delta.default_index(), 0);
    }

    #[test]
    fn stmt_action_folds_versions_into_primes() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let stmt = Stmt::Sequence(vec![
            Stmt::assign(&x, x.to_expr() + int(1)),
            Stmt::assign(&x, x.to_expr() * int(2)),
        ]);
        let action = StmtAction::new(stmt).unwrap();

        assert_eq!(
            action.as_formula(),
            and([
                eq(x.primed(), x.to_expr() + int(1)),
                eq(prime(x.primed()), x.primed() * int(2)),
            ])
        );
        assert_eq!(action.next_index_delta().get(&x), 2);

        // Unfolding the formula at any indexing reproduces the statement's lowering.
        let at = VarIndexing::all(3);
        assert_eq!(
            unfold(&action.as_formula(), &at),
            action.stmt().unfold(&at).to_expr()
        );
    }
}
