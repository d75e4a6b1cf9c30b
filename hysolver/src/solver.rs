//! Solver interface shared by every back-end.
//!
//! A [`Solver`] keeps a stack of scopes holding Boolean assertions over un-versioned
//! variables and versioned constants. An [`ItpSolver`] additionally tags assertions with
//! [`ItpMarker`]s so that, after an unsatisfiable check, a Craig interpolant separating two
//! groups of assertions can be requested through an [`ItpPattern`].
use std::{
    fmt,
    sync::atomic::{AtomicU32, Ordering},
};

use hyformal::{dtype::DataType, expr::Expr, model::Valuation, walker};
use strum::EnumIs;

use crate::error::{SolverError, SolverResult};

/// Outcome of a satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum SolverStatus {
    Sat,
    Unsat,
    /// The back-end gave up, e.g. because a search budget ran out.
    Unknown,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStatus::Sat => write!(f, "sat"),
            SolverStatus::Unsat => write!(f, "unsat"),
            SolverStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Incremental satisfiability checker with a scope stack.
pub trait Solver {
    /// Assert `assertion` in the current scope.
    ///
    /// Fails with [`SolverError::NonBooleanAssertion`] or [`SolverError::PrimedAssertion`]
    /// when the formula is not a Boolean formula over unprimed symbols.
    fn add(&mut self, assertion: Expr) -> SolverResult<()>;

    /// Decide the conjunction of every assertion of every open scope.
    fn check(&mut self) -> SolverResult<SolverStatus>;

    /// Open a new scope.
    fn push(&mut self);

    /// Close the `n` innermost scopes and drop their assertions.
    fn pop(&mut self, n: usize) -> SolverResult<()>;

    /// Drop every scope and every assertion.
    fn reset(&mut self);

    /// Result of the last check, `None` if the assertions changed since.
    fn status(&self) -> Option<SolverStatus>;

    /// Satisfying assignment found by the last check.
    ///
    /// Only available right after a [`SolverStatus::Sat`] check of the unchanged scope.
    fn model(&self) -> SolverResult<Valuation>;

    /// Every assertion currently in scope, outermost first.
    fn assertions(&self) -> Vec<Expr>;
}

static NEXT_SOLVER_ID: AtomicU32 = AtomicU32::new(0);

/// Fresh identity for a solver instance, used to reject markers of foreign solvers.
pub fn next_solver_id() -> u32 {
    NEXT_SOLVER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle naming a group of assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItpMarker {
    solver: u32,
    id: u32,
}

impl ItpMarker {
    /// Intended for back-end implementations.
    pub fn new(solver: u32, id: u32) -> Self {
        Self { solver, id }
    }

    #[inline]
    pub fn solver(&self) -> u32 {
        self.solver
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Display for ItpMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.solver, self.id)
    }
}

/// Binary interpolation request: `a` is the A-group, `b` the B-group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItpPattern {
    a: ItpMarker,
    b: ItpMarker,
}

impl ItpPattern {
    /// Intended for back-end implementations.
    pub fn new(a: ItpMarker, b: ItpMarker) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn a(&self) -> ItpMarker {
        self.a
    }

    #[inline]
    pub fn b(&self) -> ItpMarker {
        self.b
    }

    pub fn contains(&self, marker: ItpMarker) -> bool {
        self.a == marker || self.b == marker
    }
}

/// Interpolant computed for a binary pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolant {
    pattern: ItpPattern,
    formula: Expr,
}

impl Interpolant {
    pub fn new(pattern: ItpPattern, formula: Expr) -> Self {
        Self { pattern, formula }
    }

    pub fn pattern(&self) -> ItpPattern {
        self.pattern
    }

    /// Formula labelling `marker` in the interpolation sequence: the interpolant itself for
    /// the A-group and `false` for the B-group.
    pub fn eval(&self, marker: ItpMarker) -> SolverResult<Expr> {
        if marker == self.pattern.a {
            Ok(self.formula.clone())
        } else if marker == self.pattern.b {
            Ok(Expr::False)
        } else {
            Err(SolverError::UnknownMarker(marker))
        }
    }
}

/// Solver able to produce Craig interpolants.
pub trait ItpSolver: Solver {
    /// Create a marker owned by this solver.
    fn create_marker(&mut self) -> ItpMarker;

    /// Bind two markers of this solver into a binary pattern.
    fn create_bin_pattern(&mut self, a: ItpMarker, b: ItpMarker) -> SolverResult<ItpPattern>;

    /// Assert `assertion` in the current scope as part of the group named by `marker`.
    fn add_to(&mut self, marker: ItpMarker, assertion: Expr) -> SolverResult<()>;

    /// Interpolant of the last unsatisfiable check for `pattern`.
    fn get_interpolant(&mut self, pattern: &ItpPattern) -> SolverResult<Interpolant>;
}

/// Reject formulas a solver cannot assert: non-Boolean ones and ones mentioning a prime.
pub fn ensure_assertable(assertion: &Expr) -> SolverResult<()> {
    let found = assertion.dtype()?;
    if found != DataType::Bool {
        return Err(SolverError::NonBooleanAssertion {
            expr: assertion.to_string(),
            found,
        });
    }
    if walker::contains_prime(assertion) {
        return Err(SolverError::PrimedAssertion(assertion.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::prelude::*;

    #[test]
    fn interpolant_labels_pattern_markers() {
        let (a, b, c) = (ItpMarker::new(0, 0), ItpMarker::new(0, 1), ItpMarker::new(0, 2));
        let x = VarDecl::new("x", DataType::bounded(0, 3));
        let itp = Interpolant::new(ItpPattern::new(a, b), eq(x.to_expr(), int(1)));

        assert_eq!(itp.eval(a).unwrap(), eq(x.to_expr(), int(1)));
        assert_eq!(itp.eval(b).unwrap(), Expr::False);
        assert_eq!(itp.eval(c), Err(SolverError::UnknownMarker(c)));
    }

    #[test]
    fn rejects_non_boolean_and_primed_assertions() {
        let x = VarDecl::new("x", DataType::bounded(0, 3));
        assert!(ensure_assertable(&x.to_expr()).unwrap_err().is_non_boolean_assertion());
        assert!(ensure_assertable(&eq(x.primed(), int(0))).unwrap_err().is_primed_assertion());
        assert!(ensure_assertable(&eq(x.at(1).to_expr(), int(0))).is_ok());
    }

    #[test]
    fn solver_ids_are_distinct() {
        assert_ne!(next_solver_id(), next_solver_id());
    }
}
