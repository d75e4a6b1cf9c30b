//! Interpolating solver over finite domains.
//!
//! [`FiniteItpSolver`] decides conjunctions of assertions whose symbols are Booleans or
//! bounded integers. Satisfiability is decided by depth-first search over symbol boxes with
//! interval propagation (see `search`). Interpolants are the *strongest* interpolant: the
//! projection of the A-group onto the symbols it shares with the B-group, enumerated as
//! disjoint cubes and rendered as range constraints (see `cube`).
//!
//! Example
//! ```
//! use hyformal::prelude::*;
//! use hysolver::prelude::*;
//!
//! let x = VarDecl::new("x", DataType::bounded(0, 7));
//! let mut solver = FiniteItpSolver::default();
//! let (a, b) = (solver.create_marker(), solver.create_marker());
//! solver.add_to(a, eq(x.at(0).to_expr(), int(0))).unwrap();
//! solver.add_to(a, eq(x.at(1).to_expr(), x.at(0).to_expr() + int(1))).unwrap();
//! solver.add_to(b, gt(x.at(1).to_expr(), int(4))).unwrap();
//! assert_eq!(solver.check().unwrap(), SolverStatus::Unsat);
//!
//! let pattern = solver.create_bin_pattern(a, b).unwrap();
//! let itp = solver.get_interpolant(&pattern).unwrap();
//! assert_eq!(itp.eval(a).unwrap(), eq(x.at(1).to_expr(), int(1)));
//! ```
mod cube;
mod domain;
mod search;

use std::collections::BTreeSet;

use hyformal::{expr::Expr, model::Valuation, variable::Symbol, walker};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    error::{SolverError, SolverResult},
    solver::{
        Interpolant, ItpMarker, ItpPattern, ItpSolver, Solver, SolverStatus, ensure_assertable,
        next_solver_id,
    },
};
use domain::Problem;
use search::{Search, SearchOutcome};

/// Search budgets of the finite-domain solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiniteSolverConfig {
    /// Decisions allowed per check (and per interpolant) before giving up.
    pub max_decisions: u64,
    /// Cubes allowed in one projection before giving up.
    pub max_cubes: usize,
}

impl Default for FiniteSolverConfig {
    fn default() -> Self {
        Self {
            max_decisions: 1_000_000,
            max_cubes: 1 << 16,
        }
    }
}

/// Counters accumulated over the lifetime of a solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FiniteSolverStats {
    pub checks: u64,
    pub interpolants: u64,
    pub decisions: u64,
    pub conflicts: u64,
}

#[derive(Debug, Clone)]
struct Assertion {
    marker: Option<ItpMarker>,
    expr: Expr,
}

#[derive(Debug, Clone)]
enum LastCheck {
    Sat(Valuation),
    Unsat,
    Unknown,
}

impl LastCheck {
    fn status(&self) -> SolverStatus {
        match self {
            LastCheck::Sat(_) => SolverStatus::Sat,
            LastCheck::Unsat => SolverStatus::Unsat,
            LastCheck::Unknown => SolverStatus::Unknown,
        }
    }
}

/// Interpolating solver for Booleans and bounded integers.
#[derive(Debug)]
pub struct FiniteItpSolver {
    id: u32,
    config: FiniteSolverConfig,
    assertions: Vec<Assertion>,
    /// Number of assertions below each open scope.
    scopes: Vec<usize>,
    next_marker: u32,
    last: Option<LastCheck>,
    stats: FiniteSolverStats,
}

impl Default for FiniteItpSolver {
    fn default() -> Self {
        Self::new(FiniteSolverConfig::default())
    }
}

impl FiniteItpSolver {
    pub fn new(config: FiniteSolverConfig) -> Self {
        Self {
            id: next_solver_id(),
            config,
            assertions: Vec::new(),
            scopes: Vec::new(),
            next_marker: 0,
            last: None,
            stats: FiniteSolverStats::default(),
        }
    }

    pub fn config(&self) -> &FiniteSolverConfig {
        &self.config
    }

    pub fn stats(&self) -> &FiniteSolverStats {
        &self.stats
    }

    /// Number of open scopes.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    fn check_marker(&self, marker: ItpMarker) -> SolverResult<()> {
        if marker.solver() == self.id && marker.id() < self.next_marker {
            Ok(())
        } else {
            Err(SolverError::UnknownMarker(marker))
        }
    }

    fn assert(&mut self, marker: Option<ItpMarker>, expr: Expr) -> SolverResult<()> {
        ensure_assertable(&expr)?;
        // Compiling alone reports unbounded symbols at assertion time.
        Problem::compile([&expr])?;
        self.last = None;
        self.assertions.push(Assertion { marker, expr });
        Ok(())
    }
}

impl Solver for FiniteItpSolver {
    fn add(&mut self, assertion: Expr) -> SolverResult<()> {
        self.assert(None, assertion)
    }

    fn check(&mut self) -> SolverResult<SolverStatus> {
        let problem = Problem::compile(self.assertions.iter().map(|a| &a.expr))?;
        let mut search = Search::new(&problem, self.config.max_decisions);
        let outcome = search.solve(problem.initial_boxes());

        self.stats.checks += 1;
        self.stats.decisions += search.decisions;
        self.stats.conflicts += search.conflicts;
        trace!(
            "Check of {} assertion(s) over {} symbol(s): {} decision(s), {} conflict(s)",
            self.assertions.len(),
            problem.symbols.len(),
            search.decisions,
            search.conflicts
        );

        let last = match outcome {
            SearchOutcome::Sat(boxes) => LastCheck::Sat(problem.valuation(&boxes)),
            SearchOutcome::Unsat => LastCheck::Unsat,
            SearchOutcome::Unknown => {
                debug!(
                    "Decision budget of {} exhausted, answering unknown",
                    self.config.max_decisions
                );
                LastCheck::Unknown
            }
        };
        let status = last.status();
        self.last = Some(last);
        Ok(status)
    }

    fn push(&mut self) {
        self.last = None;
        self.scopes.push(self.assertions.len());
    }

    fn pop(&mut self, n: usize) -> SolverResult<()> {
        if n > self.scopes.len() {
            return Err(SolverError::PopUnderflow {
                requested: n,
                available: self.scopes.len(),
            });
        }
        if n == 0 {
            return Ok(());
        }
        let keep = self.scopes[self.scopes.len() - n];
        self.scopes.truncate(self.scopes.len() - n);
        self.assertions.truncate(keep);
        self.last = None;
        Ok(())
    }

    fn reset(&mut self) {
        self.assertions.clear();
        self.scopes.clear();
        self.last = None;
    }

    fn status(&self) -> Option<SolverStatus> {
        self.last.as_ref().map(LastCheck::status)
    }

    fn model(&self) -> SolverResult<Valuation> {
        match &self.last {
            Some(LastCheck::Sat(model)) => Ok(model.clone()),
            other => Err(SolverError::NoModel(other.as_ref().map(LastCheck::status))),
        }
    }

    fn assertions(&self) -> Vec<Expr> {
        self.assertions.iter().map(|a| a.expr.clone()).collect()
    }
}

impl ItpSolver for FiniteItpSolver {
    fn create_marker(&mut self) -> ItpMarker {
        let marker = ItpMarker::new(self.id, self.next_marker);
        self.next_marker += 1;
        marker
    }

    fn create_bin_pattern(&mut self, a: ItpMarker, b: ItpMarker) -> SolverResult<ItpPattern> {
        self.check_marker(a)?;
        self.check_marker(b)?;
        Ok(ItpPattern::new(a, b))
    }

    fn add_to(&mut self, marker: ItpMarker, assertion: Expr) -> SolverResult<()> {
        self.check_marker(marker)?;
        self.assert(Some(marker), assertion)
    }

    fn get_interpolant(&mut self, pattern: &ItpPattern) -> SolverResult<Interpolant> {
        if self.check_marker(pattern.a()).is_err() || self.check_marker(pattern.b()).is_err() {
            return Err(SolverError::UnknownPattern(pattern.a(), pattern.b()));
        }
        match &self.last {
            Some(LastCheck::Unsat) => {}
            other => {
                return Err(SolverError::InterpolantUnavailable(
                    other.as_ref().map(LastCheck::status),
                ));
            }
        }
        if let Some(marker) = self
            .assertions
            .iter()
            .filter_map(|a| a.marker)
            .find(|&m| !pattern.contains(m))
        {
            return Err(SolverError::MarkerOutsidePattern(marker));
        }

        // Unmarked assertions belong to both groups.
        let in_group = |a: &Assertion, m: ItpMarker| a.marker.is_none_or(|am| am == m);
        let a_side = self.assertions.iter().filter(|a| in_group(a, pattern.a()));
        let b_symbols: BTreeSet<Symbol> = self
            .assertions
            .iter()
            .filter(|a| in_group(a, pattern.b()))
            .flat_map(|a| walker::symbols(&a.expr))
            .collect();

        let problem = Problem::compile(a_side.map(|a| &a.expr))?;
        let shared: Vec<usize> = problem
            .symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| b_symbols.contains(s))
            .map(|(i, _)| i)
            .collect();

        let cubes = cube::compress(cube::project(&problem, &shared, &self.config)?);
        let formula = cube::to_expr(&problem, &shared, &cubes);
        self.stats.interpolants += 1;
        debug!(
            "Interpolant over {} shared symbol(s) from {} cube(s)",
            shared.len(),
            cubes.len()
        );
        Ok(Interpolant::new(*pattern, formula))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::prelude::*;

    fn counter() -> VarDecl {
        VarDecl::new("x", DataType::bounded(0, 7))
    }

    #[test]
    fn empty_scope_is_satisfiable() {
        let mut solver = FiniteItpSolver::default();
        assert_eq!(solver.status(), None);
        assert_eq!(solver.check().unwrap(), SolverStatus::Sat);
        assert!(solver.model().unwrap().is_empty());
    }

    #[test]
    fn finds_models_of_arithmetic_constraints() {
        let x = counter();
        let y = VarDecl::new("y", DataType::bounded(-4, 4));
        let b = VarDecl::new("b", DataType::Bool);
        let mut solver = FiniteItpSolver::default();
        let f = and([
            eq(x.to_expr() * int(2), y.to_expr() + int(5)),
            implies(b.to_expr(), lt(y.to_expr(), int(0))),
            b.to_expr(),
        ]);
        solver.add(f.clone()).unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Sat);
        let model = solver.model().unwrap();
        assert_eq!(f.eval(&model), Ok(Value::Bool(true)));
    }

    #[test]
    fn proves_unsatisfiability() {
        let x = counter();
        let mut solver = FiniteItpSolver::default();
        solver.add(eq(rem(x.to_expr(), int(2)), int(1))).unwrap();
        solver.add(eq(rem(x.to_expr(), int(4)), int(2))).unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Unsat);
        assert!(solver.model().unwrap_err().is_no_model());
    }

    #[test]
    fn scopes_discard_assertions() {
        let x = counter();
        let mut solver = FiniteItpSolver::default();
        solver.add(geq(x.to_expr(), int(3))).unwrap();
        solver.push();
        solver.add(lt(x.to_expr(), int(3))).unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Unsat);
        assert_eq!(solver.assertions().len(), 2);

        solver.pop(1).unwrap();
        assert_eq!(solver.status(), None);
        assert_eq!(solver.assertions().len(), 1);
        assert_eq!(solver.check().unwrap(), SolverStatus::Sat);

        assert_eq!(
            solver.pop(1),
            Err(SolverError::PopUnderflow {
                requested: 1,
                available: 0
            })
        );
        solver.reset();
        assert!(solver.assertions().is_empty());
    }

    #[test]
    fn rejects_unbounded_symbols_on_assertion() {
        let n = VarDecl::new("n", DataType::Int);
        let mut solver = FiniteItpSolver::default();
        let err = solver.add(gt(n.to_expr(), int(0))).unwrap_err();
        assert_eq!(err, SolverError::UnboundedDomain(Symbol::Var(n)));
        assert!(solver.assertions().is_empty());
    }

    #[test]
    fn decision_budget_turns_into_unknown() {
        let vars: Vec<_> = (0..6)
            .map(|i| VarDecl::new(format!("v{i}"), DataType::bounded(0, 15)))
            .collect();
        let mut solver = FiniteItpSolver::new(FiniteSolverConfig {
            max_decisions: 2,
            ..Default::default()
        });
        // Pairwise distinct values whose sum is odd and large: needs real search.
        for (i, v) in vars.iter().enumerate() {
            for w in &vars[i + 1..] {
                solver.add(neq(v.to_expr(), w.to_expr())).unwrap();
            }
        }
        solver
            .add(eq(rem(add(vars.iter().map(|v| v.to_expr())), int(2)), int(1)))
            .unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Unknown);
        assert!(solver.model().unwrap_err().is_no_model());
    }

    #[test]
    fn interpolant_is_the_projection_onto_shared_symbols() {
        let x = counter();
        let mut solver = FiniteItpSolver::default();
        let (a, b) = (solver.create_marker(), solver.create_marker());
        solver.add_to(a, leq(x.at(0).to_expr(), int(2))).unwrap();
        solver
            .add_to(a, eq(x.at(1).to_expr(), x.at(0).to_expr() + int(1)))
            .unwrap();
        solver.add_to(b, geq(x.at(1).to_expr(), int(5))).unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Unsat);

        let pattern = solver.create_bin_pattern(a, b).unwrap();
        let itp = solver.get_interpolant(&pattern).unwrap();
        assert_eq!(
            itp.eval(a).unwrap(),
            and([geq(x.at(1).to_expr(), int(1)), leq(x.at(1).to_expr(), int(3))])
        );
        assert_eq!(itp.eval(b).unwrap(), Expr::False);
    }

    #[test]
    fn interpolants_need_an_unchanged_unsat_scope() {
        let x = counter();
        let mut solver = FiniteItpSolver::default();
        let (a, b) = (solver.create_marker(), solver.create_marker());
        let pattern = solver.create_bin_pattern(a, b).unwrap();

        solver.add_to(a, eq(x.to_expr(), int(1))).unwrap();
        assert_eq!(
            solver.get_interpolant(&pattern),
            Err(SolverError::InterpolantUnavailable(None))
        );
        assert_eq!(solver.check().unwrap(), SolverStatus::Sat);
        assert_eq!(
            solver.get_interpolant(&pattern),
            Err(SolverError::InterpolantUnavailable(Some(SolverStatus::Sat)))
        );

        solver.push();
        solver.add_to(b, eq(x.to_expr(), int(2))).unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Unsat);
        assert!(solver.get_interpolant(&pattern).is_ok());
        solver.pop(1).unwrap();
        assert!(solver.get_interpolant(&pattern).unwrap_err().is_interpolant_unavailable());
    }

    #[test]
    fn foreign_and_stray_markers_are_rejected() {
        let x = counter();
        let mut solver = FiniteItpSolver::default();
        let mut other = FiniteItpSolver::default();
        let (a, b, c) = (
            solver.create_marker(),
            solver.create_marker(),
            solver.create_marker(),
        );
        let foreign = other.create_marker();

        assert_eq!(
            solver.add_to(foreign, Expr::True),
            Err(SolverError::UnknownMarker(foreign))
        );
        assert_eq!(
            solver.create_bin_pattern(a, foreign),
            Err(SolverError::UnknownMarker(foreign))
        );
        let alien = other.create_bin_pattern(foreign, foreign).unwrap();
        assert_eq!(
            solver.get_interpolant(&alien),
            Err(SolverError::UnknownPattern(foreign, foreign))
        );

        solver.add_to(a, eq(x.to_expr(), int(1))).unwrap();
        solver.add_to(c, eq(x.to_expr(), int(2))).unwrap();
        assert_eq!(solver.check().unwrap(), SolverStatus::Unsat);
        let pattern = solver.create_bin_pattern(a, b).unwrap();
        assert_eq!(
            solver.get_interpolant(&pattern),
            Err(SolverError::MarkerOutsidePattern(c))
        );
    }
}
