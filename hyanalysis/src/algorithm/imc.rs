//! Interpolation-based model checking.
//!
//! For growing bounds `k`, the checker unrolls `k` steps of the transition relation and
//! splits the unrolling in two groups: the first step (from the current image) and the
//! remaining `k - 1` steps ending in a bad state. While that split is unsatisfiable, the
//! interpolant between the two groups over-approximates the states reachable in one more
//! step without being able to reach a bad state within the remaining steps. Interpolants are
//! accumulated into an image until a new one adds nothing, at which point the image is an
//! inductive invariant excluding the bad states.
//!
//! Backward checking swaps the roles of the groups: the interpolant is taken from the suffix
//! and negated.
//!
//! ```
//! use hyformal::prelude::*;
//! use hysolver::prelude::*;
//! use hyanalysis::prelude::*;
//!
//! let x = VarDecl::new("x", DataType::bounded(0, 15));
//! let mut solver = FiniteItpSolver::default();
//! let mut checker = ImcChecker::builder(&mut solver)
//!     .init(eq(x.at(0).to_expr(), int(0)))
//!     .action(ExprAction::new(eq(x.primed(), x.to_expr() + int(1))))
//!     .property(lt(x.to_expr(), int(3)))
//!     .val_to_state(|v: &Valuation| v.clone())
//!     .bound(8)
//!     .build()
//!     .unwrap();
//!
//! let result = checker.check(&()).unwrap();
//! assert_eq!(result.counterexample().map(|c| c.depth), Some(3));
//! ```
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use hyformal::{
    eval::eval_bool,
    expr::{Expr, func::*},
    model::Valuation,
};
use hysolver::{
    error::SolverError,
    solver::{ItpSolver, SolverStatus},
    utils::WithPushPop,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::{
    action::TransitionAction,
    algorithm::{
        Counterexample, SafetyChecker, SafetyProof, SafetyResult, Statistics, UnknownReason,
        Verdict,
    },
    config::ImcConfig,
    error::{AnalysisError, AnalysisResult},
    indexing::VarIndexing,
    path::{extract_valuation, foldin, unfold},
};

/// Which side of the unrolling the interpolants are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumIs, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    fn partition(self) -> Box<dyn Partition> {
        match self {
            Direction::Forward => Box::new(Forward),
            Direction::Backward => Box::new(Backward),
        }
    }
}

/// Assignment of the unrolled trace to the two interpolation groups.
///
/// `formulas[0]` is the initial condition, `formulas[i]` the transition from step `i - 1` to
/// step `i`, and `target` the bad states. Both methods return `(a, b)` where the interpolant
/// is requested for `a`.
pub trait Partition {
    fn partition_for_check(&self, formulas: &[Expr], target: &Expr) -> (Expr, Expr);

    /// Same as [`Partition::partition_for_check`] with `image` replacing the initial
    /// condition.
    fn partition_for_refinement(
        &self,
        image: &Expr,
        formulas: &[Expr],
        target: &Expr,
    ) -> (Expr, Expr);

    /// Over-approximation of the states after the first step, from the interpolant of `a`.
    fn interpolant(&self, itp: Expr) -> Expr;
}

fn prefix(first: &Expr, formulas: &[Expr]) -> Expr {
    and(std::iter::once(first.clone()).chain(formulas.get(1).cloned()))
}

fn suffix(formulas: &[Expr], target: &Expr) -> Expr {
    and(formulas.iter().skip(2).cloned().chain([target.clone()]))
}

pub struct Forward;

impl Partition for Forward {
    fn partition_for_check(&self, formulas: &[Expr], target: &Expr) -> (Expr, Expr) {
        (prefix(&formulas[0], formulas), suffix(formulas, target))
    }

    fn partition_for_refinement(
        &self,
        image: &Expr,
        formulas: &[Expr],
        target: &Expr,
    ) -> (Expr, Expr) {
        (prefix(image, formulas), suffix(formulas, target))
    }

    fn interpolant(&self, itp: Expr) -> Expr {
        itp
    }
}

pub struct Backward;

impl Partition for Backward {
    fn partition_for_check(&self, formulas: &[Expr], target: &Expr) -> (Expr, Expr) {
        (suffix(formulas, target), prefix(&formulas[0], formulas))
    }

    fn partition_for_refinement(
        &self,
        image: &Expr,
        formulas: &[Expr],
        target: &Expr,
    ) -> (Expr, Expr) {
        (suffix(formulas, target), prefix(image, formulas))
    }

    fn interpolant(&self, itp: Expr) -> Expr {
        not(itp)
    }
}

/// Shared flag asking a running check to stop at its next solver query.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ImcChecker<'s, S> {
    init: Expr,
    base: VarIndexing,
    action: Box<dyn TransitionAction + 's>,
    property: Expr,
    val_to_state: Box<dyn Fn(&Valuation) -> S + 's>,
    direction: Direction,
    partition: Box<dyn Partition>,
    solver: &'s mut dyn ItpSolver,
    bound: Option<usize>,
    cumulative_bad_states: bool,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

pub struct ImcCheckerBuilder<'s, S> {
    solver: &'s mut dyn ItpSolver,
    init: Option<Expr>,
    base: VarIndexing,
    action: Option<Box<dyn TransitionAction + 's>>,
    property: Option<Expr>,
    val_to_state: Option<Box<dyn Fn(&Valuation) -> S + 's>>,
    direction: Direction,
    bound: Option<usize>,
    cumulative_bad_states: bool,
    timeout: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl<'s, S> ImcCheckerBuilder<'s, S> {
    /// Initial condition, already unfolded at the base indexing.
    pub fn init(mut self, init: impl Into<Expr>) -> Self {
        self.init = Some(init.into());
        self
    }

    /// Indexing of the initial states. Defaults to every variable at version 0.
    pub fn base(mut self, base: VarIndexing) -> Self {
        self.base = base;
        self
    }

    pub fn action(mut self, action: impl TransitionAction + 's) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Property over plain variables. Its negation describes the bad states.
    pub fn property(mut self, property: impl Into<Expr>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Builds counterexample states from solver models, or from an empty valuation when no
    /// model is available.
    pub fn val_to_state(mut self, f: impl Fn(&Valuation) -> S + 's) -> Self {
        self.val_to_state = Some(Box::new(f));
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Deepest unrolling explored. Unbounded by default.
    pub fn bound(mut self, bound: impl Into<Option<usize>>) -> Self {
        self.bound = bound.into();
        self
    }

    /// Target the bad states of every step of the unrolling rather than the last one only.
    pub fn cumulative_bad_states(mut self, cumulative: bool) -> Self {
        self.cumulative_bad_states = cumulative;
        self
    }

    pub fn timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Apply the checker settings of `config`.
    pub fn config(self, config: &ImcConfig) -> Self {
        self.direction(config.direction)
            .bound(config.bound)
            .cumulative_bad_states(config.cumulative_bad_states)
            .timeout(config.timeout())
    }

    pub fn build(self) -> AnalysisResult<ImcChecker<'s, S>> {
        if self.bound == Some(0) {
            return Err(AnalysisError::ZeroBound);
        }
        Ok(ImcChecker {
            init: self.init.ok_or(AnalysisError::MissingInput("initial condition"))?,
            base: self.base,
            action: self.action.ok_or(AnalysisError::MissingInput("transition action"))?,
            property: self.property.ok_or(AnalysisError::MissingInput("property"))?,
            val_to_state: self
                .val_to_state
                .ok_or(AnalysisError::MissingInput("state reconstruction"))?,
            direction: self.direction,
            partition: self.direction.partition(),
            solver: self.solver,
            bound: self.bound,
            cumulative_bad_states: self.cumulative_bad_states,
            timeout: self.timeout,
            cancel: self.cancel,
        })
    }
}

impl<'s, S> ImcChecker<'s, S> {
    pub fn builder(solver: &'s mut dyn ItpSolver) -> ImcCheckerBuilder<'s, S> {
        ImcCheckerBuilder {
            solver,
            init: None,
            base: VarIndexing::all(0),
            action: None,
            property: None,
            val_to_state: None,
            direction: Direction::default(),
            bound: None,
            cumulative_bad_states: true,
            timeout: None,
            cancel: None,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn bound(&self) -> Option<usize> {
        self.bound
    }

    fn run(&mut self) -> AnalysisResult<Outcome<S>> {
        let limits = Limits {
            deadline: self.timeout.map(|t| Instant::now() + t),
            cancel: self.cancel.clone(),
        };
        let mut stats = Statistics::default();

        let trans = self.action.as_formula();
        let delta = self.action.next_index_delta();
        let a = self.solver.create_marker();
        let b = self.solver.create_marker();
        let pattern = self.solver.create_bin_pattern(a, b)?;

        // Depth 0: no initial state, or an initial state that is already bad.
        {
            let mut scope = WithPushPop::new(&mut *self.solver);
            scope.add(self.init.clone())?;
            match limits.query(&mut *scope, &mut stats)? {
                Ok(SolverStatus::Unsat) => {
                    let proof = SafetyProof {
                        depth: 0,
                        image_disjuncts: 0,
                        image: ff(),
                    };
                    return Ok((Verdict::Safe(proof), stats));
                }
                Ok(_) => {}
                Err(reason) => return Ok((Verdict::Unknown(reason), stats)),
            }
            scope.add(unfold(&not(self.property.clone()), &self.base))?;
            match limits.query(&mut *scope, &mut stats)? {
                Ok(SolverStatus::Sat) => {
                    let base = [self.base.clone()];
                    let cex = witness(&*scope, &base, &self.property, &*self.val_to_state, 0);
                    return Ok((Verdict::Unsafe(cex), stats));
                }
                Ok(_) => {}
                Err(reason) => return Ok((Verdict::Unknown(reason), stats)),
            }
        }

        let mut formulas = vec![self.init.clone()];
        let mut indexings = vec![self.base.clone()];
        let mut bad_states = Vec::new();

        let mut k = 1;
        while self.bound.is_none_or(|bound| k <= bound) {
            assert_eq!(formulas.len(), k, "trace formulas out of step with the bound");
            assert_eq!(indexings.len(), k, "trace indexings out of step with the bound");
            stats.iterations = k;
            info!("IMC iteration {k} ({:?})", self.direction);

            let prev = &indexings[k - 1];
            let next = prev.add(&delta);
            formulas.push(unfold(&trans, prev));
            bad_states.push(unfold(&not(self.property.clone()), &next));
            indexings.push(next);
            assert_eq!(formulas.len(), k + 1);
            assert_eq!(indexings.len(), k + 1);

            let target = if self.cumulative_bad_states {
                or(bad_states.iter().cloned())
            } else {
                bad_states[k - 1].clone()
            };

            let mut scope = WithPushPop::new(&mut *self.solver);
            let (ea, eb) = self.partition.partition_for_check(&formulas, &target);
            scope.add_to(a, ea)?;
            scope.add_to(b, eb)?;
            match limits.query(&mut *scope, &mut stats)? {
                Ok(SolverStatus::Sat) => {
                    let cex =
                        witness(&*scope, &indexings, &self.property, &*self.val_to_state, k);
                    return Ok((Verdict::Unsafe(cex), stats));
                }
                Ok(_) => {}
                Err(reason) => return Ok((Verdict::Unknown(reason), stats)),
            }

            let mut image = self.init.clone();
            let mut image_disjuncts = 1;
            loop {
                let itp = match scope.get_interpolant(&pattern) {
                    Ok(itp) => itp.eval(a)?,
                    Err(SolverError::ResourceExhausted(what)) => {
                        warn!("Interpolation gave up: {what}");
                        return Ok((Verdict::Unknown(UnknownReason::SolverInconclusive), stats));
                    }
                    Err(err) => return Err(err.into()),
                };
                let itp = self.partition.interpolant(itp);
                let itp = unfold(&foldin(&itp, &indexings[1])?, &indexings[0]);
                drop(scope);

                // Fixpoint: the new states are already part of the image.
                {
                    let mut fixpoint = WithPushPop::new(&mut *self.solver);
                    fixpoint.add(and([itp.clone(), not(image.clone())]))?;
                    match limits.query(&mut *fixpoint, &mut stats)? {
                        Ok(SolverStatus::Unsat) => {
                            let proof = SafetyProof {
                                depth: k,
                                image_disjuncts,
                                image,
                            };
                            return Ok((Verdict::Safe(proof), stats));
                        }
                        Ok(_) => {}
                        Err(reason) => return Ok((Verdict::Unknown(reason), stats)),
                    }
                }

                image = or([image, itp.clone()]);
                image_disjuncts += 1;
                stats.refinements += 1;
                debug!("Image refined at bound {k}: {image_disjuncts} disjunct(s)");

                scope = WithPushPop::new(&mut *self.solver);
                let (ea, eb) = self.partition.partition_for_refinement(&itp, &formulas, &target);
                scope.add_to(a, ea)?;
                scope.add_to(b, eb)?;
                match limits.query(&mut *scope, &mut stats)? {
                    Ok(SolverStatus::Unsat) => {}
                    Ok(_) => {
                        // The over-approximation reaches a bad state, possibly spuriously.
                        debug!("Refined image reaches a bad state at bound {k}, unrolling further");
                        break;
                    }
                    Err(reason) => return Ok((Verdict::Unknown(reason), stats)),
                }
            }
            k += 1;
        }

        Ok((Verdict::Unknown(UnknownReason::BoundReached(k - 1)), stats))
    }
}

type Outcome<S> = (Verdict<S>, Statistics);

/// Stop conditions checked before every solver query.
struct Limits {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl Limits {
    /// `Ok(Err(reason))` ends the run without a verdict.
    fn query(
        &self,
        solver: &mut dyn ItpSolver,
        stats: &mut Statistics,
    ) -> AnalysisResult<Result<SolverStatus, UnknownReason>> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Ok(Err(UnknownReason::Cancelled));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Ok(Err(UnknownReason::Timeout));
        }
        stats.solver_checks += 1;
        match solver.check() {
            Ok(SolverStatus::Unknown) => Ok(Err(UnknownReason::SolverInconclusive)),
            Ok(status) => Ok(Ok(status)),
            Err(SolverError::ResourceExhausted(what)) => {
                warn!("Solver gave up: {what}");
                Ok(Err(UnknownReason::SolverInconclusive))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// States of the model up to the first one violating `property`.
fn witness<S>(
    solver: &dyn ItpSolver,
    indexings: &[VarIndexing],
    property: &Expr,
    val_to_state: &dyn Fn(&Valuation) -> S,
    depth: usize,
) -> Counterexample<S> {
    let model = match solver.model() {
        Ok(model) => model,
        Err(err) => {
            warn!("No model for the counterexample at depth {depth}: {err}");
            return Counterexample {
                depth,
                states: vec![val_to_state(&Valuation::new())],
            };
        }
    };

    let mut states = Vec::with_capacity(depth + 1);
    for (i, indexing) in indexings.iter().enumerate().take(depth + 1) {
        let state = extract_valuation(&model, indexing);
        states.push(val_to_state(&state));
        if matches!(eval_bool(property, &state), Ok(false)) {
            return Counterexample { depth: i, states };
        }
    }
    Counterexample { depth, states }
}

impl<'s, S> SafetyChecker for ImcChecker<'s, S> {
    type State = S;
    type Precision = ();

    fn check(&mut self, _precision: &()) -> AnalysisResult<SafetyResult<S>> {
        let started = Instant::now();
        let (verdict, mut stats) = self.run()?;
        stats.elapsed = started.elapsed();
        info!("IMC finished: {verdict} [{stats}]");
        Ok(SafetyResult::new(verdict, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ExprAction;
    use hyformal::prelude::*;
    use hysolver::finite::FiniteItpSolver;

    fn counter(limit: i64) -> (VarDecl, Expr, ExprAction) {
        let x = VarDecl::new("x", DataType::bounded(0, 15));
        let init = eq(x.at(0).to_expr(), int(0));
        let next = ite(lt(x.to_expr(), int(limit)), x.to_expr() + int(1), x.to_expr());
        let step = ExprAction::new(eq(x.primed(), next));
        (x, init, step)
    }

    #[test]
    fn partitions_mirror_each_other() {
        let f: Vec<Expr> = (0..4)
            .map(|i| VarDecl::new(format!("p{i}"), DataType::Bool).to_expr())
            .collect();
        let t = VarDecl::new("bad", DataType::Bool).to_expr();
        let (fa, fb) = Forward.partition_for_check(&f, &t);
        let (ba, bb) = Backward.partition_for_check(&f, &t);
        assert_eq!((fa.clone(), fb.clone()), (bb, ba));
        assert_eq!(fa, and([f[0].clone(), f[1].clone()]));
        assert_eq!(fb, and([f[2].clone(), f[3].clone(), t.clone()]));

        let image = VarDecl::new("img", DataType::Bool).to_expr();
        let (ra, _) = Forward.partition_for_refinement(&image, &f, &t);
        assert_eq!(ra, and([image, f[1].clone()]));
        assert_eq!(Backward.interpolant(t.clone()), not(t));
    }

    #[test]
    fn saturating_counter_is_safe_in_both_directions() {
        for direction in [Direction::Forward, Direction::Backward] {
            let (x, init, step) = counter(4);
            let mut solver = FiniteItpSolver::default();
            let mut checker = ImcChecker::builder(&mut solver)
                .init(init)
                .action(step)
                .property(leq(x.to_expr(), int(4)))
                .val_to_state(|v: &Valuation| v.clone())
                .direction(direction)
                .bound(20)
                .build()
                .unwrap();

            let result = checker.check(&()).unwrap();
            assert!(result.is_safe(), "{direction:?}: {result}");
            assert!(result.stats.refinements <= result.stats.solver_checks);
        }
    }

    #[test]
    fn rejects_a_zero_bound_and_missing_inputs() {
        let (x, init, step) = counter(4);
        let mut solver = FiniteItpSolver::default();
        let err = ImcChecker::<()>::builder(&mut solver)
            .init(init)
            .action(step)
            .property(leq(x.to_expr(), int(4)))
            .val_to_state(|_| ())
            .bound(0)
            .build()
            .err()
            .unwrap();
        assert!(err.is_zero_bound());

        let err = ImcChecker::<()>::builder(&mut solver).build().err().unwrap();
        assert!(err.is_missing_input());
    }

    #[test]
    fn cancelled_before_the_first_query() {
        let (x, init, step) = counter(4);
        let token = CancellationToken::new();
        token.cancel();
        let mut solver = FiniteItpSolver::default();
        let mut checker = ImcChecker::builder(&mut solver)
            .init(init)
            .action(step)
            .property(leq(x.to_expr(), int(4)))
            .val_to_state(|_| ())
            .cancellation(token)
            .build()
            .unwrap();

        let result = checker.check(&()).unwrap();
        assert_eq!(result.unknown_reason(), Some(UnknownReason::Cancelled));
        assert_eq!(result.stats.solver_checks, 0);
        drop(checker);
        assert_eq!(solver.depth(), 0);
    }
}
