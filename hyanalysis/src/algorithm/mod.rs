//! Safety checking procedures and the results they share.
//!
//! Every procedure answers the same question: can a state violating the property be reached
//! from an initial state? The answer is a [`SafetyResult`] carrying a three-way [`Verdict`]
//! and the [`Statistics`] of the run, so callers can stay agnostic of the procedure behind a
//! [`SafetyChecker`].
use std::{fmt, time::Duration};

use hyformal::expr::Expr;
use strum::EnumIs;

use crate::error::AnalysisResult;

pub mod imc;

pub trait SafetyChecker {
    /// Reconstructed program state stored in counterexamples.
    type State;
    /// Abstraction precision. Procedures working on the concrete system use `()`.
    type Precision;

    fn check(&mut self, precision: &Self::Precision) -> AnalysisResult<SafetyResult<Self::State>>;
}

/// Why a run ended without a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIs)]
pub enum UnknownReason {
    /// Every depth up to the bound was explored without reaching a fixpoint.
    BoundReached(usize),
    /// The solver answered unknown or ran out of budget.
    SolverInconclusive,
    Timeout,
    Cancelled,
}

impl fmt::Display for UnknownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownReason::BoundReached(k) => write!(f, "bound {k} reached"),
            UnknownReason::SolverInconclusive => write!(f, "solver inconclusive"),
            UnknownReason::Timeout => write!(f, "timeout"),
            UnknownReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Path to a violating state: `states[0]` is initial, `states[depth]` violates the property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counterexample<S> {
    pub depth: usize,
    pub states: Vec<S>,
}

/// Evidence of safety.
///
/// `image` is an inductive over-approximation of the reachable states that excludes every
/// bad state, expressed over the base indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyProof {
    pub depth: usize,
    pub image_disjuncts: usize,
    pub image: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Verdict<S> {
    Safe(SafetyProof),
    Unsafe(Counterexample<S>),
    Unknown(UnknownReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    /// Outer iterations, i.e. the deepest unrolling explored.
    pub iterations: usize,
    pub solver_checks: usize,
    /// Images grown by an interpolant.
    pub refinements: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyResult<S> {
    pub verdict: Verdict<S>,
    pub stats: Statistics,
}

impl<S> SafetyResult<S> {
    pub fn new(verdict: Verdict<S>, stats: Statistics) -> Self {
        Self { verdict, stats }
    }

    #[inline]
    pub fn is_safe(&self) -> bool {
        self.verdict.is_safe()
    }

    #[inline]
    pub fn is_unsafe(&self) -> bool {
        self.verdict.is_unsafe()
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.verdict.is_unknown()
    }

    pub fn proof(&self) -> Option<&SafetyProof> {
        match &self.verdict {
            Verdict::Safe(proof) => Some(proof),
            _ => None,
        }
    }

    pub fn counterexample(&self) -> Option<&Counterexample<S>> {
        match &self.verdict {
            Verdict::Unsafe(cex) => Some(cex),
            _ => None,
        }
    }

    pub fn unknown_reason(&self) -> Option<UnknownReason> {
        match &self.verdict {
            Verdict::Unknown(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl<S> fmt::Display for Verdict<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Safe(proof) => write!(
                f,
                "safe (depth {}, {} image disjuncts)",
                proof.depth, proof.image_disjuncts
            ),
            Verdict::Unsafe(cex) => write!(f, "unsafe (depth {})", cex.depth),
            Verdict::Unknown(reason) => write!(f, "unknown ({reason})"),
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} iterations, {} solver checks, {} refinements in {:.3?}",
            self.iterations, self.solver_checks, self.refinements, self.elapsed
        )
    }
}

impl<S> fmt::Display for SafetyResult<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.verdict, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::expr::func::tt;

    #[test]
    fn verdicts_print_their_summary() {
        let stats = Statistics {
            iterations: 3,
            solver_checks: 7,
            refinements: 2,
            elapsed: Duration::from_millis(5),
        };
        let safe: SafetyResult<()> = SafetyResult::new(
            Verdict::Safe(SafetyProof {
                depth: 3,
                image_disjuncts: 2,
                image: tt(),
            }),
            stats,
        );
        assert!(safe.is_safe());
        assert_eq!(safe.proof().map(|p| p.depth), Some(3));
        assert_eq!(
            safe.to_string(),
            "safe (depth 3, 2 image disjuncts) [3 iterations, 7 solver checks, 2 refinements in 5.000ms]"
        );

        let unknown: SafetyResult<()> =
            SafetyResult::new(Verdict::Unknown(UnknownReason::BoundReached(4)), stats);
        assert_eq!(unknown.unknown_reason(), Some(UnknownReason::BoundReached(4)));
        assert_eq!(unknown.verdict.to_string(), "unknown (bound 4 reached)");
        assert!(unknown.counterexample().is_none());
    }
}
