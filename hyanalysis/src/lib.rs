//! Hyanalysis: safety checking of symbolic transition systems.
//!
//! A system is given by an initial condition, a [`action::TransitionAction`] relating
//! current and next states (primed variables), and a property every reachable state should
//! satisfy. Formulas are unrolled along a trace by versioning variables
//! ([`indexing::VarIndexing`], [`path::unfold`]) and handed to an interpolating solver from
//! `hysolver`.
//!
//! The procedure implemented is interpolation-based model checking
//! ([`algorithm::imc::ImcChecker`]), forward or backward.

/// Safety checkers and their results.
pub mod algorithm;
/// Transition relations.
pub mod action;
/// Checker configuration.
pub mod config;
pub mod error;
/// Variable versions along a trace.
pub mod indexing;
/// Unrolling and folding of formulas.
pub mod path;
/// Statements lowered to transition formulas.
pub mod stmt;

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::action::{ExprAction, StmtAction, TransitionAction};
    pub use crate::algorithm::imc::{CancellationToken, Direction, ImcChecker, ImcCheckerBuilder};
    pub use crate::algorithm::{
        Counterexample, SafetyChecker, SafetyProof, SafetyResult, Statistics, UnknownReason,
        Verdict,
    };
    pub use crate::config::ImcConfig;
    pub use crate::error::{AnalysisError, AnalysisResult};
    pub use crate::indexing::VarIndexing;
    pub use crate::path::{extract_valuation, foldin, unfold};
    pub use crate::stmt::{Stmt, StmtUnfoldResult};
}
