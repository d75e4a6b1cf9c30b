//! Hysolver: incremental, interpolating satisfiability checking for hyformal formulas.
//!
//! - [`solver::Solver`] and [`solver::ItpSolver`] are the back-end agnostic interfaces used
//!   by the analysis crate: a scope stack of assertions, satisfiability checks, models and
//!   Craig interpolants between two marked groups of assertions.
//! - [`utils::WithPushPop`] keeps push/pop balanced across early returns.
//! - [`finite::FiniteItpSolver`] is a self-contained back-end for Booleans and bounded
//!   integers.

/// Errors of every solver operation.
pub mod error;
/// Finite-domain interpolating back-end.
pub mod finite;
/// Solver traits, markers, patterns and interpolants.
pub mod solver;
/// Scope guard.
pub mod utils;

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::error::{SolverError, SolverResult};
    pub use crate::finite::{FiniteItpSolver, FiniteSolverConfig, FiniteSolverStats};
    pub use crate::solver::{
        Interpolant, ItpMarker, ItpPattern, ItpSolver, Solver, SolverStatus,
    };
    pub use crate::utils::WithPushPop;
}
