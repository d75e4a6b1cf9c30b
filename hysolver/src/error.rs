use hyformal::{dtype::DataType, error::FormalError, variable::Symbol};
use strum::EnumIs;
use thiserror::Error;

use crate::solver::{ItpMarker, SolverStatus};

#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum SolverError {
    /// Only Boolean formulas can be asserted.
    #[error("Assertion `{expr}` has sort {found}, expected a Boolean formula.")]
    NonBooleanAssertion { expr: String, found: DataType },

    /// Assertions are over current-state symbols and versioned constants only.
    #[error("Assertion `{0}` contains a primed reference; unfold it before asserting.")]
    PrimedAssertion(String),

    /// More scopes were popped than pushed.
    #[error("Cannot pop {requested} scope(s): only {available} are open.")]
    PopUnderflow { requested: usize, available: usize },

    /// The marker was not created by this solver.
    #[error("Marker {0} was not created by this solver.")]
    UnknownMarker(ItpMarker),

    /// The pattern was built from markers of another solver.
    #[error("Pattern ({0}, {1}) was not created by this solver.")]
    UnknownPattern(ItpMarker, ItpMarker),

    /// An assertion belongs to a marker the requested pattern does not mention.
    #[error("Marker {0} has assertions but is not part of the requested pattern.")]
    MarkerOutsidePattern(ItpMarker),

    /// Interpolants only exist right after an unsatisfiable check of the unchanged scope.
    #[error("No interpolant available: the last check returned {0:?} or the scope changed since.")]
    InterpolantUnavailable(Option<SolverStatus>),

    /// Models only exist right after a satisfiable check of the unchanged scope.
    #[error("No model available: the last check returned {0:?} or the scope changed since.")]
    NoModel(Option<SolverStatus>),

    /// The finite-domain back-end cannot enumerate an infinite domain.
    #[error("Symbol `{0}` ranges over an unbounded domain; only Bool and bounded integers are supported.")]
    UnboundedDomain(Symbol),

    /// A search or projection budget ran out.
    #[error("Resource budget exhausted: {0}.")]
    ResourceExhausted(String),

    #[error(transparent)]
    Formal(#[from] FormalError),
}

pub type SolverResult<T> = Result<T, SolverError>;
