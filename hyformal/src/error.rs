use strum::EnumIs;
use thiserror::Error;

use crate::{dtype::DataType, variable::Symbol};

/// Errors raised while building, typing, evaluating or parsing formulas.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum FormalError {
    /// A symbol has no value in the valuation used for evaluation.
    #[error("Symbol `{0}` has no value in the current valuation.")]
    UnboundSymbol(Symbol),

    /// An operand does not have the sort required by its operator.
    #[error("Type mismatch in `{expr}`: expected {expected}, found {found}.")]
    TypeMismatch {
        expected: DataType,
        found: DataType,
        expr: String,
    },

    /// A primed reference reached an operation that only accepts state formulas.
    #[error("Unexpected primed reference `{0}`; only state formulas are accepted here.")]
    UnexpectedPrime(String),

    /// Integer arithmetic left the 64-bit range.
    #[error("Integer overflow while evaluating `{0}`.")]
    Overflow(String),

    /// An identifier in a parsed formula does not name any declared variable.
    #[error("Unknown identifier `{0}`.")]
    UnknownIdentifier(String),

    /// The text could not be parsed; one human readable diagnostic per entry.
    #[error("Failed to parse formula: {}", .0.join("; "))]
    Parse(Vec<String>),
}

pub type FormalResult<T> = Result<T, FormalError>;
