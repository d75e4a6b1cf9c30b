use hyformal::error::FormalError;
use hysolver::error::SolverError;
use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, EnumIs, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Formal(#[from] FormalError),

    /// Folding a constant against an indexing above its own version.
    #[error("Cannot fold `{constant}` at index {base}: it would need a negative number of primes.")]
    NegativePrime { constant: String, base: u32 },

    /// Pointwise difference of two indexings going below zero.
    #[error("Index of `{var}` would become negative ({lhs} - {rhs}).")]
    NegativeIndex { var: String, lhs: u32, rhs: u32 },

    #[error("The upper bound must be at least 1; leave it unset for unbounded checking.")]
    ZeroBound,

    #[error("Missing checker input: {0}.")]
    MissingInput(&'static str),

    #[error("Failed to parse configuration '{file}': {source}")]
    ConfigParse {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
