//! Hyformal: quantifier-free formulas over Booleans and integers for symbolic model checking.
//!
//! The crate provides the vocabulary shared by the solver and analysis crates:
//!  - typed state variables ([`variable::VarDecl`]) and their versioned constants
//!    ([`variable::IndexedConst`]) as produced when a transition relation is unrolled,
//!  - an owned expression tree ([`expr::Expr`]) with simplifying builders, a pretty-printer
//!    and a parser that round-trip,
//!  - concrete evaluation under a [`model::Valuation`].
//!
//! Example
//! ```
//! use hyformal::prelude::*;
//!
//! let mut scope = Scope::new();
//! let x = scope.declare("x", DataType::bounded(0, 15));
//!
//! let init = eq(x.to_expr(), int(0));
//! let trans = parse("x' = x + 1", &scope).unwrap();
//! assert_eq!(trans.to_string(), "x' = x + 1");
//!
//! let mut state = Valuation::new();
//! state.insert(x.clone(), 0i64);
//! assert_eq!(init.eval(&state), Ok(Value::Bool(true)));
//! ```

/// Data types and literal values.
pub mod dtype;
/// Errors shared by every operation of the crate.
pub mod error;
/// Concrete evaluation.
pub mod eval;
/// Expressions API: tree, builders and pretty-printing.
pub mod expr;
/// Valuations mapping symbols to values.
pub mod model;
/// Parser for the pretty-printed language.
pub mod parser;
/// State variables, versioned constants and symbols.
pub mod variable;
/// Tree walker and symbol collection.
pub mod walker;

pub mod prelude {
    //! Convenient re-exports for end users.
    //!
    //! - `Expr` and its variant kinds
    //! - Free-function builders from `func::*`
    //! - Pretty-printing via `PrettyExpr`
    //! - Variables, values and valuations
    pub use crate::dtype::{DataType, Value};
    pub use crate::error::{FormalError, FormalResult};
    pub use crate::expr::{Expr, ExprType, func::*, pretty::PrettyExpr};
    pub use crate::model::Valuation;
    pub use crate::variable::{IndexedConst, Symbol, VarDecl};

    // Parser entrypoint
    pub use crate::parser::{Scope, parse};
}
