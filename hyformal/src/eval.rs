//! Concrete evaluation of expressions under a valuation.
//!
//! Semantics
//! - Integer arithmetic is checked; leaving the `i64` range is an [`FormalError::Overflow`].
//! - Division and remainder are Euclidean. Division by zero yields `0` and the remainder by
//!   zero yields the dividend, so evaluation is total on well-typed formulas.
//! - `and`, `or`, `=>` and `if` short-circuit: an unbound symbol in a branch that is not
//!   needed does not raise [`FormalError::UnboundSymbol`].
//! - Primed references cannot be evaluated and raise [`FormalError::UnexpectedPrime`].
use crate::{
    dtype::Value,
    error::{FormalError, FormalResult},
    expr::Expr,
    model::Valuation,
    variable::Symbol,
};

/// Euclidean division with the total convention `a / 0 = 0`.
pub fn euclid_div(a: i64, b: i64) -> Option<i64> {
    if b == 0 { Some(0) } else { a.checked_div_euclid(b) }
}

/// Euclidean remainder with the total convention `a mod 0 = a`.
pub fn euclid_rem(a: i64, b: i64) -> Option<i64> {
    if b == 0 { Some(a) } else { a.checked_rem_euclid(b) }
}

/// Evaluate `e` under `valuation`.
pub fn eval(e: &Expr, valuation: &Valuation) -> FormalResult<Value> {
    Ok(match e {
        Expr::True => Value::Bool(true),
        Expr::False => Value::Bool(false),
        Expr::Int(v) => Value::Int(*v),
        Expr::Var(v) => lookup(Symbol::Var(v.clone()), valuation)?,
        Expr::Const(c) => lookup(Symbol::Const(c.clone()), valuation)?,
        Expr::Prime(_) => return Err(FormalError::UnexpectedPrime(e.to_string())),

        Expr::Not(inner) => Value::Bool(!eval_bool(inner, valuation)?),
        Expr::And(es) => {
            for sub in es {
                if !eval_bool(sub, valuation)? {
                    return Ok(Value::Bool(false));
                }
            }
            Value::Bool(true)
        }
        Expr::Or(es) => {
            for sub in es {
                if eval_bool(sub, valuation)? {
                    return Ok(Value::Bool(true));
                }
            }
            Value::Bool(false)
        }
        Expr::Implies(l, r) => {
            Value::Bool(!eval_bool(l, valuation)? || eval_bool(r, valuation)?)
        }
        Expr::Iff(l, r) => Value::Bool(eval_bool(l, valuation)? == eval_bool(r, valuation)?),

        Expr::Eq(l, r) => Value::Bool(eval(l, valuation)? == eval(r, valuation)?),
        Expr::Neq(l, r) => Value::Bool(eval(l, valuation)? != eval(r, valuation)?),
        Expr::Lt(l, r) => Value::Bool(eval_int(l, valuation)? < eval_int(r, valuation)?),
        Expr::Leq(l, r) => Value::Bool(eval_int(l, valuation)? <= eval_int(r, valuation)?),
        Expr::Gt(l, r) => Value::Bool(eval_int(l, valuation)? > eval_int(r, valuation)?),
        Expr::Geq(l, r) => Value::Bool(eval_int(l, valuation)? >= eval_int(r, valuation)?),

        Expr::Add(es) => {
            let mut acc: i64 = 0;
            for sub in es {
                acc = acc
                    .checked_add(eval_int(sub, valuation)?)
                    .ok_or_else(|| FormalError::Overflow(e.to_string()))?;
            }
            Value::Int(acc)
        }
        Expr::Mul(es) => {
            let mut acc: i64 = 1;
            for sub in es {
                acc = acc
                    .checked_mul(eval_int(sub, valuation)?)
                    .ok_or_else(|| FormalError::Overflow(e.to_string()))?;
            }
            Value::Int(acc)
        }
        Expr::Sub(l, r) => {
            let (a, b) = (eval_int(l, valuation)?, eval_int(r, valuation)?);
            Value::Int(a.checked_sub(b).ok_or_else(|| FormalError::Overflow(e.to_string()))?)
        }
        Expr::Neg(inner) => Value::Int(
            eval_int(inner, valuation)?
                .checked_neg()
                .ok_or_else(|| FormalError::Overflow(e.to_string()))?,
        ),
        Expr::Div(l, r) => {
            let (a, b) = (eval_int(l, valuation)?, eval_int(r, valuation)?);
            Value::Int(euclid_div(a, b).ok_or_else(|| FormalError::Overflow(e.to_string()))?)
        }
        Expr::Mod(l, r) => {
            let (a, b) = (eval_int(l, valuation)?, eval_int(r, valuation)?);
            Value::Int(euclid_rem(a, b).ok_or_else(|| FormalError::Overflow(e.to_string()))?)
        }

        Expr::Ite {
            condition,
            then_branch,
            else_branch,
        } => {
            if eval_bool(condition, valuation)? {
                eval(then_branch, valuation)?
            } else {
                eval(else_branch, valuation)?
            }
        }
    })
}

/// Evaluate a formula expected to be Boolean.
pub fn eval_bool(e: &Expr, valuation: &Valuation) -> FormalResult<bool> {
    match eval(e, valuation)? {
        Value::Bool(b) => Ok(b),
        Value::Int(_) => Err(FormalError::TypeMismatch {
            expected: crate::dtype::DataType::Bool,
            found: crate::dtype::DataType::Int,
            expr: e.to_string(),
        }),
    }
}

/// Evaluate a term expected to be an integer.
pub fn eval_int(e: &Expr, valuation: &Valuation) -> FormalResult<i64> {
    match eval(e, valuation)? {
        Value::Int(v) => Ok(v),
        Value::Bool(_) => Err(FormalError::TypeMismatch {
            expected: crate::dtype::DataType::Int,
            found: crate::dtype::DataType::Bool,
            expr: e.to_string(),
        }),
    }
}

fn lookup(symbol: Symbol, valuation: &Valuation) -> FormalResult<Value> {
    valuation
        .get(&symbol)
        .ok_or(FormalError::UnboundSymbol(symbol))
}

impl Expr {
    /// Shorthand for [`eval`].
    #[inline]
    pub fn eval(&self, valuation: &Valuation) -> FormalResult<Value> {
        eval(self, valuation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dtype::DataType, expr::func::*, variable::VarDecl};

    #[test]
    fn euclidean_arithmetic() {
        let v = Valuation::new();
        assert_eq!(eval(&div(int(-7), int(2)), &v), Ok(Value::Int(-4)));
        assert_eq!(eval(&rem(int(-7), int(2)), &v), Ok(Value::Int(1)));
        assert_eq!(eval(&div(int(7), int(0)), &v), Ok(Value::Int(0)));
        assert_eq!(eval(&rem(int(7), int(0)), &v), Ok(Value::Int(7)));
    }

    #[test]
    fn short_circuit_skips_unbound() {
        let x = VarDecl::new("x", DataType::Int);
        let v = Valuation::new();
        let e = Expr::And(vec![Expr::False, lt(x.to_expr(), int(3))]);
        assert_eq!(eval(&e, &v), Ok(Value::Bool(false)));

        let e = Expr::Or(vec![lt(x.to_expr(), int(3)), Expr::True]);
        assert!(matches!(eval(&e, &v), Err(FormalError::UnboundSymbol(_))));
    }

    #[test]
    fn constants_and_primes() {
        let x = VarDecl::new("x", DataType::Int);
        let mut v = Valuation::new();
        v.insert(x.at(1), 5i64);
        assert_eq!(eval(&add([x.at(1).to_expr(), int(1)]), &v), Ok(Value::Int(6)));
        assert!(matches!(
            eval(&x.primed(), &v),
            Err(FormalError::UnexpectedPrime(_))
        ));
    }

    #[test]
    fn overflow_is_reported() {
        let v = Valuation::new();
        let e = Expr::Add(vec![int(i64::MAX), int(1)]);
        assert!(matches!(eval(&e, &v), Err(FormalError::Overflow(_))));
    }
}
