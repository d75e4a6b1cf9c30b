//! Moving formulas between the symbolic and the unrolled vocabulary.
//!
//! - [`unfold`] replaces each variable, under `p` primes, by its version
//!   `indexing[x] + p`.
//! - [`foldin`] is the inverse: a constant `x@i` becomes `x` under `i - indexing[x]` primes.
//! - [`extract_valuation`] reads the state at one indexing out of a solver model.
use hyformal::{
    expr::Expr,
    model::Valuation,
    variable::Symbol,
    walker,
};

use crate::{
    error::{AnalysisError, AnalysisResult},
    indexing::VarIndexing,
};

/// Replace every (possibly primed) variable of `expr` by its versioned constant.
/// Constants already present are left untouched.
pub fn unfold(expr: &Expr, indexing: &VarIndexing) -> Expr {
    unfold_primed(expr, indexing, 0)
}

fn unfold_primed(expr: &Expr, indexing: &VarIndexing, primes: u32) -> Expr {
    match expr {
        Expr::Var(v) => v.at(indexing.get(v) + primes).to_expr(),
        Expr::Prime(inner) => unfold_primed(inner, indexing, primes + 1),
        Expr::Const(_) => expr.clone(),
        _ => expr.map_children(|child| unfold_primed(child, indexing, primes)),
    }
}

/// Replace every constant `x@i` of `expr` by `x` under `i - indexing[x]` primes.
pub fn foldin(expr: &Expr, indexing: &VarIndexing) -> AnalysisResult<Expr> {
    walker::try_rewrite(expr, &mut |node| match node {
        Expr::Const(c) => {
            let base = indexing.get(&c.var);
            let primes = c.index.checked_sub(base).ok_or_else(|| AnalysisError::NegativePrime {
                constant: c.to_string(),
                base,
            })?;
            Ok((0..primes).fold(c.var.to_expr(), |e, _| Expr::Prime(Box::new(e))))
        }
        other => Ok(other),
    })
}

/// State at `indexing` described by `model`: each variable whose version at `indexing`
/// occurs in the model is mapped to that value.
pub fn extract_valuation(model: &Valuation, indexing: &VarIndexing) -> Valuation {
    model
        .iter()
        .filter_map(|(symbol, value)| match symbol {
            Symbol::Const(c) if c.index == indexing.get(&c.var) => {
                Some((Symbol::Var(c.var.clone()), *value))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::prelude::*;

    #[test]
    fn unfold_shifts_primed_variables() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let y = VarDecl::new("y", DataType::bounded(0, 9));
        let idx = VarIndexing::all(1).inc(&x);

        let e = and([eq(x.primed(), x.to_expr() + y.to_expr()), eq(y.at(0).to_expr(), int(0))]);
        let expected = and([
            eq(x.at(3).to_expr(), x.at(2).to_expr() + y.at(1).to_expr()),
            eq(y.at(0).to_expr(), int(0)),
        ]);
        assert_eq!(unfold(&e, &idx), expected);
    }

    #[test]
    fn foldin_inverts_unfold() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let idx = VarIndexing::all(4);
        let e = lt(prime(prime(x.to_expr())), x.primed());
        let unrolled = unfold(&e, &idx);
        assert_eq!(unrolled, lt(x.at(6).to_expr(), x.at(5).to_expr()));
        assert_eq!(foldin(&unrolled, &idx).unwrap(), e);

        // Re-expressing a step-one formula over the base indexing.
        let step = eq(x.at(5).to_expr(), int(3));
        let base = unfold(&foldin(&step, &idx.inc(&x)).unwrap(), &VarIndexing::all(0));
        assert_eq!(base, eq(x.at(0).to_expr(), int(3)));
    }

    #[test]
    fn foldin_rejects_constants_below_the_indexing() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let err = foldin(&eq(x.at(1).to_expr(), int(0)), &VarIndexing::all(2)).unwrap_err();
        assert!(err.is_negative_prime());
    }

    #[test]
    fn extracts_the_state_of_one_step() {
        let x = VarDecl::new("x", DataType::bounded(0, 9));
        let b = VarDecl::new("b", DataType::Bool);
        let mut model = Valuation::new();
        model.insert(x.at(0), 1i64);
        model.insert(x.at(1), 2i64);
        model.insert(b.at(1), true);

        let state = extract_valuation(&model, &VarIndexing::all(1));
        assert_eq!(state.get_var(&x), Some(Value::Int(2)));
        assert_eq!(state.get_var(&b), Some(Value::Bool(true)));
        assert_eq!(state.len(), 2);
        assert_eq!(extract_valuation(&model, &VarIndexing::all(0)).len(), 1);
    }
}
