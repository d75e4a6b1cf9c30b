//! Free-function builders.
//!
//! Boolean builders are "smart": they fold `true`/`false`, drop neutral elements and flatten
//! nested conjunctions and disjunctions. Arithmetic and comparison builders only fold when
//! every operand is a literal.
use crate::expr::Expr;

#[inline]
pub fn tt() -> Expr {
    Expr::True
}

#[inline]
pub fn ff() -> Expr {
    Expr::False
}

#[inline]
pub fn boolean(b: bool) -> Expr {
    b.into()
}

#[inline]
pub fn int(v: i64) -> Expr {
    Expr::Int(v)
}

/// `e'`.
#[inline]
pub fn prime(e: impl Into<Expr>) -> Expr {
    Expr::Prime(Box::new(e.into()))
}

/// Negation. Double negations and constants are folded.
pub fn not(e: impl Into<Expr>) -> Expr {
    match e.into() {
        Expr::True => Expr::False,
        Expr::False => Expr::True,
        Expr::Not(inner) => *inner,
        other => Expr::Not(Box::new(other)),
    }
}

/// Conjunction of any number of operands.
///
/// - `false` absorbs everything, `true` operands are dropped.
/// - Nested conjunctions are flattened.
/// - No operand yields `true`, a single operand is returned as-is.
pub fn and(operands: impl IntoIterator<Item = Expr>) -> Expr {
    let mut out = Vec::new();
    for e in operands {
        match e {
            Expr::True => {}
            Expr::False => return Expr::False,
            Expr::And(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    match out.len() {
        0 => Expr::True,
        1 => out.pop().unwrap_or(Expr::True),
        _ => Expr::And(out),
    }
}

/// Disjunction of any number of operands (dual of [`and`]).
pub fn or(operands: impl IntoIterator<Item = Expr>) -> Expr {
    let mut out = Vec::new();
    for e in operands {
        match e {
            Expr::False => {}
            Expr::True => return Expr::True,
            Expr::Or(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    match out.len() {
        0 => Expr::False,
        1 => out.pop().unwrap_or(Expr::False),
        _ => Expr::Or(out),
    }
}

pub fn implies(antecedent: impl Into<Expr>, consequent: impl Into<Expr>) -> Expr {
    match (antecedent.into(), consequent.into()) {
        (Expr::False, _) | (_, Expr::True) => Expr::True,
        (Expr::True, c) => c,
        (a, Expr::False) => not(a),
        (a, c) => Expr::Implies(Box::new(a), Box::new(c)),
    }
}

pub fn iff(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    match (lhs.into(), rhs.into()) {
        (Expr::True, e) | (e, Expr::True) => e,
        (Expr::False, e) | (e, Expr::False) => not(e),
        (l, r) => Expr::Iff(Box::new(l), Box::new(r)),
    }
}

macro_rules! define_comparison {
    ($( $(#[$meta:meta])* $name:ident => $variant:ident, $op:tt; )*) => {
        $(
            $(#[$meta])*
            pub fn $name(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
                match (lhs.into(), rhs.into()) {
                    (Expr::Int(a), Expr::Int(b)) => (a $op b).into(),
                    (l, r) => Expr::$variant(Box::new(l), Box::new(r)),
                }
            }
        )*
    };
}

define_comparison! {
    /// `lhs = rhs`. Works on both sorts; only integer literals are folded.
    eq => Eq, ==;
    neq => Neq, !=;
    lt => Lt, <;
    leq => Leq, <=;
    gt => Gt, >;
    geq => Geq, >=;
}

/// Sum of any number of operands. Nested sums are flattened and literals accumulated.
pub fn add(operands: impl IntoIterator<Item = Expr>) -> Expr {
    let mut out = Vec::new();
    let mut constant: i64 = 0;
    for e in operands {
        match e {
            Expr::Int(v) => match constant.checked_add(v) {
                Some(c) => constant = c,
                None => out.push(Expr::Int(v)),
            },
            Expr::Add(inner) => out.extend(inner),
            other => out.push(other),
        }
    }
    if constant != 0 || out.is_empty() {
        out.push(Expr::Int(constant));
    }
    if out.len() == 1 {
        out.pop().unwrap_or(Expr::Int(0))
    } else {
        Expr::Add(out)
    }
}

/// Product of any number of operands.
pub fn mul(operands: impl IntoIterator<Item = Expr>) -> Expr {
    let mut out: Vec<Expr> = operands.into_iter().collect();
    if out.iter().all(|e| matches!(e, Expr::Int(_))) {
        let product = out.iter().try_fold(1i64, |acc, e| match e {
            Expr::Int(v) => acc.checked_mul(*v),
            _ => None,
        });
        if let Some(p) = product {
            return Expr::Int(p);
        }
    }
    match out.len() {
        0 => Expr::Int(1),
        1 => out.pop().unwrap_or(Expr::Int(1)),
        _ => Expr::Mul(out),
    }
}

pub fn sub(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    match (lhs.into(), rhs.into()) {
        (Expr::Int(a), Expr::Int(b)) if a.checked_sub(b).is_some() => Expr::Int(a - b),
        (l, Expr::Int(0)) => l,
        (l, r) => Expr::Sub(Box::new(l), Box::new(r)),
    }
}

pub fn neg(e: impl Into<Expr>) -> Expr {
    match e.into() {
        Expr::Int(v) if v != i64::MIN => Expr::Int(-v),
        Expr::Neg(inner) => *inner,
        other => Expr::Neg(Box::new(other)),
    }
}

/// Euclidean division.
pub fn div(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::Div(Box::new(lhs.into()), Box::new(rhs.into()))
}

/// Euclidean remainder (always non-negative for a non-zero divisor).
pub fn rem(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Expr {
    Expr::Mod(Box::new(lhs.into()), Box::new(rhs.into()))
}

/// `if condition then then_branch else else_branch`. Constant conditions are folded.
pub fn ite(
    condition: impl Into<Expr>,
    then_branch: impl Into<Expr>,
    else_branch: impl Into<Expr>,
) -> Expr {
    match condition.into() {
        Expr::True => then_branch.into(),
        Expr::False => else_branch.into(),
        c => Expr::Ite {
            condition: Box::new(c),
            then_branch: Box::new(then_branch.into()),
            else_branch: Box::new(else_branch.into()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dtype::DataType, variable::VarDecl};

    #[test]
    fn conjunctions_flatten_and_fold() {
        let a = VarDecl::new("a", DataType::Bool).to_expr();
        let b = VarDecl::new("b", DataType::Bool).to_expr();
        let c = VarDecl::new("c", DataType::Bool).to_expr();

        let e = and([a.clone(), tt(), and([b.clone(), c.clone()])]);
        assert_eq!(e, Expr::And(vec![a.clone(), b.clone(), c.clone()]));
        assert_eq!(and([a.clone(), ff(), b.clone()]), Expr::False);
        assert_eq!(and([]), Expr::True);
        assert_eq!(and([a.clone()]), a);
        assert_eq!(or([ff(), ff()]), Expr::False);
        assert_eq!(or([a.clone(), tt()]), Expr::True);
    }

    #[test]
    fn negation_folds() {
        let a = VarDecl::new("a", DataType::Bool).to_expr();
        assert_eq!(not(not(a.clone())), a);
        assert_eq!(not(tt()), ff());
        assert_eq!(implies(ff(), a.clone()), tt());
        assert_eq!(implies(a.clone(), ff()), not(a.clone()));
        assert_eq!(iff(tt(), a.clone()), a);
    }

    #[test]
    fn arithmetic_folds_literals_only() {
        let x = VarDecl::new("x", DataType::Int).to_expr();
        assert_eq!(add([int(1), int(2)]), int(3));
        assert_eq!(
            add([x.clone(), int(1), int(2)]),
            Expr::Add(vec![x.clone(), int(3)])
        );
        assert_eq!(add([x.clone(), int(0)]), x);
        assert_eq!(mul([int(3), int(4)]), int(12));
        assert_eq!(sub(int(3), int(4)), int(-1));
        assert_eq!(neg(int(4)), int(-4));
        assert_eq!(lt(int(1), int(2)), tt());
        assert_eq!(eq(int(1), int(2)), ff());
    }
}
