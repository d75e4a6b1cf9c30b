use hyformal::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_term(budget: usize, rng: &mut impl Rng, vars: &[VarDecl]) -> Expr {
    if budget == 0 || rng.random_bool(0.3) {
        let v = &vars[rng.random_range(0..vars.len())];
        return match rng.random_range(0..=3) {
            0 => int(rng.random_range(-5..=5)),
            1 => v.to_expr(),
            2 => v.primed(),
            _ => v.at(rng.random_range(0..4)).to_expr(),
        };
    }
    let l = random_term(budget - 1, rng, vars);
    let r = random_term(budget - 1, rng, vars);
    match rng.random_range(0..=6) {
        0 => Expr::Add(vec![l, r]),
        1 => Expr::Sub(Box::new(l), Box::new(r)),
        2 => Expr::Mul(vec![l, r]),
        3 => Expr::Div(Box::new(l), Box::new(r)),
        4 => Expr::Mod(Box::new(l), Box::new(r)),
        5 => Expr::Neg(Box::new(l)),
        _ => ite(lt(l.clone(), r.clone()), l, r),
    }
}

fn random_formula(budget: usize, rng: &mut impl Rng, vars: &[VarDecl]) -> Expr {
    if budget == 0 || rng.random_bool(0.25) {
        let l = random_term(2, rng, vars);
        let r = random_term(2, rng, vars);
        return match rng.random_range(0..=6) {
            0 => Expr::Eq(Box::new(l), Box::new(r)),
            1 => Expr::Neq(Box::new(l), Box::new(r)),
            2 => Expr::Lt(Box::new(l), Box::new(r)),
            3 => Expr::Leq(Box::new(l), Box::new(r)),
            4 => Expr::Gt(Box::new(l), Box::new(r)),
            5 => Expr::Geq(Box::new(l), Box::new(r)),
            _ => Expr::True,
        };
    }
    let mut sub = || random_formula(budget - 1, rng, vars);
    let (a, b) = (sub(), sub());
    match rng.random_range(0..=5) {
        0 => Expr::And(vec![a, b]),
        1 => Expr::Or(vec![a, b]),
        2 => Expr::Implies(Box::new(a), Box::new(b)),
        3 => Expr::Iff(Box::new(a), Box::new(b)),
        4 => Expr::Not(Box::new(a)),
        _ => Expr::Ite {
            condition: Box::new(a),
            then_branch: Box::new(b),
            else_branch: Box::new(Expr::False),
        },
    }
}

#[test]
fn printed_formulas_parse_back_to_the_same_tree() {
    let mut scope = Scope::new();
    let vars: Vec<_> = ["x", "y", "flag_count"]
        .into_iter()
        .map(|n| scope.declare(n, DataType::Int))
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..300 {
        let e = random_formula(4, &mut rng, &vars);
        let text = e.to_string();
        let parsed = parse(&text, &scope).unwrap_or_else(|err| panic!("{text}: {err}"));
        assert_eq!(parsed, e, "round trip failed for {text}");
    }
}

#[test]
fn nested_binary_operators_keep_their_grouping() {
    let mut scope = Scope::new();
    let p = scope.declare("p", DataType::Bool);
    let q = scope.declare("q", DataType::Bool);
    let r = scope.declare("r", DataType::Bool);

    let right = implies(p.to_expr(), implies(q.to_expr(), r.to_expr()));
    assert_eq!(right.to_string(), "p => (q => r)");
    assert_eq!(parse("p => q => r", &scope).unwrap(), right);

    let left = implies(implies(p.to_expr(), q.to_expr()), r.to_expr());
    assert_eq!(left.to_string(), "(p => q) => r");
    assert_eq!(parse(&left.to_string(), &scope).unwrap(), left);

    let nested = Expr::And(vec![Expr::And(vec![p.to_expr(), q.to_expr()]), r.to_expr()]);
    assert_eq!(nested.to_string(), "(p /\\ q) /\\ r");
    assert_eq!(parse(&nested.to_string(), &scope).unwrap(), nested);
}

#[test]
fn whitespace_and_line_breaks_are_insignificant() {
    let mut scope = Scope::new();
    let x = scope.declare("x", DataType::bounded(0, 3));
    let a = parse("x'=x+1/\\x<3", &scope).unwrap();
    let b = parse("  x' =\n  x + 1\n  /\\ x < 3 ", &scope).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.conjuncts().len(), 2);
    assert_eq!(a.conjuncts()[1], lt(x.to_expr(), int(3)));
}
