use criterion::{Criterion, black_box, criterion_group, criterion_main};

use hyformal::{prelude::*, walker::walk};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

fn build_random_formula(vars: &[VarDecl]) -> Expr {
    // Use randomness seeded for determinism.
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);

    fn term(budget: usize, rng: &mut impl Rng, vars: &[VarDecl]) -> Expr {
        if budget == 0 || rng.random_bool(0.3) {
            return match rng.random_range(0..=1) {
                0 => int(rng.random_range(-8..=8)),
                _ => vars[rng.random_range(0..vars.len())].to_expr(),
            };
        }
        let l = term(budget - 1, rng, vars);
        let r = term(budget - 1, rng, vars);
        match rng.random_range(0..=3) {
            0 => add([l, r]),
            1 => sub(l, r),
            2 => mul([l, r]),
            _ => ite(lt(l.clone(), r.clone()), l, r),
        }
    }

    fn formula(budget: usize, rng: &mut impl Rng, vars: &[VarDecl]) -> Expr {
        if budget == 0 || rng.random_bool(0.2) {
            let l = term(3, rng, vars);
            let r = term(3, rng, vars);
            return match rng.random_range(0..=2) {
                0 => eq(l, r),
                1 => lt(l, r),
                _ => geq(l, r),
            };
        }
        match rng.random_range(0..=3) {
            0 => and([formula(budget - 1, rng, vars), formula(budget - 1, rng, vars)]),
            1 => or([formula(budget - 1, rng, vars), formula(budget - 1, rng, vars)]),
            2 => implies(formula(budget - 1, rng, vars), formula(budget - 1, rng, vars)),
            _ => not(formula(budget - 1, rng, vars)),
        }
    }

    formula(8, &mut rng, vars)
}

fn bench_print_parse(c: &mut Criterion) {
    let mut scope = Scope::new();
    let vars: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|n| scope.declare(n, DataType::bounded(-16, 16)))
        .collect();
    let formula = build_random_formula(&vars);
    let text = formula.to_string();

    c.bench_function("pretty_print_random", |b| {
        b.iter(|| {
            black_box(formula.to_string());
        })
    });

    c.bench_function("parse_random", |b| {
        b.iter(|| {
            black_box(parse(&text, &scope).unwrap());
        })
    });
}

fn bench_walk_eval(c: &mut Criterion) {
    let vars: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|n| VarDecl::new(n, DataType::bounded(-16, 16)))
        .collect();
    let formula = build_random_formula(&vars);
    let mut valuation = Valuation::new();
    for (i, v) in vars.iter().enumerate() {
        valuation.insert(v.clone(), i as i64 - 2);
    }

    c.bench_function("walk_count_random", |b| {
        b.iter(|| {
            let mut count = 0usize;
            walk(&formula, |_| {
                count += 1;
                true
            });
            black_box(count);
        });
    });

    c.bench_function("eval_random", |b| {
        b.iter(|| {
            black_box(formula.eval(&valuation).unwrap());
        });
    });
}

criterion_group!(benches, bench_print_parse, bench_walk_eval);
criterion_main!(benches);
