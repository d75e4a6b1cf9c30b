use hyformal::prelude::*;

fn main() {
    let mut scope = Scope::new();
    let x = scope.declare("x", DataType::bounded(0, 7));
    let running = scope.declare("running", DataType::Bool);

    // Saturating counter that only moves while `running` holds.
    let trans = and([
        implies(
            running.to_expr(),
            eq(
                x.primed(),
                ite(lt(x.to_expr(), int(7)), x.to_expr() + int(1), x.to_expr()),
            ),
        ),
        implies(not(running.to_expr()), eq(x.primed(), x.to_expr())),
    ]);
    trans.pretty_print().unwrap();

    let parsed = parse(&trans.to_string(), &scope).unwrap();
    assert_eq!(parsed, trans);

    let mut state = Valuation::new();
    state.insert(x.clone(), 3i64);
    state.insert(running.clone(), true);
    let guard = and([running.to_expr(), lt(x.to_expr(), int(7))]);
    println!("{guard} under {state}: {}", guard.eval(&state).unwrap());
}
