//! Existential projection of a problem onto a subset of its symbols.
//!
//! The projection is enumerated as a set of disjoint *cubes*: one interval per projected
//! symbol such that every point of the cube extends to a solution of the problem. Cubes are
//! then merged along each dimension and rendered as a disjunction of range constraints.
use hyformal::{
    dtype::DataType,
    expr::{Expr, func::*},
};
use log::trace;

use super::{
    FiniteSolverConfig,
    domain::{Interval, Problem},
    search::{Pick, Search, SearchOutcome},
};
use crate::error::{SolverError, SolverResult};

/// Intervals over the projected symbols, in the order of the projection.
pub(crate) type Cube = Vec<Interval>;

/// Enumerate the projection of `problem` onto the symbols `onto` (indices into
/// [`Problem::symbols`]).
///
/// Projected symbols are split first; once every undecided root only mentions fixed
/// projected symbols, a nested search decides whether the remaining symbols can be
/// completed. The decision budget is shared by both phases.
pub(crate) fn project(
    problem: &Problem,
    onto: &[usize],
    config: &FiniteSolverConfig,
) -> SolverResult<Vec<Cube>> {
    let mut projected = vec![false; problem.symbols.len()];
    for &s in onto {
        projected[s] = true;
    }

    let mut search = Search::new(problem, config.max_decisions);
    let mut cubes = Vec::new();
    let mut stack = vec![problem.initial_boxes()];
    while let Some(mut boxes) = stack.pop() {
        if !search.propagate(&mut boxes) {
            continue;
        }
        match search.pick(&boxes, |s| projected[s]) {
            Pick::Satisfied => {}
            Pick::Split(s) => {
                if !search.decide() {
                    return Err(exhausted_decisions(config));
                }
                let (low, high) = boxes[s].split();
                let mut other = boxes.clone();
                other[s] = high;
                boxes[s] = low;
                stack.push(other);
                stack.push(boxes);
                continue;
            }
            Pick::Stuck => match search.solve(boxes.clone()) {
                SearchOutcome::Sat(_) => {}
                SearchOutcome::Unsat => continue,
                SearchOutcome::Unknown => return Err(exhausted_decisions(config)),
            },
        }

        cubes.push(onto.iter().map(|&s| boxes[s]).collect());
        if cubes.len() > config.max_cubes {
            return Err(SolverError::ResourceExhausted(format!(
                "projection needs more than {} cubes",
                config.max_cubes
            )));
        }
    }
    trace!(
        "Projected onto {} symbol(s): {} cube(s), {} decision(s), {} conflict(s)",
        onto.len(),
        cubes.len(),
        search.decisions,
        search.conflicts
    );
    Ok(cubes)
}

fn exhausted_decisions(config: &FiniteSolverConfig) -> SolverError {
    SolverError::ResourceExhausted(format!(
        "projection exceeded the budget of {} decisions",
        config.max_decisions
    ))
}

/// Merge cubes that agree everywhere except on one dimension where their intervals touch.
/// Dimensions are processed from last to first until no merge applies.
pub(crate) fn compress(mut cubes: Vec<Cube>) -> Vec<Cube> {
    let dims = cubes.first().map_or(0, Vec::len);
    loop {
        let before = cubes.len();
        for d in (0..dims).rev() {
            cubes = merge_along(cubes, d);
        }
        if cubes.len() == before {
            return cubes;
        }
    }
}

fn merge_along(mut cubes: Vec<Cube>, d: usize) -> Vec<Cube> {
    // Cubes differing only on `d` become adjacent, ordered by their interval on `d`.
    let key = |c: &Cube| {
        let mut k: Vec<(i128, i128)> = c
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != d)
            .map(|(_, iv)| (iv.lo, iv.hi))
            .collect();
        k.push((c[d].lo, c[d].hi));
        k
    };
    cubes.sort_by_cached_key(key);

    let mut out: Vec<Cube> = Vec::with_capacity(cubes.len());
    for cube in cubes {
        if let Some(last) = out.last_mut() {
            let same_rest = last
                .iter()
                .zip(&cube)
                .enumerate()
                .all(|(i, (a, b))| i == d || a == b);
            if same_rest && cube[d].lo <= last[d].hi.saturating_add(1) {
                last[d] = last[d].hull(cube[d]);
                continue;
            }
        }
        out.push(cube);
    }
    out
}

/// Render `cubes` over the symbols `onto` of `problem` as a disjunction of range
/// constraints. Bounds implied by the domain of a symbol are left out.
pub(crate) fn to_expr(problem: &Problem, onto: &[usize], cubes: &[Cube]) -> Expr {
    or(cubes.iter().map(|cube| {
        and(onto.iter().zip(cube).filter_map(|(&s, iv)| {
            let symbol = &problem.symbols[s];
            let domain = problem.domains[s];
            let e = symbol.to_expr();
            // Boxes stay inside the i64 domain of their symbol.
            let (lo, hi) = (iv.lo as i64, iv.hi as i64);
            if *iv == domain {
                None
            } else if symbol.dtype() == DataType::Bool {
                Some(if iv.is_true() { e } else { not(e) })
            } else if iv.is_point() {
                Some(eq(e, int(lo)))
            } else if iv.lo == domain.lo {
                Some(leq(e, int(hi)))
            } else if iv.hi == domain.hi {
                Some(geq(e, int(lo)))
            } else {
                Some(and([geq(e.clone(), int(lo)), leq(e, int(hi))]))
            }
        }))
    }))
}
