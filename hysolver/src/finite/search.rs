//! Propagation and depth-first search over symbol boxes.
//!
//! A *box* assigns an interval to every symbol of a [`Problem`]. The search alternates
//! - propagation: evaluate the problem forward, then push the requirement "every root is
//!   true" down the arena, narrowing the boxes of the symbols (value forcing through
//!   equalities, bound narrowing through comparisons and sums, unit reasoning on
//!   conjunctions and disjunctions), until the boxes stop changing;
//! - decision: split the smallest undecided box in two halves and explore the lower half
//!   first.
//!
//! A box whose roots all evaluate to `1` is a solution for every point it contains.
use super::domain::{CmpOp, Interval, Node, NodeId, Problem};

/// Upper bound on propagation rounds per box; narrowing by one value per round on wide
/// domains would otherwise take as many rounds as the domain is large.
const PROPAGATION_ROUNDS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SearchOutcome {
    Sat(Vec<Interval>),
    Unsat,
    /// The decision budget ran out.
    Unknown,
}

/// Result of looking for the next symbol to split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pick {
    /// Every root holds on the whole box.
    Satisfied,
    Split(usize),
    /// Some root is undecided but none of its allowed symbols can be split.
    Stuck,
}

struct Conflict;

pub(crate) struct Search<'p> {
    problem: &'p Problem,
    /// Forward evaluation of the current box.
    values: Vec<Interval>,
    /// Scratch bounds refined while narrowing.
    bounds: Vec<Interval>,
    changed: bool,
    max_decisions: u64,
    pub decisions: u64,
    pub conflicts: u64,
}

impl<'p> Search<'p> {
    pub fn new(problem: &'p Problem, max_decisions: u64) -> Self {
        Self {
            problem,
            values: Vec::with_capacity(problem.nodes.len()),
            bounds: Vec::with_capacity(problem.nodes.len()),
            changed: false,
            max_decisions,
            decisions: 0,
            conflicts: 0,
        }
    }

    /// Account for one decision. Returns `false` once the budget is spent.
    pub fn decide(&mut self) -> bool {
        self.decisions += 1;
        self.decisions <= self.max_decisions
    }

    /// Find a box of `boxes` satisfying every root.
    pub fn solve(&mut self, boxes: Vec<Interval>) -> SearchOutcome {
        let mut stack = vec![boxes];
        while let Some(mut boxes) = stack.pop() {
            if !self.propagate(&mut boxes) {
                continue;
            }
            match self.pick(&boxes, |_| true) {
                Pick::Satisfied => return SearchOutcome::Sat(boxes),
                Pick::Split(s) => {
                    if !self.decide() {
                        return SearchOutcome::Unknown;
                    }
                    let (low, high) = boxes[s].split();
                    let mut other = boxes.clone();
                    other[s] = high;
                    boxes[s] = low;
                    stack.push(other);
                    stack.push(boxes);
                }
                // Only reachable through saturated arithmetic.
                Pick::Stuck => return SearchOutcome::Unknown,
            }
        }
        SearchOutcome::Unsat
    }

    /// Narrow `boxes` until a fixpoint (or the round limit) is reached. Returns `false` when
    /// the box provably contains no solution. On success the forward evaluation of the
    /// returned box is available to [`Search::pick`].
    pub fn propagate(&mut self, boxes: &mut [Interval]) -> bool {
        let problem = self.problem;
        for _ in 0..PROPAGATION_ROUNDS {
            problem.evaluate(boxes, &mut self.values);
            if problem.roots.iter().any(|&r| self.values[r].is_false()) {
                self.conflicts += 1;
                return false;
            }
            self.bounds.clone_from(&self.values);
            self.changed = false;
            for &root in &problem.roots {
                if self.narrow(root, Interval::TRUE, boxes).is_err() {
                    self.conflicts += 1;
                    return false;
                }
            }
            if !self.changed {
                return true;
            }
        }
        problem.evaluate(boxes, &mut self.values);
        if problem.roots.iter().any(|&r| self.values[r].is_false()) {
            self.conflicts += 1;
            return false;
        }
        true
    }

    /// Choose the allowed symbol with the smallest non-trivial box among the symbols of
    /// undecided roots (fail-first).
    pub fn pick(&self, boxes: &[Interval], allowed: impl Fn(usize) -> bool) -> Pick {
        let problem = self.problem;
        let mut undecided = false;
        let mut best: Option<(u128, usize)> = None;
        for (i, &root) in problem.roots.iter().enumerate() {
            if self.values[root].is_true() {
                continue;
            }
            undecided = true;
            for &s in &problem.root_symbols[i] {
                let width = boxes[s].width();
                if width == 0 || !allowed(s) {
                    continue;
                }
                if best.is_none_or(|(w, _)| width < w) {
                    best = Some((width, s));
                }
            }
        }
        match (undecided, best) {
            (false, _) => Pick::Satisfied,
            (true, Some((_, s))) => Pick::Split(s),
            (true, None) => Pick::Stuck,
        }
    }

    fn restrict(
        &mut self,
        s: usize,
        target: Interval,
        boxes: &mut [Interval],
    ) -> Result<(), Conflict> {
        let narrowed = boxes[s].intersect(target).ok_or(Conflict)?;
        if narrowed != boxes[s] {
            boxes[s] = narrowed;
            self.changed = true;
        }
        Ok(())
    }

    /// Require `node` to take a value in `target`.
    fn narrow(
        &mut self,
        node: NodeId,
        target: Interval,
        boxes: &mut [Interval],
    ) -> Result<(), Conflict> {
        let problem = self.problem;
        let target = self.bounds[node].intersect(target).ok_or(Conflict)?;
        self.bounds[node] = target;

        match &problem.nodes[node] {
            Node::Lit(_) => Ok(()),
            Node::Sym(s) => self.restrict(*s, target, boxes),
            Node::Not(c) => self.narrow(*c, target.not(), boxes),
            Node::And(cs) => self.narrow_junction(cs, target, true, boxes),
            Node::Or(cs) => self.narrow_junction(cs, target, false, boxes),
            Node::Cmp(op, a, b) => {
                if target.is_true() {
                    self.narrow_cmp(*op, *a, *b, boxes)
                } else if target.is_false() {
                    let (op, a, b) = negate(*op, *a, *b);
                    self.narrow_cmp(op, a, b, boxes)
                } else {
                    Ok(())
                }
            }
            Node::Add(cs) => {
                for (i, &c) in cs.iter().enumerate() {
                    let others = cs
                        .iter()
                        .enumerate()
                        .filter(|&(j, _)| j != i)
                        .fold(Interval::point(0), |acc, (_, &o)| acc.add(self.bounds[o]));
                    let lo = target.lo.saturating_sub(others.hi);
                    let hi = target.hi.saturating_sub(others.lo);
                    if lo > hi {
                        return Err(Conflict);
                    }
                    self.narrow(c, Interval::new(lo, hi), boxes)?;
                }
                Ok(())
            }
            Node::Mul(cs) => {
                let mut open = cs.iter().copied().filter(|&c| !self.bounds[c].is_point());
                let (Some(c), None) = (open.next(), open.next()) else {
                    return Ok(());
                };
                let factor = cs
                    .iter()
                    .filter(|&&o| o != c)
                    .fold(Interval::point(1), |acc, &o| acc.mul(self.bounds[o]));
                match quotient_range(target, factor.lo) {
                    Some((lo, hi)) if lo > hi => Err(Conflict),
                    Some((lo, hi)) => self.narrow(c, Interval::new(lo, hi), boxes),
                    None => Ok(()),
                }
            }
            Node::Neg(c) => self.narrow(*c, target.neg(), boxes),
            Node::Div(..) | Node::Mod(..) => Ok(()),
            Node::Ite(c, t, e) => {
                let cond = self.bounds[*c];
                if cond.is_true() {
                    self.narrow(*t, target, boxes)
                } else if cond.is_false() {
                    self.narrow(*e, target, boxes)
                } else if self.bounds[*t].intersect(target).is_none() {
                    self.narrow(*c, Interval::FALSE, boxes)?;
                    self.narrow(*e, target, boxes)
                } else if self.bounds[*e].intersect(target).is_none() {
                    self.narrow(*c, Interval::TRUE, boxes)?;
                    self.narrow(*t, target, boxes)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Shared reasoning for `and` (`conjunction = true`) and `or`.
    fn narrow_junction(
        &mut self,
        cs: &[NodeId],
        target: Interval,
        conjunction: bool,
        boxes: &mut [Interval],
    ) -> Result<(), Conflict> {
        // For `and`, "absorbing" is false and "neutral" is true; the other way round for `or`.
        let (neutral, absorbing) = if conjunction {
            (Interval::TRUE, Interval::FALSE)
        } else {
            (Interval::FALSE, Interval::TRUE)
        };
        if target == neutral {
            for &c in cs {
                self.narrow(c, neutral, boxes)?;
            }
        } else if target == absorbing {
            if cs.iter().any(|&c| self.bounds[c] == absorbing) {
                return Ok(());
            }
            let mut open = cs.iter().copied().filter(|&c| self.bounds[c] != neutral);
            match (open.next(), open.next()) {
                (None, _) => return Err(Conflict),
                (Some(c), None) => self.narrow(c, absorbing, boxes)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn narrow_cmp(
        &mut self,
        op: CmpOp,
        a: NodeId,
        b: NodeId,
        boxes: &mut [Interval],
    ) -> Result<(), Conflict> {
        let (va, vb) = (self.bounds[a], self.bounds[b]);
        match op {
            CmpOp::Eq => {
                self.narrow(a, vb, boxes)?;
                let va = self.bounds[a];
                self.narrow(b, va, boxes)
            }
            CmpOp::Neq => {
                if vb.is_point() {
                    self.exclude(a, vb.lo, boxes)?;
                }
                let va = self.bounds[a];
                if va.is_point() {
                    self.exclude(b, va.lo, boxes)?;
                }
                Ok(())
            }
            CmpOp::Lt => {
                self.narrow(a, Interval::new(i128::MIN, vb.hi.saturating_sub(1)), boxes)?;
                self.narrow(b, Interval::new(va.lo.saturating_add(1), i128::MAX), boxes)
            }
            CmpOp::Leq => {
                self.narrow(a, Interval::new(i128::MIN, vb.hi), boxes)?;
                self.narrow(b, Interval::new(va.lo, i128::MAX), boxes)
            }
        }
    }

    /// Remove `v` from the bounds of `node` when it sits on one of their ends.
    fn exclude(&mut self, node: NodeId, v: i128, boxes: &mut [Interval]) -> Result<(), Conflict> {
        let current = self.bounds[node];
        if current == Interval::point(v) {
            Err(Conflict)
        } else if current.lo == v {
            self.narrow(node, Interval::new(v + 1, current.hi), boxes)
        } else if current.hi == v {
            self.narrow(node, Interval::new(current.lo, v - 1), boxes)
        } else {
            Ok(())
        }
    }
}

/// Comparison holding exactly when `a op b` does not.
fn negate(op: CmpOp, a: NodeId, b: NodeId) -> (CmpOp, NodeId, NodeId) {
    match op {
        CmpOp::Eq => (CmpOp::Neq, a, b),
        CmpOp::Neq => (CmpOp::Eq, a, b),
        CmpOp::Lt => (CmpOp::Leq, b, a),
        CmpOp::Leq => (CmpOp::Lt, b, a),
    }
}

/// Bounds of the values `x` with `x * factor` in `target`, or `None` if nothing can be
/// concluded. The bounds cross when no such `x` exists.
fn quotient_range(target: Interval, factor: i128) -> Option<(i128, i128)> {
    if factor == 0 || target.lo == i128::MIN || target.hi == i128::MAX {
        return None;
    }
    let (lo, hi) = if factor > 0 {
        (div_ceil(target.lo, factor)?, div_floor(target.hi, factor)?)
    } else {
        (div_ceil(target.hi, factor)?, div_floor(target.lo, factor)?)
    };
    Some((lo, hi))
}

fn div_floor(a: i128, b: i128) -> Option<i128> {
    let q = a.checked_div(b)?;
    Some(if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q })
}

fn div_ceil(a: i128, b: i128) -> Option<i128> {
    let q = a.checked_div(b)?;
    Some(if a % b != 0 && ((a < 0) == (b < 0)) { q + 1 } else { q })
}
