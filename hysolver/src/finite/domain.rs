//! Compiled form of a conjunction of assertions.
//!
//! Expressions are flattened into an arena of [`Node`]s where every child precedes its
//! parent, so a single forward pass evaluates the whole problem. Every node evaluates to an
//! [`Interval`]; Booleans are encoded as `0`/`1` and an undecided Boolean is `[0, 1]`.
use std::collections::BTreeMap;

use hyformal::{
    dtype::{DataType, Value},
    eval::{euclid_div, euclid_rem},
    expr::Expr,
    model::Valuation,
    variable::Symbol,
    walker,
};

use crate::error::{SolverError, SolverResult};

/// Inclusive integer interval. Empty intervals are never materialized: operations that
/// could produce one return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Interval {
    pub lo: i128,
    pub hi: i128,
}

impl Interval {
    pub const FALSE: Interval = Interval { lo: 0, hi: 0 };
    pub const TRUE: Interval = Interval { lo: 1, hi: 1 };
    pub const BOOL: Interval = Interval { lo: 0, hi: 1 };
    pub const FULL: Interval = Interval {
        lo: i128::MIN,
        hi: i128::MAX,
    };

    /// Caller guarantees `lo <= hi`.
    #[inline]
    pub const fn new(lo: i128, hi: i128) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub const fn point(v: i128) -> Self {
        Self { lo: v, hi: v }
    }

    #[inline]
    pub fn is_point(&self) -> bool {
        self.lo == self.hi
    }

    #[inline]
    pub fn is_true(&self) -> bool {
        *self == Self::TRUE
    }

    #[inline]
    pub fn is_false(&self) -> bool {
        *self == Self::FALSE
    }

    #[inline]
    pub fn contains(&self, v: i128) -> bool {
        self.lo <= v && v <= self.hi
    }

    /// Number of values minus one.
    #[inline]
    pub fn width(&self) -> u128 {
        self.hi.abs_diff(self.lo)
    }

    /// Intersection with the (possibly empty) range `lo..=hi`.
    pub fn clamp(&self, lo: i128, hi: i128) -> Option<Interval> {
        let lo = self.lo.max(lo);
        let hi = self.hi.min(hi);
        (lo <= hi).then_some(Interval { lo, hi })
    }

    #[inline]
    pub fn intersect(&self, other: Interval) -> Option<Interval> {
        self.clamp(other.lo, other.hi)
    }

    #[inline]
    pub fn hull(&self, other: Interval) -> Interval {
        Interval::new(self.lo.min(other.lo), self.hi.max(other.hi))
    }

    /// Split into two non-empty halves. Caller guarantees the interval is not a point.
    pub fn split(&self) -> (Interval, Interval) {
        let mid = self.lo + (self.hi - self.lo) / 2;
        (Interval::new(self.lo, mid), Interval::new(mid + 1, self.hi))
    }

    /// Boolean negation.
    #[inline]
    pub fn not(&self) -> Interval {
        Interval::new(1 - self.hi, 1 - self.lo)
    }

    #[inline]
    pub fn neg(&self) -> Interval {
        Interval::new(self.hi.saturating_neg(), self.lo.saturating_neg())
    }

    #[inline]
    pub fn add(&self, other: Interval) -> Interval {
        Interval::new(
            self.lo.saturating_add(other.lo),
            self.hi.saturating_add(other.hi),
        )
    }

    pub fn mul(&self, other: Interval) -> Interval {
        let corners = [
            self.lo.saturating_mul(other.lo),
            self.lo.saturating_mul(other.hi),
            self.hi.saturating_mul(other.lo),
            self.hi.saturating_mul(other.hi),
        ];
        Interval::new(
            corners.iter().copied().min().unwrap_or(i128::MIN),
            corners.iter().copied().max().unwrap_or(i128::MAX),
        )
    }

    /// Euclidean division, `a / 0 = 0`.
    ///
    /// On each sign of the divisor the quotient is monotone in both arguments, so the
    /// extremes are reached at the corners.
    pub fn div(&self, other: Interval) -> Interval {
        if self.is_point() && other.is_point() {
            return match point_div(self.lo, other.lo) {
                Some(q) => Interval::point(q),
                None => Interval::FULL,
            };
        }
        let mut out = other.contains(0).then_some(Interval::point(0));
        for part in [other.clamp(i128::MIN, -1), other.clamp(1, i128::MAX)]
            .into_iter()
            .flatten()
        {
            for x in [self.lo, self.hi] {
                for y in [part.lo, part.hi] {
                    let Some(q) = x.checked_div_euclid(y) else {
                        return Interval::FULL;
                    };
                    let q = Interval::point(q);
                    out = Some(out.map_or(q, |o| o.hull(q)));
                }
            }
        }
        out.unwrap_or(Interval::FULL)
    }

    /// Euclidean remainder, `a % 0 = a`.
    pub fn rem(&self, other: Interval) -> Interval {
        if self.is_point() && other.is_point() {
            return match point_rem(self.lo, other.lo) {
                Some(r) => Interval::point(r),
                None => Interval::FULL,
            };
        }
        let mut out = other.contains(0).then_some(*self);
        if other != Interval::point(0) {
            let max_abs = other.lo.unsigned_abs().max(other.hi.unsigned_abs());
            let min_abs = if other.lo > 0 {
                other.lo.unsigned_abs()
            } else if other.hi < 0 {
                other.hi.unsigned_abs()
            } else {
                1
            };
            let range = if self.lo >= 0 && self.hi.unsigned_abs() < min_abs {
                *self
            } else {
                Interval::new(0, i128::try_from(max_abs - 1).unwrap_or(i128::MAX))
            };
            out = Some(out.map_or(range, |o| o.hull(range)));
        }
        out.unwrap_or(Interval::FULL)
    }
}

fn point_div(a: i128, b: i128) -> Option<i128> {
    match (i64::try_from(a), i64::try_from(b)) {
        (Ok(a), Ok(b)) => euclid_div(a, b).map(i128::from),
        _ if b == 0 => Some(0),
        _ => a.checked_div_euclid(b),
    }
}

fn point_rem(a: i128, b: i128) -> Option<i128> {
    match (i64::try_from(a), i64::try_from(b)) {
        (Ok(a), Ok(b)) => euclid_rem(a, b).map(i128::from),
        _ if b == 0 => Some(a),
        _ => a.checked_rem_euclid(b),
    }
}

pub(crate) type NodeId = usize;

/// Comparison operators; `>` and `>=` are compiled by swapping operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Neq,
    Lt,
    Leq,
}

impl CmpOp {
    pub fn eval(self, a: Interval, b: Interval) -> Interval {
        let (always, never) = match self {
            CmpOp::Eq => (a.is_point() && a == b, a.hi < b.lo || b.hi < a.lo),
            CmpOp::Neq => (a.hi < b.lo || b.hi < a.lo, a.is_point() && a == b),
            CmpOp::Lt => (a.hi < b.lo, a.lo >= b.hi),
            CmpOp::Leq => (a.hi <= b.lo, a.lo > b.hi),
        };
        if always {
            Interval::TRUE
        } else if never {
            Interval::FALSE
        } else {
            Interval::BOOL
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Lit(i128),
    /// Index into [`Problem::symbols`].
    Sym(usize),
    Not(NodeId),
    And(Vec<NodeId>),
    Or(Vec<NodeId>),
    Cmp(CmpOp, NodeId, NodeId),
    Add(Vec<NodeId>),
    Mul(Vec<NodeId>),
    Neg(NodeId),
    Div(NodeId, NodeId),
    Mod(NodeId, NodeId),
    Ite(NodeId, NodeId, NodeId),
}

/// Conjunction of assertions ready for search.
#[derive(Debug, Default)]
pub(crate) struct Problem {
    pub nodes: Vec<Node>,
    /// Top-level conjuncts; the problem is satisfied when every root evaluates to `1`.
    pub roots: Vec<NodeId>,
    /// Symbols mentioned by each root, parallel to `roots`.
    pub root_symbols: Vec<Vec<usize>>,
    pub symbols: Vec<Symbol>,
    pub domains: Vec<Interval>,
    index: BTreeMap<Symbol, usize>,
    sym_nodes: Vec<NodeId>,
}

impl Problem {
    /// Compile the conjunction of `assertions`.
    ///
    /// Fails with [`SolverError::UnboundedDomain`] when a symbol ranges over the unbounded
    /// integers and with [`SolverError::PrimedAssertion`] on a primed reference.
    pub fn compile<'e>(assertions: impl IntoIterator<Item = &'e Expr>) -> SolverResult<Self> {
        let mut problem = Problem::default();
        for assertion in assertions {
            for conjunct in assertion.conjuncts() {
                let root = problem.compile_expr(conjunct)?;
                let mut symbols: Vec<usize> = walker::symbols(conjunct)
                    .iter()
                    .filter_map(|s| problem.index.get(s).copied())
                    .collect();
                symbols.sort_unstable();
                problem.roots.push(root);
                problem.root_symbols.push(symbols);
            }
        }
        Ok(problem)
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn symbol(&mut self, symbol: &Symbol) -> SolverResult<NodeId> {
        if let Some(&idx) = self.index.get(symbol) {
            return Ok(self.sym_nodes[idx]);
        }
        let domain = match symbol.dtype() {
            DataType::Bool => Interval::BOOL,
            DataType::BoundedInt { min, max } => Interval::new(min.into(), max.into()),
            DataType::Int => return Err(SolverError::UnboundedDomain(symbol.clone())),
        };
        let idx = self.symbols.len();
        let node = self.push(Node::Sym(idx));
        self.symbols.push(symbol.clone());
        self.domains.push(domain);
        self.sym_nodes.push(node);
        self.index.insert(symbol.clone(), idx);
        Ok(node)
    }

    fn compile_all(&mut self, es: &[Expr]) -> SolverResult<Vec<NodeId>> {
        es.iter().map(|e| self.compile_expr(e)).collect()
    }

    fn compile_expr(&mut self, e: &Expr) -> SolverResult<NodeId> {
        let node = match e {
            Expr::True => Node::Lit(1),
            Expr::False => Node::Lit(0),
            Expr::Int(v) => Node::Lit((*v).into()),
            Expr::Var(v) => return self.symbol(&Symbol::Var(v.clone())),
            Expr::Const(c) => return self.symbol(&Symbol::Const(c.clone())),
            Expr::Prime(_) => return Err(SolverError::PrimedAssertion(e.to_string())),
            Expr::Not(a) => Node::Not(self.compile_expr(a)?),
            Expr::And(es) => Node::And(self.compile_all(es)?),
            Expr::Or(es) => Node::Or(self.compile_all(es)?),
            Expr::Implies(a, b) => {
                let a = self.compile_expr(a)?;
                let not_a = self.push(Node::Not(a));
                Node::Or(vec![not_a, self.compile_expr(b)?])
            }
            Expr::Iff(a, b) | Expr::Eq(a, b) => {
                Node::Cmp(CmpOp::Eq, self.compile_expr(a)?, self.compile_expr(b)?)
            }
            Expr::Neq(a, b) => Node::Cmp(CmpOp::Neq, self.compile_expr(a)?, self.compile_expr(b)?),
            Expr::Lt(a, b) => Node::Cmp(CmpOp::Lt, self.compile_expr(a)?, self.compile_expr(b)?),
            Expr::Leq(a, b) => Node::Cmp(CmpOp::Leq, self.compile_expr(a)?, self.compile_expr(b)?),
            Expr::Gt(a, b) => {
                let (a, b) = (self.compile_expr(a)?, self.compile_expr(b)?);
                Node::Cmp(CmpOp::Lt, b, a)
            }
            Expr::Geq(a, b) => {
                let (a, b) = (self.compile_expr(a)?, self.compile_expr(b)?);
                Node::Cmp(CmpOp::Leq, b, a)
            }
            Expr::Add(es) => Node::Add(self.compile_all(es)?),
            Expr::Sub(a, b) => {
                let a = self.compile_expr(a)?;
                let b = self.compile_expr(b)?;
                let neg_b = self.push(Node::Neg(b));
                Node::Add(vec![a, neg_b])
            }
            Expr::Mul(es) => Node::Mul(self.compile_all(es)?),
            Expr::Neg(a) => Node::Neg(self.compile_expr(a)?),
            Expr::Div(a, b) => Node::Div(self.compile_expr(a)?, self.compile_expr(b)?),
            Expr::Mod(a, b) => Node::Mod(self.compile_expr(a)?, self.compile_expr(b)?),
            Expr::Ite {
                condition,
                then_branch,
                else_branch,
            } => Node::Ite(
                self.compile_expr(condition)?,
                self.compile_expr(then_branch)?,
                self.compile_expr(else_branch)?,
            ),
        };
        Ok(self.push(node))
    }

    #[cfg(test)]
    pub fn symbol_index(&self, symbol: &Symbol) -> Option<usize> {
        self.index.get(symbol).copied()
    }

    /// Boxes covering the full domain of every symbol.
    pub fn initial_boxes(&self) -> Vec<Interval> {
        self.domains.clone()
    }

    /// Evaluate every node under `boxes` into `values`, in arena order.
    pub fn evaluate(&self, boxes: &[Interval], values: &mut Vec<Interval>) {
        values.clear();
        values.reserve(self.nodes.len());
        for node in &self.nodes {
            let v = match node {
                Node::Lit(v) => Interval::point(*v),
                Node::Sym(s) => boxes[*s],
                Node::Not(c) => values[*c].not(),
                Node::And(cs) => cs.iter().fold(Interval::TRUE, |acc, &c| {
                    Interval::new(acc.lo.min(values[c].lo), acc.hi.min(values[c].hi))
                }),
                Node::Or(cs) => cs.iter().fold(Interval::FALSE, |acc, &c| {
                    Interval::new(acc.lo.max(values[c].lo), acc.hi.max(values[c].hi))
                }),
                Node::Cmp(op, a, b) => op.eval(values[*a], values[*b]),
                Node::Add(cs) => cs
                    .iter()
                    .fold(Interval::point(0), |acc, &c| acc.add(values[c])),
                Node::Mul(cs) => cs
                    .iter()
                    .fold(Interval::point(1), |acc, &c| acc.mul(values[c])),
                Node::Neg(c) => values[*c].neg(),
                Node::Div(a, b) => values[*a].div(values[*b]),
                Node::Mod(a, b) => values[*a].rem(values[*b]),
                Node::Ite(c, t, e) => {
                    let cond = values[*c];
                    if cond.is_true() {
                        values[*t]
                    } else if cond.is_false() {
                        values[*e]
                    } else {
                        values[*t].hull(values[*e])
                    }
                }
            };
            values.push(v);
        }
    }

    /// Read a valuation of every symbol out of `boxes`, taking the lower bound of each box.
    pub fn valuation(&self, boxes: &[Interval]) -> Valuation {
        self.symbols
            .iter()
            .zip(boxes)
            .map(|(symbol, b)| (symbol.clone(), self.value_of(symbol, b.lo)))
            .collect()
    }

    /// Convert a raw value of `symbol` back to a [`Value`].
    pub fn value_of(&self, symbol: &Symbol, raw: i128) -> Value {
        match symbol.dtype() {
            DataType::Bool => Value::Bool(raw != 0),
            // Boxes never leave the i64 domain of their symbol.
            _ => Value::Int(raw as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyformal::prelude::*;

    #[test]
    fn interval_arithmetic_is_conservative() {
        let a = Interval::new(-3, 4);
        let b = Interval::new(2, 5);
        assert_eq!(a.add(b), Interval::new(-1, 9));
        assert_eq!(a.mul(b), Interval::new(-15, 20));
        assert_eq!(a.neg(), Interval::new(-4, 3));
        assert_eq!(Interval::new(7, 9).div(Interval::new(2, 3)), Interval::new(2, 4));
        assert_eq!(Interval::new(-7, -7).div(Interval::new(2, 2)), Interval::point(-4));
        assert_eq!(Interval::new(1, 2).rem(Interval::new(5, 6)), Interval::new(1, 2));
        assert_eq!(Interval::new(0, 20).rem(Interval::new(5, 6)), Interval::new(0, 5));
        assert_eq!(Interval::point(5).div(Interval::point(0)), Interval::point(0));
        assert_eq!(Interval::point(5).rem(Interval::point(0)), Interval::point(5));
    }

    #[test]
    fn division_by_a_range_containing_zero() {
        let q = Interval::new(4, 8).div(Interval::new(-1, 2));
        for x in 4..=8 {
            for y in -1..=2 {
                assert!(q.contains(point_div(x, y).unwrap()), "{x} / {y} not in {q:?}");
            }
        }
        let r = Interval::new(-4, 8).rem(Interval::new(-3, 0));
        for x in -4..=8 {
            for y in -3..=0 {
                assert!(r.contains(point_rem(x, y).unwrap()), "{x} % {y} not in {r:?}");
            }
        }
    }

    #[test]
    fn compiles_and_evaluates() {
        let x = VarDecl::new("x", DataType::bounded(0, 7));
        let b = VarDecl::new("b", DataType::Bool);
        let e = and([
            gt(x.to_expr(), int(2)),
            implies(b.to_expr(), eq(x.to_expr() + int(1), int(4))),
        ]);
        let problem = Problem::compile([&e]).unwrap();
        assert_eq!(problem.roots.len(), 2);
        assert_eq!(problem.symbols.len(), 2);

        let xi = problem.symbol_index(&x.clone().into()).unwrap();
        let bi = problem.symbol_index(&b.clone().into()).unwrap();
        let mut boxes = problem.initial_boxes();
        let mut values = Vec::new();

        problem.evaluate(&boxes, &mut values);
        assert_eq!(values[problem.roots[0]], Interval::BOOL);

        boxes[xi] = Interval::point(3);
        boxes[bi] = Interval::TRUE;
        problem.evaluate(&boxes, &mut values);
        assert!(problem.roots.iter().all(|&r| values[r].is_true()));

        let model = problem.valuation(&boxes);
        assert_eq!(model.get_var(&x), Some(Value::Int(3)));
        assert_eq!(model.get_var(&b), Some(Value::Bool(true)));
        assert_eq!(e.eval(&model), Ok(Value::Bool(true)));
    }

    #[test]
    fn rejects_unbounded_symbols() {
        let n = VarDecl::new("n", DataType::Int);
        let e = gt(n.to_expr(), int(0));
        assert_eq!(
            Problem::compile([&e]).unwrap_err(),
            SolverError::UnboundedDomain(Symbol::Var(n))
        );
    }
}
