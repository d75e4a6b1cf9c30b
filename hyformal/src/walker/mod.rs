//! Iterative walkers over expression trees.
//!
//! Traversal strategy
//! - Pre-order, left to right, driven by an explicit stack (no recursion), so deep
//!   unrollings do not overflow the call stack.
//! - The visitor decides whether the children of a node are explored by returning `true`.
//!   Returning `false` prunes the subtree.
//!
//! Example: count the integer literals of a formula
//! ```
//! use hyformal::prelude::*;
//! use hyformal::walker::walk;
//!
//! let x = VarDecl::new("x", DataType::Int);
//! let e = and([lt(x.to_expr(), int(3)), gt(x.to_expr(), int(-1))]);
//! let mut literals = 0;
//! walk(&e, |node| {
//!     if node.is_int() {
//!         literals += 1;
//!     }
//!     true
//! });
//! assert_eq!(literals, 2);
//! ```
use std::collections::BTreeSet;

use crate::{
    expr::Expr,
    variable::{Symbol, VarDecl},
};

/// Visit every node of `root` in pre-order. Children of a node are only visited when
/// `visitor` returns `true` for it.
pub fn walk<'e>(root: &'e Expr, mut visitor: impl FnMut(&'e Expr) -> bool) {
    let mut stack: Vec<&'e Expr> = vec![root];
    while let Some(node) = stack.pop() {
        if visitor(node) {
            // Reversed so that the leftmost child is popped first.
            stack.extend(node.children().iter().rev().copied());
        }
    }
}

/// Rebuild `e` bottom-up: the children of a node are rewritten first, then `f` is applied to
/// the rebuilt node.
pub fn try_rewrite<E, F>(e: &Expr, f: &mut F) -> Result<Expr, E>
where
    F: FnMut(Expr) -> Result<Expr, E>,
{
    let rebuilt = e.try_map_children(|child| try_rewrite(child, f))?;
    f(rebuilt)
}

/// Infallible variant of [`try_rewrite`].
pub fn rewrite(e: &Expr, mut f: impl FnMut(Expr) -> Expr) -> Expr {
    match try_rewrite(e, &mut |node| Ok::<_, std::convert::Infallible>(f(node))) {
        Ok(e) => e,
        Err(never) => match never {},
    }
}

/// Every variable and constant occurring in `e`.
///
/// A primed variable `x'` contributes `x`; use [`primed_vars`] to tell them apart.
pub fn symbols(e: &Expr) -> BTreeSet<Symbol> {
    let mut out = BTreeSet::new();
    walk(e, |node| {
        match node {
            Expr::Var(v) => {
                out.insert(Symbol::Var(v.clone()));
            }
            Expr::Const(c) => {
                out.insert(Symbol::Const(c.clone()));
            }
            _ => {}
        }
        true
    });
    out
}

/// State variables occurring in `e`, whether primed, un-primed or versioned.
pub fn vars(e: &Expr) -> BTreeSet<VarDecl> {
    symbols(e).into_iter().map(|s| s.var().clone()).collect()
}

/// Variables occurring under at least one prime.
pub fn primed_vars(e: &Expr) -> BTreeSet<VarDecl> {
    let mut out = BTreeSet::new();
    walk(e, |node| {
        if let Expr::Prime(inner) = node {
            out.extend(vars(inner));
            return false;
        }
        true
    });
    out
}

/// Whether `e` contains a prime anywhere.
pub fn contains_prime(e: &Expr) -> bool {
    let mut found = false;
    walk(e, |node| {
        if node.is_prime() {
            found = true;
        }
        !found
    });
    found
}
