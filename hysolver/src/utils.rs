use std::ops::{Deref, DerefMut};

use log::warn;

use crate::solver::Solver;

/// Scope guard: pushes a scope on creation and pops it when dropped.
///
/// This is akin to a `&'s mut S` whose assertions are discarded once the guard goes out of
/// scope, including on early returns and `?` propagation.
pub struct WithPushPop<'s, S: Solver + ?Sized> {
    solver: &'s mut S,
}

impl<'s, S: Solver + ?Sized> WithPushPop<'s, S> {
    pub fn new(solver: &'s mut S) -> Self {
        solver.push();
        Self { solver }
    }
}

impl<'s, S: Solver + ?Sized> AsRef<S> for WithPushPop<'s, S> {
    fn as_ref(&self) -> &'_ S {
        self.solver
    }
}

impl<'s, S: Solver + ?Sized> Deref for WithPushPop<'s, S> {
    type Target = S;

    fn deref(&self) -> &'_ Self::Target {
        self.solver
    }
}

impl<'s, S: Solver + ?Sized> DerefMut for WithPushPop<'s, S> {
    fn deref_mut(&mut self) -> &'_ mut Self::Target {
        self.solver
    }
}

impl<'s, S: Solver + ?Sized> Drop for WithPushPop<'s, S> {
    fn drop(&mut self) {
        if let Err(err) = self.solver.pop(1) {
            warn!("WithPushPop could not close its scope: {err}");
        }
    }
}
