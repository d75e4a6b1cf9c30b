//! Valuations: finite maps from symbols to values.
use std::{collections::BTreeMap, fmt};

use crate::{
    dtype::Value,
    expr::{Expr, func},
    variable::{IndexedConst, Symbol, VarDecl},
};

/// Assignment of values to symbols, kept sorted so that printing and iteration are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Valuation {
    values: BTreeMap<Symbol, Value>,
}

impl Valuation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `symbol` to `value`, returning the previous binding if any.
    pub fn insert(&mut self, symbol: impl Into<Symbol>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(symbol.into(), value.into())
    }

    #[inline]
    pub fn get(&self, symbol: &Symbol) -> Option<Value> {
        self.values.get(symbol).copied()
    }

    #[inline]
    pub fn get_var(&self, var: &VarDecl) -> Option<Value> {
        self.get(&Symbol::Var(var.clone()))
    }

    #[inline]
    pub fn get_const(&self, c: &IndexedConst) -> Option<Value> {
        self.get(&Symbol::Const(c.clone()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Value)> {
        self.values.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.values.keys()
    }

    /// Conjunction of `symbol = value` equalities describing exactly this valuation.
    pub fn to_expr(&self) -> Expr {
        func::and(
            self.values
                .iter()
                .map(|(s, v)| func::eq(s.to_expr(), Expr::from(*v))),
        )
    }
}

impl FromIterator<(Symbol, Value)> for Valuation {
    fn from_iter<T: IntoIterator<Item = (Symbol, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Valuation {
    type Item = (Symbol, Value);
    type IntoIter = std::collections::btree_map::IntoIter<Symbol, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (s, v)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{s} = {v}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::DataType;

    #[test]
    fn display_is_sorted() {
        let x = VarDecl::new("x", DataType::Int);
        let b = VarDecl::new("b", DataType::Bool);
        let mut val = Valuation::new();
        val.insert(b.clone(), true);
        val.insert(x.clone(), 4i64);
        // Declaration order decides: `x` was declared first.
        assert_eq!(val.to_string(), "{x = 4, b = true}");
        assert_eq!(val.get_var(&x), Some(Value::Int(4)));
        assert_eq!(val.len(), 2);
    }
}
