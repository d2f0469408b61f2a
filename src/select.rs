//! First-match piecewise selection
//!
//! Branches are tried in declared order for each element; the first true
//! condition wins and later conditions are never consulted for that element.

use crate::error::{EngineError, Result};
use crate::parameters::AmountTable;

/// Value produced by a branch
pub enum Choice<'a, T> {
    /// Same value for every element
    Const(T),
    /// One value per element
    Each(Vec<T>),
    /// Computed only for elements that select this branch
    With(Box<dyn Fn(usize) -> Result<T> + 'a>),
}

impl<'a> Choice<'a, i64> {
    /// Table cell at `(rows[i], cols[i])` for each selecting element
    pub fn lookup(table: &'a AmountTable, rows: &'a [i64], cols: &'a [i64]) -> Self {
        Choice::With(Box::new(move |i| table.get(rows[i], cols[i])))
    }
}

impl<T: Clone> Choice<'_, T> {
    fn value(&self, i: usize) -> Result<T> {
        match self {
            Choice::Const(v) => Ok(v.clone()),
            Choice::Each(values) => Ok(values[i].clone()),
            Choice::With(f) => f(i),
        }
    }

    fn check_len(&self, len: usize) -> Result<()> {
        match self {
            Choice::Each(values) if values.len() != len => Err(EngineError::LengthMismatch {
                variable: "select value".to_string(),
                expected: len,
                found: values.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Element-wise value of the first true condition, or `default`
pub fn select<'a, T: Clone>(
    len: usize,
    branches: Vec<(&'a [bool], Choice<'a, T>)>,
    default: T,
) -> Result<Vec<T>> {
    for (condition, choice) in &branches {
        if condition.len() != len {
            return Err(EngineError::LengthMismatch {
                variable: "select condition".to_string(),
                expected: len,
                found: condition.len(),
            });
        }
        choice.check_len(len)?;
    }

    (0..len)
        .map(|i| {
            match branches.iter().find(|(condition, _)| condition[i]) {
                Some((_, choice)) => choice.value(i),
                None => Ok(default.clone()),
            }
        })
        .collect()
}
