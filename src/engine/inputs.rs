//! Externally supplied values for leaf variables

use super::array::Array;
use crate::period::Period;
use std::collections::HashMap;

/// Input dataset keyed by (variable name, period)
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    values: HashMap<(String, Period), Array>,
}

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, period: Period, values: Array) -> &mut Self {
        self.values.insert((name.into(), period), values);
        self
    }

    pub fn with(mut self, name: impl Into<String>, period: Period, values: Array) -> Self {
        self.set(name, period, values);
        self
    }

    pub fn get(&self, name: &str, period: Period) -> Option<&Array> {
        self.values.get(&(name.to_string(), period))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Period, &Array)> {
        self.values.iter().map(|((name, period), values)| (name.as_str(), *period, values))
    }

    pub(crate) fn into_entries(self) -> impl Iterator<Item = ((String, Period), Array)> {
        self.values.into_iter()
    }
}
