//! Period-scoped scalar parameters

use crate::error::{EngineError, Result};
use crate::period::Period;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Effective-dated values for one parameter path
///
/// Each entry applies from its start date until the next entry's start.
/// A `None` value ends validity, leaving a gap until the next entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterNode {
    entries: Vec<(NaiveDate, Option<f64>)>,
    default: Option<f64>,
}

impl ParameterNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, start: NaiveDate, value: f64) -> Self {
        self.entries.push((start, Some(value)));
        self
    }

    /// Stop the previous value at `start`
    pub fn ending(mut self, start: NaiveDate) -> Self {
        self.entries.push((start, None));
        self
    }

    /// Value used when no entry is in effect
    pub fn with_default(mut self, value: f64) -> Self {
        self.default = Some(value);
        self
    }

    fn validate(&mut self, path: &str) -> Result<()> {
        self.entries.sort_by_key(|(start, _)| *start);
        if let Some(pair) = self.entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(EngineError::InvalidParameter {
                path: path.to_string(),
                message: format!("two values start on {}", pair[0].0),
            });
        }
        Ok(())
    }

    /// Value in effect at the start of `period`
    pub fn value_at(&self, period: Period) -> Option<f64> {
        let entry = match period.start() {
            Some(date) => self.entries.iter().rev().find(|(start, _)| *start <= date),
            None => self.entries.last(),
        };
        entry.and_then(|(_, value)| *value).or(self.default)
    }
}

/// Parameters keyed by dotted path
#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    nodes: HashMap<String, ParameterNode>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, mut node: ParameterNode) -> Result<()> {
        let path = path.into();
        node.validate(&path)?;
        self.nodes.insert(path, node);
        Ok(())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &str, period: Period) -> Result<f64> {
        let node = self.nodes.get(path).ok_or_else(|| EngineError::UnknownParameter {
            path: path.to_string(),
        })?;
        node.value_at(period).ok_or_else(|| EngineError::NoParameterValue {
            path: path.to_string(),
            period: period.to_string(),
        })
    }
}
