//! Batch runner for evaluating many situations
//!
//! Pre-loads the rule system once, then evaluates any number of situations,
//! each in its own session, without re-reading parameter or table files.

use crate::benefits::scholarship;
use crate::engine::{Array, EngineConfig, RuleSystem, SessionStats};
use crate::error::Result;
use crate::parameters::DataPaths;
use crate::period::Period;
use crate::population::Population;
use crate::situation::Situation;
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Computed values for one situation
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub period: Period,
    /// (variable name, values) in request order
    pub values: Vec<(String, Arc<Array>)>,
    pub stats: SessionStats,
}

impl Evaluation {
    pub fn get(&self, name: &str) -> Option<&Array> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_ref())
    }

    /// `{ variable: { entity_id: value } }`
    pub fn to_json(&self, population: &Population, system: &RuleSystem) -> Result<Value> {
        let mut out = Map::new();
        for (name, values) in &self.values {
            let kind = system.registry().variable(name)?.entity;
            let per_entity: Map<String, Value> = population
                .ids(kind)
                .into_iter()
                .map(str::to_string)
                .zip(values.to_json())
                .collect();
            out.insert(name.clone(), Value::Object(per_entity));
        }
        Ok(Value::Object(out))
    }
}

/// Pre-loaded rule system shared by every evaluation
///
/// # Example
/// ```ignore
/// let runner = BatchRunner::scholarship(&DataPaths::default())?;
/// let evaluation = runner.run(&situation, &["scholarship_min"], period)?;
/// ```
#[derive(Debug)]
pub struct BatchRunner {
    system: RuleSystem,
}

impl BatchRunner {
    pub fn new(system: RuleSystem) -> Self {
        Self { system }
    }

    /// Runner for the scholarship rule set with data from `paths`
    pub fn scholarship(paths: &DataPaths) -> Result<Self> {
        Ok(Self::new(RuleSystem::from_data(scholarship::registry()?, paths)?))
    }

    pub fn with_config(self, config: EngineConfig) -> Self {
        Self {
            system: self.system.with_config(config),
        }
    }

    pub fn system(&self) -> &RuleSystem {
        &self.system
    }

    /// Evaluate `variables` for one situation in a fresh session
    pub fn run(&self, situation: &Situation, variables: &[&str], period: Period) -> Result<Evaluation> {
        let mut session = self
            .system
            .session(&situation.population, situation.inputs.clone())?;
        let values = variables
            .iter()
            .map(|name| Ok((name.to_string(), session.compute(name, period)?)))
            .collect::<Result<Vec<_>>>()?;

        let stats = session.stats();
        log::debug!(
            "Evaluated {} variables: {} formula evaluations, hit rate {:.2}",
            variables.len(),
            stats.evaluations,
            stats.hit_rate()
        );
        Ok(Evaluation {
            period,
            values,
            stats,
        })
    }

    /// Evaluate many situations in parallel, one session each
    pub fn run_batch(&self, situations: &[Situation], variables: &[&str], period: Period) -> Vec<Result<Evaluation>> {
        situations
            .par_iter()
            .map(|situation| self.run(situation, variables, period))
            .collect()
    }
}
