//! Per-session computation cache and dependency resolver
//!
//! A session owns an arena of `(variable, period)` nodes. A node is either
//! in progress (its formula is on the evaluation stack) or done (its value is
//! cached and never changes again in this session). Requesting a node that is
//! in progress is a same-period cycle.

use super::array::Array;
use super::inputs::Inputs;
use super::registry::{Formula, Variable, VariableId};
use super::{EngineConfig, RuleSystem};
use crate::aggregate;
use crate::enums::Category;
use crate::error::{EngineError, Result};
use crate::parameters::AmountTable;
use crate::period::Period;
use crate::population::{EntityKind, Population, Role};
use std::collections::HashMap;
use std::sync::Arc;

type Key = (VariableId, Period);

#[derive(Debug, Clone)]
enum NodeState {
    InProgress,
    Done(Arc<Array>),
}

/// Counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Formula invocations that produced a cached value
    pub evaluations: u64,
}

impl SessionStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// One evaluation session over a fixed population
///
/// Not shared between threads: the order in which the cache fills decides
/// which formulas run.
pub struct Session<'s> {
    system: &'s RuleSystem,
    population: &'s Population,
    config: EngineConfig,
    inputs: HashMap<Key, Array>,
    nodes: HashMap<Key, NodeState>,
    stack: Vec<Key>,
    stats: SessionStats,
}

impl<'s> Session<'s> {
    /// Inputs are resolved against the registry up front, so an unknown
    /// input name fails here rather than being silently ignored.
    pub fn new(system: &'s RuleSystem, population: &'s Population, inputs: Inputs, config: EngineConfig) -> Result<Self> {
        let registry = system.registry();
        let mut resolved = HashMap::with_capacity(inputs.len());
        for ((name, period), values) in inputs.into_entries() {
            let id = registry.id(&name)?;
            let variable = registry.get(id);
            if !variable.is_input() {
                log::warn!("Input supplied for computed variable {}; formula is ignored", name);
            }
            let values = check_result(variable, values, population.count(variable.entity))?;
            let key = (id, period.normalize(variable.definition_period));
            if resolved.insert(key, values).is_some() {
                return Err(EngineError::invalid_input(format!(
                    "{name} given more than once for {}",
                    key.1
                )));
            }
        }

        Ok(Self {
            system,
            population,
            config,
            inputs: resolved,
            nodes: HashMap::new(),
            stack: Vec::new(),
            stats: SessionStats::default(),
        })
    }

    pub fn population(&self) -> &'s Population {
        self.population
    }

    pub fn system(&self) -> &'s RuleSystem {
        self.system
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Number of cached `(variable, period)` values
    pub fn cached(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n, NodeState::Done(_)))
            .count()
    }

    pub fn compute(&mut self, name: &str, period: Period) -> Result<Arc<Array>> {
        let id = self.system.registry().id(name)?;
        self.compute_id(id, period)
    }

    pub fn compute_id(&mut self, id: VariableId, period: Period) -> Result<Arc<Array>> {
        let system = self.system;
        let variable = system.registry().get(id);
        let key = (id, period.normalize(variable.definition_period));

        match self.nodes.get(&key) {
            Some(NodeState::Done(values)) => {
                self.stats.cache_hits += 1;
                return Ok(Arc::clone(values));
            }
            Some(NodeState::InProgress) => return Err(self.cycle_error(key)),
            None => {}
        }
        self.stats.cache_misses += 1;

        let values = match variable.formula() {
            Some(formula) => {
                if self.stack.len() >= self.config.max_depth {
                    return Err(EngineError::MaxDepthExceeded {
                        key: self.describe(key),
                        max_depth: self.config.max_depth,
                    });
                }
                if let Some(supplied) = self.inputs.remove(&key) {
                    supplied
                } else {
                    self.evaluate(variable, key, formula)?
                }
            }
            None => self.leaf(variable, key),
        };

        let values = Arc::new(values);
        self.nodes.insert(key, NodeState::Done(Arc::clone(&values)));
        Ok(values)
    }

    fn evaluate(&mut self, variable: &'s Variable, key: Key, formula: &Formula) -> Result<Array> {
        self.nodes.insert(key, NodeState::InProgress);
        self.stack.push(key);
        if self.config.log_evaluations {
            log::info!("Evaluating {} {:?}", self.describe(key), variable.label);
        } else {
            log::debug!("Evaluating {}", self.describe(key));
        }

        let result = {
            let mut ctx = Context {
                session: &mut *self,
                entity: variable.entity,
                period: key.1,
            };
            formula(&mut ctx)
        };
        self.stack.pop();

        match result.and_then(|values| check_result(variable, values, self.population.count(variable.entity))) {
            Ok(values) => {
                self.stats.evaluations += 1;
                Ok(values)
            }
            Err(err) => {
                // no partial result for the failing key; earlier siblings stay cached
                self.nodes.remove(&key);
                Err(err)
            }
        }
    }

    fn leaf(&mut self, variable: &Variable, key: Key) -> Array {
        match self.inputs.remove(&key) {
            Some(values) => values,
            None => {
                log::debug!("No input for {}, using default", self.describe(key));
                Array::defaults(&variable.value_type, self.population.count(variable.entity))
            }
        }
    }

    fn describe(&self, key: Key) -> String {
        format!("{}@{}", self.system.registry().get(key.0).name, key.1)
    }

    fn cycle_error(&self, key: Key) -> EngineError {
        let start = self.stack.iter().position(|k| *k == key).unwrap_or(0);
        let mut chain: Vec<String> = self.stack[start..].iter().map(|k| self.describe(*k)).collect();
        chain.push(self.describe(key));
        EngineError::CycleDetected { chain }
    }
}

fn check_result(variable: &Variable, values: Array, expected: usize) -> Result<Array> {
    if !values.matches(&variable.value_type) {
        return Err(EngineError::TypeMismatch {
            variable: variable.name.clone(),
            expected: variable.value_type.to_string(),
            found: values.value_type().to_string(),
        });
    }
    if values.len() != expected {
        return Err(EngineError::LengthMismatch {
            variable: variable.name.clone(),
            expected,
            found: values.len(),
        });
    }
    Ok(values)
}

/// What a formula sees: its entity, its period, and accessors for other
/// variables, parameters and tables
pub struct Context<'c, 's> {
    session: &'c mut Session<'s>,
    entity: EntityKind,
    period: Period,
}

impl<'c, 's> Context<'c, 's> {
    pub fn period(&self) -> Period {
        self.period
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    pub fn population(&self) -> &'s Population {
        self.session.population
    }

    /// Instance count of the formula's entity
    pub fn len(&self) -> usize {
        self.session.population.count(self.entity)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw access to any variable at any period
    pub fn compute(&mut self, name: &str, period: Period) -> Result<Arc<Array>> {
        self.session.compute(name, period)
    }

    fn fetch(&mut self, name: &str, period: Period, entity: EntityKind) -> Result<Arc<Array>> {
        let variable = self.session.system.registry().variable(name)?;
        if variable.entity != entity {
            return Err(EngineError::EntityMismatch {
                variable: name.to_string(),
                expected: variable.entity.to_string(),
                found: entity.to_string(),
            });
        }
        self.session.compute(name, period)
    }

    /// The variable must belong to `entity`; otherwise a formula could pair
    /// up vectors of different lengths.
    fn ints_of(&mut self, name: &str, period: Period, entity: EntityKind) -> Result<Vec<i64>> {
        let values = self.fetch(name, period, entity)?;
        values.as_int().map(<[i64]>::to_vec).ok_or_else(|| type_error(name, "int", &values))
    }

    fn bools_of(&mut self, name: &str, period: Period, entity: EntityKind) -> Result<Vec<bool>> {
        let values = self.fetch(name, period, entity)?;
        values.as_bool().map(<[bool]>::to_vec).ok_or_else(|| type_error(name, "bool", &values))
    }

    fn categories_of<T: Category>(&mut self, name: &str, period: Period, entity: EntityKind) -> Result<Vec<T>> {
        let values = self.fetch(name, period, entity)?;
        match values.as_enum() {
            Some(array) => array.decode::<T>(),
            None => Err(type_error(name, T::NAME, &values)),
        }
    }

    /// Integer variable of the same entity at the current period
    pub fn ints(&mut self, name: &str) -> Result<Vec<i64>> {
        self.ints_of(name, self.period, self.entity)
    }

    /// Integer variable of the same entity at another period
    pub fn ints_at(&mut self, name: &str, period: Period) -> Result<Vec<i64>> {
        self.ints_of(name, period, self.entity)
    }

    pub fn bools(&mut self, name: &str) -> Result<Vec<bool>> {
        self.bools_of(name, self.period, self.entity)
    }

    pub fn categories<T: Category>(&mut self, name: &str) -> Result<Vec<T>> {
        self.categories_of(name, self.period, self.entity)
    }

    /// Person-level values seen from a household formula
    pub fn member_ints(&mut self, name: &str) -> Result<Vec<i64>> {
        self.ints_of(name, self.period, EntityKind::Person)
    }

    pub fn member_bools(&mut self, name: &str) -> Result<Vec<bool>> {
        self.bools_of(name, self.period, EntityKind::Person)
    }

    pub fn member_categories<T: Category>(&mut self, name: &str) -> Result<Vec<T>> {
        self.categories_of(name, self.period, EntityKind::Person)
    }

    /// Household value repeated for each member, for person formulas
    pub fn household_ints(&mut self, name: &str) -> Result<Vec<i64>> {
        let values = self.ints_of(name, self.period, EntityKind::Household)?;
        aggregate::broadcast(self.population(), &values)
    }

    pub fn household_bools(&mut self, name: &str) -> Result<Vec<bool>> {
        let values = self.bools_of(name, self.period, EntityKind::Household)?;
        aggregate::broadcast(self.population(), &values)
    }

    pub fn has_role(&self, role: Role) -> Vec<bool> {
        self.population().has_role(role)
    }

    /// Parameter effective at the current period
    pub fn parameter(&self, path: &str) -> Result<f64> {
        self.session.system.parameters().get(path, self.period)
    }

    pub fn table(&self, name: &str) -> Result<Arc<AmountTable>> {
        self.session.system.tables().table(name)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.session.config
    }
}

fn type_error(name: &str, expected: &str, found: &Array) -> EngineError {
    EngineError::TypeMismatch {
        variable: name.to_string(),
        expected: expected.to_string(),
        found: found.value_type().to_string(),
    }
}
