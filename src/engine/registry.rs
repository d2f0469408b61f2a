//! Variable declarations
//!
//! Every variable is registered once at startup and resolved to a
//! [`VariableId`]. Sessions cache by id, never by name.

use super::array::{Array, ValueType};
use super::session::Context;
use crate::enums::{Category, EnumSpec};
use crate::error::{EngineError, Result};
use crate::period::PeriodUnit;
use crate::population::EntityKind;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Pure function from the context (population, period, parameters) to one
/// value per instance of the variable's entity
pub type Formula = Arc<dyn Fn(&mut Context<'_, '_>) -> Result<Array> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(usize);

#[derive(Clone)]
pub struct Variable {
    pub name: String,
    pub entity: EntityKind,
    pub value_type: ValueType,
    pub definition_period: PeriodUnit,
    pub label: String,
    formula: Option<Formula>,
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("entity", &self.entity)
            .field("value_type", &self.value_type)
            .field("definition_period", &self.definition_period)
            .field("label", &self.label)
            .field("has_formula", &self.formula.is_some())
            .finish()
    }
}

impl Variable {
    /// Leaf variable supplied by the input dataset
    pub fn input(name: impl Into<String>, entity: EntityKind, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            entity,
            value_type,
            definition_period: PeriodUnit::Day,
            label: String::new(),
            formula: None,
        }
    }

    /// Leaf category variable defaulting to `T::default_variant()`
    pub fn category_input<T: Category>(name: impl Into<String>, entity: EntityKind) -> Self {
        Self::input(name, entity, ValueType::Enum(EnumSpec::of::<T>()))
    }

    pub fn computed<F>(name: impl Into<String>, entity: EntityKind, value_type: ValueType, formula: F) -> Self
    where
        F: Fn(&mut Context<'_, '_>) -> Result<Array> + Send + Sync + 'static,
    {
        let formula: Formula = Arc::new(formula);
        Self {
            formula: Some(formula),
            ..Self::input(name, entity, value_type)
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// One value for all periods
    pub fn eternal(mut self) -> Self {
        self.definition_period = PeriodUnit::Eternity;
        self
    }

    pub fn formula(&self) -> Option<&Formula> {
        self.formula.as_ref()
    }

    pub fn is_input(&self) -> bool {
        self.formula.is_none()
    }
}

/// All declared variables
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variables: Vec<Variable>,
    index: HashMap<String, VariableId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, variable: Variable) -> Result<VariableId> {
        if self.index.contains_key(&variable.name) {
            return Err(EngineError::DuplicateVariable {
                name: variable.name.clone(),
            });
        }
        let id = VariableId(self.variables.len());
        self.index.insert(variable.name.clone(), id);
        self.variables.push(variable);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Result<VariableId> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::unresolved(name))
    }

    pub fn get(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.id(name).map(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }
}
