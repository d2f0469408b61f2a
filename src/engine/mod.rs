//! Rule evaluation engine
//!
//! The engine resolves variables lazily: asking a [`Session`] for a
//! `(variable, period)` pair evaluates exactly the formulas it depends on,
//! each at most once per session.
//!
//! # Architecture
//!
//! 1. **Registry**: static variable declarations, resolved to ids at startup
//! 2. **RuleSystem**: registry + parameters + tables, immutable and shareable
//! 3. **Session**: private cache and evaluation stack for one population
//!
//! # Example
//!
//! ```rust,ignore
//! use benefit_engine::engine::{Array, Inputs, Registry, RuleSystem, ValueType, Variable};
//!
//! let mut registry = Registry::new();
//! registry.register(Variable::input("income", EntityKind::Person, ValueType::Int))?;
//! let system = RuleSystem::new(registry, parameters, tables);
//!
//! let mut session = system.session(&population, inputs)?;
//! let income = session.compute("income", period)?;
//! ```

mod array;
mod inputs;
mod registry;
mod session;

pub use array::{Array, ValueType};
pub use inputs::Inputs;
pub use registry::{Formula, Registry, Variable, VariableId};
pub use session::{Context, Session, SessionStats};

use crate::error::Result;
use crate::parameters::{DataPaths, ParameterStore, TableStore};
use crate::population::Population;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum depth of the evaluation stack before a computation is aborted
    pub max_depth: usize,

    /// Log every formula evaluation at info level instead of debug
    pub log_evaluations: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            log_evaluations: false,
        }
    }
}

impl EngineConfig {
    /// Config that logs each evaluation, for tracing a single situation
    pub fn traced() -> Self {
        Self {
            log_evaluations: true,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Variables, parameters and tables for one rule set
///
/// Immutable once built; share it by reference across sessions and threads.
#[derive(Debug)]
pub struct RuleSystem {
    registry: Registry,
    parameters: ParameterStore,
    tables: TableStore,
    config: EngineConfig,
}

impl RuleSystem {
    pub fn new(registry: Registry, parameters: ParameterStore, tables: TableStore) -> Self {
        Self {
            registry,
            parameters,
            tables,
            config: EngineConfig::default(),
        }
    }

    /// Load parameters and attach the table directory under `paths`
    pub fn from_data(registry: Registry, paths: &DataPaths) -> Result<Self> {
        Ok(Self::new(registry, paths.load_parameters()?, paths.table_store()))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    pub fn tables(&self) -> &TableStore {
        &self.tables
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Start a fresh session with an empty cache
    pub fn session<'s>(&'s self, population: &'s Population, inputs: Inputs) -> Result<Session<'s>> {
        Session::new(self, population, inputs, self.config.clone())
    }
}
