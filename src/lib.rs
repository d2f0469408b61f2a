//! Benefit Engine - rule evaluation for household benefit calculations
//!
//! This library provides:
//! - Household/member population model with roles
//! - Lazy, memoized variable resolution with cycle detection
//! - Cross-entity aggregation (sum, any, max, min, rank)
//! - Closed categories and first-match piecewise selection
//! - Period-scoped parameters and CSV amount tables
//! - A high-school scholarship rule set built on the above

pub mod error;
pub mod period;
pub mod population;
pub mod parameters;
pub mod enums;
pub mod select;
pub mod aggregate;
pub mod engine;
pub mod benefits;
pub mod situation;
pub mod runner;

// Re-export commonly used types
pub use error::{EngineError, Result};
pub use period::{Period, PeriodUnit};
pub use population::{EntityKind, Population, Role};
pub use parameters::{AmountTable, DataPaths, ParameterStore, TableStore};
pub use engine::{Array, EngineConfig, Inputs, Registry, RuleSystem, Session, ValueType, Variable};
pub use situation::Situation;
pub use runner::{BatchRunner, Evaluation};
