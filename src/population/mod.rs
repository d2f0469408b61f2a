//! Entities, roles and household membership

mod data;

pub use data::{EntityKind, Household, Person, Population, PopulationBuilder, Role};
