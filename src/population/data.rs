//! Population data structures
//!
//! A population is a fixed set of persons grouped into households. Every
//! person holds exactly one role in exactly one household; this is checked
//! once in `PopulationBuilder::build`, never during formula evaluation.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Kind of subject a variable is defined over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Individual household member
    Person,
    /// Group owning a set of members
    Household,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Person => write!(f, "person"),
            EntityKind::Household => write!(f, "household"),
        }
    }
}

/// Position of a member within its household
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Parent,
    Child,
    Other,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Parent, Role::Child, Role::Other];

    /// Plural key used for the role's member list in situation files
    pub fn plural_key(&self) -> &'static str {
        match self {
            Role::Parent => "parents",
            Role::Child => "children",
            Role::Other => "others",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    /// Index of the owning household
    pub household: usize,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Household {
    pub id: String,
    /// Person indices in insertion order
    pub members: Vec<usize>,
}

/// Immutable snapshot of persons and households for one computation
#[derive(Debug, Clone, Default)]
pub struct Population {
    persons: Vec<Person>,
    households: Vec<Household>,
}

impl Population {
    pub fn builder() -> PopulationBuilder {
        PopulationBuilder::default()
    }

    /// Number of instances of an entity kind
    pub fn count(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Person => self.persons.len(),
            EntityKind::Household => self.households.len(),
        }
    }

    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    pub fn households(&self) -> &[Household] {
        &self.households
    }

    /// Members of a household in stable order
    pub fn members(&self, household: usize) -> &[usize] {
        &self.households[household].members
    }

    pub fn role(&self, person: usize) -> Role {
        self.persons[person].role
    }

    pub fn household_of(&self, person: usize) -> usize {
        self.persons[person].household
    }

    pub fn is_role(&self, person: usize, role: Role) -> bool {
        self.persons[person].role == role
    }

    /// Per-person mask of members holding `role`
    pub fn has_role(&self, role: Role) -> Vec<bool> {
        self.persons.iter().map(|p| p.role == role).collect()
    }

    pub fn ids(&self, kind: EntityKind) -> Vec<&str> {
        match kind {
            EntityKind::Person => self.persons.iter().map(|p| p.id.as_str()).collect(),
            EntityKind::Household => self.households.iter().map(|h| h.id.as_str()).collect(),
        }
    }

    pub fn index_of(&self, kind: EntityKind, id: &str) -> Option<usize> {
        match kind {
            EntityKind::Person => self.persons.iter().position(|p| p.id == id),
            EntityKind::Household => self.households.iter().position(|h| h.id == id),
        }
    }
}

/// Collects households and members, then validates them into a `Population`
#[derive(Debug, Clone, Default)]
pub struct PopulationBuilder {
    households: Vec<String>,
    /// (person id, household id, role) in declaration order
    persons: Vec<(String, Option<String>, Option<Role>)>,
}

impl PopulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn household(mut self, id: impl Into<String>) -> Self {
        self.households.push(id.into());
        self
    }

    /// Add a person to a household with a role
    pub fn member(mut self, household: impl Into<String>, person: impl Into<String>, role: Role) -> Self {
        let person = person.into();
        let household = household.into();
        match self.persons.iter_mut().find(|(id, hh, _)| *id == person && hh.is_none()) {
            Some(entry) => {
                entry.1 = Some(household);
                entry.2 = Some(role);
            }
            None => self.persons.push((person, Some(household), Some(role))),
        }
        self
    }

    /// Declare a person; it must later be placed with `member`
    pub fn person(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.persons.iter().any(|(p, _, _)| *p == id) {
            self.persons.push((id, None, None));
        }
        self
    }

    pub fn build(self) -> Result<Population> {
        let mut household_index: HashMap<&str, usize> = HashMap::new();
        let mut households = Vec::with_capacity(self.households.len());
        for id in &self.households {
            if household_index.insert(id.as_str(), households.len()).is_some() {
                return Err(EngineError::DuplicateId { id: id.clone() });
            }
            households.push(Household {
                id: id.clone(),
                members: Vec::new(),
            });
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut persons = Vec::with_capacity(self.persons.len());
        for (id, household, role) in &self.persons {
            if !seen.insert(id.as_str()) {
                return Err(EngineError::DuplicateId { id: id.clone() });
            }
            let (household, role) = match (household, role) {
                (Some(h), Some(r)) => (h, *r),
                _ => return Err(EngineError::RoleMissing { person: id.clone() }),
            };
            let index = *household_index.get(household.as_str()).ok_or_else(|| {
                EngineError::UnknownHousehold {
                    person: id.clone(),
                    household: household.clone(),
                }
            })?;
            households[index].members.push(persons.len());
            persons.push(Person {
                id: id.clone(),
                household: index,
                role,
            });
        }

        log::debug!(
            "Built population: {} households, {} persons",
            households.len(),
            persons.len()
        );

        Ok(Population { persons, households })
    }
}
