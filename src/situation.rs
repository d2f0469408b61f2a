//! Situation files: households, members and their input values
//!
//! ```json
//! {
//!   "persons": {
//!     "parent": { "birth_year": { "ETERNITY": 1979 } },
//!     "child":  { "birth_year": { "ETERNITY": 2008 }, "course_type": { "2024-06-01": "full_time" } }
//!   },
//!   "households": {
//!     "h1": { "parents": ["parent"], "children": ["child"], "resident_tax_exempt": { "2024-06-01": true } }
//!   }
//! }
//! ```
//!
//! Member order within a household follows the order of `persons`.

use crate::engine::{Array, Inputs, Registry, ValueType, Variable};
use crate::enums::EnumArray;
use crate::error::{EngineError, Result};
use crate::period::Period;
use crate::population::{EntityKind, Population, Role};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawSituation {
    #[serde(default)]
    persons: Map<String, Value>,
    #[serde(default)]
    households: Map<String, Value>,
}

/// A population together with its input dataset
#[derive(Debug, Clone)]
pub struct Situation {
    pub population: Population,
    pub inputs: Inputs,
}

type Collected = HashMap<(String, Period), Vec<Option<Value>>>;

impl Situation {
    pub fn new(population: Population, inputs: Inputs) -> Self {
        Self { population, inputs }
    }

    /// Load a situation file, typing inputs with `registry`
    pub fn from_path<P: AsRef<Path>>(registry: &Registry, path: P) -> Result<Self> {
        let situation = Self::from_reader(registry, File::open(path.as_ref())?)?;
        log::info!(
            "Loaded situation {}: {} households, {} persons",
            path.as_ref().display(),
            situation.population.count(EntityKind::Household),
            situation.population.count(EntityKind::Person)
        );
        Ok(situation)
    }

    pub fn from_reader<R: Read>(registry: &Registry, reader: R) -> Result<Self> {
        let raw: RawSituation = serde_json::from_reader(reader)?;

        let mut builder = Population::builder();
        for id in raw.persons.keys() {
            builder = builder.person(id.as_str());
        }
        for (household_id, body) in &raw.households {
            builder = builder.household(household_id.as_str());
            let body = as_object(body, household_id)?;
            for role in Role::ALL {
                let Some(list) = body.get(role.plural_key()) else {
                    continue;
                };
                let members = list.as_array().ok_or_else(|| {
                    EngineError::invalid_input(format!("{household_id}.{} must be a list", role.plural_key()))
                })?;
                for member in members {
                    let person = member.as_str().ok_or_else(|| {
                        EngineError::invalid_input(format!("member ids in {household_id} must be strings"))
                    })?;
                    builder = builder.member(household_id.as_str(), person, role);
                }
            }
        }
        let population = builder.build()?;

        let mut collected = Collected::new();
        for (id, body) in &raw.persons {
            collect(registry, &population, EntityKind::Person, id, as_object(body, id)?, &mut collected)?;
        }
        for (id, body) in &raw.households {
            collect(registry, &population, EntityKind::Household, id, as_object(body, id)?, &mut collected)?;
        }

        let mut inputs = Inputs::new();
        for ((name, period), values) in collected {
            let variable = registry.variable(&name)?;
            inputs.set(name.clone(), period, to_array(variable, values)?);
        }

        Ok(Self { population, inputs })
    }
}

fn as_object<'v>(value: &'v Value, id: &str) -> Result<&'v Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| EngineError::invalid_input(format!("{id} must be an object")))
}

fn collect(
    registry: &Registry,
    population: &Population,
    kind: EntityKind,
    id: &str,
    body: &Map<String, Value>,
    collected: &mut Collected,
) -> Result<()> {
    let index = population
        .index_of(kind, id)
        .ok_or_else(|| EngineError::invalid_input(format!("unknown {kind} {id}")))?;
    let count = population.count(kind);

    for (name, periods) in body {
        if kind == EntityKind::Household && Role::ALL.iter().any(|r| r.plural_key() == name.as_str()) {
            continue;
        }
        let variable = registry.variable(name)?;
        if variable.entity != kind {
            return Err(EngineError::EntityMismatch {
                variable: name.clone(),
                expected: variable.entity.to_string(),
                found: kind.to_string(),
            });
        }
        let periods = as_object(periods, name)?;
        for (key, value) in periods {
            let period = key.parse::<Period>()?.normalize(variable.definition_period);
            let slot = collected
                .entry((name.clone(), period))
                .or_insert_with(|| vec![None; count]);
            if slot[index].is_some() {
                return Err(EngineError::invalid_input(format!(
                    "{id}.{name} given more than once for {period}"
                )));
            }
            slot[index] = Some(value.clone());
        }
    }
    Ok(())
}

fn to_array(variable: &Variable, values: Vec<Option<Value>>) -> Result<Array> {
    let bad = |v: &Value| {
        EngineError::invalid_input(format!(
            "{} expects {}, got {}",
            variable.name, variable.value_type, v
        ))
    };

    match &variable.value_type {
        ValueType::Int => values
            .iter()
            .map(|v| match v {
                None => Ok(0),
                Some(v) => v.as_i64().ok_or_else(|| bad(v)),
            })
            .collect::<Result<Vec<_>>>()
            .map(Array::Int),
        ValueType::Bool => values
            .iter()
            .map(|v| match v {
                None => Ok(false),
                Some(v) => v.as_bool().ok_or_else(|| bad(v)),
            })
            .collect::<Result<Vec<_>>>()
            .map(Array::Bool),
        ValueType::Enum(spec) => {
            let default = spec.variants[spec.default];
            let names = values
                .iter()
                .map(|v| match v {
                    None => Ok(default),
                    Some(v) => v.as_str().ok_or_else(|| bad(v)),
                })
                .collect::<Result<Vec<_>>>()?;
            EnumArray::from_names(spec.clone(), &names).map(Array::Enum)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benefits::scholarship;

    const SITUATION: &str = r#"{
        "persons": {
            "mother": { "age": { "2024-06-01": 44 } },
            "son": {
                "age": { "2024-06-01": 17 },
                "grade": { "2024-06-01": 11 },
                "course_type": { "2024-06-01": "full_time" },
                "school_operator": { "2024-06-01": "public" }
            },
            "daughter": { "age": { "2024-06-01": 15 } }
        },
        "households": {
            "home": {
                "parents": ["mother"],
                "children": ["daughter", "son"],
                "resident_tax_exempt": { "2024-06-01": true }
            }
        }
    }"#;

    #[test]
    fn test_load_situation() {
        let registry = scholarship::registry().unwrap();
        let situation = Situation::from_reader(&registry, SITUATION.as_bytes()).unwrap();
        let pop = &situation.population;

        assert_eq!(pop.ids(EntityKind::Person), vec!["mother", "son", "daughter"]);
        assert_eq!(pop.members(0), &[0, 1, 2]);
        assert_eq!(pop.role(1), Role::Child);

        let period = Period::day(2024, 6, 1).unwrap();
        assert_eq!(
            situation.inputs.get("age", period),
            Some(&Array::Int(vec![44, 17, 15]))
        );
        let courses = situation.inputs.get("course_type", period).unwrap();
        assert_eq!(courses.as_enum().unwrap().names(), vec!["none", "full_time", "none"]);
        assert_eq!(
            situation.inputs.get("resident_tax_exempt", period),
            Some(&Array::Bool(vec![true]))
        );
    }

    #[test]
    fn test_eternal_inputs_merge_across_period_keys() {
        let registry = scholarship::registry().unwrap();
        let json = r#"{
            "persons": {
                "a": { "birth_year": { "ETERNITY": 1980 } },
                "b": { "birth_year": { "2024-06-01": 2008 } }
            },
            "households": { "h": { "parents": ["a"], "children": ["b"] } }
        }"#;
        let situation = Situation::from_reader(&registry, json.as_bytes()).unwrap();
        assert_eq!(situation.inputs.len(), 1);
        assert_eq!(
            situation.inputs.get("birth_year", Period::Eternity),
            Some(&Array::Int(vec![1980, 2008]))
        );

        let system = crate::engine::RuleSystem::from_data(registry, &crate::parameters::DataPaths::default()).unwrap();
        let mut session = system.session(&situation.population, situation.inputs).unwrap();
        let years = session.compute("birth_year", Period::day(2024, 6, 1).unwrap()).unwrap();
        assert_eq!(*years, Array::Int(vec![1980, 2008]));
    }

    #[test]
    fn test_same_person_eternal_value_twice_rejected() {
        let registry = scholarship::registry().unwrap();
        let json = r#"{
            "persons": { "a": { "birth_year": { "ETERNITY": 1980, "2024-06-01": 1981 } } },
            "households": { "h": { "parents": ["a"] } }
        }"#;
        assert!(matches!(
            Situation::from_reader(&registry, json.as_bytes()),
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_person_without_household_is_rejected() {
        let registry = scholarship::registry().unwrap();
        let json = r#"{ "persons": { "lonely": {} }, "households": { "h": { "parents": [] } } }"#;
        assert!(matches!(
            Situation::from_reader(&registry, json.as_bytes()),
            Err(EngineError::RoleMissing { .. })
        ));
    }

    #[test]
    fn test_bad_values_rejected() {
        let registry = scholarship::registry().unwrap();
        let wrong_entity = r#"{ "persons": { "p": { "dependants": { "2024-06-01": 2 } } },
                                "households": { "h": { "parents": ["p"] } } }"#;
        assert!(matches!(
            Situation::from_reader(&registry, wrong_entity.as_bytes()),
            Err(EngineError::EntityMismatch { .. })
        ));

        let bad_variant = r#"{ "persons": { "p": { "course_type": { "2024-06-01": "evening" } } },
                               "households": { "h": { "children": ["p"] } } }"#;
        assert!(matches!(
            Situation::from_reader(&registry, bad_variant.as_bytes()),
            Err(EngineError::UnknownEnumVariant { .. })
        ));

        let unknown = r#"{ "persons": { "p": { "salary": { "2024-06-01": 1 } } },
                           "households": { "h": { "parents": ["p"] } } }"#;
        assert!(matches!(
            Situation::from_reader(&registry, unknown.as_bytes()),
            Err(EngineError::UnresolvedVariable { .. })
        ));
    }
}
