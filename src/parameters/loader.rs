//! File-based loaders for parameters and tables
//!
//! Loads rule data from data/: `parameters.json` and `tables/*.csv`

use super::{ParameterNode, ParameterStore, TableStore};
use crate::error::{EngineError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Default path to the rule data directory
pub const DEFAULT_DATA_PATH: &str = "data";

/// Locations of the rule data files
#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_PATH)
    }
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn parameters_file(&self) -> PathBuf {
        self.root.join("parameters.json")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join("tables")
    }

    pub fn load_parameters(&self) -> Result<ParameterStore> {
        load_parameters(&self.parameters_file())
    }

    pub fn table_store(&self) -> TableStore {
        TableStore::new(self.tables_dir())
    }
}

/// One parameter as written in parameters.json
#[derive(Debug, Deserialize)]
struct RawParameter {
    /// Start date -> value, `null` ends the previous value
    values: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    default: Option<f64>,
}

/// Load parameters from a JSON file
pub fn load_parameters(path: &Path) -> Result<ParameterStore> {
    let store = load_parameters_from_reader(File::open(path)?)?;
    log::info!("Loaded {} parameters from {}", store.len(), path.display());
    Ok(store)
}

/// Load parameters from any reader
pub fn load_parameters_from_reader<R: Read>(reader: R) -> Result<ParameterStore> {
    let raw: BTreeMap<String, RawParameter> = serde_json::from_reader(reader)?;
    let mut store = ParameterStore::new();

    for (path, parameter) in raw {
        let mut node = ParameterNode::new();
        for (start, value) in parameter.values {
            let date = NaiveDate::parse_from_str(&start, "%Y-%m-%d").map_err(|_| {
                EngineError::InvalidParameter {
                    path: path.clone(),
                    message: format!("invalid start date {:?}", start),
                }
            })?;
            node = match value {
                Some(v) => node.with_value(date, v),
                None => node.ending(date),
            };
        }
        if let Some(default) = parameter.default {
            node = node.with_default(default);
        }
        store.insert(path, node)?;
    }

    Ok(store)
}
