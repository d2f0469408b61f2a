//! Immutable amount tables
//!
//! Rows are household/benefit category ordinals, columns are course-type
//! ordinals. Indexing outside the declared bounds is always an error; the
//! `-1` sentinel produced by unmatched categories never reads a real cell.

use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountTable {
    name: String,
    rows: usize,
    cols: usize,
    /// Row-major cells
    data: Vec<i64>,
}

impl AmountTable {
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<i64>>) -> Result<Self> {
        let name = name.into();
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(EngineError::MalformedTable {
                name,
                message: format!("row {} has {} columns, expected {}", i, row.len(), cols),
            });
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data: rows.into_iter().flatten().collect(),
            name,
        })
    }

    /// Parse CSV: header row and first (label) column are discarded
    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let name = name.into();
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result?;
            let row = record
                .iter()
                .skip(1)
                .map(|cell| {
                    cell.parse::<i64>().map_err(|_| EngineError::MalformedTable {
                        name: name.clone(),
                        message: format!("non-integer cell {:?}", cell),
                    })
                })
                .collect::<Result<Vec<i64>>>()?;
            rows.push(row);
        }
        Self::from_rows(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: i64, col: i64) -> Result<i64> {
        let in_range = row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols;
        if !in_range {
            return Err(EngineError::TableIndexOutOfRange {
                table: self.name.clone(),
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(self.data[row as usize * self.cols + col as usize])
    }
}

/// Tables memoized for the store's lifetime
///
/// A table is parsed on first request and the same `Arc` is handed out on
/// every later request.
#[derive(Debug, Default)]
pub struct TableStore {
    dir: Option<PathBuf>,
    tables: Mutex<HashMap<String, Arc<AmountTable>>>,
}

impl TableStore {
    /// Store that loads `<dir>/<name>.csv` on demand
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Store that only serves inserted tables
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn insert(&self, table: AmountTable) {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.insert(table.name.clone(), Arc::new(table));
    }

    pub fn loaded(&self) -> usize {
        self.tables.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn table(&self, name: &str) -> Result<Arc<AmountTable>> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(table) = tables.get(name) {
            return Ok(Arc::clone(table));
        }

        let dir = self.dir.as_ref().ok_or_else(|| EngineError::UnknownTable {
            name: name.to_string(),
        })?;
        let path = dir.join(format!("{name}.csv"));
        if !path.exists() {
            return Err(EngineError::UnknownTable {
                name: name.to_string(),
            });
        }
        let table = Arc::new(AmountTable::from_csv_reader(name, std::fs::File::open(&path)?)?);
        log::info!(
            "Loaded table {} ({}x{}) from {}",
            name,
            table.rows(),
            table.cols(),
            path.display()
        );
        tables.insert(name.to_string(), Arc::clone(&table));
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "category,full_time,part_time,correspondence,advanced\n\
                       assistance,32300,32300,32300,52100\n\
                       exempt_first,117100,117100,50500,117100\n";

    #[test]
    fn test_parse_discards_header_and_label() {
        let table = AmountTable::from_csv_reader("public", CSV.as_bytes()).unwrap();
        assert_eq!((table.rows(), table.cols()), (2, 4));
        assert_eq!(table.get(0, 3).unwrap(), 52100);
        assert_eq!(table.get(1, 2).unwrap(), 50500);
    }

    #[test]
    fn test_sentinel_and_overflow_rejected() {
        let table = AmountTable::from_csv_reader("public", CSV.as_bytes()).unwrap();
        assert!(matches!(
            table.get(0, -1),
            Err(EngineError::TableIndexOutOfRange { col: -1, .. })
        ));
        assert!(table.get(-1, 0).is_err());
        assert!(table.get(2, 0).is_err());
        assert!(table.get(0, 4).is_err());
    }

    #[test]
    fn test_ragged_and_non_integer_rejected() {
        assert!(AmountTable::from_rows("t", vec![vec![1, 2], vec![3]]).is_err());
        let bad = "h,a\nx,12.5\n";
        assert!(matches!(
            AmountTable::from_csv_reader("t", bad.as_bytes()),
            Err(EngineError::MalformedTable { .. })
        ));
    }

    #[test]
    fn test_store_returns_same_instance() {
        let store = TableStore::in_memory();
        store.insert(AmountTable::from_rows("t", vec![vec![1, 2]]).unwrap());
        let first = store.table("t").unwrap();
        let second = store.table("t").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(matches!(store.table("missing"), Err(EngineError::UnknownTable { .. })));
    }

    #[test]
    fn test_disk_table_parsed_once() {
        let store = crate::parameters::DataPaths::default().table_store();
        assert_eq!(store.loaded(), 0);
        let first = store.table("high_school_scholarship/public").unwrap();
        let second = store.table("high_school_scholarship/public").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.loaded(), 1);
        assert_eq!(first.get(1, 0).unwrap(), 117_100);
        assert!(matches!(store.table("high_school_scholarship/none"), Err(EngineError::UnknownTable { .. })));
        assert_eq!(store.loaded(), 1);
    }
}
