//! Error types for rule evaluation

use thiserror::Error;

/// Errors raised while building populations, loading data or computing variables.
///
/// None of these are recovered internally: a missing rule, table entry or
/// parameter value aborts the whole computation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A formula or caller referenced a variable that is not registered.
    #[error("Unresolved variable: {name}")]
    UnresolvedVariable { name: String },

    /// The same variable name was registered twice.
    #[error("Variable already registered: {name}")]
    DuplicateVariable { name: String },

    /// Same-period dependency loop.
    #[error("Cycle detected: {}", chain.join(" -> "))]
    CycleDetected {
        /// Keys from the first occurrence on the evaluation stack to the repeated key
        chain: Vec<String>,
    },

    /// Evaluation stack grew beyond the configured depth.
    #[error("Maximum evaluation depth {max_depth} exceeded while computing {key}")]
    MaxDepthExceeded { key: String, max_depth: usize },

    /// Row or column ordinal outside the table bounds.
    #[error("Index ({row}, {col}) out of range for table {table} ({rows}x{cols})")]
    TableIndexOutOfRange {
        table: String,
        row: i64,
        col: i64,
        rows: usize,
        cols: usize,
    },

    #[error("Unknown table: {name}")]
    UnknownTable { name: String },

    #[error("Malformed table {name}: {message}")]
    MalformedTable { name: String, message: String },

    /// No value is in effect for the requested period and no default is declared.
    #[error("No value for parameter {path} at {period}")]
    NoParameterValue { path: String, period: String },

    #[error("Unknown parameter: {path}")]
    UnknownParameter { path: String },

    #[error("Invalid parameter {path}: {message}")]
    InvalidParameter { path: String, message: String },

    /// A person was declared without a household role.
    #[error("Person {person} has no role in any household")]
    RoleMissing { person: String },

    #[error("Person {person} references unknown household {household}")]
    UnknownHousehold { person: String, household: String },

    #[error("Duplicate id: {id}")]
    DuplicateId { id: String },

    #[error("Variable {variable} is defined for {expected}, requested from {found}")]
    EntityMismatch {
        variable: String,
        expected: String,
        found: String,
    },

    #[error("Variable {variable} has type {expected}, got {found}")]
    TypeMismatch {
        variable: String,
        expected: String,
        found: String,
    },

    #[error("Variable {variable} expected {expected} values, got {found}")]
    LengthMismatch {
        variable: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown variant {variant} for enum {name}")]
    UnknownEnumVariant { name: String, variant: String },

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedVariable { name: name.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
