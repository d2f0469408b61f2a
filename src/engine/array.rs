//! Typed value vectors

use crate::enums::{EnumArray, EnumSpec};
use std::fmt;
use std::sync::Arc;

/// Declared type of a variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Bool,
    Enum(Arc<EnumSpec>),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Int => write!(f, "int"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::Enum(spec) => write!(f, "enum {}", spec.name),
        }
    }
}

/// One value per entity instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Array {
    Int(Vec<i64>),
    Bool(Vec<bool>),
    Enum(EnumArray),
}

impl Array {
    /// Default value of `value_type` for `len` instances
    pub fn defaults(value_type: &ValueType, len: usize) -> Self {
        match value_type {
            ValueType::Int => Array::Int(vec![0; len]),
            ValueType::Bool => Array::Bool(vec![false; len]),
            ValueType::Enum(spec) => Array::Enum(EnumArray::defaults(Arc::clone(spec), len)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Array::Int(v) => v.len(),
            Array::Bool(v) => v.len(),
            Array::Enum(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Array::Int(_) => ValueType::Int,
            Array::Bool(_) => ValueType::Bool,
            Array::Enum(v) => ValueType::Enum(Arc::clone(v.spec())),
        }
    }

    pub fn matches(&self, value_type: &ValueType) -> bool {
        match (self, value_type) {
            (Array::Int(_), ValueType::Int) | (Array::Bool(_), ValueType::Bool) => true,
            (Array::Enum(v), ValueType::Enum(spec)) => v.spec().name == spec.name,
            _ => false,
        }
    }

    pub fn as_int(&self) -> Option<&[i64]> {
        match self {
            Array::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            Array::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumArray> {
        match self {
            Array::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// JSON values, enums written by variant name
    pub fn to_json(&self) -> Vec<serde_json::Value> {
        match self {
            Array::Int(v) => v.iter().map(|x| serde_json::Value::from(*x)).collect(),
            Array::Bool(v) => v.iter().map(|x| serde_json::Value::from(*x)).collect(),
            Array::Enum(v) => v.names().into_iter().map(serde_json::Value::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_type_checks() {
        let ints = Array::defaults(&ValueType::Int, 3);
        assert_eq!(ints, Array::Int(vec![0, 0, 0]));
        assert!(ints.matches(&ValueType::Int));
        assert!(!ints.matches(&ValueType::Bool));
        assert_eq!(Array::defaults(&ValueType::Bool, 1).as_bool(), Some(&[false][..]));
    }

    #[test]
    fn test_to_json() {
        let values = Array::Bool(vec![true, false]).to_json();
        assert_eq!(values, vec![serde_json::json!(true), serde_json::json!(false)]);
    }
}
