//! Closed categorical values
//!
//! Each category is a plain Rust enum implementing [`Category`]. Inside an
//! [`EnumArray`] values are stored as positions in the declared variant order,
//! but formulas only ever compare decoded variants. The only place a variant
//! becomes a number again is [`OrdinalMap`], at the table-lookup boundary.

use crate::error::{EngineError, Result};
use crate::select::{select, Choice};
use std::sync::Arc;

/// Sentinel ordinal for categories without a table column/row
pub const NO_ORDINAL: i64 = -1;

/// A closed, ordered set of symbolic variants with a default
pub trait Category: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Enum name used in error messages and type checks
    const NAME: &'static str;
    /// All variants in declared order
    const VARIANTS: &'static [Self];

    /// Symbolic name of a variant, as written in situation files
    fn name(&self) -> &'static str;

    fn default_variant() -> Self {
        Self::VARIANTS[0]
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::VARIANTS.iter().copied().find(|v| v.name() == name)
    }
}

/// Runtime description of a category, stored in variable declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumSpec {
    pub name: &'static str,
    pub variants: Vec<&'static str>,
    pub default: usize,
}

impl EnumSpec {
    pub fn of<T: Category>() -> Arc<Self> {
        let default = T::default_variant();
        Arc::new(Self {
            name: T::NAME,
            variants: T::VARIANTS.iter().map(|v| v.name()).collect(),
            default: T::VARIANTS.iter().position(|v| *v == default).unwrap_or(0),
        })
    }

    pub fn index_of(&self, variant: &str) -> Option<usize> {
        self.variants.iter().position(|v| *v == variant)
    }
}

/// One category value per entity instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumArray {
    spec: Arc<EnumSpec>,
    indices: Vec<usize>,
}

impl EnumArray {
    pub fn encode<T: Category>(values: &[T]) -> Self {
        let indices = values
            .iter()
            .map(|v| T::VARIANTS.iter().position(|x| x == v).unwrap_or(0))
            .collect();
        Self {
            spec: EnumSpec::of::<T>(),
            indices,
        }
    }

    /// Every instance set to the declared default
    pub fn defaults(spec: Arc<EnumSpec>, len: usize) -> Self {
        let indices = vec![spec.default; len];
        Self { spec, indices }
    }

    pub fn from_names(spec: Arc<EnumSpec>, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|n| {
                spec.index_of(n).ok_or_else(|| EngineError::UnknownEnumVariant {
                    name: spec.name.to_string(),
                    variant: n.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { spec, indices })
    }

    pub fn spec(&self) -> &Arc<EnumSpec> {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.indices.iter().map(|&i| self.spec.variants[i]).collect()
    }

    pub fn decode<T: Category>(&self) -> Result<Vec<T>> {
        if self.spec.name != T::NAME {
            return Err(EngineError::TypeMismatch {
                variable: T::NAME.to_string(),
                expected: T::NAME.to_string(),
                found: self.spec.name.to_string(),
            });
        }
        Ok(self.indices.iter().map(|&i| T::VARIANTS[i]).collect())
    }
}

/// Explicit variant -> ordinal mapping used to index amount tables
///
/// Variants not listed map to [`NO_ORDINAL`], which every table rejects.
#[derive(Debug, Clone)]
pub struct OrdinalMap<T: Category> {
    entries: Vec<(T, i64)>,
}

impl<T: Category> OrdinalMap<T> {
    pub fn new(entries: &[(T, i64)]) -> Self {
        Self {
            entries: entries.to_vec(),
        }
    }

    pub fn ordinal(&self, value: T) -> i64 {
        self.entries
            .iter()
            .find(|(v, _)| *v == value)
            .map(|(_, o)| *o)
            .unwrap_or(NO_ORDINAL)
    }

    /// Element-wise ordinals, dispatched first-match in declared order
    pub fn ordinals(&self, values: &[T]) -> Result<Vec<i64>> {
        let conditions: Vec<Vec<bool>> = self
            .entries
            .iter()
            .map(|(variant, _)| values.iter().map(|v| v == variant).collect())
            .collect();
        let branches = conditions
            .iter()
            .zip(&self.entries)
            .map(|(cond, (_, ordinal))| (cond.as_slice(), Choice::Const(*ordinal)))
            .collect();
        select(values.len(), branches, NO_ORDINAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Course {
        None,
        FullTime,
        PartTime,
    }

    impl Category for Course {
        const NAME: &'static str = "Course";
        const VARIANTS: &'static [Self] = &[Course::None, Course::FullTime, Course::PartTime];

        fn name(&self) -> &'static str {
            match self {
                Course::None => "none",
                Course::FullTime => "full_time",
                Course::PartTime => "part_time",
            }
        }
    }

    #[test]
    fn test_encode_decode() {
        let values = vec![Course::PartTime, Course::None, Course::FullTime];
        let array = EnumArray::encode(&values);
        assert_eq!(array.names(), vec!["part_time", "none", "full_time"]);
        assert_eq!(array.decode::<Course>().unwrap(), values);
    }

    #[test]
    fn test_from_names_rejects_unknown() {
        let spec = EnumSpec::of::<Course>();
        assert!(EnumArray::from_names(spec.clone(), &["full_time"]).is_ok());
        assert!(matches!(
            EnumArray::from_names(spec, &["evening"]),
            Err(EngineError::UnknownEnumVariant { .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let array = EnumArray::defaults(EnumSpec::of::<Course>(), 2);
        assert_eq!(array.decode::<Course>().unwrap(), vec![Course::None, Course::None]);
    }

    #[test]
    fn test_unmapped_variant_gets_sentinel() {
        let map = OrdinalMap::new(&[(Course::FullTime, 0), (Course::PartTime, 1)]);
        let ordinals = map
            .ordinals(&[Course::PartTime, Course::None, Course::FullTime])
            .unwrap();
        assert_eq!(ordinals, vec![1, NO_ORDINAL, 0]);
        assert_eq!(map.ordinal(Course::None), NO_ORDINAL);
    }
}
