//! Cross-entity reductions between household and member level
//!
//! Member-level inputs are indexed by person, outputs by household (or by
//! person for [`broadcast`] and [`rank`]). All functions are pure.

use crate::error::{EngineError, Result};
use crate::population::{EntityKind, Population};

fn check_len<T>(pop: &Population, kind: EntityKind, values: &[T], what: &str) -> Result<()> {
    let expected = pop.count(kind);
    if values.len() != expected {
        return Err(EngineError::LengthMismatch {
            variable: what.to_string(),
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

fn included(mask: Option<&[bool]>, person: usize) -> bool {
    mask.map_or(true, |m| m[person])
}

/// Sum of member values per household, optionally restricted to `mask`
pub fn sum(pop: &Population, values: &[i64], mask: Option<&[bool]>) -> Result<Vec<i64>> {
    check_len(pop, EntityKind::Person, values, "sum values")?;
    if let Some(m) = mask {
        check_len(pop, EntityKind::Person, m, "sum mask")?;
    }
    Ok((0..pop.count(EntityKind::Household))
        .map(|h| {
            pop.members(h)
                .iter()
                .filter(|&&p| included(mask, p))
                .map(|&p| values[p])
                .sum()
        })
        .collect())
}

/// True where at least one member is true
pub fn any(pop: &Population, flags: &[bool]) -> Result<Vec<bool>> {
    check_len(pop, EntityKind::Person, flags, "any flags")?;
    Ok((0..pop.count(EntityKind::Household))
        .map(|h| pop.members(h).iter().any(|&p| flags[p]))
        .collect())
}

/// Number of members matching `mask`
pub fn count(pop: &Population, mask: &[bool]) -> Result<Vec<i64>> {
    check_len(pop, EntityKind::Person, mask, "count mask")?;
    Ok((0..pop.count(EntityKind::Household))
        .map(|h| pop.members(h).iter().filter(|&&p| mask[p]).count() as i64)
        .collect())
}

/// Largest member value; `empty` for households without members
pub fn max(pop: &Population, values: &[i64], empty: i64) -> Result<Vec<i64>> {
    check_len(pop, EntityKind::Person, values, "max values")?;
    Ok((0..pop.count(EntityKind::Household))
        .map(|h| pop.members(h).iter().map(|&p| values[p]).max().unwrap_or(empty))
        .collect())
}

/// Smallest member value; `empty` for households without members
pub fn min(pop: &Population, values: &[i64], empty: i64) -> Result<Vec<i64>> {
    check_len(pop, EntityKind::Person, values, "min values")?;
    Ok((0..pop.count(EntityKind::Household))
        .map(|h| pop.members(h).iter().map(|&p| values[p]).min().unwrap_or(empty))
        .collect())
}

/// Household value copied to each of its members
pub fn broadcast<T: Clone>(pop: &Population, household_values: &[T]) -> Result<Vec<T>> {
    check_len(pop, EntityKind::Household, household_values, "broadcast values")?;
    Ok(pop
        .persons()
        .iter()
        .map(|p| household_values[p.household].clone())
        .collect())
}

/// Zero-based descending rank of each eligible member within its household
///
/// Only eligible members are ranked, against each other. Equal keys keep
/// member order: the earlier member gets the lower rank. Ineligible members
/// get `None`.
pub fn rank(pop: &Population, keys: &[i64], mask: Option<&[bool]>) -> Result<Vec<Option<usize>>> {
    check_len(pop, EntityKind::Person, keys, "rank keys")?;
    if let Some(m) = mask {
        check_len(pop, EntityKind::Person, m, "rank mask")?;
    }

    let mut ranks = vec![None; pop.count(EntityKind::Person)];
    for h in 0..pop.count(EntityKind::Household) {
        let mut eligible: Vec<usize> = pop
            .members(h)
            .iter()
            .copied()
            .filter(|&p| included(mask, p))
            .collect();
        // sort_by is stable, so ties stay in member order
        eligible.sort_by(|&a, &b| keys[b].cmp(&keys[a]));
        for (position, person) in eligible.into_iter().enumerate() {
            ranks[person] = Some(position);
        }
    }
    Ok(ranks)
}
