//! Choosing between two independently sourced candidate amounts
//!
//! A candidate of zero means "not applicable". When only one candidate
//! applies it is used as-is; when both apply the smaller or larger wins.

use crate::error::{EngineError, Result};
use crate::select::{select, Choice};
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: i64 = 12;

/// Which candidate wins when both apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combine {
    Min,
    Max,
}

/// Element-wise combination with zero exclusion
pub fn combine(a: &[i64], b: &[i64], variant: Combine) -> Result<Vec<i64>> {
    if a.len() != b.len() {
        return Err(EngineError::LengthMismatch {
            variable: "combine candidates".to_string(),
            expected: a.len(),
            found: b.len(),
        });
    }

    let both: Vec<bool> = a.iter().zip(b).map(|(&x, &y)| x != 0 && y != 0).collect();
    let only_a: Vec<bool> = a.iter().zip(b).map(|(&x, &y)| x != 0 && y == 0).collect();
    let only_b: Vec<bool> = a.iter().zip(b).map(|(&x, &y)| x == 0 && y != 0).collect();
    let winner: Vec<i64> = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| match variant {
            Combine::Min => x.min(y),
            Combine::Max => x.max(y),
        })
        .collect();

    select(
        a.len(),
        vec![
            (&both[..], Choice::Each(winner)),
            (&only_a[..], Choice::Each(a.to_vec())),
            (&only_b[..], Choice::Each(b.to_vec())),
        ],
        0,
    )
}

/// Annual amounts to monthly, rounding down
pub fn to_monthly(annual: &[i64]) -> Vec<i64> {
    annual.iter().map(|x| x.div_euclid(MONTHS_PER_YEAR)).collect()
}

/// Combine annual candidates, then convert the result to monthly
pub fn monthly(a: &[i64], b: &[i64], variant: Combine) -> Result<Vec<i64>> {
    combine(a, b, variant).map(|annual| to_monthly(&annual))
}
