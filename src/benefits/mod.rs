//! Benefit rules built on the engine

pub mod composition;
pub mod scholarship;

pub use composition::{combine, monthly, to_monthly, Combine};
