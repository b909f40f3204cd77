//! Verdicts
//!
//! Wall-clock ceilings and per-scenario outcome classification.

pub mod outcome;
pub mod timing;
