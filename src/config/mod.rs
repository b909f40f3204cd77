//! Configuration
//!
//! Process-wide settings resolved once at startup and passed into the harness.

pub mod env;
pub mod types;
