//! Utilities
//!
//! Descriptor accounting and external tool probing.

pub mod deps;
pub mod fd;
