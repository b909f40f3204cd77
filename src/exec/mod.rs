//! Execution control
//!
//! Shell command execution through the optional wrapper, and native fixture builds.

pub mod compiler;
pub mod runner;
