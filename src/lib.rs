//! fcharness: conformance harness for time-accelerating command wrappers
//!
//! Launches child processes, optionally prefixed by the wrapper under test
//! (`$FCPATH -- <command>`), and asserts exit codes and wall-clock ceilings.
//! Declared sleeps of minutes must finish in well under a second of real time.
//!
//! # Architecture
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: `HarnessConfig`, error taxonomy
//! - [`config::env`]: one-shot resolution of `FCPATH`, `CC`, `CFLAGS` and friends
//!
//! ## Execution ([`exec`])
//! - [`exec::runner`]: shell command execution and exit code assertion
//! - [`exec::compiler`]: native fixtures built from inline C source
//!
//! ## Safety ([`safety`])
//! - [`safety::artifact`]: uniquely named temporary files released on every exit path
//!
//! ## Verdicts ([`verdict`])
//! - [`verdict::timing`]: wall-clock ceilings
//! - [`verdict::outcome`]: pass / fail / skip classification
//!
//! ## Harness ([`harness`])
//! - [`harness::layers`]: explicit stage chain (timing, compile, save)
//!
//! ## Suite ([`suite`])
//! - [`suite::single_process`]: one blocking primitive per scenario
//! - [`suite::multi_process`]: concurrent children, spawn chains, descriptor accounting
//!
//! ## Utilities ([`utils`])
//! - [`utils::fd`]: open descriptor snapshots
//! - [`utils::deps`]: tool probing

pub mod config;
pub mod exec;
pub mod harness;
pub mod safety;
pub mod suite;
pub mod verdict;
pub mod utils;

// CLI entrypoint wiring for the fcharness binary.
pub mod cli;

pub use config::types::{FailureKind, HarnessConfig, HarnessError, Result};
pub use harness::{Harness, Runtime, TestContext};
