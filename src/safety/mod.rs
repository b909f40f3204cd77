//! Safety and cleanup
//!
//! Ephemeral artifacts are released on every exit path.

pub mod artifact;
