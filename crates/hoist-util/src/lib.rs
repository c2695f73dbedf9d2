//! Shared utilities for the Hoist dependency engine.
//!
//! This crate provides cross-cutting concerns used by all other Hoist crates:
//! error types, digest algorithms, filesystem helpers, and terminal status
//! output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
