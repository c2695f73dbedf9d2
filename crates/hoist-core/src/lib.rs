//! Core data model for the Hoist dependency engine: identifiers, version
//! tokens, module specifications, the repository interface, the module graph,
//! artifacts, and persisted install state.

pub mod artifact;
pub mod graph;
pub mod identifier;
pub mod notify;
pub mod repository;
pub mod spec;
pub mod state;
pub mod version;
