//! The Hoist engine: iterative concurrent module identification, version
//! conflict resolution, and artifact installation with incremental persisted
//! state.

pub mod cancel;
pub mod conflict;
pub mod directory;
pub mod engine;
pub mod identify;
pub mod install;
pub mod registry;
pub mod transfer;

pub use cancel::CancelSignal;
pub use conflict::{Conflict, ConflictPolicy};
pub use engine::{Engine, ModuleSummary, RunResult};
pub use identify::UnresolvedModule;
