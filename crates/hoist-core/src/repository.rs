//! The repository interface consumed by the engine.

use std::path::Path;

use async_trait::async_trait;

use hoist_util::errors::HoistResult;

use crate::artifact::Artifact;
use crate::identifier::Identifier;
use crate::spec::Specification;

/// A module located in a repository: its concrete identifier plus the
/// specifications of its direct dependencies.
#[derive(Debug, Clone)]
pub struct FoundModule {
    pub identifier: Identifier,
    pub dependencies: Vec<Specification>,
}

/// An external source of modules and their artifacts.
///
/// Implementations must be safe to query from many workers concurrently;
/// the engine wraps them in `Arc` and fans queries out over a task pool.
#[async_trait]
pub trait Repository: Send + Sync + std::fmt::Debug {
    /// Stable identifier of this repository, recorded in produced
    /// [`Identifier`]s as provenance.
    fn id(&self) -> &str;

    /// The repository technology tag matched against
    /// [`Specification::technology`].
    fn technology(&self) -> &str;

    /// Locate the best available module for a specification.
    ///
    /// Returns `Ok(None)` when this repository has no match. A transport
    /// failure is an error; the engine treats it as a miss for this
    /// repository and keeps consulting the others.
    ///
    /// # Errors
    /// Transport-level failures only.
    async fn get_module(&self, spec: &Specification) -> HoistResult<Option<FoundModule>>;

    /// The artifacts of an identified module, with file paths resolved
    /// against the installation root.
    ///
    /// # Errors
    /// Transport-level failures only.
    async fn get_artifacts(&self, id: &Identifier, root: &Path) -> HoistResult<Vec<Artifact>>;
}
