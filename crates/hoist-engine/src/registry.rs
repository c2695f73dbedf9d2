//! Repository plug-in registry.
//!
//! Repository implementations are instantiated from configuration via a
//! registry mapping a logical type name to a factory closure. There is no
//! runtime class lookup: factories register at engine construction and
//! unknown names fail fast.

use std::collections::HashMap;
use std::sync::Arc;

use hoist_core::repository::Repository;
use hoist_util::errors::{HoistError, HoistResult};

use crate::directory::DirectoryRepository;

/// Builds a repository from its id and the options table of its
/// configuration block.
pub type RepositoryFactory =
    Box<dyn Fn(&str, &toml::Table) -> HoistResult<Arc<dyn Repository>> + Send + Sync>;

pub struct RepositoryRegistry {
    factories: HashMap<String, RepositoryFactory>,
}

impl RepositoryRegistry {
    /// An empty registry with no repository types.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in types registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            "directory",
            Box::new(|id, options| DirectoryRepository::from_options(id, options)),
        );
        registry
    }

    pub fn register(&mut self, type_name: &str, factory: RepositoryFactory) {
        self.factories.insert(type_name.to_owned(), factory);
    }

    /// Instantiate a repository of the given type.
    ///
    /// # Errors
    /// [`HoistError::UnknownRepositoryType`] for an unregistered name;
    /// factory-specific configuration errors.
    pub fn build(
        &self,
        type_name: &str,
        id: &str,
        options: &toml::Table,
    ) -> HoistResult<Arc<dyn Repository>> {
        match self.factories.get(type_name) {
            Some(factory) => factory(id, options),
            None => Err(HoistError::UnknownRepositoryType {
                name: type_name.to_owned(),
            }
            .into()),
        }
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
