//! The TOML run configuration and its translation into an [`Engine`].

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use hoist_core::spec::Specification;
use hoist_engine::registry::RepositoryRegistry;
use hoist_engine::{ConflictPolicy, Engine};
use hoist_util::errors::{HoistError, HoistResult};
use hoist_util::hash::DigestAlgorithm;

/// A full run configuration (`hoist.toml`).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Installation root, relative to the configuration file.
    pub root: Option<PathBuf>,
    /// State file path, relative to the configuration file. Defaults to
    /// `.hoist-state` under the root.
    pub state: Option<PathBuf>,
    pub policy: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
    /// Digest algorithm name (`SHA-1`, `SHA-256`, `MD5`).
    pub digest: Option<String>,
    pub workers: Option<usize>,
    #[serde(default, rename = "repository")]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleConfig>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// One `[[repository]]` block. Everything beyond `type` and `id` flows to
/// the repository factory as options.
#[derive(Debug, Deserialize)]
pub struct RepositoryConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    pub id: String,
    #[serde(flatten)]
    pub options: toml::Table,
}

/// One `[[module]]` block: a top-level specification.
#[derive(Debug, Deserialize)]
pub struct ModuleConfig {
    pub spec: String,
    #[serde(default)]
    pub technology: String,
}

impl RunConfig {
    /// Load and parse a configuration file.
    ///
    /// # Errors
    /// Configuration error when the file is missing or malformed.
    pub fn from_path(path: &Path) -> HoistResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| HoistError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        toml::from_str(&text).map_err(|e| {
            HoistError::Config {
                message: format!("cannot parse {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// Build a configured engine. Relative paths resolve against
    /// `config_dir`.
    ///
    /// # Errors
    /// Unknown repository types, bad policy or digest names, malformed
    /// specification patterns.
    pub fn build_engine(&self, config_dir: &Path, registry: &RepositoryRegistry) -> HoistResult<Engine> {
        let root = resolve(config_dir, self.root.as_deref().unwrap_or(Path::new("install")));
        let mut engine = Engine::new(root);

        if let Some(state) = &self.state {
            engine.set_state_file(resolve(config_dir, state));
        }
        if let Some(policy) = &self.policy {
            engine.set_conflict_policy(ConflictPolicy::from_str(policy)?);
        }
        if let Some(digest) = &self.digest {
            engine.set_digest_algorithm(DigestAlgorithm::parse(digest)?);
        }
        if let Some(workers) = self.workers {
            engine.set_workers(workers);
        }
        engine.set_overwrite(self.overwrite);

        for repo in &self.repositories {
            let options = localize_paths(config_dir, &repo.options);
            engine.add_repository(registry.build(&repo.type_name, &repo.id, &options)?);
        }
        for module in &self.modules {
            engine.add_module_specification(
                Specification::parse(&module.technology, &module.spec)?,
                true,
            );
        }
        for pattern in &self.exclude {
            engine.add_exclusion(Specification::parse("", pattern)?);
        }

        Ok(engine)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Rewrite a relative `path` option against the configuration directory so
/// repository factories see usable paths.
fn localize_paths(config_dir: &Path, options: &toml::Table) -> toml::Table {
    let mut options = options.clone();
    if let Some(toml::Value::String(path)) = options.get("path") {
        let resolved = resolve(config_dir, Path::new(path));
        options.insert(
            "path".to_owned(),
            toml::Value::String(resolved.display().to_string()),
        );
    }
    options
}
