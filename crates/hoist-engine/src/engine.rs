//! The engine facade: configuration surface and the full run pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hoist_core::graph::ModuleGraph;
use hoist_core::identifier::Identifier;
use hoist_core::notify::{Notifier, NullNotifier};
use hoist_core::repository::Repository;
use hoist_core::spec::Specification;
use hoist_util::errors::{HoistError, HoistResult};
use hoist_util::hash::DigestAlgorithm;

use crate::cancel::CancelSignal;
use crate::conflict::{self, Conflict, ConflictPolicy};
use crate::identify::{self, IdentifyOptions, UnresolvedModule};
use crate::install::{self, InstallOptions};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// One identified module in the run result.
#[derive(Debug, Clone)]
pub struct ModuleSummary {
    pub identifier: Identifier,
    pub explicit: bool,
    pub dependencies: Vec<Identifier>,
}

/// Everything a run produced.
#[derive(Debug, Default)]
pub struct RunResult {
    pub modules: Vec<ModuleSummary>,
    /// The conflict-free set of identifiers whose artifacts were installed.
    pub chosen: Vec<Identifier>,
    pub conflicts: Vec<Conflict>,
    pub unresolved: Vec<UnresolvedModule>,
    pub installed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub removed: Vec<PathBuf>,
}

impl RunResult {
    /// CLI exit code: 0 ok, 2 unresolved modules, 3 transfer failures.
    pub fn exit_code(&self) -> i32 {
        if !self.unresolved.is_empty() {
            2
        } else if !self.failed.is_empty() {
            3
        } else {
            0
        }
    }
}

/// The dependency resolution and artifact acquisition engine.
///
/// Configure with the `add_*`/`set_*` methods, then call [`Engine::run`]
/// (or [`Engine::run_blocking`] outside a runtime) for the full pipeline:
/// identification, conflict resolution, installation.
pub struct Engine {
    graph: ModuleGraph,
    repositories: Vec<Arc<dyn Repository>>,
    exclusions: Vec<Specification>,
    policy: ConflictPolicy,
    root: PathBuf,
    state_file: PathBuf,
    overwrite: bool,
    algorithm: DigestAlgorithm,
    workers: usize,
    query_timeout: Duration,
    download_timeout: Duration,
    notifier: Arc<dyn Notifier>,
    cancel: CancelSignal,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph)
            .field("repositories", &self.repositories.len())
            .field("exclusions", &self.exclusions)
            .field("policy", &self.policy)
            .field("root", &self.root)
            .field("state_file", &self.state_file)
            .field("overwrite", &self.overwrite)
            .field("algorithm", &self.algorithm)
            .field("workers", &self.workers)
            .field("query_timeout", &self.query_timeout)
            .field("download_timeout", &self.download_timeout)
            .finish()
    }
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_file = root.join(".hoist-state");
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            graph: ModuleGraph::new(),
            repositories: Vec::new(),
            exclusions: Vec::new(),
            policy: ConflictPolicy::default(),
            root,
            state_file,
            overwrite: false,
            algorithm: DigestAlgorithm::default(),
            workers,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            notifier: Arc::new(NullNotifier),
            cancel: CancelSignal::new(),
        }
    }

    /// Add a top-level module specification.
    pub fn add_module_specification(&mut self, spec: Specification, explicit: bool) {
        self.graph.add_module(spec, explicit);
    }

    /// Add a repository. Declared order is the tie-break for "best
    /// repository": queries consult repositories in this order and the first
    /// match wins.
    pub fn add_repository(&mut self, repository: Arc<dyn Repository>) {
        self.repositories.push(repository);
    }

    /// Exclude a specification: matching modules are skipped entirely, along
    /// with any descendants reachable only through them.
    pub fn add_exclusion(&mut self, spec: Specification) {
        self.exclusions.push(spec);
    }

    pub fn set_conflict_policy(&mut self, policy: ConflictPolicy) {
        self.policy = policy;
    }

    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
        self.state_file = self.root.join(".hoist-state");
    }

    pub fn set_state_file(&mut self, path: impl Into<PathBuf>) {
        self.state_file = path.into();
    }

    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    /// Set the digest algorithm. Must happen before `run`; changing it
    /// between runs makes every prior digest mismatch, so all non-volatile
    /// artifacts reinstall.
    pub fn set_digest_algorithm(&mut self, algorithm: DigestAlgorithm) {
        self.algorithm = algorithm;
    }

    pub fn set_workers(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }

    pub fn set_query_timeout(&mut self, timeout: Duration) {
        self.query_timeout = timeout;
    }

    pub fn set_download_timeout(&mut self, timeout: Duration) {
        self.download_timeout = timeout;
    }

    pub fn set_notifier(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifier = notifier;
    }

    /// A handle that cancels the running pipeline from another task or
    /// thread.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The full blocking pipeline, as an async operation: identify every
    /// module, resolve conflicts, install artifacts, persist state.
    ///
    /// # Errors
    /// Fatal errors only ([`HoistError::DuplicateArtifact`],
    /// [`HoistError::Cancelled`], state persistence failures). Per-module
    /// and per-artifact failures land in the result.
    pub async fn run(&mut self) -> HoistResult<RunResult> {
        let identify_options = IdentifyOptions {
            workers: self.workers,
            query_timeout: self.query_timeout,
        };
        let unresolved = identify::identify(
            &mut self.graph,
            &self.repositories,
            &self.exclusions,
            &self.notifier,
            &identify_options,
            &self.cancel,
        )
        .await?;

        let conflicts = conflict::resolve(&mut self.graph, self.policy, self.notifier.as_ref());
        if self.cancel.is_cancelled() {
            return Err(HoistError::Cancelled.into());
        }

        let modules = self.module_summaries();
        let mut chosen: Vec<Identifier> = modules.iter().map(|m| m.identifier.clone()).collect();
        chosen.sort_by_key(Identifier::coordinate);

        let repo_map: HashMap<String, Arc<dyn Repository>> = self
            .repositories
            .iter()
            .map(|r| (r.id().to_owned(), r.clone()))
            .collect();
        let planned = install::plan(&chosen, &repo_map, &self.root).await?;

        let install_options = InstallOptions {
            root: self.root.clone(),
            state_file: self.state_file.clone(),
            workers: self.workers,
            overwrite: self.overwrite,
            algorithm: self.algorithm,
            download_timeout: self.download_timeout,
        };
        let summary =
            install::install(planned, &install_options, &self.notifier, &self.cancel).await?;

        Ok(RunResult {
            modules,
            chosen,
            conflicts,
            unresolved,
            installed: summary.installed,
            skipped: summary.skipped,
            failed: summary.failed,
            removed: summary.removed,
        })
    }

    /// Synchronous entry point: owns a current-thread runtime for the
    /// duration of the run.
    ///
    /// # Errors
    /// As [`Engine::run`], plus runtime construction failure.
    pub fn run_blocking(&mut self) -> HoistResult<RunResult> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(HoistError::Io)?;
        runtime.block_on(self.run())
    }

    fn module_summaries(&self) -> Vec<ModuleSummary> {
        let mut summaries: Vec<ModuleSummary> = self
            .graph
            .ids()
            .into_iter()
            .filter_map(|id| {
                let node = self.graph.node(id);
                let identifier = node.identifier.clone()?;
                let dependencies = node
                    .dependencies
                    .iter()
                    .filter_map(|&d| self.graph.get(d).and_then(|m| m.identifier.clone()))
                    .collect();
                Some(ModuleSummary {
                    identifier,
                    explicit: node.explicit,
                    dependencies,
                })
            })
            .collect();
        summaries.sort_by_key(|m| m.identifier.coordinate());
        summaries
    }
}
