//! The identification engine: drives the module graph from explicit
//! specifications to a fully identified state.
//!
//! Each round fans repository queries out over a bounded task pool, then
//! integrates the results serially on the calling task. Queries are pure, so
//! they parallelize freely; integration mutates the graph and must be serial
//! to preserve supplicant deduplication and identifier uniqueness. The round
//! barrier is the join on the task set.
//!
//! Repositories are consulted in declared order and the first non-null
//! result wins the module's identity. Cross-repository disagreement is not
//! short-circuited: a later repository returning a *distinct* identifier for
//! the same specification enters the graph as a sibling and is settled by
//! the conflict resolver.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use hoist_core::graph::{ModuleGraph, ModuleId};
use hoist_core::identifier::Identifier;
use hoist_core::notify::Notifier;
use hoist_core::repository::{FoundModule, Repository};
use hoist_core::spec::Specification;
use hoist_util::errors::{HoistError, HoistResult};

use crate::cancel::CancelSignal;

/// A module no repository could identify, reported in the run result.
#[derive(Debug, Clone)]
pub struct UnresolvedModule {
    pub spec: Specification,
    pub cause: String,
}

impl std::fmt::Display for UnresolvedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.spec, self.cause)
    }
}

pub struct IdentifyOptions {
    pub workers: usize,
    pub query_timeout: Duration,
}

/// The result of probing all repositories for one specification.
struct QueryOutcome {
    /// First non-null result, in repository declaration order.
    primary: Option<FoundModule>,
    /// Later results whose identifier disagrees with the primary.
    alternates: Vec<FoundModule>,
    warnings: Vec<String>,
}

/// Identify every module reachable from the graph's roots.
///
/// Returns the modules that stayed unresolved. Modules whose specification
/// equals an exclusion are removed up front and never queried; dependency
/// specs matching an exclusion are never enqueued.
///
/// # Errors
/// [`HoistError::Cancelled`] when the cancel signal fires; cancelled rounds
/// apply no graph mutations.
pub async fn identify(
    graph: &mut ModuleGraph,
    repositories: &[Arc<dyn Repository>],
    exclusions: &[Specification],
    notifier: &Arc<dyn Notifier>,
    options: &IdentifyOptions,
    cancel: &CancelSignal,
) -> HoistResult<Vec<UnresolvedModule>> {
    remove_excluded(graph, exclusions);

    let mut attempted: HashSet<ModuleId> = HashSet::new();
    let mut identified: HashMap<Identifier, ModuleId> = HashMap::new();
    let mut unresolved: Vec<UnresolvedModule> = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Err(HoistError::Cancelled.into());
        }

        // Snapshot this round's work: unidentified modules not yet attempted.
        let pending: Vec<(ModuleId, Specification)> = graph
            .ids()
            .into_iter()
            .filter(|&id| graph.node(id).identifier.is_none() && !attempted.contains(&id))
            .map(|id| (id, graph.node(id).spec.clone()))
            .collect();
        if pending.is_empty() {
            break;
        }
        for (id, _) in &pending {
            attempted.insert(*id);
        }

        // Parallel phase: query repositories in declared order.
        let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
        let mut join_set = JoinSet::new();
        for (module_id, spec) in &pending {
            let repos: Vec<Arc<dyn Repository>> = repositories.to_vec();
            let spec = spec.clone();
            let module_id = *module_id;
            let sem = semaphore.clone();
            let timeout = options.query_timeout;
            join_set.spawn(async move {
                let _permit = sem.acquire().await;
                let outcome = query_repositories(&repos, &spec, timeout).await;
                (module_id, outcome)
            });
        }

        let mut results: HashMap<ModuleId, QueryOutcome> = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok((module_id, outcome)) = joined {
                results.insert(module_id, outcome);
            }
        }

        if cancel.is_cancelled() {
            // Discard the round's results wholesale.
            return Err(HoistError::Cancelled.into());
        }

        // Serial phase: integrate in snapshot order for determinism.
        for (module_id, spec) in pending {
            let Some(outcome) = results.remove(&module_id) else {
                continue;
            };
            for warning in &outcome.warnings {
                notifier.warn(warning);
            }
            match outcome.primary {
                None => unresolved.push(UnresolvedModule {
                    spec,
                    cause: "no repository produced a module".to_owned(),
                }),
                Some(primary) if !primary.identifier.is_well_formed() => {
                    unresolved.push(UnresolvedModule {
                        spec,
                        cause: format!(
                            "repository {} returned an identifier without a logical identity",
                            primary.identifier.repository
                        ),
                    });
                }
                Some(primary) => {
                    let owner = integrate(
                        graph,
                        &mut identified,
                        exclusions,
                        notifier,
                        module_id,
                        primary,
                    );
                    for alternate in outcome.alternates {
                        if alternate.identifier.is_well_formed() {
                            add_alternate(graph, &mut identified, exclusions, notifier, owner, alternate);
                        }
                    }
                }
            }
        }
    }

    Ok(unresolved)
}

/// Apply one successful query result to the graph. Returns the node that
/// ended up holding the identity.
fn integrate(
    graph: &mut ModuleGraph,
    identified: &mut HashMap<Identifier, ModuleId>,
    exclusions: &[Specification],
    notifier: &Arc<dyn Notifier>,
    module_id: ModuleId,
    found: FoundModule,
) -> ModuleId {
    if let Some(&existing) = identified.get(&found.identifier) {
        if existing != module_id {
            // Another node already resolved to this identifier: adopt its
            // identification, then fold. The copy gives the duplicate the
            // shared identifier, so the parent rewrite matches on identifier
            // equality rather than leaning on the arena id.
            graph.copy_identification_from(module_id, existing);
            graph.merge_supplicants(existing, module_id);
            graph.replace_module(module_id, existing, false);
            graph.remove_module(module_id);
        }
        return existing;
    }

    graph.node_mut(module_id).identifier = Some(found.identifier.clone());
    identified.insert(found.identifier, module_id);
    enqueue_dependencies(graph, exclusions, notifier, module_id, found.dependencies);
    module_id
}

/// Install a disagreeing repository's module as a sibling of `owner`, linked
/// to the same parents, so the conflict resolver can pick between them.
fn add_alternate(
    graph: &mut ModuleGraph,
    identified: &mut HashMap<Identifier, ModuleId>,
    exclusions: &[Specification],
    notifier: &Arc<dyn Notifier>,
    owner: ModuleId,
    alternate: FoundModule,
) {
    let owner_ident = graph.node(owner).identifier.clone();
    if owner_ident.as_ref() == Some(&alternate.identifier) {
        return;
    }

    let node = match identified.get(&alternate.identifier) {
        Some(&existing) => existing,
        None => {
            let spec = graph.node(owner).spec.clone();
            let explicit = graph.node(owner).explicit;
            let node = graph.add_module(spec, explicit);
            graph.node_mut(node).identifier = Some(alternate.identifier.clone());
            identified.insert(alternate.identifier, node);
            enqueue_dependencies(graph, exclusions, notifier, node, alternate.dependencies);
            node
        }
    };

    for sup in graph.node(owner).supplicants.clone() {
        graph.add_dependency(sup, node);
        graph.add_supplicant(node, sup);
    }
}

fn enqueue_dependencies(
    graph: &mut ModuleGraph,
    exclusions: &[Specification],
    notifier: &Arc<dyn Notifier>,
    parent: ModuleId,
    dependencies: Vec<Specification>,
) {
    for dep_spec in dependencies {
        if exclusions.contains(&dep_spec) {
            notifier.info(&format!("Excluded {dep_spec}"));
            continue;
        }
        let child = match graph.find_by_spec(&dep_spec) {
            Some(existing) => existing,
            None => graph.add_module(dep_spec, false),
        };
        graph.add_dependency(parent, child);
        graph.add_supplicant(child, parent);
    }
}

/// Query repositories in declared order. The first match becomes the
/// primary; later matches with distinct identifiers are kept as alternates.
/// Transport errors and timeouts degrade to warnings and the next repository
/// is tried.
async fn query_repositories(
    repositories: &[Arc<dyn Repository>],
    spec: &Specification,
    timeout: Duration,
) -> QueryOutcome {
    let mut primary: Option<FoundModule> = None;
    let mut alternates = Vec::new();
    let mut warnings = Vec::new();

    for repo in repositories {
        if !spec.technology.is_empty() && repo.technology() != spec.technology {
            continue;
        }
        match tokio::time::timeout(timeout, repo.get_module(spec)).await {
            Err(_) => warnings.push(format!(
                "Query to repository {} timed out for {spec}",
                repo.id()
            )),
            Ok(Err(e)) => warnings.push(format!("Repository {} failed for {spec}: {e}", repo.id())),
            Ok(Ok(Some(found))) => match &primary {
                None => primary = Some(found),
                Some(first) => {
                    if first.identifier != found.identifier
                        && !alternates
                            .iter()
                            .any(|a: &FoundModule| a.identifier == found.identifier)
                    {
                        alternates.push(found);
                    }
                }
            },
            Ok(Ok(None)) => {}
        }
    }

    QueryOutcome {
        primary,
        alternates,
        warnings,
    }
}

/// Remove modules whose specification is excluded, then sweep any
/// descendants that became unreachable.
fn remove_excluded(graph: &mut ModuleGraph, exclusions: &[Specification]) {
    let excluded: Vec<ModuleId> = graph
        .ids()
        .into_iter()
        .filter(|&id| exclusions.contains(&graph.node(id).spec))
        .collect();
    if excluded.is_empty() {
        return;
    }
    for id in excluded {
        graph.remove_module(id);
    }
    graph.sweep_orphans();
}
