//! The artifact installer: plan, diff against prior state, transfer
//! concurrently, clean up orphans, persist new state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use hoist_core::artifact::Artifact;
use hoist_core::identifier::Identifier;
use hoist_core::notify::Notifier;
use hoist_core::repository::Repository;
use hoist_core::state::InstallState;
use hoist_util::errors::{HoistError, HoistResult};
use hoist_util::hash::DigestAlgorithm;

use crate::cancel::CancelSignal;
use crate::transfer;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

pub struct InstallOptions {
    pub root: PathBuf,
    pub state_file: PathBuf,
    pub workers: usize,
    pub overwrite: bool,
    pub algorithm: DigestAlgorithm,
    pub download_timeout: Duration,
}

/// What the installer did, per artifact file path.
#[derive(Debug, Default)]
pub struct InstallSummary {
    pub installed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub removed: Vec<PathBuf>,
}

/// Collect the artifact lists of every chosen module.
///
/// # Errors
/// [`HoistError::DuplicateArtifact`] when two modules plan the same file
/// path; repository transport failures.
pub async fn plan(
    chosen: &[Identifier],
    repositories: &HashMap<String, Arc<dyn Repository>>,
    root: &Path,
) -> HoistResult<Vec<Artifact>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut planned = Vec::new();
    for identifier in chosen {
        let Some(repo) = repositories.get(&identifier.repository) else {
            return Err(HoistError::Repository {
                message: format!(
                    "module {} names unknown repository {}",
                    identifier.coordinate(),
                    identifier.repository
                ),
            }
            .into());
        };
        for artifact in repo.get_artifacts(identifier, root).await? {
            if !seen.insert(artifact.file.clone()) {
                return Err(HoistError::DuplicateArtifact {
                    file: artifact.file.display().to_string(),
                }
                .into());
            }
            planned.push(artifact);
        }
    }
    Ok(planned)
}

/// Materialize the planned artifacts under the root.
///
/// # Errors
/// [`HoistError::Cancelled`] on cancellation (state is not persisted);
/// I/O failure writing the state file. Per-artifact transfer failures are
/// collected in the summary, not raised.
pub async fn install(
    planned: Vec<Artifact>,
    options: &InstallOptions,
    notifier: &Arc<dyn Notifier>,
    cancel: &CancelSignal,
) -> HoistResult<InstallSummary> {
    let previous = InstallState::load(&options.state_file);
    let planned_paths: HashSet<String> = planned
        .iter()
        .map(|a| a.relative_path(&options.root))
        .collect();

    // Diff against prior state.
    let mut to_install: Vec<Artifact> = Vec::new();
    let mut kept: Vec<Artifact> = Vec::new();
    for mut artifact in planned {
        if !artifact.exists() || (options.overwrite && !artifact.volatile) {
            to_install.push(artifact);
            continue;
        }
        if artifact.volatile {
            // Preserve whatever the user left on disk; re-record its digest.
            match artifact.current_digest(options.algorithm) {
                Ok(digest) => artifact.digest = Some(digest),
                Err(e) => notifier.warn(&format!(
                    "Cannot hash volatile artifact {}: {e}",
                    artifact.file.display()
                )),
            }
            kept.push(artifact);
            continue;
        }
        artifact.digest = previous
            .record_for(&artifact.relative_path(&options.root))
            .and_then(|r| r.digest.clone());
        if artifact.was_modified(options.algorithm) {
            artifact.digest = None;
            to_install.push(artifact);
        } else {
            kept.push(artifact);
        }
    }

    // Transfer concurrently, bounded by the worker pool.
    let client = transfer::build_client()?;
    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut join_set = JoinSet::new();
    for artifact in to_install {
        let client = client.clone();
        let notifier = notifier.clone();
        let cancel = cancel.clone();
        let sem = semaphore.clone();
        let algorithm = options.algorithm;
        let timeout = options.download_timeout;
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            let outcome = fetch_with_retries(
                &client,
                &artifact,
                algorithm,
                timeout,
                notifier.as_ref(),
                &cancel,
            )
            .await;
            (artifact, outcome)
        });
    }

    let mut summary = InstallSummary {
        skipped: kept.iter().map(|a| a.file.clone()).collect(),
        ..InstallSummary::default()
    };
    let mut installed: Vec<Artifact> = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        let Ok((mut artifact, outcome)) = joined else {
            continue;
        };
        match outcome {
            Ok(digest) => {
                artifact.digest = Some(digest);
                notifier.info(&format!("Fetched {}", artifact.file.display()));
                summary.installed.push(artifact.file.clone());
                installed.push(artifact);
            }
            Err(e) => {
                notifier.warn(&format!("Failed {}: {e}", artifact.file.display()));
                summary.failed.push((artifact.file.clone(), e.to_string()));
            }
        }
    }

    if cancel.is_cancelled() {
        return Err(HoistError::Cancelled.into());
    }

    // Remove orphans from previous runs.
    for record in &previous.records {
        if planned_paths.contains(&record.file) {
            continue;
        }
        let orphan = record.to_artifact(&options.root);
        match orphan.delete(&options.root) {
            Ok(true) => summary.removed.push(orphan.file.clone()),
            Ok(false) => {}
            Err(e) => notifier.warn(&format!(
                "Cannot remove orphaned artifact {}: {e}",
                orphan.file.display()
            )),
        }
    }

    // Persist the new state; failed artifacts stay unrecorded so the next
    // run retries them.
    let state = InstallState::from_artifacts(kept.iter().chain(installed.iter()), &options.root);
    state.save(&options.state_file)?;

    summary.installed.sort();
    summary.skipped.sort();
    summary.removed.sort();
    summary.failed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(summary)
}

/// Transfer with up to [`MAX_RETRIES`] attempts and exponential backoff.
async fn fetch_with_retries(
    client: &reqwest::Client,
    artifact: &Artifact,
    algorithm: DigestAlgorithm,
    timeout: Duration,
    notifier: &dyn Notifier,
    cancel: &CancelSignal,
) -> HoistResult<String> {
    let mut last: miette::Report = HoistError::Transfer {
        message: format!("no transfer attempted for {}", artifact.url),
    }
    .into();

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            tokio::time::sleep(RETRY_BASE_DELAY * 2u32.pow(attempt - 1)).await;
        }
        if cancel.is_cancelled() {
            return Err(HoistError::Cancelled.into());
        }
        match transfer::fetch(
            client,
            &artifact.url,
            &artifact.file,
            algorithm,
            timeout,
            notifier,
            cancel,
        )
        .await
        {
            Ok(digest) => return Ok(digest),
            Err(e) => {
                if cancel.is_cancelled() {
                    return Err(e);
                }
                last = e;
            }
        }
    }
    Err(last)
}
