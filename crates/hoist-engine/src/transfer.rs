//! Artifact transfer: stream a source URL into place, hashing while copying.
//!
//! Downloads land in a temp file next to the destination and are renamed in
//! atomically, so a crashed or cancelled transfer never leaves a partial
//! artifact behind.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;

use hoist_core::notify::Notifier;
use hoist_util::errors::{HoistError, HoistResult};
use hoist_util::fs::ensure_dir;
use hoist_util::hash::DigestAlgorithm;

use crate::cancel::CancelSignal;

/// Build the shared HTTP client for artifact downloads.
///
/// # Errors
/// Client construction failure (TLS backend unavailable).
pub fn build_client() -> HoistResult<Client> {
    Client::builder()
        .user_agent("hoist/0.1")
        .build()
        .map_err(|e| {
            HoistError::Transfer {
                message: format!("Failed to create HTTP client: {e}"),
            }
            .into()
        })
}

/// Fetch `url` into `dest`, returning the hex digest of the transferred
/// bytes under `algorithm`.
///
/// Supports `file://` sources (local copy) and `http(s)://` sources
/// (streaming download with per-transfer timeout). Progress is reported per
/// chunk through the notifier.
///
/// # Errors
/// [`HoistError::Transfer`] on any transport or I/O failure,
/// [`HoistError::Cancelled`] when the cancel signal fires mid-transfer.
pub async fn fetch(
    client: &Client,
    url: &str,
    dest: &Path,
    algorithm: DigestAlgorithm,
    timeout: Duration,
    notifier: &dyn Notifier,
    cancel: &CancelSignal,
) -> HoistResult<String> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent).map_err(HoistError::Io)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(HoistError::Io)?;

    let digest = if let Some(path) = url.strip_prefix("file://") {
        copy_local(Path::new(path), &mut tmp, dest, algorithm, notifier, cancel)?
    } else {
        download(client, url, &mut tmp, dest, algorithm, timeout, notifier, cancel).await?
    };

    tmp.persist(dest).map_err(|e| HoistError::Io(e.error))?;
    Ok(digest)
}

fn copy_local(
    source: &Path,
    tmp: &mut tempfile::NamedTempFile,
    dest: &Path,
    algorithm: DigestAlgorithm,
    notifier: &dyn Notifier,
    cancel: &CancelSignal,
) -> HoistResult<String> {
    use std::io::Read;

    let file = std::fs::File::open(source).map_err(|e| HoistError::Transfer {
        message: format!("Cannot open {}: {e}", source.display()),
    })?;
    let total = file.metadata().ok().map(|m| m.len());
    let mut reader = std::io::BufReader::with_capacity(64 * 1024, file);
    let mut hasher = algorithm.hasher();
    let mut buf = [0u8; 64 * 1024];
    let mut done: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(HoistError::Cancelled.into());
        }
        let n = reader.read(&mut buf).map_err(HoistError::Io)?;
        if n == 0 {
            break;
        }
        tmp.write_all(&buf[..n]).map_err(HoistError::Io)?;
        hasher.update(&buf[..n]);
        done += n as u64;
        notifier.progress(dest, done, total);
    }

    Ok(hasher.finish_hex())
}

#[allow(clippy::too_many_arguments)]
async fn download(
    client: &Client,
    url: &str,
    tmp: &mut tempfile::NamedTempFile,
    dest: &Path,
    algorithm: DigestAlgorithm,
    timeout: Duration,
    notifier: &dyn Notifier,
    cancel: &CancelSignal,
) -> HoistResult<String> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HoistError::Transfer {
            message: format!("Request to {url} failed: {e}"),
        })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(HoistError::Transfer {
            message: format!("HTTP {status} fetching {url}"),
        }
        .into());
    }

    let total = resp.content_length();
    let mut hasher = algorithm.hasher();
    let mut done: u64 = 0;
    let mut stream = resp.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if cancel.is_cancelled() {
            return Err(HoistError::Cancelled.into());
        }
        let chunk = chunk.map_err(|e| HoistError::Transfer {
            message: format!("Failed to read {url}: {e}"),
        })?;
        tmp.write_all(&chunk).map_err(HoistError::Io)?;
        hasher.update(&chunk);
        done += chunk.len() as u64;
        notifier.progress(dest, done, total);
    }

    Ok(hasher.finish_hex())
}
