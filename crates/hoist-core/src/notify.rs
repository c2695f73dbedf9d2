//! The notifier interface the engine reports through.

use std::path::Path;

/// Event sink consumed by the engine. All methods default to no-ops so
/// implementations override only what they render.
pub trait Notifier: Send + Sync {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}

    /// Transfer progress for one artifact. `bytes_total` is `None` when the
    /// source did not report a length.
    fn progress(&self, _file: &Path, _bytes_done: u64, _bytes_total: Option<u64>) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn progress(&self, file: &Path, bytes_done: u64, bytes_total: Option<u64>) {
        match bytes_total {
            Some(total) => {
                tracing::debug!("{}: {bytes_done}/{total} bytes", file.display());
            }
            None => tracing::debug!("{}: {bytes_done} bytes", file.display()),
        }
    }
}
