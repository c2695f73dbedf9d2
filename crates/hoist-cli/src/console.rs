//! Cargo-style console rendering of engine events.

use std::path::Path;

use hoist_core::notify::Notifier;
use hoist_util::progress;

/// Renders engine events as right-aligned status lines on stderr.
pub struct ConsoleNotifier {
    verbose: bool,
}

impl ConsoleNotifier {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        // Engine messages lead with a verb ("Fetched …", "Resolved …"),
        // which doubles as the status label.
        match message.split_once(' ') {
            Some((label, rest)) => progress::status(label, rest),
            None => progress::status("Info", message),
        }
    }

    fn warn(&self, message: &str) {
        progress::status_warn("Warning", message);
    }

    fn error(&self, message: &str) {
        progress::status_warn("Error", message);
    }

    fn progress(&self, file: &Path, bytes_done: u64, bytes_total: Option<u64>) {
        if self.verbose {
            tracing::debug!(
                "{}: {bytes_done}/{} bytes",
                file.display(),
                bytes_total.map_or_else(|| "?".to_owned(), |t| t.to_string())
            );
        }
    }
}
