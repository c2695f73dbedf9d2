//! Artifact records: a file on disk, the URL it came from, and its digest.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use hoist_util::errors::{HoistError, HoistResult};
use hoist_util::fs::remove_empty_parents;
use hoist_util::hash::{digest_file, DigestAlgorithm};

/// A single file artifact of a module.
///
/// Equality and hashing use the file path only: two artifacts planning the
/// same path are the same artifact regardless of source.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Absolute path of the installed file.
    pub file: PathBuf,
    /// Source URL (`http(s)://` or `file://`).
    pub url: String,
    /// Volatile files are expected to be edited after install; the installer
    /// preserves their content when already present.
    pub volatile: bool,
    /// Hex digest recorded at the last successful install, under the
    /// engine's digest algorithm.
    pub digest: Option<String>,
}

impl Artifact {
    pub fn new(file: PathBuf, url: String, volatile: bool) -> Self {
        Self {
            file,
            url,
            volatile,
            digest: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.file.is_file()
    }

    /// The file path relative to the installation root, with forward
    /// slashes, as persisted in the state file.
    pub fn relative_path(&self, root: &Path) -> String {
        let rel = self.file.strip_prefix(root).unwrap_or(&self.file);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Digest of the file currently on disk.
    ///
    /// # Errors
    /// I/O failure reading the file.
    pub fn current_digest(&self, algorithm: DigestAlgorithm) -> Result<String, HoistError> {
        digest_file(algorithm, &self.file)
    }

    /// True when there is no recorded digest, or the file on disk no longer
    /// hashes to it. An unreadable file counts as modified.
    pub fn was_modified(&self, algorithm: DigestAlgorithm) -> bool {
        match &self.digest {
            None => true,
            Some(recorded) => match self.current_digest(algorithm) {
                Ok(current) => current != *recorded,
                Err(_) => true,
            },
        }
    }

    /// Recompute the digest from disk and store it.
    ///
    /// # Errors
    /// I/O failure reading the file.
    pub fn update_digest(&mut self, algorithm: DigestAlgorithm) -> Result<(), HoistError> {
        self.digest = Some(self.current_digest(algorithm)?);
        Ok(())
    }

    /// Delete the file and remove any emptied parent directories, walking up
    /// to but never beyond `root`. Returns whether a file was removed.
    ///
    /// # Errors
    /// I/O failure removing the file (a missing file is not an error).
    pub fn delete(&self, root: &Path) -> HoistResult<bool> {
        if !self.file.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.file).map_err(HoistError::Io)?;
        if let Some(parent) = self.file.parent() {
            remove_empty_parents(parent, root);
        }
        Ok(true)
    }
}

impl PartialEq for Artifact {
    fn eq(&self, other: &Self) -> bool {
        self.file == other.file
    }
}

impl Eq for Artifact {}

impl Hash for Artifact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.file.hash(state);
    }
}
