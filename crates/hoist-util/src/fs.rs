use std::path::Path;

use crate::errors::HoistError;

/// Ensure a directory exists, creating it and any parents if needed.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write a file atomically: write to a temp file in the same directory, then
/// rename into place. Readers never observe a partial file.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), HoistError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent).map_err(HoistError::Io)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(HoistError::Io)?;
    std::io::Write::write_all(&mut tmp, contents).map_err(HoistError::Io)?;
    tmp.persist(path)
        .map_err(|e| HoistError::Io(e.error))
        .map(|_| ())
}

/// Remove empty directories walking up from `start`, stopping at (and never
/// removing) `root`. Stops at the first non-empty directory.
pub fn remove_empty_parents(start: &Path, root: &Path) {
    let mut current = start;
    while current != root && current.starts_with(root) {
        let is_empty = std::fs::read_dir(current)
            .map(|mut rd| rd.next().is_none())
            .unwrap_or(false);
        if !is_empty {
            return;
        }
        if std::fs::remove_dir(current).is_err() {
            return;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return,
        }
    }
}
