//! Persisted install state.
//!
//! A single text file of blank-line separated records:
//!
//! ```text
//! url=file:///repo/org/example/lib/1.0/lib-1.0.jar
//! file=org/example/lib/1.0/lib-1.0.jar
//! volatile=true
//! digest=aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d
//! ```
//!
//! `volatile` is omitted when false. Reads tolerate a missing `digest`
//! (artifact counts as modified) and ignore unknown keys for forward
//! compatibility. Writes are deterministic: records sorted by file path,
//! atomic temp-file-and-rename.

use std::path::Path;

use hoist_util::errors::HoistError;
use hoist_util::fs::atomic_write;

use crate::artifact::Artifact;

/// One artifact as recorded in the state file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub url: String,
    /// Path relative to the installation root, forward slashes.
    pub file: String,
    pub volatile: bool,
    pub digest: Option<String>,
}

impl ArtifactRecord {
    pub fn from_artifact(artifact: &Artifact, root: &Path) -> Self {
        Self {
            url: artifact.url.clone(),
            file: artifact.relative_path(root),
            volatile: artifact.volatile,
            digest: artifact.digest.clone(),
        }
    }

    pub fn to_artifact(&self, root: &Path) -> Artifact {
        let mut file = root.to_path_buf();
        for part in self.file.split('/') {
            file.push(part);
        }
        Artifact {
            file,
            url: self.url.clone(),
            volatile: self.volatile,
            digest: self.digest.clone(),
        }
    }
}

/// The persisted state of one installation root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallState {
    pub records: Vec<ArtifactRecord>,
}

impl InstallState {
    pub fn from_artifacts<'a>(artifacts: impl Iterator<Item = &'a Artifact>, root: &Path) -> Self {
        Self {
            records: artifacts
                .map(|a| ArtifactRecord::from_artifact(a, root))
                .collect(),
        }
    }

    pub fn record_for(&self, file: &str) -> Option<&ArtifactRecord> {
        self.records.iter().find(|r| r.file == file)
    }

    /// Parse the state file format.
    ///
    /// # Errors
    /// [`HoistError::StateFileCorrupt`] when a record lacks `url` or `file`.
    pub fn parse(text: &str) -> Result<Self, HoistError> {
        let mut records = Vec::new();
        for (index, block) in text.split("\n\n").enumerate() {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            let mut url = None;
            let mut file = None;
            let mut volatile = false;
            let mut digest = None;
            for line in block.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let Some((key, value)) = line.split_once('=') else {
                    return Err(HoistError::StateFileCorrupt {
                        message: format!("record {}: line without `=`: {line}", index + 1),
                    });
                };
                match key.trim() {
                    "url" => url = Some(value.trim().to_owned()),
                    "file" => file = Some(value.trim().to_owned()),
                    "volatile" => volatile = value.trim() == "true",
                    "digest" => digest = Some(value.trim().to_lowercase()),
                    // Unknown keys are ignored for forward compatibility.
                    _ => {}
                }
            }
            let (Some(url), Some(file)) = (url, file) else {
                return Err(HoistError::StateFileCorrupt {
                    message: format!("record {}: missing url or file", index + 1),
                });
            };
            records.push(ArtifactRecord {
                url,
                file,
                volatile,
                digest,
            });
        }
        Ok(Self { records })
    }

    /// Serialize deterministically: records sorted by file path, `volatile`
    /// omitted when false.
    pub fn serialize(&self) -> String {
        let mut sorted: Vec<&ArtifactRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| a.file.cmp(&b.file));

        let mut out = String::new();
        for (i, record) in sorted.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("url={}\n", record.url));
            out.push_str(&format!("file={}\n", record.file));
            if record.volatile {
                out.push_str("volatile=true\n");
            }
            if let Some(digest) = &record.digest {
                out.push_str(&format!("digest={digest}\n"));
            }
        }
        out
    }

    /// Load prior state. A missing file yields empty state; a corrupt file
    /// is warned about and treated as absent.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match Self::parse(&text) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("ignoring corrupt state file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Write the state atomically.
    ///
    /// # Errors
    /// I/O failure writing the file.
    pub fn save(&self, path: &Path) -> Result<(), HoistError> {
        atomic_write(path, self.serialize().as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(file: &str, digest: Option<&str>) -> ArtifactRecord {
        ArtifactRecord {
            url: format!("file:///repo/{file}"),
            file: file.to_owned(),
            volatile: false,
            digest: digest.map(str::to_owned),
        }
    }

    #[test]
    fn round_trip() {
        let state = InstallState {
            records: vec![
                record("b/lib.jar", Some("abc123")),
                ArtifactRecord {
                    url: "file:///repo/a/config.xml".into(),
                    file: "a/config.xml".into(),
                    volatile: true,
                    digest: Some("def456".into()),
                },
            ],
        };
        let parsed = InstallState::parse(&state.serialize()).unwrap();
        // Serialization sorts by file path.
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].file, "a/config.xml");
        assert!(parsed.records[0].volatile);
        assert_eq!(parsed.records[1].file, "b/lib.jar");
        assert_eq!(parsed.records[1].digest.as_deref(), Some("abc123"));
    }

    #[test]
    fn volatile_omitted_when_false() {
        let state = InstallState {
            records: vec![record("lib.jar", Some("abc"))],
        };
        let text = state.serialize();
        assert!(!text.contains("volatile"));
    }

    #[test]
    fn missing_digest_tolerated() {
        let text = "url=file:///r/lib.jar\nfile=lib.jar\n";
        let state = InstallState::parse(text).unwrap();
        assert_eq!(state.records[0].digest, None);
    }

    #[test]
    fn unknown_keys_ignored() {
        let text = "url=file:///r/lib.jar\nfile=lib.jar\nfuture-key=whatever\ndigest=abc\n";
        let state = InstallState::parse(text).unwrap();
        assert_eq!(state.records.len(), 1);
        assert_eq!(state.records[0].digest.as_deref(), Some("abc"));
    }

    #[test]
    fn missing_url_is_corrupt() {
        let text = "file=lib.jar\ndigest=abc\n";
        assert!(InstallState::parse(text).is_err());
    }

    #[test]
    fn load_missing_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let state = InstallState::load(&tmp.path().join("absent"));
        assert!(state.records.is_empty());
    }

    #[test]
    fn load_corrupt_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state");
        std::fs::write(&path, "not a record at all").unwrap();
        let state = InstallState::load(&path);
        assert!(state.records.is_empty());
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sub/state");
        let state = InstallState {
            records: vec![record("lib.jar", Some("abc"))],
        };
        state.save(&path).unwrap();
        assert_eq!(InstallState::load(&path), state);
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = InstallState {
            records: vec![record("z.jar", None), record("a.jar", None)],
        };
        let b = InstallState {
            records: vec![record("a.jar", None), record("z.jar", None)],
        };
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn record_artifact_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let artifact = Artifact {
            file: root.join("org/example/lib.jar"),
            url: "file:///src/lib.jar".into(),
            volatile: true,
            digest: Some("abc".into()),
        };
        let record = ArtifactRecord::from_artifact(&artifact, root);
        assert_eq!(record.file, "org/example/lib.jar");
        let back = record.to_artifact(root);
        assert_eq!(back.file, artifact.file);
        assert_eq!(back.digest, artifact.digest);
        assert!(back.volatile);
    }
}
