//! Built-in repository backed by a local directory tree.
//!
//! Layout mirrors the installed coordinate structure:
//!
//! ```text
//! <root>/<group>/<name>/<version>/
//!     module.toml         # optional metadata
//!     lib-1.0.jar         # artifact files
//! ```
//!
//! `module.toml` names dependencies and per-artifact install options:
//!
//! ```toml
//! dependencies = ["org.example:util:1.0"]
//!
//! [[artifact]]
//! file = "lib-1.0.jar"
//! install = "lib/lib-1.0.jar"   # optional, defaults to the repo layout
//! volatile = false
//! ```
//!
//! Without a manifest, every file in the version directory is an artifact
//! installed at `<group>/<name>/<version>/<file>`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use hoist_core::artifact::Artifact;
use hoist_core::identifier::Identifier;
use hoist_core::repository::{FoundModule, Repository};
use hoist_core::spec::Specification;
use hoist_util::errors::{HoistError, HoistResult};

const MANIFEST_NAME: &str = "module.toml";

#[derive(Debug)]
pub struct DirectoryRepository {
    id: String,
    root: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
struct ModuleManifest {
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default, rename = "artifact")]
    artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Deserialize)]
struct ArtifactEntry {
    file: String,
    #[serde(default)]
    install: Option<String>,
    #[serde(default)]
    volatile: bool,
}

impl DirectoryRepository {
    pub fn new(id: &str, root: PathBuf) -> Self {
        Self {
            id: id.to_owned(),
            root,
        }
    }

    /// Factory for the registry: requires a `path` option.
    ///
    /// # Errors
    /// Configuration error when `path` is missing or not a directory.
    pub fn from_options(id: &str, options: &toml::Table) -> HoistResult<Arc<dyn Repository>> {
        let path = options
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| HoistError::Config {
                message: format!("repository {id}: missing `path` option"),
            })?;
        let root = PathBuf::from(path);
        if !root.is_dir() {
            return Err(HoistError::Config {
                message: format!("repository {id}: {path} is not a directory"),
            }
            .into());
        }
        Ok(Arc::new(Self::new(id, root)))
    }

    fn version_dir(&self, id: &Identifier) -> PathBuf {
        self.root
            .join(&id.group)
            .join(&id.name)
            .join(id.version.as_str())
    }

    fn load_manifest(&self, dir: &Path) -> HoistResult<ModuleManifest> {
        let path = dir.join(MANIFEST_NAME);
        if !path.is_file() {
            return Ok(ModuleManifest::default());
        }
        let text = std::fs::read_to_string(&path).map_err(HoistError::Io)?;
        toml::from_str(&text).map_err(|e| {
            HoistError::Repository {
                message: format!("malformed {}: {e}", path.display()),
            }
            .into()
        })
    }

    /// All candidate identifiers in the tree that the specification allows.
    fn candidates(&self, spec: &Specification) -> Vec<Identifier> {
        let mut found = Vec::new();
        for group in sorted_dirs(&self.root) {
            for name in sorted_dirs(&self.root.join(&group)) {
                for version in sorted_dirs(&self.root.join(&group).join(&name)) {
                    let candidate = Identifier::new(&self.id, &group, &name, &version);
                    if spec.allows(&candidate) {
                        found.push(candidate);
                    }
                }
            }
        }
        found
    }
}

#[async_trait]
impl Repository for DirectoryRepository {
    fn id(&self) -> &str {
        &self.id
    }

    fn technology(&self) -> &str {
        "directory"
    }

    async fn get_module(&self, spec: &Specification) -> HoistResult<Option<FoundModule>> {
        // Best available: the highest matching version.
        let best = self
            .candidates(spec)
            .into_iter()
            .max_by(|a, b| a.version.cmp(&b.version));
        let Some(identifier) = best else {
            return Ok(None);
        };

        let manifest = self.load_manifest(&self.version_dir(&identifier))?;
        let mut dependencies = Vec::new();
        for dep in &manifest.dependencies {
            // Dependency specs carry no technology tag: any repository may
            // satisfy them, and cross-repo disagreement falls to the
            // conflict resolver.
            dependencies.push(Specification::parse("", dep)?);
        }

        Ok(Some(FoundModule {
            identifier,
            dependencies,
        }))
    }

    async fn get_artifacts(&self, id: &Identifier, root: &Path) -> HoistResult<Vec<Artifact>> {
        let dir = self.version_dir(id);
        let manifest = self.load_manifest(&dir)?;
        let default_prefix = PathBuf::from(&id.group)
            .join(&id.name)
            .join(id.version.as_str());

        let mut artifacts = Vec::new();
        if manifest.artifacts.is_empty() {
            for file in sorted_files(&dir) {
                if file == MANIFEST_NAME {
                    continue;
                }
                let source = dir.join(&file);
                artifacts.push(Artifact::new(
                    root.join(default_prefix.join(&file)),
                    format!("file://{}", source.display()),
                    false,
                ));
            }
        } else {
            for entry in &manifest.artifacts {
                let source = dir.join(&entry.file);
                let install = match &entry.install {
                    Some(rel) => {
                        let mut path = root.to_path_buf();
                        for part in rel.split('/') {
                            path.push(part);
                        }
                        path
                    }
                    None => root.join(default_prefix.join(&entry.file)),
                };
                artifacts.push(Artifact::new(
                    install,
                    format!("file://{}", source.display()),
                    entry.volatile,
                ));
            }
        }
        Ok(artifacts)
    }
}

fn sorted_dirs(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .map(|rd| {
            rd.flatten()
                .filter(|e| e.path().is_dir())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn sorted_files(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(path)
        .map(|rd| {
            rd.flatten()
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_module(
        repo_root: &Path,
        group: &str,
        name: &str,
        version: &str,
        manifest: Option<&str>,
        files: &[(&str, &[u8])],
    ) {
        let dir = repo_root.join(group).join(name).join(version);
        std::fs::create_dir_all(&dir).unwrap();
        if let Some(manifest) = manifest {
            std::fs::write(dir.join(MANIFEST_NAME), manifest).unwrap();
        }
        for (file, data) in files {
            std::fs::write(dir.join(file), data).unwrap();
        }
    }

    #[tokio::test]
    async fn picks_best_matching_version() {
        let tmp = tempfile::tempdir().unwrap();
        seed_module(tmp.path(), "org.example", "lib", "1.0", None, &[("a.jar", b"1")]);
        seed_module(tmp.path(), "org.example", "lib", "2.0", None, &[("a.jar", b"2")]);

        let repo = DirectoryRepository::new("local", tmp.path().to_path_buf());
        let spec = Specification::parse("directory", "org.example:lib").unwrap();
        let found = repo.get_module(&spec).await.unwrap().unwrap();
        assert_eq!(found.identifier.coordinate(), "org.example:lib:2.0");
    }

    #[tokio::test]
    async fn version_pattern_restricts_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        seed_module(tmp.path(), "org.example", "lib", "1.4", None, &[("a.jar", b"x")]);
        seed_module(tmp.path(), "org.example", "lib", "2.0", None, &[("a.jar", b"x")]);

        let repo = DirectoryRepository::new("local", tmp.path().to_path_buf());
        let spec = Specification::parse("directory", "org.example:lib:1.*").unwrap();
        let found = repo.get_module(&spec).await.unwrap().unwrap();
        assert_eq!(found.identifier.coordinate(), "org.example:lib:1.4");
    }

    #[tokio::test]
    async fn no_match_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = DirectoryRepository::new("local", tmp.path().to_path_buf());
        let spec = Specification::parse("directory", "org.missing:lib").unwrap();
        assert!(repo.get_module(&spec).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn manifest_dependencies_become_specs() {
        let tmp = tempfile::tempdir().unwrap();
        seed_module(
            tmp.path(),
            "org.example",
            "app",
            "1.0",
            Some("dependencies = [\"org.example:util:1.0\"]\n"),
            &[("app.jar", b"x")],
        );

        let repo = DirectoryRepository::new("local", tmp.path().to_path_buf());
        let spec = Specification::parse("directory", "org.example:app").unwrap();
        let found = repo.get_module(&spec).await.unwrap().unwrap();
        assert_eq!(found.dependencies.len(), 1);
        assert!(found
            .dependencies[0]
            .allows(&Identifier::new("local", "org.example", "util", "1.0")));
    }

    #[tokio::test]
    async fn default_artifacts_mirror_layout() {
        let tmp = tempfile::tempdir().unwrap();
        seed_module(tmp.path(), "org.example", "lib", "1.0", None, &[("lib-1.0.jar", b"x")]);

        let repo = DirectoryRepository::new("local", tmp.path().to_path_buf());
        let id = Identifier::new("local", "org.example", "lib", "1.0");
        let install_root = tmp.path().join("install");
        let artifacts = repo.get_artifacts(&id, &install_root).await.unwrap();

        assert_eq!(artifacts.len(), 1);
        assert_eq!(
            artifacts[0].file,
            install_root.join("org.example/lib/1.0/lib-1.0.jar")
        );
        assert!(!artifacts[0].volatile);
    }

    #[tokio::test]
    async fn manifest_artifacts_override_install_path() {
        let tmp = tempfile::tempdir().unwrap();
        seed_module(
            tmp.path(),
            "org.example",
            "app",
            "1.0",
            Some(concat!(
                "[[artifact]]\n",
                "file = \"app.jar\"\n",
                "install = \"lib/app.jar\"\n",
                "\n",
                "[[artifact]]\n",
                "file = \"config.xml\"\n",
                "install = \"conf/config.xml\"\n",
                "volatile = true\n",
            )),
            &[("app.jar", b"x"), ("config.xml", b"<cfg/>")],
        );

        let repo = DirectoryRepository::new("local", tmp.path().to_path_buf());
        let id = Identifier::new("local", "org.example", "app", "1.0");
        let install_root = tmp.path().join("install");
        let artifacts = repo.get_artifacts(&id, &install_root).await.unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].file, install_root.join("lib/app.jar"));
        assert!(artifacts[1].volatile);
        assert_eq!(artifacts[1].file, install_root.join("conf/config.xml"));
    }

    #[test]
    fn from_options_requires_path() {
        let err = DirectoryRepository::from_options("r1", &toml::Table::new()).unwrap_err();
        assert!(err.to_string().contains("missing `path`"));
    }
}
