//! Release assembly.
//!
//! The complete output of a release is planned in memory before anything is
//! written, so a broken loader reference never leaves a partial release in
//! the dist directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::artifact::{Artifact, LogicalPath};
use crate::compile::{BuildConfig, DependencySpec};
use crate::error::{Error, Result};
use crate::paths::DistLayout;
use crate::store;

use super::bootstrap::{client_bootstrap, server_bootstrap};
use super::types::{Release, ReleaseIndex, ReleaseMeta, ReleaseRecord};

/// Everything a release writes, computed up front.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub release: Release,
    pub artifacts: Vec<Artifact>,
    pub manifest_json: String,
    pub server_js: String,
    pub client_js: String,
}

/// Outcome of a written release.
#[derive(Debug, Clone)]
pub struct AssembledRelease {
    pub release: Release,
    pub record: ReleaseRecord,
    /// Output directory `releases/{id}`.
    pub dir: PathBuf,
    /// Artifacts whose file content changed.
    pub written_artifacts: usize,
}

/// Aggregates artifacts into a release and persists it.
#[derive(Debug, Clone)]
pub struct ReleaseAssembler {
    layout: DistLayout,
    namespace: String,
    loaders: BTreeMap<String, String>,
    dependencies: BTreeMap<String, DependencySpec>,
}

impl ReleaseAssembler {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            layout: config.layout(),
            namespace: config.namespace.clone(),
            loaders: config.loaders.clone(),
            dependencies: config.dependencies.clone(),
        }
    }

    pub fn layout(&self) -> &DistLayout {
        &self.layout
    }

    /// Plan release `id` from `artifacts` without touching the filesystem.
    ///
    /// # Errors
    /// `Error::Build` if a configured loader does not name a built artifact.
    pub fn plan(
        &self,
        id: &str,
        artifacts: Vec<Artifact>,
        defaults: BTreeMap<String, String>,
    ) -> Result<ReleasePlan> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(Error::Configuration(format!("invalid release id '{id}'")));
        }

        let by_path: BTreeMap<&LogicalPath, &Artifact> =
            artifacts.iter().map(|a| (a.path(), a)).collect();

        let mut loaders = BTreeMap::new();
        let mut loader_code = Vec::new();
        for (type_name, loader) in &self.loaders {
            let path: LogicalPath = loader.parse()?;
            let artifact = by_path.get(&path).ok_or_else(|| Error::Build {
                entry: None,
                message: format!(
                    "loader for type '{type_name}' is {path}, which is not part of the build"
                ),
            })?;
            loaders.insert(type_name.clone(), artifact.key.clone());
            loader_code.push(artifact.code.as_str());
        }

        let release = Release {
            id: id.to_string(),
            hashes: artifacts
                .iter()
                .map(|a| (a.path().clone(), a.hash().clone()))
                .collect(),
            loaders,
            dependencies: self.dependencies.clone(),
            defaults,
        };

        let manifest_json = store::to_pretty_json(&release.hashes)?;
        let server_js = server_bootstrap(&self.namespace, &release)?;
        let client_js = client_bootstrap(&self.namespace, &release, loader_code)?;

        Ok(ReleasePlan {
            release,
            artifacts,
            manifest_json,
            server_js,
            client_js,
        })
    }

    /// Write a planned release, stamping the index with `now`.
    pub fn write_at(&self, plan: ReleasePlan, now: DateTime<Utc>) -> Result<AssembledRelease> {
        let ReleasePlan {
            release,
            artifacts,
            manifest_json,
            server_js,
            client_js,
        } = plan;

        let mut written_artifacts = 0;
        for artifact in &artifacts {
            let path = self.layout.artifact_path(&artifact.key);
            if store::write_if_changed(&path, artifact.code.as_bytes())? {
                tracing::debug!("Wrote {}", path.display());
                written_artifacts += 1;
            }
        }

        let index_path = self.layout.release_index();
        let mut index = ReleaseIndex::load(&index_path)?;
        let record = index.upsert(&release.id, now);
        index.save(&index_path)?;

        let dir = self.layout.release_dir(&release.id);
        store::write_atomic(dir.join("manifest.json"), manifest_json.as_bytes())?;
        store::write_json_atomic(
            dir.join("meta.json"),
            &ReleaseMeta {
                release: release.clone(),
                created_at: record.created_at,
                updated_at: record.updated_at,
            },
        )?;
        store::write_atomic(dir.join("server.js"), server_js.as_bytes())?;
        store::write_atomic(dir.join("client.js"), client_js.as_bytes())?;

        tracing::info!(
            "Assembled release {} ({} artifacts, {} changed)",
            release.id,
            release.hashes.len(),
            written_artifacts
        );

        Ok(AssembledRelease {
            release,
            record,
            dir,
            written_artifacts,
        })
    }

    /// Plan and write release `id` at `now`.
    pub fn assemble_at(
        &self,
        id: &str,
        artifacts: Vec<Artifact>,
        defaults: BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<AssembledRelease> {
        let plan = self.plan(id, artifacts, defaults)?;
        self.write_at(plan, now)
    }

    pub fn assemble(
        &self,
        id: &str,
        artifacts: Vec<Artifact>,
        defaults: BTreeMap<String, String>,
    ) -> Result<AssembledRelease> {
        self.assemble_at(id, artifacts, defaults, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactKey, ContentHash};
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn artifact(path: &str, body: &str) -> Artifact {
        let key = ArtifactKey::new(path.parse().unwrap(), ContentHash::of(body));
        Artifact {
            code: format!("/* {key} */ {body}\n"),
            key,
        }
    }

    fn assembler(dist: &std::path::Path) -> ReleaseAssembler {
        let config = BuildConfig {
            dist_dir: dist.to_path_buf(),
            loaders: BTreeMap::from([(
                "Component".to_string(),
                "Loader/Component/default".to_string(),
            )]),
            ..Default::default()
        };
        ReleaseAssembler::new(&config)
    }

    fn artifacts() -> Vec<Artifact> {
        vec![
            artifact("Component/Button/default", "return A;"),
            artifact("Loader/Component/default", "return L;"),
        ]
    }

    #[test]
    fn test_assemble_writes_layout() {
        let temp = TempDir::new().unwrap();
        let assembler = assembler(temp.path());
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

        let out = assembler
            .assemble_at("v1", artifacts(), BTreeMap::new(), now)
            .unwrap();

        assert_eq!(out.written_artifacts, 2);
        assert_eq!(out.release.loaders["Component"].path().to_string(), "Loader/Component/default");
        for file in ["manifest.json", "meta.json", "server.js", "client.js"] {
            assert!(out.dir.join(file).is_file(), "{file} missing");
        }
        let client = fs::read_to_string(out.dir.join("client.js")).unwrap();
        assert!(client.contains("return L;"));
        assert!(!client.contains("return A;"));

        let index = ReleaseIndex::load(assembler.layout().release_index()).unwrap();
        assert_eq!(index.get("v1").unwrap().created_at, now);
    }

    #[test]
    fn test_missing_loader_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let assembler = assembler(temp.path());

        let err = assembler
            .assemble("v1", vec![artifact("Component/Button/default", "return A;")], BTreeMap::new())
            .unwrap_err();

        assert!(matches!(err, Error::Build { .. }));
        assert!(err.to_string().contains("Loader/Component/default"));
        assert!(!temp.path().join("items").exists());
        assert!(!temp.path().join("releases.json").exists());
    }

    #[test]
    fn test_rerun_is_byte_identical_and_keeps_created_at() {
        let temp = TempDir::new().unwrap();
        let assembler = assembler(temp.path());
        let first = Utc.timestamp_opt(100, 0).unwrap();
        let second = Utc.timestamp_opt(200, 0).unwrap();

        let out = assembler
            .assemble_at("v1", artifacts(), BTreeMap::new(), first)
            .unwrap();
        let read = |name: &str| fs::read(out.dir.join(name)).unwrap();
        let before = (read("manifest.json"), read("server.js"), read("client.js"));

        let again = assembler
            .assemble_at("v1", artifacts(), BTreeMap::new(), second)
            .unwrap();
        let after = (read("manifest.json"), read("server.js"), read("client.js"));

        assert_eq!(before, after);
        assert_eq!(again.written_artifacts, 0);
        assert_eq!(again.record.created_at, first);
        assert_eq!(again.record.updated_at, second);
    }

    #[test]
    fn test_invalid_release_id() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            assembler(temp.path()).plan("../v1", artifacts(), BTreeMap::new()),
            Err(Error::Configuration(_))
        ));
    }
}
