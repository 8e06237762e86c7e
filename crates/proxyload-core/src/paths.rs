//! Dist directory layout.
//!
//! Provides one place that knows where build output, releases and the
//! promotion store live, so the CLI, the server and the builder agree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::ArtifactKey;
use crate::error::{IoResultExt, Result};

/// Directory structure of a proxyload dist directory.
///
/// ```text
/// dist/
/// ├── items/                     # Content-addressed artifacts
/// │   └── {type}/{item}/{variation}/{hash}.js
/// ├── releases/
/// │   └── {id}/                  # manifest.json, meta.json, server.js, client.js
/// ├── releases.json              # Release index
/// └── manifests/
///     └── {target}/              # current.json, history.json
/// ```
#[derive(Debug, Clone)]
pub struct DistLayout {
    /// The dist directory itself.
    pub root: PathBuf,

    /// Artifact directory.
    pub items_dir: PathBuf,

    /// Per-release output directory.
    pub releases_dir: PathBuf,

    /// Promotion store directory.
    pub manifests_dir: PathBuf,
}

impl DistLayout {
    /// Describe the layout under `root` without touching the filesystem.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            items_dir: root.join("items"),
            releases_dir: root.join("releases"),
            manifests_dir: root.join("manifests"),
            root,
        }
    }

    /// Describe the layout and create the top-level directories.
    ///
    /// # Errors
    /// Returns an error if directory creation fails.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let layout = Self::new(root);
        for dir in [&layout.items_dir, &layout.releases_dir, &layout.manifests_dir] {
            fs::create_dir_all(dir).at(dir)?;
        }
        Ok(layout)
    }

    /// Path of the release index document.
    pub fn release_index(&self) -> PathBuf {
        self.root.join("releases.json")
    }

    /// Output directory of a single release.
    pub fn release_dir(&self, release_id: &str) -> PathBuf {
        self.releases_dir.join(release_id)
    }

    /// On-disk location of an artifact.
    pub fn artifact_path(&self, key: &ArtifactKey) -> PathBuf {
        let path = key.path();
        self.items_dir
            .join(&path.type_name)
            .join(&path.item)
            .join(&path.variation)
            .join(format!("{}.js", key.hash()))
    }

    /// Promotion store directory of a target.
    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.manifests_dir.join(target)
    }
}
