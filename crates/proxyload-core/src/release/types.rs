//! Release documents.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactKey, ContentHash, LogicalPath};
use crate::compile::DependencySpec;
use crate::discover::DEFAULT_VARIATION;
use crate::error::Result;
use crate::store;

/// Immutable snapshot of logical path → artifact hash, plus the loader and
/// shared-dependency contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: String,

    /// Content hash of every built leaf.
    pub hashes: BTreeMap<LogicalPath, ContentHash>,

    /// Type → artifact that loads components of that type.
    pub loaders: BTreeMap<String, ArtifactKey>,

    /// Shared dependency contract.
    pub dependencies: BTreeMap<String, DependencySpec>,

    /// `Type/Item` → default variation.
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

impl Release {
    pub fn hash(&self, path: &LogicalPath) -> Option<&ContentHash> {
        self.hashes.get(path)
    }

    pub fn loader(&self, type_name: &str) -> Option<&ArtifactKey> {
        self.loaders.get(type_name)
    }

    /// Default variation of `type_name/item`, `default` when unknown.
    pub fn default_variation(&self, type_name: &str, item: &str) -> &str {
        self.defaults
            .get(&format!("{type_name}/{item}"))
            .map(String::as_str)
            .unwrap_or(DEFAULT_VARIATION)
    }

    /// Keys of every artifact in the release.
    pub fn artifact_keys(&self) -> impl Iterator<Item = ArtifactKey> + '_ {
        self.hashes
            .iter()
            .map(|(path, hash)| ArtifactKey::new(path.clone(), hash.clone()))
    }
}

/// Creation and last-update times of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `releases.json`: every release id that was ever assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseIndex {
    #[serde(default)]
    pub releases: BTreeMap<String, ReleaseRecord>,
}

impl ReleaseIndex {
    /// Read the index, empty when the file does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        store::load_or_default(path, Self::default())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        store::write_json_atomic(path, self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.releases.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&ReleaseRecord> {
        self.releases.get(id)
    }

    /// Record that `id` was (re)assembled at `now`, keeping its creation time.
    pub fn upsert(&mut self, id: &str, now: DateTime<Utc>) -> ReleaseRecord {
        let record = self
            .releases
            .entry(id.to_string())
            .and_modify(|record| record.updated_at = now)
            .or_insert(ReleaseRecord {
                created_at: now,
                updated_at: now,
            });
        *record
    }

    /// Release ids, most recently updated first.
    pub fn newest_first(&self) -> Vec<(&str, &ReleaseRecord)> {
        let mut releases: Vec<_> = self
            .releases
            .iter()
            .map(|(id, record)| (id.as_str(), record))
            .collect();
        releases.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at).then(a.0.cmp(b.0)));
        releases
    }
}

/// `releases/{id}/meta.json`: the release plus its timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMeta {
    #[serde(flatten)]
    pub release: Release,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
