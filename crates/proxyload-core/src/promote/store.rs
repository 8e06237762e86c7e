//! Per-target release pointers with bounded history.
//!
//! A promotion rewrites two documents, `current.json` and `history.json`.
//! Both are first written together to a journal (`pending.json`), then
//! replaced one by one, then the journal is removed. A journal left behind by
//! a crash is replayed before the next read or write of that target, so the
//! two documents never disagree for longer than one interrupted promotion.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;

use crate::error::{Error, IoResultExt, Result};
use crate::paths::DistLayout;
use crate::release::ReleaseIndex;
use crate::store;

use super::types::{
    CurrentDocument, CurrentEntry, HISTORY_LIMIT, HistoryDocument, HistoryEntry, Journal,
    Promotion, Targets,
};

const CURRENT_FILE: &str = "current.json";
const HISTORY_FILE: &str = "history.json";
const JOURNAL_FILE: &str = "pending.json";
const LOCK_FILE: &str = ".lock";

/// Exclusive advisory lock on a target directory, released on drop.
struct TargetLock(File);

impl TargetLock {
    fn acquire(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).at(dir)?;
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .at(&path)?;
        file.lock_exclusive().at(&path)?;
        Ok(Self(file))
    }
}

impl Drop for TargetLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

/// Reads and updates the promotion store of a dist directory.
#[derive(Debug, Clone)]
pub struct PromotionStore {
    /// Directory holding `targets.json`
    source_dir: PathBuf,

    layout: DistLayout,
}

impl PromotionStore {
    pub fn new(source_dir: impl AsRef<Path>, dist_dir: impl AsRef<Path>) -> Self {
        Self {
            source_dir: source_dir.as_ref().to_path_buf(),
            layout: DistLayout::new(dist_dir),
        }
    }

    pub fn targets_path(&self) -> PathBuf {
        self.source_dir.join("targets.json")
    }

    /// Declared targets; empty when `targets.json` does not exist.
    pub fn targets(&self) -> Result<Targets> {
        store::load_or_default(self.targets_path(), Targets::default())
    }

    /// The release index of the dist directory.
    pub fn releases(&self) -> Result<ReleaseIndex> {
        ReleaseIndex::load(self.layout.release_index())
    }

    /// Current release per environment of `target`.
    pub fn current(&self, target: &str) -> Result<CurrentDocument> {
        let dir = self.layout.target_dir(target);
        self.read_recovered(&dir, CURRENT_FILE)
    }

    /// Promotion log per environment of `target`.
    pub fn history(&self, target: &str) -> Result<HistoryDocument> {
        let dir = self.layout.target_dir(target);
        self.read_recovered(&dir, HISTORY_FILE)
    }

    /// Replay an interrupted promotion of `target`, if any.
    ///
    /// Returns whether a journal was replayed.
    pub fn recover(&self, target: &str) -> Result<bool> {
        let dir = self.layout.target_dir(target);
        if !dir.join(JOURNAL_FILE).exists() {
            return Ok(false);
        }
        let _lock = TargetLock::acquire(&dir)?;
        replay_journal(&dir)
    }

    /// Make `release` current for `target`/`environment`.
    pub fn promote(&self, target: &str, environment: &str, release: &str) -> Result<Promotion> {
        self.promote_at(target, environment, release, Utc::now())
    }

    /// Make `release` current, stamping the change with `now`.
    ///
    /// # Errors
    /// `Error::Configuration` if the target is not declared, the environment
    /// is not declared for it, or the release was never assembled. Nothing
    /// is written in that case.
    pub fn promote_at(
        &self,
        target: &str,
        environment: &str,
        release: &str,
        now: DateTime<Utc>,
    ) -> Result<Promotion> {
        let targets = self.targets()?;
        let declared = targets.get(target).ok_or_else(|| {
            Error::Configuration(format!(
                "target {} not found in {}",
                target,
                self.targets_path().display()
            ))
        })?;
        if !declared.has_environment(environment) {
            return Err(Error::Configuration(format!(
                "environment {environment} not found for target {target}"
            )));
        }
        if !self.releases()?.contains(release) {
            return Err(Error::Configuration(format!(
                "release {release} not found in releases"
            )));
        }

        let dir = self.layout.target_dir(target);
        let _lock = TargetLock::acquire(&dir)?;
        replay_journal(&dir)?;

        let mut current: CurrentDocument =
            store::load_or_default(dir.join(CURRENT_FILE), CurrentDocument::new())?;
        let mut history: HistoryDocument =
            store::load_or_default(dir.join(HISTORY_FILE), HistoryDocument::new())?;

        let previous = current
            .insert(
                environment.to_string(),
                CurrentEntry {
                    current: release.to_string(),
                    updated_at: now,
                },
            )
            .map(|entry| entry.current);

        let log = &mut history.entry(environment.to_string()).or_default().history;
        log.insert(
            0,
            HistoryEntry {
                name: release.to_string(),
                updated_at: now,
            },
        );
        log.truncate(HISTORY_LIMIT);

        let journal = Journal { current, history };
        store::write_json_atomic(dir.join(JOURNAL_FILE), &journal)?;
        apply_journal(&dir, &journal)?;

        tracing::info!(
            "Promoted {} to {}/{} (was {})",
            release,
            target,
            environment,
            previous.as_deref().unwrap_or("none")
        );

        Ok(Promotion {
            target: target.to_string(),
            environment: environment.to_string(),
            release: release.to_string(),
            previous,
            updated_at: now,
        })
    }

    fn read_recovered<T>(&self, dir: &Path, file: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if !dir.exists() {
            return Ok(T::default());
        }
        if dir.join(JOURNAL_FILE).exists() {
            let _lock = TargetLock::acquire(dir)?;
            replay_journal(dir)?;
        }
        store::load_or_default(dir.join(file), T::default())
    }
}

/// Write both documents of `journal`, then drop the journal.
fn apply_journal(dir: &Path, journal: &Journal) -> Result<()> {
    store::write_json_atomic(dir.join(CURRENT_FILE), &journal.current)?;
    store::write_json_atomic(dir.join(HISTORY_FILE), &journal.history)?;

    let path = dir.join(JOURNAL_FILE);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(&path, e)),
    }
}

/// Caller must hold the target lock.
fn replay_journal(dir: &Path) -> Result<bool> {
    let path = dir.join(JOURNAL_FILE);
    let Some(journal) = store::load_or_default::<Option<Journal>>(&path, None)? else {
        return Ok(false);
    };
    tracing::warn!("Replaying interrupted promotion in {}", dir.display());
    apply_journal(dir, &journal)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PromotionStore) {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dist = temp.path().join("dist");
        fs::create_dir_all(&src).unwrap();
        fs::write(
            src.join("targets.json"),
            r#"{ "web": { "name": "web", "environments": ["staging", "production"] } }"#,
        )
        .unwrap();

        let mut index = ReleaseIndex::default();
        for i in 0..40 {
            index.upsert(&format!("v{i}"), Utc.timestamp_opt(i, 0).unwrap());
        }
        index.save(DistLayout::new(&dist).release_index()).unwrap();

        let store = PromotionStore::new(&src, &dist);
        (temp, store)
    }

    #[test]
    fn test_promote_updates_current_and_history() {
        let (_temp, store) = setup();
        let now = Utc.timestamp_opt(1_000, 0).unwrap();

        let first = store.promote_at("web", "production", "v1", now).unwrap();
        assert_eq!(first.previous, None);
        let second = store.promote_at("web", "production", "v2", now).unwrap();
        assert_eq!(second.previous.as_deref(), Some("v1"));

        let current = store.current("web").unwrap();
        assert_eq!(current["production"].current, "v2");
        assert!(!current.contains_key("staging"));

        let history = store.history("web").unwrap();
        let names: Vec<_> = history["production"]
            .history
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["v2", "v1"]);
    }

    #[test]
    fn test_validation_writes_nothing() {
        let (_temp, store) = setup();

        for (target, env, release) in [
            ("mobile", "production", "v1"),
            ("web", "dev", "v1"),
            ("web", "production", "v99"),
        ] {
            let err = store.promote(target, env, release).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{target}/{env}/{release}");
        }
        assert!(!store.layout.target_dir("web").exists());
    }

    #[test]
    fn test_journal_is_replayed_before_read() {
        let (_temp, store) = setup();
        let now = Utc.timestamp_opt(5, 0).unwrap();
        store.promote_at("web", "staging", "v1", now).unwrap();

        // A promotion that crashed after writing its journal.
        let dir = store.layout.target_dir("web");
        let mut journal = Journal {
            current: store.current("web").unwrap(),
            history: store.history("web").unwrap(),
        };
        journal.current.insert(
            "staging".to_string(),
            CurrentEntry {
                current: "v2".to_string(),
                updated_at: now,
            },
        );
        store::write_json_atomic(dir.join(JOURNAL_FILE), &journal).unwrap();

        assert_eq!(store.current("web").unwrap()["staging"].current, "v2");
        assert!(!dir.join(JOURNAL_FILE).exists());
        assert!(!store.recover("web").unwrap());
    }
}
