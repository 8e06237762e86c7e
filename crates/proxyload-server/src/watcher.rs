//! Source tree watcher.
//!
//! Watches a component source tree recursively and reports batches of
//! changed module files, debounced so an editor's save burst triggers one
//! rebuild.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify_debouncer_mini::{DebounceEventResult, new_debouncer, notify::RecursiveMode};
use tokio::sync::mpsc;

use crate::error::{ServerError, ServerResult};

/// Extensions of files that affect a build.
const WATCHED_EXTENSIONS: [&str; 6] = ["tsx", "ts", "jsx", "js", "css", "json"];

/// Directories never reported.
const IGNORED_DIRS: [&str; 2] = ["node_modules", ".git"];

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Whether a change to `path` can affect a build.
pub fn is_source_file(path: &Path) -> bool {
    if path
        .components()
        .any(|c| IGNORED_DIRS.iter().any(|dir| c.as_os_str() == *dir))
    {
        return false;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WATCHED_EXTENSIONS.contains(&ext))
}

/// Watcher handle for a source tree.
pub struct SourceWatcher {
    /// Debouncer handle (kept alive to maintain watcher).
    _debouncer: notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>,
    /// Receiver for batches of changed paths.
    rx: mpsc::UnboundedReceiver<Vec<PathBuf>>,
}

impl SourceWatcher {
    /// Watch `root` recursively.
    pub fn new(root: impl AsRef<Path>, debounce: Duration) -> ServerResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ServerError::Watch(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let mut changed: Vec<PathBuf> = events
                        .into_iter()
                        .map(|event| event.path)
                        .filter(|path| is_source_file(path))
                        .collect();
                    changed.sort();
                    changed.dedup();
                    if !changed.is_empty() {
                        let _ = tx.send(changed);
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })
        .map_err(|e| ServerError::Watch(e.to_string()))?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| ServerError::Watch(e.to_string()))?;

        tracing::debug!("Watching {}", root.display());
        Ok(Self {
            _debouncer: debouncer,
            rx,
        })
    }

    /// Receive the next batch of changed files.
    pub async fn recv(&mut self) -> Option<Vec<PathBuf>> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_source_file() {
        assert!(is_source_file(Path::new("src/Component/Button/default/index.tsx")));
        assert!(is_source_file(Path::new("src/targets.json")));
        assert!(!is_source_file(Path::new("src/Component/Button/default/notes.md")));
        assert!(!is_source_file(Path::new("src/node_modules/react/index.js")));
        assert!(!is_source_file(Path::new("src/Component")));
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let temp = TempDir::new().unwrap();
        assert!(SourceWatcher::new(temp.path(), DEFAULT_DEBOUNCE).is_ok());
        assert!(SourceWatcher::new(temp.path().join("missing"), DEFAULT_DEBOUNCE).is_err());
    }
}
