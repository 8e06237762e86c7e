//! Watch command implementation for the proxyload CLI.
//!
//! Rebuilds a release whenever a source module changes.

use std::path::{Path, PathBuf};

use proxyload_server::{DEFAULT_DEBOUNCE, SourceWatcher};

use crate::build::{build_once, load_config, release_builder};
use crate::output::{self, DIM, RESET, YELLOW};

/// Execute the watch command.
pub async fn execute(config_path: &str, release: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let source_dir = config.source_dir.canonicalize()?;
    let dist_dir = config.dist_dir.clone();

    output::header("watch", source_dir.display());
    println!("{DIM}Watching for changes... (Ctrl+C to stop){RESET}");
    println!();

    let (builder, _) = release_builder(config)?;
    if let Err(e) = build_once(&builder, release) {
        println!();
        output::error(output::describe(&e));
    }

    let mut watcher = SourceWatcher::new(&source_dir, DEFAULT_DEBOUNCE)
        .map_err(|e| anyhow::anyhow!("Failed to create file watcher: {}", e))?;

    while let Some(changed) = watcher.recv().await {
        // Output written into the source tree must not trigger another build.
        let dist = resolved(&dist_dir);
        let changed: Vec<_> = changed
            .into_iter()
            .filter(|path| !path.starts_with(&dist))
            .collect();
        let Some(first) = changed.first() else {
            continue;
        };

        println!(
            "\n{YELLOW}{} changed{}, rebuilding...{RESET}",
            first.strip_prefix(&source_dir).unwrap_or(first).display(),
            if changed.len() > 1 {
                format!(" (+{} more)", changed.len() - 1)
            } else {
                String::new()
            }
        );
        if let Err(e) = build_once(&builder, release) {
            println!();
            output::error(output::describe(&e));
        }
    }

    Ok(())
}

fn resolved(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
