//! Release bootstrap for Rust hosts.
//!
//! The browser and Node bootstraps are plain scripts (`client.js`,
//! `server.js`). A Rust host reads `meta.json` instead and registers the
//! release itself.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::artifact::ArtifactKey;
use crate::error::{Error, Result};
use crate::release::{Release, ReleaseMeta};

use super::evaluate::Evaluator;
use super::loader::fetch_artifact;
use super::registry::Registry;
use super::transport::Transport;

/// `{host}/releases/{id}/{file}`
pub fn release_url(host: &str, id: &str, file: &str) -> String {
    format!("{}/releases/{}/{}", host.trim_end_matches('/'), id, file)
}

/// Fetch release `id`, register it and make it current.
pub async fn load_release(
    registry: &Registry,
    transport: &dyn Transport,
    host: &str,
    id: &str,
) -> Result<Arc<Release>> {
    let url = release_url(host, id, "meta.json");
    let text = transport.get(&url).await?;
    let meta: ReleaseMeta = serde_json::from_str(&text).map_err(|e| Error::Fetch {
        url: url.clone(),
        message: format!("invalid release metadata: {e}"),
    })?;
    if meta.release.id != id {
        return Err(Error::Fetch {
            url,
            message: format!("metadata describes release '{}'", meta.release.id),
        });
    }

    let release = registry.register_release(meta.release);
    registry.set_current(id);
    tracing::info!(
        "Loaded release {} ({} artifacts, {} loaders)",
        id,
        release.hashes.len(),
        release.loaders.len()
    );
    Ok(release)
}

/// Fetch and register the given artifacts that are not registered yet.
async fn load_artifacts(
    registry: &Registry,
    transport: &dyn Transport,
    evaluator: &dyn Evaluator,
    host: &str,
    keys: Vec<ArtifactKey>,
) -> Result<usize> {
    let missing: Vec<_> = keys
        .into_iter()
        .filter(|key| !registry.contains_item(key))
        .collect();
    let count = missing.len();

    try_join_all(missing.iter().map(|key| {
        let url = key.url(host);
        async move { fetch_artifact(registry, transport, evaluator, key, &url).await }
    }))
    .await?;

    Ok(count)
}

/// Register the loader artifacts of `release`, like `client.js` does.
pub async fn load_loaders(
    registry: &Registry,
    transport: &dyn Transport,
    evaluator: &dyn Evaluator,
    host: &str,
    release: &Release,
) -> Result<usize> {
    let keys = release.loaders.values().cloned().collect();
    load_artifacts(registry, transport, evaluator, host, keys).await
}

/// Register every artifact of `release`. Required before rendering with
/// the eager loader.
pub async fn preload_artifacts(
    registry: &Registry,
    transport: &dyn Transport,
    evaluator: &dyn Evaluator,
    host: &str,
    release: &Release,
) -> Result<usize> {
    let count =
        load_artifacts(registry, transport, evaluator, host, release.artifact_keys().collect())
            .await?;
    tracing::info!("Preloaded {} artifacts of release {}", count, release.id);
    Ok(count)
}
