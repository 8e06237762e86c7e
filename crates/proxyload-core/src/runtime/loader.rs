//! Loader strategies.
//!
//! A loader is itself an artifact, designated per type in the release. It
//! receives the resolved coordinates of a component and renders it. Two
//! strategies ship: [`EagerLoader`] renders only what is already registered
//! (server rendering after a preload), [`LazyLoader`] fetches missing
//! artifacts on first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;

use crate::artifact::{ArtifactKey, ContentHash, LogicalPath};
use crate::error::{Error, Result};

use super::deps::Dependencies;
use super::evaluate::Evaluator;
use super::props::Props;
use super::registry::{Factory, Module, Registry, factory};
use super::transport::Transport;

/// Everything a loader needs to locate and render one component.
#[derive(Debug, Clone)]
pub struct LoaderParams {
    pub host: String,
    pub name: String,
    pub type_name: String,
    pub hash: String,
    pub variation: String,
    pub dependencies: Dependencies,
}

impl LoaderParams {
    pub fn logical_path(&self) -> Result<LogicalPath> {
        LogicalPath::new(&self.type_name, &self.name, &self.variation)
    }

    pub fn artifact_key(&self) -> Result<ArtifactKey> {
        if self.hash.is_empty() || self.hash.contains('/') {
            return Err(Error::InvalidPath(format!("'{}' is not a valid hash", self.hash)));
        }
        Ok(ArtifactKey::new(
            self.logical_path()?,
            ContentHash::from_raw(&self.hash),
        ))
    }

    /// `{host}/items/{type}/{name}/{variation}/{hash}.js`
    pub fn url(&self) -> Result<String> {
        Ok(self.artifact_key()?.url(&self.host))
    }
}

type SharedFetch = Shared<BoxFuture<'static, std::result::Result<(), Arc<Error>>>>;

/// An artifact fetch in progress. Clones share the same operation.
#[derive(Clone)]
pub struct PendingArtifact {
    key: ArtifactKey,
    fetch: SharedFetch,
}

impl PendingArtifact {
    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    /// Wait for the artifact to be registered; render again afterwards.
    pub async fn ready(&self) -> std::result::Result<(), Arc<Error>> {
        self.fetch.clone().await
    }
}

impl fmt::Debug for PendingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PendingArtifact").field(&self.key).finish()
    }
}

/// Outcome of rendering a component.
#[derive(Debug, Clone)]
pub enum Render {
    /// Rendered output.
    Ready(Value),
    /// The artifact is being fetched; render again once it is ready.
    Pending(PendingArtifact),
    /// The component cannot be rendered; the reason has been logged.
    Unavailable(String),
}

impl Render {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Renders components of one type.
pub trait Loader: Send + Sync {
    fn load(&self, params: &LoaderParams, props: &Props) -> Render;
}

/// Instantiate a registered artifact and render it.
fn render_factory(key: &ArtifactKey, factory: &Factory, deps: &Dependencies, props: &Props) -> Render {
    match factory(deps) {
        Ok(Module::Component(render)) => Render::Ready(render(props)),
        Ok(Module::Loader(_)) => {
            tracing::error!("Artifact {} is a loader, not a component", key);
            Render::Unavailable(format!("artifact {key} is not a component"))
        }
        Err(e) => {
            tracing::error!("Failed to instantiate {}: {}", key, e);
            Render::Unavailable(e.to_string())
        }
    }
}

/// Factory that hands out one shared loader instance.
pub fn loader_factory(loader: impl Loader + 'static) -> Factory {
    let loader: Arc<dyn Loader> = Arc::new(loader);
    factory(move |_| Ok(Module::Loader(loader.clone())))
}

/// Fetch, evaluate and register one artifact.
pub(crate) async fn fetch_artifact(
    registry: &Registry,
    transport: &dyn Transport,
    evaluator: &dyn Evaluator,
    key: &ArtifactKey,
    url: &str,
) -> Result<()> {
    let code = transport.get(url).await?;
    let factory = evaluator.evaluate(key, &code)?;
    registry.register_item(key.clone(), factory);
    Ok(())
}

/// Renders from the registry only. Every artifact must have been loaded
/// beforehand (see [`preload_artifacts`](super::bootstrap::preload_artifacts)).
#[derive(Debug, Clone)]
pub struct EagerLoader {
    registry: Arc<Registry>,
}

impl EagerLoader {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Factory producing this loader, for registration under a loader key.
    pub fn into_factory(self) -> Factory {
        loader_factory(self)
    }
}

impl Loader for EagerLoader {
    fn load(&self, params: &LoaderParams, props: &Props) -> Render {
        let key = match params.artifact_key() {
            Ok(key) => key,
            Err(e) => return Render::Unavailable(e.to_string()),
        };
        match self.registry.item(&key) {
            Some(factory) => render_factory(&key, &factory, &params.dependencies, props),
            None => {
                tracing::error!("Artifact {} was not preloaded", key);
                Render::Unavailable(format!("artifact {key} is not loaded"))
            }
        }
    }
}

/// Fetches artifacts on first render, one fetch per artifact key.
///
/// Clones share the in-flight table.
#[derive(Clone)]
pub struct LazyLoader {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    evaluator: Arc<dyn Evaluator>,
    timeout: Option<Duration>,
    in_flight: Arc<Mutex<HashMap<ArtifactKey, SharedFetch>>>,
}

impl LazyLoader {
    pub fn new(
        registry: Arc<Registry>,
        transport: Arc<dyn Transport>,
        evaluator: Arc<dyn Evaluator>,
    ) -> Self {
        Self {
            registry,
            transport,
            evaluator,
            timeout: None,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fail fetches that take longer than `timeout`. Requires a Tokio runtime.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Factory producing this loader. All instances share one in-flight table.
    pub fn into_factory(self) -> Factory {
        loader_factory(self)
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn start_fetch(&self, key: ArtifactKey, url: String) -> SharedFetch {
        let registry = self.registry.clone();
        let transport = self.transport.clone();
        let evaluator = self.evaluator.clone();
        let in_flight = self.in_flight.clone();
        let timeout = self.timeout;

        async move {
            let fetch = fetch_artifact(&registry, transport.as_ref(), evaluator.as_ref(), &key, &url);
            let result = match timeout {
                Some(timeout) => tokio::time::timeout(timeout, fetch)
                    .await
                    .unwrap_or(Err(Error::FetchTimeout {
                        url: url.clone(),
                        timeout,
                    })),
                None => fetch.await,
            };

            // Registered before removal, so a render that misses the table
            // finds the artifact in the registry.
            in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);

            if let Err(e) = &result {
                tracing::warn!("Failed to load {}: {}", key, e);
            }
            result.map_err(Arc::new)
        }
        .boxed()
        .shared()
    }
}

impl Loader for LazyLoader {
    fn load(&self, params: &LoaderParams, props: &Props) -> Render {
        let (key, url) = match params.artifact_key() {
            Ok(key) => {
                let url = key.url(&params.host);
                (key, url)
            }
            Err(e) => return Render::Unavailable(e.to_string()),
        };

        if let Some(factory) = self.registry.item(&key) {
            return render_factory(&key, &factory, &params.dependencies, props);
        }

        let fetch = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            // A fetch may have completed since the check above.
            if let Some(factory) = self.registry.item(&key) {
                drop(in_flight);
                return render_factory(&key, &factory, &params.dependencies, props);
            }
            match in_flight.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    tracing::debug!("Fetching {}", url);
                    let fetch = self.start_fetch(key.clone(), url);
                    in_flight.insert(key.clone(), fetch.clone());
                    if let Ok(handle) = tokio::runtime::Handle::try_current() {
                        handle.spawn(fetch.clone());
                    }
                    fetch
                }
            }
        };

        Render::Pending(PendingArtifact { key, fetch })
    }
}

impl fmt::Debug for LazyLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyLoader")
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
