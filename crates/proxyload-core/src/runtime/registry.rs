//! Process-wide store of loaded artifacts and releases.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::artifact::ArtifactKey;
use crate::error::{Error, Result};
use crate::release::Release;

use super::deps::Dependencies;
use super::loader::Loader;
use super::props::Props;

/// Capacity of the artifact-loaded channel; slow subscribers skip ahead.
const LOADED_CHANNEL_CAPACITY: usize = 256;

/// Renders a component to a JSON view description.
pub type ComponentFn = Arc<dyn Fn(&Props) -> Value + Send + Sync>;

/// What an artifact's factory produces.
#[derive(Clone)]
pub enum Module {
    Component(ComponentFn),
    Loader(Arc<dyn Loader>),
}

impl Module {
    pub fn component(render: impl Fn(&Props) -> Value + Send + Sync + 'static) -> Self {
        Self::Component(Arc::new(render))
    }

    pub fn loader(loader: impl Loader + 'static) -> Self {
        Self::Loader(Arc::new(loader))
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(_) => f.write_str("Module::Component"),
            Self::Loader(_) => f.write_str("Module::Loader"),
        }
    }
}

/// Instantiates an artifact with the injected dependency table.
pub type Factory = Arc<dyn Fn(&Dependencies) -> Result<Module> + Send + Sync>;

/// Wrap a closure as a [`Factory`].
pub fn factory(f: impl Fn(&Dependencies) -> Result<Module> + Send + Sync + 'static) -> Factory {
    Arc::new(f)
}

/// Loaded artifacts and releases. Merges are additive: nothing registered
/// is ever replaced or removed.
pub struct Registry {
    items: RwLock<FxHashMap<ArtifactKey, Factory>>,
    releases: RwLock<FxHashMap<String, Arc<Release>>>,
    current: RwLock<Option<String>>,
    loaded: broadcast::Sender<ArtifactKey>,
}

impl Registry {
    pub fn new() -> Self {
        let (loaded, _) = broadcast::channel(LOADED_CHANNEL_CAPACITY);
        Self {
            items: RwLock::new(FxHashMap::default()),
            releases: RwLock::new(FxHashMap::default()),
            current: RwLock::new(None),
            loaded,
        }
    }

    /// Register an artifact's factory. Returns `false` if `key` was already
    /// registered, in which case the existing factory is kept.
    pub fn register_item(&self, key: ArtifactKey, factory: Factory) -> bool {
        {
            let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
            if items.contains_key(&key) {
                return false;
            }
            items.insert(key.clone(), factory);
        }
        tracing::debug!("Registered artifact {}", key);
        // No subscribers is fine.
        let _ = self.loaded.send(key);
        true
    }

    pub fn item(&self, key: &ArtifactKey) -> Option<Factory> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn contains_item(&self, key: &ArtifactKey) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    pub fn item_count(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Register a release. A release id that is already known keeps its
    /// first registration.
    pub fn register_release(&self, release: Release) -> Arc<Release> {
        let mut releases = self.releases.write().unwrap_or_else(PoisonError::into_inner);
        releases
            .entry(release.id.clone())
            .or_insert_with(|| Arc::new(release))
            .clone()
    }

    pub fn release(&self, id: &str) -> Option<Arc<Release>> {
        self.releases
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// The release `id`, or `ReleaseNotLoaded` naming the bootstrap scripts
    /// under `host` that would provide it.
    pub fn require_release(&self, id: &str, host: &str) -> Result<Arc<Release>> {
        self.release(id).ok_or_else(|| Error::ReleaseNotLoaded {
            release: id.to_string(),
            host: host.trim_end_matches('/').to_string(),
        })
    }

    pub fn set_current(&self, id: impl Into<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(id.into());
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Notifications of every artifact registered from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ArtifactKey> {
        self.loaded.subscribe()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("items", &self.item_count())
            .field("current", &self.current())
            .finish()
    }
}
