//! Name resolution: `(type, name)` → memoized component.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::error::{Error, Result};
use crate::release::Release;

use super::deps::Dependencies;
use super::loader::{LoaderParams, Render};
use super::props::Props;
use super::registry::{Module, Registry};

/// Specifier under which the resolver injects a handle to itself.
pub const DEFAULT_PROXY_IMPORT: &str = "@proxied";

/// Version used when nothing else names one.
pub const DEFAULT_FALLBACK_VERSION: &str = "latest";

/// Caller-supplied version lookup: `(type, name, variation)` → version.
pub type VersionCallback = Arc<dyn Fn(&str, &str, &str) -> Option<String> + Send + Sync>;

/// Resolver settings.
#[derive(Clone)]
pub struct ResolverOptions {
    /// Base URL artifacts are fetched from.
    pub host: String,

    /// Specifier of the resolver handle in the dependency table.
    pub proxy_import: String,

    /// Pin a release; `None` follows the registry's current release.
    pub release: Option<String>,

    /// Consulted when neither props nor the manifest name a version.
    pub get_version: Option<VersionCallback>,

    pub fallback_version: String,
}

impl ResolverOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            proxy_import: DEFAULT_PROXY_IMPORT.to_string(),
            release: None,
            get_version: None,
            fallback_version: DEFAULT_FALLBACK_VERSION.to_string(),
        }
    }

    pub fn release(mut self, id: impl Into<String>) -> Self {
        self.release = Some(id.into());
        self
    }

    pub fn get_version(
        mut self,
        callback: impl Fn(&str, &str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.get_version = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ResolverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverOptions")
            .field("host", &self.host)
            .field("proxy_import", &self.proxy_import)
            .field("release", &self.release)
            .field("get_version", &self.get_version.is_some())
            .field("fallback_version", &self.fallback_version)
            .finish()
    }
}

/// Where a render's version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    Props,
    Manifest,
    Callback,
    Fallback,
}

/// Variation and version selected for one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub variation: String,
    pub hash: String,
    pub source: VersionSource,
}

/// State shared by the resolver and its components.
struct Context {
    registry: Arc<Registry>,
    options: ResolverOptions,
    dependencies: Dependencies,
}

struct ResolverInner {
    context: Arc<Context>,
    memo: Mutex<HashMap<(String, String, String), Component>>,
}

/// Resolves components by type and name against a release.
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

/// Handle to a resolver, injected into the dependency table so components
/// can resolve sibling components.
#[derive(Clone)]
pub struct ResolverHandle(Weak<ResolverInner>);

impl ResolverHandle {
    /// The resolver, if it is still alive.
    pub fn upgrade(&self) -> Option<Resolver> {
        self.0.upgrade().map(|inner| Resolver { inner })
    }
}

impl Resolver {
    pub fn new(registry: Arc<Registry>, dependencies: Dependencies, options: ResolverOptions) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ResolverInner>| {
            let mut dependencies = dependencies;
            dependencies.insert(options.proxy_import.clone(), ResolverHandle(weak.clone()));
            ResolverInner {
                context: Arc::new(Context {
                    registry,
                    options,
                    dependencies,
                }),
                memo: Mutex::new(HashMap::new()),
            }
        });
        Self { inner }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.context.registry
    }

    /// The dependency table passed to factories (includes the resolver handle).
    pub fn dependencies(&self) -> &Dependencies {
        &self.inner.context.dependencies
    }

    /// Release id this resolver renders against right now.
    fn release_id(&self) -> Result<String> {
        let options = &self.inner.context.options;
        options
            .release
            .clone()
            .or_else(|| self.inner.context.registry.current())
            .ok_or_else(|| {
                Error::Configuration(
                    "no release is current; load a release bootstrap or pin a release".to_string(),
                )
            })
    }

    /// The component `type_name/name` of the active release.
    ///
    /// Nothing is loaded here. The same component is returned for the same
    /// `(release, type, name)`.
    ///
    /// # Errors
    /// `Error::ReleaseNotLoaded` if the active release is not registered.
    pub fn resolve(&self, type_name: &str, name: &str) -> Result<Component> {
        let context = &self.inner.context;
        let release_id = self.release_id()?;
        context
            .registry
            .require_release(&release_id, &context.options.host)?;

        let key = (release_id, type_name.to_string(), name.to_string());
        let mut memo = self.inner.memo.lock().unwrap_or_else(PoisonError::into_inner);
        let component = memo.entry(key).or_insert_with_key(|(release, type_name, name)| {
            tracing::debug!("Resolving {}/{} in release {}", type_name, name, release);
            Component {
                inner: Arc::new(ComponentInner {
                    context: context.clone(),
                    release: release.clone(),
                    type_name: type_name.clone(),
                    name: name.clone(),
                }),
            }
        });
        Ok(component.clone())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("options", &self.inner.context.options)
            .finish()
    }
}

struct ComponentInner {
    context: Arc<Context>,
    release: String,
    type_name: String,
    name: String,
}

/// A component bound to `(release, type, name)`.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn release(&self) -> &str {
        &self.inner.release
    }

    /// Whether both handles are the same memoized component.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn load_release(&self) -> Result<Arc<Release>> {
        let context = &self.inner.context;
        context
            .registry
            .require_release(&self.inner.release, &context.options.host)
    }

    /// Select variation and version for a render with `props`.
    ///
    /// Variation: `props.variation`, else the release default, else
    /// `default`. Version: `props.version`/`props.hash`, else the manifest,
    /// else the version callback, else the fallback.
    pub fn resolve_version(&self, props: &Props) -> Result<ResolvedVersion> {
        let release = self.load_release()?;
        Ok(self.select(&release, props))
    }

    fn select(&self, release: &Release, props: &Props) -> ResolvedVersion {
        let ComponentInner {
            context,
            type_name,
            name,
            ..
        } = self.inner.as_ref();

        let variation = props
            .variation()
            .unwrap_or_else(|| release.default_variation(type_name, name))
            .to_string();

        let manifest_hash = || {
            let path = crate::artifact::LogicalPath::new(type_name, name, &variation).ok()?;
            release.hash(&path).map(|hash| hash.as_str().to_string())
        };
        let callback = || {
            context
                .options
                .get_version
                .as_ref()
                .and_then(|get_version| get_version(type_name, name, &variation))
        };

        let (hash, source) = if let Some(version) = props.version() {
            (version.to_string(), VersionSource::Props)
        } else if let Some(hash) = manifest_hash() {
            (hash, VersionSource::Manifest)
        } else if let Some(version) = callback() {
            (version, VersionSource::Callback)
        } else {
            (context.options.fallback_version.clone(), VersionSource::Fallback)
        };

        ResolvedVersion {
            variation,
            hash,
            source,
        }
    }

    /// Render through the type's loader.
    ///
    /// Missing loaders and broken loader artifacts are logged and yield
    /// [`Render::Unavailable`].
    pub fn render(&self, props: &Props) -> Render {
        let ComponentInner {
            context,
            release: release_id,
            type_name,
            name,
        } = self.inner.as_ref();

        let release = match self.load_release() {
            Ok(release) => release,
            Err(e) => return Render::Unavailable(e.to_string()),
        };
        let selected = self.select(&release, props);

        let loader_key = release.loader(type_name);
        let factory = loader_key.and_then(|key| context.registry.item(key));
        let Some(factory) = factory else {
            let err = Error::LoaderNotFound {
                type_name: type_name.clone(),
                release: release_id.clone(),
                loader: loader_key.map(ToString::to_string),
            };
            tracing::error!("{}", err);
            return Render::Unavailable(err.to_string());
        };

        let loader = match factory(&context.dependencies) {
            Ok(Module::Loader(loader)) => loader,
            Ok(Module::Component(_)) => {
                tracing::error!("Loader artifact for type {} is not a loader", type_name);
                return Render::Unavailable(format!("loader for type {type_name} is not a loader"));
            }
            Err(e) => {
                tracing::error!("Failed to instantiate loader for type {}: {}", type_name, e);
                return Render::Unavailable(e.to_string());
            }
        };

        let params = LoaderParams {
            host: context.options.host.clone(),
            name: name.clone(),
            type_name: type_name.clone(),
            hash: selected.hash,
            variation: selected.variation,
            dependencies: context.dependencies.clone(),
        };
        loader.load(&params, props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Component({}/{} @ {})",
            self.inner.type_name, self.inner.name, self.inner.release
        )
    }
}
