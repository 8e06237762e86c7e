//! Runtime registry, resolver and loaders.
//!
//! ```text
//! Resolver::resolve(type, name) ──► Component (memoized per release/type/name)
//!                                       │ render(props)
//!                                       ▼
//!                 release.loaders[type] ──► Loader ──► Registry.items[key]
//!                                                         │ missing
//!                                                         ▼
//!                                       Transport.get(url) ──► Evaluator
//! ```

pub mod bootstrap;
mod deps;
mod evaluate;
mod loader;
mod props;
mod registry;
mod resolver;
mod transport;

pub use bootstrap::{load_loaders, load_release, preload_artifacts, release_url};
pub use deps::{Dependencies, SharedValue};
pub use evaluate::{Evaluator, StaticEvaluator};
pub use loader::{
    EagerLoader, LazyLoader, Loader, LoaderParams, PendingArtifact, Render, loader_factory,
};
pub use props::{Handler, Props};
pub use registry::{ComponentFn, Factory, Module, Registry, factory};
pub use resolver::{
    Component, DEFAULT_FALLBACK_VERSION, DEFAULT_PROXY_IMPORT, ResolvedVersion, Resolver,
    ResolverHandle, ResolverOptions, VersionCallback, VersionSource,
};
pub use transport::{FsTransport, HttpTransport, Transport};
