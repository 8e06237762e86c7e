//! Core engine for proxyload: independently deployed UI components.
//!
//! This crate provides:
//! - Discovery of the type → item → variation component tree
//! - The build pipeline (compile service seam, import rewrite, content hashing)
//! - Release assembly and bootstrap scripts
//! - The runtime registry, resolver and loaders
//! - Per-target release promotion with bounded history

pub mod artifact;
pub mod compile;
pub mod discover;
pub mod error;
pub mod paths;
pub mod promote;
pub mod release;
pub mod runtime;
pub mod store;

pub use artifact::{Artifact, ArtifactKey, ContentHash, HASH_LEN, LogicalPath};
pub use compile::{BuildConfig, Compiler, EsbuildCompiler, ReleaseBuilder, SpecifierMatch};
pub use discover::{Item, Taxonomy, discover, discover_excluding};
pub use error::{Error, Result};
pub use paths::DistLayout;
pub use promote::{Promotion, PromotionStore, Targets};
pub use release::{Release, ReleaseIndex, ReleaseMeta};
pub use runtime::{Component, Props, Registry, Render, Resolver, ResolverOptions};
