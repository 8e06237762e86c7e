//! Build pipeline for proxied components.
//!
//! This module provides:
//! - The compile service seam (`Compiler`) and its esbuild adapter
//! - Import/export rewriting of bundled modules
//! - Content hashing and self-registering wrappers
//! - Parallel release builds
//!
//! # Architecture
//!
//! ```text
//! {src}/{type}/{item}/{variation}/index.tsx
//!     │
//!     └── Compiler (esbuild) ──► ModuleRewriter ──► ContentHash ──► wrap_factory
//!                                                                      │
//!                         ReleaseAssembler ◄── Artifact {key, code} ◄──┘
//! ```

mod builder;
mod compiler;
mod component;
pub mod lexer;
pub mod rewrite;
mod types;
pub mod wrap;

pub use builder::ReleaseBuilder;
pub use compiler::{Compiler, EsbuildCompiler};
pub use component::{ComponentCompiler, ENTRY_CANDIDATES, find_entry};
pub use rewrite::{ModuleRewriter, RewriteError, RewrittenModule};
pub use types::{
    BuildConfig, CompileOutput, CompileRequest, CompilerSettings, DEFAULT_NAMESPACE,
    DependencySpec, OutputFile, SpecifierMatch,
};
pub use wrap::wrap_factory;
