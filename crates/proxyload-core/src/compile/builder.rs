//! Release builder.
//!
//! Discovers the component tree, compiles every leaf in parallel and hands
//! the artifacts to the assembler. Any compile error aborts the build before
//! a single file is written.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::artifact::Artifact;
use crate::discover::{Taxonomy, discover_excluding};
use crate::error::Result;
use crate::release::{AssembledRelease, ReleaseAssembler};

use super::compiler::Compiler;
use super::component::ComponentCompiler;
use super::types::BuildConfig;

/// Builds releases from a source tree.
pub struct ReleaseBuilder {
    /// Build configuration
    config: BuildConfig,

    /// Per-leaf compiler
    compiler: ComponentCompiler,

    /// Output writer
    assembler: ReleaseAssembler,
}

impl ReleaseBuilder {
    pub fn new(config: BuildConfig, compiler: Arc<dyn Compiler>) -> Self {
        let components = ComponentCompiler::new(&config, compiler);
        let assembler = ReleaseAssembler::new(&config);
        Self {
            config,
            compiler: components,
            assembler,
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Read the taxonomy from the configured source directory.
    pub fn discover(&self) -> Result<Taxonomy> {
        discover_excluding(&self.config.source_dir, &self.config.exclude)
    }

    /// Compile every leaf of `taxonomy`, in parallel.
    ///
    /// # Errors
    /// The first compile error; no artifacts are returned in that case.
    pub fn compile_all(&self, taxonomy: &Taxonomy) -> Result<Vec<Artifact>> {
        taxonomy
            .leaves()
            .par_iter()
            .map(|path| self.compiler.compile_leaf(path, &taxonomy.leaf_dir(path)))
            .collect()
    }

    /// Build release `release_id`, stamping it with `now`.
    pub fn build_at(&self, release_id: &str, now: DateTime<Utc>) -> Result<AssembledRelease> {
        let start = Instant::now();
        let taxonomy = self.discover()?;
        if taxonomy.is_empty() {
            tracing::warn!(
                "No components found under {}",
                self.config.source_dir.display()
            );
        }

        let artifacts = self.compile_all(&taxonomy)?;
        tracing::info!(
            "Compiled {} artifacts in {:.2}s",
            artifacts.len(),
            start.elapsed().as_secs_f64()
        );

        self.assembler
            .assemble_at(release_id, artifacts, taxonomy.defaults(), now)
    }

    pub fn build(&self, release_id: &str) -> Result<AssembledRelease> {
        self.build_at(release_id, Utc::now())
    }
}
