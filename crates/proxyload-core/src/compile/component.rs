//! Component compiler.
//!
//! Turns one taxonomy leaf into a content-addressed, self-registering
//! artifact: bundle the entry module, rewrite imports and exports, hash the
//! processed body and wrap it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::artifact::{Artifact, ArtifactKey, ContentHash, LogicalPath};
use crate::error::{Error, Result};

use super::compiler::Compiler;
use super::rewrite::ModuleRewriter;
use super::types::{BuildConfig, CompileRequest, SpecifierMatch};
use super::wrap::wrap_factory;

/// Entry module names, in lookup order.
pub const ENTRY_CANDIDATES: [&str; 4] = ["index.tsx", "index.ts", "index.jsx", "index.js"];

/// Find the entry module of a variation directory.
pub fn find_entry(dir: &Path) -> Result<PathBuf> {
    ENTRY_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| Error::Build {
            entry: Some(dir.to_path_buf()),
            message: format!("no entry module (expected one of {})", ENTRY_CANDIDATES.join(", ")),
        })
}

/// Compiles taxonomy leaves into artifacts.
#[derive(Clone)]
pub struct ComponentCompiler {
    /// Compile service
    compiler: Arc<dyn Compiler>,

    /// Registry namespace the wrapper registers into
    namespace: String,

    /// Shared dependency specifiers
    externals: Vec<String>,

    specifier_match: SpecifierMatch,

    minify: bool,
}

impl ComponentCompiler {
    pub fn new(config: &BuildConfig, compiler: Arc<dyn Compiler>) -> Self {
        Self {
            compiler,
            namespace: config.namespace.clone(),
            externals: config.externals(),
            specifier_match: config.specifier_match,
            minify: config.minify,
        }
    }

    /// Compile the leaf at `path` whose sources live in `dir`.
    pub fn compile_leaf(&self, path: &LogicalPath, dir: &Path) -> Result<Artifact> {
        let entry = find_entry(dir)?;
        let request = CompileRequest {
            entry: &entry,
            externals: &self.externals,
            minify: self.minify,
        };
        let output = self.compiler.compile(&request)?;

        let source = output
            .files
            .iter()
            .find(|file| !file.text.trim().is_empty())
            .map(|file| file.text.as_str())
            .ok_or_else(|| Error::build(&entry, "compiler produced no output"))?;

        self.process(path, &entry, source)
    }

    /// Rewrite, hash and wrap bundled module text.
    pub fn process(&self, path: &LogicalPath, entry: &Path, source: &str) -> Result<Artifact> {
        let module = ModuleRewriter::new(&self.externals, self.specifier_match)
            .rewrite(source)
            .map_err(|e| Error::build(entry, e.to_string()))?;

        let key = ArtifactKey::new(path.clone(), ContentHash::of(&module.body));
        let code = wrap_factory(&self.namespace, &key, &module.body);

        tracing::debug!(
            "Compiled {} ({} injected imports, {} bytes)",
            key,
            module.injected_imports,
            code.len()
        );

        Ok(Artifact { key, code })
    }
}
