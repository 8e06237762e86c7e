//! Common types for the build pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, IoResultExt, Result};
use crate::paths::DistLayout;

/// Default registry namespace on `globalThis`.
pub const DEFAULT_NAMESPACE: &str = "_PL_";

/// Version constraint recorded for a shared dependency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// How an import specifier is matched against the shared-dependency table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecifierMatch {
    /// The import specifier equals a declared specifier.
    #[default]
    Exact,
    /// Exact, or a subpath of a declared specifier (`react` matches `react/jsx-runtime`).
    Subpath,
    /// A declared specifier occurs anywhere in the import specifier.
    /// Can misfire on similarly named packages (`react` matches `preact`).
    Substring,
}

impl SpecifierMatch {
    /// Whether `specifier` is provided by a dependency named `declared`.
    pub fn matches(self, declared: &str, specifier: &str) -> bool {
        match self {
            Self::Exact => declared == specifier,
            Self::Subpath => {
                declared == specifier
                    || specifier
                        .strip_prefix(declared)
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Self::Substring => specifier.contains(declared),
        }
    }
}

/// Settings for the external compile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompilerSettings {
    /// Path to the esbuild binary. Looked up on `PATH` when unset.
    pub binary: Option<PathBuf>,

    /// Language target passed to the compiler.
    pub target: String,

    /// Platform passed to the compiler.
    pub platform: String,

    /// Additional compiler flags.
    pub extra_args: Vec<String>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            binary: None,
            target: "esnext".to_string(),
            platform: "browser".to_string(),
            extra_args: Vec::new(),
        }
    }
}

/// Configuration of a build, usually read from `proxyload.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Root of the component taxonomy.
    pub source_dir: PathBuf,

    /// Output directory.
    pub dist_dir: PathBuf,

    /// Registry namespace on `globalThis`.
    pub namespace: String,

    /// Shared dependencies, externalized and injected at runtime.
    pub dependencies: BTreeMap<String, DependencySpec>,

    /// Type → logical path of the artifact acting as that type's loader.
    pub loaders: BTreeMap<String, String>,

    /// Specifier matching mode for the import rewrite.
    pub specifier_match: SpecifierMatch,

    /// Ask the compiler to minify.
    pub minify: bool,

    /// Type names skipped during discovery.
    pub exclude: Vec<String>,

    /// Compile service settings.
    pub compiler: CompilerSettings,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            dist_dir: PathBuf::from("dist"),
            namespace: DEFAULT_NAMESPACE.to_string(),
            dependencies: BTreeMap::new(),
            loaders: BTreeMap::new(),
            specifier_match: SpecifierMatch::default(),
            minify: false,
            exclude: Vec::new(),
            compiler: CompilerSettings::default(),
        }
    }
}

impl BuildConfig {
    /// Load a TOML build configuration.
    ///
    /// Relative `source-dir`, `dist-dir` and `compiler.binary` paths are
    /// resolved against the directory containing the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).at(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| {
            Error::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        config.source_dir = base.join(&config.source_dir);
        config.dist_dir = base.join(&config.dist_dir);
        // A bare program name stays a PATH lookup.
        config.compiler.binary = config.compiler.binary.take().map(|binary| {
            if binary.components().count() > 1 {
                base.join(binary)
            } else {
                binary
            }
        });

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.namespace.is_empty() {
            errors.push("namespace cannot be empty".to_string());
        }
        for (type_name, loader) in &self.loaders {
            if let Err(e) = loader.parse::<crate::artifact::LogicalPath>() {
                errors.push(format!("loader for '{type_name}': {e}"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Configuration(errors.join("; ")))
        }
    }

    /// Shared dependency specifiers passed to the compiler as externals.
    pub fn externals(&self) -> Vec<String> {
        self.dependencies.keys().cloned().collect()
    }

    /// Dist layout described by this configuration.
    pub fn layout(&self) -> DistLayout {
        DistLayout::new(&self.dist_dir)
    }
}

/// Input to the compile service for one entry module.
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
    /// Entry module to bundle.
    pub entry: &'a Path,

    /// Specifiers the bundler must leave as imports.
    pub externals: &'a [String],

    /// Minify the output.
    pub minify: bool,
}

/// One in-memory output file from the compile service.
#[derive(Debug, Clone)]
pub struct OutputFile {
    pub path: String,
    pub text: String,
}

/// Output of the compile service.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    pub files: Vec<OutputFile>,
}
