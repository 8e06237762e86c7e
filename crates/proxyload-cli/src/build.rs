//! Build command implementation for the proxyload CLI.
//!
//! Compiles every component variant under the source tree and writes a
//! release to the dist directory.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use proxyload_core::{BuildConfig, EsbuildCompiler, ReleaseBuilder};

use crate::output::{self, DIM, GREEN, RESET};

/// Read `proxyload.toml` (or whatever `config_path` names).
pub fn load_config(config_path: &str) -> anyhow::Result<BuildConfig> {
    let path = Path::new(config_path);
    if !path.exists() {
        anyhow::bail!(
            "Config not found: {} (current directory: {})",
            config_path,
            std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "<unknown>".to_string())
        );
    }
    Ok(BuildConfig::from_file(path)?)
}

/// Builder for `config`, backed by esbuild.
pub fn release_builder(config: BuildConfig) -> anyhow::Result<(ReleaseBuilder, String)> {
    let compiler = EsbuildCompiler::new(config.compiler.clone())?;
    let version = compiler.version().to_string();
    Ok((ReleaseBuilder::new(config, Arc::new(compiler)), version))
}

/// Build one release with an existing builder, printing progress.
pub fn build_once(builder: &ReleaseBuilder, release: &str) -> anyhow::Result<()> {
    let start = Instant::now();

    output::step("Discovering components");
    let taxonomy = builder.discover()?;
    let leaves = taxonomy.leaves().len();
    output::done(format!("({} types, {} variants)", taxonomy.types().count(), leaves));

    output::step("Compiling and assembling");
    let assembled = builder.build(release)?;
    output::done(format!(
        "({} artifacts, {} changed)",
        assembled.release.hashes.len(),
        assembled.written_artifacts
    ));

    println!();
    println!(
        "{GREEN}Release:{RESET} {} {DIM}({:.2}s){RESET}",
        assembled.release.id,
        start.elapsed().as_secs_f64()
    );
    println!("{DIM}Output:{RESET} {}", assembled.dir.display());
    for (type_name, loader) in &assembled.release.loaders {
        println!("{DIM}Loader {type_name}:{RESET} {loader}");
    }
    Ok(())
}

/// Execute the build command.
pub fn execute(config_path: &str, release: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    output::header("build", release);
    output::field("Source", config.source_dir.display());
    output::field("Dist", config.dist_dir.display());

    let (builder, version) = release_builder(config)?;
    output::field("Compiler", format!("esbuild {version}"));
    output::rule();

    build_once(&builder, release)
}
