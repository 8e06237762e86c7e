//! The compile service seam and its esbuild adapter.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};

use super::types::{CompileOutput, CompileRequest, CompilerSettings, OutputFile};

/// Bundles one entry module into in-memory output files.
///
/// Implementations must be callable from several build threads at once.
pub trait Compiler: Send + Sync {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput>;
}

/// Drives the `esbuild` binary as a child process.
#[derive(Debug, Clone)]
pub struct EsbuildCompiler {
    /// Path to esbuild
    binary: PathBuf,

    /// Target/platform and extra flags
    settings: CompilerSettings,

    /// Version reported by `esbuild --version`
    version: String,
}

impl EsbuildCompiler {
    /// Locate esbuild (configured path, else `PATH`) and check that it runs.
    pub fn new(settings: CompilerSettings) -> Result<Self> {
        let binary = match &settings.binary {
            Some(binary) => which::which(binary).map_err(|_| {
                Error::Configuration(format!("esbuild not found at {}", binary.display()))
            })?,
            None => Self::find_esbuild()?,
        };
        let version = Self::get_version(&binary)?;
        tracing::debug!("Using esbuild {} at {}", version, binary.display());

        Ok(Self {
            binary,
            settings,
            version,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn find_esbuild() -> Result<PathBuf> {
        which::which("esbuild").map_err(|_| {
            Error::Configuration(
                "esbuild not found in PATH; install it or set compiler.binary".to_string(),
            )
        })
    }

    fn get_version(binary: &Path) -> Result<String> {
        let output = Command::new(binary)
            .arg("--version")
            .output()
            .map_err(|e| Error::Configuration(format!("failed to run esbuild: {e}")))?;

        if !output.status.success() {
            return Err(Error::Configuration(
                "failed to get esbuild version".to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Arguments for one invocation, entry first.
    fn args(&self, request: &CompileRequest<'_>) -> Vec<String> {
        let mut args = vec![
            request.entry.display().to_string(),
            "--bundle".to_string(),
            "--format=esm".to_string(),
            format!("--platform={}", self.settings.platform),
            format!("--target={}", self.settings.target),
            "--jsx=automatic".to_string(),
            "--log-level=warning".to_string(),
        ];
        for external in request.externals {
            args.push(format!("--external:{external}"));
        }
        if request.minify {
            args.push("--minify".to_string());
        }
        args.extend(self.settings.extra_args.iter().cloned());
        args
    }
}

impl Compiler for EsbuildCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput> {
        let output = Command::new(&self.binary)
            .args(self.args(request))
            .output()
            .map_err(|e| Error::build(request.entry, format!("failed to run esbuild: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::build(request.entry, stderr.trim().to_string()));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| Error::build(request.entry, "esbuild output is not valid UTF-8"))?;

        let files = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![OutputFile {
                path: "<stdout>".to_string(),
                text,
            }]
        };
        Ok(CompileOutput { files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiler(settings: CompilerSettings) -> EsbuildCompiler {
        EsbuildCompiler {
            binary: PathBuf::from("esbuild"),
            settings,
            version: "0.25.0".to_string(),
        }
    }

    #[test]
    fn test_args() {
        let externals = vec!["react".to_string(), "react/jsx-runtime".to_string()];
        let request = CompileRequest {
            entry: Path::new("src/Component/Button/default/index.tsx"),
            externals: &externals,
            minify: true,
        };

        let args = compiler(CompilerSettings::default()).args(&request);

        assert_eq!(args[0], "src/Component/Button/default/index.tsx");
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--format=esm".to_string()));
        assert!(args.contains(&"--target=esnext".to_string()));
        assert!(args.contains(&"--external:react".to_string()));
        assert!(args.contains(&"--external:react/jsx-runtime".to_string()));
        assert!(args.contains(&"--minify".to_string()));
    }

    #[test]
    fn test_extra_args_come_last() {
        let settings = CompilerSettings {
            extra_args: vec!["--define:DEBUG=false".to_string()],
            ..Default::default()
        };
        let request = CompileRequest {
            entry: Path::new("index.ts"),
            externals: &[],
            minify: false,
        };

        let args = compiler(settings).args(&request);
        assert_eq!(args.last().map(String::as_str), Some("--define:DEBUG=false"));
        assert!(!args.contains(&"--minify".to_string()));
    }

    #[test]
    fn test_missing_binary() {
        let settings = CompilerSettings {
            binary: Some(PathBuf::from("/nonexistent/esbuild")),
            ..Default::default()
        };
        assert!(matches!(
            EsbuildCompiler::new(settings),
            Err(Error::Configuration(_))
        ));
    }
}
