//! Error types for proxyload-core.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Result type for proxyload-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in proxyload-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem read or write failure.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler produced no usable output, or the output could not be
    /// turned into an artifact. Aborts the whole build.
    #[error("build failed{}: {message}", entry.as_ref().map(|p| format!(" for {}", p.display())).unwrap_or_default())]
    Build {
        entry: Option<PathBuf>,
        message: String,
    },

    /// Target, environment or release not found during promotion, or an
    /// invalid configuration file.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The resolver was used before the release's bootstrap was loaded.
    #[error(
        "release '{release}' has not been loaded; load {host}/releases/{release}/client.js \
         in the browser or {host}/releases/{release}/server.js on the server first"
    )]
    ReleaseNotLoaded { release: String, host: String },

    /// The release has no loader registered for a component type.
    #[error("no loader for type '{type_name}' in release '{release}'{}", loader.as_ref().map(|l| format!(" (expected artifact {l})")).unwrap_or_default())]
    LoaderNotFound {
        type_name: String,
        release: String,
        loader: Option<String>,
    },

    /// A JSON document exists but cannot be parsed.
    #[error("corrupt document {}: {source}", path.display())]
    CorruptDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Fetching a remote resource failed.
    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    /// Fetching a remote resource did not complete in time.
    #[error("fetch of {url} timed out after {}ms", timeout.as_millis())]
    FetchTimeout { url: String, timeout: Duration },

    /// The host could not evaluate a fetched artifact.
    #[error("failed to evaluate artifact {key}: {message}")]
    Evaluate { key: String, message: String },

    /// A logical path or artifact key is malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl Error {
    /// Wrap an IO error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Shorthand for a build error tied to an entry module.
    pub fn build(entry: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::Build {
            entry: Some(entry.as_ref().to_path_buf()),
            message: message.into(),
        }
    }

    /// Render the error together with a recovery hint for operators.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::Io { .. } => Some("check that the directory exists and is readable"),
            Self::Build { .. } => Some("no release was published; fix the component and rebuild"),
            Self::Configuration(_) => {
                Some("check proxyload.toml, targets.json and the dist directory's releases.json")
            }
            Self::ReleaseNotLoaded { .. } => {
                Some("the bootstrap script must run before any component is resolved")
            }
            Self::CorruptDocument { .. } => Some("restore the file from backup or delete it"),
            Self::FetchTimeout { .. } | Self::Fetch { .. } => {
                Some("check that the artifact host is reachable")
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}

/// Attach a path to IO results.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at(self, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|e| Error::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_not_loaded_names_bootstrap_urls() {
        let err = Error::ReleaseNotLoaded {
            release: "v9".to_string(),
            host: "https://cdn.example.com".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("'v9'"));
        assert!(message.contains("https://cdn.example.com/releases/v9/client.js"));
        assert!(message.contains("https://cdn.example.com/releases/v9/server.js"));
    }

    #[test]
    fn test_build_error_names_entry() {
        let err = Error::build("src/Component/Button/default/index.tsx", "no output files");
        assert_eq!(
            err.to_string(),
            "build failed for src/Component/Button/default/index.tsx: no output files"
        );
    }

    #[test]
    fn test_with_hint() {
        let err = Error::Configuration("target web not found".to_string());
        assert!(err.with_hint().contains("hint:"));

        let err = Error::InvalidPath("a/b".to_string());
        assert!(!err.with_hint().contains("hint:"));
    }
}
