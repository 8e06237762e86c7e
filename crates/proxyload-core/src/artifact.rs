//! Artifact identity: logical paths, content hashes and artifact keys.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Number of base64 characters kept from the SHA-256 digest.
pub const HASH_LEN: usize = 16;

/// `Type/Item/Variation` address of a component variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LogicalPath {
    pub type_name: String,
    pub item: String,
    pub variation: String,
}

impl LogicalPath {
    /// Create a logical path, validating every segment.
    pub fn new(
        type_name: impl Into<String>,
        item: impl Into<String>,
        variation: impl Into<String>,
    ) -> Result<Self> {
        let path = Self {
            type_name: type_name.into(),
            item: item.into(),
            variation: variation.into(),
        };
        for segment in [&path.type_name, &path.item, &path.variation] {
            validate_segment(segment)?;
        }
        Ok(path)
    }

    /// The `Type/Item` prefix, used to look up default variations.
    pub fn item_path(&self) -> String {
        format!("{}/{}", self.type_name, self.item)
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains('/') || segment.contains('.') {
        return Err(Error::InvalidPath(format!(
            "'{segment}' is not a valid path segment"
        )));
    }
    Ok(())
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.type_name, self.item, self.variation)
    }
}

impl FromStr for LogicalPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(i), Some(v), None) => Self::new(t, i, v),
            _ => Err(Error::InvalidPath(format!(
                "'{s}' is not of the form Type/Item/Variation"
            ))),
        }
    }
}

impl Serialize for LogicalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogicalPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// URL-safe content hash of an artifact body.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash artifact content.
    pub fn of(content: impl AsRef<[u8]>) -> Self {
        let digest = Sha256::digest(content.as_ref());
        let mut encoded = URL_SAFE_NO_PAD.encode(digest);
        encoded.truncate(HASH_LEN);
        Self(encoded)
    }

    /// Wrap an already computed hash (e.g. read back from a manifest).
    pub fn from_raw(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registry key of an artifact: `Type/Item/Variation/hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    path: LogicalPath,
    hash: ContentHash,
}

impl ArtifactKey {
    pub fn new(path: LogicalPath, hash: ContentHash) -> Self {
        Self { path, hash }
    }

    pub fn path(&self) -> &LogicalPath {
        &self.path
    }

    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// URL the artifact is served from: `{host}/items/{logicalPath}/{hash}.js`.
    pub fn url(&self, host: &str) -> String {
        format!("{}/items/{}/{}.js", host.trim_end_matches('/'), self.path, self.hash)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.path, self.hash)
    }
}

impl FromStr for ArtifactKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (path, hash) = s
            .rsplit_once('/')
            .ok_or_else(|| Error::InvalidPath(format!("'{s}' is not an artifact key")))?;
        if hash.is_empty() {
            return Err(Error::InvalidPath(format!("'{s}' has an empty hash")));
        }
        Ok(Self::new(path.parse()?, ContentHash::from_raw(hash)))
    }
}

impl Serialize for ArtifactKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ArtifactKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A compiled, hashed, self-registering unit of component code.
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Registry key (logical path + content hash).
    pub key: ArtifactKey,

    /// Wrapped script that registers the factory when evaluated.
    pub code: String,
}

impl Artifact {
    pub fn path(&self) -> &LogicalPath {
        self.key.path()
    }

    pub fn hash(&self) -> &ContentHash {
        self.key.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_path_parse() {
        let path: LogicalPath = "Component/Button/secondary".parse().unwrap();
        assert_eq!(path.type_name, "Component");
        assert_eq!(path.item, "Button");
        assert_eq!(path.variation, "secondary");
        assert_eq!(path.item_path(), "Component/Button");
        assert_eq!(path.to_string(), "Component/Button/secondary");
    }

    #[test]
    fn test_logical_path_rejects_bad_segments() {
        assert!("Component/Button".parse::<LogicalPath>().is_err());
        assert!("Component/Button/default/extra".parse::<LogicalPath>().is_err());
        assert!("Component//default".parse::<LogicalPath>().is_err());
        assert!(LogicalPath::new("Component", "index.ts", "default").is_err());
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = ContentHash::of("return Button;");
        let b = ContentHash::of("return Button;");
        let c = ContentHash::of("return Button ;");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), HASH_LEN);
        assert!(
            a.as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_artifact_key_url() {
        let key: ArtifactKey = "Component/Button/default/h1".parse().unwrap();
        assert_eq!(key.hash().as_str(), "h1");
        assert_eq!(
            key.url("https://cdn.example.com/"),
            "https://cdn.example.com/items/Component/Button/default/h1.js"
        );
    }

    #[test]
    fn test_artifact_key_serde() {
        let key: ArtifactKey = "Loader/Component/default/abc".parse().unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"Loader/Component/default/abc\"");
        let back: ArtifactKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }
}
