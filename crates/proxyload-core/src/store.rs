//! JSON document persistence.
//!
//! All documents are written pretty-printed with a trailing newline via a
//! temporary file in the same directory and an atomic rename, so readers
//! never observe a half-written file.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, IoResultExt, Result};

/// Read a JSON document, or `default` when the file is absent or empty.
///
/// # Errors
/// `Error::CorruptDocument` if the file has content that does not parse,
/// `Error::Io` if it exists but cannot be read.
pub fn load_or_default<T: DeserializeOwned>(path: impl AsRef<Path>, default: T) -> Result<T> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(default),
        Err(e) => return Err(Error::io(path, e)),
    };
    if content.trim().is_empty() {
        return Ok(default);
    }

    serde_json::from_str(&content).map_err(|source| Error::CorruptDocument {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a document the way every file in the dist directory is written.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Atomically replace `path` with `contents`, creating parent directories.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).at(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir).at(dir)?;
    temp.write_all(contents).at(temp.path())?;
    temp.as_file().sync_all().at(temp.path())?;
    temp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Atomically write a JSON document.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    write_atomic(path, to_pretty_json(value)?.as_bytes())
}

/// Write `contents` unless the file already holds exactly these bytes.
///
/// Returns whether the file was written.
pub fn write_if_changed(path: impl AsRef<Path>, contents: &[u8]) -> Result<bool> {
    let path = path.as_ref();
    match fs::read(path) {
        Ok(existing) if existing == contents => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::io(path, e)),
    }
    write_atomic(path, contents)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_load_absent_returns_default() {
        let temp = TempDir::new().unwrap();
        let value: BTreeMap<String, u32> =
            load_or_default(temp.path().join("missing.json"), BTreeMap::new()).unwrap();
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_empty_returns_default() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.json");
        fs::write(&path, "\n").unwrap();

        let value: Vec<u32> = load_or_default(&path, vec![7]).unwrap();
        assert_eq!(value, [7]);
    }

    #[test]
    fn test_load_corrupt_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("current.json");
        fs::write(&path, "{ \"web\": ").unwrap();

        let err = load_or_default::<BTreeMap<String, String>>(&path, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::CorruptDocument { .. }));
        assert!(err.to_string().contains("current.json"));
    }

    #[test]
    fn test_write_json_atomic_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/doc.json");
        let doc = BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);

        write_json_atomic(&path, &doc).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        let back: BTreeMap<String, i32> = load_or_default(&path, BTreeMap::new()).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_write_if_changed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.js");

        assert!(write_if_changed(&path, b"one").unwrap());
        assert!(!write_if_changed(&path, b"one").unwrap());
        assert!(write_if_changed(&path, b"two").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }
}
