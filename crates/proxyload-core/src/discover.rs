//! Component taxonomy discovery.
//!
//! Walks a `{root}/{type}/{item}/{variation}/` directory tree. Entries whose
//! name contains a `.` are files (`index.ts`, `interface.ts`, `targets.json`)
//! and never part of the taxonomy.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::artifact::LogicalPath;
use crate::error::{IoResultExt, Result};

/// Name of the variation that is always ordered first when present.
pub const DEFAULT_VARIATION: &str = "default";

/// A component item and its variations (first = default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub name: String,
    pub variations: Vec<String>,
}

impl Item {
    /// The default variation.
    pub fn default_variation(&self) -> &str {
        // Items are only constructed with at least one variation.
        self.variations
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_VARIATION)
    }
}

/// The full type → item → variation tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    root: PathBuf,
    types: BTreeMap<String, BTreeMap<String, Item>>,
}

impl Taxonomy {
    /// Source directory the taxonomy was read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Type names in lexicographic order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Items of a type in lexicographic order.
    pub fn items(&self, type_name: &str) -> impl Iterator<Item = &Item> {
        self.types.get(type_name).into_iter().flat_map(|items| items.values())
    }

    pub fn item(&self, type_name: &str, item: &str) -> Option<&Item> {
        self.types.get(type_name)?.get(item)
    }

    /// Default variation of an item, if the item exists.
    pub fn default_variation(&self, type_name: &str, item: &str) -> Option<&str> {
        self.item(type_name, item).map(Item::default_variation)
    }

    /// Every leaf of the taxonomy.
    pub fn leaves(&self) -> Vec<LogicalPath> {
        let mut leaves = Vec::new();
        for (type_name, items) in &self.types {
            for item in items.values() {
                for variation in &item.variations {
                    leaves.push(LogicalPath {
                        type_name: type_name.clone(),
                        item: item.name.clone(),
                        variation: variation.clone(),
                    });
                }
            }
        }
        leaves
    }

    /// `Type/Item` → default variation for every item.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.types
            .iter()
            .flat_map(|(type_name, items)| {
                items.values().map(move |item| {
                    (
                        format!("{}/{}", type_name, item.name),
                        item.default_variation().to_string(),
                    )
                })
            })
            .collect()
    }

    /// Directory holding a leaf's entry module.
    pub fn leaf_dir(&self, path: &LogicalPath) -> PathBuf {
        self.root
            .join(&path.type_name)
            .join(&path.item)
            .join(&path.variation)
    }

    pub fn is_empty(&self) -> bool {
        self.types.values().all(|items| items.is_empty())
    }
}

/// Read the taxonomy under `root`.
///
/// # Errors
/// Returns `Error::Io` if any directory in the tree cannot be read.
pub fn discover(root: impl AsRef<Path>) -> Result<Taxonomy> {
    discover_excluding(root, &[])
}

/// Read the taxonomy under `root`, skipping the listed type names.
pub fn discover_excluding(root: impl AsRef<Path>, exclude: &[String]) -> Result<Taxonomy> {
    let root = root.as_ref();
    let mut types = BTreeMap::new();

    for type_name in taxonomy_dirs(root)? {
        if exclude.contains(&type_name) {
            tracing::debug!("Skipping excluded type {}", type_name);
            continue;
        }

        let type_dir = root.join(&type_name);
        let mut items = BTreeMap::new();

        for item_name in taxonomy_dirs(&type_dir)? {
            let variations = order_variations(taxonomy_dirs(&type_dir.join(&item_name))?);
            if variations.is_empty() {
                tracing::warn!("Item {}/{} has no variations, skipping", type_name, item_name);
                continue;
            }
            items.insert(
                item_name.clone(),
                Item {
                    name: item_name,
                    variations,
                },
            );
        }

        types.insert(type_name, items);
    }

    Ok(Taxonomy {
        root: root.to_path_buf(),
        types,
    })
}

/// Names of the subdirectories of `dir` that belong to the taxonomy.
fn taxonomy_dirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains('.') {
            continue;
        }
        if entry.file_type().at(entry.path())?.is_dir() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Lexicographic order with `default` moved to the front.
fn order_variations(mut variations: Vec<String>) -> Vec<String> {
    variations.sort();
    if let Some(pos) = variations.iter().position(|v| v == DEFAULT_VARIATION) {
        let default = variations.remove(pos);
        variations.insert(0, default);
    }
    variations
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch_variation(root: &Path, leaf: &str) {
        let dir = root.join(leaf);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("index.tsx"), "export default () => null;").unwrap();
    }

    #[test]
    fn test_discover_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch_variation(root, "Component/Button/secondary");
        touch_variation(root, "Component/Button/default");
        touch_variation(root, "Component/EmailForm/default");
        touch_variation(root, "Loader/Component/default");
        fs::write(root.join("Component/Button/interface.ts"), "").unwrap();
        fs::write(root.join("targets.json"), "{}").unwrap();

        let taxonomy = discover(root).unwrap();

        assert_eq!(taxonomy.types().collect::<Vec<_>>(), ["Component", "Loader"]);
        let button = taxonomy.item("Component", "Button").unwrap();
        assert_eq!(button.variations, ["default", "secondary"]);
        assert_eq!(taxonomy.leaves().len(), 4);
        assert_eq!(
            taxonomy.defaults().get("Component/Button").map(String::as_str),
            Some("default")
        );
    }

    #[test]
    fn test_default_variation_without_default_dir() {
        let temp = TempDir::new().unwrap();
        touch_variation(temp.path(), "Component/Card/wide");
        touch_variation(temp.path(), "Component/Card/compact");

        let taxonomy = discover(temp.path()).unwrap();
        assert_eq!(taxonomy.default_variation("Component", "Card"), Some("compact"));
    }

    #[test]
    fn test_item_without_variations_is_skipped() {
        let temp = TempDir::new().unwrap();
        touch_variation(temp.path(), "Component/Button/default");
        fs::create_dir_all(temp.path().join("Component/Empty")).unwrap();

        let taxonomy = discover(temp.path()).unwrap();
        assert!(taxonomy.item("Component", "Empty").is_none());
        assert_eq!(taxonomy.leaves().len(), 1);
    }

    #[test]
    fn test_exclude() {
        let temp = TempDir::new().unwrap();
        touch_variation(temp.path(), "Component/Button/default");
        touch_variation(temp.path(), "Internal/Helper/default");

        let taxonomy = discover_excluding(temp.path(), &["Internal".to_string()]).unwrap();
        assert_eq!(taxonomy.types().collect::<Vec<_>>(), ["Component"]);
    }

    #[test]
    fn test_unreadable_root() {
        let temp = TempDir::new().unwrap();
        let err = discover(temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, crate::Error::Io { .. }));
    }
}
