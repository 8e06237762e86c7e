//! The dependency table injected into every factory.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A type-erased shared value.
pub type SharedValue = Arc<dyn Any + Send + Sync>;

/// Shared values keyed by import specifier.
#[derive(Clone, Default)]
pub struct Dependencies {
    values: BTreeMap<String, SharedValue>,
}

impl Dependencies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide `value` for imports of `specifier`.
    pub fn insert<T: Any + Send + Sync>(&mut self, specifier: impl Into<String>, value: T) {
        self.values.insert(specifier.into(), Arc::new(value));
    }

    pub fn insert_shared(&mut self, specifier: impl Into<String>, value: SharedValue) {
        self.values.insert(specifier.into(), value);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with<T: Any + Send + Sync>(mut self, specifier: impl Into<String>, value: T) -> Self {
        self.insert(specifier, value);
        self
    }

    /// The value for `specifier`, if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, specifier: &str) -> Option<Arc<T>> {
        self.values.get(specifier)?.clone().downcast::<T>().ok()
    }

    pub fn get_shared(&self, specifier: &str) -> Option<&SharedValue> {
        self.values.get(specifier)
    }

    pub fn contains(&self, specifier: &str) -> bool {
        self.values.contains_key(specifier)
    }

    pub fn specifiers(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_lookup() {
        let deps = Dependencies::new()
            .with("react", "react-19".to_string())
            .with("answer", 42u32);

        assert_eq!(deps.get::<String>("react").as_deref().map(String::as_str), Some("react-19"));
        assert_eq!(deps.get::<u32>("answer").as_deref(), Some(&42));
        assert!(deps.get::<u32>("react").is_none());
        assert!(deps.get::<u32>("missing").is_none());
        assert_eq!(deps.specifiers().collect::<Vec<_>>(), ["answer", "react"]);
    }
}
