use std::cell::RefCell;
use std::collections::HashMap;

use crate::{ObservablePath, PathKey};

/// Parsed-path cache keyed by source text.
///
/// Identical source strings resolve to the same [`ObservablePath`] instance,
/// so observers can compare paths with [`ObservablePath::ptr_eq`]. Malformed
/// text resolves to one shared invalid path. Entries are never evicted;
/// [`clear`](Self::clear) drops them all.
pub struct PathCache {
    entries: RefCell<HashMap<String, ObservablePath>>,
    invalid: ObservablePath,
}

impl PathCache {
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            invalid: ObservablePath::invalid(),
        }
    }

    /// Returns the cached path for `text`, parsing it on first use.
    pub fn get(&self, text: &str) -> ObservablePath {
        if let Some(path) = self.entries.borrow().get(text) {
            return path.clone();
        }
        let path = match ObservablePath::try_parse(text) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(path = text, error = %err, "invalid observable path");
                self.invalid.clone()
            }
        };
        self.entries
            .borrow_mut()
            .insert(text.to_owned(), path.clone());
        path
    }

    /// The shared invalid path returned for malformed text.
    pub fn invalid(&self) -> ObservablePath {
        self.invalid.clone()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.borrow().contains_key(text)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl Default for PathCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PathCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Anything an observer accepts as a path.
pub trait IntoObservablePath {
    fn into_observable_path(self, cache: &PathCache) -> ObservablePath;
}

impl IntoObservablePath for ObservablePath {
    fn into_observable_path(self, _cache: &PathCache) -> ObservablePath {
        self
    }
}

impl IntoObservablePath for &ObservablePath {
    fn into_observable_path(self, _cache: &PathCache) -> ObservablePath {
        self.clone()
    }
}

impl IntoObservablePath for &str {
    fn into_observable_path(self, cache: &PathCache) -> ObservablePath {
        cache.get(self)
    }
}

impl IntoObservablePath for String {
    fn into_observable_path(self, cache: &PathCache) -> ObservablePath {
        cache.get(&self)
    }
}

impl IntoObservablePath for &String {
    fn into_observable_path(self, cache: &PathCache) -> ObservablePath {
        cache.get(self)
    }
}

impl IntoObservablePath for Vec<PathKey> {
    fn into_observable_path(self, _cache: &PathCache) -> ObservablePath {
        ObservablePath::from_keys(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_text_same_instance() {
        let cache = PathCache::new();
        let a = cache.get("a.b");
        let b = cache.get("a.b");
        assert!(a.ptr_eq(&b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_malformed_text_shares_invalid() {
        let cache = PathCache::new();
        let a = cache.get("a..b");
        let b = cache.get("");
        assert!(!a.is_valid());
        assert!(a.ptr_eq(&b));
        assert!(a.ptr_eq(&cache.invalid()));
    }

    #[test]
    fn test_clear_resets() {
        let cache = PathCache::new();
        let first = cache.get("x");
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains("x"));
        let second = cache.get("x");
        assert!(!first.ptr_eq(&second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_into_observable_path() {
        let cache = PathCache::new();
        let from_str = "a[0]".into_observable_path(&cache);
        let from_keys = vec![PathKey::name("a"), PathKey::Index(0)].into_observable_path(&cache);
        assert_eq!(from_str, from_keys);
        assert!(String::from("a[0]").into_observable_path(&cache).ptr_eq(&from_str));
    }
}
