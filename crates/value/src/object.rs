use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::Value;

/// Shared handle to a mutable, insertion-ordered object.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<IndexMap<String, Value>>>);

impl ObjectRef {
    pub fn new(entries: IndexMap<String, Value>) -> Self {
        Self(Rc::new(RefCell::new(entries)))
    }

    /// Returns true when both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().contains_key(key)
    }

    /// Inserts or replaces `key`, returning the previous value.
    ///
    /// A replaced key keeps its position.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value)
    }

    /// Removes `key`, preserving the order of the remaining keys.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().shift_remove(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().keys().cloned().collect()
    }

    /// Owned shallow copy of the current entries.
    pub fn snapshot(&self) -> IndexMap<String, Value> {
        self.0.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, IndexMap<String, Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, IndexMap<String, Value>> {
        self.0.borrow_mut()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(entries) => f.debug_map().entries(entries.iter()).finish(),
            Err(_) => f.write_str("Object(<borrowed>)"),
        }
    }
}

impl FromIterator<(String, Value)> for ObjectRef {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_preserves_order() {
        let obj: ObjectRef = [("a", 1), ("b", 2), ("c", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        obj.remove("b");
        assert_eq!(obj.keys(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let obj = ObjectRef::default();
        assert_eq!(obj.insert("a", Value::from(1)), None);
        obj.insert("b", Value::from(2));
        assert_eq!(obj.insert("a", Value::from(3)), Some(Value::from(1)));
        assert_eq!(obj.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(obj.get("a"), Some(Value::from(3)));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let obj = ObjectRef::default();
        obj.insert("a", Value::from(1));
        let snap = obj.snapshot();
        obj.insert("b", Value::from(2));
        assert_eq!(snap.len(), 1);
        assert_eq!(obj.len(), 2);
    }
}
