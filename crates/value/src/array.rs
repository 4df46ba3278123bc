use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::Value;

/// Most `Undefined` holes a single fallible write may append.
pub const MAX_ARRAY_GROWTH: usize = 1 << 20;

/// Shared handle to a mutable array.
///
/// Cloning the handle does not copy the elements. Use [`ArrayRef::snapshot`]
/// for an owned copy.
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
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

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Assigns `value` at `index`, growing the array with `Undefined` holes
    /// when `index` is past the end.
    ///
    /// The growth is unbounded; use [`ArrayRef::try_set`] for indexes that
    /// come from untrusted input.
    pub fn set(&self, index: usize, value: Value) {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Undefined);
        }
        items[index] = value;
    }

    /// Like [`ArrayRef::set`], but returns false instead of growing by more
    /// than [`MAX_ARRAY_GROWTH`] elements or past what the allocator grants.
    pub fn try_set(&self, index: usize, value: Value) -> bool {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            let Some(len) = index.checked_add(1) else {
                return false;
            };
            if !grow(&mut items, len) {
                return false;
            }
        }
        items[index] = value;
        true
    }

    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    pub fn pop(&self) -> Option<Value> {
        self.0.borrow_mut().pop()
    }

    /// Inserts `value` at `index`, clamped to the array length.
    pub fn insert(&self, index: usize, value: Value) {
        let mut items = self.0.borrow_mut();
        let at = index.min(items.len());
        items.insert(at, value);
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        let mut items = self.0.borrow_mut();
        (index < items.len()).then(|| items.remove(index))
    }

    /// Removes up to `remove_count` elements starting at `index` and inserts
    /// `items` in their place. Returns the removed elements.
    ///
    /// `index` is clamped to the array length.
    pub fn splice(&self, index: usize, remove_count: usize, items: Vec<Value>) -> Vec<Value> {
        let mut storage = self.0.borrow_mut();
        let start = index.min(storage.len());
        let end = start.saturating_add(remove_count).min(storage.len());
        storage.splice(start..end, items).collect()
    }

    /// Truncates or extends (with `Undefined`) to exactly `len` elements.
    pub fn resize(&self, len: usize) {
        self.0.borrow_mut().resize(len, Value::Undefined);
    }

    /// Fallible [`ArrayRef::resize`] with the same growth limit as
    /// [`ArrayRef::try_set`]. Shrinking always succeeds.
    pub fn try_resize(&self, len: usize) -> bool {
        let mut items = self.0.borrow_mut();
        if len <= items.len() {
            items.truncate(len);
            return true;
        }
        grow(&mut items, len)
    }

    /// Owned shallow copy of the current elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Vec<Value>> {
        self.0.borrow_mut()
    }
}

fn grow(items: &mut Vec<Value>, len: usize) -> bool {
    let additional = len - items.len();
    if additional > MAX_ARRAY_GROWTH || items.try_reserve(additional).is_err() {
        return false;
    }
    items.resize(len, Value::Undefined);
    true
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(items) => f.debug_tuple("Array").field(&*items).finish(),
            Err(_) => f.write_str("Array(<borrowed>)"),
        }
    }
}

impl From<Vec<Value>> for ArrayRef {
    fn from(items: Vec<Value>) -> Self {
        Self::new(items)
    }
}

impl FromIterator<Value> for ArrayRef {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(items: &[i32]) -> ArrayRef {
        items.iter().copied().map(Value::from).collect()
    }

    #[test]
    fn test_set_past_end_leaves_holes() {
        let arr = nums(&[1]);
        arr.set(3, Value::from(4));
        assert_eq!(arr.len(), 4);
        assert!(arr.get(1).unwrap().is_undefined());
        assert!(arr.get(2).unwrap().is_undefined());
        assert_eq!(arr.get(3), Some(Value::from(4)));
    }

    #[test]
    fn test_try_set_refuses_huge_growth() {
        let arr = nums(&[1, 2]);
        assert!(!arr.try_set(u32::MAX as usize - 1, Value::from(0)));
        assert!(!arr.try_set(usize::MAX, Value::from(0)));
        assert!(!arr.try_resize(2 + MAX_ARRAY_GROWTH + 1));
        assert_eq!(arr.len(), 2);

        assert!(arr.try_set(2 + MAX_ARRAY_GROWTH - 1, Value::from(3)));
        assert_eq!(arr.len(), 2 + MAX_ARRAY_GROWTH);
        assert!(arr.try_resize(1));
        assert_eq!(arr.snapshot(), vec![Value::from(1)]);
    }

    #[test]
    fn test_splice_replaces_window() {
        let arr = nums(&[1, 2, 3, 4]);
        let removed = arr.splice(1, 2, vec![Value::from(9)]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(arr.snapshot(), vec![Value::from(1), Value::from(9), Value::from(4)]);
    }

    #[test]
    fn test_splice_clamps_out_of_range() {
        let arr = nums(&[1, 2]);
        let removed = arr.splice(5, 3, vec![Value::from(3)]);
        assert!(removed.is_empty());
        assert_eq!(arr.len(), 3);
    }

    #[test]
    fn test_clone_aliases_storage() {
        let arr = nums(&[1]);
        let alias = arr.clone();
        alias.push(Value::from(2));
        assert_eq!(arr.len(), 2);
        assert!(arr.ptr_eq(&alias));
    }

    #[test]
    fn test_remove_out_of_range() {
        let arr = nums(&[1]);
        assert_eq!(arr.remove(4), None);
        assert_eq!(arr.remove(0), Some(Value::from(1)));
        assert!(arr.is_empty());
    }
}
