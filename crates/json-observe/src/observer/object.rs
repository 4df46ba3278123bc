use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use json_observe_value::{same_value, Value};

use super::{
    dirty_check, report, schedule, AttachMode, HasCore, Observer, ObserverCore, ObserverId,
    ObserverState,
};
use crate::callback::{Listener, Notify};
use crate::{CallbackResult, Engine, ObserverError};

/// Property-level difference between two snapshots of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectDiff {
    /// Keys now present that were absent, with their new values.
    pub added: IndexMap<String, Value>,
    /// Keys that disappeared; every value is `Undefined`.
    pub removed: IndexMap<String, Value>,
    /// Keys present in both snapshots whose value changed, with new values.
    pub changed: IndexMap<String, Value>,
    old_values: IndexMap<String, Value>,
}

impl ObjectDiff {
    /// Computes the diff from `old` to `new`.
    pub fn between(old: &IndexMap<String, Value>, new: &IndexMap<String, Value>) -> Self {
        let mut diff = Self::default();
        for (key, old_value) in old {
            match new.get(key) {
                None => {
                    diff.removed.insert(key.clone(), Value::Undefined);
                }
                Some(new_value) if !same_value(new_value, old_value) => {
                    diff.changed.insert(key.clone(), new_value.clone());
                }
                Some(_) => {}
            }
        }
        for (key, new_value) in new {
            if !old.contains_key(key) {
                diff.added.insert(key.clone(), new_value.clone());
            }
        }
        diff.old_values = old.clone();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Value of `key` in the previous snapshot, `Undefined` if it was absent.
    pub fn old_value(&self, key: &str) -> Value {
        self.old_values.get(key).cloned().unwrap_or_default()
    }
}

/// Callback receiving the property diff since the last report.
pub type ObjectCallback = dyn FnMut(&ObjectDiff) -> CallbackResult;

struct ObjectObserverInner {
    core: ObserverCore<ObjectCallback>,
    target: Value,
    snapshot: IndexMap<String, Value>,
}

impl HasCore for ObjectObserverInner {
    type Callback = ObjectCallback;

    fn core_mut(&mut self) -> &mut ObserverCore<ObjectCallback> {
        &mut self.core
    }
}

/// Watches the own properties of an object (or the indices and `length` of
/// an array) and reports added, removed and changed keys.
#[derive(Clone)]
pub struct ObjectObserver(Rc<RefCell<ObjectObserverInner>>);

impl ObjectObserver {
    /// Fails with [`ObserverError::NotAnObject`] unless `target` is an
    /// object or an array.
    pub fn new(engine: &Engine, target: &Value) -> Result<Self, ObserverError> {
        if !target.is_container() {
            return Err(ObserverError::NotAnObject(target.type_name()));
        }
        Ok(Self(Rc::new(RefCell::new(ObjectObserverInner {
            core: ObserverCore::new(engine),
            target: target.clone(),
            snapshot: IndexMap::new(),
        }))))
    }

    pub fn open<F>(&self, callback: F) -> Result<Value, ObserverError>
    where
        F: FnMut(&ObjectDiff) -> CallbackResult + 'static,
    {
        self.start(Listener::Callback(Box::new(callback)), AttachMode::Scheduled)
    }

    fn start(
        &self,
        listener: Listener<ObjectCallback>,
        mode: AttachMode,
    ) -> Result<Value, ObserverError> {
        let value = {
            let mut inner = self.0.borrow_mut();
            inner.core.begin_open(listener)?;
            inner.snapshot = properties(&inner.target);
            inner.target.clone()
        };
        schedule(&self.0, mode, || Box::new(self.clone()));
        Ok(value)
    }
}

/// Own enumerable properties. Arrays contribute their indices plus `length`.
fn properties(target: &Value) -> IndexMap<String, Value> {
    match target {
        Value::Object(obj) => obj.snapshot(),
        Value::Array(arr) => {
            let items = arr.borrow();
            let mut props: IndexMap<String, Value> = items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect();
            props.insert("length".to_string(), Value::from(items.len()));
            props
        }
        _ => IndexMap::new(),
    }
}

impl Observer for ObjectObserver {
    fn id(&self) -> ObserverId {
        self.0.borrow().core.id()
    }

    fn state(&self) -> ObserverState {
        self.0.borrow().core.state
    }

    fn value(&self) -> Value {
        self.0.borrow().target.clone()
    }

    fn attach(&self, notify: Notify, mode: AttachMode) -> Result<Value, ObserverError> {
        self.start(Listener::Notify(notify), mode)
    }

    fn check(&self) -> bool {
        let diff = {
            let mut inner = self.0.borrow_mut();
            if !inner.core.can_check() {
                return false;
            }
            let current = properties(&inner.target);
            let diff = ObjectDiff::between(&inner.snapshot, &current);
            if diff.is_empty() {
                return false;
            }
            inner.snapshot = current;
            diff
        };
        report(&self.0, |callback| callback(&diff));
        true
    }

    fn deliver(&self) {
        let engine = {
            let inner = self.0.borrow();
            if !inner.core.is_open() {
                return;
            }
            inner.core.engine.clone()
        };
        dirty_check(self, &engine);
    }

    fn discard_changes(&self) -> Value {
        let mut inner = self.0.borrow_mut();
        if inner.core.state != ObserverState::Closed {
            inner.snapshot = properties(&inner.target);
        }
        inner.target.clone()
    }

    fn close(&self) {
        let mut inner = self.0.borrow_mut();
        if !inner.core.is_open() {
            return;
        }
        inner.core.shutdown();
        inner.snapshot = IndexMap::new();
    }
}

impl fmt::Debug for ObjectObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("ObjectObserver")
            .field("id", &inner.core.id())
            .field("state", &inner.core.state)
            .field("keys", &inner.snapshot.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> IndexMap<String, Value> {
        Value::from(value).as_object().map(|o| o.snapshot()).unwrap_or_default()
    }

    #[test]
    fn test_diff_between() {
        let old = map(json!({"a": 1, "b": 2, "c": 3}));
        let new = map(json!({"a": 1, "b": 20, "d": 4}));
        let diff = ObjectDiff::between(&old, &new);
        assert_eq!(diff.added, map(json!({"d": 4})));
        assert_eq!(diff.changed, map(json!({"b": 20})));
        assert_eq!(diff.removed.keys().collect::<Vec<_>>(), vec!["c"]);
        assert!(diff.removed["c"].is_undefined());
        assert_eq!(diff.old_value("b"), Value::from(2));
        assert!(diff.old_value("d").is_undefined());
    }

    #[test]
    fn test_nan_property_is_stable() {
        let mut snapshot = IndexMap::new();
        snapshot.insert("n".to_string(), Value::from(f64::NAN));
        assert!(ObjectDiff::between(&snapshot, &snapshot.clone()).is_empty());

        let mut signed = snapshot.clone();
        signed.insert("n".to_string(), Value::from(-0.0));
        snapshot.insert("n".to_string(), Value::from(0.0));
        assert!(!ObjectDiff::between(&snapshot, &signed).is_empty());
    }

    #[test]
    fn test_rejects_primitives() {
        let engine = Engine::default();
        assert_eq!(
            ObjectObserver::new(&engine, &Value::from(1)).unwrap_err(),
            ObserverError::NotAnObject("number")
        );
    }

    #[test]
    fn test_reports_array_length_change() {
        let engine = Engine::default();
        let value = Value::from(json!([1, 2]));
        let observer = ObjectObserver::new(&engine, &value).unwrap();
        let diffs = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&diffs);
        observer
            .open(move |diff| {
                sink.borrow_mut().push(diff.clone());
                Ok(())
            })
            .unwrap();

        value.as_array().unwrap().push(Value::from(3));
        engine.run_checkpoint();

        let diffs = diffs.borrow();
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].added, map(json!({"2": 3})));
        assert_eq!(diffs[0].changed, map(json!({"length": 3})));
        assert_eq!(diffs[0].old_value("length"), Value::from(2));
    }
}
