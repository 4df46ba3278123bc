use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use json_observe_path::{IntoObservablePath, ObservablePath};
use json_observe_value::{same_value, Value};

use super::{
    dirty_check, report, schedule, AttachMode, HasCore, Observer, ObserverCore, ObserverId,
    ObserverState,
};
use crate::callback::{Listener, Notify};
use crate::{CallbackResult, Engine, ObserverError};

/// Callback receiving `(new_value, old_value)`.
pub type PathCallback = dyn FnMut(&Value, &Value) -> CallbackResult;

struct PathObserverInner {
    core: ObserverCore<PathCallback>,
    root: Value,
    path: ObservablePath,
    value: Value,
}

impl HasCore for PathObserverInner {
    type Callback = PathCallback;

    fn core_mut(&mut self) -> &mut ObserverCore<PathCallback> {
        &mut self.core
    }
}

/// Watches the value reachable by one path from one root.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use json_observe::{Engine, PathObserver};
/// use json_observe_value::Value;
/// use serde_json::json;
///
/// let engine = Engine::default();
/// let root = Value::from(json!({"user": {"name": "ann"}}));
/// let seen = Rc::new(RefCell::new(Vec::new()));
///
/// let observer = PathObserver::new(&engine, root.clone(), "user.name");
/// let sink = Rc::clone(&seen);
/// let initial = observer
///     .open(move |new, old| {
///         sink.borrow_mut().push((new.to_string(), old.to_string()));
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(initial, Value::from("ann"));
///
/// engine.path("user.name").set(&root, Value::from("bob"));
/// engine.run_checkpoint();
/// assert_eq!(*seen.borrow(), vec![("\"bob\"".to_string(), "\"ann\"".to_string())]);
/// ```
#[derive(Clone)]
pub struct PathObserver(Rc<RefCell<PathObserverInner>>);

impl PathObserver {
    pub fn new(engine: &Engine, root: Value, path: impl IntoObservablePath) -> Self {
        let path = engine.path(path);
        Self(Rc::new(RefCell::new(PathObserverInner {
            core: ObserverCore::new(engine),
            root,
            path,
            value: Value::Undefined,
        })))
    }

    /// Opens the observer and returns the current value.
    pub fn open<F>(&self, callback: F) -> Result<Value, ObserverError>
    where
        F: FnMut(&Value, &Value) -> CallbackResult + 'static,
    {
        self.start(Listener::Callback(Box::new(callback)), AttachMode::Scheduled)
    }

    pub fn path(&self) -> ObservablePath {
        self.0.borrow().path.clone()
    }

    pub fn root(&self) -> Value {
        self.0.borrow().root.clone()
    }

    fn start(
        &self,
        listener: Listener<PathCallback>,
        mode: AttachMode,
    ) -> Result<Value, ObserverError> {
        let value = {
            let mut inner = self.0.borrow_mut();
            inner.core.begin_open(listener)?;
            let value = inner.path.get(&inner.root);
            inner.value = value.clone();
            value
        };
        schedule(&self.0, mode, || Box::new(self.clone()));
        Ok(value)
    }
}

impl Observer for PathObserver {
    fn id(&self) -> ObserverId {
        self.0.borrow().core.id()
    }

    fn state(&self) -> ObserverState {
        self.0.borrow().core.state
    }

    fn value(&self) -> Value {
        self.0.borrow().value.clone()
    }

    fn attach(&self, notify: Notify, mode: AttachMode) -> Result<Value, ObserverError> {
        self.start(Listener::Notify(notify), mode)
    }

    fn check(&self) -> bool {
        let (new, old) = {
            let mut inner = self.0.borrow_mut();
            if !inner.core.can_check() {
                return false;
            }
            let new = inner.path.get(&inner.root);
            if same_value(&new, &inner.value) {
                return false;
            }
            let old = std::mem::replace(&mut inner.value, new.clone());
            (new, old)
        };
        report(&self.0, |callback| callback(&new, &old));
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
            inner.value = inner.path.get(&inner.root);
        }
        inner.value.clone()
    }

    fn set_value(&self, value: Value) -> bool {
        let (root, path) = {
            let inner = self.0.borrow();
            (inner.root.clone(), inner.path.clone())
        };
        path.set(&root, value)
    }

    fn close(&self) {
        let mut inner = self.0.borrow_mut();
        if !inner.core.is_open() {
            return;
        }
        inner.core.shutdown();
        inner.value = Value::Undefined;
    }
}

impl fmt::Debug for PathObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("PathObserver")
            .field("id", &inner.core.id())
            .field("state", &inner.core.state)
            .field("path", &inner.path)
            .field("value", &inner.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, impl FnMut(&Value, &Value) -> CallbackResult) {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        (count, move |_: &Value, _: &Value| {
            sink.set(sink.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn test_open_returns_initial_value() {
        let engine = Engine::default();
        let root = Value::from(json!({"a": {"b": 3}}));
        let observer = PathObserver::new(&engine, root, "a.b");
        let (_, callback) = counter();
        assert_eq!(observer.open(callback).unwrap(), Value::from(3));
        assert_eq!(observer.state(), ObserverState::Opened);
        assert_eq!(engine.open_observer_count(), 1);
    }

    #[test]
    fn test_double_open_fails() {
        let engine = Engine::default();
        let observer = PathObserver::new(&engine, Value::empty_object(), "a");
        observer.open(|_, _| Ok(())).unwrap();
        assert_eq!(observer.open(|_, _| Ok(())), Err(ObserverError::AlreadyOpened));
        observer.close();
        assert_eq!(observer.open(|_, _| Ok(())), Err(ObserverError::AlreadyOpened));
    }

    #[test]
    fn test_same_value_does_not_fire() {
        let engine = Engine::default();
        let root = Value::from(json!({"n": 1}));
        let observer = PathObserver::new(&engine, root.clone(), "n");
        let (count, callback) = counter();
        observer.open(callback).unwrap();

        observer.set_value(Value::from(1));
        engine.run_checkpoint();
        assert_eq!(count.get(), 0);

        observer.set_value(Value::from(f64::NAN));
        engine.run_checkpoint();
        observer.set_value(Value::from(f64::NAN));
        engine.run_checkpoint();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_signed_zero_is_a_change() {
        let engine = Engine::default();
        let root = Value::from(json!({"n": 0}));
        let observer = PathObserver::new(&engine, root, "n");
        let (count, callback) = counter();
        observer.open(callback).unwrap();
        observer.set_value(Value::from(-0.0));
        observer.deliver();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_discard_changes_suppresses_report() {
        let engine = Engine::default();
        let root = Value::from(json!({"n": 1}));
        let observer = PathObserver::new(&engine, root, "n");
        let (count, callback) = counter();
        observer.open(callback).unwrap();
        observer.set_value(Value::from(2));
        assert_eq!(observer.discard_changes(), Value::from(2));
        engine.run_checkpoint();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let engine = Engine::default();
        let observer = PathObserver::new(&engine, Value::empty_object(), "a");
        observer.close();
        assert_eq!(observer.state(), ObserverState::Unopened);
        observer.open(|_, _| Ok(())).unwrap();
        observer.close();
        observer.close();
        assert_eq!(observer.state(), ObserverState::Closed);
        assert_eq!(engine.open_observer_count(), 0);
        assert!(!observer.check());
    }

    #[test]
    fn test_invalid_path_never_fires() {
        let engine = Engine::default();
        let root = Value::from(json!({"a": 1}));
        let observer = PathObserver::new(&engine, root.clone(), "a..b");
        let (count, callback) = counter();
        assert!(observer.open(callback).unwrap().is_undefined());
        assert!(!observer.set_value(Value::from(2)));
        root.as_object().unwrap().insert("a", Value::from(5));
        engine.run_checkpoint();
        assert_eq!(count.get(), 0);
    }
}
