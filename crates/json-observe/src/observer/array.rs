use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use json_observe_value::{ArrayRef, Value};

use super::splice::{calculate_splices, Splice};
use super::{
    dirty_check, report, schedule, AttachMode, HasCore, Observer, ObserverCore, ObserverId,
    ObserverState,
};
use crate::callback::{Listener, Notify};
use crate::{CallbackResult, Engine, ObserverError};

/// Callback receiving the splices since the last report, in ascending index
/// order.
pub type ArrayCallback = dyn FnMut(&[Splice]) -> CallbackResult;

struct ArrayObserverInner {
    core: ObserverCore<ArrayCallback>,
    array: ArrayRef,
    snapshot: Vec<Value>,
}

impl HasCore for ArrayObserverInner {
    type Callback = ArrayCallback;

    fn core_mut(&mut self) -> &mut ObserverCore<ArrayCallback> {
        &mut self.core
    }
}

/// Watches the elements of one array and reports splice lists.
///
/// Elements compare by identity for containers and SameValue for primitives;
/// mutating an object stored in the array is not a change to the array.
#[derive(Clone)]
pub struct ArrayObserver(Rc<RefCell<ArrayObserverInner>>);

impl ArrayObserver {
    /// Fails with [`ObserverError::NotAnArray`] unless `array` is an array.
    pub fn new(engine: &Engine, array: &Value) -> Result<Self, ObserverError> {
        let Value::Array(array) = array else {
            return Err(ObserverError::NotAnArray(array.type_name()));
        };
        Ok(Self(Rc::new(RefCell::new(ArrayObserverInner {
            core: ObserverCore::new(engine),
            array: array.clone(),
            snapshot: Vec::new(),
        }))))
    }

    pub fn open<F>(&self, callback: F) -> Result<Value, ObserverError>
    where
        F: FnMut(&[Splice]) -> CallbackResult + 'static,
    {
        self.start(Listener::Callback(Box::new(callback)), AttachMode::Scheduled)
    }

    pub fn array(&self) -> ArrayRef {
        self.0.borrow().array.clone()
    }

    fn start(
        &self,
        listener: Listener<ArrayCallback>,
        mode: AttachMode,
    ) -> Result<Value, ObserverError> {
        let value = {
            let mut inner = self.0.borrow_mut();
            inner.core.begin_open(listener)?;
            inner.snapshot = inner.array.snapshot();
            Value::Array(inner.array.clone())
        };
        schedule(&self.0, mode, || Box::new(self.clone()));
        Ok(value)
    }
}

impl Observer for ArrayObserver {
    fn id(&self) -> ObserverId {
        self.0.borrow().core.id()
    }

    fn state(&self) -> ObserverState {
        self.0.borrow().core.state
    }

    fn value(&self) -> Value {
        Value::Array(self.0.borrow().array.clone())
    }

    fn attach(&self, notify: Notify, mode: AttachMode) -> Result<Value, ObserverError> {
        self.start(Listener::Notify(notify), mode)
    }

    fn check(&self) -> bool {
        let splices = {
            let mut inner = self.0.borrow_mut();
            if !inner.core.can_check() {
                return false;
            }
            let current = inner.array.snapshot();
            let splices = calculate_splices(&current, &inner.snapshot);
            if splices.is_empty() {
                return false;
            }
            inner.snapshot = current;
            splices
        };
        report(&self.0, |callback| callback(splices.as_slice()));
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
            inner.snapshot = inner.array.snapshot();
        }
        Value::Array(inner.array.clone())
    }

    fn close(&self) {
        let mut inner = self.0.borrow_mut();
        if !inner.core.is_open() {
            return;
        }
        inner.core.shutdown();
        inner.snapshot = Vec::new();
    }
}

impl fmt::Debug for ArrayObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("ArrayObserver")
            .field("id", &inner.core.id())
            .field("state", &inner.core.state)
            .field("len", &inner.snapshot.len())
            .finish()
    }
}
