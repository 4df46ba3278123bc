use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use json_observe_value::{same_value, Value};

use super::{report, schedule, AttachMode, HasCore, Observer, ObserverCore, ObserverId, ObserverState};
use crate::callback::{Listener, Notify};
use crate::{CallbackResult, Engine, ObserverError};

/// A value mapping used by [`ObserverTransform`].
pub type ValueFn = Rc<dyn Fn(&Value) -> Value>;

/// Callback receiving `(new_projected, old_projected)`.
pub type TransformCallback = dyn FnMut(&Value, &Value) -> CallbackResult;

struct TransformInner {
    core: ObserverCore<TransformCallback>,
    observer: Rc<dyn Observer>,
    project: ValueFn,
    unproject: Option<ValueFn>,
    pass_through_set: bool,
    value: Value,
}

impl HasCore for TransformInner {
    type Callback = TransformCallback;

    fn core_mut(&mut self) -> &mut ObserverCore<TransformCallback> {
        &mut self.core
    }
}

/// Decorates an observer with a projection of its value.
///
/// Change detection runs on the projected value, so a projection that maps
/// distinct inputs to the same output suppresses the report. The wrapped
/// observer is opened, polled and closed through the transform.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use json_observe::{Engine, ObserverTransform, PathObserver};
/// use json_observe_value::Value;
/// use serde_json::json;
///
/// let engine = Engine::default();
/// let root = Value::from(json!({"x": 1.1}));
/// let floor = |v: &Value| Value::from(v.as_number().unwrap_or(0.0).floor());
/// let transform = ObserverTransform::new(
///     &engine,
///     PathObserver::new(&engine, root.clone(), "x"),
///     floor,
/// );
///
/// let calls = Rc::new(Cell::new(0));
/// let sink = Rc::clone(&calls);
/// let initial = transform
///     .open(move |_, _| {
///         sink.set(sink.get() + 1);
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(initial, Value::from(1.0));
///
/// engine.path("x").set(&root, Value::from(1.9));
/// engine.run_checkpoint();
/// assert_eq!(calls.get(), 0);
///
/// engine.path("x").set(&root, Value::from(2.5));
/// engine.run_checkpoint();
/// assert_eq!(calls.get(), 1);
/// ```
#[derive(Clone)]
pub struct ObserverTransform(Rc<RefCell<TransformInner>>);

impl ObserverTransform {
    pub fn new<O, P>(engine: &Engine, observer: O, project: P) -> Self
    where
        O: Observer + 'static,
        P: Fn(&Value) -> Value + 'static,
    {
        Self::from_shared(engine, Rc::new(observer), Rc::new(project))
    }

    pub fn from_shared(engine: &Engine, observer: Rc<dyn Observer>, project: ValueFn) -> Self {
        Self(Rc::new(RefCell::new(TransformInner {
            core: ObserverCore::new(engine),
            observer,
            project,
            unproject: None,
            pass_through_set: true,
            value: Value::Undefined,
        })))
    }

    /// Maps values written through [`Observer::set_value`] before they reach
    /// the wrapped observer.
    #[must_use]
    pub fn with_unproject<U>(self, unproject: U) -> Self
    where
        U: Fn(&Value) -> Value + 'static,
    {
        self.0.borrow_mut().unproject = Some(Rc::new(unproject));
        self
    }

    /// Makes [`Observer::set_value`] a no-op that returns false.
    #[must_use]
    pub fn without_set_pass_through(self) -> Self {
        self.0.borrow_mut().pass_through_set = false;
        self
    }

    pub fn open<F>(&self, callback: F) -> Result<Value, ObserverError>
    where
        F: FnMut(&Value, &Value) -> CallbackResult + 'static,
    {
        self.start(Listener::Callback(Box::new(callback)), AttachMode::Scheduled)
    }

    pub fn inner(&self) -> Rc<dyn Observer> {
        Rc::clone(&self.0.borrow().observer)
    }

    /// The wrapped observer is always attached nested; only the transform is
    /// registered with the engine.
    fn start(
        &self,
        listener: Listener<TransformCallback>,
        mode: AttachMode,
    ) -> Result<Value, ObserverError> {
        let (observer, project) = {
            let inner = self.0.borrow();
            inner.core.ensure_unopened()?;
            (Rc::clone(&inner.observer), Rc::clone(&inner.project))
        };
        let weak = Rc::downgrade(&self.0);
        let notify: Notify = Box::new(move || on_inner_change(&weak));
        let raw = observer.attach(notify, AttachMode::Nested)?;
        let value = project(&raw);

        {
            let mut inner = self.0.borrow_mut();
            inner.core.begin_open(listener)?;
            inner.value = value.clone();
        }
        schedule(&self.0, mode, || Box::new(self.clone()));
        Ok(value)
    }

    fn project_current(&self, raw: &Value) -> Value {
        let project = Rc::clone(&self.0.borrow().project);
        project(raw)
    }
}

fn on_inner_change(weak: &Weak<RefCell<TransformInner>>) {
    let Some(cell) = weak.upgrade() else {
        return;
    };
    let (observer, project) = {
        let inner = cell.borrow();
        if !inner.core.is_open() {
            return;
        }
        (Rc::clone(&inner.observer), Rc::clone(&inner.project))
    };
    let value = project(&observer.value());

    let old = {
        let mut inner = cell.borrow_mut();
        if same_value(&value, &inner.value) {
            return;
        }
        std::mem::replace(&mut inner.value, value.clone())
    };
    report(&cell, |callback| callback(&value, &old));
}

impl Observer for ObserverTransform {
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

    /// True only when the projected value changed.
    fn check(&self) -> bool {
        let (observer, before) = {
            let inner = self.0.borrow();
            if !inner.core.can_check() {
                return false;
            }
            (Rc::clone(&inner.observer), inner.value.clone())
        };
        observer.check() && !same_value(&before, &self.0.borrow().value)
    }

    fn deliver(&self) {
        let observer = {
            let inner = self.0.borrow();
            if !inner.core.is_open() {
                return;
            }
            Rc::clone(&inner.observer)
        };
        observer.deliver();
    }

    fn discard_changes(&self) -> Value {
        let observer = Rc::clone(&self.0.borrow().observer);
        let value = self.project_current(&observer.discard_changes());
        self.0.borrow_mut().value = value.clone();
        value
    }

    fn set_value(&self, value: Value) -> bool {
        let (observer, unproject, pass_through) = {
            let inner = self.0.borrow();
            (
                Rc::clone(&inner.observer),
                inner.unproject.clone(),
                inner.pass_through_set,
            )
        };
        let value = match unproject {
            Some(unproject) => unproject(&value),
            None => value,
        };
        pass_through && observer.set_value(value)
    }

    /// Closes the wrapped observer too.
    fn close(&self) {
        let observer = {
            let mut inner = self.0.borrow_mut();
            if !inner.core.is_open() {
                return;
            }
            inner.core.shutdown();
            inner.value = Value::Undefined;
            Rc::clone(&inner.observer)
        };
        observer.close();
    }
}

impl fmt::Debug for ObserverTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("ObserverTransform")
            .field("id", &inner.core.id())
            .field("state", &inner.core.state)
            .field("inner", &inner.observer.id())
            .field("value", &inner.value)
            .finish()
    }
}
