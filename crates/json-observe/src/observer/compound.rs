use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use json_observe_path::{IntoObservablePath, ObservablePath, PathCache};
use json_observe_value::{same_value, ArrayRef, Value};

use super::{
    dirty_check, report, schedule, AttachMode, HasCore, Observer, ObserverCore, ObserverId,
    ObserverState,
};
use crate::callback::{Listener, Notify};
use crate::{CallbackResult, Engine, ObserverError};

/// One watched source of a [`CompoundObserver`].
#[derive(Clone)]
pub enum ObservedEntry {
    Path { root: Value, path: ObservablePath },
    Observer(Rc<dyn Observer>),
}

impl fmt::Debug for ObservedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { path, .. } => f.debug_tuple("Path").field(path).finish(),
            Self::Observer(observer) => f.debug_tuple("Observer").field(&observer.id()).finish(),
        }
    }
}

/// A batched report from a [`CompoundObserver`].
#[derive(Debug, Clone)]
pub struct CompoundChange {
    /// Current value of every entry, in registration order.
    pub values: Vec<Value>,
    /// Previous values of the entries that changed, keyed by position.
    /// Unchanged positions are absent.
    pub old_values: BTreeMap<usize, Value>,
    pub observed: Vec<ObservedEntry>,
}

pub type CompoundCallback = dyn FnMut(&CompoundChange) -> CallbackResult;

struct CompoundInner {
    core: ObserverCore<CompoundCallback>,
    report_changes_on_open: bool,
    observed: Vec<ObservedEntry>,
    values: ArrayRef,
}

impl HasCore for CompoundInner {
    type Callback = CompoundCallback;

    fn core_mut(&mut self) -> &mut ObserverCore<CompoundCallback> {
        &mut self.core
    }
}

impl CompoundInner {
    fn ensure_accepting(&self) -> Result<(), ObserverError> {
        match self.core.state {
            ObserverState::Unopened | ObserverState::Resetting => Ok(()),
            ObserverState::Opened | ObserverState::Closed => Err(ObserverError::AlreadyStarted),
        }
    }
}

/// Aggregates several paths and nested observers into one positional value
/// vector and reports their changes together.
///
/// Nested observers are opened by the compound in [`AttachMode::Nested`] and
/// polled on every check; closing the compound closes them.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use json_observe::{CompoundObserver, Engine};
/// use json_observe_value::Value;
/// use serde_json::json;
///
/// let engine = Engine::default();
/// let root = Value::from(json!({"a": 1, "b": 2}));
///
/// let compound = CompoundObserver::new(&engine, false);
/// compound.add_path(root.clone(), "a").unwrap();
/// compound.add_path(root.clone(), "b").unwrap();
///
/// let changed = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&changed);
/// compound
///     .open(move |change| {
///         sink.borrow_mut().extend(change.old_values.keys().copied());
///         Ok(())
///     })
///     .unwrap();
///
/// engine.path("b").set(&root, Value::from(3));
/// engine.run_checkpoint();
/// assert_eq!(*changed.borrow(), vec![1]);
/// ```
#[derive(Clone)]
pub struct CompoundObserver(Rc<RefCell<CompoundInner>>);

impl CompoundObserver {
    /// With `report_changes_on_open`, values are captured as entries are
    /// added and any difference found when opening is reported immediately.
    /// Otherwise opening only records the baseline.
    pub fn new(engine: &Engine, report_changes_on_open: bool) -> Self {
        Self(Rc::new(RefCell::new(CompoundInner {
            core: ObserverCore::new(engine),
            report_changes_on_open,
            observed: Vec::new(),
            values: ArrayRef::default(),
        })))
    }

    /// Adds a path entry. Fails with [`ObserverError::AlreadyStarted`]
    /// unless the observer is unopened or resetting.
    pub fn add_path(&self, root: Value, path: impl IntoObservablePath) -> Result<(), ObserverError> {
        let mut inner = self.0.borrow_mut();
        inner.ensure_accepting()?;
        let path = match inner.core.engine.upgrade() {
            Some(engine) => engine.path(path),
            None => path.into_observable_path(&PathCache::new()),
        };
        let value = if inner.report_changes_on_open {
            path.get(&root)
        } else {
            Value::Undefined
        };
        inner.observed.push(ObservedEntry::Path { root, path });
        inner.values.push(value);
        Ok(())
    }

    /// Adds a nested observer, which must not have been opened.
    pub fn add_observer<O>(&self, observer: O) -> Result<(), ObserverError>
    where
        O: Observer + 'static,
    {
        self.add_shared_observer(Rc::new(observer))
    }

    pub fn add_shared_observer(&self, observer: Rc<dyn Observer>) -> Result<(), ObserverError> {
        let report_changes_on_open = {
            let inner = self.0.borrow();
            inner.ensure_accepting()?;
            inner.report_changes_on_open
        };
        let value = if report_changes_on_open {
            observer.attach(self.nested_notify(), AttachMode::Nested)?
        } else {
            Value::Undefined
        };
        let mut inner = self.0.borrow_mut();
        inner.observed.push(ObservedEntry::Observer(observer));
        inner.values.push(value);
        Ok(())
    }

    pub fn open<F>(&self, callback: F) -> Result<Value, ObserverError>
    where
        F: FnMut(&CompoundChange) -> CallbackResult + 'static,
    {
        self.start(Listener::Callback(Box::new(callback)), AttachMode::Scheduled)
    }

    /// Enters `Resetting`: closes nested observers and drops every entry.
    /// New entries may be added until [`finish_reset`](Self::finish_reset).
    pub fn start_reset(&self) -> Result<(), ObserverError> {
        {
            let mut inner = self.0.borrow_mut();
            if inner.core.state != ObserverState::Opened {
                return Err(ObserverError::ResetWhileNotOpen);
            }
            inner.core.state = ObserverState::Resetting;
        }
        self.disconnect();
        Ok(())
    }

    /// Returns to `Opened` with the entries added since
    /// [`start_reset`](Self::start_reset), and returns the new values.
    pub fn finish_reset(&self) -> Result<Value, ObserverError> {
        let report_changes_on_open = {
            let mut inner = self.0.borrow_mut();
            if inner.core.state != ObserverState::Resetting {
                return Err(ObserverError::NotResetting);
            }
            inner.core.state = ObserverState::Opened;
            inner.report_changes_on_open
        };
        self.connect(report_changes_on_open);
        Ok(self.value())
    }

    pub fn observed(&self) -> Vec<ObservedEntry> {
        self.0.borrow().observed.clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().observed.is_empty()
    }

    fn start(
        &self,
        listener: Listener<CompoundCallback>,
        mode: AttachMode,
    ) -> Result<Value, ObserverError> {
        let report_changes_on_open = {
            let mut inner = self.0.borrow_mut();
            inner.core.begin_open(listener)?;
            inner.report_changes_on_open
        };
        self.connect(report_changes_on_open);
        schedule(&self.0, mode, || Box::new(self.clone()));
        Ok(self.value())
    }

    fn connect(&self, report_changes: bool) {
        if let Some(change) = self.evaluate(!report_changes) {
            report(&self.0, |callback| callback(&change));
        }
    }

    fn disconnect(&self) {
        let observed = {
            let mut inner = self.0.borrow_mut();
            inner.values.borrow_mut().clear();
            std::mem::take(&mut inner.observed)
        };
        for entry in observed {
            if let ObservedEntry::Observer(observer) = entry {
                observer.close();
            }
        }
    }

    fn nested_notify(&self) -> Notify {
        let weak: Weak<RefCell<CompoundInner>> = Rc::downgrade(&self.0);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                CompoundObserver(inner).deliver();
            }
        })
    }

    /// Re-reads every entry. With `skip_changes` the values are recorded
    /// without producing a change.
    fn evaluate(&self, skip_changes: bool) -> Option<CompoundChange> {
        let observed = self.0.borrow().observed.clone();
        let mut current = Vec::with_capacity(observed.len());
        for entry in &observed {
            let value = match entry {
                ObservedEntry::Path { root, path } => path.get(root),
                ObservedEntry::Observer(observer) => {
                    if observer.state() == ObserverState::Unopened {
                        observer
                            .attach(self.nested_notify(), AttachMode::Nested)
                            .unwrap_or_else(|err| {
                                tracing::warn!(observer = %observer.id(), error = %err, "failed to open nested observer");
                                Value::Undefined
                            })
                    } else {
                        observer.discard_changes()
                    }
                }
            };
            current.push(value);
        }

        let values = self.0.borrow().values.clone();
        if values.len() < current.len() {
            values.resize(current.len());
        }
        let mut old_values = BTreeMap::new();
        for (i, value) in current.into_iter().enumerate() {
            let previous = values.get(i).unwrap_or_default();
            if skip_changes {
                values.set(i, value);
                continue;
            }
            if same_value(&value, &previous) {
                continue;
            }
            values.set(i, value);
            old_values.insert(i, previous);
        }

        if old_values.is_empty() {
            return None;
        }
        Some(CompoundChange {
            values: values.snapshot(),
            old_values,
            observed,
        })
    }
}

impl Observer for CompoundObserver {
    fn id(&self) -> ObserverId {
        self.0.borrow().core.id()
    }

    fn state(&self) -> ObserverState {
        self.0.borrow().core.state
    }

    /// The positional value array. Its identity is stable for the lifetime
    /// of the observer.
    fn value(&self) -> Value {
        Value::Array(self.0.borrow().values.clone())
    }

    fn attach(&self, notify: Notify, mode: AttachMode) -> Result<Value, ObserverError> {
        self.start(Listener::Notify(notify), mode)
    }

    fn check(&self) -> bool {
        if !self.0.borrow().core.can_check() {
            return false;
        }
        match self.evaluate(false) {
            Some(change) => {
                report(&self.0, |callback| callback(&change));
                true
            }
            None => false,
        }
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
        if self.0.borrow().core.state != ObserverState::Closed {
            self.evaluate(true);
        }
        self.value()
    }

    fn close(&self) {
        {
            let mut inner = self.0.borrow_mut();
            if !matches!(inner.core.state, ObserverState::Opened | ObserverState::Resetting) {
                return;
            }
            inner.core.shutdown();
        }
        self.disconnect();
    }
}

impl fmt::Debug for CompoundObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("CompoundObserver")
            .field("id", &inner.core.id())
            .field("state", &inner.core.state)
            .field("observed", &inner.observed)
            .finish()
    }
}
