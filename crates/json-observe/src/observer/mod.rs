//! Observer lifecycle and the shared dispatch machinery.
//!
//! Every observer is a cheap-clone handle over `Rc<RefCell<_>>` state with
//! the same lifecycle:
//!
//! ```text
//! Unopened --open--> Opened --close--> Closed
//!                     |  ^
//!          start_reset|  |finish_reset      (CompoundObserver only)
//!                     v  |
//!                   Resetting
//! ```
//!
//! Callbacks run with no observer state borrowed, so a callback may close,
//! deliver or discard changes on any observer, including its own.

use std::cell::RefCell;
use std::fmt;

use json_observe_value::Value;

use crate::callback::{guarded, Listener, Notify};
use crate::engine::WeakEngine;
use crate::{CallbackResult, Engine, ObserverError};

pub mod array;
pub mod compound;
pub mod object;
pub mod path;
pub mod splice;
pub mod transform;

/// Process-unique (per engine) observer identifier, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(pub(crate) u64);

impl ObserverId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverState {
    Unopened,
    Opened,
    Closed,
    Resetting,
}

/// How an observer is opened by [`Observer::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachMode {
    /// Registered with the engine and re-checked on every checkpoint.
    Scheduled,
    /// Polled by its owner through [`Observer::discard_changes`]; not
    /// registered with the engine.
    Nested,
}

/// The contract shared by every observer type.
///
/// Object safe, so aggregators and decorators can hold `Rc<dyn Observer>`.
pub trait Observer {
    fn id(&self) -> ObserverId;

    fn state(&self) -> ObserverState;

    /// The last recorded value.
    fn value(&self) -> Value;

    /// Opens the observer with a payload-free notification in place of a
    /// typed callback. Returns the initial value.
    fn attach(&self, notify: Notify, mode: AttachMode) -> Result<Value, ObserverError>;

    /// Compares current data against the last recorded value, records and
    /// reports any difference. Returns whether anything changed. A no-op
    /// outside `Opened`.
    fn check(&self) -> bool;

    /// Checks repeatedly until no change is found (bounded by the engine's
    /// cycle cap). A no-op outside `Opened`.
    fn deliver(&self);

    /// Re-baselines to current data without reporting; returns the new value.
    fn discard_changes(&self) -> Value;

    /// Writes `value` back to the observed location. Returns false when the
    /// observer has nowhere to write.
    fn set_value(&self, _value: Value) -> bool {
        false
    }

    /// Releases the callback and recorded state. Idempotent; a no-op on a
    /// never-opened observer.
    fn close(&self);
}

/// Lifecycle state shared by all observer kinds.
pub(crate) struct ObserverCore<C: ?Sized> {
    id: ObserverId,
    pub(crate) state: ObserverState,
    pub(crate) engine: WeakEngine,
    listener: Option<Listener<C>>,
    dispatching: bool,
    /// Registry generation the observer was scheduled into.
    registration: Option<u64>,
}

impl<C: ?Sized> ObserverCore<C> {
    pub(crate) fn new(engine: &Engine) -> Self {
        Self {
            id: engine.next_observer_id(),
            state: ObserverState::Unopened,
            engine: engine.downgrade(),
            listener: None,
            dispatching: false,
            registration: None,
        }
    }

    pub(crate) fn id(&self) -> ObserverId {
        self.id
    }

    pub(crate) fn is_open(&self) -> bool {
        self.state == ObserverState::Opened
    }

    /// Open and not inside its own callback. A check made from the callback
    /// leaves the baseline alone, so the change it would record is picked up
    /// by the next check once the callback has returned.
    pub(crate) fn can_check(&self) -> bool {
        self.is_open() && !self.dispatching
    }

    pub(crate) fn ensure_unopened(&self) -> Result<(), ObserverError> {
        if self.state == ObserverState::Unopened {
            Ok(())
        } else {
            Err(ObserverError::AlreadyOpened)
        }
    }

    /// Moves to `Opened` with `listener` installed.
    pub(crate) fn begin_open(&mut self, listener: Listener<C>) -> Result<(), ObserverError> {
        self.ensure_unopened()?;
        self.listener = Some(listener);
        self.state = ObserverState::Opened;
        Ok(())
    }

    /// Moves to `Closed` and drops the listener.
    pub(crate) fn shutdown(&mut self) {
        self.state = ObserverState::Closed;
        self.listener = None;
        if let Some(generation) = self.registration.take() {
            self.engine.observer_closed(generation);
        }
    }
}

pub(crate) trait HasCore {
    type Callback: ?Sized;

    fn core_mut(&mut self) -> &mut ObserverCore<Self::Callback>;
}

/// Hands a freshly opened observer to the engine when it was opened in
/// scheduled mode and is still open.
pub(crate) fn schedule<I: HasCore>(
    cell: &RefCell<I>,
    mode: AttachMode,
    observer: impl FnOnce() -> Box<dyn Observer>,
) {
    if mode != AttachMode::Scheduled {
        return;
    }
    let engine = {
        let mut inner = cell.borrow_mut();
        let core = inner.core_mut();
        if !core.is_open() {
            return;
        }
        let engine = core.engine.upgrade();
        core.registration = engine.as_ref().map(Engine::registry_generation);
        engine
    };
    if let Some(engine) = engine {
        engine.register(observer());
    }
}

/// Invokes the observer's listener with nothing borrowed.
///
/// The listener is taken out of its slot for the duration of the call and
/// put back only if the observer is still live afterwards. Failures are
/// logged and counted on the engine.
pub(crate) fn report<I, F>(cell: &RefCell<I>, call: F)
where
    I: HasCore,
    F: FnOnce(&mut I::Callback) -> CallbackResult,
{
    let (mut listener, id, engine) = {
        let mut inner = cell.borrow_mut();
        let core = inner.core_mut();
        match core.listener.take() {
            Some(listener) => {
                core.dispatching = true;
                (listener, core.id, core.engine.clone())
            }
            None => return,
        }
    };

    tracing::trace!(observer = %id, "reporting change");
    let result = match &mut listener {
        Listener::Callback(callback) => guarded(|| call(&mut **callback)),
        Listener::Notify(notify) => guarded(|| {
            (*notify)();
            Ok(())
        }),
    };
    if let Err(err) = result {
        tracing::error!(observer = %id, error = %err, "exception caught during observer callback");
        engine.record_callback_error();
    }

    let mut inner = cell.borrow_mut();
    let core = inner.core_mut();
    core.dispatching = false;
    let live = matches!(core.state, ObserverState::Opened | ObserverState::Resetting);
    if live && core.listener.is_none() {
        core.listener = Some(listener);
    }
}

/// Calls `check` until it reports no change, at most the engine's cycle cap
/// times. Returns whether anything changed.
pub(crate) fn dirty_check(observer: &dyn Observer, engine: &WeakEngine) -> bool {
    let max_cycles = engine.max_cycles();
    let mut cycles = 0;
    while cycles < max_cycles && observer.check() {
        cycles += 1;
    }
    engine.set_last_cycle_count(cycles);
    cycles > 0
}
