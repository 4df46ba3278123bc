//! The checkpoint scheduler.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use json_observe_path::{IntoObservablePath, ObservablePath, PathCache};

use crate::observer::{Observer, ObserverId, ObserverState};
use crate::EngineConfig;

struct EngineInner {
    config: EngineConfig,
    paths: PathCache,
    observers: RefCell<Vec<Box<dyn Observer>>>,
    open_observers: Cell<usize>,
    /// Bumped by `clear_observers`.
    registry_generation: Cell<u64>,
    next_observer_id: Cell<u64>,
    running_checkpoint: Cell<bool>,
    callback_errors: Cell<u64>,
    last_cycle_count: Cell<usize>,
}

/// Owner of the observer registry and the path cache.
///
/// `Engine` is a cheap-clone handle. Observers keep only a weak reference to
/// it, so dropping every handle stops scheduling without closing observers.
#[derive(Clone)]
pub struct Engine(Rc<EngineInner>);

#[derive(Clone, Default)]
pub(crate) struct WeakEngine(Weak<EngineInner>);

/// Summary of one [`Engine::run_checkpoint`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointOutcome {
    /// Passes over the registry, including the final quiet one.
    pub cycles: usize,
    /// Whether any observer reported a change.
    pub any_changed: bool,
    /// False when the cycle cap stopped the loop while changes were still
    /// being produced.
    pub converged: bool,
}

impl CheckpointOutcome {
    const SKIPPED: Self = Self {
        cycles: 0,
        any_changed: false,
        converged: true,
    };
}

thread_local! {
    static CURRENT: Engine = Engine::default();
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self(Rc::new(EngineInner {
            config,
            paths: PathCache::new(),
            observers: RefCell::new(Vec::new()),
            open_observers: Cell::new(0),
            registry_generation: Cell::new(0),
            next_observer_id: Cell::new(1),
            running_checkpoint: Cell::new(false),
            callback_errors: Cell::new(0),
            last_cycle_count: Cell::new(0),
        }))
    }

    /// The engine shared by everything on the current thread.
    pub fn current() -> Self {
        CURRENT.with(Self::clone)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.0.config
    }

    pub fn paths(&self) -> &PathCache {
        &self.0.paths
    }

    /// Resolves `path` through this engine's cache.
    pub fn path(&self, path: impl IntoObservablePath) -> ObservablePath {
        path.into_observable_path(&self.0.paths)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Re-checks every open observer until a pass produces no change or the
    /// cycle cap is reached.
    ///
    /// Observers are checked in the order they were opened. Closed observers
    /// are dropped from the registry; resetting ones are skipped. A call made
    /// while a checkpoint is already running returns immediately.
    pub fn run_checkpoint(&self) -> CheckpointOutcome {
        if self.0.running_checkpoint.replace(true) {
            return CheckpointOutcome::SKIPPED;
        }
        let _guard = RunningGuard(&self.0.running_checkpoint);

        let max_cycles = self.max_cycles();
        let mut cycles = 0;
        let mut any_changed = false;
        let mut changed;

        loop {
            cycles += 1;
            changed = false;

            let generation = self.registry_generation();
            let to_check = std::mem::take(&mut *self.0.observers.borrow_mut());
            let mut survivors = Vec::with_capacity(to_check.len());
            for observer in to_check {
                if self.registry_generation() != generation {
                    break;
                }
                match observer.state() {
                    ObserverState::Closed => continue,
                    ObserverState::Opened => {
                        if observer.check() {
                            changed = true;
                        }
                    }
                    ObserverState::Unopened | ObserverState::Resetting => {}
                }
                survivors.push(observer);
            }

            // Observers opened during the pass go after the survivors. A
            // clear during the pass discards the survivors.
            if self.registry_generation() == generation {
                let mut registry = self.0.observers.borrow_mut();
                survivors.append(&mut registry);
                *registry = survivors;
            }

            any_changed |= changed;
            if !changed || cycles >= max_cycles {
                break;
            }
        }

        let converged = !changed;
        if !converged {
            tracing::debug!(cycles, "checkpoint stopped at the dirty-check cycle cap");
        }
        tracing::debug!(
            cycles,
            any_changed,
            observers = self.0.observers.borrow().len(),
            "checkpoint complete"
        );
        self.0.last_cycle_count.set(cycles);
        CheckpointOutcome {
            cycles,
            any_changed,
            converged,
        }
    }

    /// Number of observers opened on this engine and not yet closed.
    pub fn open_observer_count(&self) -> usize {
        self.0.open_observers.get()
    }

    /// Drops every observer from the registry without closing it.
    ///
    /// Called from a callback during a checkpoint, the rest of the pass is
    /// skipped and only observers opened after the clear stay registered.
    pub fn clear_observers(&self) {
        self.0.observers.borrow_mut().clear();
        self.0.open_observers.set(0);
        let generation = &self.0.registry_generation;
        generation.set(generation.get().wrapping_add(1));
    }

    /// Whether any callback has failed since the last reset.
    pub fn callback_error_occurred(&self) -> bool {
        self.0.callback_errors.get() > 0
    }

    pub fn callback_error_count(&self) -> u64 {
        self.0.callback_errors.get()
    }

    pub fn reset_callback_errors(&self) {
        self.0.callback_errors.set(0);
    }

    /// Cycles used by the most recent checkpoint or `deliver`.
    pub fn last_cycle_count(&self) -> usize {
        self.0.last_cycle_count.get()
    }

    pub(crate) fn downgrade(&self) -> WeakEngine {
        WeakEngine(Rc::downgrade(&self.0))
    }

    pub(crate) fn next_observer_id(&self) -> ObserverId {
        let id = self.0.next_observer_id.get();
        self.0.next_observer_id.set(id.saturating_add(1));
        ObserverId(id)
    }

    pub(crate) fn registry_generation(&self) -> u64 {
        self.0.registry_generation.get()
    }

    pub(crate) fn register(&self, observer: Box<dyn Observer>) {
        self.0.observers.borrow_mut().push(observer);
        self.0.open_observers.set(self.0.open_observers.get() + 1);
    }

    fn max_cycles(&self) -> usize {
        self.0.config.max_dirty_check_cycles.max(1)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.0.config)
            .field("open_observers", &self.0.open_observers.get())
            .field("callback_errors", &self.0.callback_errors.get())
            .finish_non_exhaustive()
    }
}

impl WeakEngine {
    pub(crate) fn upgrade(&self) -> Option<Engine> {
        self.0.upgrade().map(Engine)
    }

    pub(crate) fn max_cycles(&self) -> usize {
        self.upgrade()
            .map_or(crate::config::MAX_DIRTY_CHECK_CYCLES, |engine| engine.max_cycles())
    }

    pub(crate) fn record_callback_error(&self) {
        if let Some(engine) = self.upgrade() {
            let errors = &engine.0.callback_errors;
            errors.set(errors.get().saturating_add(1));
        }
    }

    /// Observers registered before the latest clear are no longer counted.
    pub(crate) fn observer_closed(&self, generation: u64) {
        if let Some(engine) = self.upgrade() {
            if engine.registry_generation() != generation {
                return;
            }
            let open = &engine.0.open_observers;
            open.set(open.get().saturating_sub(1));
        }
    }

    pub(crate) fn set_last_cycle_count(&self, cycles: usize) {
        if let Some(engine) = self.upgrade() {
            engine.0.last_cycle_count.set(cycles);
        }
    }
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Runs a checkpoint on [`Engine::current`].
pub fn run_checkpoint() -> CheckpointOutcome {
    Engine::current().run_checkpoint()
}
