//! Dirty-checking change detection over shared JSON-like values.
//!
//! Observers record a baseline when opened and compare against live data
//! each time the owning [`Engine`] runs a checkpoint. Changes are reported
//! to plain closures; nothing is pushed at mutation time.
//!
//! - [`PathObserver`] watches one `(root, path)` pair.
//! - [`ObjectObserver`] reports added, removed and changed properties.
//! - [`ArrayObserver`] reports minimal [`Splice`] lists.
//! - [`CompoundObserver`] batches many paths and observers into one report.
//! - [`ObserverTransform`] projects another observer's value.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use json_observe::{ArrayObserver, Engine, Splice};
//! use json_observe_value::Value;
//! use serde_json::json;
//!
//! let engine = Engine::default();
//! let list = Value::from(json!([1, 2, 3, 4, 5]));
//!
//! let reports = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&reports);
//! let observer = ArrayObserver::new(&engine, &list).unwrap();
//! observer
//!     .open(move |splices| {
//!         sink.borrow_mut().extend_from_slice(splices);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! list.as_array().unwrap().set(1, Value::from(9));
//! let outcome = engine.run_checkpoint();
//! assert!(outcome.any_changed);
//! assert_eq!(*reports.borrow(), vec![Splice::new(1, vec![Value::from(2)], 1)]);
//! ```

mod callback;
mod config;
mod engine;
mod error;
mod observer;

pub use callback::{CallbackResult, Notify};
pub use config::{EngineConfig, MAX_DIRTY_CHECK_CYCLES};
pub use engine::{run_checkpoint, CheckpointOutcome, Engine};
pub use error::{CallbackError, ConfigError, ObserverError};

pub use observer::array::{ArrayCallback, ArrayObserver};
pub use observer::compound::{CompoundCallback, CompoundChange, CompoundObserver, ObservedEntry};
pub use observer::object::{ObjectCallback, ObjectDiff, ObjectObserver};
pub use observer::path::{PathCallback, PathObserver};
pub use observer::splice::{
    apply_splices, calc_splices, calculate_splices, calculate_splices_by, Splice,
};
pub use observer::transform::{ObserverTransform, TransformCallback, ValueFn};
pub use observer::{AttachMode, Observer, ObserverId, ObserverState};

pub use json_observe_path::{ObservablePath, PathCache, PathKey};
pub use json_observe_value::{same_value, Value};
