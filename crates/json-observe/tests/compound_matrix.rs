use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use json_observe::{
    CompoundChange, CompoundObserver, Engine, ObservedEntry, Observer, ObserverError,
    ObserverState, ObserverTransform, PathObserver,
};
use json_observe_value::Value;
use serde_json::json;

const KEYS: [&str; 5] = ["a", "b", "c", "d", "e"];

fn recording(compound: &CompoundObserver) -> Rc<RefCell<Vec<CompoundChange>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    compound
        .open(move |change| {
            sink.borrow_mut().push(change.clone());
            Ok(())
        })
        .unwrap();
    log
}

#[test]
fn compound_old_values_are_sparse_for_every_subset() {
    for mask in 1u32..(1 << KEYS.len()) {
        let engine = Engine::default();
        let root = Value::from(json!({"a": 0, "b": 0, "c": 0, "d": 0, "e": 0}));
        let compound = CompoundObserver::new(&engine, false);
        for key in KEYS {
            compound.add_path(root.clone(), key).unwrap();
        }
        let log = recording(&compound);

        let mut expected = BTreeMap::new();
        for (i, key) in KEYS.iter().enumerate() {
            if mask & (1 << i) != 0 {
                engine.path(*key).set(&root, Value::from(i + 1));
                expected.insert(i, Value::from(0));
            }
        }
        engine.run_checkpoint();

        let log = log.borrow();
        assert_eq!(log.len(), 1, "mask {mask:05b}");
        assert_eq!(log[0].old_values, expected, "mask {mask:05b}");
        for (i, value) in log[0].values.iter().enumerate() {
            let want = if mask & (1 << i) != 0 { i + 1 } else { 0 };
            assert_eq!(*value, Value::from(want), "mask {mask:05b} index {i}");
        }
        assert_eq!(log[0].observed.len(), KEYS.len());
    }
}

#[test]
fn compound_reset_swaps_entries() {
    let engine = Engine::default();
    let root = Value::from(json!({"old": 1, "new": 10}));
    let compound = CompoundObserver::new(&engine, false);
    compound.add_path(root.clone(), "old").unwrap();
    let log = recording(&compound);

    compound.start_reset().unwrap();
    assert!(compound.is_empty());
    // Resetting observers are skipped by the checkpoint.
    engine.path("old").set(&root, Value::from(2));
    engine.run_checkpoint();
    assert!(log.borrow().is_empty());

    compound.add_path(root.clone(), "new").unwrap();
    let values = compound.finish_reset().unwrap();
    assert_eq!(values.to_json(), json!([10]));
    assert_eq!(compound.state(), ObserverState::Opened);
    assert_eq!(engine.open_observer_count(), 1);

    engine.path("old").set(&root, Value::from(3));
    engine.run_checkpoint();
    assert!(log.borrow().is_empty());

    engine.path("new").set(&root, Value::from(11));
    engine.run_checkpoint();
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].old_values.get(&0), Some(&Value::from(10)));
    assert!(matches!(&log[0].observed[0], ObservedEntry::Path { path, .. } if path.to_string() == "new"));
}

#[test]
fn compound_reset_closes_nested_observers() {
    let engine = Engine::default();
    let root = Value::from(json!({"n": 1}));
    let nested = PathObserver::new(&engine, root.clone(), "n");
    let compound = CompoundObserver::new(&engine, false);
    compound.add_observer(nested.clone()).unwrap();
    recording(&compound);
    assert_eq!(nested.state(), ObserverState::Opened);

    compound.start_reset().unwrap();
    assert_eq!(nested.state(), ObserverState::Closed);
    compound.finish_reset().unwrap();
    assert!(compound.value().as_array().unwrap().is_empty());
}

#[test]
fn compound_with_nested_transform() {
    let engine = Engine::default();
    let root = Value::from(json!({"x": 1.2, "label": "a"}));
    let transform = ObserverTransform::new(
        &engine,
        PathObserver::new(&engine, root.clone(), "x"),
        |v: &Value| Value::from(v.as_number().unwrap_or(0.0).round()),
    );
    let compound = CompoundObserver::new(&engine, false);
    compound.add_observer(transform).unwrap();
    compound.add_path(root.clone(), "label").unwrap();
    let log = recording(&compound);
    assert_eq!(compound.value().to_json(), json!([1, "a"]));

    engine.path("x").set(&root, Value::from(1.4));
    engine.run_checkpoint();
    assert!(log.borrow().is_empty());

    engine.path("x").set(&root, Value::from(2.6));
    engine.path("label").set(&root, Value::from("b"));
    engine.run_checkpoint();

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].values, vec![Value::from(3.0), Value::from("b")]);
    assert_eq!(log[0].old_values.len(), 2);
    assert_eq!(engine.open_observer_count(), 1);
}

#[test]
fn compound_rejects_already_opened_observer() {
    let engine = Engine::default();
    let root = Value::from(json!({"n": 1}));
    let nested = PathObserver::new(&engine, root.clone(), "n");
    nested.open(|_, _| Ok(())).unwrap();

    let compound = CompoundObserver::new(&engine, true);
    assert_eq!(
        compound.add_observer(nested.clone()),
        Err(ObserverError::AlreadyOpened)
    );
    assert!(compound.is_empty());
}

#[test]
fn compound_close_is_idempotent_and_final() {
    let engine = Engine::default();
    let root = Value::from(json!({"a": 1}));
    let compound = CompoundObserver::new(&engine, false);
    compound.add_path(root.clone(), "a").unwrap();
    let log = recording(&compound);

    compound.close();
    compound.close();
    assert_eq!(compound.state(), ObserverState::Closed);
    assert_eq!(engine.open_observer_count(), 0);
    assert_eq!(compound.start_reset(), Err(ObserverError::ResetWhileNotOpen));

    engine.path("a").set(&root, Value::from(2));
    engine.run_checkpoint();
    compound.deliver();
    assert!(log.borrow().is_empty());
}
