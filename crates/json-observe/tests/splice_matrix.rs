use std::cell::RefCell;
use std::rc::Rc;

use json_observe::{
    apply_splices, calc_splices, calculate_splices, calculate_splices_by, ArrayObserver, Engine,
    Splice,
};
use json_observe_value::Value;
use proptest::prelude::*;
use serde_json::json;

fn lcs_len(a: &[u8], b: &[u8]) -> usize {
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i][j] = if a[i - 1] == b[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }
    table[a.len()][b.len()]
}

#[test]
fn splice_reference_matrix() {
    let cases: Vec<(Vec<i32>, Vec<i32>, Vec<Splice<i32>>)> = vec![
        (vec![1, 2, 3, 4, 5], vec![1, 9, 3, 4, 5], vec![Splice::new(1, vec![2], 1)]),
        (vec![1, 2, 3], vec![1, 2, 3, 4], vec![Splice::new(3, vec![], 1)]),
        (vec![1, 2, 3], vec![], vec![Splice::new(0, vec![1, 2, 3], 0)]),
        (vec![], vec![1, 2], vec![Splice::new(0, vec![], 2)]),
        (vec![1, 2, 3], vec![3, 2, 1], vec![Splice::new(0, vec![1], 1), Splice::new(2, vec![3], 1)]),
        (
            vec![0, 1, 2, 3, 4],
            vec![0, 2, 4],
            vec![Splice::new(1, vec![1], 0), Splice::new(2, vec![3], 0)],
        ),
    ];

    for (old, new, expected) in cases {
        let splices = calculate_splices(&new, &old);
        assert_eq!(splices, expected, "{old:?} -> {new:?}");
        let mut replay = old.clone();
        apply_splices(&mut replay, &new, &splices);
        assert_eq!(replay, new);
    }
}

#[test]
fn splice_window_skips_trim_when_offset() {
    let current = [1, 2, 3, 4];
    let old = [1, 2, 3, 4];
    assert!(calc_splices(&current, 1..3, &old, 1..3, &|a: &i32, b: &i32| a == b).is_empty());

    let current = [1, 7, 3, 4];
    let splices = calc_splices(&current, 1..3, &old, 1..3, &|a: &i32, b: &i32| a == b);
    assert_eq!(splices, vec![Splice::new(1, vec![2], 1)]);
}

#[test]
fn splice_equality_is_identity_for_containers() {
    let shared = Value::from(json!({"k": 1}));
    let lookalike = Value::from(json!({"k": 1}));
    let old = vec![Value::from(1), shared.clone()];

    assert!(calculate_splices(&[Value::from(1), shared.clone()], &old).is_empty());
    assert_eq!(
        calculate_splices(&[Value::from(1), lookalike], &old),
        vec![Splice::new(1, vec![shared], 1)]
    );

    let by_json = calculate_splices_by(
        &[Value::from(json!({"k": 1}))],
        &[Value::from(json!({"k": 1}))],
        |a, b| a.to_json() == b.to_json(),
    );
    assert!(by_json.is_empty());
}

#[derive(Debug, Clone)]
enum Op {
    Push(i32),
    Insert(usize, i32),
    Remove(usize),
    Set(usize, i32),
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..5i32).prop_map(Op::Push),
        (0..12usize, 0..5i32).prop_map(|(i, v)| Op::Insert(i, v)),
        (0..12usize).prop_map(Op::Remove),
        (0..12usize, 0..5i32).prop_map(|(i, v)| Op::Set(i, v)),
        Just(Op::Pop),
    ]
}

proptest! {
    #[test]
    fn splices_replay_old_into_new(
        old in prop::collection::vec(0u8..4, 0..12),
        new in prop::collection::vec(0u8..4, 0..12),
    ) {
        let splices = calculate_splices(&new, &old);
        let mut replay = old.clone();
        apply_splices(&mut replay, &new, &splices);
        prop_assert_eq!(&replay, &new);

        let cost: usize = splices.iter().map(|s| s.removed.len() + s.added_count).sum();
        prop_assert_eq!(cost, old.len() + new.len() - 2 * lcs_len(&old, &new));

        for pair in splices.windows(2) {
            prop_assert!(pair[0].index + pair[0].added_count < pair[1].index);
        }
    }

    #[test]
    fn array_observer_reports_replayable_splices(
        initial in prop::collection::vec(0..5i32, 0..8),
        ops in prop::collection::vec(op(), 1..10),
    ) {
        let engine = Engine::default();
        let value = Value::array(initial.iter().copied().map(Value::from).collect());
        let array = value.as_array().cloned().unwrap_or_default();
        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);

        let observer = ArrayObserver::new(&engine, &value).unwrap();
        observer
            .open(move |splices| {
                sink.borrow_mut().extend_from_slice(splices);
                Ok(())
            })
            .unwrap();
        let before = array.snapshot();

        for op in ops {
            let len = array.len();
            match op {
                Op::Push(v) => array.push(Value::from(v)),
                Op::Insert(i, v) => array.insert(i.min(len), Value::from(v)),
                Op::Remove(i) if i < len => {
                    array.remove(i);
                }
                Op::Set(i, v) if i < len => array.set(i, Value::from(v)),
                Op::Pop => {
                    array.pop();
                }
                Op::Remove(_) | Op::Set(..) => {}
            }
        }
        engine.run_checkpoint();

        let after = array.snapshot();
        let mut replay = before;
        apply_splices(&mut replay, &after, reports.borrow().as_slice());
        prop_assert_eq!(replay, after);
    }
}
