// Property test: for any sequence of structural mutations, the container
// slot notifies exactly once per operation and the sequence behaves like a
// plain Vec.

use proptest::prelude::*;
use ripple_reactive::{make_reactive, run_tracked, ReactiveList, Value};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Op {
    Push(i64),
    Prepend(i64),
    Pop,
    PopFront,
    Splice {
        start: usize,
        delete: usize,
        items: Vec<i64>,
    },
    Sort,
    Reverse,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::Push),
        any::<i64>().prop_map(Op::Prepend),
        Just(Op::Pop),
        Just(Op::PopFront),
        (0usize..8, 0usize..4, proptest::collection::vec(any::<i64>(), 0..3)).prop_map(
            |(start, delete, items)| Op::Splice {
                start,
                delete,
                items
            }
        ),
        Just(Op::Sort),
        Just(Op::Reverse),
    ]
}

fn as_ints(values: &[Value]) -> Vec<i64> {
    values.iter().map(|v| v.as_int().unwrap()).collect()
}

/// Apply one op to both the reactive list and a plain-Vec model, checking
/// that return values agree.
fn apply(list: &ReactiveList, model: &mut Vec<i64>, op: &Op) {
    match op {
        Op::Push(v) => {
            list.push(Value::from(*v));
            model.push(*v);
        }
        Op::Prepend(v) => {
            list.prepend(Value::from(*v));
            model.insert(0, *v);
        }
        Op::Pop => {
            let expected = model.pop();
            assert_eq!(list.pop().map(|v| v.as_int().unwrap()), expected);
        }
        Op::PopFront => {
            let expected = if model.is_empty() {
                None
            } else {
                Some(model.remove(0))
            };
            assert_eq!(list.pop_front().map(|v| v.as_int().unwrap()), expected);
        }
        Op::Splice {
            start,
            delete,
            items,
        } => {
            let inserted: Vec<Value> = items.iter().map(|&v| Value::from(v)).collect();
            let removed = list.splice(*start, *delete, inserted);

            let len = model.len();
            let s = (*start).min(len);
            let e = s.saturating_add(*delete).min(len);
            let expected: Vec<i64> = model.splice(s..e, items.iter().cloned()).collect();

            assert_eq!(as_ints(&removed), expected);
        }
        Op::Sort => {
            list.sort_by_key(|v| v.as_int().unwrap());
            model.sort();
        }
        Op::Reverse => {
            list.reverse();
            model.reverse();
        }
    }
}

proptest! {
    #[test]
    fn mutations_notify_once_and_match_model(
        initial in proptest::collection::vec(any::<i64>(), 0..6),
        ops in proptest::collection::vec(op_strategy(), 1..32),
    ) {
        let values: Vec<Value> = initial.iter().map(|&v| Value::from(v)).collect();
        let items = make_reactive(Value::List(ReactiveList::from_values(values)))
            .as_list()
            .unwrap()
            .clone();

        // Count invalidations without re-running, so the subscription
        // stays put and every notification is observable
        let count = Rc::new(Cell::new(0usize));
        let _watcher = run_tracked(
            {
                let items = items.clone();
                move || {
                    items.len();
                }
            },
            {
                let count = count.clone();
                move |_| count.set(count.get() + 1)
            },
        );

        let mut model = initial.clone();
        for (i, op) in ops.iter().enumerate() {
            apply(&items, &mut model, op);
            prop_assert_eq!(count.get(), i + 1, "op {:?} must notify exactly once", op);
        }

        prop_assert_eq!(as_ints(&items.snapshot()), model);
    }
}
