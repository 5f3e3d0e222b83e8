// The sequence interception layer: every structural mutation notifies the
// container slot exactly once, and inserted elements join the reactive
// graph.

use ripple_reactive::{
    list, make_reactive, record, run_tracked, ReactiveList, Value, WatcherHandle,
};
use std::cell::Cell;
use std::rc::Rc;

fn observed_list(value: Value) -> ReactiveList {
    make_reactive(value).as_list().unwrap().clone()
}

/// A watcher that reads the list once and counts invalidations without
/// re-running, so its subscription never moves and every notification is
/// visible.
fn notification_counter(items: &ReactiveList) -> (WatcherHandle, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0u32));
    let watcher = run_tracked(
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
    (watcher, count)
}

#[test]
fn each_structural_mutation_notifies_exactly_once() {
    let items = observed_list(list![1, 2, 3]);
    let (_watcher, count) = notification_counter(&items);

    items.push(Value::from(4));
    assert_eq!(count.get(), 1);

    items.prepend(Value::from(0));
    assert_eq!(count.get(), 2);

    items.pop();
    assert_eq!(count.get(), 3);

    items.pop_front();
    assert_eq!(count.get(), 4);

    items.splice(1, 1, vec![Value::from(9), Value::from(10)]);
    assert_eq!(count.get(), 5);

    items.sort_by_key(|v| v.as_int().unwrap());
    assert_eq!(count.get(), 6);

    items.reverse();
    assert_eq!(count.get(), 7);
}

#[test]
fn delegating_conveniences_notify_once_too() {
    let items = observed_list(list![1, 2, 3]);
    let (_watcher, count) = notification_counter(&items);

    items.insert(1, Value::from(9));
    assert_eq!(count.get(), 1);

    items.remove(0);
    assert_eq!(count.get(), 2);

    items.set(0, Value::from(7));
    assert_eq!(count.get(), 3);

    items.extend(vec![Value::from(1), Value::from(2)]);
    assert_eq!(count.get(), 4);

    items.clear();
    assert_eq!(count.get(), 5);
}

#[test]
fn length_reader_reruns_on_append() {
    let items = observed_list(list![1, 2, 3]);

    let lengths = Rc::new(Cell::new(0usize));
    let _watcher = run_tracked(
        {
            let items = items.clone();
            let lengths = lengths.clone();
            move || lengths.set(items.len())
        },
        |watcher| {
            let _ = watcher.rerun();
        },
    );
    assert_eq!(lengths.get(), 3);

    items.push(Value::from(4));
    assert_eq!(lengths.get(), 4);

    items.pop();
    assert_eq!(lengths.get(), 3);
}

#[test]
fn pushed_elements_are_observed() {
    let items = observed_list(list![]);

    let element = record! { "done" => false };
    let element_record = element.as_record().unwrap().clone();
    assert!(!element_record.is_observed());

    items.push(element);
    assert!(element_record.is_observed());
}

#[test]
fn spliced_in_elements_are_observed() {
    let items = observed_list(list![1, 2]);

    let element = record! { "v" => 0 };
    let element_record = element.as_record().unwrap().clone();

    items.splice(1, 0, vec![element]);
    assert!(element_record.is_observed());
}

#[test]
fn unobserved_list_does_not_observe_inserted() {
    // The interception contract applies once the list is observed;
    // before that, inserted values stay plain
    let items = ReactiveList::new();
    let element = record! { "v" => 0 };
    let element_record = element.as_record().unwrap().clone();

    items.push(element);
    assert!(!element_record.is_observed());
}

#[test]
fn mutating_appended_element_triggers_reader() {
    let items = observed_list(list![]);

    let runs = Rc::new(Cell::new(0));
    let _watcher = run_tracked(
        {
            let items = items.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                if let Some(first) = items.first() {
                    if let Some(record) = first.as_record() {
                        record.get("done");
                    }
                }
            }
        },
        |watcher| {
            let _ = watcher.rerun();
        },
    );
    assert_eq!(runs.get(), 1);

    let element = record! { "done" => false };
    let element_record = element.as_record().unwrap().clone();
    items.push(element);
    assert_eq!(runs.get(), 2);

    element_record.set("done", Value::from(true));
    assert_eq!(runs.get(), 3);
}

#[test]
fn aliased_handle_mutations_are_caught() {
    // A mutation through any alias of the sequence reaches the same slot
    let items = observed_list(list![1]);
    let alias = items.clone();

    let (_watcher, count) = notification_counter(&items);

    alias.push(Value::from(2));
    assert_eq!(count.get(), 1);
    assert_eq!(items.len(), 2);
}

#[test]
fn splice_return_value_passes_through() {
    let items = observed_list(list![1, 2, 3, 4]);

    let removed = items.splice(1, 2, vec![Value::from(9)]);
    assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
    assert_eq!(
        items.snapshot(),
        vec![Value::from(1), Value::from(9), Value::from(4)]
    );
}

#[test]
fn nested_list_reads_track_inner_structure() {
    let inner = list![1];
    let inner_list = inner.as_list().unwrap().clone();
    let items = observed_list(list![inner]);

    let runs = Rc::new(Cell::new(0));
    let _watcher = run_tracked(
        {
            let items = items.clone();
            let runs = runs.clone();
            move || {
                runs.set(runs.get() + 1);
                items.get(0);
            }
        },
        |watcher| {
            let _ = watcher.rerun();
        },
    );
    assert_eq!(runs.get(), 1);

    // Structural change to the nested list re-triggers the outer reader
    inner_list.push(Value::from(2));
    assert_eq!(runs.get(), 2);
}
