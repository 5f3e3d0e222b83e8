// ============================================================================
// ripple-reactive - Observation Walk
// make_reactive, nested-container depends, and deep traversal
// ============================================================================

use std::collections::HashSet;

use crate::core::context::is_observing;
use crate::observe::value::Value;

// =============================================================================
// OBSERVE
// =============================================================================

/// Make a value reactive and return it.
///
/// Idempotent: primitives pass through untouched, an already-observed
/// container is left alone, and an opaque payload is skipped with a warning
/// rather than corrupting anything. Container contents are observed
/// recursively; the mark-before-recurse order is what terminates the walk
/// on cyclic graphs.
///
/// # Example
///
/// ```
/// use ripple_reactive::{make_reactive, record};
///
/// let state = make_reactive(record! { "count" => 0 });
/// assert!(state.as_record().unwrap().is_observed());
/// ```
pub fn make_reactive(value: Value) -> Value {
    observe_value(&value);
    value
}

/// Observe a value in place. See [`make_reactive`].
///
/// Respects the context observing toggle: inside `with_observing(false, ..)`
/// this is a no-op, which is how callers keep externally-owned values out
/// of the reactive graph.
pub fn observe_value(value: &Value) {
    if !is_observing() {
        return;
    }

    match value {
        Value::Record(record) => {
            // Marking first is what stops cyclic graphs from recursing.
            if record.mark_observed() {
                for child in record.values_untracked() {
                    observe_value(&child);
                }
            }
        }
        Value::List(list) => {
            if list.mark_observed() {
                for child in list.values_untracked() {
                    observe_value(&child);
                }
            }
        }
        Value::Opaque(_) => {
            tracing::warn!("cannot observe opaque value; reads and writes will not be tracked");
        }
        _ => {}
    }
}

// =============================================================================
// NESTED DEPENDS
// =============================================================================

/// Depend on the container-level slots reachable from a stored value.
///
/// Called by record/list reads that return a container: the reading
/// computation must re-run not only when the property is reassigned but
/// also when the returned container itself gains or loses members. Lists
/// recurse into nested lists; records contribute their own slot only —
/// their properties register individually when actually read.
pub(crate) fn depend_nested(value: &Value) {
    let mut seen = HashSet::new();
    depend_nested_inner(value, &mut seen);
}

fn depend_nested_inner(value: &Value, seen: &mut HashSet<u64>) {
    match value {
        Value::Record(record) => {
            if seen.insert(record.dep_id()) {
                record.dep().depend();
            }
        }
        Value::List(list) => {
            if seen.insert(list.dep_id()) {
                list.dep().depend();
                for child in list.values_untracked() {
                    depend_nested_inner(&child, seen);
                }
            }
        }
        _ => {}
    }
}

// =============================================================================
// TRAVERSE
// =============================================================================

/// Read every slot reachable from a value, registering all of them as
/// dependencies of the active computation.
///
/// This is what deep watchers run after their function: any mutation at any
/// depth of the graph then re-triggers them. Reads go through the tracked
/// accessors, and the visited set (keyed by container slot id) keeps cyclic
/// graphs from looping.
pub fn traverse(value: &Value) {
    let mut seen = HashSet::new();
    traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<u64>) {
    match value {
        Value::Record(record) => {
            if !seen.insert(record.dep_id()) {
                return;
            }
            // Container-level slot too: adding or removing a key anywhere
            // in the graph must also re-trigger a deep watcher
            record.dep().depend();
            for key in record.keys_untracked() {
                if let Some(child) = record.get(&key) {
                    traverse_inner(&child, seen);
                }
            }
        }
        Value::List(list) => {
            if !seen.insert(list.dep_id()) {
                return;
            }
            let len = list.len();
            for index in 0..len {
                if let Some(child) = list.get(index) {
                    traverse_inner(&child, seen);
                }
            }
        }
        _ => {}
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::list::ReactiveList;
    use crate::observe::record::ReactiveRecord;

    #[test]
    fn primitives_pass_through() {
        assert_eq!(make_reactive(Value::from(5)), Value::from(5));
        assert_eq!(make_reactive(Value::Null), Value::Null);
    }

    #[test]
    fn observe_marks_nested_containers() {
        let child = ReactiveRecord::new();
        let items = ReactiveList::from_values(vec![Value::Record(child.clone())]);
        let root = ReactiveRecord::new();
        root.insert("items", Value::List(items.clone()));

        make_reactive(Value::Record(root.clone()));

        assert!(root.is_observed());
        assert!(items.is_observed());
        assert!(child.is_observed());
    }

    #[test]
    fn observe_is_idempotent() {
        let root = ReactiveRecord::new();
        make_reactive(Value::Record(root.clone()));
        // Second wrap is a no-op, not an error
        make_reactive(Value::Record(root.clone()));
        assert!(root.is_observed());
    }

    #[test]
    fn observe_terminates_on_cycles() {
        let a = ReactiveRecord::new();
        let b = ReactiveRecord::new();
        a.insert("b", Value::Record(b.clone()));
        b.insert("a", Value::Record(a.clone()));

        make_reactive(Value::Record(a.clone()));

        assert!(a.is_observed());
        assert!(b.is_observed());
    }

    #[test]
    fn observe_skips_opaque() {
        // Must not panic, must not mark anything
        make_reactive(Value::opaque(vec![0u8; 4]));
    }

    #[test]
    fn observing_toggle_suppresses_walk() {
        let root = ReactiveRecord::new();
        crate::core::context::with_observing(false, || {
            make_reactive(Value::Record(root.clone()));
        });
        assert!(!root.is_observed());
    }

    #[test]
    fn traverse_terminates_on_cycles() {
        let a = ReactiveRecord::new();
        let items = ReactiveList::new();
        items.push(Value::Record(a.clone()));
        a.insert("self_items", Value::List(items.clone()));

        traverse(&Value::Record(a));
    }
}
