// ============================================================================
// ripple-reactive - ReactiveList
// A sequence whose structural mutations all route through one dep slot
// ============================================================================
//
// The interception layer: every structural mutation performs the plain
// operation, observes whatever it inserted, notifies the container-level
// slot exactly once, and hands back the plain operation's return value.
// Because the wrapper is the only mutation surface, call sites reached
// through aliased handles are caught without any cooperation.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use crate::core::dep::Dep;
use crate::observe::value::Value;
use crate::observe::walk::{depend_nested, observe_value};

// =============================================================================
// LIST INNER
// =============================================================================

/// Shared sequence state: the elements and the single container-level slot.
struct ListInner {
    items: RefCell<Vec<Value>>,

    /// Notified once per structural mutation; depended on by every read
    dep: Rc<Dep>,

    /// Observation marker; set at most once per container
    observed: Cell<bool>,
}

// =============================================================================
// REACTIVE LIST
// =============================================================================

/// A sequence container with whole-container dependency tracking.
///
/// There is no per-index granularity: reads depend on the container-level
/// slot, and each of the structural mutations (`push`, `prepend`, `pop`,
/// `pop_front`, `splice`, `sort_by`, `reverse`) notifies it exactly once.
/// Newly inserted elements are recursively observed when the list itself
/// has been observed, so mutating a property of a freshly appended record
/// re-triggers dependents too.
///
/// `ReactiveList` is a cheap shared handle: cloning aliases the same
/// underlying sequence.
///
/// # Example
///
/// ```
/// use ripple_reactive::{ReactiveList, Value};
///
/// let items = ReactiveList::from_values(vec![Value::from(1), Value::from(2)]);
/// items.push(Value::from(3));
///
/// assert_eq!(items.len(), 3);
/// assert_eq!(items.pop(), Some(Value::from(3)));
/// ```
#[derive(Clone)]
pub struct ReactiveList {
    inner: Rc<ListInner>,
}

impl ReactiveList {
    /// Create a new empty list.
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    /// Create a list from initial elements. No notifications fire.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(values),
                dep: Dep::new(),
                observed: Cell::new(false),
            }),
        }
    }

    /// Handle identity: do both handles alias the same sequence
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Id of the container-level slot (diagnostics / traversal visited-set)
    pub fn dep_id(&self) -> u64 {
        self.inner.dep.id()
    }

    /// The container-level slot
    pub(crate) fn dep(&self) -> Rc<Dep> {
        self.inner.dep.clone()
    }

    /// Mark this container observed. Returns false if it already was.
    pub(crate) fn mark_observed(&self) -> bool {
        !self.inner.observed.replace(true)
    }

    /// Whether this container has been observed
    pub fn is_observed(&self) -> bool {
        self.inner.observed.get()
    }

    /// Current elements without tracking (observe walk internals)
    pub(crate) fn values_untracked(&self) -> Vec<Value> {
        self.inner.items.borrow().clone()
    }

    // =========================================================================
    // READS (all depend on the container-level slot)
    // =========================================================================

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.dep.depend();
        self.inner.items.borrow().len()
    }

    /// True if the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, if in bounds. Also depends on the slots of a
    /// container element, mirroring record reads.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.dep.depend();
        let value = self.inner.items.borrow().get(index).cloned();
        if let Some(ref value) = value {
            depend_nested(value);
        }
        value
    }

    /// First element.
    pub fn first(&self) -> Option<Value> {
        self.get(0)
    }

    /// Last element.
    pub fn last(&self) -> Option<Value> {
        self.inner.dep.depend();
        let value = self.inner.items.borrow().last().cloned();
        if let Some(ref value) = value {
            depend_nested(value);
        }
        value
    }

    /// Snapshot of all elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.inner.dep.depend();
        self.inner.items.borrow().clone()
    }

    /// Visit every element. Iterates a snapshot, so `f` may mutate the list.
    pub fn for_each(&self, mut f: impl FnMut(usize, &Value)) {
        for (index, value) in self.snapshot().iter().enumerate() {
            f(index, value);
        }
    }

    // =========================================================================
    // MUTATIONS (each notifies the container-level slot exactly once)
    // =========================================================================

    /// Observe freshly inserted elements, if this list itself is observed.
    fn observe_inserted(&self, inserted: &[Value]) {
        if self.inner.observed.get() {
            for value in inserted {
                observe_value(value);
            }
        }
    }

    fn notify(&self, op: &'static str) {
        tracing::trace!(op, "sequence mutation");
        self.inner.dep.notify();
    }

    /// Append one element.
    pub fn push(&self, value: Value) {
        self.inner.items.borrow_mut().push(value.clone());
        self.observe_inserted(std::slice::from_ref(&value));
        self.notify("push");
    }

    /// Append several elements in one mutation (one notification).
    pub fn extend(&self, values: impl IntoIterator<Item = Value>) {
        let values: Vec<Value> = values.into_iter().collect();
        self.inner.items.borrow_mut().extend(values.iter().cloned());
        self.observe_inserted(&values);
        self.notify("extend");
    }

    /// Insert one element at the front.
    pub fn prepend(&self, value: Value) {
        self.inner.items.borrow_mut().insert(0, value.clone());
        self.observe_inserted(std::slice::from_ref(&value));
        self.notify("prepend");
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.inner.items.borrow_mut().pop();
        self.notify("pop");
        removed
    }

    /// Remove and return the first element.
    pub fn pop_front(&self) -> Option<Value> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.notify("pop_front");
        removed
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `items` in their place. Out-of-range `start`/`delete_count` are
    /// clamped. Returns the removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let removed: Vec<Value> = {
            let mut data = self.inner.items.borrow_mut();
            let len = data.len();
            let start = start.min(len);
            let end = start.saturating_add(delete_count).min(len);
            data.splice(start..end, items.iter().cloned()).collect()
        };
        self.observe_inserted(&items);
        self.notify("splice");
        removed
    }

    /// Insert one element at `index` (clamped to the end).
    pub fn insert(&self, index: usize, value: Value) {
        self.splice(index, 0, vec![value]);
    }

    /// Remove and return the element at `index`, if in bounds.
    pub fn remove(&self, index: usize) -> Option<Value> {
        self.splice(index, 1, Vec::new()).pop()
    }

    /// Replace the element at `index`, returning the old one. An index at
    /// or past the end appends instead. Routed through `splice` so the
    /// replacement is caught like any other structural mutation.
    pub fn set(&self, index: usize, value: Value) -> Option<Value> {
        self.splice(index, 1, vec![value]).pop()
    }

    /// Remove every element.
    pub fn clear(&self) {
        let len = self.inner.items.borrow().len();
        self.splice(0, len, Vec::new());
    }

    /// Sort in place by a comparator.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.inner.items.borrow_mut().sort_by(compare);
        self.notify("sort");
    }

    /// Sort in place by a key function.
    pub fn sort_by_key<K: Ord>(&self, f: impl FnMut(&Value) -> K) {
        self.inner.items.borrow_mut().sort_by_key(f);
        self.notify("sort");
    }

    /// Reverse in place.
    pub fn reverse(&self) {
        self.inner.items.borrow_mut().reverse();
        self.notify("reverse");
    }
}

impl Default for ReactiveList {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReactiveList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveList")
            .field("len", &self.inner.items.borrow().len())
            .field("observed", &self.inner.observed.get())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&v| Value::from(v)).collect()
    }

    #[test]
    fn push_pop_roundtrip() {
        let list = ReactiveList::new();
        list.push(Value::from(1));
        list.push(Value::from(2));

        assert_eq!(list.len(), 2);
        assert_eq!(list.pop(), Some(Value::from(2)));
        assert_eq!(list.pop(), Some(Value::from(1)));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn prepend_and_pop_front() {
        let list = ReactiveList::from_values(ints(&[2, 3]));
        list.prepend(Value::from(1));

        assert_eq!(list.snapshot(), ints(&[1, 2, 3]));
        assert_eq!(list.pop_front(), Some(Value::from(1)));
        assert_eq!(list.snapshot(), ints(&[2, 3]));
    }

    #[test]
    fn splice_removes_and_inserts() {
        let list = ReactiveList::from_values(ints(&[1, 2, 3, 4]));

        let removed = list.splice(1, 2, ints(&[9]));
        assert_eq!(removed, ints(&[2, 3]));
        assert_eq!(list.snapshot(), ints(&[1, 9, 4]));
    }

    #[test]
    fn splice_clamps_out_of_range() {
        let list = ReactiveList::from_values(ints(&[1, 2]));

        let removed = list.splice(10, 5, ints(&[3]));
        assert!(removed.is_empty());
        assert_eq!(list.snapshot(), ints(&[1, 2, 3]));
    }

    #[test]
    fn set_replaces_in_place() {
        let list = ReactiveList::from_values(ints(&[1, 2, 3]));

        let old = list.set(1, Value::from(9));
        assert_eq!(old, Some(Value::from(2)));
        assert_eq!(list.snapshot(), ints(&[1, 9, 3]));
    }

    #[test]
    fn sort_and_reverse() {
        let list = ReactiveList::from_values(ints(&[3, 1, 2]));

        list.sort_by_key(|v| v.as_int().unwrap());
        assert_eq!(list.snapshot(), ints(&[1, 2, 3]));

        list.reverse();
        assert_eq!(list.snapshot(), ints(&[3, 2, 1]));
    }

    #[test]
    fn clear_empties() {
        let list = ReactiveList::from_values(ints(&[1, 2]));
        list.clear();
        assert!(list.is_empty());
    }

    #[test]
    fn clone_aliases_the_same_list() {
        let list = ReactiveList::new();
        let alias = list.clone();

        alias.push(Value::from(1));
        assert_eq!(list.len(), 1);
        assert!(list.ptr_eq(&alias));
    }

    #[test]
    fn for_each_tolerates_mutation() {
        let list = ReactiveList::from_values(ints(&[1, 2, 3]));

        // Iteration snapshots, so mutating mid-loop must not panic.
        list.for_each(|_, _| {
            list.push(Value::from(0));
        });

        assert_eq!(list.len(), 6);
    }
}
