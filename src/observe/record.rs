// ============================================================================
// ripple-reactive - ReactiveRecord
// A keyed record with one dependency slot per property
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::core::dep::Dep;
use crate::observe::value::{same_value, Value};
use crate::observe::walk::{depend_nested, observe_value};

// =============================================================================
// RECORD INNER
// =============================================================================

/// One property: its current value and its dependency slot.
struct Entry {
    value: Value,
    dep: Rc<Dep>,
}

/// Shared record state. Entries are insertion-ordered so property iteration
/// (and therefore notification-triggering reads) is deterministic.
struct RecordInner {
    entries: RefCell<IndexMap<String, Entry>>,

    /// Container-level slot: notified when the key set changes, depended on
    /// by iteration-shaped reads and by reads of absent keys
    dep: Rc<Dep>,

    /// Observation marker; set at most once per container
    observed: Cell<bool>,
}

// =============================================================================
// REACTIVE RECORD
// =============================================================================

/// A keyed record container with per-property dependency tracking.
///
/// Reads of an existing property track that property's slot; writes
/// equality-gate, observe the stored value, and notify that slot. Adding or
/// removing a property is an explicit operation that notifies the
/// container-level slot, so computations iterating "all properties" re-run.
///
/// `ReactiveRecord` is a cheap shared handle: cloning aliases the same
/// underlying record.
///
/// # Example
///
/// ```
/// use ripple_reactive::{ReactiveRecord, Value};
///
/// let user = ReactiveRecord::new();
/// user.insert("name", Value::from("alice"));
/// user.set("name", Value::from("bob"));
///
/// assert_eq!(user.get("name"), Some(Value::from("bob")));
/// assert_eq!(user.len(), 1);
/// ```
#[derive(Clone)]
pub struct ReactiveRecord {
    inner: Rc<RecordInner>,
}

impl ReactiveRecord {
    /// Create a new empty record.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RecordInner {
                entries: RefCell::new(IndexMap::new()),
                dep: Dep::new(),
                observed: Cell::new(false),
            }),
        }
    }

    /// Create a record from initial entries. No notifications fire; nothing
    /// can be subscribed to a record that does not exist yet.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let record = Self::new();
        {
            let mut map = record.inner.entries.borrow_mut();
            for (key, value) in entries {
                map.insert(key, Entry {
                    value,
                    dep: Dep::new(),
                });
            }
        }
        record
    }

    /// Handle identity: do both handles alias the same record
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

    /// Mark this container observed. Returns false if it already was,
    /// which is what terminates recursion on cyclic graphs.
    pub(crate) fn mark_observed(&self) -> bool {
        !self.inner.observed.replace(true)
    }

    /// Whether this container has been observed
    pub fn is_observed(&self) -> bool {
        self.inner.observed.get()
    }

    /// Current property values without tracking (observe walk internals)
    pub(crate) fn values_untracked(&self) -> Vec<Value> {
        self.inner
            .entries
            .borrow()
            .values()
            .map(|entry| entry.value.clone())
            .collect()
    }

    /// Current keys without tracking (traverse internals)
    pub(crate) fn keys_untracked(&self) -> Vec<String> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Read a property.
    ///
    /// An existing key tracks that property's slot, plus the slots of any
    /// container stored there (so structural changes to the nested value
    /// also re-trigger). An absent key tracks the container-level slot, so
    /// a later `insert` of that key re-runs the computation.
    pub fn get(&self, key: &str) -> Option<Value> {
        let found = {
            let entries = self.inner.entries.borrow();
            entries
                .get(key)
                .map(|entry| (entry.dep.clone(), entry.value.clone()))
        };

        match found {
            Some((dep, value)) => {
                dep.depend();
                depend_nested(&value);
                Some(value)
            }
            None => {
                self.inner.dep.depend();
                None
            }
        }
    }

    /// Check whether a key exists. Tracks like `get`.
    pub fn contains_key(&self, key: &str) -> bool {
        let dep = {
            let entries = self.inner.entries.borrow();
            entries.get(key).map(|entry| entry.dep.clone())
        };

        match dep {
            Some(dep) => {
                dep.depend();
                true
            }
            None => {
                self.inner.dep.depend();
                false
            }
        }
    }

    /// Number of properties. Tracks the container-level slot.
    pub fn len(&self) -> usize {
        self.inner.dep.depend();
        self.inner.entries.borrow().len()
    }

    /// True if the record has no properties.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in insertion order. Tracks the container-level slot.
    pub fn keys(&self) -> Vec<String> {
        self.inner.dep.depend();
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// Snapshot of all entries in insertion order. Tracks the
    /// container-level slot.
    pub fn snapshot(&self) -> Vec<(String, Value)> {
        self.inner.dep.depend();
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Visit every entry. Tracks the container-level slot. Iterates a
    /// snapshot, so `f` may mutate the record.
    pub fn for_each(&self, mut f: impl FnMut(&str, &Value)) {
        for (key, value) in self.snapshot() {
            f(&key, &value);
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Write an existing property; unknown keys fall through to `insert`.
    ///
    /// Returns false (and notifies nothing) when the new value is the same
    /// as the old one — same scalar, same container handle, NaN over NaN.
    /// Otherwise stores the value, observes it if this record is observed,
    /// and notifies the property's slot.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let replaced = {
            let mut entries = self.inner.entries.borrow_mut();
            match entries.get_mut(key) {
                Some(entry) => {
                    if same_value(&entry.value, &value) {
                        return false;
                    }
                    entry.value = value.clone();
                    Some(entry.dep.clone())
                }
                None => None,
            }
        };

        match replaced {
            Some(dep) => {
                if self.inner.observed.get() {
                    observe_value(&value);
                }
                tracing::trace!(key, op = "set", "record mutation");
                dep.notify();
                true
            }
            None => self.insert(key, value),
        }
    }

    /// Define a new observable property (the explicit add operation).
    ///
    /// Creates the property's slot, observes the value if this record is
    /// observed, and notifies the container-level slot so iterating
    /// computations learn about the new key. An existing key behaves as
    /// `set`.
    pub fn insert(&self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();

        if self.inner.entries.borrow().contains_key(&key) {
            return self.set(&key, value);
        }

        self.inner.entries.borrow_mut().insert(key.clone(), Entry {
            value: value.clone(),
            dep: Dep::new(),
        });

        if self.inner.observed.get() {
            observe_value(&value);
        }
        tracing::trace!(key, op = "add", "record mutation");
        self.inner.dep.notify();
        true
    }

    /// Remove a property.
    ///
    /// Notifies both the removed property's slot (computations that read
    /// the key see it disappear) and the container-level slot (a container
    /// mutation). Returns the removed value, or None for an absent key —
    /// removing nothing notifies nothing.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.entries.borrow_mut().shift_remove(key);

        removed.map(|entry| {
            tracing::trace!(key, op = "delete", "record mutation");
            entry.dep.notify();
            self.inner.dep.notify();
            entry.value
        })
    }

    /// Live-subscriber count on a property's slot (diagnostics)
    pub fn property_sub_count(&self, key: &str) -> usize {
        self.inner
            .entries
            .borrow()
            .get(key)
            .map(|entry| entry.dep.sub_count())
            .unwrap_or(0)
    }
}

impl Default for ReactiveRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReactiveRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveRecord")
            .field("len", &self.inner.entries.borrow().len())
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

    #[test]
    fn insert_then_get() {
        let record = ReactiveRecord::new();
        assert!(record.insert("a", Value::from(1)));
        assert_eq!(record.get("a"), Some(Value::from(1)));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn set_same_value_reports_unchanged() {
        let record = ReactiveRecord::new();
        record.insert("count", Value::from(0));

        assert!(!record.set("count", Value::from(0)));
        assert!(record.set("count", Value::from(1)));
        assert!(!record.set("count", Value::from(1)));
    }

    #[test]
    fn set_nan_over_nan_reports_unchanged() {
        let record = ReactiveRecord::new();
        record.insert("x", Value::from(f64::NAN));
        assert!(!record.set("x", Value::from(f64::NAN)));
    }

    #[test]
    fn set_unknown_key_inserts() {
        let record = ReactiveRecord::new();
        assert!(record.set("fresh", Value::from(1)));
        assert_eq!(record.get("fresh"), Some(Value::from(1)));
    }

    #[test]
    fn remove_returns_value() {
        let record = ReactiveRecord::new();
        record.insert("a", Value::from(1));

        assert_eq!(record.remove("a"), Some(Value::from(1)));
        assert_eq!(record.remove("a"), None);
        assert!(record.is_empty());
    }

    #[test]
    fn keys_preserve_insertion_order() {
        let record = ReactiveRecord::new();
        record.insert("b", Value::Null);
        record.insert("a", Value::Null);
        record.insert("c", Value::Null);

        assert_eq!(record.keys(), vec!["b", "a", "c"]);
    }

    #[test]
    fn clone_aliases_the_same_record() {
        let record = ReactiveRecord::new();
        let alias = record.clone();

        alias.insert("k", Value::from(7));
        assert_eq!(record.get("k"), Some(Value::from(7)));
        assert!(record.ptr_eq(&alias));
    }

    #[test]
    fn mark_observed_is_once() {
        let record = ReactiveRecord::new();
        assert!(!record.is_observed());
        assert!(record.mark_observed());
        assert!(!record.mark_observed());
        assert!(record.is_observed());
    }

    #[test]
    fn for_each_tolerates_mutation() {
        let record = ReactiveRecord::new();
        record.insert("a", Value::from(1));
        record.insert("b", Value::from(2));

        // Mutating during iteration must not panic: iteration snapshots.
        record.for_each(|key, _| {
            record.set(key, Value::from(0));
        });

        assert_eq!(record.get("a"), Some(Value::from(0)));
        assert_eq!(record.get("b"), Some(Value::from(0)));
    }
}
