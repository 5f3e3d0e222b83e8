// ============================================================================
// ripple-reactive - Watcher
// The computation node: run a function, record its reads, re-trigger on change
// ============================================================================
//
// A watcher wraps a function. Running it pushes the watcher onto the
// tracking stack, executes the function (every slot read registers as a
// dependency), pops, then unsubscribes from whatever last run's dependency
// set contained that this run's does not. When any recorded slot later
// notifies, the watcher's scheduling callback fires — it never re-runs
// directly inside the notification, so deeply chained dependencies cannot
// grow the call stack without bound.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use thiserror::Error;

use crate::core::constants::*;
use crate::core::context::{with_context, TargetGuard};
use crate::core::dep::{Dep, Subscriber};
use crate::observe::value::Value;
use crate::observe::walk::{observe_value, traverse};
use crate::reactivity::scheduler;

// =============================================================================
// TYPE ALIASES
// =============================================================================

/// The tracked work function
pub type WatchFn = Box<dyn FnMut()>;

/// Scheduling callback, invoked when a recorded dependency changes. Receives
/// a handle so it can rerun now, defer, or dispose.
pub type InvalidateFn = Box<dyn FnMut(WatcherHandle)>;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors surfaced by the public watcher handle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WatcherError {
    /// The watcher was disposed; running it again would resurrect
    /// subscriptions, so it fails instead.
    #[error("watcher has been disposed and can no longer run")]
    Stopped,
}

// =============================================================================
// WATCHER INNER
// =============================================================================

/// The inner watcher state.
///
/// Dependency bookkeeping is a four-field scheme: `deps`/`dep_ids` hold the
/// set recorded by the previous run, `new_deps`/`new_dep_ids` collect the
/// current run. After a run the sets swap and anything in old-but-not-new
/// is unsubscribed — a dependency read only under a since-false condition
/// must not keep re-triggering this watcher.
pub struct WatcherInner {
    /// Unique id, allocated from the context counter
    id: u64,

    /// State flag bitmask
    flags: Cell<u32>,

    /// The tracked function; dropped on stop
    func: RefCell<Option<WatchFn>>,

    /// Scheduling callback; taken while executing, dropped on stop
    on_invalidate: RefCell<Option<InvalidateFn>>,

    /// Value graph to deep-traverse after each run (deep watchers only)
    deep_target: RefCell<Option<Value>>,

    /// Dependencies recorded by the previous run
    deps: RefCell<Vec<Rc<Dep>>>,

    /// Ids of `deps`, for O(1) dedup
    dep_ids: RefCell<HashSet<u64>>,

    /// Dependencies collected by the run in progress
    new_deps: RefCell<Vec<Rc<Dep>>>,

    /// Ids of `new_deps`
    new_dep_ids: RefCell<HashSet<u64>>,

    /// Weak self-reference for trait-object conversion (set after Rc::new)
    self_weak: RefCell<Weak<WatcherInner>>,
}

impl WatcherInner {
    fn new(flags: u32, func: WatchFn, on_invalidate: InvalidateFn) -> Rc<Self> {
        let watcher = Rc::new(Self {
            id: with_context(|ctx| ctx.next_watcher_id()),
            flags: Cell::new(flags),
            func: RefCell::new(Some(func)),
            on_invalidate: RefCell::new(Some(on_invalidate)),
            deep_target: RefCell::new(None),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
            self_weak: RefCell::new(Weak::new()),
        });

        *watcher.self_weak.borrow_mut() = Rc::downgrade(&watcher);

        watcher
    }

    /// This watcher as a weak subscriber trait object
    pub fn as_weak_subscriber(&self) -> Weak<dyn Subscriber> {
        match self.self_weak.borrow().upgrade() {
            Some(rc) => Rc::downgrade(&(rc as Rc<dyn Subscriber>)),
            None => Weak::<WatcherInner>::new() as Weak<dyn Subscriber>,
        }
    }

    /// Unsubscribe from stale dependencies and swap the dep sets.
    fn cleanup_deps(&self) {
        {
            let deps = self.deps.borrow();
            let new_ids = self.new_dep_ids.borrow();
            for dep in deps.iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(self.id);
                }
            }
        }

        std::mem::swap(
            &mut *self.deps.borrow_mut(),
            &mut *self.new_deps.borrow_mut(),
        );
        self.new_deps.borrow_mut().clear();

        std::mem::swap(
            &mut *self.dep_ids.borrow_mut(),
            &mut *self.new_dep_ids.borrow_mut(),
        );
        self.new_dep_ids.borrow_mut().clear();
    }

    /// Stop: unsubscribe everywhere, drop the closures, terminal.
    fn stop(&self) {
        if self.flags.get() & STOPPED != 0 {
            return;
        }
        self.flags.set(self.flags.get() | STOPPED);

        let deps = self.deps.replace(Vec::new());
        for dep in deps {
            dep.remove_sub(self.id);
        }
        self.dep_ids.borrow_mut().clear();

        // new_deps is only non-empty mid-run; those subscriptions were made
        // against deps that must forget us too
        let new_deps = self.new_deps.replace(Vec::new());
        for dep in new_deps {
            dep.remove_sub(self.id);
        }
        self.new_dep_ids.borrow_mut().clear();

        // The work function is borrowed while running; leave it to drop
        // with the watcher in that case
        if self.flags.get() & RUNNING == 0 {
            *self.func.borrow_mut() = None;
            *self.deep_target.borrow_mut() = None;
        }
        *self.on_invalidate.borrow_mut() = None;
    }
}

// =============================================================================
// SUBSCRIBER IMPLEMENTATION
// =============================================================================

impl Subscriber for WatcherInner {
    fn id(&self) -> u64 {
        self.id
    }

    fn is_active(&self) -> bool {
        self.flags.get() & STOPPED == 0
    }

    fn add_dep(&self, dep: Rc<Dep>) {
        let dep_id = dep.id();

        // First time this pass?
        if self.new_dep_ids.borrow().contains(&dep_id) {
            return;
        }
        self.new_dep_ids.borrow_mut().insert(dep_id);
        self.new_deps.borrow_mut().push(dep.clone());

        // Subscribe only if the previous run wasn't already subscribed —
        // idempotent per (slot, watcher) pair across runs
        if !self.dep_ids.borrow().contains(&dep_id) {
            dep.add_sub(self.as_weak_subscriber());
        }
    }

    fn schedule(&self) {
        if self.flags.get() & STOPPED != 0 {
            return;
        }

        let mut passes: u32 = 0;
        loop {
            let callback = self.on_invalidate.borrow_mut().take();
            let Some(mut callback) = callback else {
                // A pass is already executing further up the stack;
                // coalesce into one more pass there
                self.flags.set(self.flags.get() | SCHEDULE_PENDING);
                return;
            };

            let handle = match self.self_weak.borrow().upgrade() {
                Some(inner) => WatcherHandle { inner },
                None => return,
            };

            callback(handle);

            if self.flags.get() & STOPPED == 0 {
                *self.on_invalidate.borrow_mut() = Some(callback);
            }

            if self.flags.get() & SCHEDULE_PENDING == 0 {
                return;
            }
            self.flags.set(self.flags.get() & !SCHEDULE_PENDING);

            passes += 1;
            if passes > MAX_SCHEDULE_PASSES {
                tracing::error!(
                    watcher = self.id,
                    "notification loop detected: scheduling callback keeps re-triggering; \
                     dropping the pending notification"
                );
                return;
            }
        }
    }

    fn update(&self) {
        if let Some(inner) = self.self_weak.borrow().upgrade() {
            let _ = run_watcher(&inner);
        }
    }
}

// =============================================================================
// RUN
// =============================================================================

/// Run a watcher, tracking its reads.
///
/// The tracking-stack push and the running flag are both RAII-guarded: a
/// panicking work function unwinds with the stack already popped, so later
/// reads cannot be mis-attributed. Dep-set cleanup only happens on normal
/// return.
///
/// A run requested while the watcher is already running (its own write
/// invalidated it) is coalesced into another pass of the outer call,
/// bounded by [`MAX_UPDATE_COUNT`].
pub(crate) fn run_watcher(inner: &Rc<WatcherInner>) -> Result<(), WatcherError> {
    if inner.flags.get() & STOPPED != 0 {
        return Err(WatcherError::Stopped);
    }
    if inner.flags.get() & RUNNING != 0 {
        inner.flags.set(inner.flags.get() | RUN_PENDING);
        return Ok(());
    }

    let mut passes: u32 = 0;
    loop {
        inner.flags.set(inner.flags.get() | RUNNING);

        {
            struct RunningGuard<'a>(&'a WatcherInner);

            impl Drop for RunningGuard<'_> {
                fn drop(&mut self) {
                    self.0.flags.set(self.0.flags.get() & !RUNNING);
                }
            }

            let _running = RunningGuard(inner);
            let _target = TargetGuard::push(Some(inner.as_weak_subscriber()));

            if let Some(func) = inner.func.borrow_mut().as_mut() {
                func();
            }

            if inner.flags.get() & DEEP != 0 {
                let target = inner.deep_target.borrow().clone();
                if let Some(value) = target {
                    traverse(&value);
                }
            }
        }

        inner.cleanup_deps();
        inner.flags.set(inner.flags.get() | RAN);

        if inner.flags.get() & (RUN_PENDING | STOPPED) != RUN_PENDING {
            break;
        }
        inner.flags.set(inner.flags.get() & !RUN_PENDING);

        passes += 1;
        if passes > MAX_UPDATE_COUNT {
            tracing::error!(
                watcher = inner.id,
                "update loop detected: watcher invalidated itself while running; \
                 dropping the pending re-run"
            );
            break;
        }
    }

    Ok(())
}

// =============================================================================
// WATCHER HANDLE
// =============================================================================

/// Public handle to a computation node.
///
/// Cloning the handle aliases the same watcher. The watcher lives as long
/// as any handle does; dropping the last handle drops the watcher, whose
/// dead weak subscriptions are swept by the slots on their next notify.
#[derive(Clone)]
pub struct WatcherHandle {
    inner: Rc<WatcherInner>,
}

impl WatcherHandle {
    /// The watcher's unique id
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Re-execute now, rebuilding the dependency set.
    pub fn rerun(&self) -> Result<(), WatcherError> {
        run_watcher(&self.inner)
    }

    /// Stop permanently: every subscription removed, callbacks dropped,
    /// later `rerun` calls fail.
    pub fn dispose(&self) {
        self.inner.stop();
    }

    /// False once disposed
    pub fn is_active(&self) -> bool {
        self.inner.flags.get() & STOPPED == 0
    }

    /// True once the watcher has completed at least one run
    pub fn has_run(&self) -> bool {
        self.inner.flags.get() & RAN != 0
    }

    /// Number of dependencies recorded by the last completed run
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// This watcher as a weak subscriber trait object (scheduler plumbing)
    pub fn as_weak_subscriber(&self) -> Weak<dyn Subscriber> {
        self.inner.as_weak_subscriber()
    }
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .field("deps", &self.inner.deps.borrow().len())
            .finish()
    }
}

// =============================================================================
// PUBLIC API
// =============================================================================

/// Create a computation node around `f` and run it immediately.
///
/// Every observable slot read during the run is recorded; when any of them
/// later changes, `on_invalidate` is called with a handle. The callback
/// decides when the re-run happens — immediately via `rerun()`, deferred,
/// or never.
///
/// # Example
///
/// ```
/// use ripple_reactive::{make_reactive, record, run_tracked, Value};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let state = make_reactive(record! { "count" => 0 });
/// let counter = state.as_record().unwrap().clone();
///
/// let seen = Rc::new(Cell::new(0i64));
/// let watcher = run_tracked(
///     {
///         let counter = counter.clone();
///         let seen = seen.clone();
///         move || seen.set(counter.get("count").and_then(|v| v.as_int()).unwrap())
///     },
///     |watcher| {
///         // Re-run immediately on invalidation
///         let _ = watcher.rerun();
///     },
/// );
///
/// assert_eq!(seen.get(), 0);
/// counter.set("count", Value::from(1));
/// assert_eq!(seen.get(), 1);
///
/// watcher.dispose();
/// counter.set("count", Value::from(2));
/// assert_eq!(seen.get(), 1);
/// ```
pub fn run_tracked(
    f: impl FnMut() + 'static,
    on_invalidate: impl FnMut(WatcherHandle) + 'static,
) -> WatcherHandle {
    let inner = WatcherInner::new(0, Box::new(f), Box::new(on_invalidate));
    let handle = WatcherHandle { inner };
    // A freshly created watcher cannot be stopped
    let _ = run_watcher(&handle.inner);
    handle
}

/// Create a watcher whose invalidations go through the deferred scheduler.
///
/// This is the common consumer shape: writes queue the watcher, the queue
/// drains synchronously at the first opportunity (or at batch end), and
/// multiple invalidations per flush coalesce into one re-run.
pub fn autorun(f: impl FnMut() + 'static) -> WatcherHandle {
    run_tracked(f, |watcher| scheduler::enqueue(&watcher))
}

/// Create a deep watcher over a value graph.
///
/// The value is made reactive, and after each run every slot reachable from
/// it is read into the dependency set — a mutation at any depth invalidates
/// the watcher, not just the slots `f` happens to read.
pub fn watch_deep(
    value: Value,
    f: impl FnMut() + 'static,
    on_invalidate: impl FnMut(WatcherHandle) + 'static,
) -> WatcherHandle {
    observe_value(&value);

    let inner = WatcherInner::new(DEEP, Box::new(f), Box::new(on_invalidate));
    *inner.deep_target.borrow_mut() = Some(value);

    let handle = WatcherHandle { inner };
    let _ = run_watcher(&handle.inner);
    handle
}

// =============================================================================
// TESTS
// =============================================================================
