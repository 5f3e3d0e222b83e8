// ============================================================================
// ripple-reactive - Dependency Registry
// One Dep per observable slot: a record property or a whole sequence
// ============================================================================
//
// A Dep does not know what kind of slot it guards; it only keeps the set of
// subscribed computations and pings them on change. Subscribers are held
// weakly so a dropped watcher never keeps a slot (or itself) alive.
// ============================================================================

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::context::with_context;

// =============================================================================
// SUBSCRIBER TRAIT
// =============================================================================

/// Type-erased interface a computation presents to the slots it reads.
///
/// Implemented by `WatcherInner`. Deps store `Weak<dyn Subscriber>`; the
/// watcher stores `Rc<Dep>`, so the strong edges all point one way and the
/// graph cannot leak through reference cycles.
pub trait Subscriber: Any {
    /// Unique id, allocated from the context counter at creation
    fn id(&self) -> u64;

    /// False once the computation has been stopped
    fn is_active(&self) -> bool;

    /// Offered a dep that was read while this subscriber was the tracking
    /// target. The subscriber performs the per-pass dedup and calls back
    /// `Dep::add_sub` for genuinely new dependencies.
    fn add_dep(&self, dep: Rc<Dep>);

    /// Invoke the scheduling callback: a dependency changed
    fn schedule(&self);

    /// Re-run the computation now (used by the scheduler flush loop)
    fn update(&self);
}

// =============================================================================
// DEP
// =============================================================================

/// A dependency registry for one observable slot.
pub struct Dep {
    /// Unique identity; watchers dedup subscriptions by this
    id: u64,

    /// Subscribed computations, in subscription order
    subs: RefCell<Vec<Weak<dyn Subscriber>>>,

    /// Set while a notify pass is running; diagnostics for re-entrant
    /// mutation of the slot that is currently notifying
    notifying: Cell<bool>,

    /// Weak self-reference so `depend` can hand out an owned handle
    /// (set right after Rc creation)
    self_weak: RefCell<Weak<Dep>>,
}

impl Dep {
    /// Create a new dep with a fresh id
    pub fn new() -> Rc<Self> {
        let dep = Rc::new(Self {
            id: with_context(|ctx| ctx.next_dep_id()),
            subs: RefCell::new(Vec::new()),
            notifying: Cell::new(false),
            self_weak: RefCell::new(Weak::new()),
        });

        *dep.self_weak.borrow_mut() = Rc::downgrade(&dep);

        dep
    }

    /// This dep's unique id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Number of live subscribers
    pub fn sub_count(&self) -> usize {
        self.subs
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    // =========================================================================
    // DEPEND - Register the active computation as a subscriber
    // =========================================================================

    /// Record that the current tracking target (if any) read this slot.
    ///
    /// Hands the dep to the target, which dedups within the tracking pass
    /// and subscribes back only when the dependency is new. A read outside
    /// any tracking pass (empty stack, or the untracked sentinel on top)
    /// records nothing; that is the common case, not an error.
    pub fn depend(&self) {
        if let Some(target) = with_context(|ctx| ctx.current_target()) {
            if let Some(dep) = self.self_weak.borrow().upgrade() {
                target.add_dep(dep);
            }
        }
    }

    // =========================================================================
    // SUBSCRIBER LIST
    // =========================================================================

    /// Add a subscriber. Callers (watchers) guarantee per-pass dedup.
    pub fn add_sub(&self, sub: Weak<dyn Subscriber>) {
        self.subs.borrow_mut().push(sub);
    }

    /// Remove the subscriber with the given id, sweeping dead refs as well
    pub fn remove_sub(&self, id: u64) {
        self.subs.borrow_mut().retain(|weak| match weak.upgrade() {
            Some(sub) => sub.id() != id,
            None => false,
        });
    }

    // =========================================================================
    // NOTIFY - Ping every subscriber that the slot changed
    // =========================================================================

    /// Invoke each live subscriber's scheduling callback.
    ///
    /// Iterates a snapshot of the subscribers present when the call began:
    /// callbacks may subscribe, unsubscribe, or mutate this very slot, and
    /// none of that may affect (or deadlock) the pass in flight. Each
    /// snapshot member is invoked exactly once, in subscription order.
    ///
    /// # Borrow Safety
    /// The snapshot is collected and the borrow released before any
    /// callback runs, so re-entrant `depend`/`add_sub`/`notify` calls on
    /// this dep cannot panic the `RefCell`.
    pub fn notify(&self) {
        let re_entrant = self.notifying.replace(true);
        if re_entrant {
            tracing::trace!(dep = self.id, "re-entrant notify on slot");
        }

        let subs: Vec<Rc<dyn Subscriber>> = {
            let subs = self.subs.borrow();
            subs.iter().filter_map(|weak| weak.upgrade()).collect()
        };

        // Sweep dead refs so long-lived slots don't accumulate garbage
        self.subs.borrow_mut().retain(|weak| weak.strong_count() > 0);

        for sub in subs {
            if sub.is_active() {
                sub.schedule();
            }
        }

        self.notifying.set(re_entrant);
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subs", &self.subs.borrow().len())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
