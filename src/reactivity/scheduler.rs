// ============================================================================
// ripple-reactive - Scheduler
// Deferred watcher queue: dedup per flush, batching, runaway-loop guard
// ============================================================================
//
// Dep notification never re-runs a watcher directly; it invokes the
// watcher's scheduling callback. This module is the standard callback
// target: queue the watcher, flush the queue synchronously at the first
// opportunity, run each queued watcher once per flush in creation order.
// ============================================================================

use crate::core::constants::MAX_UPDATE_COUNT;
use crate::core::context::with_context;
use crate::primitives::watcher::WatcherHandle;

// =============================================================================
// ENQUEUE
// =============================================================================

/// Queue a watcher for re-run.
///
/// A watcher already in the queue is not queued twice (one re-run per
/// flush, however many of its dependencies changed). Outside a batch or a
/// flush the queue drains immediately; during either, the watcher waits
/// for the ongoing drain.
///
/// A watcher that keeps re-queueing itself within one flush is cut off
/// after [`MAX_UPDATE_COUNT`] passes — the classic "watcher mutates its own
/// dependency" loop — and dropped with an error log instead of hanging the
/// process.
pub fn enqueue(watcher: &WatcherHandle) {
    let id = watcher.id();
    let weak = watcher.as_weak_subscriber();

    enum Outcome {
        Queued { flush: bool },
        Duplicate,
        Runaway,
    }

    let outcome = with_context(|ctx| {
        if ctx.is_flushing() && ctx.bump_circular(id) > MAX_UPDATE_COUNT {
            return Outcome::Runaway;
        }

        if !ctx.queue_watcher(id, weak) {
            return Outcome::Duplicate;
        }

        Outcome::Queued {
            flush: !ctx.is_batching() && !ctx.is_flushing(),
        }
    });

    match outcome {
        Outcome::Queued { flush: true } => flush_now(),
        Outcome::Queued { flush: false } | Outcome::Duplicate => {}
        Outcome::Runaway => {
            tracing::error!(
                watcher = id,
                "update loop detected: watcher keeps invalidating its own dependencies; \
                 dropping it from the queue"
            );
        }
    }
}

// =============================================================================
// FLUSH
// =============================================================================

/// Drain the queue synchronously, running each queued watcher.
///
/// Watchers run in ascending id order (creation order), so computations
/// created earlier — typically the ones that create the later ones — run
/// first. Watchers queued by the runs themselves are picked up by the next
/// iteration of the drain loop. Re-entrant calls while a flush is already
/// draining are no-ops.
pub fn flush_now() {
    let already_flushing = with_context(|ctx| ctx.set_flushing(true));
    if already_flushing {
        return;
    }

    // Restore the flag and counters even if a watcher panics mid-flush.
    struct FlushGuard;

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| {
                ctx.set_flushing(false);
                ctx.clear_circular();
            });
        }
    }

    let _guard = FlushGuard;

    loop {
        let mut batch = with_context(|ctx| ctx.take_queued());
        if batch.is_empty() {
            break;
        }

        batch.sort_by_key(|(id, _)| *id);

        for (_, weak) in batch {
            if let Some(watcher) = weak.upgrade() {
                if watcher.is_active() {
                    watcher.update();
                }
            }
        }
    }
}

// =============================================================================
// BATCH
// =============================================================================

/// Group several mutations into one flush.
///
/// Invalidations inside the closure only queue; the queue drains once when
/// the outermost batch exits. A watcher invalidated by five writes inside a
/// batch re-runs once.
///
/// # Example
///
/// ```
/// use ripple_reactive::{autorun, batch, make_reactive, record};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let state = make_reactive(record! { "a" => 1, "b" => 2 });
/// let record = state.as_record().unwrap().clone();
///
/// let runs = Rc::new(Cell::new(0));
/// let _watcher = autorun({
///     let record = record.clone();
///     let runs = runs.clone();
///     move || {
///         record.get("a");
///         record.get("b");
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     record.set("a", 10.into());
///     record.set("b", 20.into());
/// });
///
/// // One re-run, not two
/// assert_eq!(runs.get(), 2);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Exit the batch even on panic; flush when the outermost batch ends
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());
            if depth == 0 {
                flush_now();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

/// Check if currently inside a batch.
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// TESTS
// =============================================================================
