// ============================================================================
// ripple-reactive - Reactive Observation of Plain Nested Data
// ============================================================================
//
// Mutations to observed records and sequences automatically re-trigger the
// computations that read them. Two operations make up the whole surface:
// wrap a value so reads and writes are observable (`make_reactive`), and
// run a function while recording its reads, re-triggering it when any of
// them later changes (`run_tracked` / `autorun`).
// ============================================================================

pub mod core;
pub mod observe;
pub mod primitives;
pub mod reactivity;

mod macros;

// Re-export core items at crate root for ergonomic access
pub use crate::core::constants;
pub use crate::core::context::{
    is_observing, is_tracking, untracked, with_context, with_observing, ObserverContext,
    TargetGuard,
};
pub use crate::core::dep::{Dep, Subscriber};

// Re-export the value model and containers
pub use crate::observe::list::ReactiveList;
pub use crate::observe::record::ReactiveRecord;
pub use crate::observe::value::{same_value, Value};
pub use crate::observe::walk::{make_reactive, observe_value, traverse};

// Re-export the computation node API
pub use crate::primitives::watcher::{
    autorun, run_tracked, watch_deep, InvalidateFn, WatchFn, WatcherError, WatcherHandle,
};

// Re-export reactivity functions
pub use crate::reactivity::equality::{safe_equals_f64, safe_not_equal_f64};
pub use crate::reactivity::scheduler::{batch, flush_now, is_batching};

// =============================================================================
// TESTS
// =============================================================================
