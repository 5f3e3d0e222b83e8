// ============================================================================
// ripple-reactive - Primitives Module
// The computation node and its public constructors
// ============================================================================

pub mod watcher;

// Re-export for convenience
pub use watcher::{
    autorun, run_tracked, watch_deep, InvalidateFn, WatchFn, WatcherError, WatcherHandle,
    WatcherInner,
};
