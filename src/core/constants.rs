// ============================================================================
// ripple-reactive - Constants
// Flag constants for watcher states plus runaway-update limits
// ============================================================================

// =============================================================================
// WATCHER STATE FLAGS
// =============================================================================

/// Watcher has run at least once
pub const RAN: u32 = 1 << 0;

/// Watcher is currently executing its function
pub const RUNNING: u32 = 1 << 1;

/// Watcher has been stopped (terminal)
pub const STOPPED: u32 = 1 << 2;

/// Watcher deep-traverses its watched value after each run
pub const DEEP: u32 = 1 << 3;

/// A notification arrived while the watcher's scheduling callback was
/// already executing; coalesced into another callback pass
pub const SCHEDULE_PENDING: u32 = 1 << 4;

/// A run was requested while the watcher was already running; coalesced
/// into another pass of the outer run
pub const RUN_PENDING: u32 = 1 << 5;

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum coalesced scheduling-callback passes for a single watcher before
/// the notification is dropped. Bounds synchronous recursion when a callback
/// mutates its own dependencies.
pub const MAX_SCHEDULE_PASSES: u32 = 100;

/// Maximum times a watcher may be re-queued within one scheduler flush
/// before it is dropped from the queue.
pub const MAX_UPDATE_COUNT: u32 = 100;

// =============================================================================
// TESTS
// =============================================================================
