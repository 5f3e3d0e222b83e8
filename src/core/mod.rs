// ============================================================================
// ripple-reactive - Core Module
// Constants, thread-local context, and the dependency registry
// ============================================================================

pub mod constants;
pub mod context;
pub mod dep;

// Re-export commonly used items
pub use constants::*;
pub use context::{
    is_observing, is_tracking, untracked, with_context, with_observing, ObserverContext,
    TargetGuard,
};
pub use dep::{Dep, Subscriber};
