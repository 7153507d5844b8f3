//! Short-lived pending state for in-flight OAuth authorization flows.

mod model;
mod traits;

pub use model::PendingState;
pub use traits::PendingStateRepositoryTrait;

/// How long a pending authorization may sit before its state expires.
pub const PENDING_STATE_TTL_MINUTES: i64 = 10;
