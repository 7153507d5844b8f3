use chrono::{DateTime, Duration, Utc};

/// One row per authorization URL handed out: binds the signed `state`
/// parameter to the PKCE code verifier it was generated with.
///
/// Consumed destructively on callback; swept when `expires_at` passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingState {
    pub state: String,
    pub code_verifier: String,
    pub store_id: String,
    pub expires_at: DateTime<Utc>,
}

impl PendingState {
    pub fn new(state: String, code_verifier: String, store_id: String) -> Self {
        Self {
            state,
            code_verifier,
            store_id,
            expires_at: Utc::now() + Duration::minutes(super::PENDING_STATE_TTL_MINUTES),
        }
    }
}
