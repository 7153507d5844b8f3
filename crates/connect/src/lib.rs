//! Platform-facing side of the CreatorHub engine: the OAuth protocol
//! handler, the rate-limited platform API client, the token lifecycle
//! service and the sync orchestrator.
//!
//! Persistence goes through the repository traits declared in
//! `creatorhub-core`; this crate never touches SQL directly.

pub mod api;
pub mod config;
pub mod errors;
pub mod oauth;
pub mod sync;
pub mod tokens;

pub use api::{PlatformApiClient, PlatformApiTrait, UserStats, VideoStats};
pub use config::PlatformConfig;
pub use errors::{ApiError, ApiErrorKind, ConnectError, OAuthError, Result, RetryClass};
pub use oauth::{OAuthClient, OAuthService, PkcePair, StateSigner, TokenResult};
pub use sync::{
    SyncConfig, SyncJob, SyncOrchestrator, SyncProgressPayload, SyncProgressReporter,
    SyncRunSummary,
};
pub use tokens::{TokenService, TokenServiceTrait};
