//! Error types for the platform-facing crate.

use thiserror::Error;

use creatorhub_core::retry::RetryError;

/// Result type alias for connect operations.
pub type Result<T> = std::result::Result<T, ConnectError>;

/// Retry policy class for platform failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classification of a platform API error body / HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Invalid or expired access token; never retried.
    Auth,
    /// Platform throttling; retried with backoff.
    RateLimit,
    /// Platform 5xx; retried with backoff.
    Server,
    /// Any other 4xx; never retried.
    Client,
    /// Transport-level failure without a structured body.
    Http,
    /// The response body could not be decoded.
    Parse,
}

/// Structured platform API error, decoded from the response envelope
/// `{data, error: {code, message, log_id}}` or synthesized from a bare
/// HTTP status.
#[derive(Debug, Clone, Error)]
#[error("platform API error [{code}]: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: String,
    pub message: String,
    pub log_id: Option<String>,
    pub http_status: Option<u16>,
}

impl ApiError {
    /// Build an error from envelope fields, deriving the kind from the
    /// platform error code first and the HTTP status second.
    pub fn from_envelope(
        code: String,
        message: String,
        log_id: Option<String>,
        http_status: Option<u16>,
    ) -> Self {
        let kind = match code.as_str() {
            "access_token_invalid" | "access_token_expired" | "invalid_token" => ApiErrorKind::Auth,
            "rate_limit_exceeded" => ApiErrorKind::RateLimit,
            _ => match http_status {
                Some(401) => ApiErrorKind::Auth,
                Some(429) => ApiErrorKind::RateLimit,
                Some(s) if (500..=599).contains(&s) => ApiErrorKind::Server,
                Some(s) if (400..=499).contains(&s) => ApiErrorKind::Client,
                _ => ApiErrorKind::Http,
            },
        };
        Self {
            kind,
            code,
            message,
            log_id,
            http_status,
        }
    }

    /// A non-2xx response with no parsable error body.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::from_envelope("http_error".into(), message.into(), None, Some(status))
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            code: "parse_error".into(),
            message: message.into(),
            log_id: None,
            http_status: None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::RateLimit | ApiErrorKind::Server)
    }
}

/// Failures of the OAuth protocol handler.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// State signature did not verify — request is rejected before any
    /// pending-state row is touched.
    #[error("OAuth state signature is invalid")]
    StateInvalid,

    /// No pending-state row: expired, already consumed, or never issued.
    #[error("OAuth state is expired or already used")]
    StateMissing,

    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// The platform rejected the refresh token (HTTP 400/401). The account
    /// needs a fresh user-driven authorization.
    #[error("refresh token is revoked or no longer valid")]
    TokenRevoked,
}

/// Errors produced by the connect crate.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] creatorhub_core::Error),

    #[error("sync already in progress")]
    LockNotAcquired,

    #[error("operation cancelled")]
    Cancelled,
}

impl ConnectError {
    /// Classify for retry policy. Only rate-limit, server-side and
    /// transport failures are worth another attempt.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api(api) => match api.kind {
                ApiErrorKind::RateLimit | ApiErrorKind::Server => RetryClass::Retryable,
                ApiErrorKind::Auth => RetryClass::ReauthRequired,
                _ => RetryClass::Permanent,
            },
            Self::Http(_) => RetryClass::Retryable,
            Self::OAuth(OAuthError::TokenRevoked) => RetryClass::ReauthRequired,
            _ => RetryClass::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }

    /// True when this failure means the stored refresh token is dead and
    /// the account must transition to NEED_RECONNECT.
    ///
    /// Structural matches first; the message scan is a compatibility shim
    /// for platform deployments whose token endpoint reports revocation
    /// with an unclassified code.
    pub fn is_token_revoked(&self) -> bool {
        match self {
            Self::OAuth(OAuthError::TokenRevoked) => true,
            Self::Api(api) if api.kind == ApiErrorKind::Auth => true,
            other => {
                let text = other.to_string().to_lowercase();
                text.contains("token")
                    && ["revoked", "invalid", "expired", "unauthorized"]
                        .iter()
                        .any(|needle| text.contains(needle))
            }
        }
    }
}

impl From<RetryError<ConnectError>> for ConnectError {
    fn from(err: RetryError<ConnectError>) -> Self {
        match err {
            RetryError::Cancelled => Self::Cancelled,
            RetryError::Operation(inner) => inner,
        }
    }
}
