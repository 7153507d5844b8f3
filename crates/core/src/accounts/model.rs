use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DatabaseError, Error};

/// Connection status of a store account.
///
/// `get_valid_access_token` hands out token material only for `Connected`
/// accounts. `NeedReconnect` means the refresh token is no longer usable and
/// a user has to run the OAuth flow again; `Error` covers corrupt ciphertext
/// and unclassified refresh failures; `Disabled` is the administrative off
/// switch and terminal for sync purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Connected,
    NeedReconnect,
    Error,
    Disabled,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "CONNECTED",
            Self::NeedReconnect => "NEED_RECONNECT",
            Self::Error => "ERROR",
            Self::Disabled => "DISABLED",
        }
    }

    pub fn from_str(value: &str) -> Result<Self, Error> {
        match value {
            "CONNECTED" => Ok(Self::Connected),
            "NEED_RECONNECT" => Ok(Self::NeedReconnect),
            "ERROR" => Ok(Self::Error),
            "DISABLED" => Ok(Self::Disabled),
            other => Err(Error::Database(DatabaseError::Internal(format!(
                "Unknown account status '{}'",
                other
            )))),
        }
    }
}

/// The persistent record binding a store to a connected platform account.
///
/// Token fields hold vault ciphertext, never plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreAccount {
    pub store_id: String,
    pub platform_open_id: String,
    #[serde(skip_serializing)]
    pub access_token_ct: String,
    #[serde(skip_serializing)]
    pub refresh_token_ct: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub scope: String,
    pub status: AccountStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub connected_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating or re-connecting an account after a successful
/// OAuth exchange. The upsert sets `status = CONNECTED` unconditionally.
#[derive(Debug, Clone)]
pub struct NewStoreAccount {
    pub store_id: String,
    pub platform_open_id: String,
    pub access_token_ct: String,
    pub refresh_token_ct: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub scope: String,
}

/// Replacement token material written back after a successful refresh.
///
/// Applied in a single transaction so no reader ever observes a
/// half-rotated pair.
#[derive(Debug, Clone)]
pub struct TokenRotation {
    pub access_token_ct: String,
    pub refresh_token_ct: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}
