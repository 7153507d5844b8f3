//! Token lifecycle: encrypted storage, just-in-time refresh and the
//! account status state machine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use creatorhub_core::accounts::{
    AccountStatus, NewStoreAccount, StoreAccount, StoreAccountRepositoryTrait, TokenRotation,
};
use creatorhub_core::retry::{with_retry, RetryPolicy};
use creatorhub_core::vault::CryptoVault;

use crate::errors::{ConnectError, Result};
use crate::oauth::{OAuthClient, TokenResult};

/// Tokens are refreshed once they are within this window of expiry.
pub const ACCESS_REFRESH_WINDOW_SECS: i64 = 5 * 60;

/// The slice of the token service the orchestrator consumes.
#[async_trait]
pub trait TokenServiceTrait: Send + Sync {
    /// Returns a plaintext access token for a CONNECTED account, refreshing
    /// first when inside the expiry window. `None` means the account cannot
    /// sync right now (absent, disabled, needs reconnect, or the refresh
    /// failed and the status was downgraded accordingly).
    ///
    /// Corrupt ciphertext is an error, not a `None`: the account is moved
    /// to ERROR and the failure surfaces so the caller logs it as such.
    async fn get_valid_access_token(
        &self,
        store_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>>;

    async fn update_last_sync(&self, store_id: &str) -> Result<()>;
}

pub struct TokenService {
    accounts: Arc<dyn StoreAccountRepositoryTrait>,
    vault: Arc<CryptoVault>,
    oauth: OAuthClient,
    retry: RetryPolicy,
}

impl TokenService {
    pub fn new(
        accounts: Arc<dyn StoreAccountRepositoryTrait>,
        vault: Arc<CryptoVault>,
        oauth: OAuthClient,
    ) -> Self {
        Self {
            accounts,
            vault,
            oauth,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Encrypt and persist a fresh token pair; the account comes out
    /// CONNECTED whatever state it was in before.
    pub async fn store_tokens(&self, store_id: &str, result: &TokenResult) -> Result<StoreAccount> {
        let access_token_ct = self
            .vault
            .encrypt_str(&result.access_token)
            .map_err(creatorhub_core::Error::from)?;
        let refresh_token_ct = self
            .vault
            .encrypt_str(&result.refresh_token)
            .map_err(creatorhub_core::Error::from)?;

        let account = self
            .accounts
            .upsert_connected(NewStoreAccount {
                store_id: store_id.to_string(),
                platform_open_id: result.open_id.clone(),
                access_token_ct,
                refresh_token_ct,
                access_expires_at: result.access_expires_at,
                refresh_expires_at: result.refresh_expires_at,
                scope: result.scope.clone(),
            })
            .await?;
        info!("[Tokens] stored token pair for store {}", store_id);
        Ok(account)
    }

    /// Admin disconnect: revoke upstream when we still can, then disable.
    /// Revocation is best-effort — a dead platform must not keep the
    /// account enabled.
    pub async fn disconnect(&self, store_id: &str) -> Result<()> {
        if let Some(account) = self.accounts.find_by_store_id(store_id)? {
            if account.status == AccountStatus::Connected {
                match self.vault.decrypt_str(&account.access_token_ct) {
                    Ok(access_token) => {
                        if let Err(err) = self.oauth.revoke(&access_token).await {
                            warn!(
                                "[Tokens] revoke for store {} failed (continuing): {}",
                                store_id, err
                            );
                        }
                    }
                    Err(err) => {
                        warn!(
                            "[Tokens] could not decrypt token for revoke of store {}: {}",
                            store_id, err
                        );
                    }
                }
            }
        }
        self.accounts
            .set_status(store_id, AccountStatus::Disabled)
            .await?;
        info!("[Tokens] store {} disconnected", store_id);
        Ok(())
    }

    /// Decrypt a ciphertext column; on failure the account is marked ERROR
    /// before the crypto error propagates.
    async fn decrypt_or_poison(&self, store_id: &str, ciphertext: &str) -> Result<String> {
        match self.vault.decrypt_str(ciphertext) {
            Ok(plaintext) => Ok(plaintext),
            Err(err) => {
                warn!(
                    "[Tokens] stored token for {} is unreadable ({}); marking account ERROR",
                    store_id, err
                );
                self.accounts
                    .set_status(store_id, AccountStatus::Error)
                    .await?;
                Err(creatorhub_core::Error::from(err).into())
            }
        }
    }

    async fn refresh_and_rotate(
        &self,
        account: &StoreAccount,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let store_id = account.store_id.as_str();
        let refresh_token = self
            .decrypt_or_poison(store_id, &account.refresh_token_ct)
            .await?;

        let refreshed = with_retry(
            &self.retry,
            cancel,
            "token_refresh",
            ConnectError::is_retryable,
            || {
                let oauth = self.oauth.clone();
                let refresh_token = refresh_token.clone();
                async move { oauth.refresh(&refresh_token).await }
            },
        )
        .await
        .map_err(ConnectError::from);

        match refreshed {
            Ok(result) => {
                let rotation = TokenRotation {
                    access_token_ct: self
                        .vault
                        .encrypt_str(&result.access_token)
                        .map_err(creatorhub_core::Error::from)?,
                    refresh_token_ct: self
                        .vault
                        .encrypt_str(&result.refresh_token)
                        .map_err(creatorhub_core::Error::from)?,
                    access_expires_at: result.access_expires_at,
                    refresh_expires_at: result.refresh_expires_at,
                };
                self.accounts.rotate_tokens(store_id, rotation).await?;
                info!("[Tokens] rotated token pair for store {}", store_id);
                Ok(Some(result.access_token))
            }
            Err(ConnectError::Cancelled) => Err(ConnectError::Cancelled),
            Err(err) if err.is_token_revoked() => {
                warn!(
                    "[Tokens] refresh token for store {} is dead ({}); needs reconnect",
                    store_id, err
                );
                self.accounts
                    .set_status(store_id, AccountStatus::NeedReconnect)
                    .await?;
                Ok(None)
            }
            Err(err) => {
                warn!(
                    "[Tokens] refresh for store {} failed ({}); marking account ERROR",
                    store_id, err
                );
                self.accounts
                    .set_status(store_id, AccountStatus::Error)
                    .await?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl TokenServiceTrait for TokenService {
    async fn get_valid_access_token(
        &self,
        store_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let Some(account) = self.accounts.find_by_store_id(store_id)? else {
            return Ok(None);
        };
        if account.status != AccountStatus::Connected {
            return Ok(None);
        }

        let window = Duration::seconds(ACCESS_REFRESH_WINDOW_SECS);
        if Utc::now() + window < account.access_expires_at {
            let token = self
                .decrypt_or_poison(store_id, &account.access_token_ct)
                .await?;
            return Ok(Some(token));
        }

        self.refresh_and_rotate(&account, cancel).await
    }

    async fn update_last_sync(&self, store_id: &str) -> Result<()> {
        self.accounts
            .mark_synced(store_id, Utc::now())
            .await
            .map_err(Into::into)
    }
}
