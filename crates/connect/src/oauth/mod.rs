//! OAuth authorization-code + PKCE protocol handler.
//!
//! The flow is split between a pure HTTP client (`OAuthClient`), the
//! stateless helpers (`PkcePair`, `StateSigner`) and the `OAuthService`
//! that binds them to the pending-state store and the token service.

mod client;
mod pkce;
mod state;

pub use client::{OAuthClient, TokenResult};
pub use pkce::PkcePair;
pub use state::StateSigner;

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};

use creatorhub_core::accounts::StoreAccount;
use creatorhub_core::oauth::{PendingState, PendingStateRepositoryTrait};

use crate::errors::{OAuthError, Result};
use crate::tokens::TokenService;

/// Drives the two halves of the authorization flow: handing out authorize
/// URLs and consuming the platform callback.
pub struct OAuthService {
    signer: StateSigner,
    client: OAuthClient,
    pending: Arc<dyn PendingStateRepositoryTrait>,
    tokens: Arc<TokenService>,
}

impl OAuthService {
    pub fn new(
        signer: StateSigner,
        client: OAuthClient,
        pending: Arc<dyn PendingStateRepositoryTrait>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            signer,
            client,
            pending,
            tokens,
        }
    }

    /// Build the platform authorize URL for `store_id`.
    ///
    /// The pending-state row is persisted before the URL leaves this
    /// function, so a fast callback can never race an unwritten verifier.
    pub async fn begin_authorization(&self, store_id: &str) -> Result<String> {
        let pkce = PkcePair::generate();
        let state = self.signer.build(store_id);
        self.pending
            .insert(PendingState::new(
                state.clone(),
                pkce.verifier.clone(),
                store_id.to_string(),
            ))
            .await?;
        debug!("[OAuth] issued authorize URL for store {}", store_id);
        Ok(self.client.authorize_url(&state, &pkce.challenge))
    }

    /// Consume the platform callback: validate the signed state, burn the
    /// pending row, exchange the code and persist the encrypted tokens.
    pub async fn complete_authorization(&self, code: &str, state: &str) -> Result<StoreAccount> {
        let store_id = self.signer.validate(state)?;

        self.pending.sweep_expired(Utc::now()).await?;
        let row = self
            .pending
            .take(state)
            .await?
            .ok_or(OAuthError::StateMissing)?;
        // The signed store id and the stored row must agree; a mismatch
        // means the row was written for a different flow.
        if row.store_id != store_id {
            return Err(OAuthError::StateInvalid.into());
        }

        let result = self.client.exchange_code(code, &row.code_verifier).await?;
        let account = self.tokens.store_tokens(&store_id, &result).await?;
        info!(
            "[OAuth] store {} connected as open_id {}",
            store_id, account.platform_open_id
        );
        Ok(account)
    }
}
