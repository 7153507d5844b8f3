use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{AccountStatus, NewStoreAccount, StoreAccount, TokenRotation};
use crate::Result;

/// Persistence seam for store accounts.
///
/// Reads are synchronous pool lookups; mutations run on the serialized
/// write handle so token rotation stays atomic.
#[async_trait]
pub trait StoreAccountRepositoryTrait: Send + Sync {
    fn find_by_store_id(&self, store_id: &str) -> Result<Option<StoreAccount>>;

    fn list_all(&self) -> Result<Vec<StoreAccount>>;

    fn list_by_status(&self, status: AccountStatus) -> Result<Vec<StoreAccount>>;

    /// Connected accounts whose access token expires before `horizon`.
    fn list_refresh_candidates(&self, horizon: DateTime<Utc>) -> Result<Vec<StoreAccount>>;

    /// Insert or replace the account row after a successful OAuth exchange.
    /// Sets `status = CONNECTED` and refreshes `updated_at`.
    async fn upsert_connected(&self, account: NewStoreAccount) -> Result<StoreAccount>;

    /// Replace both ciphertexts and both expiries in one transaction.
    async fn rotate_tokens(&self, store_id: &str, rotation: TokenRotation) -> Result<()>;

    async fn set_status(&self, store_id: &str, status: AccountStatus) -> Result<()>;

    async fn mark_synced(&self, store_id: &str, at: DateTime<Utc>) -> Result<()>;
}
