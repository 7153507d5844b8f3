//! Connected store accounts and their token material.

mod model;
mod traits;

pub use model::{AccountStatus, NewStoreAccount, StoreAccount, TokenRotation};
pub use traits::StoreAccountRepositoryTrait;
