//! Core domain types and kernels for the CreatorHub metrics engine.
//!
//! This crate owns the domain models (store accounts, snapshots, sync logs,
//! pending OAuth state), the repository traits the storage layer implements,
//! and the small shared kernels: the crypto vault, the retry wrapper and the
//! request pacer. It has no knowledge of HTTP or SQL.

pub mod accounts;
pub mod errors;
pub mod oauth;
pub mod pacer;
pub mod retry;
pub mod snapshots;
pub mod sync;
pub mod vault;

pub use errors::{Error, Result};
