//! HTTP surface: the OAuth connect flow and the admin sync endpoints.

pub mod admin;
pub mod health;
pub mod oauth;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(oauth::router())
        .merge(admin::router())
        .merge(health::router())
}

/// Store ids are externally assigned: 1-50 chars of `[A-Za-z0-9_-]`.
pub(crate) fn is_valid_store_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 50
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_id_validation_bounds_and_charset() {
        assert!(is_valid_store_id("store_A"));
        assert!(is_valid_store_id("a"));
        assert!(is_valid_store_id("shop-eu-west_42"));
        assert!(is_valid_store_id(&"x".repeat(50)));
        assert!(!is_valid_store_id(""));
        assert!(!is_valid_store_id(&"x".repeat(51)));
        assert!(!is_valid_store_id("store A"));
        assert!(!is_valid_store_id("store/../etc"));
        assert!(!is_valid_store_id("störe"));
    }
}
