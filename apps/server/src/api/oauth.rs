//! The user-facing half of the connect flow: authorize URL handout and the
//! platform callback.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use creatorhub_connect::{ConnectError, OAuthError};

use crate::error::{ApiError, ApiResult};
use crate::pages;
use crate::state::AppState;

use super::is_valid_store_id;

#[derive(Debug, Deserialize)]
pub struct StoreIdQuery {
    pub store_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn require_store_id(query: &StoreIdQuery) -> ApiResult<&str> {
    match query.store_id.as_deref() {
        Some(id) if is_valid_store_id(id) => Ok(id),
        _ => Err(ApiError::bad_request(
            "INVALID_STORE_ID",
            "store_id must be 1-50 characters of [A-Za-z0-9_-]",
        )),
    }
}

/// GET /connect/initiate — 302 to the platform authorize page.
async fn initiate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoreIdQuery>,
) -> ApiResult<Redirect> {
    let store_id = require_store_id(&query)?;
    let url = state.oauth_service.begin_authorization(store_id).await?;
    info!("[OAuth] redirecting store {} to authorize page", store_id);
    Ok(Redirect::temporary(&url))
}

/// GET /auth/url — the same URL as JSON, for frontends that open a popup.
async fn auth_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StoreIdQuery>,
) -> ApiResult<Json<AuthUrlResponse>> {
    let store_id = require_store_id(&query)?;
    let auth_url = state.oauth_service.begin_authorization(store_id).await?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

/// GET /auth/callback — the platform redirects the user here.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(error) = query.error.as_deref() {
        let description = query.error_description.as_deref().unwrap_or("");
        warn!("[OAuth] platform returned error '{}': {}", error, description);
        return error_page(StatusCode::BAD_REQUEST, error, description);
    }

    let (Some(code), Some(oauth_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        return error_page(
            StatusCode::BAD_REQUEST,
            "OAUTH_STATE_INVALID",
            "callback is missing code or state",
        );
    };

    match state
        .oauth_service
        .complete_authorization(code, oauth_state)
        .await
    {
        Ok(account) => (
            StatusCode::OK,
            Html(pages::callback_success(&account.store_id)),
        )
            .into_response(),
        Err(ConnectError::OAuth(OAuthError::StateInvalid)) => error_page(
            StatusCode::BAD_REQUEST,
            "OAUTH_STATE_INVALID",
            "the state parameter failed validation",
        ),
        Err(ConnectError::OAuth(OAuthError::StateMissing)) => error_page(
            StatusCode::BAD_REQUEST,
            "OAUTH_STATE_MISSING",
            "this authorization link expired or was already used",
        ),
        Err(err) => {
            warn!("[OAuth] token exchange failed: {}", err);
            error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "OAUTH_EXCHANGE_FAILED",
                &err.to_string(),
            )
        }
    }
}

fn error_page(status: StatusCode, code: &str, message: &str) -> Response {
    (status, Html(pages::callback_error(code, message))).into_response()
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/connect/initiate", get(initiate))
        .route("/auth/url", get(auth_url))
        .route("/auth/callback", get(callback))
}
