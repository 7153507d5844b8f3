use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::Deserialize;

use crate::config::PlatformConfig;
use crate::errors::{ApiError, ConnectError, OAuthError, Result};

const MAX_LOG_BODY_CHARS: usize = 512;

/// Absolute-expiry form of a successful token endpoint response.
#[derive(Debug, Clone)]
pub struct TokenResult {
    pub access_token: String,
    pub refresh_token: String,
    pub open_id: String,
    pub scope: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    open_id: Option<String>,
    scope: Option<String>,
    expires_in: Option<i64>,
    refresh_expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenEndpointResponse {
    fn error_text(&self) -> Option<String> {
        match (&self.error, &self.error_description) {
            (Some(code), Some(desc)) => Some(format!("{}: {}", code, desc)),
            (Some(code), None) => Some(code.clone()),
            (None, Some(desc)) => Some(desc.clone()),
            (None, None) => None,
        }
    }

    fn into_token_result(self, now: DateTime<Utc>) -> Result<TokenResult> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::ExchangeFailed("response carried no access_token".into()))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::ExchangeFailed("response carried no refresh_token".into()))?;
        Ok(TokenResult {
            access_token,
            refresh_token,
            open_id: self.open_id.unwrap_or_default(),
            scope: self.scope.unwrap_or_default(),
            access_expires_at: now + Duration::seconds(self.expires_in.unwrap_or(0)),
            refresh_expires_at: now + Duration::seconds(self.refresh_expires_in.unwrap_or(0)),
        })
    }
}

/// HTTP client for the platform's OAuth token endpoints.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    config: Arc<PlatformConfig>,
}

impl OAuthClient {
    pub fn new(config: Arc<PlatformConfig>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    fn token_url(&self) -> String {
        format!("{}/v2/oauth/token/", self.config.api_base_url)
    }

    /// The user-facing authorize URL carrying the signed state and the
    /// PKCE challenge.
    pub fn authorize_url(&self, state: &str, code_challenge: &str) -> String {
        let mut url = url::Url::parse(&format!(
            "{}/v2/auth/authorize/",
            self.config.auth_base_url
        ))
        .unwrap_or_else(|_| {
            url::Url::parse("https://www.tiktok.com/v2/auth/authorize/")
                .expect("fallback authorize URL is valid")
        });
        url.query_pairs_mut()
            .append_pair("client_key", &self.config.client_key)
            .append_pair("scope", &self.config.scope_param())
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        url.to_string()
    }

    /// Exchange an authorization code (plus its PKCE verifier) for tokens.
    pub async fn exchange_code(&self, code: &str, code_verifier: &str) -> Result<TokenResult> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_key", self.config.client_key.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", code_verifier),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let now = Utc::now();

        let parsed: TokenEndpointResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) => {
                return Err(OAuthError::ExchangeFailed(format!(
                    "unparsable token response (HTTP {}): {}",
                    status.as_u16(),
                    preview(&body)
                ))
                .into());
            }
        };
        if let Some(err) = parsed.error_text() {
            return Err(OAuthError::ExchangeFailed(err).into());
        }
        if !status.is_success() {
            return Err(OAuthError::ExchangeFailed(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            ))
            .into());
        }
        debug!("[OAuth] authorization code exchanged");
        parsed.into_token_result(now)
    }

    /// Refresh an access token.
    ///
    /// HTTP 400/401 mean the refresh token is dead (`TokenRevoked`); 5xx
    /// surfaces as a retryable server error for the caller's retry wrapper.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResult> {
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_key", self.config.client_key.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let now = Utc::now();

        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(OAuthError::TokenRevoked.into());
        }
        if !status.is_success() {
            return Err(ConnectError::Api(ApiError::http(
                status.as_u16(),
                format!("token refresh failed: {}", preview(&body)),
            )));
        }

        let parsed: TokenEndpointResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::parse(format!("token refresh response: {}", e)))?;
        if let Some(err) = parsed.error_text() {
            // Body-level errors on a 200 are how some tenants report a
            // dead grant; route them through the revocation classifier.
            let as_exchange = ConnectError::OAuth(OAuthError::ExchangeFailed(err));
            if as_exchange.is_token_revoked() {
                return Err(OAuthError::TokenRevoked.into());
            }
            return Err(as_exchange);
        }
        debug!("[OAuth] access token refreshed");
        parsed.into_token_result(now)
    }

    /// Best-effort token revocation, used when an admin disconnects a store.
    pub async fn revoke(&self, access_token: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/v2/oauth/revoke/", self.config.api_base_url))
            .form(&[
                ("client_key", self.config.client_key.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("token", access_token),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::Api(ApiError::http(
                status.as_u16(),
                format!("token revoke failed: {}", preview(&body)),
            )));
        }
        Ok(())
    }
}

fn preview(body: &str) -> String {
    let mut out: String = body.chars().take(MAX_LOG_BODY_CHARS).collect();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        out.push_str("...");
    }
    out
}
