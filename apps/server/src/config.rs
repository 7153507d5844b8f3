//! Process configuration, loaded from the environment once at startup.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::FixedOffset;
use cron::Schedule;

use creatorhub_connect::{PlatformConfig, SyncConfig};
use creatorhub_core::errors::CryptoError;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_opt(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {}: {}", key, e)),
        None => Ok(default),
    }
}

/// Decode the 32-byte hex AEAD key. Absence and malformation stay
/// distinguishable for operators.
pub(crate) fn parse_token_key(raw: Option<&str>) -> std::result::Result<[u8; 32], CryptoError> {
    let raw = raw.ok_or(CryptoError::KeyMissing)?;
    let bytes = hex::decode(raw.trim()).map_err(|_| CryptoError::KeyInvalid)?;
    let key: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::KeyInvalid)?;
    Ok(key)
}

/// `UTC`, `+08:00`, `-05:30` and friends.
pub(crate) fn parse_timezone(raw: &str) -> Result<FixedOffset> {
    if raw.eq_ignore_ascii_case("utc") || raw.eq_ignore_ascii_case("z") {
        return Ok(FixedOffset::east_opt(0).expect("zero offset is valid"));
    }
    raw.parse::<FixedOffset>()
        .with_context(|| format!("invalid timezone offset '{}'", raw))
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub platform: PlatformConfig,
    pub token_enc_key: [u8; 32],
    pub state_secret: Vec<u8>,
    pub db_url: String,
    pub db_pool_size: u32,
    pub db_pool_min: u32,
    pub sync: SyncConfig,
    pub sync_enabled: bool,
    pub cron_refresh_tokens: String,
    pub cron_user_daily: String,
    pub cron_video_daily: String,
    pub timezone_name: String,
    pub timezone: FixedOffset,
    pub rate_limit_rps: f64,
    pub log_level: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let host = env_or("HOST", "0.0.0.0");
        let port: u16 = env_parse("PORT", 8080)?;
        let bind_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid HOST/PORT '{}:{}'", host, port))?;

        let client_key =
            env_opt("PLATFORM_CLIENT_KEY").context("PLATFORM_CLIENT_KEY is required")?;
        let client_secret =
            env_opt("PLATFORM_CLIENT_SECRET").context("PLATFORM_CLIENT_SECRET is required")?;
        let redirect_uri =
            env_opt("PLATFORM_REDIRECT_URI").context("PLATFORM_REDIRECT_URI is required")?;
        let mut platform = PlatformConfig::new(client_key, client_secret, redirect_uri);
        if let (Some(auth_base), Some(api_base)) = (
            env_opt("PLATFORM_AUTH_BASE_URL"),
            env_opt("PLATFORM_API_BASE_URL"),
        ) {
            platform = platform.with_bases(auth_base, api_base);
        }

        let token_enc_key = parse_token_key(env_opt("TOKEN_ENC_KEY").as_deref())?;
        let state_secret = env_opt("STATE_SECRET")
            .map(|s| s.into_bytes())
            .unwrap_or_else(|| token_enc_key.to_vec());

        let sync = SyncConfig {
            user_concurrency: env_parse("SYNC_USER_CONCURRENCY", 30usize)?,
            video_concurrency: env_parse("SYNC_VIDEO_CONCURRENCY", 20usize)?,
            refresh_concurrency: env_parse("SYNC_REFRESH_CONCURRENCY", 10usize)?,
            ..SyncConfig::default()
        };

        let cron_refresh_tokens = env_or("SYNC_CRON_REFRESH_TOKENS", "0 0 1 * * *");
        let cron_user_daily = env_or("SYNC_CRON_USER_DAILY", "0 0 2 * * *");
        let cron_video_daily = env_or("SYNC_CRON_VIDEO_DAILY", "0 0 3 * * *");
        for (name, expr) in [
            ("SYNC_CRON_REFRESH_TOKENS", &cron_refresh_tokens),
            ("SYNC_CRON_USER_DAILY", &cron_user_daily),
            ("SYNC_CRON_VIDEO_DAILY", &cron_video_daily),
        ] {
            Schedule::from_str(expr).with_context(|| format!("invalid {} '{}'", name, expr))?;
        }

        let timezone_name = env_or("SYNC_TIMEZONE", "UTC");
        let timezone = parse_timezone(&timezone_name)?;

        let db_pool_size: u32 = env_parse("DB_POOL_SIZE", 100u32)?;
        let db_pool_min: u32 = env_parse("DB_POOL_MIN", 20u32)?;
        if db_pool_size == 0 {
            bail!("DB_POOL_SIZE must be at least 1");
        }

        Ok(Self {
            bind_addr,
            platform,
            token_enc_key,
            state_secret,
            db_url: env_or("DATABASE_URL", "creatorhub.db"),
            db_pool_size,
            db_pool_min,
            sync,
            sync_enabled: env_parse("SYNC_ENABLED", true)?,
            cron_refresh_tokens,
            cron_user_daily,
            cron_video_daily,
            timezone_name,
            timezone,
            rate_limit_rps: env_parse("RATE_LIMIT_RPS", 5.0f64)?,
            log_level: env_or("LOG_LEVEL", "info"),
        })
    }

    /// The pool must be able to feed every worker plus scheduler overhead.
    pub fn pool_size_warning(&self) -> Option<String> {
        let workers = self.sync.user_concurrency
            + self.sync.video_concurrency
            + self.sync.refresh_concurrency;
        let needed = workers + 4;
        if (self.db_pool_size as usize) < needed {
            Some(format!(
                "DB_POOL_SIZE {} is below worker demand {} (sum of sync concurrencies + overhead)",
                self.db_pool_size, needed
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_key_must_be_32_hex_bytes() {
        assert!(matches!(parse_token_key(None), Err(CryptoError::KeyMissing)));
        assert!(matches!(
            parse_token_key(Some("deadbeef")),
            Err(CryptoError::KeyInvalid)
        ));
        assert!(matches!(
            parse_token_key(Some("zz".repeat(32).as_str())),
            Err(CryptoError::KeyInvalid)
        ));
        let key = parse_token_key(Some(&"ab".repeat(32))).unwrap();
        assert_eq!(key.len(), 32);
        assert_eq!(key[0], 0xab);
    }

    #[test]
    fn timezone_accepts_utc_and_offsets() {
        assert_eq!(parse_timezone("UTC").unwrap().local_minus_utc(), 0);
        assert_eq!(
            parse_timezone("+08:00").unwrap().local_minus_utc(),
            8 * 3600
        );
        assert_eq!(
            parse_timezone("-05:30").unwrap().local_minus_utc(),
            -(5 * 3600 + 30 * 60)
        );
        assert!(parse_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn default_cron_expressions_parse() {
        for expr in ["0 0 1 * * *", "0 0 2 * * *", "0 0 3 * * *"] {
            Schedule::from_str(expr).unwrap();
        }
    }
}
