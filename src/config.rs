//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Timing values fall back to the
//! reference defaults: 300 s correlation TTL, 30 s response-stream read
//! timeout.

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// Allowed CORS origins, comma-separated. `*` means permissive.
    pub cors_origins: String,

    /// Identities seeded into the public account set at startup.
    pub public_accounts: Vec<String>,

    /// Time-to-live for correlation table entries.
    pub correlation_ttl: Duration,

    /// Per-read timeout while waiting for a duplex reply on a streaming
    /// request/response flow.
    pub response_timeout: Duration,

    /// Request timeout applied to the non-streaming push endpoints.
    pub request_timeout: Duration,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()?;

        let cors_origins = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());

        let public_accounts = std::env::var("PUBLIC_ACCOUNTS")
            .map(|raw| parse_account_list(&raw))
            .unwrap_or_default();

        let correlation_ttl = Duration::from_secs(parse_env("CORRELATION_TTL_SECS", 300));
        let response_timeout = Duration::from_secs(parse_env("RESPONSE_TIMEOUT_SECS", 30));
        let request_timeout = Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 10));

        Ok(Self {
            listen_addr,
            cors_origins,
            public_accounts,
            correlation_ttl,
            response_timeout,
            request_timeout,
        })
    }
}

/// Splits a comma-separated account list, trimming whitespace and dropping
/// empty segments.
fn parse_account_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn account_list_trims_and_drops_empties() {
        let parsed = parse_account_list("ci_bot, notification_bot,, ");
        assert_eq!(parsed, vec!["ci_bot", "notification_bot"]);
    }

    #[test]
    fn account_list_of_blank_input_is_empty() {
        assert!(parse_account_list("").is_empty());
        assert!(parse_account_list(" , ").is_empty());
    }
}
