//! Connection settings for the ledger REST API.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://shmr-finance.ru/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_BASE_URL: &str = "LEDGER_API_URL";
const ENV_TOKEN: &str = "LEDGER_API_TOKEN";
const ENV_TOKEN_FALLBACK: &str = "API_TOKEN";
const ENV_TIMEOUT_SECS: &str = "LEDGER_API_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerClientConfig {
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Bearer token; `None` sends no `Authorization` header.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for LedgerClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl LedgerClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into()).filter(|t: &String| !t.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the configuration from the process environment.
    ///
    /// `LEDGER_API_URL`, `LEDGER_API_TOKEN` (or `API_TOKEN`) and
    /// `LEDGER_API_TIMEOUT_SECS`; unset or unparsable values fall back to the
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = non_empty(ENV_BASE_URL)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let token = non_empty(ENV_TOKEN)
            .or_else(|| non_empty(ENV_TOKEN_FALLBACK))
            .map(|t| t.trim().to_string());

        let timeout_secs = match non_empty(ENV_TIMEOUT_SECS) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    log::warn!(
                        "Ignoring invalid {}={:?}, using {}s",
                        ENV_TIMEOUT_SECS,
                        raw,
                        DEFAULT_TIMEOUT_SECS
                    );
                    DEFAULT_TIMEOUT_SECS
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            base_url,
            token,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}
