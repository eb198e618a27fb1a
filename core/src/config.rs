//! Client configuration: base URL, round-trip timeout, and optional token.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:37888";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Connection settings shared by every call a client makes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Service root, stored without a trailing `/`.
    pub base_url: String,
    /// Bound on the whole round trip of a single call.
    pub timeout: Duration,
    /// Static bearer token. Blank tokens are treated as absent.
    pub token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    /// Read `HARNESS_MEM_BASE_URL`, `HARNESS_MEM_TIMEOUT_SEC` and
    /// `HARNESS_MEM_TOKEN`, falling back to defaults for anything missing or
    /// unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("HARNESS_MEM_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout = lookup("HARNESS_MEM_TIMEOUT_SEC")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(DEFAULT_TIMEOUT);
        Self::new(&base_url)
            .with_timeout(timeout)
            .with_token(lookup("HARNESS_MEM_TOKEN"))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_token<S: Into<String>>(mut self, token: Option<S>) -> Self {
        self.token = token.map(Into::into).filter(|t| !t.trim().is_empty());
        self
    }

    /// Token to attach to outgoing requests, if any.
    pub fn active_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}
