//! Resilient multi-mirror downloading.
//!
//! A resource is fetched through an ordered list of candidate mirror hosts.
//! Each mirror gets exactly one GET attempt (redirects followed, fixed
//! timeout, no backoff); the first attempt whose body both returns status
//! 200 and parses as JSON5 wins. A failed attempt is logged and superseded
//! by the next mirror; only total exhaustion escalates.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Per-attempt timeout for a single mirror.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Characters of raw body shown in debug logs.
const RAW_PREVIEW_CHARS: usize = 500;

/// Errors from mirror downloading.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Every mirror attempt failed (network error, non-200, or parse error).
    #[error("failed to download a valid {name} config from all mirrors: {mirrors:?}")]
    MirrorsExhausted { name: String, mirrors: Vec<String> },
}

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Builds the full URL for one mirror attempt.
///
/// Mirrors are host prefixes reached over `https://`; a mirror already
/// carrying a scheme is used as-is. An empty mirror is the sentinel for
/// "use the path verbatim as a full URL", prefixing `https://` when the
/// path carries no scheme.
pub fn build_url(mirror: &str, path: &str) -> String {
    if mirror.is_empty() {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("https://{path}")
        }
    } else if mirror.starts_with("http://") || mirror.starts_with("https://") {
        format!("{mirror}/{path}")
    } else {
        format!("https://{mirror}/{path}")
    }
}

/// HTTP client for fetching one resource through a mirror list.
#[derive(Debug, Clone)]
pub struct MirrorClient {
    client: reqwest::Client,
}

impl MirrorClient {
    /// Creates a client with the default per-attempt timeout.
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom per-attempt timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("proxyforge/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self { client })
    }

    /// Fetches `path` through `mirrors` in order and parses the first
    /// successful body as JSON5.
    ///
    /// Requires status 200 exactly; any other status, a network error, or a
    /// parse failure moves on to the next mirror. `name` labels the resource
    /// in logs and errors.
    pub async fn fetch_json(&self, name: &str, path: &str, mirrors: &[&str]) -> Result<Value> {
        for mirror in mirrors {
            let url = build_url(mirror, path);
            tracing::info!("Trying to download {name} config from {url} ...");

            let response = match self.client.get(&url).send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("Failed to download {name} config from {url}: {e}");
                    continue;
                }
            };

            if response.status() != reqwest::StatusCode::OK {
                tracing::warn!(
                    "Failed to download {name} config from {url}: status {}",
                    response.status()
                );
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!("Failed to read {name} config body from {url}: {e}");
                    continue;
                }
            };
            log_raw_preview(name, &text);

            match json5::from_str::<Value>(&text) {
                Ok(value) => {
                    tracing::info!("Downloaded latest {name} config from {url}");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(
                        "Downloaded {name} config from {url} cannot be parsed as JSON5: {e}"
                    );
                    continue;
                }
            }
        }

        Err(FetchError::MirrorsExhausted {
            name: name.to_string(),
            mirrors: mirrors.iter().map(|m| m.to_string()).collect(),
        })
    }
}

/// Dumps the start of a downloaded body at debug level.
fn log_raw_preview(name: &str, text: &str) {
    let preview: String = text.chars().take(RAW_PREVIEW_CHARS).collect();
    let truncated = if text.chars().count() > RAW_PREVIEW_CHARS {
        "...(truncated)"
    } else {
        ""
    };
    tracing::debug!("{name} raw config text: {preview}{truncated}");
}
