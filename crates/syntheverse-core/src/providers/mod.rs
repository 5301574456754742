pub mod embedder;
pub mod llm;
pub mod network;

/// `OPENAI_BASE_URL` or the public endpoint, without a trailing slash.
pub fn openai_base_url() -> String {
    std::env::var("OPENAI_BASE_URL")
        .ok()
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
}

/// Maps a non-2xx provider reply onto a classified error carrying the status.
pub(crate) fn status_error(
    provider: &str,
    what: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> crate::errors::BridgeError {
    use crate::errors::{BridgeError, BridgeErrorKind};
    let detail = format!("{} API error (status {}): {}", what, status.as_u16(), body);
    let kind = match status.as_u16() {
        429 => BridgeErrorKind::ProviderRateLimit,
        408 | 504 => BridgeErrorKind::ProviderTimeout,
        _ => BridgeErrorKind::ProviderServer,
    };
    BridgeError::new(kind, detail)
        .with_status(status.as_u16())
        .with_provider(provider)
}

pub(crate) fn send_error(provider: &str, err: reqwest::Error) -> crate::errors::BridgeError {
    use crate::errors::{BridgeError, BridgeErrorKind};
    if err.is_timeout() {
        BridgeError::new(BridgeErrorKind::ProviderTimeout, err.to_string()).with_provider(provider)
    } else {
        BridgeError::network(provider, err.to_string())
    }
}
