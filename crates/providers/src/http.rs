//! Response classification shared by the HTTP adapters.

use finrag_core::error::ProviderError;
use std::time::Duration;

/// Body marker some APIs use for quota exhaustion, regardless of status code.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Build a reqwest client with the configured timeout.
pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a transport failure to a provider error.
pub(crate) fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Parse a numeric `Retry-After` header value.
pub(crate) fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

/// Classify a non-success response. This is the only place rate limiting is
/// recognised.
pub(crate) fn error_for_status(
    status: u16,
    retry_after_secs: Option<u64>,
    body: String,
) -> ProviderError {
    if status == 429 || body.contains(RESOURCE_EXHAUSTED) {
        return ProviderError::RateLimited { retry_after_secs };
    }
    if status == 401 || status == 403 {
        return ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        );
    }
    ProviderError::ApiError {
        status_code: status,
        message: body.chars().take(500).collect(),
    }
}

/// Read a failed response into a classified error.
pub(crate) async fn read_error(response: reqwest::Response) -> ProviderError {
    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status, body = %body.chars().take(200).collect::<String>(), "Provider returned error");
    error_for_status(status, retry_after, body)
}
