//! Shared HTTP utilities for talking to provider APIs.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::DeployError;

/// Default timeout for provider requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every request. GitHub rejects requests without one.
const USER_AGENT: &str = concat!("liftoff/", env!("CARGO_PKG_VERSION"));

/// Create an HTTP client configured for provider API requests.
pub fn create_client(timeout: Duration) -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to create HTTP client")
}

/// Join an API base URL and a path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a provider response into a deserialized body or a short [`DeployError`].
///
/// 401/403 mean the token was rejected and map to `Unauthenticated`; any other
/// non-success status is reported as a `NetworkError`. The response body is
/// only logged, never put into the error message.
pub async fn parse_response<T: DeserializeOwned>(
    response: Response,
    action: &str,
    provider: &str,
) -> Result<T, DeployError> {
    let status = response.status();

    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, provider, action, body = %body, "Provider returned an error response");

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DeployError::unauthenticated(format!(
            "{provider} rejected the stored credential while trying to {action}"
        )),
        _ => DeployError::network(format!(
            "{provider} returned {} while trying to {action}",
            status.as_u16()
        )),
    })
}
