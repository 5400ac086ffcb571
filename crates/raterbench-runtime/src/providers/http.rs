//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::ProviderError;

/// Error body shape shared by all three APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Send a prepared request and decode a successful JSON body.
///
/// 429 becomes [`ProviderError::RateLimited`], 401/403 become
/// [`ProviderError::AuthError`], every other non-success status becomes
/// [`ProviderError::ApiError`] carrying the API's own message when present.
pub(super) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    timeout: Duration,
) -> Result<T, ProviderError> {
    let response = request.timeout(timeout).send().await.map_err(|e| {
        if e.is_timeout() {
            ProviderError::Timeout(timeout)
        } else {
            ProviderError::HttpError(e.to_string())
        }
    })?;

    let status = response.status();

    if status == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        return Err(ProviderError::RateLimited { retry_after });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthError);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);

        return Err(ProviderError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ProviderError::ParseError(e.to_string()))
}
