use crate::error::IntegrationError;
use std::time::Duration;

const USER_AGENT: &str = concat!("daily-tracker/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the REST integrations.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, IntegrationError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Turn a non-success response into [`IntegrationError::Api`].
pub(crate) async fn expect_status(
    service: &'static str,
    response: reqwest::Response,
    expected: reqwest::StatusCode,
) -> Result<reqwest::Response, IntegrationError> {
    if response.status() == expected {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(IntegrationError::Api { service, status, body })
}
