//! Outbound HTTP plumbing shared by the embedding, chat and Pinecone clients.

use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use std::time::Duration;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a JSON request built by `build`, retrying rate limits, server
/// errors and network failures up to `max_retries` times.
///
/// Backoff doubles from one second and is capped at 32 seconds. Other 4xx
/// responses fail immediately. A successful empty body yields `Value::Null`.
pub(crate) async fn post_with_retry<F>(service: &str, max_retries: u32, build: F) -> Result<Value>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(service, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();
                let body_text = response.text().await.unwrap_or_default();

                if status.is_success() {
                    if body_text.trim().is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_str(&body_text)
                        .map_err(|e| anyhow!("{} returned invalid JSON: {}", service, e));
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(service, %status, "transient API error");
                    last_err = Some(anyhow!("{} API error {}: {}", service, status, body_text));
                    continue;
                }

                bail!("{} API error {}: {}", service, status, body_text);
            }
            Err(e) => {
                tracing::warn!(service, error = %e, "request failed");
                last_err = Some(anyhow!("{} connection error: {}", service, e));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("{} request failed after retries", service)))
}
