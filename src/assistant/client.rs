use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::error::AssistantError;
use super::types::{MessagesRequest, MessagesResponse};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Anything that can answer a messages request. Lets callers swap the
/// HTTP client for a canned one in tests.
pub trait MessageSender {
    fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> impl Future<Output = Result<MessagesResponse, AssistantError>> + Send;

    /// Model identifier requests should use.
    fn model(&self) -> &str;
}

pub struct AssistantClient {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl AssistantClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, AssistantError> {
        Self::with_base_url(api_key, model, timeout, API_URL.to_string())
    }

    /// Create a client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(
        api_key: String,
        model: String,
        timeout: Duration,
        base_url: String,
    ) -> Result<Self, AssistantError> {
        if api_key.trim().is_empty() {
            return Err(AssistantError::MissingApiKey);
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            model,
            client,
            base_url,
        })
    }
}

impl MessageSender for AssistantClient {
    async fn send_message(
        &self,
        req: &MessagesRequest,
    ) -> Result<MessagesResponse, AssistantError> {
        debug!(model = %req.model, max_tokens = req.max_tokens, "sending messages request");
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(1000);
            return Err(AssistantError::RateLimited {
                retry_after_ms: retry_after,
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AssistantError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<MessagesResponse>().await?)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
