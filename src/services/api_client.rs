//! HTTP plumbing shared by the embedding and chat-completion clients.

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::LlmError;
use crate::models::LlmConfig;

/// Error body returned by OpenAI-compatible APIs.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Authenticated client for an OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.trim().to_string(),
        })
    }

    /// Client configured from `[llm]`, using its `api_key`.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let key = config.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        Self::new(config, key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `{base_url}/{path}` and decode the JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "calling LLM API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::RequestError(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), error_message(&text)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

/// Pull `error.message` out of an API error body, or return the body as-is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(
            ApiClient::new(&LlmConfig::default(), "  "),
            Err(LlmError::MissingApiKey)
        ));
        assert!(matches!(
            ApiClient::from_config(&LlmConfig::default()),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn test_base_url_trimming() {
        let config = LlmConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..Default::default()
        };
        let client = ApiClient::new(&config, "sk-test").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(error_message(body), "Incorrect API key provided");
        assert_eq!(error_message("upstream timeout\n"), "upstream timeout");
    }
}
