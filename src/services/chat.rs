//! Chat-completion client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::models::{ChatConfig, LlmConfig};

use super::api_client::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    api: ApiClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ChatClient {
    pub fn new(api: ApiClient, config: &ChatConfig) -> Self {
        Self {
            api,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn with_key(llm: &LlmConfig, config: &ChatConfig, api_key: &str) -> Result<Self, LlmError> {
        Ok(Self::new(ApiClient::new(llm, api_key)?, config))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Cap the completion length, overriding `[chat] max_tokens`.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Send `messages` and return the first choice's content.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        debug!(messages = messages.len(), model = %self.model, "chat completion");
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response: ChatResponse = self.api.post_json("chat/completions", &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| LlmError::InvalidResponse("no choices in completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, VALID_KEY};

    #[test]
    fn test_message_serialization() {
        let json = serde_json::to_value(ChatMessage::system("be brief")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let api = FakeApi::start().await;
        let client =
            ChatClient::with_key(&api.llm_config(), &ChatConfig::default(), VALID_KEY).unwrap();

        let answer = client
            .complete(&[ChatMessage::system("context"), ChatMessage::user("why?")])
            .await
            .unwrap();
        assert_eq!(answer, "answer to: why?");

        let requests = api.chat_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0]["model"], "gpt-3.5-turbo");
        assert_eq!(requests[0]["temperature"], 1.0);
        assert!(requests[0].get("max_tokens").is_none());
    }

    #[tokio::test]
    async fn test_max_tokens_is_sent_when_set() {
        let api = FakeApi::start().await;
        let client = ChatClient::with_key(&api.llm_config(), &ChatConfig::default(), VALID_KEY)
            .unwrap()
            .with_max_tokens(1);

        client.complete(&[ChatMessage::user("test")]).await.unwrap();
        assert_eq!(api.chat_requests()[0]["max_tokens"], 1);
    }
}
