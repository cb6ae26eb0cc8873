//! API key validation with a one-token chat completion.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::models::{ChatConfig, LlmConfig};

use super::chat::{ChatClient, ChatMessage};

const PROBE_PROMPT: &str = "test";

/// Result of checking a credential against the chat API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum KeyCheckOutcome {
    Valid,
    InvalidKey,
    AuthenticationError(String),
    InvalidRequest(String),
    Other(String),
}

impl KeyCheckOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, KeyCheckOutcome::Valid)
    }

    /// Message shown to the user.
    pub fn message(&self) -> String {
        match self {
            KeyCheckOutcome::Valid => "Valid API Key!".to_string(),
            KeyCheckOutcome::InvalidKey => {
                "Invalid API Key! Please check and try again.".to_string()
            }
            KeyCheckOutcome::AuthenticationError(msg) => format!("Authentication error: {msg}"),
            KeyCheckOutcome::InvalidRequest(msg) => format!("Invalid request: {msg}"),
            KeyCheckOutcome::Other(msg) => format!("An error occurred: {msg}"),
        }
    }

    fn from_error(err: LlmError) -> Self {
        match err {
            LlmError::Authentication { status: 401, .. } => KeyCheckOutcome::InvalidKey,
            LlmError::Authentication { message, .. } => KeyCheckOutcome::AuthenticationError(message),
            LlmError::InvalidRequest { message, .. } => KeyCheckOutcome::InvalidRequest(message),
            other => KeyCheckOutcome::Other(other.to_string()),
        }
    }
}

/// Issue a minimal completion with `api_key` and classify the result.
pub async fn check_api_key(llm: &LlmConfig, chat: &ChatConfig, api_key: &str) -> KeyCheckOutcome {
    let client = match ChatClient::with_key(llm, chat, api_key) {
        Ok(client) => client.with_max_tokens(1),
        Err(LlmError::MissingApiKey) => return KeyCheckOutcome::InvalidKey,
        Err(e) => return KeyCheckOutcome::Other(e.to_string()),
    };

    let outcome = match client.complete(&[ChatMessage::user(PROBE_PROMPT)]).await {
        Ok(_) => KeyCheckOutcome::Valid,
        Err(e) => KeyCheckOutcome::from_error(e),
    };

    if outcome.is_valid() {
        info!("API key accepted");
    } else {
        warn!(message = %outcome.message(), "API key rejected");
    }
    outcome
}
