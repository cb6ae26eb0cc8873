//! Embedding client for the hosted `/embeddings` endpoint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::models::{EmbeddingConfig, LlmConfig};

use super::api_client::ApiClient;

/// Request body for the /embeddings endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Response from the /embeddings endpoint.
#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for generating text embeddings.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    api: ApiClient,
    model: String,
    batch_size: usize,
}

impl EmbeddingClient {
    pub fn new(api: ApiClient, config: &EmbeddingConfig) -> Self {
        Self {
            api,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1) as usize,
        }
    }

    /// Create a client that authenticates with `api_key`.
    pub fn with_key(
        llm: &LlmConfig,
        config: &EmbeddingConfig,
        api_key: &str,
    ) -> Result<Self, LlmError> {
        Ok(Self::new(ApiClient::new(llm, api_key)?, config))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate embeddings for documents (for indexing), one per input, in order.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = self.embed_single_batch(batch).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    /// Generate embedding for a query (for searching).
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let embeddings = self.embed_single_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("empty embedding response".to_string()))
    }

    async fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        debug!(inputs = texts.len(), model = %self.model, "embedding batch");
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let mut response: EmbedResponse = self.api.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(LlmError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeApi, VALID_KEY};

    fn client(api: &FakeApi, batch_size: u32) -> EmbeddingClient {
        let config = EmbeddingConfig {
            batch_size,
            ..Default::default()
        };
        EmbeddingClient::with_key(&api.llm_config(), &config, VALID_KEY).unwrap()
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_input_order() {
        let api = FakeApi::start().await;
        let client = client(&api, 100);
        let texts = vec!["aaaa".to_string(), "bbbb".to_string(), "zz".to_string()];

        let embeddings = client.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 3);
        assert!(embeddings[0][0] > 0.99);
        assert!(embeddings[1][1] > 0.99);
        assert!(embeddings[2][25] > 0.99);
    }

    #[tokio::test]
    async fn test_embed_batch_splits_requests() {
        let api = FakeApi::start().await;
        let client = client(&api, 2);
        let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();

        let embeddings = client.embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings.len(), 5);
        assert_eq!(api.embedding_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let api = FakeApi::start().await;
        let embeddings = client(&api, 100).embed_batch(&[]).await.unwrap();
        assert!(embeddings.is_empty());
        assert_eq!(api.embedding_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_key_is_an_authentication_error() {
        let api = FakeApi::start().await;
        let client = EmbeddingClient::with_key(
            &api.llm_config(),
            &EmbeddingConfig::default(),
            "sk-wrong",
        )
        .unwrap();

        let err = client.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Authentication { status: 401, .. }));
    }
}
