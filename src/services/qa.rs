//! Retrieval-augmented question answering with a "stuff" prompt.

use tracing::{debug, info};

use crate::error::QaError;
use crate::models::{Answer, MAX_K, MIN_K, ScoredChunk};
use crate::services::vector_store::VectorStore;
use crate::services::{ChatClient, ChatMessage, EmbeddingClient};

const STUFF_SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the user's question. \nIf you don't know the answer, just say that you don't know, don't try to make up an answer.\n----------------\n";

/// Reject `k` outside the range offered by the form.
pub fn validate_k(k: u32) -> Result<u32, QaError> {
    if (MIN_K..=MAX_K).contains(&k) {
        Ok(k)
    } else {
        Err(QaError::InvalidK {
            value: k,
            min: MIN_K,
            max: MAX_K,
        })
    }
}

/// System and user messages with every retrieved chunk stuffed into the system prompt.
pub fn build_stuff_prompt(question: &str, sources: &[ScoredChunk]) -> Vec<ChatMessage> {
    let context = sources
        .iter()
        .map(|s| s.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    vec![
        ChatMessage::system(format!("{STUFF_SYSTEM_TEMPLATE}{context}")),
        ChatMessage::user(question),
    ]
}

/// Retrieve the `k` most similar chunks and answer `question` from them.
pub async fn ask_and_get_answer(
    index: &dyn VectorStore,
    embedder: &EmbeddingClient,
    chat: &ChatClient,
    question: &str,
    k: u32,
) -> Result<Answer, QaError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(QaError::EmptyQuestion);
    }
    let k = validate_k(k)?;

    let query = embedder.embed_query(question).await?;
    let sources = index.search(&query, k as usize).await?;
    debug!(k, retrieved = sources.len(), "retrieved context");

    let messages = build_stuff_prompt(question, &sources);
    let text = chat.complete(&messages).await?;
    info!(k, sources = sources.len(), "question answered");

    Ok(Answer {
        question: question.to_string(),
        text,
        k,
        sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ChatConfig, Chunk, DocumentRecord, EmbeddingConfig, RecordMetadata, VectorEntry,
    };
    use crate::services::MemoryIndex;
    use crate::test_support::{FakeApi, VALID_KEY, letter_histogram};

    fn scored(text: &str) -> ScoredChunk {
        let record = DocumentRecord::new(text.to_string(), RecordMetadata::default());
        ScoredChunk {
            chunk: Chunk::from_record(&record, text.to_string(), 0, 1, 0, 0),
            score: 1.0,
        }
    }

    async fn index_of(texts: &[&str]) -> MemoryIndex {
        let mut index = MemoryIndex::new();
        let entries = texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let record = DocumentRecord::new(text.to_string(), RecordMetadata::default());
                VectorEntry {
                    chunk: Chunk::from_record(&record, text.to_string(), i as u32, 3, 0, 0),
                    vector: letter_histogram(text),
                }
            })
            .collect();
        index.insert(entries).await.unwrap();
        index
    }

    #[test]
    fn test_validate_k() {
        assert_eq!(validate_k(1).unwrap(), 1);
        assert_eq!(validate_k(20).unwrap(), 20);
        assert!(matches!(
            validate_k(0),
            Err(QaError::InvalidK { value: 0, .. })
        ));
        assert!(validate_k(21).is_err());
    }

    #[test]
    fn test_stuff_prompt() {
        let messages = build_stuff_prompt("What?", &[scored("alpha"), scored("beta")]);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].content,
            "Use the following pieces of context to answer the user's question. \nIf you don't know the answer, just say that you don't know, don't try to make up an answer.\n----------------\nalpha\n\nbeta"
        );
        assert_eq!(messages[1], ChatMessage::user("What?"));
    }

    #[tokio::test]
    async fn test_ask_uses_top_k_context() {
        let api = FakeApi::start().await;
        let llm = api.llm_config();
        let embedder =
            EmbeddingClient::with_key(&llm, &EmbeddingConfig::default(), VALID_KEY).unwrap();
        let chat = ChatClient::with_key(&llm, &ChatConfig::default(), VALID_KEY).unwrap();
        let index = index_of(&["aaaa aaa", "bbbb bbb", "zzzz zzz"]).await;

        let answer = ask_and_get_answer(&index, &embedder, &chat, "  aaa?  ", 1)
            .await
            .unwrap();

        assert_eq!(answer.question, "aaa?");
        assert_eq!(answer.text, "answer to: aaa?");
        assert_eq!(answer.sources.len(), 1);
        assert_eq!(answer.sources[0].chunk.content, "aaaa aaa");

        let system = api.chat_requests()[0]["messages"][0]["content"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(system.ends_with("aaaa aaa"));
        assert!(!system.contains("zzzz"));
    }

    #[tokio::test]
    async fn test_empty_question_makes_no_request() {
        let api = FakeApi::start().await;
        let llm = api.llm_config();
        let embedder =
            EmbeddingClient::with_key(&llm, &EmbeddingConfig::default(), VALID_KEY).unwrap();
        let chat = ChatClient::with_key(&llm, &ChatConfig::default(), VALID_KEY).unwrap();
        let index = MemoryIndex::new();

        let err = ask_and_get_answer(&index, &embedder, &chat, "   ", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::EmptyQuestion));
        assert_eq!(api.embedding_calls(), 0);
    }
}
