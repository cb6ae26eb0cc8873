//! Embedding cost estimation.

use std::path::Path;
use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;
use tokenizers::Tokenizer;
use tracing::debug;

use crate::error::ConfigError;
use crate::models::{Chunk, CostConfig, CostEstimate, TokenEncoding};

/// Counts tokens the way the embedding model would see them.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Estimate the number of tokens in a text.
/// Uses a simple heuristic: ~4 characters per token on average.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Length-based counter, selected with `encoding = "heuristic"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Exact counts from a HuggingFace `tokenizer.json`.
pub struct HfTokenCounter {
    tokenizer: Tokenizer,
}

impl HfTokenCounter {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| ConfigError::TokenizerError(format!("{}: {}", path.display(), e)))?;
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HfTokenCounter {
    fn count(&self, text: &str) -> usize {
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            // Fall back rather than under-report.
            Err(_) => estimate_tokens(text),
        }
    }
}

/// `cl100k_base` BPE counts, matching `text-embedding-ada-002`.
pub struct TiktokenCounter {
    bpe: &'static CoreBPE,
}

impl TiktokenCounter {
    pub fn cl100k() -> Result<Self, ConfigError> {
        static CL100K: OnceLock<CoreBPE> = OnceLock::new();

        let bpe = match CL100K.get() {
            Some(bpe) => bpe,
            None => {
                let loaded = tiktoken_rs::cl100k_base()
                    .map_err(|e| ConfigError::TokenizerError(format!("cl100k_base: {}", e)))?;
                CL100K.get_or_init(|| loaded)
            }
        };
        Ok(Self { bpe })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

pub struct CostEstimator {
    counter: Box<dyn TokenCounter>,
    price_per_1k: f64,
    model: String,
}

impl CostEstimator {
    pub fn new(counter: Box<dyn TokenCounter>, price_per_1k: f64, model: impl Into<String>) -> Self {
        Self {
            counter,
            price_per_1k,
            model: model.into(),
        }
    }

    /// Build from `[cost]`. A tokenizer file wins over `encoding`.
    pub fn from_config(config: &CostConfig) -> Result<Self, ConfigError> {
        let counter: Box<dyn TokenCounter> = match (&config.tokenizer_path, config.encoding) {
            (Some(path), _) => Box::new(HfTokenCounter::from_file(path)?),
            (None, TokenEncoding::Cl100kBase) => Box::new(TiktokenCounter::cl100k()?),
            (None, TokenEncoding::Heuristic) => Box::new(HeuristicCounter),
        };
        Ok(Self::new(counter, config.price_per_1k, config.model.clone()))
    }

    pub fn estimate(&self, chunks: &[Chunk]) -> CostEstimate {
        self.estimate_texts(chunks.iter().map(|c| c.content.as_str()))
    }

    pub fn estimate_texts<'a>(&self, texts: impl IntoIterator<Item = &'a str>) -> CostEstimate {
        let total_tokens: usize = texts.into_iter().map(|t| self.counter.count(t)).sum();
        let cost_usd = total_tokens as f64 / 1000.0 * self.price_per_1k;
        debug!(total_tokens, cost_usd, model = %self.model, "estimated embedding cost");
        CostEstimate {
            total_tokens,
            cost_usd,
            model: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn estimator() -> CostEstimator {
        CostEstimator::from_config(&CostConfig::default()).unwrap()
    }

    fn heuristic() -> CostEstimator {
        CostEstimator::from_config(&CostConfig {
            encoding: TokenEncoding::Heuristic,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens("1234"), 1);
        assert_eq!(estimate_tokens("12345678"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_default_counts_cl100k_tokens() {
        let estimate = estimator().estimate_texts(["hello world hello world"]);
        assert_eq!(estimate.total_tokens, 4);
        assert_eq!(TiktokenCounter::cl100k().unwrap().count(""), 0);
    }

    #[test]
    fn test_cost_formula() {
        let text = "a".repeat(4000);
        let estimate = heuristic().estimate_texts([text.as_str()]);
        assert_eq!(estimate.total_tokens, 1000);
        assert!((estimate.cost_usd - 0.0004).abs() < 1e-12);
        assert_eq!(estimate.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_cost_is_linear() {
        let estimator = estimator();
        let text = "word ".repeat(500);
        let single = estimator.estimate_texts([text.as_str()]);
        let double = estimator.estimate_texts([text.as_str(), text.as_str()]);
        assert_eq!(double.total_tokens, single.total_tokens * 2);
        assert!((double.cost_usd - single.cost_usd * 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input_costs_nothing() {
        let estimate = estimator().estimate(&[]);
        assert_eq!(estimate.total_tokens, 0);
        assert_eq!(estimate.cost_usd, 0.0);
    }

    #[test]
    fn test_missing_tokenizer_file() {
        let config = CostConfig {
            tokenizer_path: Some(PathBuf::from("/nonexistent/tokenizer.json")),
            ..Default::default()
        };
        assert!(matches!(
            CostEstimator::from_config(&config),
            Err(ConfigError::TokenizerError(_))
        ));
    }
}
