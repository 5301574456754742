//! HHF-AI discovery evaluation.
//!
//! [`LlmEvaluator`] asks a chat model for coherence, density and novelty
//! scores; [`HeuristicEvaluator`] is the offline stand-in. Both return an
//! [`Evaluation`] and never fail: model errors turn into a fixed fallback.

pub mod context;
pub mod heuristic;
pub mod llm;
pub mod prompt;

use crate::config::{EvaluatorProvider, EvaluatorSettings};
use crate::model::{Evaluation, FractalEmbedding};
use crate::providers::llm::OpenAIClient;
use crate::storage::EvalCache;
use async_trait::async_trait;
use std::sync::Arc;

pub use context::RagContextEvaluator;
pub use heuristic::HeuristicEvaluator;
pub use llm::LlmEvaluator;
pub use prompt::{build_evaluation_prompt, parse_evaluation, SYSTEM_PROMPT};

#[async_trait]
pub trait DiscoveryEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        content: &str,
        fractal_embedding: Option<&FractalEmbedding>,
        context: Option<&str>,
    ) -> Evaluation;

    fn name(&self) -> &'static str;
}

/// Evaluates `contents` in order; item `i` gets `embeddings[i]` when present.
pub async fn evaluate_batch(
    evaluator: &dyn DiscoveryEvaluator,
    contents: &[String],
    embeddings: Option<&[FractalEmbedding]>,
) -> Vec<Evaluation> {
    let mut out = Vec::with_capacity(contents.len());
    for (i, content) in contents.iter().enumerate() {
        let embedding = embeddings.and_then(|e| e.get(i));
        out.push(evaluator.evaluate(content, embedding, None).await);
    }
    out
}

/// Heuristic when `use_mock`, when the config asks for it, or when no API key
/// is available; otherwise the OpenAI-backed evaluator.
pub fn select_evaluator(
    use_mock: bool,
    api_key: Option<String>,
    settings: &EvaluatorSettings,
    cache: Option<(EvalCache, bool)>,
) -> Arc<dyn DiscoveryEvaluator> {
    let key = api_key.filter(|k| !k.trim().is_empty());
    match key {
        Some(key) if !use_mock && settings.provider == EvaluatorProvider::Openai => {
            let client = Arc::new(OpenAIClient::new(settings.model.clone(), key));
            let mut eval = LlmEvaluator::new(client, settings);
            if let Some((cache, refresh)) = cache {
                eval = eval.with_cache(cache, refresh);
            }
            Arc::new(eval)
        }
        _ => {
            if !use_mock && settings.provider == EvaluatorProvider::Openai {
                tracing::warn!(
                    "OPENAI_API_KEY not set; using heuristic HHF-AI evaluator (set OPENAI_API_KEY for real evaluation)"
                );
            } else {
                tracing::info!("using heuristic HHF-AI evaluator");
            }
            Arc::new(HeuristicEvaluator)
        }
    }
}
