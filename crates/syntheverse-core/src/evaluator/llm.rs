use super::prompt::{build_evaluation_prompt, parse_evaluation, SYSTEM_PROMPT};
use super::DiscoveryEvaluator;
use crate::config::EvaluatorSettings;
use crate::model::{Evaluation, EvaluationSource, FractalEmbedding, Scores};
use crate::providers::llm::{ChatRequest, LlmClient};
use crate::storage::eval_cache::{cache_key, EvalCache};
use async_trait::async_trait;
use std::sync::Arc;

/// Scores discoveries with a chat model in JSON mode.
#[derive(Clone)]
pub struct LlmEvaluator {
    client: Arc<dyn LlmClient>,
    temperature: f32,
    max_tokens: u32,
    cache: Option<EvalCache>,
    refresh: bool,
}

impl LlmEvaluator {
    pub fn new(client: Arc<dyn LlmClient>, settings: &EvaluatorSettings) -> Self {
        Self {
            client,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            cache: None,
            refresh: false,
        }
    }

    pub fn with_cache(mut self, cache: EvalCache, refresh: bool) -> Self {
        self.cache = Some(cache);
        self.refresh = refresh;
        self
    }

    /// Fallback result used whenever the model call or parsing fails.
    pub fn error_fallback(message: &str) -> Evaluation {
        Evaluation::new(
            Scores::new(5000, 5000, 5000),
            format!("Evaluation error: {}", message),
            EvaluationSource::Fallback,
        )
    }

    async fn call(&self, prompt: &str) -> anyhow::Result<Evaluation> {
        let req = ChatRequest {
            system: Some(SYSTEM_PROMPT.to_string()),
            user: prompt.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        };
        let resp = self.client.complete(&req).await?;
        parse_evaluation(&resp.text)
    }
}

#[async_trait]
impl DiscoveryEvaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        content: &str,
        fractal_embedding: Option<&FractalEmbedding>,
        context: Option<&str>,
    ) -> Evaluation {
        let prompt = build_evaluation_prompt(content, fractal_embedding, context);
        let provider = self.client.provider_name();
        let model = self.client.model_name();
        let key = cache_key(provider, &model, self.temperature, &prompt);

        if let (Some(cache), false) = (&self.cache, self.refresh) {
            match cache.get(&key) {
                Ok(Some(mut hit)) => {
                    tracing::debug!(key = %key, "evaluation cache hit");
                    hit.source = EvaluationSource::Cache;
                    return hit;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "evaluation cache read failed"),
            }
        }

        match self.call(&prompt).await {
            Ok(eval) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.put(&key, provider, &model, &eval) {
                        tracing::warn!(error = %e, "evaluation cache write failed");
                    }
                }
                eval
            }
            Err(e) => {
                let msg = format!("{:#}", e);
                tracing::warn!(error = %msg, "error in HHF-AI evaluation, using fallback scores");
                Self::error_fallback(&msg)
            }
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::FakeClient;
    use crate::storage::Store;

    fn settings() -> EvaluatorSettings {
        EvaluatorSettings::default()
    }

    #[tokio::test]
    async fn sends_system_prompt_in_json_mode() {
        let client = Arc::new(FakeClient::new(vec![
            r#"{"coherence": 9200, "density": 8500, "novelty": 9500, "analysis": "strong"}"#.into(),
        ]));
        let eval = LlmEvaluator::new(client.clone(), &settings());
        let e = eval.evaluate("content", None, None).await;
        assert_eq!(e.scores.pod_score(), 7429);
        assert_eq!(e.source, EvaluationSource::Llm);

        let req = &client.requests()[0];
        assert!(req.json_mode);
        assert_eq!(req.system.as_deref(), Some(SYSTEM_PROMPT));
        assert!((req.temperature - 0.3).abs() < f32::EPSILON);
        assert!(req.user.contains("DISCOVERY CONTENT:\ncontent"));
    }

    #[tokio::test]
    async fn request_failure_yields_fallback() {
        let client = Arc::new(FakeClient::new(vec![]));
        client.push_error("provider returned 503");
        let e = LlmEvaluator::new(client, &settings())
            .evaluate("content", None, None)
            .await;
        assert_eq!(e.scores, Scores::new(5000, 5000, 5000));
        assert_eq!(e.analysis, "Evaluation error: provider returned 503");
        assert_eq!(e.source, EvaluationSource::Fallback);
    }

    #[tokio::test]
    async fn bad_json_yields_fallback() {
        let client = Arc::new(FakeClient::new(vec!["I refuse".into()]));
        let e = LlmEvaluator::new(client, &settings())
            .evaluate("content", None, None)
            .await;
        assert_eq!(e.source, EvaluationSource::Fallback);
        assert!(e.analysis.starts_with("Evaluation error: "));
    }

    #[tokio::test]
    async fn null_score_yields_fallback() {
        let client = Arc::new(FakeClient::new(vec![
            r#"{"coherence": null, "density": 9000, "novelty": 9000, "analysis": "a"}"#.into(),
        ]));
        let e = LlmEvaluator::new(client, &settings())
            .evaluate("content", None, None)
            .await;
        assert_eq!(e.scores, Scores::new(5000, 5000, 5000));
        assert_eq!(e.source, EvaluationSource::Fallback);
    }

    #[tokio::test]
    async fn cache_hits_skip_the_model_and_fallbacks_are_not_cached() {
        let cache = EvalCache::new(Store::memory().unwrap());
        let client = Arc::new(FakeClient::new(vec![
            "garbage".into(),
            r#"{"coherence": 7000, "density": 7000, "novelty": 7000, "analysis": "a"}"#.into(),
            r#"{"coherence": 1, "density": 1, "novelty": 1, "analysis": "refreshed"}"#.into(),
        ]));
        let eval = LlmEvaluator::new(client.clone(), &settings()).with_cache(cache.clone(), false);

        assert_eq!(eval.evaluate("x", None, None).await.source, EvaluationSource::Fallback);
        let first = eval.evaluate("x", None, None).await;
        assert_eq!(first.source, EvaluationSource::Llm);
        let second = eval.evaluate("x", None, None).await;
        assert_eq!(second.source, EvaluationSource::Cache);
        assert_eq!(second.scores, first.scores);
        assert_eq!(client.requests().len(), 2);

        let refreshing = LlmEvaluator::new(client.clone(), &settings()).with_cache(cache, true);
        let third = refreshing.evaluate("x", None, None).await;
        assert_eq!(third.analysis, "refreshed");
        assert_eq!(client.requests().len(), 3);
    }
}
