use super::DiscoveryEvaluator;
use crate::model::{Evaluation, FractalEmbedding};
use crate::rag::RagSystem;
use async_trait::async_trait;
use std::sync::Arc;

/// Adds the top retrieved paper chunks to the evaluation context before
/// delegating. Retrieval failures are logged and the inner evaluator runs
/// with whatever context the caller gave.
pub struct RagContextEvaluator {
    inner: Arc<dyn DiscoveryEvaluator>,
    rag: Arc<RagSystem>,
    n_results: usize,
}

impl RagContextEvaluator {
    pub fn new(inner: Arc<dyn DiscoveryEvaluator>, rag: Arc<RagSystem>, n_results: usize) -> Self {
        Self {
            inner,
            rag,
            n_results,
        }
    }
}

#[async_trait]
impl DiscoveryEvaluator for RagContextEvaluator {
    async fn evaluate(
        &self,
        content: &str,
        fractal_embedding: Option<&FractalEmbedding>,
        context: Option<&str>,
    ) -> Evaluation {
        let retrieved = match self.rag.context_for(content, self.n_results).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "RAG context retrieval failed");
                None
            }
        };
        let merged = match (context.filter(|c| !c.is_empty()), retrieved) {
            (Some(given), Some(r)) => Some(format!("{}\n\n{}", given, r)),
            (Some(given), None) => Some(given.to_string()),
            (None, r) => r,
        };
        self.inner
            .evaluate(content, fractal_embedding, merged.as_deref())
            .await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluatorSettings;
    use crate::evaluator::LlmEvaluator;
    use crate::providers::embedder::FakeEmbedder;
    use crate::providers::llm::FakeClient;
    use crate::storage::Store;

    #[tokio::test]
    async fn retrieved_chunks_reach_the_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("hhf.md"),
            "hydrogen holographic fractal sandbox",
        )
        .unwrap();
        let mut rag = RagSystem::new(
            tmp.path(),
            Store::memory().unwrap(),
            Arc::new(FakeEmbedder::default()),
            100,
            10,
        )
        .unwrap();
        rag.load_all_papers(false).await.unwrap();

        let client = Arc::new(FakeClient::new(vec![
            r#"{"coherence": 1, "density": 2, "novelty": 3, "analysis": ""}"#.into(),
        ]));
        let inner = Arc::new(LlmEvaluator::new(client.clone(), &EvaluatorSettings::default()));
        let eval = RagContextEvaluator::new(inner, Arc::new(rag), 2);
        eval.evaluate("a fractal idea", None, Some("caller note")).await;

        let user = &client.requests()[0].user;
        assert!(user.contains("CONTEXT:\ncaller note\n\n[hhf.md]\nhydrogen holographic fractal sandbox"));
    }
}
