pub mod fake;
#[cfg(feature = "fastembed")]
pub mod fastembed;
pub mod openai;

use async_trait::async_trait;

pub use fake::FakeEmbedder;
pub use openai::OpenAIEmbedder;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str;

    /// Persisted next to stored vectors; a store built with another model is rejected.
    fn model_id(&self) -> String;
}

/// Builds the embedder named by `rag.embedder`.
pub fn from_settings(
    rag: &crate::config::RagSettings,
) -> anyhow::Result<std::sync::Arc<dyn Embedder>> {
    use crate::config::EmbedderKind;
    let model = rag.embedding_model();
    match rag.embedder {
        EmbedderKind::Fake => Ok(std::sync::Arc::new(FakeEmbedder::default())),
        EmbedderKind::Openai => {
            let key = crate::config::openai_api_key().ok_or_else(|| {
                crate::errors::BridgeError::missing_key("OPENAI_API_KEY", "OpenAI embeddings")
            })?;
            Ok(std::sync::Arc::new(OpenAIEmbedder::new(model, key)))
        }
        #[cfg(feature = "fastembed")]
        EmbedderKind::Fastembed => {
            let cache = std::path::Path::new(&rag.db_path)
                .parent()
                .map(|p| p.join("fastembed"));
            Ok(std::sync::Arc::new(fastembed::FastEmbedder::new(&model, cache)?))
        }
        #[cfg(not(feature = "fastembed"))]
        EmbedderKind::Fastembed => anyhow::bail!(
            "config error: rag.embedder=fastembed requires building with the `fastembed` feature"
        ),
    }
}

/// Cosine similarity; 0.0 when either side has zero norm or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())) as f32
}
