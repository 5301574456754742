//! Local sentence embeddings through `fastembed` (ONNX `all-MiniLM-L6-v2`).

use super::Embedder;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

#[derive(Clone)]
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
}

impl FastEmbedder {
    /// Downloads the model into `cache_dir` on first use.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let model_type = match model_name {
            "all-MiniLM-L6-v2" | "AllMiniLML6V2" => EmbeddingModel::AllMiniLML6V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => anyhow::bail!("config error: unsupported fastembed model: {}", other),
        };
        let mut init_options = InitOptions::new(model_type);
        if let Some(dir) = cache_dir {
            init_options = init_options.with_cache_dir(dir);
        }
        let text_embedding = TextEmbedding::try_new(init_options)
            .map_err(|e| anyhow::anyhow!("Failed to initialize FastEmbed model: {}", e))?;
        tracing::info!(model = model_name, "fastembed model ready");
        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            model_name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut model = self.model.lock().await;
        let embeddings = model
            .embed(vec![text.to_string()], None)
            .map_err(|e| anyhow::anyhow!("Embedding generation failed: {}", e))?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding generated"))
    }

    async fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut model = self.model.lock().await;
        model
            .embed(texts.to_vec(), None)
            .map_err(|e| anyhow::anyhow!("Batch embedding generation failed: {}", e))
    }

    fn name(&self) -> &'static str {
        "fastembed"
    }

    fn model_id(&self) -> String {
        self.model_name.clone()
    }
}

impl std::fmt::Debug for FastEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedder")
            .field("model_name", &self.model_name)
            .finish()
    }
}
