//! Research-paper retrieval: chunk, embed, persist, and rank by cosine distance.

pub mod chunk;
pub mod loader;
pub mod verify;

use crate::config::RagSettings;
use crate::model::{ChunkMetadata, ChunkRecord, PaperSummary, RetrievedChunk};
use crate::providers::embedder::{cosine_similarity, Embedder};
use crate::storage::Store;
use anyhow::Context;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use crate::storage::chunks::MetadataFilter;
pub use chunk::chunk_text;
pub use verify::Verification;

/// Queries `rag init` runs to smoke-test retrieval.
pub const SAMPLE_QUERIES: [&str; 4] = [
    "hydrogen holographic fractal",
    "proof of discovery protocol",
    "fractal grammar",
    "octave harmonics",
];

fn open_store(settings: &RagSettings) -> anyhow::Result<Store> {
    Store::open(Path::new(&settings.db_path))
        .with_context(|| format!("failed to open RAG store at {}", settings.db_path))
}

/// Compares the papers dir with an existing store. No embedder is built, so
/// this works without embedding credentials.
pub fn verify_store(settings: &RagSettings) -> anyhow::Result<Verification> {
    let summary = open_store(settings)?.paper_summary()?;
    Ok(verify::verify(Path::new(&settings.papers_dir), &summary))
}

pub struct RagSystem {
    papers_dir: PathBuf,
    store: Store,
    embedder: Arc<dyn Embedder>,
    chunk_size: usize,
    chunk_overlap: usize,
    loaded: HashSet<String>,
}

impl RagSystem {
    /// Fails when `store` was built with a different embedding model.
    pub fn new(
        papers_dir: impl Into<PathBuf>,
        store: Store,
        embedder: Arc<dyn Embedder>,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> anyhow::Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            anyhow::bail!(
                "config error: chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap,
                chunk_size
            );
        }
        store.ensure_embedding_model(&embedder.model_id())?;
        Ok(Self {
            papers_dir: papers_dir.into(),
            store,
            embedder,
            chunk_size,
            chunk_overlap,
            loaded: HashSet::new(),
        })
    }

    pub fn from_settings(settings: &RagSettings) -> anyhow::Result<Self> {
        let store = open_store(settings)?;
        let embedder = crate::providers::embedder::from_settings(settings)?;
        Self::new(
            &settings.papers_dir,
            store,
            embedder,
            settings.chunk_size,
            settings.chunk_overlap,
        )
    }

    pub fn papers_dir(&self) -> &Path {
        &self.papers_dir
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Loads every paper in the papers dir; returns how many were (re)loaded
    /// by this call. Papers already in the store are skipped unless `force_reload`.
    pub async fn load_all_papers(&mut self, force_reload: bool) -> anyhow::Result<usize> {
        if !self.papers_dir.is_dir() {
            tracing::warn!(dir = %self.papers_dir.display(), "papers directory not found");
            return Ok(0);
        }
        let files = loader::discover_papers(&self.papers_dir);
        if files.is_empty() {
            tracing::warn!(dir = %self.papers_dir.display(), "no paper files found");
            return Ok(0);
        }

        let mut loaded_count = 0;
        for path in files {
            let paper_id = loader::paper_id(&path);
            if !force_reload
                && (self.loaded.contains(&paper_id) || self.store.has_paper(&paper_id)?)
            {
                tracing::debug!(paper = %paper_id, "already loaded, skipping");
                self.loaded.insert(paper_id);
                continue;
            }

            let filename = loader::paper_filename(&path);
            tracing::info!(file = %filename, "loading paper");
            let Some(content) = loader::load_paper(&path) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }

            let records = self.embed_paper(&paper_id, &filename, &content).await?;
            self.store.replace_paper_chunks(&paper_id, &records)?;
            tracing::info!(file = %filename, chunks = records.len(), "loaded chunks");
            self.loaded.insert(paper_id);
            loaded_count += 1;
        }

        tracing::info!(
            papers = loaded_count,
            total_chunks = self.store.chunk_count()?,
            "loaded papers into vector store"
        );
        Ok(loaded_count)
    }

    async fn embed_paper(
        &self,
        paper_id: &str,
        filename: &str,
        content: &str,
    ) -> anyhow::Result<Vec<ChunkRecord>> {
        let chunks = chunk_text(content, self.chunk_size, self.chunk_overlap);
        let embeddings = self
            .embedder
            .embed_batch(&chunks)
            .await
            .with_context(|| format!("failed to embed {}", filename))?;
        if embeddings.len() != chunks.len() {
            anyhow::bail!(
                "embedder returned {} vectors for {} chunks of {}",
                embeddings.len(),
                chunks.len(),
                filename
            );
        }
        let total = chunks.len() as u32;
        Ok(chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, embedding))| ChunkRecord {
                chunk_id: format!("{}_chunk_{}", paper_id, i),
                metadata: ChunkMetadata {
                    paper_id: paper_id.to_string(),
                    paper_filename: filename.to_string(),
                    chunk_index: i as u32,
                    total_chunks: total,
                },
                text,
                embedding,
            })
            .collect())
    }

    /// Top `n_results` chunks by ascending cosine distance (`1 - cos`).
    pub async fn retrieve_context(
        &self,
        query: &str,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> anyhow::Result<Vec<RetrievedChunk>> {
        if self.store.chunk_count()? == 0 {
            tracing::warn!("vector store is empty; run `rag init` first");
            return Ok(Vec::new());
        }
        if n_results == 0 {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed(query).await?;
        let candidates = self.store.load_chunks(filter.unwrap_or(&MetadataFilter::default()))?;

        let mut scored: Vec<(f32, ChunkRecord)> = candidates
            .into_iter()
            .map(|c| (1.0 - cosine_similarity(&query_vec, &c.embedding), c))
            .collect();
        scored.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| a.1.chunk_id.cmp(&b.1.chunk_id))
        });
        scored.truncate(n_results);

        Ok(scored
            .into_iter()
            .map(|(distance, c)| RetrievedChunk {
                text: c.text,
                metadata: c.metadata,
                distance: Some(distance),
            })
            .collect())
    }

    /// Joins the top chunks for `query` into an evaluator context block;
    /// `None` when nothing was retrieved.
    pub async fn context_for(&self, query: &str, n_results: usize) -> anyhow::Result<Option<String>> {
        let chunks = self.retrieve_context(query, n_results, None).await?;
        if chunks.is_empty() {
            return Ok(None);
        }
        let block = chunks
            .iter()
            .map(|c| format!("[{}]\n{}", c.metadata.paper_filename, c.text))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(block))
    }

    pub fn paper_summary(&self) -> anyhow::Result<PaperSummary> {
        Ok(self.store.paper_summary()?)
    }

    pub fn verify(&self) -> anyhow::Result<Verification> {
        Ok(verify::verify(&self.papers_dir, &self.paper_summary()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::embedder::FakeEmbedder;

    fn system(dir: &Path, store: Store, size: usize, overlap: usize) -> RagSystem {
        RagSystem::new(dir, store, Arc::new(FakeEmbedder::default()), size, overlap).unwrap()
    }

    #[test]
    fn rejects_non_advancing_overlap() {
        let err = RagSystem::new(
            "docs",
            Store::memory().unwrap(),
            Arc::new(FakeEmbedder::default()),
            10,
            10,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[tokio::test]
    async fn missing_dir_and_empty_store_are_soft() {
        let tmp = tempfile::tempdir().unwrap();
        let mut rag = system(&tmp.path().join("nope"), Store::memory().unwrap(), 100, 10);
        assert_eq!(rag.load_all_papers(false).await.unwrap(), 0);
        assert!(rag.retrieve_context("fractal", 3, None).await.unwrap().is_empty());
        assert_eq!(rag.paper_summary().unwrap(), PaperSummary::default());
        assert!(rag.context_for("fractal", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chunk_ids_follow_paper_id() {
        let tmp = tempfile::tempdir().unwrap();
        let words = (0..25).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        std::fs::write(tmp.path().join("paper.md"), words).unwrap();
        let mut rag = system(tmp.path(), Store::memory().unwrap(), 10, 2);
        assert_eq!(rag.load_all_papers(false).await.unwrap(), 1);

        let chunks = rag.store().load_chunks(&MetadataFilter::default()).unwrap();
        // starts at 0, 8, 16, 24
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].chunk_id, "paper_chunk_0");
        assert_eq!(chunks[3].metadata.total_chunks, 4);
        assert_eq!(chunks[3].metadata.paper_filename, "paper.md");
    }

    #[test]
    fn verify_store_needs_no_embedder() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.md"), "hydrogen").unwrap();
        let settings = RagSettings {
            papers_dir: tmp.path().display().to_string(),
            db_path: tmp.path().join("db/rag.sqlite3").display().to_string(),
            embedder: crate::config::EmbedderKind::Openai,
            ..Default::default()
        };
        let v = verify_store(&settings).unwrap();
        assert!(!v.is_ok());
        assert!(v.missing.contains("a.md"));
        assert_eq!(v.total_chunks, 0);
    }
}
