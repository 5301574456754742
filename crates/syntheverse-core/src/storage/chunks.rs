use super::schema::{self, META_EMBEDDING_DIM};
use super::{StorageError, StorageResult, Store};
use crate::model::{ChunkMetadata, ChunkRecord, PaperEntry, PaperSummary};
use rusqlite::params;

/// Exact-match filter on chunk metadata. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub paper_id: Option<String>,
    pub paper_filename: Option<String>,
}

impl MetadataFilter {
    pub fn paper(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: Some(paper_id.into()),
            paper_filename: None,
        }
    }

    pub fn matches(&self, meta: &ChunkMetadata) -> bool {
        self.paper_id.as_ref().is_none_or(|p| *p == meta.paper_id)
            && self
                .paper_filename
                .as_ref()
                .is_none_or(|f| *f == meta.paper_filename)
    }
}

pub(crate) fn encode_embedding(v: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(v.len() * 4);
    for x in v {
        out.extend_from_slice(&x.to_le_bytes());
    }
    out
}

pub(crate) fn decode_embedding(chunk_id: &str, blob: &[u8]) -> StorageResult<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(StorageError::CorruptBlob {
            chunk_id: chunk_id.to_string(),
            len: blob.len(),
        });
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

impl Store {
    /// Deletes every chunk of `paper_id`, then inserts `records`, in one transaction.
    pub fn replace_paper_chunks(&self, paper_id: &str, records: &[ChunkRecord]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        if let Some(first) = records.first() {
            let dim = first.embedding.len();
            match schema::get_meta(&conn, META_EMBEDDING_DIM)? {
                Some(stored) => {
                    let stored: usize =
                        stored.parse().map_err(|_| StorageError::CorruptMeta {
                            key: META_EMBEDDING_DIM.to_string(),
                            value: stored.clone(),
                        })?;
                    if stored != dim {
                        return Err(StorageError::DimensionMismatch {
                            stored,
                            current: dim,
                        });
                    }
                }
                None => schema::set_meta(&conn, META_EMBEDDING_DIM, &dim.to_string())?,
            }
            if let Some(bad) = records.iter().find(|r| r.embedding.len() != dim) {
                return Err(StorageError::DimensionMismatch {
                    stored: dim,
                    current: bad.embedding.len(),
                });
            }
        }

        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE paper_id = ?1", params![paper_id])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks(chunk_id, paper_id, paper_filename, chunk_index, total_chunks, text, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for r in records {
                stmt.execute(params![
                    r.chunk_id,
                    r.metadata.paper_id,
                    r.metadata.paper_filename,
                    r.metadata.chunk_index,
                    r.metadata.total_chunks,
                    r.text,
                    encode_embedding(&r.embedding),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_paper(&self, paper_id: &str) -> StorageResult<usize> {
        let conn = self.lock()?;
        Ok(conn.execute("DELETE FROM chunks WHERE paper_id = ?1", params![paper_id])?)
    }

    pub fn chunk_count(&self) -> StorageResult<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn has_paper(&self, paper_id: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM chunks WHERE paper_id = ?1",
            params![paper_id],
            |r| r.get(0),
        )?;
        Ok(n > 0)
    }

    /// All chunks matching `filter`, ordered by paper then chunk index.
    pub fn load_chunks(&self, filter: &MetadataFilter) -> StorageResult<Vec<ChunkRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT chunk_id, paper_id, paper_filename, chunk_index, total_chunks, text, embedding
             FROM chunks
             ORDER BY paper_id ASC, chunk_index ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                ChunkMetadata {
                    paper_id: row.get(1)?,
                    paper_filename: row.get(2)?,
                    chunk_index: row.get(3)?,
                    total_chunks: row.get(4)?,
                },
                row.get::<_, String>(5)?,
                row.get::<_, Vec<u8>>(6)?,
            ))
        })?;

        let mut out = Vec::new();
        for r in rows {
            let (chunk_id, metadata, text, blob) = r?;
            if !filter.matches(&metadata) {
                continue;
            }
            let embedding = decode_embedding(&chunk_id, &blob)?;
            out.push(ChunkRecord {
                chunk_id,
                metadata,
                text,
                embedding,
            });
        }
        Ok(out)
    }

    /// Chunk counts grouped by paper, sorted by paper id.
    pub fn paper_summary(&self) -> StorageResult<PaperSummary> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT paper_id, MAX(paper_filename), COUNT(*)
             FROM chunks
             GROUP BY paper_id
             ORDER BY paper_id ASC",
        )?;
        let papers = stmt
            .query_map([], |row| {
                Ok(PaperEntry {
                    paper_id: row.get(0)?,
                    filename: row.get(1)?,
                    chunks: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PaperSummary {
            total_papers: papers.len(),
            total_chunks: papers.iter().map(|p| p.chunks).sum(),
            papers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(paper: &str, idx: u32, total: u32, emb: Vec<f32>) -> ChunkRecord {
        ChunkRecord {
            chunk_id: format!("{}_chunk_{}", paper, idx),
            metadata: ChunkMetadata {
                paper_id: paper.to_string(),
                paper_filename: format!("{}.md", paper),
                chunk_index: idx,
                total_chunks: total,
            },
            text: format!("text {} {}", paper, idx),
            embedding: emb,
        }
    }

    #[test]
    fn blob_round_trip_is_little_endian() {
        let blob = encode_embedding(&[1.0, -0.5]);
        assert_eq!(&blob[..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_embedding("c", &blob).unwrap(), vec![1.0, -0.5]);
        assert!(matches!(
            decode_embedding("c", &[0, 1, 2]),
            Err(StorageError::CorruptBlob { len: 3, .. })
        ));
    }

    #[test]
    fn replace_removes_previous_chunks_of_paper() {
        let store = Store::memory().unwrap();
        store
            .replace_paper_chunks(
                "a",
                &[record("a", 0, 2, vec![1.0, 0.0]), record("a", 1, 2, vec![0.0, 1.0])],
            )
            .unwrap();
        store
            .replace_paper_chunks("b", &[record("b", 0, 1, vec![1.0, 1.0])])
            .unwrap();
        store
            .replace_paper_chunks("a", &[record("a", 0, 1, vec![0.5, 0.5])])
            .unwrap();

        assert_eq!(store.chunk_count().unwrap(), 2);
        let summary = store.paper_summary().unwrap();
        assert_eq!(summary.total_papers, 2);
        assert_eq!(summary.papers[0].chunks, 1);
        assert_eq!(summary.papers[0].filename, "a.md");
        assert!(store.has_paper("b").unwrap());
        assert_eq!(store.delete_paper("b").unwrap(), 1);
        assert!(!store.has_paper("b").unwrap());
    }

    #[test]
    fn dimension_is_pinned_by_first_insert() {
        let store = Store::memory().unwrap();
        store
            .replace_paper_chunks("a", &[record("a", 0, 1, vec![1.0, 0.0])])
            .unwrap();
        let err = store
            .replace_paper_chunks("b", &[record("b", 0, 1, vec![1.0, 0.0, 0.0])])
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::DimensionMismatch {
                stored: 2,
                current: 3
            }
        ));
    }

    #[test]
    fn unreadable_stored_dimension_is_reported() {
        let store = Store::memory().unwrap();
        store.set_meta(META_EMBEDDING_DIM, "two").unwrap();
        let err = store
            .replace_paper_chunks("a", &[record("a", 0, 1, vec![1.0, 0.0])])
            .unwrap_err();
        assert!(matches!(
            &err,
            StorageError::CorruptMeta { key, value } if key == "embedding_dim" && value == "two"
        ));
        assert_eq!(store.chunk_count().unwrap(), 0);
    }

    #[test]
    fn load_chunks_applies_filter() {
        let store = Store::memory().unwrap();
        store
            .replace_paper_chunks("a", &[record("a", 0, 1, vec![1.0])])
            .unwrap();
        store
            .replace_paper_chunks("b", &[record("b", 0, 1, vec![1.0])])
            .unwrap();
        let only_b = store.load_chunks(&MetadataFilter::paper("b")).unwrap();
        assert_eq!(only_b.len(), 1);
        assert_eq!(only_b[0].chunk_id, "b_chunk_0");
        let by_file = MetadataFilter {
            paper_id: None,
            paper_filename: Some("a.md".into()),
        };
        assert_eq!(store.load_chunks(&by_file).unwrap()[0].metadata.paper_id, "a");
        assert_eq!(store.load_chunks(&MetadataFilter::default()).unwrap().len(), 2);
    }
}
