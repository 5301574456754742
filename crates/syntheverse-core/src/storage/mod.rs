//! SQLite persistence for paper chunks, their embeddings and cached evaluations.

pub mod chunks;
pub mod eval_cache;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub use eval_cache::EvalCache;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "embedding model mismatch: store was built with `{stored}`, current embedder is `{current}` (re-run `rag init --force` with a fresh db_path)"
    )]
    ModelMismatch { stored: String, current: String },

    #[error("embedding dimension mismatch: store holds {stored}-dim vectors, got {current}")]
    DimensionMismatch { stored: usize, current: usize },

    #[error("corrupt embedding blob for chunk {chunk_id}: {len} bytes")]
    CorruptBlob { chunk_id: String, len: usize },

    #[error("corrupt store metadata: {key} = {value:?}")]
    CorruptMeta { key: String, value: String },

    #[error("store mutex poisoned")]
    Poisoned,
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Clone)]
pub struct Store {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (creating parent directories) and initializes the schema.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        if let Err(e) = conn.execute_batch("PRAGMA journal_mode = WAL;") {
            tracing::warn!(path = %path.display(), error = %e, "could not enable WAL journal mode");
        }
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(schema::DDL)?;
        schema::migrate(&conn)?;
        Ok(())
    }

    pub(crate) fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    pub fn get_meta(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        schema::get_meta(&conn, key)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        schema::set_meta(&conn, key, value)
    }

    /// Records `model_id` on first use and rejects a store built with another model.
    pub fn ensure_embedding_model(&self, model_id: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        match schema::get_meta(&conn, schema::META_EMBEDDING_MODEL)? {
            Some(stored) if stored != model_id => Err(StorageError::ModelMismatch {
                stored,
                current: model_id.to_string(),
            }),
            Some(_) => Ok(()),
            None => schema::set_meta(&conn, schema::META_EMBEDDING_MODEL, model_id),
        }
    }
}
