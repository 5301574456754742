use super::StorageResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

pub const META_EMBEDDING_MODEL: &str = "embedding_model";
pub const META_EMBEDDING_DIM: &str = "embedding_dim";
pub const META_SCHEMA_VERSION: &str = "schema_version";
pub const SCHEMA_VERSION: &str = "2";

pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    chunk_id       TEXT PRIMARY KEY,
    paper_id       TEXT NOT NULL,
    paper_filename TEXT NOT NULL,
    chunk_index    INTEGER NOT NULL,
    total_chunks   INTEGER NOT NULL,
    text           TEXT NOT NULL,
    embedding      BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_paper ON chunks(paper_id);

CREATE TABLE IF NOT EXISTS eval_cache (
    key        TEXT PRIMARY KEY,
    provider   TEXT NOT NULL,
    model      TEXT NOT NULL,
    payload    TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Additive migrations for stores created by older builds.
pub(crate) fn migrate(conn: &Connection) -> StorageResult<()> {
    let cols = get_columns(conn, "chunks")?;
    add_column_if_missing(conn, &cols, "chunks", "paper_filename", "TEXT NOT NULL DEFAULT ''")?;
    let cols = get_columns(conn, "eval_cache")?;
    add_column_if_missing(conn, &cols, "eval_cache", "created_at", "TEXT NOT NULL DEFAULT ''")?;
    set_meta(conn, META_SCHEMA_VERSION, SCHEMA_VERSION)?;
    Ok(())
}

pub(crate) fn get_columns(conn: &Connection, table: &str) -> StorageResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}

pub(crate) fn add_column_if_missing(
    conn: &Connection,
    cols: &HashSet<String>,
    table: &str,
    col: &str,
    ty: &str,
) -> StorageResult<()> {
    if !cols.contains(col) {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col, ty);
        conn.execute(&sql, [])?;
    }
    Ok(())
}

pub(crate) fn get_meta(conn: &Connection, key: &str) -> StorageResult<Option<String>> {
    Ok(conn
        .query_row("SELECT value FROM meta WHERE key = ?1", params![key], |r| {
            r.get(0)
        })
        .optional()?)
}

pub(crate) fn set_meta(conn: &Connection, key: &str, value: &str) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO meta(key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_adds_missing_columns_to_old_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE chunks (chunk_id TEXT PRIMARY KEY, paper_id TEXT NOT NULL,
             chunk_index INTEGER NOT NULL, total_chunks INTEGER NOT NULL,
             text TEXT NOT NULL, embedding BLOB NOT NULL);",
        )
        .unwrap();
        conn.execute_batch(DDL).unwrap();
        migrate(&conn).unwrap();
        assert!(get_columns(&conn, "chunks").unwrap().contains("paper_filename"));
        assert_eq!(
            get_meta(&conn, META_SCHEMA_VERSION).unwrap().as_deref(),
            Some(SCHEMA_VERSION)
        );
    }
}
