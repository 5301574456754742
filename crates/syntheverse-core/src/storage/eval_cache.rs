use super::{StorageResult, Store};
use crate::model::Evaluation;
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};

pub fn cache_key(provider: &str, model: &str, temperature: f32, prompt: &str) -> String {
    let mut h = Sha256::new();
    h.update(provider.as_bytes());
    h.update(b"\n");
    h.update(model.as_bytes());
    h.update(b"\n");
    h.update(format!("{:.3}", temperature).as_bytes());
    h.update(b"\n");
    h.update(prompt.as_bytes());
    format!("{:x}", h.finalize())
}

#[derive(Clone)]
pub struct EvalCache {
    store: Store,
}

impl EvalCache {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn get(&self, key: &str) -> StorageResult<Option<Evaluation>> {
        let conn = self.store.lock()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM eval_cache WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        // A row that no longer deserializes is treated as a miss.
        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    pub fn put(
        &self,
        key: &str,
        provider: &str,
        model: &str,
        evaluation: &Evaluation,
    ) -> StorageResult<()> {
        let payload = serde_json::to_string(evaluation).unwrap_or_default();
        let created_at = chrono::Utc::now().to_rfc3339();
        let conn = self.store.lock()?;
        conn.execute(
            "INSERT INTO eval_cache(key, provider, model, payload, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, created_at = excluded.created_at",
            params![key, provider, model, payload, created_at],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EvaluationSource, Scores};

    #[test]
    fn key_depends_on_every_input() {
        let base = cache_key("openai", "gpt-4", 0.3, "p");
        assert_eq!(base, cache_key("openai", "gpt-4", 0.3, "p"));
        assert_ne!(base, cache_key("openai", "gpt-4o", 0.3, "p"));
        assert_ne!(base, cache_key("openai", "gpt-4", 0.7, "p"));
        assert_ne!(base, cache_key("openai", "gpt-4", 0.3, "q"));
        assert_ne!(base, cache_key("fake", "gpt-4", 0.3, "p"));
    }

    #[test]
    fn put_then_get_returns_evaluation() {
        let cache = EvalCache::new(Store::memory().unwrap());
        assert!(cache.get("k").unwrap().is_none());
        let eval = Evaluation::new(Scores::new(9000, 8000, 7000), "good", EvaluationSource::Llm);
        cache.put("k", "openai", "gpt-4", &eval).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(eval));
    }
}
