//! `syntheverse.yaml` settings.
//!
//! Every section is optional; a missing file yields [`Settings::default`].
//! Secrets (`OPENAI_API_KEY`, `PRIVATE_KEY`) are never read from the file.

use crate::errors::BridgeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "syntheverse.yaml";
pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_DEPLOYMENT_FILE: &str = "blockchain/deployments/deployment-localhost.json";
pub const DEFAULT_GAS_LIMIT: u64 = 500_000;

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub chain: ChainSettings,
    pub evaluator: EvaluatorSettings,
    pub rag: RagSettings,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ChainSettings {
    pub rpc_url: String,
    pub deployment_file: String,
    pub gas_limit: u64,
    /// Skips the `eth_chainId` lookup when set.
    pub chain_id: Option<u64>,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            deployment_file: DEFAULT_DEPLOYMENT_FILE.to_string(),
            gas_limit: DEFAULT_GAS_LIMIT,
            chain_id: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorProvider {
    #[default]
    Openai,
    Heuristic,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorSettings {
    pub provider: EvaluatorProvider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EvaluatorSettings {
    fn default() -> Self {
        Self {
            provider: EvaluatorProvider::Openai,
            model: "gpt-4".to_string(),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    Openai,
    Fake,
    Fastembed,
}

impl Default for EmbedderKind {
    fn default() -> Self {
        if cfg!(feature = "fastembed") {
            EmbedderKind::Fastembed
        } else {
            EmbedderKind::Openai
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RagSettings {
    pub papers_dir: String,
    pub db_path: String,
    pub embedder: EmbedderKind,
    /// Defaults per embedder: `all-MiniLM-L6-v2` locally, `text-embedding-3-small` for OpenAI.
    pub embedding_model: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            papers_dir: "docs/research".to_string(),
            db_path: ".rag_db/rag.sqlite3".to_string(),
            embedder: EmbedderKind::default(),
            embedding_model: None,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl RagSettings {
    pub fn embedding_model(&self) -> String {
        if let Some(m) = &self.embedding_model {
            return m.clone();
        }
        match self.embedder {
            EmbedderKind::Openai => "text-embedding-3-small".to_string(),
            EmbedderKind::Fake => "fake-bow-256".to_string(),
            EmbedderKind::Fastembed => "all-MiniLM-L6-v2".to_string(),
        }
    }
}

impl Settings {
    /// Load from `path`. A missing file is only tolerated when `required` is false.
    pub fn load(path: &Path, required: bool) -> anyhow::Result<Self> {
        if !path.exists() {
            if required {
                return Err(BridgeError::missing_config(
                    path.display().to_string(),
                    "pass an existing --config file or omit the flag",
                )
                .into());
            }
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config_parse(
                Some(path.display().to_string()),
                format!("config error: failed to read config: {}", e),
            )
        })?;
        let settings = Self::from_yaml_str(&raw).map_err(|e| {
            BridgeError::config_parse(Some(path.display().to_string()), e.to_string())
        })?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let settings: Settings = if raw.trim().is_empty() {
            Settings::default()
        } else {
            serde_yaml::from_str(raw)
                .map_err(|e| anyhow::anyhow!("config error: failed to parse YAML: {}", e))?
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rag.chunk_size == 0 {
            anyhow::bail!("config error: rag.chunk_size must be greater than 0");
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            anyhow::bail!(
                "config error: rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap,
                self.rag.chunk_size
            );
        }
        if !(0.0..=2.0).contains(&self.evaluator.temperature) {
            anyhow::bail!(
                "config error: evaluator.temperature must be within 0.0..=2.0, got {}",
                self.evaluator.temperature
            );
        }
        if self.chain.gas_limit == 0 {
            anyhow::bail!("config error: chain.gas_limit must be greater than 0");
        }
        Ok(())
    }

    /// `RPC_URL` wins over the file value.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RPC_URL") {
            let url = url.trim();
            if !url.is_empty() {
                self.chain.rpc_url = url.to_string();
            }
        }
    }
}

/// Reads `.env` from the working directory when present.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "failed to read .env"),
    }
}

pub fn openai_api_key() -> Option<String> {
    non_empty_env("OPENAI_API_KEY")
}

pub fn private_key() -> Option<String> {
    non_empty_env("PRIVATE_KEY")
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn empty_yaml_gives_defaults() {
        let s = Settings::from_yaml_str("").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.chain.gas_limit, 500_000);
        assert_eq!(s.evaluator.model, "gpt-4");
        assert_eq!(s.rag.chunk_size, 1000);
        assert_eq!(s.rag.chunk_overlap, 200);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let s = Settings::from_yaml_str(
            "rag:\n  embedder: fake\n  chunk_size: 50\n  chunk_overlap: 10\nevaluator:\n  provider: heuristic\n",
        )
        .unwrap();
        assert_eq!(s.rag.embedder, EmbedderKind::Fake);
        assert_eq!(s.rag.chunk_size, 50);
        assert_eq!(s.rag.papers_dir, "docs/research");
        assert_eq!(s.evaluator.provider, EvaluatorProvider::Heuristic);
        assert_eq!(s.chain.rpc_url, DEFAULT_RPC_URL);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Settings::from_yaml_str("rag:\n  chunk_sz: 10\n").unwrap_err();
        assert!(err.to_string().contains("config error"));
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let err = Settings::from_yaml_str("rag:\n  chunk_size: 100\n  chunk_overlap: 100\n")
            .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
        assert!(Settings::from_yaml_str("rag:\n  chunk_size: 0\n  chunk_overlap: 0\n").is_err());
    }

    #[test]
    fn missing_file_is_default_unless_required() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nope.yaml");
        assert_eq!(Settings::load(&path, false).unwrap(), Settings::default());
        let err = Settings::load(&path, true).unwrap_err();
        let typed = BridgeError::from_anyhow(&err);
        assert_eq!(typed.kind, crate::errors::BridgeErrorKind::MissingConfig);
    }

    #[test]
    fn embedding_model_follows_embedder() {
        let mut rag = RagSettings {
            embedder: EmbedderKind::Openai,
            ..Default::default()
        };
        assert_eq!(rag.embedding_model(), "text-embedding-3-small");
        rag.embedder = EmbedderKind::Fastembed;
        assert_eq!(rag.embedding_model(), "all-MiniLM-L6-v2");
        rag.embedding_model = Some("custom".into());
        assert_eq!(rag.embedding_model(), "custom");
    }

    #[test]
    #[serial]
    fn rpc_url_env_overrides_file() {
        let previous = std::env::var("RPC_URL").ok();
        std::env::set_var("RPC_URL", "http://node:8545");
        let mut s = Settings::default();
        s.apply_env();
        assert_eq!(s.chain.rpc_url, "http://node:8545");
        match previous {
            Some(v) => std::env::set_var("RPC_URL", v),
            None => std::env::remove_var("RPC_URL"),
        }
    }
}
