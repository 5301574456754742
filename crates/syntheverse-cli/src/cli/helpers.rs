use anyhow::Context;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syntheverse_core::config::{self, Settings, DEFAULT_CONFIG_PATH};
use syntheverse_core::errors::BridgeError;
use syntheverse_core::evaluator::{select_evaluator, DiscoveryEvaluator, RagContextEvaluator};
use syntheverse_core::rag::RagSystem;
use syntheverse_core::storage::{EvalCache, Store};
use syntheverse_core::{FractalEmbedding, SyntheverseBridge};

/// `.env`, then the settings file, then `RPC_URL`. An explicit `--config`
/// must exist; the default path is optional.
pub fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    config::load_dotenv();
    let (path, required) = match config {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let mut settings = Settings::load(&path, required)?;
    settings.apply_env();
    Ok(settings)
}

/// Reads a discovery from a file, or stdin for `-`.
pub fn read_content(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read discovery from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).map_err(|e| {
        BridgeError::config_parse(
            Some(input.to_string()),
            format!("config error: failed to read {}: {}", input, e),
        )
        .into()
    })
}

/// Inline JSON when the value starts with `{`, otherwise a path to a JSON file.
pub fn parse_fractal(raw: &str) -> anyhow::Result<FractalEmbedding> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        return FractalEmbedding::from_json_str(trimmed);
    }
    let text = std::fs::read_to_string(raw).map_err(|e| {
        BridgeError::config_parse(
            Some(raw.to_string()),
            format!("config error: failed to read fractal embedding {}: {}", raw, e),
        )
    })?;
    FractalEmbedding::from_json_str(&text)
}

pub fn open_rag(settings: &Settings) -> anyhow::Result<RagSystem> {
    RagSystem::from_settings(&settings.rag)
}

/// Heuristic unless a key is present and `--mock` is off. The LLM path caches
/// evaluations in the RAG store; `with_rag` adds retrieved paper context.
pub fn build_evaluator(
    settings: &Settings,
    mock: bool,
    refresh: bool,
    with_rag: Option<usize>,
) -> anyhow::Result<Arc<dyn DiscoveryEvaluator>> {
    let api_key = config::openai_api_key();
    let cache = if mock || api_key.is_none() {
        None
    } else {
        match Store::open(Path::new(&settings.rag.db_path)) {
            Ok(store) => Some((EvalCache::new(store), refresh)),
            Err(e) => {
                tracing::warn!(error = %e, "evaluation cache unavailable");
                None
            }
        }
    };
    let evaluator = select_evaluator(mock, api_key, &settings.evaluator, cache);
    match with_rag {
        Some(n) => {
            let rag = open_rag(settings)?;
            Ok(Arc::new(RagContextEvaluator::new(evaluator, Arc::new(rag), n)))
        }
        None => Ok(evaluator),
    }
}

/// Bridge with contracts loaded from `chain.deployment_file`.
pub fn build_bridge(
    settings: &Settings,
    evaluator: Option<Arc<dyn DiscoveryEvaluator>>,
    need_key: bool,
) -> anyhow::Result<SyntheverseBridge> {
    let key = config::private_key();
    if need_key && key.is_none() {
        return Err(BridgeError::missing_key("PRIVATE_KEY", "signing transactions").into());
    }
    let mut bridge =
        SyntheverseBridge::new(&settings.chain.rpc_url, key.as_deref(), evaluator)?.configure(settings);
    bridge.load_contracts(&settings.chain.deployment_file)?;
    Ok(bridge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractal_inline_or_file() {
        let inline = parse_fractal(r#"{"type":"HHF-AI","coherence":0.92}"#).unwrap();
        assert_eq!(inline.0["type"], "HHF-AI");

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("f.json");
        std::fs::write(&path, r#"{"layers":[0.9,0.88]}"#).unwrap();
        let from_file = parse_fractal(path.to_str().unwrap()).unwrap();
        assert_eq!(from_file.0["layers"][1], 0.88);

        assert!(parse_fractal("/no/such/file.json").is_err());
    }

    #[test]
    fn missing_input_file_is_config_error() {
        let err = read_content("/no/such/discovery.md").unwrap_err();
        assert_eq!(crate::exit_codes::for_error(&err), crate::exit_codes::EXIT_CONFIG_ERROR);
    }
}
