//! Paper test run: submit, evaluate and validate each file, logging every
//! step. One paper failing does not stop the others.

use crate::cli::args::PipelineArgs;
use crate::cli::helpers::{build_bridge, build_evaluator, load_settings};
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use serde_json::json;
use std::path::Path;
use syntheverse_core::report::RunLogger;
use syntheverse_core::{FractalEmbedding, SyntheverseBridge};

pub async fn run(args: PipelineArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let evaluator = build_evaluator(&settings, args.mock, false, args.rag.then_some(3))?;
    let bridge = build_bridge(&settings, Some(evaluator), true)?;

    let mut logger = RunLogger::new();
    logger.log(
        "Starting Syntheverse paper pipeline",
        Some(json!({
            "papers": args.files.len(),
            "account": bridge.account().map(|a| a.to_string()),
            "gasLimit": bridge.gas_limit(),
        })),
    );

    let mut validated = 0usize;
    for (i, file) in args.files.iter().enumerate() {
        logger.log(format!("=== Paper {}/{}: {} ===", i + 1, args.files.len(), file.display()), None);
        if run_paper(&bridge, file, args.fractal_type.as_deref(), &mut logger).await {
            validated += 1;
        }
    }
    logger.log(
        format!("Pipeline finished: {}/{} papers validated", validated, args.files.len()),
        None,
    );

    let files = logger.save_reports(&args.out_dir)?;
    println!("Report: {}", files.text.display());
    println!("JSON report: {}", files.json.display());
    Ok(if files.has_errors {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    })
}

pub fn fractal_for(file: &Path, fractal_type: Option<&str>) -> FractalEmbedding {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let kind = fractal_type.map(str::to_string).unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    let mut f = FractalEmbedding::default();
    f.insert("type", kind);
    f.insert("filename", filename);
    f.insert("timestamp", chrono::Utc::now().timestamp_millis());
    f.insert("layers", json!([0.9, 0.88, 0.93]));
    f
}

/// Returns true when the paper made it through validation.
async fn run_paper(
    bridge: &SyntheverseBridge,
    file: &Path,
    fractal_type: Option<&str>,
    logger: &mut RunLogger,
) -> bool {
    let name = file.display().to_string();
    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            logger.log_error(&anyhow::anyhow!("failed to read {}: {}", name, e), &format!("Reading {}", name));
            return false;
        }
    };
    logger.log(
        "Paper loaded",
        Some(json!({ "length": content.chars().count(), "filename": name })),
    );

    let fractal = fractal_for(file, fractal_type);
    let content_hash = bridge.compute_content_hash(&content);
    let fractal_hash = bridge.compute_fractal_hash(&fractal);
    logger.log(
        "Hashes computed",
        Some(json!({ "contentHash": content_hash, "fractalHash": fractal_hash })),
    );

    let submit = async {
        let tx = bridge.submit_discovery(&content, &fractal).await?;
        let receipt = bridge.wait_for_receipt(&tx).await?;
        anyhow::Ok((tx, receipt))
    };
    let (tx, receipt) = match submit.await {
        Ok(r) => r,
        Err(e) => {
            logger.log_error(&e, &format!("Submitting {}", name));
            return false;
        }
    };
    let discovery_id = match bridge.discovery_id_from_receipt(&receipt) {
        Ok(Some(id)) => id,
        Ok(None) => {
            logger.log_error(
                &anyhow::anyhow!("could not find DiscoverySubmitted event"),
                &format!("Submitting {}", name),
            );
            return false;
        }
        Err(e) => {
            logger.log_error(&e, &format!("Submitting {}", name));
            return false;
        }
    };
    logger.log_transaction(
        &tx,
        "Submit Discovery",
        Some(json!({
            "paper": name,
            "discoveryId": discovery_id,
            "contentHash": content_hash,
            "fractalHash": fractal_hash,
            "blockNumber": receipt.block_number,
            "gasUsed": receipt.gas_used.map(|g| g.to_string()),
        })),
    );

    let eval = bridge
        .evaluate_discovery(&content, Some(&fractal), None)
        .await;
    logger.log(
        "HHF-AI evaluation",
        Some(json!({
            "coherence": eval.scores.coherence,
            "density": eval.scores.density,
            "novelty": eval.scores.novelty,
            "podScore": eval.scores.pod_score(),
            "source": eval.source,
            "analysis": eval.analysis,
        })),
    );

    let validate = async {
        let tx = bridge.validate_discovery(&discovery_id, eval.scores).await?;
        let receipt = bridge.wait_for_receipt(&tx).await?;
        anyhow::Ok((tx, receipt))
    };
    match validate.await {
        Ok((tx, receipt)) => {
            logger.log_transaction(
                &tx,
                "Process Validation",
                Some(json!({
                    "paper": name,
                    "discoveryId": discovery_id,
                    "blockNumber": receipt.block_number,
                })),
            );
            true
        }
        Err(e) => {
            logger.log_error(&e, &format!("Validating {}", name));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractal_defaults_type_to_file_stem() {
        let f = fractal_for(Path::new("docs/HHF-AI_Paper.md"), None);
        assert_eq!(f.0["type"], "HHF-AI_Paper");
        assert_eq!(f.0["filename"], "HHF-AI_Paper.md");
        assert_eq!(f.0["layers"], json!([0.9, 0.88, 0.93]));
        let typed = fractal_for(Path::new("x.md"), Some("PoD"));
        assert_eq!(typed.0["type"], "PoD");
    }
}
