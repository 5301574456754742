use super::evaluate::print_evaluation;
use crate::cli::args::{HashArgs, PendingArgs, SubmitArgs, ValidateArgs};
use crate::cli::helpers::{build_bridge, build_evaluator, load_settings, parse_fractal, read_content};
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use syntheverse_core::bridge::{content_hash, fractal_hash};
use syntheverse_core::{FractalEmbedding, Scores};

pub fn hash(args: HashArgs) -> anyhow::Result<i32> {
    let content = read_content(&args.input)?;
    let fractal = args
        .fractal
        .as_deref()
        .map(parse_fractal)
        .transpose()?
        .unwrap_or_default();
    println!("Content hash: {}", content_hash(&content));
    println!("Fractal hash: {}", fractal_hash(&fractal));
    Ok(EXIT_SUCCESS)
}

pub async fn submit(args: SubmitArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let content = read_content(&args.input)?;
    let fractal: FractalEmbedding = parse_fractal(&args.fractal)?;
    let evaluate = args.evaluate || args.validate;
    let evaluator = if evaluate {
        Some(build_evaluator(
            &settings,
            args.mock,
            false,
            args.rag.then_some(3),
        )?)
    } else {
        None
    };
    let bridge = build_bridge(&settings, evaluator, true)?;

    let tx = bridge.submit_discovery(&content, &fractal).await?;
    println!("Discovery submitted: {}", tx);
    let receipt = bridge.wait_for_receipt(&tx).await?;
    let Some(discovery_id) = bridge.discovery_id_from_receipt(&receipt)? else {
        eprintln!("Could not find DiscoverySubmitted event in receipt");
        return Ok(EXIT_FAILURE);
    };
    println!("Discovery ID: {}", discovery_id);

    if !evaluate {
        return Ok(EXIT_SUCCESS);
    }
    let eval = bridge
        .evaluate_discovery(&content, Some(&fractal), None)
        .await;
    print_evaluation(&eval);

    if args.validate {
        let tx = bridge.validate_discovery(&discovery_id, eval.scores).await?;
        bridge.wait_for_receipt(&tx).await?;
        println!("Validation submitted: {}", tx);
    }
    Ok(EXIT_SUCCESS)
}

pub async fn validate(args: ValidateArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let bridge = build_bridge(&settings, None, true)?;
    let scores = Scores::new(args.coherence, args.density, args.novelty);
    let tx = bridge.validate_discovery(&args.discovery_id, scores).await?;
    println!("Validation submitted: {}", tx);
    println!("  PoD Score: {}", scores.pod_score());
    Ok(EXIT_SUCCESS)
}

pub async fn pending(args: PendingArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let bridge = build_bridge(&settings, None, false)?;
    let ids = bridge.get_pending_validations(args.limit).await?;
    if ids.is_empty() {
        println!("No pending validation requests.");
    }
    for (i, id) in ids.iter().enumerate() {
        println!("{}. {}", i + 1, id);
    }
    Ok(EXIT_SUCCESS)
}
