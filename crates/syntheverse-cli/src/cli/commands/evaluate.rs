use crate::cli::args::EvaluateArgs;
use crate::cli::helpers::{build_evaluator, load_settings, parse_fractal, read_content};
use crate::exit_codes::EXIT_SUCCESS;
use std::path::Path;
use syntheverse_core::Evaluation;

pub async fn run(args: EvaluateArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let settings = load_settings(config)?;
    let content = read_content(&args.input)?;
    let fractal = args.fractal.as_deref().map(parse_fractal).transpose()?;
    let rag = args.rag.then_some(args.rag_results);
    let evaluator = build_evaluator(&settings, args.mock, args.refresh, rag)?;
    tracing::info!(evaluator = evaluator.name(), chars = content.chars().count(), "evaluating discovery");

    let eval = evaluator
        .evaluate(&content, fractal.as_ref(), args.context.as_deref())
        .await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&eval)?);
    } else {
        print_evaluation(&eval);
    }
    Ok(EXIT_SUCCESS)
}

pub fn print_evaluation(eval: &Evaluation) {
    println!("HHF-AI Evaluation:");
    println!("  Coherence: {}", eval.scores.coherence);
    println!("  Density: {}", eval.scores.density);
    println!("  Novelty: {}", eval.scores.novelty);
    println!("  PoD Score: {}", eval.scores.pod_score());
    println!("  Analysis: {}", eval.analysis);
}
