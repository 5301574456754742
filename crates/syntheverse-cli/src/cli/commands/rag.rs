use crate::cli::args::{RagArgs, RagCommand, RagInitArgs, RagQueryArgs, RagVerifyArgs};
use crate::cli::helpers::{load_settings, open_rag};
use crate::exit_codes::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::Path;
use syntheverse_core::config::Settings;
use syntheverse_core::rag::loader::discover_papers;
use syntheverse_core::rag::{verify_store, MetadataFilter, Verification, SAMPLE_QUERIES};

const PREVIEW_CHARS: usize = 200;

pub async fn run(args: RagArgs, config: Option<&Path>) -> anyhow::Result<i32> {
    let mut settings = load_settings(config)?;
    match args.cmd {
        RagCommand::Init(a) => init(a, &mut settings).await,
        RagCommand::Verify(a) => verify(a, &mut settings),
        RagCommand::Query(a) => query(a, &settings).await,
    }
}

fn preview(text: &str) -> String {
    let mut p: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        p.push_str("...");
    }
    p.replace('\n', " ")
}

fn print_verification(v: &Verification) {
    println!("Papers on disk: {}", v.expected.len());
    println!("Papers in store: {}", v.loaded.len());
    println!("Total chunks: {}", v.total_chunks);
    for name in &v.missing {
        println!("  MISSING: {}", name);
    }
    for name in &v.extra {
        println!("  not on disk: {}", name);
    }
    if v.is_ok() {
        println!("All papers are loaded.");
    }
}

async fn init(args: RagInitArgs, settings: &mut Settings) -> anyhow::Result<i32> {
    if let Some(dir) = args.papers_dir {
        settings.rag.papers_dir = dir.display().to_string();
    }
    let dir = Path::new(&settings.rag.papers_dir);
    if !dir.is_dir() {
        eprintln!("Papers directory not found: {}", dir.display());
        return Ok(EXIT_FAILURE);
    }
    if discover_papers(dir).is_empty() {
        eprintln!("No paper files (.md, .txt, .pdf) found in {}", dir.display());
        return Ok(EXIT_FAILURE);
    }

    let mut rag = open_rag(settings)?;
    println!("Loading papers from {}", rag.papers_dir().display());
    let loaded = rag.load_all_papers(args.force).await?;
    println!("Loaded {} paper(s) in this run\n", loaded);

    let summary = rag.paper_summary()?;
    if summary.total_papers == 0 {
        eprintln!("No papers were loaded into the store");
        return Ok(EXIT_FAILURE);
    }
    println!("Total papers: {}", summary.total_papers);
    println!("Total chunks: {}", summary.total_chunks);
    for p in &summary.papers {
        println!("  {} ({} chunks)", p.filename, p.chunks);
    }
    println!();

    let verification = rag.verify()?;
    print_verification(&verification);

    println!("\nSample queries:");
    for q in SAMPLE_QUERIES {
        let hits = rag.retrieve_context(q, 2, None).await?;
        println!("  \"{}\"", q);
        for h in hits {
            println!(
                "    [{}] distance={:.4}",
                h.metadata.paper_filename,
                h.distance.unwrap_or(f32::NAN)
            );
        }
    }

    Ok(if verification.is_ok() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

fn verify(args: RagVerifyArgs, settings: &mut Settings) -> anyhow::Result<i32> {
    if let Some(dir) = args.papers_dir {
        settings.rag.papers_dir = dir.display().to_string();
    }
    let v = verify_store(&settings.rag)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        print_verification(&v);
    }
    Ok(if v.is_ok() { EXIT_SUCCESS } else { EXIT_FAILURE })
}

async fn query(args: RagQueryArgs, settings: &Settings) -> anyhow::Result<i32> {
    let rag = open_rag(settings)?;
    let filter = args.paper.map(MetadataFilter::paper);
    let hits = rag
        .retrieve_context(&args.text, args.n_results, filter.as_ref())
        .await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(EXIT_SUCCESS);
    }
    if hits.is_empty() {
        println!("No results.");
    }
    for (i, h) in hits.iter().enumerate() {
        println!(
            "{}. {} (chunk {}/{}) distance={:.4}",
            i + 1,
            h.metadata.paper_filename,
            h.metadata.chunk_index + 1,
            h.metadata.total_chunks,
            h.distance.unwrap_or(f32::NAN)
        );
        println!("   {}\n", preview(&h.text));
    }
    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(250);
        let p = preview(&long);
        assert_eq!(p.chars().count(), 203);
        assert!(p.ends_with("..."));
        assert_eq!(preview("a\nb"), "a b");
    }
}
