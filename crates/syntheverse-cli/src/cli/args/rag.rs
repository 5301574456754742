use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct RagArgs {
    #[command(subcommand)]
    pub cmd: RagCommand,
}

#[derive(Subcommand, Clone, Debug)]
pub enum RagCommand {
    /// Chunk, embed and store every paper, then run sample queries
    Init(RagInitArgs),
    /// Compare the papers on disk with the store
    Verify(RagVerifyArgs),
    /// Nearest chunks for a query
    Query(RagQueryArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RagInitArgs {
    /// Overrides rag.papers_dir
    #[arg(long)]
    pub papers_dir: Option<PathBuf>,

    /// Re-embed papers already in the store
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Clone, Debug)]
pub struct RagVerifyArgs {
    #[arg(long)]
    pub papers_dir: Option<PathBuf>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct RagQueryArgs {
    pub text: String,

    #[arg(short = 'n', long = "n-results", default_value_t = 5)]
    pub n_results: usize,

    /// Only chunks of this paper id (file stem)
    #[arg(long)]
    pub paper: Option<String>,

    #[arg(long)]
    pub json: bool,
}
