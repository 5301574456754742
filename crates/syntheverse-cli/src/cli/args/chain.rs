use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct HashArgs {
    /// Discovery file, or `-` for stdin
    pub input: String,

    #[arg(long)]
    pub fractal: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct SubmitArgs {
    pub input: String,

    /// Fractal embedding as inline JSON or a path to a JSON file
    #[arg(long)]
    pub fractal: String,

    /// Score the discovery after it is mined
    #[arg(long)]
    pub evaluate: bool,

    /// Send processValidation with the scores (implies --evaluate)
    #[arg(long)]
    pub validate: bool,

    #[arg(long)]
    pub mock: bool,

    #[arg(long)]
    pub rag: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    pub discovery_id: String,
    pub coherence: u32,
    pub density: u32,
    pub novelty: u32,
}

#[derive(Args, Clone, Debug)]
pub struct PendingArgs {
    #[arg(long, default_value_t = 10)]
    pub limit: u64,
}

#[derive(Args, Clone, Debug)]
pub struct SummaryArgs {
    /// Also write the summary as JSON
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct SnapshotArgs {
    #[arg(long, default_value = "test_outputs/persistence_snapshot.json")]
    pub out: PathBuf,

    /// Earlier snapshot to compare against; read before `--out` is overwritten
    #[arg(long)]
    pub compare: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct PipelineArgs {
    /// Paper files to submit
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// `type` field of every fractal embedding; defaults to the file stem
    #[arg(long)]
    pub fractal_type: Option<String>,

    #[arg(long, default_value = "test_outputs")]
    pub out_dir: PathBuf,

    #[arg(long)]
    pub mock: bool,

    #[arg(long)]
    pub rag: bool,
}
