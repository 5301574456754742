use clap::Args;

#[derive(Args, Clone, Debug)]
pub struct EvaluateArgs {
    /// Discovery file, or `-` for stdin
    pub input: String,

    /// Fractal embedding as inline JSON or a path to a JSON file
    #[arg(long)]
    pub fractal: Option<String>,

    /// Extra context about existing discoveries
    #[arg(long)]
    pub context: Option<String>,

    /// Use the offline heuristic evaluator
    #[arg(long)]
    pub mock: bool,

    /// Add the nearest paper chunks to the context
    #[arg(long)]
    pub rag: bool,

    #[arg(long, default_value_t = 3)]
    pub rag_results: usize,

    /// Ignore cached evaluations and ask the model again
    #[arg(long)]
    pub refresh: bool,

    #[arg(long)]
    pub json: bool,
}
