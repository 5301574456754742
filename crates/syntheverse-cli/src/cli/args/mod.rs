use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod chain;
pub mod evaluate;
pub mod rag;
pub use chain::*;
pub use evaluate::*;
pub use rag::*;

#[derive(Parser)]
#[command(
    name = "syntheverse",
    version,
    about = "Proof-of-Discovery bridge: HHF-AI evaluation, research-paper RAG and contract calls"
)]
pub struct Cli {
    /// Settings file; defaults to ./syntheverse.yaml when present
    #[arg(long, global = true, env = "SYNTHEVERSE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Research-paper vector store
    Rag(RagArgs),
    /// Score a discovery with the HHF-AI evaluator
    Evaluate(EvaluateArgs),
    /// Print the content hash and fractal hash that would be submitted
    Hash(HashArgs),
    /// Submit a discovery to ProofOfDiscovery
    Submit(SubmitArgs),
    /// Send AIIntegration.processValidation for a discovery
    Validate(ValidateArgs),
    /// List pending validation requests
    Pending(PendingArgs),
    /// Report every on-chain discovery with scores, epochs and rewards
    Summary(SummaryArgs),
    /// Save chain state and compare it with an earlier snapshot
    Snapshot(SnapshotArgs),
    /// Signer balance and gas price
    Balance,
    /// Submit, evaluate and validate a batch of papers with a full run report
    Pipeline(PipelineArgs),
    /// Check config, deployment, keys and node reachability
    Doctor(DoctorArgs),
    Version,
}

#[derive(clap::ValueEnum, Clone, Debug, Default, PartialEq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Clone, Debug)]
pub struct DoctorArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["syntheverse", "rag", "verify", "--config", "x.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.yaml")));
    }

    #[test]
    fn validate_takes_three_scores() {
        let cli = Cli::try_parse_from([
            "syntheverse",
            "validate",
            "0xabc",
            "9200",
            "8500",
            "9500",
        ])
        .unwrap();
        match cli.cmd {
            Command::Validate(v) => {
                assert_eq!((v.coherence, v.density, v.novelty), (9200, 8500, 9500));
            }
            _ => panic!("expected validate"),
        }
        assert!(Cli::try_parse_from(["syntheverse", "validate", "0xabc", "1"]).is_err());
    }

    #[test]
    fn submit_requires_fractal() {
        assert!(Cli::try_parse_from(["syntheverse", "submit", "paper.md"]).is_err());
        assert!(
            Cli::try_parse_from(["syntheverse", "submit", "paper.md", "--fractal", "{}"]).is_ok()
        );
    }

    #[test]
    fn rag_query_defaults() {
        let cli = Cli::try_parse_from(["syntheverse", "rag", "query", "fractal grammar"]).unwrap();
        match cli.cmd {
            Command::Rag(RagArgs {
                cmd: RagCommand::Query(q),
            }) => {
                assert_eq!(q.n_results, 5);
                assert_eq!(q.paper, None);
            }
            _ => panic!("expected rag query"),
        }
    }
}
