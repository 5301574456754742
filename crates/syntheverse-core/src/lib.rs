//! Syntheverse core: the off-chain side of the Proof-of-Discovery protocol.
//!
//! The crate glues three external systems together:
//!
//! - an EVM node running the `ProofOfDiscovery`, `AIIntegration` and
//!   `SyntheverseToken` contracts ([`chain`], [`bridge`])
//! - a hosted language model that scores discoveries ([`evaluator`])
//! - a vector store of research-paper chunks used as evaluation context ([`rag`])
//!
//! # Quick Start
//!
//! ```no_run
//! use syntheverse_core::bridge::SyntheverseBridge;
//! use syntheverse_core::evaluator::HeuristicEvaluator;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut bridge = SyntheverseBridge::new(
//!     "http://127.0.0.1:8545",
//!     std::env::var("PRIVATE_KEY").ok().as_deref(),
//!     Some(Arc::new(HeuristicEvaluator)),
//! )?;
//! bridge.load_contracts("blockchain/deployments/deployment-localhost.json")?;
//! let eval = bridge.evaluate_discovery("a hydrogen fractal insight", None, None).await;
//! println!("coherence={}", eval.scores.coherence);
//! # Ok(())
//! # }
//! ```
//!
//! # Environment
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `OPENAI_API_KEY` | Key for the LLM evaluator and OpenAI embeddings |
//! | `OPENAI_BASE_URL` | Override for the OpenAI endpoint (default `https://api.openai.com/v1`) |
//! | `PRIVATE_KEY` | Signing key for contract writes (hex, optional `0x`) |
//! | `RPC_URL` | JSON-RPC endpoint (default `http://127.0.0.1:8545`) |
//! | `SYNTHEVERSE_NETWORK_POLICY` | `deny` blocks every outbound call, `local` allows loopback only |

pub mod bridge;
pub mod chain;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod model;
pub mod providers;
pub mod rag;
pub mod report;
pub mod storage;

pub use bridge::SyntheverseBridge;
pub use config::Settings;
pub use model::{Evaluation, EvaluationSource, FractalEmbedding, Scores};
