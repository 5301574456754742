use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Upper bound of every evaluation dimension.
pub const SCORE_MAX: u32 = 10_000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Scores {
    pub coherence: u32,
    pub density: u32,
    pub novelty: u32,
}

impl Scores {
    pub fn new(coherence: u32, density: u32, novelty: u32) -> Self {
        Self {
            coherence,
            density,
            novelty,
        }
    }

    /// Build from raw (possibly out of range) model output, clamping each
    /// dimension into `0..=SCORE_MAX`.
    pub fn clamped(coherence: i64, density: i64, novelty: i64) -> Self {
        let clamp = |v: i64| v.clamp(0, SCORE_MAX as i64) as u32;
        Self {
            coherence: clamp(coherence),
            density: clamp(density),
            novelty: clamp(novelty),
        }
    }

    /// `coherence * density * novelty / 10000^2`, integer division as on chain.
    pub fn pod_score(&self) -> u64 {
        let s = SCORE_MAX as u64;
        (self.coherence as u64 * self.density as u64 * self.novelty as u64) / (s * s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationSource {
    Llm,
    Heuristic,
    Fallback,
    Cache,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Evaluation {
    #[serde(flatten)]
    pub scores: Scores,
    pub analysis: String,
    pub source: EvaluationSource,
}

impl Evaluation {
    pub fn new(scores: Scores, analysis: impl Into<String>, source: EvaluationSource) -> Self {
        Self {
            scores,
            analysis: analysis.into(),
            source,
        }
    }
}

/// Application metadata submitted next to discovery content. Only its hash
/// goes on chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(transparent)]
pub struct FractalEmbedding(pub Map<String, Value>);

impl FractalEmbedding {
    pub fn from_json_str(raw: &str) -> anyhow::Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| anyhow::anyhow!("config error: invalid fractal embedding JSON: {}", e))?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => anyhow::bail!(
                "config error: fractal embedding must be a JSON object, got {}",
                json_type_name(&other)
            ),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Epoch {
    Founders,
    Pioneer,
    Public,
    Ecosystem,
}

impl Epoch {
    pub const ALL: [Epoch; 4] = [
        Epoch::Founders,
        Epoch::Pioneer,
        Epoch::Public,
        Epoch::Ecosystem,
    ];

    pub fn from_index(idx: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(idx).ok()?).copied()
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Epoch::Founders => "Founders",
            Epoch::Pioneer => "Pioneer",
            Epoch::Public => "Public",
            Epoch::Ecosystem => "Ecosystem",
        }
    }
}

/// On-chain discovery record as returned by `ProofOfDiscovery.getDiscovery`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub discoverer: String,
    pub content_hash: String,
    pub fractal_hash: String,
    pub coherence_score: u32,
    pub density_score: u32,
    pub novelty_score: u32,
    pub validated: bool,
    pub redundant: bool,
    pub timestamp: u64,
}

impl Discovery {
    pub fn scores(&self) -> Scores {
        Scores::new(self.coherence_score, self.density_score, self.novelty_score)
    }
}

/// Contract addresses keyed exactly as the deploy script writes them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContractAddresses {
    #[serde(rename = "SyntheverseToken")]
    pub syntheverse_token: String,
    #[serde(rename = "ProofOfDiscovery")]
    pub proof_of_discovery: String,
    #[serde(rename = "AIIntegration")]
    pub ai_integration: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    #[serde(default)]
    pub network: Option<String>,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub deployer: Option<String>,
    pub contracts: ContractAddresses,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub paper_id: String,
    pub paper_filename: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub metadata: ChunkMetadata,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperEntry {
    pub paper_id: String,
    pub filename: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PaperSummary {
    pub total_papers: usize,
    pub total_chunks: usize,
    pub papers: Vec<PaperEntry>,
}
