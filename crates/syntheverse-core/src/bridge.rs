//! Off-chain bridge to the Proof-of-Discovery contracts.
//!
//! Hashes discovery content and its fractal embedding, scores it with the
//! configured [`DiscoveryEvaluator`], and sends the `submitDiscovery` /
//! `processValidation` transactions.

use crate::chain::contracts::{self, AiIntegration, ProofOfDiscovery, SyntheverseToken, TxSigner};
use crate::chain::deployment::{load_deployment, DeployedContracts};
use crate::chain::{format_h256, parse_h256, Address, EthClient, Receipt, Wallet, H256};
use crate::config::{Settings, DEFAULT_GAS_LIMIT};
use crate::errors::{BridgeError, BridgeErrorKind};
use crate::evaluator::DiscoveryEvaluator;
use crate::model::{Evaluation, EvaluationSource, FractalEmbedding, Scores, SCORE_MAX};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const FALLBACK_ANALYSIS: &str = "Fallback evaluation (HHF-AI not available)";

const RECEIPT_POLL: Duration = Duration::from_millis(500);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

pub struct SyntheverseBridge {
    eth: EthClient,
    signer: Option<TxSigner>,
    evaluator: Option<Arc<dyn DiscoveryEvaluator>>,
    contracts: Option<DeployedContracts>,
}

impl SyntheverseBridge {
    /// Without `private_key` the bridge is read-only.
    pub fn new(
        rpc_url: &str,
        private_key: Option<&str>,
        evaluator: Option<Arc<dyn DiscoveryEvaluator>>,
    ) -> anyhow::Result<Self> {
        Self::with_client(EthClient::http(rpc_url), private_key, evaluator)
    }

    pub fn with_client(
        eth: EthClient,
        private_key: Option<&str>,
        evaluator: Option<Arc<dyn DiscoveryEvaluator>>,
    ) -> anyhow::Result<Self> {
        let signer = match private_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => {
                let wallet = Wallet::from_hex(key).map_err(BridgeError::from)?;
                tracing::debug!(account = %wallet.address(), "bridge signer ready");
                Some(TxSigner::new(eth.clone(), wallet))
            }
            None => None,
        };
        if evaluator.is_none() {
            tracing::warn!("no HHF-AI evaluator configured; evaluations use the length fallback");
        }
        Ok(Self {
            eth,
            signer,
            evaluator,
            contracts: None,
        })
    }

    /// Applies `chain.gas_limit` and `chain.chain_id` to the signer.
    pub fn configure(mut self, settings: &Settings) -> Self {
        if let Some(signer) = self.signer.take() {
            let mut signer = signer.with_gas_limit(settings.chain.gas_limit);
            if let Some(id) = settings.chain.chain_id {
                signer = signer.with_chain_id(id);
            }
            self.signer = Some(signer);
        }
        self
    }

    pub fn load_contracts(&mut self, deployment_file: impl AsRef<Path>) -> anyhow::Result<()> {
        let info = load_deployment(deployment_file)?;
        let contracts = DeployedContracts::from_info(&info)?;
        tracing::info!(
            pod = %contracts.pod,
            ai_integration = %contracts.ai_integration,
            token = %contracts.token,
            "contracts loaded"
        );
        self.contracts = Some(contracts);
        Ok(())
    }

    pub fn set_contracts(&mut self, contracts: DeployedContracts) {
        self.contracts = Some(contracts);
    }

    pub fn contracts(&self) -> Option<&DeployedContracts> {
        self.contracts.as_ref()
    }

    pub fn eth(&self) -> &EthClient {
        &self.eth
    }

    /// Signing account, when a key was given.
    pub fn account(&self) -> Option<Address> {
        self.signer.as_ref().map(TxSigner::address)
    }

    pub fn gas_limit(&self) -> u64 {
        self.signer
            .as_ref()
            .map_or(DEFAULT_GAS_LIMIT, TxSigner::gas_limit)
    }

    fn deployed(&self) -> anyhow::Result<&DeployedContracts> {
        self.contracts.as_ref().ok_or_else(|| {
            BridgeError::new(
                BridgeErrorKind::DeploymentNotFound,
                "contracts not loaded: call load_contracts with the deployment file",
            )
            .into()
        })
    }

    fn signer(&self, purpose: &str) -> anyhow::Result<&TxSigner> {
        self.signer
            .as_ref()
            .ok_or_else(|| BridgeError::missing_key("PRIVATE_KEY", purpose).into())
    }

    pub fn pod(&self) -> anyhow::Result<ProofOfDiscovery> {
        Ok(ProofOfDiscovery::new(self.eth.clone(), self.deployed()?.pod))
    }

    pub fn ai_integration(&self) -> anyhow::Result<AiIntegration> {
        Ok(AiIntegration::new(
            self.eth.clone(),
            self.deployed()?.ai_integration,
        ))
    }

    pub fn token(&self) -> anyhow::Result<SyntheverseToken> {
        Ok(SyntheverseToken::new(self.eth.clone(), self.deployed()?.token))
    }

    pub fn compute_content_hash(&self, content: &str) -> String {
        content_hash(content)
    }

    pub fn compute_fractal_hash(&self, fractal_embedding: &FractalEmbedding) -> String {
        fractal_hash(fractal_embedding)
    }

    /// Never fails. Without an evaluator the scores grow with content length.
    pub async fn evaluate_discovery(
        &self,
        content: &str,
        fractal_embedding: Option<&FractalEmbedding>,
        context: Option<&str>,
    ) -> Evaluation {
        match &self.evaluator {
            Some(evaluator) => evaluator.evaluate(content, fractal_embedding, context).await,
            None => length_fallback(content),
        }
    }

    /// Returns the transaction hash (`0x` hex).
    pub async fn submit_discovery(
        &self,
        content: &str,
        fractal_embedding: &FractalEmbedding,
    ) -> anyhow::Result<String> {
        let signer = self.signer("submitting discoveries")?;
        let pod = self.pod()?;
        let content_hash = content_hash_bytes(content);
        let fractal_hash = fractal_hash_bytes(fractal_embedding);
        tracing::info!(
            content_hash = %format_h256(&content_hash),
            fractal_hash = %format_h256(&fractal_hash),
            "submitting discovery"
        );
        let tx = pod
            .submit_discovery(signer, content_hash, fractal_hash)
            .await
            .map_err(BridgeError::from)?;
        Ok(format_h256(&tx))
    }

    /// Sends `AIIntegration.processValidation`; returns the transaction hash.
    pub async fn validate_discovery(
        &self,
        discovery_id: &str,
        scores: Scores,
    ) -> anyhow::Result<String> {
        let signer = self.signer("validation")?;
        let id = parse_h256(discovery_id).map_err(|e| {
            BridgeError::other(format!("invalid discovery id {}: {}", discovery_id, e))
        })?;
        for (name, v) in [
            ("coherence", scores.coherence),
            ("density", scores.density),
            ("novelty", scores.novelty),
        ] {
            if v > SCORE_MAX {
                return Err(BridgeError::other(format!(
                    "{} score {} exceeds {}",
                    name, v, SCORE_MAX
                ))
                .into());
            }
        }
        let ai = self.ai_integration()?;
        let tx = ai
            .process_validation(signer, id, scores)
            .await
            .map_err(BridgeError::from)?;
        tracing::info!(
            discovery_id,
            coherence = scores.coherence,
            density = scores.density,
            novelty = scores.novelty,
            tx = %format_h256(&tx),
            "validation sent"
        );
        Ok(format_h256(&tx))
    }

    /// Up to `limit` pending request ids, oldest first.
    pub async fn get_pending_validations(&self, limit: u64) -> anyhow::Result<Vec<String>> {
        let ai = self.ai_integration()?;
        let count = ai
            .pending_request_count()
            .await
            .map_err(BridgeError::from)?;
        let actual = limit.min(count);
        if actual == 0 {
            return Ok(Vec::new());
        }
        let ids = ai
            .pending_requests(0, actual)
            .await
            .map_err(BridgeError::from)?;
        Ok(ids.iter().map(format_h256).collect())
    }

    pub async fn wait_for_receipt(&self, tx_hash: &str) -> anyhow::Result<Receipt> {
        self.wait_for_receipt_with(tx_hash, RECEIPT_POLL, RECEIPT_TIMEOUT)
            .await
    }

    pub async fn wait_for_receipt_with(
        &self,
        tx_hash: &str,
        poll: Duration,
        timeout: Duration,
    ) -> anyhow::Result<Receipt> {
        let hash = parse_h256(tx_hash).map_err(BridgeError::from)?;
        Ok(self
            .eth
            .wait_for_receipt(&hash, poll, timeout)
            .await
            .map_err(BridgeError::from)?)
    }

    pub fn discovery_id_from_receipt(&self, receipt: &Receipt) -> anyhow::Result<Option<String>> {
        let pod = self.deployed()?.pod;
        Ok(contracts::discovery_id_from_receipt(receipt, &pod).map(|id| format_h256(&id)))
    }
}

/// `min(10000, chars/k + 5000)` per dimension.
pub fn length_fallback(content: &str) -> Evaluation {
    let len = content.chars().count() as u64;
    let dim = |k: u64| (len / k + 5000).min(u64::from(SCORE_MAX)) as u32;
    Evaluation::new(
        Scores::new(dim(10), dim(8), dim(12)),
        FALLBACK_ANALYSIS,
        EvaluationSource::Fallback,
    )
}

pub fn content_hash_bytes(content: &str) -> H256 {
    Sha256::digest(content.as_bytes()).into()
}

/// `0x` + sha256 of the UTF-8 content.
pub fn content_hash(content: &str) -> String {
    format_h256(&content_hash_bytes(content))
}

pub fn fractal_hash_bytes(embedding: &FractalEmbedding) -> H256 {
    let mut out = String::new();
    write_sorted_json(&mut out, &Value::Object(embedding.0.clone()));
    Sha256::digest(out.as_bytes()).into()
}

/// `0x` + sha256 of the embedding in the
/// `json.dumps(obj, sort_keys=True)` layout.
pub fn fractal_hash(embedding: &FractalEmbedding) -> String {
    format_h256(&fractal_hash_bytes(embedding))
}

/// Sorted keys, `", "` / `": "` separators, `\uXXXX` escapes for non-ASCII.
pub fn sorted_json(value: &Value) -> String {
    let mut out = String::new();
    write_sorted_json(&mut out, value);
    out
}

fn write_sorted_json(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                out.push_str(&n.to_string());
            } else if let Some(f) = n.as_f64() {
                out.push_str(&float_repr(f));
            }
        }
        Value::String(s) => write_ascii_str(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_sorted_json(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_ascii_str(out, k);
                out.push_str(": ");
                write_sorted_json(out, v);
            }
            out.push('}');
        }
    }
}

fn write_ascii_str(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 || (c as u32) > 0x7e => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// `repr(float)` layout: shortest round-trip digits, fixed notation for
/// decimal exponents in `-4..16`, otherwise `d.ddde+XX`.
fn float_repr(f: f64) -> String {
    if f == 0.0 {
        return if f.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    let sci = format!("{:e}", f);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(m) => ("-", m),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    if (-4..16).contains(&exp) {
        let point = exp + 1;
        let body = if point <= 0 {
            format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
        } else {
            let point = point as usize;
            if digits.len() > point {
                format!("{}.{}", &digits[..point], &digits[point..])
            } else {
                format!("{}{}.0", digits, "0".repeat(point - digits.len()))
            }
        };
        format!("{}{}", sign, body)
    } else {
        let mant = if digits.len() > 1 {
            format!("{}.{}", &digits[..1], &digits[1..])
        } else {
            digits
        };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{}{}e{}{:02}", sign, mant, exp_sign, exp.unsigned_abs())
    }
}
