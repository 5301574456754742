//! Typed wrappers over the three deployed contracts.
//!
//! Reads go through `eth_call`; writes are signed locally and sent with
//! `eth_sendRawTransaction` by [`TxSigner`].

use super::abi::{self, Token};
use super::rpc::{EthClient, Receipt};
use super::tx::LegacyTransaction;
use super::{format_h256, keccak256, Address, ChainResult, Wallet, H256};
use crate::config::DEFAULT_GAS_LIMIT;
use crate::model::{Discovery, Epoch, Scores};

pub const DISCOVERY_SUBMITTED_EVENT: &str = "DiscoverySubmitted(bytes32,address,bytes32)";

pub fn discovery_submitted_topic() -> H256 {
    keccak256(DISCOVERY_SUBMITTED_EVENT.as_bytes())
}

/// Discovery id from the `DiscoverySubmitted` log the PoD contract emitted.
/// Falls back to the first data word when the id is not indexed.
pub fn discovery_id_from_receipt(receipt: &Receipt, pod: &Address) -> Option<H256> {
    let topic = discovery_submitted_topic();
    receipt
        .logs
        .iter()
        .filter(|l| &l.address == pod && l.topics.first() == Some(&topic))
        .find_map(|l| match l.topics.get(1) {
            Some(id) => Some(*id),
            None => abi::decode_bytes32(&l.data, 0).ok(),
        })
}

/// Signs and sends legacy transactions from one wallet.
#[derive(Clone)]
pub struct TxSigner {
    eth: EthClient,
    wallet: Wallet,
    gas_limit: u64,
    chain_id: Option<u64>,
}

impl TxSigner {
    pub fn new(eth: EthClient, wallet: Wallet) -> Self {
        Self {
            eth,
            wallet,
            gas_limit: DEFAULT_GAS_LIMIT,
            chain_id: None,
        }
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Pins the chain id instead of asking the node.
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// One pending-nonce read, one gas price read, sign, send. No retry.
    pub async fn send_transaction(&self, to: &Address, data: Vec<u8>) -> ChainResult<H256> {
        let from = self.wallet.address();
        let chain_id = match self.chain_id {
            Some(id) => id,
            None => self.eth.chain_id().await?,
        };
        let nonce = self.eth.transaction_count(&from, "pending").await?;
        let gas_price = self.eth.gas_price().await?;
        let tx = LegacyTransaction {
            nonce,
            gas_price,
            gas_limit: self.gas_limit,
            to: *to,
            value: 0,
            data,
        };
        let signed = tx.sign(&self.wallet, chain_id)?;
        let hash = self.eth.send_raw_transaction(&signed.raw).await?;
        tracing::info!(
            from = %from,
            to = %to,
            nonce,
            tx = %format_h256(&hash),
            "transaction sent"
        );
        Ok(hash)
    }
}

#[derive(Clone)]
pub struct ProofOfDiscovery {
    eth: EthClient,
    address: Address,
}

impl ProofOfDiscovery {
    pub fn new(eth: EthClient, address: Address) -> Self {
        Self { eth, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn submit_discovery(
        &self,
        signer: &TxSigner,
        content_hash: H256,
        fractal_hash: H256,
    ) -> ChainResult<H256> {
        let data = abi::encode_call(
            "submitDiscovery(bytes32,bytes32)",
            &[Token::Bytes32(content_hash), Token::Bytes32(fractal_hash)],
        );
        signer.send_transaction(&self.address, data).await
    }

    pub async fn validate_discovery(
        &self,
        signer: &TxSigner,
        discovery_id: H256,
        scores: Scores,
    ) -> ChainResult<H256> {
        let data = abi::encode_call(
            "validateDiscovery(bytes32,uint256,uint256,uint256)",
            &score_args(discovery_id, scores),
        );
        signer.send_transaction(&self.address, data).await
    }

    pub async fn discovery_count(&self) -> ChainResult<u64> {
        let out = self
            .eth
            .call(&self.address, &abi::encode_call("getDiscoveryCount()", &[]))
            .await?;
        Ok(abi::decode_u64(&out, 0)?)
    }

    pub async fn discovery_ids(&self, offset: u64, limit: u64) -> ChainResult<Vec<H256>> {
        let data = abi::encode_call(
            "getDiscoveryIds(uint256,uint256)",
            &[Token::Uint(offset.into()), Token::Uint(limit.into())],
        );
        let out = self.eth.call(&self.address, &data).await?;
        Ok(abi::decode_bytes32_array(&out)?)
    }

    pub async fn discovery(&self, id: H256) -> ChainResult<Discovery> {
        let data = abi::encode_call("getDiscovery(bytes32)", &[Token::Bytes32(id)]);
        let out = self.eth.call(&self.address, &data).await?;
        decode_discovery(&out)
    }

    pub async fn total_coherence_density(&self) -> ChainResult<u128> {
        let out = self
            .eth
            .call(&self.address, &abi::encode_call("totalCoherenceDensity()", &[]))
            .await?;
        Ok(abi::decode_uint(&out, 0)?)
    }

    pub async fn qualified_epoch(&self, density: u32) -> ChainResult<u64> {
        let data = abi::encode_call(
            "getQualifiedEpoch(uint256)",
            &[Token::Uint(density.into())],
        );
        let out = self.eth.call(&self.address, &data).await?;
        Ok(abi::decode_u64(&out, 0)?)
    }
}

/// `getDiscovery` returns a static struct, so every field is one head word.
pub fn decode_discovery(out: &[u8]) -> ChainResult<Discovery> {
    Ok(Discovery {
        discoverer: abi::decode_address(out, 0)?.to_string(),
        content_hash: format_h256(&abi::decode_bytes32(out, 1)?),
        fractal_hash: format_h256(&abi::decode_bytes32(out, 2)?),
        coherence_score: abi::decode_u32(out, 3)?,
        density_score: abi::decode_u32(out, 4)?,
        novelty_score: abi::decode_u32(out, 5)?,
        validated: abi::decode_bool(out, 6)?,
        redundant: abi::decode_bool(out, 7)?,
        timestamp: abi::decode_u64(out, 8)?,
    })
}

fn score_args(discovery_id: H256, scores: Scores) -> [Token; 4] {
    [
        Token::Bytes32(discovery_id),
        Token::Uint(scores.coherence.into()),
        Token::Uint(scores.density.into()),
        Token::Uint(scores.novelty.into()),
    ]
}

#[derive(Clone)]
pub struct AiIntegration {
    eth: EthClient,
    address: Address,
}

impl AiIntegration {
    pub fn new(eth: EthClient, address: Address) -> Self {
        Self { eth, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn process_validation(
        &self,
        signer: &TxSigner,
        discovery_id: H256,
        scores: Scores,
    ) -> ChainResult<H256> {
        let data = abi::encode_call(
            "processValidation(bytes32,uint256,uint256,uint256)",
            &score_args(discovery_id, scores),
        );
        signer.send_transaction(&self.address, data).await
    }

    pub async fn request_validation(
        &self,
        signer: &TxSigner,
        discovery_id: H256,
        content_hash: H256,
        fractal_hash: H256,
        discoverer: Address,
    ) -> ChainResult<H256> {
        let data = abi::encode_call(
            "requestValidation(bytes32,bytes32,bytes32,address)",
            &[
                Token::Bytes32(discovery_id),
                Token::Bytes32(content_hash),
                Token::Bytes32(fractal_hash),
                Token::Address(discoverer),
            ],
        );
        signer.send_transaction(&self.address, data).await
    }

    pub async fn pending_request_count(&self) -> ChainResult<u64> {
        let out = self
            .eth
            .call(&self.address, &abi::encode_call("getPendingRequestCount()", &[]))
            .await?;
        Ok(abi::decode_u64(&out, 0)?)
    }

    pub async fn pending_requests(&self, offset: u64, limit: u64) -> ChainResult<Vec<H256>> {
        let data = abi::encode_call(
            "getPendingRequests(uint256,uint256)",
            &[Token::Uint(offset.into()), Token::Uint(limit.into())],
        );
        let out = self.eth.call(&self.address, &data).await?;
        Ok(abi::decode_bytes32_array(&out)?)
    }
}

#[derive(Clone)]
pub struct SyntheverseToken {
    eth: EthClient,
    address: Address,
}

impl SyntheverseToken {
    pub fn new(eth: EthClient, address: Address) -> Self {
        Self { eth, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read_uint(&self, signature: &str, args: &[Token]) -> ChainResult<u128> {
        let out = self
            .eth
            .call(&self.address, &abi::encode_call(signature, args))
            .await?;
        Ok(abi::decode_uint(&out, 0)?)
    }

    /// Raw epoch index; map with [`Epoch::from_index`].
    pub async fn current_epoch(&self) -> ChainResult<u64> {
        let v = self.read_uint("currentEpoch()", &[]).await?;
        Ok(u64::try_from(v).unwrap_or(u64::MAX))
    }

    pub async fn epoch(&self) -> ChainResult<Option<Epoch>> {
        Ok(Epoch::from_index(self.current_epoch().await?))
    }

    pub async fn coherence_density(&self) -> ChainResult<u128> {
        self.read_uint("coherenceDensity()", &[]).await
    }

    pub async fn coherence_density_threshold(&self) -> ChainResult<u128> {
        self.read_uint("coherenceDensityThreshold()", &[]).await
    }

    pub async fn balance_of(&self, owner: &Address) -> ChainResult<u128> {
        self.read_uint("balanceOf(address)", &[Token::Address(*owner)])
            .await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn word_u(v: u128) -> [u8; 32] {
        let mut w = [0u8; 32];
        w[16..].copy_from_slice(&v.to_be_bytes());
        w
    }

    pub fn hex_words(words: &[[u8; 32]]) -> String {
        let mut s = String::from("0x");
        for w in words {
            s.push_str(&hex::encode(w));
        }
        s
    }

    pub fn address_word(a: &Address) -> [u8; 32] {
        let mut w = [0u8; 32];
        w[12..].copy_from_slice(a.as_bytes());
        w
    }

    pub fn bytes32_array(items: &[H256]) -> String {
        let mut words = vec![word_u(32), word_u(items.len() as u128)];
        words.extend_from_slice(items);
        hex_words(&words)
    }

    pub fn discovery_words(d: &Discovery) -> String {
        let discoverer: Address = d.discoverer.parse().unwrap();
        hex_words(&[
            address_word(&discoverer),
            super::super::parse_h256(&d.content_hash).unwrap(),
            super::super::parse_h256(&d.fractal_hash).unwrap(),
            word_u(d.coherence_score.into()),
            word_u(d.density_score.into()),
            word_u(d.novelty_score.into()),
            word_u(u128::from(d.validated)),
            word_u(u128::from(d.redundant)),
            word_u(d.timestamp.into()),
        ])
    }
}
