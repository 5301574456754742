//! Minimal EVM client: ABI words, legacy EIP-155 signing and JSON-RPC.

pub mod abi;
pub mod contracts;
pub mod deployment;
pub mod rpc;
pub mod tx;
pub mod wallet;

use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

pub use abi::AbiError;
pub use rpc::{EthClient, HttpTransport, Receipt, RpcError, RpcTransport};
pub use wallet::Wallet;

pub type H256 = [u8; 32];

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("unexpected value from {method}: {detail}")]
    UnexpectedValue { method: String, detail: String },

    #[error("timed out after {secs}s waiting for receipt of {hash}")]
    ReceiptTimeout { hash: String, secs: u64 },

    #[error("transaction {hash} reverted (status 0)")]
    Reverted { hash: String },
}

pub type ChainResult<T> = Result<T, ChainError>;

impl From<ChainError> for crate::errors::BridgeError {
    fn from(err: ChainError) -> Self {
        use crate::errors::{BridgeError, BridgeErrorKind};
        let message = err.to_string();
        let kind = match &err {
            ChainError::Rpc(RpcError::Transport(_)) => BridgeErrorKind::Network,
            ChainError::Rpc(RpcError::Blocked(_)) => BridgeErrorKind::ConfigParse,
            ChainError::Rpc(RpcError::Http { status, .. }) if *status == 429 => {
                BridgeErrorKind::ProviderRateLimit
            }
            ChainError::Rpc(RpcError::Http { .. }) => BridgeErrorKind::ProviderServer,
            ChainError::Rpc(RpcError::Node { message, .. })
                if message.to_lowercase().contains("revert") =>
            {
                BridgeErrorKind::Reverted
            }
            ChainError::Rpc(_) => BridgeErrorKind::ProviderServer,
            ChainError::Reverted { .. } => BridgeErrorKind::Reverted,
            ChainError::ReceiptTimeout { .. } => BridgeErrorKind::ProviderTimeout,
            ChainError::InvalidKey(_) => BridgeErrorKind::MissingKey,
            _ => BridgeErrorKind::Other,
        };
        let mut out = BridgeError::new(kind, message).with_provider("rpc");
        if let ChainError::Rpc(RpcError::Http { status, .. }) = &err {
            out = out.with_status(*status);
        }
        out
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s).map_err(|_| ChainError::InvalidAddress(s.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ChainError::InvalidAddress(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Hex with or without `0x`.
pub fn decode_hex(input: &str) -> ChainResult<Vec<u8>> {
    let trimmed = input.trim();
    let raw = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(raw).map_err(|e| ChainError::InvalidHex(format!("{}: {}", input, e)))
}

pub fn parse_h256(input: &str) -> ChainResult<H256> {
    let bytes = decode_hex(input)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| ChainError::InvalidHex(format!("expected 32 bytes, got {}", b.len())))
}

pub fn format_h256(h: &H256) -> String {
    format!("0x{}", hex::encode(h))
}

pub fn to_quantity(v: u128) -> String {
    format!("0x{:x}", v)
}

/// Parses a JSON-RPC hex quantity (`"0x1a"`).
pub fn parse_quantity(s: &str) -> ChainResult<u128> {
    let raw = s
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidHex(format!("quantity without 0x prefix: {}", s)))?;
    if raw.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(raw, 16).map_err(|e| ChainError::InvalidHex(format!("{}: {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn address_parse_and_display_lowercase() {
        let a: Address = "0x9D8A62F656A8D1615C1294FD71E9CFB3E4855A4F".parse().unwrap();
        assert_eq!(a.to_string(), "0x9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f");
        assert!("0x1234".parse::<Address>().is_err());
        assert!("zz".parse::<Address>().is_err());
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x1a").unwrap(), 26);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert!(parse_quantity("26").is_err());
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(255), "0xff");
    }

    #[test]
    fn h256_requires_32_bytes() {
        let h = parse_h256(&format!("0x{}", "ab".repeat(32))).unwrap();
        assert_eq!(format_h256(&h), format!("0x{}", "ab".repeat(32)));
        assert!(parse_h256("0xabcd").is_err());
    }
}
