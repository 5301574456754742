use super::{decode_hex, keccak256, Address, ChainError, ChainResult};
use k256::ecdsa::{SigningKey, VerifyingKey};

#[derive(Clone)]
pub struct Wallet {
    key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Accepts 32-byte hex with or without `0x`.
    pub fn from_hex(private_key: &str) -> ChainResult<Self> {
        let bytes = decode_hex(private_key)
            .map_err(|_| ChainError::InvalidKey("private key is not valid hex".to_string()))?;
        if bytes.len() != 32 {
            return Err(ChainError::InvalidKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| ChainError::InvalidKey(e.to_string()))?;
        let address = address_of(key.verifying_key());
        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Last 20 bytes of keccak over the uncompressed public key without its 0x04 prefix.
pub fn address_of(vk: &VerifyingKey) -> Address {
    let point = vk.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut a = [0u8; 20];
    a.copy_from_slice(&digest[12..]);
    Address(a)
}
