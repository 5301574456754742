use super::{keccak256, Address, ChainError, ChainResult, H256, Wallet};
use rlp::RlpStream;

/// Pre-London transaction signed with EIP-155 replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: H256,
    pub v: u64,
    pub r: H256,
    pub s: H256,
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

impl LegacyTransaction {
    fn append_body(&self, s: &mut RlpStream) {
        s.append(&self.nonce);
        s.append(&self.gas_price);
        s.append(&self.gas_limit);
        s.append(&self.to.0.to_vec());
        s.append(&self.value);
        s.append(&self.data);
    }

    /// RLP of `[nonce, gasPrice, gas, to, value, data, chainId, 0, 0]`.
    pub fn signing_payload(&self, chain_id: u64) -> Vec<u8> {
        let mut s = RlpStream::new_list(9);
        self.append_body(&mut s);
        s.append(&chain_id);
        s.append(&0u8);
        s.append(&0u8);
        s.out().to_vec()
    }

    pub fn signing_hash(&self, chain_id: u64) -> H256 {
        keccak256(&self.signing_payload(chain_id))
    }

    pub fn sign(&self, wallet: &Wallet, chain_id: u64) -> ChainResult<SignedTransaction> {
        let sighash = self.signing_hash(chain_id);
        let (sig, recid) = wallet
            .signing_key()
            .sign_prehash_recoverable(&sighash)
            .map_err(|e| ChainError::Signing(e.to_string()))?;
        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        let v = u64::from(recid.to_byte()) + 35 + 2 * chain_id;

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        stream.append(&trim_leading_zeros(&r).to_vec());
        stream.append(&trim_leading_zeros(&s).to_vec());
        let raw = stream.out().to_vec();
        let hash = keccak256(&raw);
        Ok(SignedTransaction { raw, hash, v, r, s })
    }
}

fn trim_leading_zeros(b: &[u8]) -> &[u8] {
    let first = b.iter().position(|x| *x != 0).unwrap_or(b.len());
    &b[first..]
}
