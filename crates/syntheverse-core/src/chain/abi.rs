//! Just enough Solidity ABI for the static signatures the contracts expose.

use super::{keccak256, Address, H256};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("abi data too short: need {needed} bytes, got {got}")]
    ShortData { needed: usize, got: usize },

    #[error("abi value overflows {ty}")]
    Overflow { ty: &'static str },

    #[error("abi bool word is neither 0 nor 1")]
    InvalidBool,

    #[error("abi address word has non-zero padding")]
    InvalidAddress,

    #[error("abi dynamic offset {0} is invalid")]
    BadOffset(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u128),
    Bool(bool),
    Bytes32(H256),
}

impl Token {
    fn word(&self) -> [u8; 32] {
        let mut w = [0u8; 32];
        match self {
            Token::Address(a) => w[12..].copy_from_slice(a.as_bytes()),
            Token::Uint(v) => w[16..].copy_from_slice(&v.to_be_bytes()),
            Token::Bool(b) => w[31] = u8::from(*b),
            Token::Bytes32(h) => w.copy_from_slice(h),
        }
        w
    }
}

/// First four bytes of `keccak256(signature)`.
pub fn selector(signature: &str) -> [u8; 4] {
    let h = keccak256(signature.as_bytes());
    [h[0], h[1], h[2], h[3]]
}

pub fn encode_call(signature: &str, args: &[Token]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 32 * args.len());
    out.extend_from_slice(&selector(signature));
    for a in args {
        out.extend_from_slice(&a.word());
    }
    out
}

pub fn word(data: &[u8], index: usize) -> Result<&[u8], AbiError> {
    word_at(data, index * 32)
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    let end = offset + 32;
    data.get(offset..end).ok_or(AbiError::ShortData {
        needed: end,
        got: data.len(),
    })
}

fn uint_from_word(w: &[u8]) -> Result<u128, AbiError> {
    if w[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow { ty: "u128" });
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&w[16..]);
    Ok(u128::from_be_bytes(buf))
}

pub fn decode_uint(data: &[u8], index: usize) -> Result<u128, AbiError> {
    uint_from_word(word(data, index)?)
}

pub fn decode_u32(data: &[u8], index: usize) -> Result<u32, AbiError> {
    u32::try_from(decode_uint(data, index)?).map_err(|_| AbiError::Overflow { ty: "u32" })
}

pub fn decode_u64(data: &[u8], index: usize) -> Result<u64, AbiError> {
    u64::try_from(decode_uint(data, index)?).map_err(|_| AbiError::Overflow { ty: "u64" })
}

pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, AbiError> {
    match decode_uint(data, index) {
        Ok(0) => Ok(false),
        Ok(1) => Ok(true),
        Ok(_) | Err(AbiError::Overflow { .. }) => Err(AbiError::InvalidBool),
        Err(e) => Err(e),
    }
}

pub fn decode_address(data: &[u8], index: usize) -> Result<Address, AbiError> {
    let w = word(data, index)?;
    if w[..12].iter().any(|b| *b != 0) {
        return Err(AbiError::InvalidAddress);
    }
    let mut a = [0u8; 20];
    a.copy_from_slice(&w[12..]);
    Ok(Address(a))
}

pub fn decode_bytes32(data: &[u8], index: usize) -> Result<H256, AbiError> {
    let mut h = [0u8; 32];
    h.copy_from_slice(word(data, index)?);
    Ok(h)
}

/// Decodes a `bytes32[]` returned as the only output (head offset, then length, then items).
pub fn decode_bytes32_array(data: &[u8]) -> Result<Vec<H256>, AbiError> {
    let offset = usize::try_from(decode_uint(data, 0)?).map_err(|_| AbiError::BadOffset(usize::MAX))?;
    if offset % 32 != 0 {
        return Err(AbiError::BadOffset(offset));
    }
    let len = uint_from_word(word_at(data, offset)?)?;
    let len = usize::try_from(len).map_err(|_| AbiError::Overflow { ty: "usize" })?;
    let needed = offset
        .checked_add(32)
        .and_then(|v| len.checked_mul(32).and_then(|l| v.checked_add(l)))
        .ok_or(AbiError::Overflow { ty: "usize" })?;
    if data.len() < needed {
        return Err(AbiError::ShortData {
            needed,
            got: data.len(),
        });
    }
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let mut h = [0u8; 32];
        h.copy_from_slice(word_at(data, offset + 32 + i * 32)?);
        out.push(h);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_selectors() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("balanceOf(address)")), "70a08231");
    }

    #[test]
    fn encode_static_args() {
        let addr = Address([0x11; 20]);
        let data = encode_call(
            "f(address,uint256,bool,bytes32)",
            &[
                Token::Address(addr),
                Token::Uint(300),
                Token::Bool(true),
                Token::Bytes32([0xab; 32]),
            ],
        );
        assert_eq!(data.len(), 4 + 4 * 32);
        let body = &data[4..];
        assert_eq!(decode_address(body, 0).unwrap(), addr);
        assert_eq!(decode_uint(body, 1).unwrap(), 300);
        assert!(decode_bool(body, 2).unwrap());
        assert_eq!(decode_bytes32(body, 3).unwrap(), [0xab; 32]);
    }

    #[test]
    fn uint_overflow_and_short_data() {
        let mut w = [0u8; 32];
        w[0] = 1;
        assert_eq!(decode_uint(&w, 0), Err(AbiError::Overflow { ty: "u128" }));
        let mut w = [0u8; 32];
        w[27] = 1;
        assert_eq!(decode_u32(&w, 0), Err(AbiError::Overflow { ty: "u32" }));
        assert!(matches!(decode_uint(&w, 1), Err(AbiError::ShortData { needed: 64, got: 32 })));
        let mut b = [0u8; 32];
        b[31] = 2;
        assert_eq!(decode_bool(&b, 0), Err(AbiError::InvalidBool));
    }

    #[test]
    fn dynamic_bytes32_array() {
        let mut data = Vec::new();
        data.extend_from_slice(&Token::Uint(32).word());
        data.extend_from_slice(&Token::Uint(2).word());
        data.extend_from_slice(&[0x01; 32]);
        data.extend_from_slice(&[0x02; 32]);
        let ids = decode_bytes32_array(&data).unwrap();
        assert_eq!(ids, vec![[0x01; 32], [0x02; 32]]);

        data.truncate(96);
        assert!(matches!(
            decode_bytes32_array(&data),
            Err(AbiError::ShortData { needed: 128, got: 96 })
        ));

        let mut empty = Token::Uint(32).word().to_vec();
        empty.extend_from_slice(&Token::Uint(0).word());
        assert!(decode_bytes32_array(&empty).unwrap().is_empty());
    }
}
