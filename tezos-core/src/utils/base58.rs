//! Base58check with the Tezos binary prefixes.
use thiserror::Error;

/// Binary prefixes prepended to payloads before base58check encoding. Each one
/// is chosen so that the encoded string starts with the human readable tag in
/// its name.
pub mod prefix {
    /// `tz1`, Ed25519 public key hash
    pub const TZ1: &[u8] = &[6, 161, 159];
    /// `tz2`, secp256k1 public key hash
    pub const TZ2: &[u8] = &[6, 161, 161];
    /// `tz3`, P-256 public key hash
    pub const TZ3: &[u8] = &[6, 161, 164];
    /// `KT1`, originated contract hash
    pub const KT1: &[u8] = &[2, 90, 121];

    /// `edpk`
    pub const EDPK: &[u8] = &[13, 15, 37, 217];
    /// `sppk`
    pub const SPPK: &[u8] = &[3, 254, 226, 86];
    /// `p2pk`
    pub const P2PK: &[u8] = &[3, 178, 139, 127];

    /// `edsk`, 32 byte seed form
    pub const EDSK_SEED: &[u8] = &[13, 15, 58, 7];
    /// `edsk`, 64 byte seed + public key form
    pub const EDSK: &[u8] = &[43, 246, 78, 7];
    /// `spsk`
    pub const SPSK: &[u8] = &[17, 162, 224, 201];
    /// `p2sk`
    pub const P2SK: &[u8] = &[16, 81, 238, 189];

    /// `edsig`
    pub const EDSIG: &[u8] = &[9, 245, 205, 134, 18];
    /// `spsig1`
    pub const SPSIG: &[u8] = &[13, 115, 101, 19, 63];
    /// `p2sig`
    pub const P2SIG: &[u8] = &[54, 240, 44, 52];

    /// `B`, block hash
    pub const BLOCK_HASH: &[u8] = &[1, 52];
    /// `o`, operation hash
    pub const OPERATION_HASH: &[u8] = &[5, 116];
    /// `P`, protocol hash
    pub const PROTOCOL_HASH: &[u8] = &[2, 170];
    /// `Net`, chain id
    pub const CHAIN_ID: &[u8] = &[87, 82, 0];
}

/// Error thrown when decoding a base58check string
#[derive(Debug, Error)]
pub enum Base58Error {
    /// The string is not valid base58, or its checksum does not match
    #[error(transparent)]
    Decode(#[from] bs58::decode::Error),
    /// The decoded bytes do not start with the expected prefix
    #[error("unexpected base58 prefix for {0}")]
    InvalidPrefix(String),
    /// The payload following the prefix has the wrong length
    #[error("invalid payload length, got {got}, expected {expected}")]
    InvalidLength { expected: usize, got: usize },
}

/// Encodes `payload` behind `prefix` with a 4 byte double-SHA256 checksum.
pub fn encode_check(prefix: &[u8], payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(prefix.len() + payload.len());
    bytes.extend_from_slice(prefix);
    bytes.extend_from_slice(payload);
    bs58::encode(bytes).with_check().into_string()
}

/// Decodes a base58check string, verifies and strips `prefix` and checks that
/// exactly `len` payload bytes remain.
pub fn decode_check(prefix: &[u8], input: &str, len: usize) -> Result<Vec<u8>, Base58Error> {
    let bytes = bs58::decode(input).with_check(None).into_vec()?;
    if !bytes.starts_with(prefix) {
        return Err(Base58Error::InvalidPrefix(input.to_owned()))
    }
    let payload = bytes[prefix.len()..].to_vec();
    if payload.len() != len {
        return Err(Base58Error::InvalidLength { expected: len, got: payload.len() })
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_human_readable_tags() {
        assert!(encode_check(prefix::TZ1, &[7u8; 20]).starts_with("tz1"));
        assert!(encode_check(prefix::TZ2, &[7u8; 20]).starts_with("tz2"));
        assert!(encode_check(prefix::TZ3, &[7u8; 20]).starts_with("tz3"));
        assert!(encode_check(prefix::KT1, &[7u8; 20]).starts_with("KT1"));
        assert!(encode_check(prefix::EDSIG, &[7u8; 64]).starts_with("edsig"));
        assert!(encode_check(prefix::SPSIG, &[7u8; 64]).starts_with("spsig1"));
        assert!(encode_check(prefix::P2SIG, &[7u8; 64]).starts_with("p2sig"));
        assert!(encode_check(prefix::BLOCK_HASH, &[7u8; 32]).starts_with('B'));
        assert!(encode_check(prefix::OPERATION_HASH, &[7u8; 32]).starts_with('o'));
    }

    #[test]
    fn burn_address_is_all_zeroes() {
        let decoded =
            decode_check(prefix::TZ1, "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU", 20).unwrap();
        assert_eq!(decoded, vec![0u8; 20]);
    }

    #[test]
    fn rejects_wrong_prefix_and_length() {
        let encoded = encode_check(prefix::TZ2, &[1u8; 20]);
        assert!(matches!(
            decode_check(prefix::TZ1, &encoded, 20),
            Err(Base58Error::InvalidPrefix(_))
        ));
        assert!(matches!(
            decode_check(prefix::TZ2, &encoded, 32),
            Err(Base58Error::InvalidLength { expected: 32, got: 20 })
        ));
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut encoded = encode_check(prefix::TZ1, &[1u8; 20]);
        let last = encoded.pop().unwrap();
        encoded.push(if last == '1' { '2' } else { '1' });
        assert!(matches!(decode_check(prefix::TZ1, &encoded, 20), Err(Base58Error::Decode(_))));
    }
}
