use super::boxed;
use crate::{
    types::Address,
    utils::{
        blake2b_160, decode_check, encode_check,
        forge::{ForgeError, Reader},
        prefix, Base58Error,
    },
};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{error::Error, fmt, str::FromStr};
use thiserror::Error;

/// An error involving a public key.
#[derive(Debug, Error)]
pub enum KeyError {
    /// The key bytes have the wrong length for the curve
    #[error("invalid {curve:?} public key length, got {got}")]
    InvalidLength { curve: SigningCurve, got: usize },
    /// The bytes do not describe a point on the curve
    #[error("invalid public key: {0}")]
    InvalidKey(Box<dyn Error + Send + Sync>),
    #[error("unknown public key prefix: {0}")]
    UnknownPrefix(String),
    #[error(transparent)]
    Base58(#[from] Base58Error),
}

/// Curves Tezos accounts can sign with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SigningCurve {
    /// `tz1` accounts
    Ed25519,
    /// `tz2` accounts
    Secp256k1,
    /// `tz3` accounts
    P256,
}

impl SigningCurve {
    /// Tag used in the binary encoding of keys and key hashes
    pub const fn tag(&self) -> u8 {
        match self {
            SigningCurve::Ed25519 => 0,
            SigningCurve::Secp256k1 => 1,
            SigningCurve::P256 => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, ForgeError> {
        match tag {
            0 => Ok(SigningCurve::Ed25519),
            1 => Ok(SigningCurve::Secp256k1),
            2 => Ok(SigningCurve::P256),
            tag => Err(ForgeError::InvalidTag { what: "curve", tag }),
        }
    }

    /// Length of a public key in its binary form
    pub const fn public_key_len(&self) -> usize {
        match self {
            SigningCurve::Ed25519 => 32,
            // SEC1 compressed points
            SigningCurve::Secp256k1 | SigningCurve::P256 => 33,
        }
    }

    fn public_key_prefix(&self) -> &'static [u8] {
        match self {
            SigningCurve::Ed25519 => prefix::EDPK,
            SigningCurve::Secp256k1 => prefix::SPPK,
            SigningCurve::P256 => prefix::P2PK,
        }
    }
}

/// A public key on one of the [`SigningCurve`]s, held in its binary form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    curve: SigningCurve,
    bytes: Vec<u8>,
}

impl PublicKey {
    /// Validates `bytes` as a point on `curve`. Weierstrass curves expect the
    /// compressed SEC1 form.
    pub fn from_bytes(curve: SigningCurve, bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != curve.public_key_len() {
            return Err(KeyError::InvalidLength { curve, got: bytes.len() })
        }
        match curve {
            SigningCurve::Ed25519 => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(bytes);
                ed25519_dalek::VerifyingKey::from_bytes(&raw)
                    .map_err(|e| KeyError::InvalidKey(boxed(e)))?;
            }
            SigningCurve::Secp256k1 => {
                k256::PublicKey::from_sec1_bytes(bytes)
                    .map_err(|e| KeyError::InvalidKey(boxed(e)))?;
            }
            SigningCurve::P256 => {
                p256::PublicKey::from_sec1_bytes(bytes)
                    .map_err(|e| KeyError::InvalidKey(boxed(e)))?;
            }
        }
        Ok(Self { curve, bytes: bytes.to_vec() })
    }

    pub fn curve(&self) -> SigningCurve {
        self.curve
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The implicit account controlled by this key
    pub fn public_key_hash(&self) -> Address {
        Address::implicit(self.curve, blake2b_160(&self.bytes))
    }

    pub fn forge(&self, out: &mut Vec<u8>) {
        out.push(self.curve.tag());
        out.extend_from_slice(&self.bytes);
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, ForgeError> {
        let curve = SigningCurve::from_tag(reader.read_u8()?)?;
        let bytes = reader.read_bytes(curve.public_key_len())?;
        Self::from_bytes(curve, bytes).map_err(|e| ForgeError::InvalidValue(e.to_string()))
    }
}

impl From<ed25519_dalek::VerifyingKey> for PublicKey {
    fn from(key: ed25519_dalek::VerifyingKey) -> Self {
        Self { curve: SigningCurve::Ed25519, bytes: key.as_bytes().to_vec() }
    }
}

impl From<k256::ecdsa::VerifyingKey> for PublicKey {
    fn from(key: k256::ecdsa::VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        Self { curve: SigningCurve::Secp256k1, bytes: point.as_bytes().to_vec() }
    }
}

impl From<p256::ecdsa::VerifyingKey> for PublicKey {
    fn from(key: p256::ecdsa::VerifyingKey) -> Self {
        let point = key.to_encoded_point(true);
        Self { curve: SigningCurve::P256, bytes: point.as_bytes().to_vec() }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_check(self.curve.public_key_prefix(), &self.bytes))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let curve = match s.get(..4) {
            Some("edpk") => SigningCurve::Ed25519,
            Some("sppk") => SigningCurve::Secp256k1,
            Some("p2pk") => SigningCurve::P256,
            _ => return Err(KeyError::UnknownPrefix(s.to_owned())),
        };
        let bytes = decode_check(curve.public_key_prefix(), s, curve.public_key_len())?;
        Self::from_bytes(curve, &bytes)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::elliptic_curve::sec1::ToEncodedPoint;
    use rand::thread_rng;

    #[test]
    fn ed25519_key_round_trips_through_base58() {
        let signing = ed25519_dalek::SigningKey::generate(&mut thread_rng());
        let key =
            PublicKey::from_bytes(SigningCurve::Ed25519, signing.verifying_key().as_bytes())
                .unwrap();
        let encoded = key.to_string();
        assert!(encoded.starts_with("edpk"));
        assert_eq!(encoded.parse::<PublicKey>().unwrap(), key);
        assert!(key.public_key_hash().to_string().starts_with("tz1"));
    }

    #[test]
    fn weierstrass_keys_must_be_compressed() {
        let secret = k256::SecretKey::random(&mut thread_rng());
        let point = secret.public_key().to_encoded_point(false);
        assert!(matches!(
            PublicKey::from_bytes(SigningCurve::Secp256k1, point.as_bytes()),
            Err(KeyError::InvalidLength { got: 65, .. })
        ));

        let compressed = secret.public_key().to_encoded_point(true);
        let key = PublicKey::from_bytes(SigningCurve::Secp256k1, compressed.as_bytes()).unwrap();
        assert!(key.to_string().starts_with("sppk"));
        assert!(key.public_key_hash().to_string().starts_with("tz2"));
    }

    #[test]
    fn rejects_points_off_the_curve() {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x05;
        assert!(matches!(
            PublicKey::from_bytes(SigningCurve::P256, &bytes),
            Err(KeyError::InvalidKey(_))
        ));
    }

    #[test]
    fn forges_with_curve_tag() {
        let secret = p256::SecretKey::random(&mut thread_rng());
        let point = secret.public_key().to_encoded_point(true);
        let key = PublicKey::from_bytes(SigningCurve::P256, point.as_bytes()).unwrap();

        let mut out = Vec::new();
        key.forge(&mut out);
        assert_eq!(out[0], 2);
        assert_eq!(out.len(), 34);
        assert_eq!(PublicKey::decode(&mut Reader::new(&out)).unwrap(), key);
    }
}
