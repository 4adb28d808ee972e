use super::{boxed, PublicKey, SigningCurve};
use crate::{
    types::Watermark,
    utils::{decode_check, encode_check, hash_message, prefix, Base58Error},
};
use k256::ecdsa::signature::hazmat::PrehashVerifier as _;
use p256::ecdsa::signature::hazmat::PrehashVerifier as _;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::{error::Error, fmt, str::FromStr};
use thiserror::Error;

/// An error involving a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Invalid length, Tezos signatures are 64 bytes
    #[error("invalid signature length, got {0}, expected 64")]
    InvalidLength(usize),
    #[error("unknown signature prefix: {0}")]
    UnknownPrefix(String),
    #[error(transparent)]
    Base58(#[from] Base58Error),
    /// The signature was produced on another curve than the key
    #[error("signature is on {signature:?} but key is on {key:?}")]
    CurveMismatch { signature: SigningCurve, key: SigningCurve },
    /// Thrown when signature verification failed
    #[error("signature verification failed: {0}")]
    VerificationError(Box<dyn Error + Send + Sync>),
}

/// A raw 64 byte Tezos signature tagged with the curve that produced it.
///
/// For the ECDSA curves the bytes are the big-endian `r` and `s` scalars, each
/// padded to 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    curve: SigningCurve,
    bytes: [u8; 64],
}

impl Signature {
    pub const fn new(curve: SigningCurve, bytes: [u8; 64]) -> Self {
        Self { curve, bytes }
    }

    pub fn from_slice(curve: SigningCurve, bytes: &[u8]) -> Result<Self, SignatureError> {
        let bytes: [u8; 64] =
            bytes.try_into().map_err(|_| SignatureError::InvalidLength(bytes.len()))?;
        Ok(Self { curve, bytes })
    }

    pub fn curve(&self) -> SigningCurve {
        self.curve
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Verifies that this signature over `watermark || message` was produced by
    /// the secret key behind `public_key`.
    pub fn verify<M: AsRef<[u8]>>(
        &self,
        watermark: Watermark,
        message: M,
        public_key: &PublicKey,
    ) -> Result<(), SignatureError> {
        self.verify_digest(&hash_message(watermark, message), public_key)
    }

    /// Verifies this signature over a precomputed Blake2b-256 digest
    pub fn verify_digest(
        &self,
        digest: &[u8; 32],
        public_key: &PublicKey,
    ) -> Result<(), SignatureError> {
        if self.curve != public_key.curve() {
            return Err(SignatureError::CurveMismatch {
                signature: self.curve,
                key: public_key.curve(),
            })
        }
        match self.curve {
            SigningCurve::Ed25519 => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(public_key.as_bytes());
                let key = ed25519_dalek::VerifyingKey::from_bytes(&raw).map_err(failed)?;
                let signature = ed25519_dalek::Signature::from_bytes(&self.bytes);
                key.verify_strict(digest, &signature).map_err(failed)
            }
            SigningCurve::Secp256k1 => {
                let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
                    .map_err(failed)?;
                let signature = k256::ecdsa::Signature::from_slice(&self.bytes).map_err(failed)?;
                key.verify_prehash(digest, &signature).map_err(failed)
            }
            SigningCurve::P256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key.as_bytes())
                    .map_err(failed)?;
                let signature = p256::ecdsa::Signature::from_slice(&self.bytes).map_err(failed)?;
                key.verify_prehash(digest, &signature).map_err(failed)
            }
        }
    }

    fn prefix(curve: SigningCurve) -> &'static [u8] {
        match curve {
            SigningCurve::Ed25519 => prefix::EDSIG,
            SigningCurve::Secp256k1 => prefix::SPSIG,
            SigningCurve::P256 => prefix::P2SIG,
        }
    }
}

fn failed<E: Error + Send + Sync + 'static>(err: E) -> SignatureError {
    SignatureError::VerificationError(boxed(err))
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_check(Self::prefix(self.curve), &self.bytes))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let curve = if s.starts_with("edsig") {
            SigningCurve::Ed25519
        } else if s.starts_with("spsig1") {
            SigningCurve::Secp256k1
        } else if s.starts_with("p2sig") {
            SigningCurve::P256
        } else {
            return Err(SignatureError::UnknownPrefix(s.to_owned()))
        };
        let bytes = decode_check(Self::prefix(curve), s, 64)?;
        Self::from_slice(curve, &bytes)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?.parse().map_err(de::Error::custom)
    }
}
