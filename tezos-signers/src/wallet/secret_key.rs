//! Loading secret keys in their Tezos base58 forms
use super::Wallet;
use std::{error::Error, str::FromStr};
use tezos_core::{
    ed25519_dalek, k256, p256,
    rand::{CryptoRng, RngCore},
    types::{PublicKey, SigningCurve},
    utils::{decode_check, prefix, Base58Error},
};
use thiserror::Error;

#[derive(Error, Debug)]
/// Error thrown by the Wallet module
pub enum WalletError {
    /// The string is not an `edsk`, `spsk` or `p2sk` key
    #[error("unknown secret key prefix")]
    UnknownPrefix,
    /// Error propagated from the base58check decoder
    #[error(transparent)]
    Base58(#[from] Base58Error),
    /// The bytes are not a valid secret scalar for the curve
    #[error("invalid secret key: {0}")]
    InvalidKey(Box<dyn Error + Send + Sync>),
    /// A 64 byte `edsk` whose public half does not match its seed
    #[error("secret key does not match its embedded public key")]
    PublicKeyMismatch,
    /// Error propagated from the ECDSA signing routine
    #[error("signing failed: {0}")]
    Signing(Box<dyn Error + Send + Sync>),
}

pub(super) fn boxed<E: Error + Send + Sync + 'static>(err: E) -> Box<dyn Error + Send + Sync> {
    Box::new(err)
}

/// A secret key on one of the supported curves.
#[derive(Clone)]
pub enum SecretKey {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
    P256(p256::ecdsa::SigningKey),
}

impl SecretKey {
    /// Generates a random key on `curve`
    pub fn random<R: RngCore + CryptoRng>(curve: SigningCurve, rng: &mut R) -> Self {
        match curve {
            SigningCurve::Ed25519 => SecretKey::Ed25519(ed25519_dalek::SigningKey::generate(rng)),
            SigningCurve::Secp256k1 => SecretKey::Secp256k1(k256::ecdsa::SigningKey::random(rng)),
            SigningCurve::P256 => SecretKey::P256(p256::ecdsa::SigningKey::random(rng)),
        }
    }

    pub fn curve(&self) -> SigningCurve {
        match self {
            SecretKey::Ed25519(_) => SigningCurve::Ed25519,
            SecretKey::Secp256k1(_) => SigningCurve::Secp256k1,
            SecretKey::P256(_) => SigningCurve::P256,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            SecretKey::Ed25519(key) => key.verifying_key().into(),
            SecretKey::Secp256k1(key) => (*key.verifying_key()).into(),
            SecretKey::P256(key) => (*key.verifying_key()).into(),
        }
    }

    fn from_edsk(src: &str) -> Result<Self, WalletError> {
        // 64 byte form: seed followed by the public key
        if let Ok(bytes) = decode_check(prefix::EDSK, src, 64) {
            let (seed, public) = bytes.split_at(32);
            let key = ed25519_dalek::SigningKey::from_bytes(&to_seed(seed)?);
            if key.verifying_key().as_bytes() != public {
                return Err(WalletError::PublicKeyMismatch)
            }
            return Ok(SecretKey::Ed25519(key))
        }
        let seed = decode_check(prefix::EDSK_SEED, src, 32)?;
        Ok(SecretKey::Ed25519(ed25519_dalek::SigningKey::from_bytes(&to_seed(&seed)?)))
    }
}

fn to_seed(bytes: &[u8]) -> Result<[u8; 32], WalletError> {
    bytes.try_into().map_err(|e| WalletError::InvalidKey(boxed(e)))
}

impl FromStr for SecretKey {
    type Err = WalletError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        match src.get(..4) {
            Some("edsk") => Self::from_edsk(src),
            Some("spsk") => {
                let bytes = decode_check(prefix::SPSK, src, 32)?;
                let key = k256::ecdsa::SigningKey::from_slice(&bytes)
                    .map_err(|e| WalletError::InvalidKey(boxed(e)))?;
                Ok(SecretKey::Secp256k1(key))
            }
            Some("p2sk") => {
                let bytes = decode_check(prefix::P2SK, src, 32)?;
                let key = p256::ecdsa::SigningKey::from_slice(&bytes)
                    .map_err(|e| WalletError::InvalidKey(boxed(e)))?;
                Ok(SecretKey::P256(key))
            }
            _ => Err(WalletError::UnknownPrefix),
        }
    }
}

// do not log the secret
impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey({:?})", self.curve())
    }
}

impl Wallet {
    /// Creates a new random keypair on `curve` seeded with the provided RNG
    pub fn new<R: RngCore + CryptoRng>(curve: SigningCurve, rng: &mut R) -> Self {
        SecretKey::random(curve, rng).into()
    }
}

impl From<SecretKey> for Wallet {
    fn from(secret: SecretKey) -> Self {
        let public_key = secret.public_key();
        let address = public_key.public_key_hash();
        Self { secret, public_key, address }
    }
}

impl FromStr for Wallet {
    type Err = WalletError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Ok(src.parse::<SecretKey>()?.into())
    }
}
