mod secret_key;
pub use secret_key::{SecretKey, WalletError};

use crate::Signer;
use secret_key::boxed;
use tezos_core::{
    ed25519_dalek::Signer as _,
    k256::{self, ecdsa::signature::hazmat::PrehashSigner as _},
    p256,
    types::{Address, PublicKey, Signature},
    utils::blake2b_256,
};

use async_trait::async_trait;
use std::fmt;

/// A Tezos secret/public key pair held in memory, which can be used for
/// signing operations.
///
/// # Examples
///
/// ## Signing and Verifying a message
///
/// The wallet hashes the watermarked message with Blake2b-256 and signs the
/// digest. Ed25519 signatures are deterministic, ECDSA signatures use RFC 6979
/// nonces.
///
/// ```
/// use tezos_core::{rand::thread_rng, types::{SigningCurve, Watermark}};
/// use tezos_signers::{Signer, Wallet};
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let wallet = Wallet::new(SigningCurve::P256, &mut thread_rng());
///
/// let message = [&[Watermark::GenericOperation.as_byte()][..], b"hello"].concat();
/// let signature = wallet.sign_message(&message).await?;
/// signature.verify(Watermark::GenericOperation, b"hello", &wallet.public_key())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Wallet {
    /// The wallet's secret key
    pub(crate) secret: SecretKey,
    /// The wallet's public key
    pub(crate) public_key: PublicKey,
    /// The wallet's implicit account
    pub(crate) address: Address,
}

#[async_trait]
impl Signer for Wallet {
    type Error = WalletError;

    async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
        &self,
        message: S,
    ) -> Result<Signature, Self::Error> {
        self.sign_digest(&blake2b_256(message))
    }

    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn address(&self) -> Address {
        self.address
    }
}

impl Wallet {
    /// Signs a precomputed Blake2b-256 digest
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, WalletError> {
        let curve = self.secret.curve();
        let signature = match &self.secret {
            SecretKey::Ed25519(key) => {
                return Ok(Signature::new(curve, key.sign(digest).to_bytes()))
            }
            SecretKey::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature =
                    key.sign_prehash(digest).map_err(|e| WalletError::Signing(boxed(e)))?;
                // the protocol only accepts low-S secp256k1 signatures
                signature.normalize_s().unwrap_or(signature).to_bytes().to_vec()
            }
            SecretKey::P256(key) => {
                let signature: p256::ecdsa::Signature =
                    key.sign_prehash(digest).map_err(|e| WalletError::Signing(boxed(e)))?;
                signature.to_bytes().to_vec()
            }
        };
        Signature::from_slice(curve, &signature).map_err(|e| WalletError::Signing(boxed(e)))
    }

    /// Gets the wallet's secret key
    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Returns the wallet's public key
    pub fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    /// Returns the wallet's implicit account
    pub fn address(&self) -> Address {
        self.address
    }
}

impl PartialEq for Wallet {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key
    }
}

// do not log the secret
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("curve", &self.secret.curve())
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish()
    }
}
