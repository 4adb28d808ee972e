#![cfg_attr(docsrs, feature(doc_cfg))]
//! Provides a unified interface for signing Tezos operations.
//!
//! You can implement the `Signer` trait to extend functionality to other signers
//! such as Hardware Security Modules, remote signers etc.
//!
//! Signers receive the watermarked bytes of a forged operation, hash them with
//! Blake2b-256 and sign the digest. The returned [`Signature`] is the raw 64
//! byte form the node expects.
//!
//! Supported signers:
//! - Private key ([`Wallet`]) on Ed25519, secp256k1 or P-256
//! - Secure enclave ([`EnclaveSigner`]) holding a P-256 key
//!
//! ```
//! # use tezos_signers::{Signer, Wallet};
//! # use tezos_core::types::Watermark;
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! // instantiate the wallet
//! let wallet = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh".parse::<Wallet>()?;
//!
//! // sign some watermarked bytes
//! let mut message = vec![Watermark::GenericOperation.as_byte()];
//! message.extend_from_slice(b"forged operation");
//! let signature = wallet.sign_message(&message).await?;
//!
//! signature.verify(Watermark::GenericOperation, b"forged operation", &wallet.public_key())?;
//! # Ok(())
//! # }
//! ```
mod wallet;
pub use wallet::{SecretKey, Wallet, WalletError};

mod enclave;
pub use enclave::{
    EnclaveConfig, EnclaveError, EnclaveSigner, MockEnclave, SecureEnclave, SignRequest,
};

use async_trait::async_trait;
use std::error::Error;
use tezos_core::types::{Address, PublicKey, Signature};

/// Trait for signing forged operations
///
/// Implement this trait to support different signing modes, e.g. Ledger, hosted etc.
#[async_trait]
pub trait Signer: std::fmt::Debug + Send + Sync {
    type Error: Error + Send + Sync + 'static;

    /// Signs the Blake2b-256 digest of `message`, which is expected to start
    /// with its watermark
    async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
        &self,
        message: S,
    ) -> Result<Signature, Self::Error>;

    /// Returns the public key whose secret produces the signatures
    fn public_key(&self) -> PublicKey;

    /// Returns the signer's implicit account
    fn address(&self) -> Address {
        self.public_key().public_key_hash()
    }
}
