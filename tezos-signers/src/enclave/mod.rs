//! Secure enclave based Signer
mod mock;
pub use mock::MockEnclave;

mod utils;

use async_trait::async_trait;
use tezos_core::{
    types::{Address, PublicKey, Signature},
    utils::blake2b_256,
};
use tracing::{debug, instrument, trace};

/// A digest signing request passed to a [`SecureEnclave`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignRequest<'a> {
    /// Label of the private key inside the enclave
    pub label: &'a str,
    /// Text shown to the user when the enclave asks for authorization
    pub prompt: &'a str,
    /// Blake2b-256 digest of the watermarked message
    pub digest: [u8; 32],
}

/// Hardware keystore holding a P-256 key which never leaves the device.
///
/// The enclave only signs 32 byte digests, hashing happens on the host.
#[async_trait]
pub trait SecureEnclave: std::fmt::Debug + Send + Sync {
    /// Whether the device can currently be used
    async fn is_available(&self) -> bool;

    /// Returns the uncompressed SEC1 public key stored under `label`
    async fn public_key(&self, label: &str) -> Result<Vec<u8>, EnclaveError>;

    /// Signs the digest and returns an ASN.1 DER encoded ECDSA signature
    async fn sign_digest(&self, request: SignRequest<'_>) -> Result<Vec<u8>, EnclaveError>;
}

/// Key labels and user prompt for an [`EnclaveSigner`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnclaveConfig {
    pub public_key_label: String,
    pub private_key_label: String,
    pub prompt: String,
}

impl Default for EnclaveConfig {
    fn default() -> Self {
        Self {
            public_key_label: "tezoskit.public".to_owned(),
            private_key_label: "tezoskit.private".to_owned(),
            prompt: "Authorize Tezos operation signature".to_owned(),
        }
    }
}

impl EnclaveConfig {
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn labels(mut self, public: impl Into<String>, private: impl Into<String>) -> Self {
        self.public_key_label = public.into();
        self.private_key_label = private.into();
        self
    }
}

/// Errors produced by the EnclaveSigner
#[derive(thiserror::Error, Debug)]
pub enum EnclaveError {
    #[error("secure enclave is not available")]
    Unavailable,
    #[error("user declined the signing request")]
    UserDeclined,
    /// The enclave returned bytes which are not a DER ECDSA signature
    #[error("malformed enclave signature: {0}")]
    MalformedSignature(String),
    #[error("invalid enclave public key: {0}")]
    InvalidPublicKey(String),
    /// Any other failure reported by the device
    #[error("{0}")]
    Backend(String),
}

/// A Signer that delegates to a P-256 key held in a secure enclave.
///
/// The public key is fetched on instantiation, so the new function is `async`.
///
/// ```
/// use tezos_core::{rand::thread_rng, types::Watermark};
/// use tezos_signers::{EnclaveConfig, EnclaveSigner, MockEnclave, Signer};
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let enclave = MockEnclave::new(&mut thread_rng());
/// let signer = EnclaveSigner::new(enclave, EnclaveConfig::default()).await?;
///
/// let message = [&[Watermark::GenericOperation.as_byte()][..], b"forged"].concat();
/// let signature = signer.sign_message(&message).await?;
/// signature.verify(Watermark::GenericOperation, b"forged", &signer.public_key())?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EnclaveSigner<E> {
    enclave: E,
    config: EnclaveConfig,
    public_key: PublicKey,
    address: Address,
}

impl<E: SecureEnclave> std::fmt::Debug for EnclaveSigner<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnclaveSigner")
            .field("enclave", &self.enclave)
            .field("label", &self.config.private_key_label)
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .finish()
    }
}

impl<E: SecureEnclave> EnclaveSigner<E> {
    /// Instantiate a new signer, retrieving the public key from the enclave.
    #[instrument(err, skip(enclave, config), fields(label = %config.public_key_label))]
    pub async fn new(enclave: E, config: EnclaveConfig) -> Result<Self, EnclaveError> {
        if !enclave.is_available().await {
            return Err(EnclaveError::Unavailable)
        }
        let raw = enclave.public_key(&config.public_key_label).await?;
        let public_key = utils::decode_public_key(&raw)?;
        let address = public_key.public_key_hash();

        debug!("Instantiated enclave signer with public key {} and address {}", public_key, address);

        Ok(Self { enclave, config, public_key, address })
    }

    /// Sign a digest with the enclave's private key
    #[instrument(err, skip(self, digest), fields(digest = %hex::encode(digest)))]
    pub async fn sign_digest(&self, digest: [u8; 32]) -> Result<Signature, EnclaveError> {
        if !self.enclave.is_available().await {
            return Err(EnclaveError::Unavailable)
        }
        debug!("Dispatching sign_digest");
        let request = SignRequest {
            label: &self.config.private_key_label,
            prompt: &self.config.prompt,
            digest,
        };
        let der = self.enclave.sign_digest(request).await?;
        trace!("{}", hex::encode(&der));
        utils::decode_signature(&der)
    }

    pub fn enclave(&self) -> &E {
        &self.enclave
    }

    pub fn config(&self) -> &EnclaveConfig {
        &self.config
    }
}

#[async_trait]
impl<E: SecureEnclave> super::Signer for EnclaveSigner<E> {
    type Error = EnclaveError;

    #[instrument(err, skip(message))]
    async fn sign_message<S: Send + Sync + AsRef<[u8]>>(
        &self,
        message: S,
    ) -> Result<Signature, Self::Error> {
        let digest = blake2b_256(message);
        trace!("{}", hex::encode(digest));
        self.sign_digest(digest).await
    }

    fn public_key(&self) -> PublicKey {
        self.public_key.clone()
    }

    fn address(&self) -> Address {
        self.address
    }
}
