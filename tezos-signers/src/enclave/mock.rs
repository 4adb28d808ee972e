use super::{EnclaveError, SecureEnclave, SignRequest};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tezos_core::{
    p256::{
        ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey},
        elliptic_curve::sec1::ToEncodedPoint,
    },
    rand::{CryptoRng, RngCore},
};

/// A software stand-in for a secure enclave, backed by an in-memory P-256 key.
///
/// Every signing request is recorded as `(label, prompt, digest)`.
#[derive(Clone)]
pub struct MockEnclave {
    key: SigningKey,
    available: bool,
    declines: bool,
    requests: Arc<Mutex<Vec<(String, String, [u8; 32])>>>,
}

impl MockEnclave {
    pub fn new<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_key(SigningKey::random(rng))
    }

    pub fn from_key(key: SigningKey) -> Self {
        Self { key, available: true, declines: false, requests: Default::default() }
    }

    /// Reports the device as unavailable
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Rejects every signing request as if the user cancelled the prompt
    pub fn declining(mut self) -> Self {
        self.declines = true;
        self
    }

    pub fn requests(&self) -> Vec<(String, String, [u8; 32])> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

// do not log the key
impl std::fmt::Debug for MockEnclave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEnclave")
            .field("available", &self.available)
            .field("declines", &self.declines)
            .finish()
    }
}

#[async_trait]
impl SecureEnclave for MockEnclave {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn public_key(&self, _label: &str) -> Result<Vec<u8>, EnclaveError> {
        Ok(self.key.verifying_key().as_affine().to_encoded_point(false).as_bytes().to_vec())
    }

    async fn sign_digest(&self, request: SignRequest<'_>) -> Result<Vec<u8>, EnclaveError> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push((
            request.label.to_owned(),
            request.prompt.to_owned(),
            request.digest,
        ));
        if self.declines {
            return Err(EnclaveError::UserDeclined)
        }
        let signature: Signature = self
            .key
            .sign_prehash(&request.digest)
            .map_err(|e| EnclaveError::Backend(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}
