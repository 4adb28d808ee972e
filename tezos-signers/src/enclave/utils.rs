//! Conversions between the enclave's wire formats and Tezos types.

use super::EnclaveError;
use tezos_core::{
    p256::{self, elliptic_curve::sec1::ToEncodedPoint},
    types::{PublicKey, Signature, SigningCurve},
};

/// Compress an uncompressed SEC1 P-256 point into a Tezos public key
pub(super) fn decode_public_key(raw: &[u8]) -> Result<PublicKey, EnclaveError> {
    let key = p256::PublicKey::from_sec1_bytes(raw)
        .map_err(|e| EnclaveError::InvalidPublicKey(e.to_string()))?;
    let point = key.to_encoded_point(true);
    PublicKey::from_bytes(SigningCurve::P256, point.as_bytes())
        .map_err(|e| EnclaveError::InvalidPublicKey(e.to_string()))
}

/// Decode a DER `SEQUENCE { INTEGER r, INTEGER s }` into the 64 byte `r || s`
/// form. Sign bytes are dropped and short components left-padded.
pub(super) fn decode_signature(der: &[u8]) -> Result<Signature, EnclaveError> {
    let signature = p256::ecdsa::Signature::from_der(der)
        .map_err(|e| EnclaveError::MalformedSignature(e.to_string()))?;
    Signature::from_slice(SigningCurve::P256, &signature.to_bytes())
        .map_err(|e| EnclaveError::MalformedSignature(e.to_string()))
}
