//! Various utilities for hashing Tezos related data.
use crate::types::Watermark;
use blake2::{
    digest::consts::{U20, U32},
    Blake2b, Digest,
};

/// Compute the Blake2b-256 hash of input bytes.
pub fn blake2b_256<T: AsRef<[u8]>>(bytes: T) -> [u8; 32] {
    Blake2b::<U32>::digest(bytes.as_ref()).into()
}

/// Compute the Blake2b-160 hash of input bytes. Used to derive public key hashes.
pub fn blake2b_160<T: AsRef<[u8]>>(bytes: T) -> [u8; 20] {
    Blake2b::<U20>::digest(bytes.as_ref()).into()
}

/// Prefix a message with its watermark byte and hash it.
///
/// This is the digest every Tezos signer signs.
pub fn hash_message<T: AsRef<[u8]>>(watermark: Watermark, message: T) -> [u8; 32] {
    let message = message.as_ref();
    let mut watermarked = Vec::with_capacity(message.len() + 1);
    watermarked.push(watermark.as_byte());
    watermarked.extend_from_slice(message);
    blake2b_256(watermarked)
}
