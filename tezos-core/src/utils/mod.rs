mod base58;
pub use base58::{decode_check, encode_check, prefix, Base58Error};

mod hash;
pub use hash::{blake2b_160, blake2b_256, hash_message};

/// Canonical binary encoding primitives
pub mod forge;
pub use forge::{ForgeError, Reader};
