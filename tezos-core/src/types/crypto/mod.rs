mod keys;
pub use keys::{KeyError, PublicKey, SigningCurve};

mod signature;
pub use signature::{Signature, SignatureError};

use std::error::Error;

/// Boxes an error from one of the curve crates. Their error types come from
/// different versions of the `signature` crate, so they are erased here.
pub(crate) fn boxed<E: Error + Send + Sync + 'static>(err: E) -> Box<dyn Error + Send + Sync> {
    Box::new(err)
}
