#![cfg_attr(docsrs, feature(doc_cfg))]
//! Tezos types, forging, cryptography and utilities.
//! _It is recommended to use the `utils` and `types` re-exports instead of
//! the `core` module to simplify your imports._
//!
//! This library provides type definitions for Tezos' main datatypes (addresses,
//! amounts, keys, signatures and manager operations) along with their canonical
//! binary encoding, the so-called "forged" form which is what gets signed.
//!
//! ## Forging an operation
//!
//! ```rust
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! use tezos_core::types::{Address, Operation, OperationFees, OperationWithCounter, Tez};
//!
//! let source: Address = "tz1Ke2h7sDdakHJQh8WX4Z372du1KChsksyU".parse()?;
//! let operation = Operation::transaction(source, source, Tez::from_mutez(1))
//!     .with_fees(OperationFees::new(Tez::from_mutez(1_420), 10_600, 300));
//!
//! let forged = OperationWithCounter::new(operation.clone(), 1).forge()?;
//! let decoded = OperationWithCounter::decode(&forged)?;
//! assert_eq!(decoded.operation(), &operation);
//! # Ok(())
//! # }
//! ```
pub mod types;

/// Various utilities
pub mod utils;

// re-export the curve crates to avoid version mismatches in downstream crates
pub use ed25519_dalek;
pub use k256;
pub use p256;
pub use rand;
