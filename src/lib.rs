#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, rust_2018_idioms)]
//! # tezoskit
//!
//! A complete Tezos client library: build manager operations, resolve their
//! fees, sign them with a software key or a hardware enclave and submit them to
//! a node.
//!
//! A prelude is provided which imports all the important things for you:
//!
//! ```no_run
//! use tezoskit::prelude::*;
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Provider::<Http>::try_from("http://localhost:8732")?;
//! let wallet: Wallet = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh".parse()?;
//! let client = TezosClient::new(provider, wallet, TezosProtocol::Carthage);
//!
//! let destination: Address = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse()?;
//! let custom = OperationFees::new(Tez::from_mutez(1_420), 10_600, 300);
//! let hash = client
//!     .transfer(Tez::from_tez(1)?, destination, OperationFeePolicy::Custom(custom))
//!     .await?;
//! println!("injected {hash}");
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`core`]: addresses, amounts, keys, operations and their binary encoding
//! - [`signers`]: the [`Signer`](signers::Signer) trait, software wallets and
//! enclave-backed signers
//! - [`providers`]: node RPC access and response classification
//! - [`middleware`]: fees, payload assembly and the end-to-end client

/// # tezos-core
///
/// Tezos types, binary encoding ("forging"), base58check and hashing.
pub mod core {
    pub use tezos_core::*;
}

/// # tezos-signers
///
/// A unified interface for signing Tezos payloads, with a software [`Wallet`]
/// over Ed25519, secp256k1 and P-256 and an [`EnclaveSigner`] for keys held in a
/// secure enclave.
///
/// [`Wallet`]: tezos_signers::Wallet
/// [`EnclaveSigner`]: tezos_signers::EnclaveSigner
pub mod signers {
    pub use tezos_signers::*;
}

/// # tezos-providers
///
/// Asynchronous access to the Tezos node RPC over a pluggable transport.
pub mod providers {
    pub use tezos_providers::*;
}

/// # tezos-middleware
///
/// Operation factory, fee policies, payload assembler and the [`TezosClient`].
///
/// [`TezosClient`]: tezos_middleware::TezosClient
pub mod middleware {
    pub use tezos_middleware::*;
}

// Re-export tezos_core::utils
pub use tezos_core::utils;

/// Easy imports of frequently used type definitions and traits
pub mod prelude {
    pub use super::core::types::*;

    pub use super::middleware::{
        fees::{FeeEstimator, FeeSchedule, OfflineEstimator, OperationFeePolicy, RpcFeeEstimator},
        ClientError, OperationFactory, PayloadAssembler, PayloadError, TezosClient,
    };

    pub use super::providers::{
        ErrorKind, Http, MockTransport, Provider, ProviderError, RawResponse, ResponseHandler,
        Transport,
    };

    pub use super::signers::{EnclaveConfig, EnclaveSigner, MockEnclave, Signer, Wallet};
}
