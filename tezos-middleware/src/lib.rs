#![cfg_attr(docsrs, feature(doc_cfg))]
//! # Tezos operation pipeline
//!
//! Turning an intent into an injected operation goes through the following
//! stages, each usable on its own:
//!
//! - [`OperationFactory`]: builds operations with their fees resolved through
//! an [`OperationFeePolicy`](crate::fees::OperationFeePolicy)
//! - [`fees`]: default fee schedules and dry-run based fee estimation
//! - [`PayloadAssembler`]: assigns counters, signs the watermarked payload and
//! tags it with the protocol
//! - [`TezosClient`]: drives the whole pipeline against a node, revealing the
//! signer's key when needed
//!
//! ## Example
//!
//! ```no_run
//! use tezos_core::types::{Tez, TezosProtocol};
//! use tezos_middleware::{fees::OperationFeePolicy, TezosClient};
//! use tezos_providers::{Http, Provider};
//! use tezos_signers::{Signer, Wallet};
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Provider::<Http>::try_from("http://localhost:8732")?;
//! let wallet: Wallet = "edsk3gUfUPyBSfrS9CCgmCiQsTCHGkviBDusMxDJstFtojtc1zcpsh".parse()?;
//! let client = TezosClient::new(provider, wallet, TezosProtocol::Carthage);
//!
//! let delegate = client.signer().address();
//! client.set_delegate(Some(delegate), OperationFeePolicy::Default).await?;
//! # Ok(())
//! # }
//! ```

pub mod fees;

mod factory;
pub use factory::OperationFactory;

mod assembler;
pub use assembler::{PayloadAssembler, PayloadError};

mod client;
pub use client::{ClientError, TezosClient};
