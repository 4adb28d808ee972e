#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]
//! # Clients for interacting with Tezos nodes
//!
//! This crate provides an asynchronous client for the Tezos node RPC, built on
//! a pluggable [`Transport`].
//!
//! For more documentation on the available calls, refer to the [`Provider`](crate::Provider)
//! struct.
//!
//! # Examples
//!
//! ```no_run
//! use tezos_providers::{Http, Provider};
//!
//! # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Provider::<Http>::try_from("http://localhost:8732")?;
//!
//! let header = provider.get_block_header().await?;
//! println!("head is {} at level {}", header.hash, header.level);
//!
//! let address = "tz1KqTpEZ7Yob7QbPE4Hy4Wo8fHG8LhKxZSx".parse()?;
//! let metadata = provider.fetch_operation_metadata(&address).await?;
//! println!("next counter is {}", metadata.counter + 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Responses
//!
//! Every RPC answer goes through the [`ResponseHandler`], which turns the raw
//! status, body and transport outcome into either the decoded value or a
//! [`ProviderError`]. Errors can be matched coarsely through [`ErrorKind`].
//!
//! ```
//! use tezos_providers::{ErrorKind, IntegerDecoder, RawResponse, ResponseHandler};
//!
//! let ok = RawResponse::new(200, "\"42\"");
//! assert_eq!(ResponseHandler::handle(&ok, &IntegerDecoder).unwrap(), 42);
//!
//! let missing = RawResponse::new(404, "not found");
//! let err = ResponseHandler::handle(&missing, &IntegerDecoder).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::MalformedRequest);
//! ```
mod transports;
pub use transports::*;

mod provider;
pub use provider::Provider;

mod errors;
pub use errors::{ErrorKind, ProviderError};

mod response;
pub use response::{
    IntegerDecoder, JsonDecoder, RawResponse, ResponseDecoder, ResponseHandler, ResponseState,
    StringDecoder,
};

/// Node RPC response types
pub mod types;
