mod http;
pub use http::{Http, HttpClientError};

mod mock;
pub use mock::{MockRequest, MockTransport};

use crate::RawResponse;
use async_trait::async_trait;
use auto_impl::auto_impl;
use serde_json::Value;
use std::fmt::Debug;

#[async_trait]
#[auto_impl(&, Box, Arc)]
/// Trait which must be implemented by data transports to be used with the
/// Tezos node RPC provider.
///
/// Transports never fail: every outcome, including the absence of an HTTP
/// response, is reported through the returned [`RawResponse`]. They do not
/// retry.
pub trait Transport: Debug + Send + Sync {
    /// Sends a GET request for the RPC `path`, relative to the node root
    async fn get(&self, path: &str) -> RawResponse;

    /// Sends a POST request for the RPC `path` with `body` serialized as JSON
    async fn post(&self, path: &str, body: &Value) -> RawResponse;
}
