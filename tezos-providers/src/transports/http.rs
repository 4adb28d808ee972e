use super::Transport;
use crate::RawResponse;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::{fmt::Debug, str::FromStr};
use thiserror::Error;
use tracing::trace;
use url::Url;

/// A Tezos node RPC client over HTTP.
///
/// # Example
///
/// ```no_run
/// use tezos_providers::{Http, Transport};
/// use std::str::FromStr;
///
/// # async fn foo() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = Http::from_str("http://localhost:8732")?;
/// let response = transport.get("chains/main/blocks/head/header").await;
/// assert_eq!(response.status, Some(200));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Http {
    client: Client,
    url: Url,
}

impl Debug for Http {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Http {{ url: {} }}", self.url)
    }
}

#[derive(Error, Debug)]
/// Error thrown when dealing with Http clients
pub enum HttpClientError {
    /// Thrown if the node URL cannot be parsed
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

impl Http {
    /// Initializes a new HTTP Client
    ///
    /// # Example
    ///
    /// ```
    /// use tezos_providers::Http;
    /// use url::Url;
    ///
    /// let url = Url::parse("http://localhost:8732").unwrap();
    /// let transport = Http::new(url);
    /// ```
    pub fn new(url: impl Into<Url>) -> Self {
        Self::new_with_client(url, Client::new())
    }

    /// Allows to customize the transport by providing your own http client
    pub fn new_with_client(url: impl Into<Url>, client: Client) -> Self {
        let mut url = url.into();
        // paths are joined relative to the node root, which must end in `/`
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Self { client, url }
    }

    /// The Url to which requests are made
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn send(&self, path: &str, build: impl FnOnce(Url) -> RequestBuilder) -> RawResponse {
        let url = match self.url.join(path.trim_start_matches('/')) {
            Ok(url) => url,
            Err(err) => return RawResponse::transport_error(err),
        };
        let res = match build(url).send().await {
            Ok(res) => res,
            Err(err) => return RawResponse::transport_error(err),
        };
        let status = res.status().as_u16();
        match res.bytes().await {
            Ok(body) => {
                trace!(status, body = %String::from_utf8_lossy(&body), "rx");
                RawResponse::new(status, body)
            }
            Err(err) => {
                RawResponse { status: Some(status), body: None, error: Some(err.to_string()) }
            }
        }
    }
}

#[async_trait]
impl Transport for Http {
    async fn get(&self, path: &str) -> RawResponse {
        self.send(path, |url| self.client.get(url)).await
    }

    async fn post(&self, path: &str, body: &Value) -> RawResponse {
        self.send(path, |url| self.client.post(url).json(body)).await
    }
}

impl FromStr for Http {
    type Err = HttpClientError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Ok(Http::new(Url::parse(src)?))
    }
}

impl TryFrom<&str> for Http {
    type Error = HttpClientError;

    fn try_from(src: &str) -> Result<Self, Self::Error> {
        src.parse()
    }
}
