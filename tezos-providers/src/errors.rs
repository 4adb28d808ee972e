use std::fmt;
use tezos_core::utils::ForgeError;
use thiserror::Error;

/// Coarse classification of every failure the client surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The node rejected the request (HTTP 4xx, or an operation the protocol
    /// refused to apply)
    MalformedRequest,
    /// The node failed while handling the request (HTTP 5xx)
    ServerFailure,
    /// No HTTP response was received
    TransportFailure,
    /// A response arrived but could not be decoded
    DecodeFailure,
    /// A response outside of every expected shape
    UnknownResponse,
    /// The signer could not produce a signature
    SigningUnavailable,
    /// Fees could not be estimated
    FeeEstimationFailure,
    /// The operation counter is stale or ahead of the chain
    CounterConflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
/// An error thrown when making a call to the node
pub enum ProviderError {
    /// HTTP 4xx, with the response body when it was text
    #[error("malformed request (HTTP {status}): {}", body.as_deref().unwrap_or_default())]
    MalformedRequest { status: u16, body: Option<String> },

    /// HTTP 5xx, with the response body when it was text
    #[error("server failure (HTTP {status}): {}", body.as_deref().unwrap_or_default())]
    ServerFailure { status: u16, body: Option<String> },

    /// Any other status, or no status at all
    #[error("unknown response (HTTP {status:?}): {}", body.as_deref().unwrap_or_default())]
    UnknownResponse { status: Option<u16>, body: Option<String> },

    /// The request never produced an HTTP response
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// A 2xx response whose body is missing or not what the request expects
    #[error("failed to decode response: {reason}")]
    DecodeFailure { reason: String, body: Option<String> },

    /// The node dry-ran or pre-applied the operation and refused it
    #[error("operation failed: {}", errors.join(", "))]
    OperationFailed { errors: Vec<String> },

    /// The node reported `counter_in_the_past` or `counter_in_the_future`
    #[error("counter conflict: {0}")]
    CounterConflict(String),

    /// Error in underlying lib `serde_json`
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    /// The payload could not be forged
    #[error(transparent)]
    Forge(#[from] ForgeError),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::MalformedRequest { .. } |
            ProviderError::OperationFailed { .. } |
            ProviderError::Forge(_) => ErrorKind::MalformedRequest,
            ProviderError::ServerFailure { .. } => ErrorKind::ServerFailure,
            ProviderError::UnknownResponse { .. } => ErrorKind::UnknownResponse,
            ProviderError::TransportFailure(_) => ErrorKind::TransportFailure,
            ProviderError::DecodeFailure { .. } | ProviderError::SerdeJson(_) => {
                ErrorKind::DecodeFailure
            }
            ProviderError::CounterConflict(_) => ErrorKind::CounterConflict,
        }
    }

    /// Promotes errors mentioning a counter mismatch to [`ProviderError::CounterConflict`]
    pub(crate) fn detect_counter_conflict(self) -> Self {
        let conflict = match &self {
            ProviderError::OperationFailed { errors } => {
                errors.iter().find(|id| is_counter_error(id)).cloned()
            }
            ProviderError::ServerFailure { body: Some(body), .. } |
            ProviderError::MalformedRequest { body: Some(body), .. }
                if is_counter_error(body) =>
            {
                Some(body.clone())
            }
            _ => None,
        };
        conflict.map(ProviderError::CounterConflict).unwrap_or(self)
    }
}

fn is_counter_error(text: &str) -> bool {
    text.contains("counter_in_the_past") || text.contains("counter_in_the_future")
}
