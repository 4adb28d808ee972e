//! Classification of raw node responses.
//!
//! The handler only looks at the HTTP envelope. What a successful body means
//! is left to a [`ResponseDecoder`] chosen per request.
use crate::ProviderError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::{fmt, marker::PhantomData};

/// The outcome of one request as reported by a transport.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code, when a response was received
    pub status: Option<u16>,
    /// Response body, when one was read
    pub body: Option<Bytes>,
    /// Transport level error description
    pub error: Option<String>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status: Some(status), body: Some(body.into()), error: None }
    }

    /// A 200 response carrying `value` as JSON
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(200, serde_json::to_vec(value)?))
    }

    pub fn transport_error(error: impl ToString) -> Self {
        Self { status: None, body: None, error: Some(error.to_string()) }
    }

    /// The body as text, if it is valid UTF-8
    pub fn text(&self) -> Option<String> {
        let body = self.body.as_ref()?;
        std::str::from_utf8(body).ok().map(str::to_owned)
    }
}

/// Where a request/response exchange ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseState<T> {
    /// Nothing has been received yet
    Pending,
    /// A non-2xx status
    HttpError { status: u16, body: Option<String> },
    /// No HTTP response, only a transport error
    TransportError(String),
    /// A 2xx status whose body is missing or rejected by the decoder
    DecodeError { reason: String, body: Option<String> },
    Success(T),
}

impl<T> ResponseState<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseState::Success(_))
    }

    /// Converts the state into the error taxonomy. HTTP errors are split into
    /// client (4xx), server (5xx) and everything else.
    pub fn into_result(self) -> Result<T, ProviderError> {
        match self {
            ResponseState::Success(value) => Ok(value),
            ResponseState::Pending => {
                Err(ProviderError::UnknownResponse { status: None, body: None })
            }
            ResponseState::HttpError { status, body } => Err(match status {
                400..=499 => ProviderError::MalformedRequest { status, body },
                500..=599 => ProviderError::ServerFailure { status, body },
                _ => ProviderError::UnknownResponse { status: Some(status), body },
            }),
            ResponseState::TransportError(error) => Err(ProviderError::TransportFailure(error)),
            ResponseState::DecodeError { reason, body } => {
                Err(ProviderError::DecodeFailure { reason, body })
            }
        }
    }
}

/// Decodes the body of a successful response.
pub trait ResponseDecoder<T> {
    fn decode(&self, body: &[u8]) -> Option<T>;
}

/// Deserializes a JSON body into `T`
pub struct JsonDecoder<T>(PhantomData<fn() -> T>);

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonDecoder")
    }
}

impl<T: DeserializeOwned> ResponseDecoder<T> for JsonDecoder<T> {
    fn decode(&self, body: &[u8]) -> Option<T> {
        serde_json::from_slice(body).ok()
    }
}

/// Accepts a JSON string, or bare non-empty UTF-8 text
#[derive(Clone, Copy, Debug, Default)]
pub struct StringDecoder;

impl ResponseDecoder<String> for StringDecoder {
    fn decode(&self, body: &[u8]) -> Option<String> {
        if let Ok(value) = serde_json::from_slice::<String>(body) {
            return Some(value)
        }
        let text = std::str::from_utf8(body).ok()?.trim();
        (!text.is_empty()).then(|| text.to_owned())
    }
}

/// Accepts a JSON number or a JSON string of decimal digits, as the node
/// renders counters and balances
#[derive(Clone, Copy, Debug, Default)]
pub struct IntegerDecoder;

impl ResponseDecoder<u64> for IntegerDecoder {
    fn decode(&self, body: &[u8]) -> Option<u64> {
        match serde_json::from_slice::<serde_json::Value>(body).ok()? {
            serde_json::Value::Number(number) => number.as_u64(),
            serde_json::Value::String(digits) => digits.parse().ok(),
            _ => None,
        }
    }
}

/// Classifies raw responses and runs the decoder on successful ones.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResponseHandler;

impl ResponseHandler {
    pub fn classify<T, D: ResponseDecoder<T> + ?Sized>(
        raw: &RawResponse,
        decoder: &D,
    ) -> ResponseState<T> {
        if let Some(status) = raw.status {
            if !(200..300).contains(&status) {
                return ResponseState::HttpError { status, body: raw.text() }
            }
        }
        if let Some(error) = &raw.error {
            return ResponseState::TransportError(error.clone())
        }
        let status = match raw.status {
            Some(status) => status,
            None => return ResponseState::Pending,
        };
        match &raw.body {
            None => ResponseState::DecodeError {
                reason: format!("HTTP {status} response without a body"),
                body: None,
            },
            Some(body) => match decoder.decode(body) {
                Some(value) => ResponseState::Success(value),
                None => ResponseState::DecodeError {
                    reason: format!("unexpected body for HTTP {status} response"),
                    body: raw.text(),
                },
            },
        }
    }

    pub fn handle<T, D: ResponseDecoder<T> + ?Sized>(
        raw: &RawResponse,
        decoder: &D,
    ) -> Result<T, ProviderError> {
        Self::classify(raw, decoder).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Header {
        level: u64,
    }

    #[test]
    fn not_found_is_a_malformed_request_with_body() {
        let raw = RawResponse::new(404, "No service found at this URL");
        let err = ResponseHandler::handle(&raw, &JsonDecoder::<Header>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRequest);
        match err {
            ProviderError::MalformedRequest { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body.as_deref(), Some("No service found at this URL"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unavailable_is_a_server_failure() {
        let raw = RawResponse::new(503, "");
        let err = ResponseHandler::handle(&raw, &JsonDecoder::<Header>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ServerFailure);
    }

    #[test]
    fn other_statuses_are_unknown() {
        let raw = RawResponse::new(302, "moved");
        let err = ResponseHandler::handle(&raw, &StringDecoder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownResponse);
    }

    #[test]
    fn binary_error_bodies_are_dropped() {
        let raw = RawResponse::new(400, vec![0xff, 0xfe]);
        assert_eq!(
            ResponseHandler::classify(&raw, &StringDecoder),
            ResponseState::HttpError { status: 400, body: None }
        );
    }

    #[test]
    fn non_json_success_is_a_decode_failure() {
        let raw = RawResponse::new(200, "<html>gateway</html>");
        let err = ResponseHandler::handle(&raw, &JsonDecoder::<Header>::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecodeFailure);

        let raw = RawResponse { status: Some(200), body: None, error: None };
        assert!(matches!(
            ResponseHandler::classify(&raw, &JsonDecoder::<Header>::new()),
            ResponseState::DecodeError { .. }
        ));
    }

    #[test]
    fn valid_success_decodes() {
        let raw = RawResponse::new(200, r#"{"level": 42, "proto": 7}"#);
        assert_eq!(
            ResponseHandler::handle(&raw, &JsonDecoder::<Header>::new()).unwrap(),
            Header { level: 42 }
        );
    }

    #[test]
    fn transport_errors_without_response() {
        let raw = RawResponse::transport_error("connection refused");
        assert_eq!(
            ResponseHandler::classify(&raw, &StringDecoder),
            ResponseState::TransportError("connection refused".to_owned())
        );
        assert_eq!(
            ResponseHandler::classify(&RawResponse::default(), &StringDecoder),
            ResponseState::Pending
        );
    }

    #[test]
    fn status_wins_over_transport_error() {
        let raw = RawResponse {
            status: Some(500),
            body: None,
            error: Some("body read interrupted".to_owned()),
        };
        assert_eq!(
            ResponseHandler::handle(&raw, &StringDecoder).unwrap_err().kind(),
            ErrorKind::ServerFailure
        );
    }

    #[test]
    fn decoders() {
        assert_eq!(StringDecoder.decode(br#""ooHash""#), Some("ooHash".to_owned()));
        assert_eq!(StringDecoder.decode(b"plain\n"), Some("plain".to_owned()));
        assert_eq!(StringDecoder.decode(b"  "), None);
        assert_eq!(IntegerDecoder.decode(br#""1234""#), Some(1234));
        assert_eq!(IntegerDecoder.decode(b"77"), Some(77));
        assert_eq!(IntegerDecoder.decode(br#""-1""#), None);
        assert_eq!(IntegerDecoder.decode(b"null"), None);
    }
}
