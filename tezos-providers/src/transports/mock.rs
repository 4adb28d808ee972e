use super::Transport;
use crate::RawResponse;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

/// A request recorded by [`MockTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockRequest {
    Get(String),
    Post(String, Value),
}

impl MockRequest {
    pub fn path(&self) -> &str {
        match self {
            MockRequest::Get(path) | MockRequest::Post(path, _) => path,
        }
    }
}

#[derive(Clone, Debug, Default)]
/// Mock transport used in test environments.
///
/// Responses are served in the order they were pushed. Running out of
/// responses is reported as a transport error.
pub struct MockTransport {
    requests: Arc<Mutex<VecDeque<MockRequest>>>,
    responses: Arc<Mutex<VecDeque<RawResponse>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str) -> RawResponse {
        self.respond(MockRequest::Get(path.to_owned()))
    }

    async fn post(&self, path: &str, body: &Value) -> RawResponse {
        self.respond(MockRequest::Post(path.to_owned(), body.clone()))
    }
}

impl MockTransport {
    /// Instantiates a mock transport
    pub fn new() -> Self {
        Self::default()
    }

    fn respond(&self, request: MockRequest) -> RawResponse {
        lock(&self.requests).push_back(request);
        lock(&self.responses).pop_front().unwrap_or_else(|| {
            RawResponse::transport_error("empty responses array, please push some responses")
        })
    }

    /// Pushes `data` as a 200 JSON response
    pub fn push<T: Serialize>(&self, data: T) -> Result<(), serde_json::Error> {
        self.push_response(RawResponse::json(&data)?);
        Ok(())
    }

    /// Pushes an arbitrary response
    pub fn push_response(&self, response: RawResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Pops the oldest recorded request
    pub fn pop_request(&self) -> Option<MockRequest> {
        lock(&self.requests).pop_front()
    }

    /// Every request recorded so far, oldest first
    pub fn requests(&self) -> Vec<MockRequest> {
        lock(&self.requests).iter().cloned().collect()
    }

    /// Checks that the oldest recorded request targeted `path`
    pub fn assert_request(&self, path: &str) -> MockRequest {
        match self.pop_request() {
            Some(request) => {
                assert_eq!(request.path(), path);
                request
            }
            None => panic!("no request recorded, expected one for {path}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn serves_responses_in_order() {
        let mock = MockTransport::new();
        mock.push(json!("first")).unwrap();
        mock.push_response(RawResponse::new(404, "missing"));

        assert_eq!(mock.get("a").await.body.unwrap(), &br#""first""#[..]);
        assert_eq!(mock.post("b", &json!({"x": 1})).await.status, Some(404));

        mock.assert_request("a");
        assert_eq!(mock.assert_request("b"), MockRequest::Post("b".to_owned(), json!({"x": 1})));
        assert_eq!(mock.pop_request(), None);
    }

    #[tokio::test]
    async fn empty_responses() {
        let mock = MockTransport::new();
        let response = mock.get("chains/main/blocks/head").await;
        assert_eq!(response.status, None);
        assert!(response.error.unwrap().contains("empty responses"));
    }
}
