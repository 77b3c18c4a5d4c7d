//! Scripted transport for backend and session tests.

use crate::errors::TransportError;
use crate::transport::{Request, Transport};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Default)]
struct MockState {
    routes: HashMap<String, Result<Vec<u8>, TransportError>>,
    queued: VecDeque<Result<Vec<u8>, TransportError>>,
    requests: Vec<Request>,
}

/// Answers requests from per-path routes; one-shot responses take precedence
#[derive(Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request to `path` with `body`
    pub fn respond(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.state.lock().unwrap().routes.insert(path.to_string(), Ok(body.into()));
    }

    /// Fail every request to `path`
    pub fn fail(&self, path: &str, err: TransportError) {
        self.state.lock().unwrap().routes.insert(path.to_string(), Err(err));
    }

    /// Answer the next request, whatever its path
    pub fn push_response(&self, result: Result<Vec<u8>, TransportError>) {
        self.state.lock().unwrap().queued.push_back(result);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if let Some(result) = state.queued.pop_front() {
            return result;
        }
        state
            .routes
            .get(&request.path)
            .cloned()
            .unwrap_or(Err(TransportError::HttpStatus { status: 404 }))
    }
}
