//! Scripted transport for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::transport::{ApiRequest, RawResponse, Transport, TransportError};

pub(crate) struct FakeTransport {
    responses: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push_ok(&self, body: &str) {
        self.push(Ok(RawResponse::ok(body.as_bytes())));
    }

    pub(crate) fn push_bytes(&self, body: &[u8]) {
        self.push(Ok(RawResponse::ok(body)));
    }

    pub(crate) fn push_status(&self, status: u16) {
        self.push(Ok(RawResponse::with_status(status)));
    }

    pub(crate) fn push_error(&self, error: TransportError) {
        self.push(Err(error));
    }

    fn push(&self, response: Result<RawResponse, TransportError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    fn base_url(&self) -> &str {
        "https://fake.test"
    }

    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("no scripted response".to_string())))
    }
}
