//! In-process [`CoapSession`] stand-in for integration tests.
//!
//! A test drives a [`MockCoapSession`] two ways: it queues scripted
//! responses that `send` returns in order, and it calls [`MockCoapSession::push`]
//! to simulate the peer delivering an inbound request to whichever handler
//! was registered for the matching path prefix.

use std::collections::VecDeque;

use crate::error::{LwM2MError, Result};

use super::{CoapRequest, CoapResponse, CoapSession, InboundHandler};

/// A session with no real network activity: outbound sends are answered from
/// a pre-loaded queue, and inbound pushes are dispatched synchronously to the
/// matching registered handler.
pub struct MockCoapSession {
    handlers: Vec<(&'static str, InboundHandler)>,
    responses: VecDeque<Result<CoapResponse>>,
    pub sent: Vec<CoapRequest>,
    closed: bool,
}

impl MockCoapSession {
    pub fn new(handlers: Vec<(&'static str, InboundHandler)>) -> Self {
        Self {
            handlers,
            responses: VecDeque::new(),
            sent: Vec::new(),
            closed: false,
        }
    }

    /// Queue the response (or error) the next `send` call will return.
    pub fn queue_response(&mut self, response: Result<CoapResponse>) {
        self.responses.push_back(response);
    }

    /// Deliver `request` to whichever handler's prefix matches its first
    /// path segment, returning the handler's response. Panics if no handler
    /// matches — a test bug, not a runtime condition this type models.
    pub async fn push(&self, request: CoapRequest) -> CoapResponse {
        let first_segment = request.path.first().map(String::as_str).unwrap_or("");
        let handler = self
            .handlers
            .iter()
            .find(|(prefix, _)| *prefix == first_segment)
            .map(|(_, h)| h)
            .unwrap_or_else(|| panic!("no handler registered for path prefix {first_segment:?}"));
        handler(request).await
    }
}

#[async_trait::async_trait]
impl CoapSession for MockCoapSession {
    async fn send(&mut self, request: CoapRequest) -> Result<CoapResponse> {
        self.sent.push(request);
        self.responses
            .pop_front()
            .unwrap_or_else(|| Err(LwM2MError::TransportError("no scripted response queued".into())))
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
