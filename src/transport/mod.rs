//! CoAP-over-DTLS transport abstraction.
//!
//! The session state machines in [`crate::session`] never touch DTLS or CoAP
//! wire bytes directly; they depend on the [`CoapSession`] trait below. The
//! real implementation ([`dtls::DtlsCoapSession`]) multiplexes a single DTLS
//! 1.2 connection between outbound requests and server-initiated ("inbound")
//! requests dispatched to registered path handlers. [`mock::MockCoapSession`]
//! provides the same contract in-process for tests.
//!
//! ```text
//! ┌───────────────────────────────┐
//! │      Bootstrap / Register      │
//! │           session               │
//! └────────────────┬────────────────┘
//!                  │ CoapSession
//!         ┌────────┴────────┐
//!         ▼                 ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │ DtlsCoapSession  │ │ MockCoapSession │
//! │ (webrtc-dtls +   │ │   (in-process)  │
//! │   coap-lite)     │ │                 │
//! └─────────────────┘ └─────────────────┘
//! ```

pub mod coap;
pub mod dtls;
#[cfg(test)]
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use crate::cert::TlsCertPair;
use crate::error::Result;

/// CoAP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// CoAP response code, restricted to the subset this client emits/expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Created,
    Deleted,
    Changed,
    BadRequest,
    Forbidden,
    MethodNotAllowed,
    UnsupportedContentFormat,
}

/// Content-Format option values used by this protocol.
pub mod content_format {
    pub const TEXT_PLAIN: u16 = 0;
    pub const LWM2M_TLV: u16 = 99;
    pub const CORE_LINK_FORMAT: u16 = 40;
}

/// The CoAP `Uri-Query` option number (RFC 7252 §5.10.1).
pub const URI_QUERY_OPTION: u16 = 15;

/// An inbound or outbound CoAP request.
#[derive(Debug, Clone)]
pub struct CoapRequest {
    pub method: Method,
    /// Path segments, e.g. `["0", "3", "1"]` for `/0/3/1`.
    pub path: Vec<String>,
    pub content_format: Option<u16>,
    pub queries: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A CoAP response.
#[derive(Debug, Clone)]
pub struct CoapResponse {
    pub code: ResponseCode,
    /// `Location-Path` option values, in order, for registration responses.
    pub location_path: Vec<String>,
    pub body: Vec<u8>,
}

impl CoapResponse {
    pub fn empty(code: ResponseCode) -> Self {
        Self {
            code,
            location_path: Vec::new(),
            body: Vec::new(),
        }
    }
}

/// A handler for inbound (server-initiated) requests under a registered path
/// prefix.
pub type InboundHandler =
    Box<dyn Fn(CoapRequest) -> Pin<Box<dyn Future<Output = CoapResponse> + Send>> + Send + Sync>;

/// A single DTLS-backed CoAP session multiplexing outbound requests with
/// inbound, server-initiated ones.
///
/// Implementors deliver inbound requests to the handler whose registered
/// path prefix matches, falling back to `4.03 Forbidden` for unmatched
/// paths, matching the mux contract in the bootstrap session design.
#[async_trait::async_trait]
pub trait CoapSession: Send {
    /// Send an outbound request and await the peer's response.
    async fn send(&mut self, request: CoapRequest) -> Result<CoapResponse>;

    /// Close the session. Safe to call more than once.
    async fn close(&mut self) -> Result<()>;
}

/// Dial options shared by bootstrap and registration sessions: peer
/// verification is always disabled and the extended master secret extension
/// is always required (see the design notes on why this is not configurable
/// per call).
pub struct DialOptions<'a> {
    pub host: &'a str,
    pub cert: &'a TlsCertPair,
    /// Path-prefix handlers dispatched for inbound requests, checked in
    /// order; the first prefix match wins.
    pub handlers: Vec<(&'static str, InboundHandler)>,
}
