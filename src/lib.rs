//! # LWM2M bootstrap/registration client
//!
//! A DTLS-backed CoAP client implementing the OMA Lightweight M2M bootstrap
//! and registration exchanges: a device dials a bootstrap server, receives
//! object instances pushed as LWM2M TLV, persists them, and reloads its
//! operational credentials once bootstrapping finishes. It then dials the
//! LWM2M server with those credentials, registers, and deregisters.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────────┐
//! │  CLI (bin)    │───▶│  Device (identity/ │───▶│ Bootstrap / Register  │
//! │               │     │  credentials/store)│     │      sessions         │
//! └──────────────┘     └───────────────────┘     └───────────┬──────────┘
//!                                                              │ CoapSession
//!                                                   ┌──────────┴──────────┐
//!                                                   │  DTLS + CoAP         │
//!                                                   │  transport           │
//!                                                   └──────────┬──────────┘
//!                                                              │
//!                                                   ┌──────────┴──────────┐
//!                                                   │   TLV codec          │
//!                                                   │   (object writes)    │
//!                                                   └──────────┬──────────┘
//!                                                              │
//!                                                      ┌───────┴───────┐
//!                                                      │  Blob store    │
//!                                                      │ (memory / fs)  │
//!                                                      └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`tlv`]: the LWM2M TLV binary codec
//! - [`store`]: canonical-path blob store, memory and filesystem backends
//! - [`device`]: identity, credentials, and readiness predicates
//! - [`session`]: bootstrap and registration state machines
//! - [`transport`]: the DTLS/CoAP session abstraction and its implementations
//! - [`url`]: CoAP URL parsing
//! - [`cert`]: certificate/key loading and CN extraction
//! - [`config`]: layered runtime configuration
//! - [`error`]: error types and the result alias

pub mod cert;
pub mod config;
pub mod device;
pub mod error;
pub mod session;
pub mod store;
pub mod tlv;
pub mod transport;
pub mod url;

pub use config::Config;
pub use device::Device;
pub use error::{LwM2MError, Result};
pub use tlv::{decode_all, decode_one, encode_node, Header, IdWidth, NodeType, TlvNode};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
