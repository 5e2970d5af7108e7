//! LWM2M TLV codec (OMA-TS-LightweightM2M §6.4.3).
//!
//! A self-describing, recursively nested type-length-value format used to
//! carry object instances between a bootstrap server and a device. See
//! [`header`] for the wire layout of a single entry, [`decode`] for parsing,
//! and [`encode`] for serialization.

mod decode;
mod encode;
mod header;
mod node;

pub use decode::{decode_all, decode_one};
pub use encode::encode_node;
pub use header::{Header, IdWidth};
pub use node::{NodeType, TlvNode};
