//! Error types for the LWM2M bootstrap/registration client.
//!
//! Errors are grouped by where they surface: configuration and credential
//! problems are caught before any network activity, transport/protocol
//! errors come back from a session once it is underway, and the TLV/store
//! variants are returned by the codec and blob store respectively.

use thiserror::Error;

/// Errors produced by the LWM2M client.
#[derive(Error, Debug)]
pub enum LwM2MError {
    /// A CLI flag, URL, or other externally supplied configuration value
    /// was missing or malformed.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A certificate or private key failed to parse, or lacked a CN.
    #[error("invalid credential: {0}")]
    CredentialInvalid(String),

    /// A readiness predicate (bootstrap-ready / register-ready) failed.
    #[error("device not ready: missing {field}")]
    NotReady {
        /// Name of the missing field.
        field: &'static str,
    },

    /// DTLS dial, I/O, or CoAP codec failure.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Unexpected response code, missing option, or malformed CoAP message.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Fewer bytes remained than a TLV header/identifier/length/value demanded.
    #[error("TLV input truncated: {0}")]
    TlvShort(String),

    /// A child TLV parse left bytes inside the parent's declared value range,
    /// or a container/non-container invariant was violated.
    #[error("TLV structure error: {0}")]
    TlvStructure(String),

    /// Blob store I/O failure or missing key.
    #[error("store error: {0}")]
    StoreError(String),

    /// Requested key is absent from the blob store.
    #[error("store key not found: {0}")]
    NotFound(String),

    /// Bootstrap-finish did not arrive within the session timeout.
    #[error("timed out waiting for bootstrap-finish")]
    Timeout,

    /// The caller's cancellation signal fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Filesystem I/O failure not otherwise classified.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the LWM2M client.
pub type Result<T> = std::result::Result<T, LwM2MError>;

impl LwM2MError {
    /// `true` for errors a caller might reasonably retry (transport hiccups,
    /// timeouts) as opposed to configuration/credential mistakes that will
    /// fail again unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LwM2MError::TransportError(_) | LwM2MError::Timeout | LwM2MError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_timeout_are_retryable() {
        assert!(LwM2MError::TransportError("reset".into()).is_retryable());
        assert!(LwM2MError::Timeout.is_retryable());
    }

    #[test]
    fn config_and_credential_errors_are_not_retryable() {
        assert!(!LwM2MError::ConfigInvalid("bad url".into()).is_retryable());
        assert!(!LwM2MError::NotReady { field: "bootstrap_cert" }.is_retryable());
    }
}
