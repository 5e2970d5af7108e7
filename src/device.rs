//! Device state: identity, credentials, and readiness predicates.

use std::path::Path;
use std::sync::Arc;

use crate::cert::{cn_from_cert, TlsCertPair};
use crate::error::{LwM2MError, Result};
use crate::store::BlobStore;
use crate::url::{parse_coap_url, CoapUrl};

/// Holds account id, bootstrap identity/URL/credential, LWM2M
/// identity/URL/credential, and a handle to the blob store.
///
/// Mutated only by [`Device::adopt_lwm2m_credentials`] (driven by the
/// bootstrap session's credential reload) and by re-validation; all other
/// fields are fixed at construction.
pub struct Device {
    pub account_id: String,

    pub bootstrap_id: Option<String>,
    pub bootstrap_url: Option<CoapUrl>,
    pub bootstrap_cert: Option<TlsCertPair>,

    pub endpoint_name: Option<String>,
    pub lwm2m_url: Option<CoapUrl>,
    pub lwm2m_cert: Option<TlsCertPair>,

    pub store: Arc<dyn BlobStore>,
}

impl Device {
    /// Build a device from bootstrap credentials: the certificate CN becomes
    /// `bootstrap_id`, and the URL's `aid` becomes `account_id`.
    pub fn from_bootstrap_credentials(
        store: Arc<dyn BlobStore>,
        url: &str,
        cert_path: &Path,
        key_path: &Path,
    ) -> Result<Self> {
        let cert = TlsCertPair::load(cert_path, key_path)?;
        let bootstrap_id = cn_from_cert(&cert)?;
        let parsed_url = parse_coap_url(url)?;

        Ok(Self {
            account_id: parsed_url.account_id.clone(),
            bootstrap_id: Some(bootstrap_id),
            bootstrap_url: Some(parsed_url),
            bootstrap_cert: Some(cert),
            endpoint_name: None,
            lwm2m_url: None,
            lwm2m_cert: None,
            store,
        })
    }

    /// Build a device from LWM2M credentials: the certificate CN becomes
    /// `endpoint_name`.
    pub fn from_lwm2m_credentials(
        store: Arc<dyn BlobStore>,
        url: &str,
        cert_path: &Path,
        key_path: &Path,
    ) -> Result<Self> {
        let cert = TlsCertPair::load(cert_path, key_path)?;
        let endpoint_name = cn_from_cert(&cert)?;
        let parsed_url = parse_coap_url(url)?;

        Ok(Self {
            account_id: parsed_url.account_id.clone(),
            bootstrap_id: None,
            bootstrap_url: None,
            bootstrap_cert: None,
            endpoint_name: Some(endpoint_name),
            lwm2m_url: Some(parsed_url),
            lwm2m_cert: Some(cert),
            store,
        })
    }

    /// `true` iff `bootstrap_id`, `bootstrap_url`, and `bootstrap_cert` are
    /// all present.
    pub fn is_bootstrap_ready(&self) -> bool {
        self.bootstrap_id.is_some() && self.bootstrap_url.is_some() && self.bootstrap_cert.is_some()
    }

    /// `true` iff `endpoint_name`, `lwm2m_url`, and `lwm2m_cert` are all
    /// present.
    pub fn is_register_ready(&self) -> bool {
        self.endpoint_name.is_some() && self.lwm2m_url.is_some() && self.lwm2m_cert.is_some()
    }

    /// Error if not bootstrap-ready, naming the first missing field.
    pub fn require_bootstrap_ready(&self) -> Result<()> {
        if self.bootstrap_id.is_none() {
            return Err(LwM2MError::NotReady { field: "bootstrap_id" });
        }
        if self.bootstrap_url.is_none() {
            return Err(LwM2MError::NotReady { field: "bootstrap_url" });
        }
        if self.bootstrap_cert.is_none() {
            return Err(LwM2MError::NotReady { field: "bootstrap_cert" });
        }
        Ok(())
    }

    /// Error if not register-ready, naming the first missing field.
    pub fn require_register_ready(&self) -> Result<()> {
        if self.endpoint_name.is_none() {
            return Err(LwM2MError::NotReady { field: "endpoint_name" });
        }
        if self.lwm2m_url.is_none() {
            return Err(LwM2MError::NotReady { field: "lwm2m_url" });
        }
        if self.lwm2m_cert.is_none() {
            return Err(LwM2MError::NotReady { field: "lwm2m_cert" });
        }
        Ok(())
    }

    /// Populate the LWM2M fields from a freshly reloaded URL, certificate,
    /// and endpoint name, logging (non-fatal) if the account id or endpoint
    /// name diverge from what was already known.
    pub fn adopt_lwm2m_credentials(
        &mut self,
        url: CoapUrl,
        cert: TlsCertPair,
        endpoint_name: String,
    ) {
        if url.account_id != self.account_id {
            tracing::warn!(
                expected = %self.account_id,
                got = %url.account_id,
                "reloaded LWM2M URL aid does not match device account_id"
            );
        }
        if let Some(prior) = &self.endpoint_name {
            if *prior != endpoint_name {
                tracing::warn!(prior, new = %endpoint_name, "endpoint_name changed on reload");
            }
        }

        self.lwm2m_url = Some(url);
        self.lwm2m_cert = Some(cert);
        self.endpoint_name = Some(endpoint_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn empty_store() -> Arc<dyn BlobStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn fresh_device_is_neither_ready() {
        let device = Device {
            account_id: "a".into(),
            bootstrap_id: None,
            bootstrap_url: None,
            bootstrap_cert: None,
            endpoint_name: None,
            lwm2m_url: None,
            lwm2m_cert: None,
            store: empty_store(),
        };
        assert!(!device.is_bootstrap_ready());
        assert!(!device.is_register_ready());
        assert!(matches!(
            device.require_bootstrap_ready(),
            Err(LwM2MError::NotReady { field: "bootstrap_id" })
        ));
    }
}
