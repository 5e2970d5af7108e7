//! Certificate and private key loading/validation.

use std::fs;
use std::path::Path;

use asn1_rs::{FromDer, Sequence};
use x509_parser::prelude::*;

use crate::error::{LwM2MError, Result};

/// A certificate plus its private key, both in DER.
#[derive(Debug, Clone)]
pub struct TlsCertPair {
    pub cert_der: Vec<u8>,
    pub key_der: Vec<u8>,
}

impl TlsCertPair {
    /// Load a certificate/key pair from disk, accepting either PEM or raw DER
    /// for each file.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self> {
        let cert_der = load_der(cert_path, "CERTIFICATE")?;
        let key_der = load_der(key_path, "PRIVATE KEY")?;

        // Validate eagerly so load-time failures surface before dial time.
        let _ = X509Certificate::from_der(&cert_der)
            .map_err(|e| LwM2MError::CredentialInvalid(format!("invalid certificate: {e}")))?;

        Ok(Self { cert_der, key_der })
    }
}

/// Read `path`, interpreting its contents as PEM if it parses as such,
/// otherwise treating the raw bytes as DER.
fn load_der(path: &Path, pem_tag: &str) -> Result<Vec<u8>> {
    let raw = fs::read(path)?;
    if raw.starts_with(b"-----BEGIN") {
        let mut cursor = raw.as_slice();
        loop {
            match rustls_pemfile::read_one(&mut cursor).map_err(|e| {
                LwM2MError::CredentialInvalid(format!("malformed PEM in {path:?}: {e}"))
            })? {
                Some(rustls_pemfile::Item::X509Certificate(der)) if pem_tag == "CERTIFICATE" => {
                    return Ok(der.to_vec())
                }
                Some(rustls_pemfile::Item::Pkcs8Key(der)) if pem_tag == "PRIVATE KEY" => {
                    return Ok(der.to_vec())
                }
                Some(_) => continue,
                None => {
                    return Err(LwM2MError::CredentialInvalid(format!(
                        "no {pem_tag} block found in {path:?}"
                    )))
                }
            }
        }
    } else {
        Ok(raw)
    }
}

/// Structurally validate a PKCS#8 private key: a `PrivateKeyInfo` is a DER
/// `SEQUENCE` with nothing trailing it. This does not validate the
/// algorithm identifier or key material itself, only that the bytes are a
/// well-formed top-level DER SEQUENCE, catching garbage pushed in place of
/// a real key before it reaches the DTLS handshake.
pub fn validate_pkcs8_key_der(key_der: &[u8]) -> Result<()> {
    let (rest, _seq) = Sequence::from_der(key_der)
        .map_err(|e| LwM2MError::CredentialInvalid(format!("invalid PKCS#8 key DER: {e}")))?;
    if !rest.is_empty() {
        return Err(LwM2MError::CredentialInvalid(
            "PKCS#8 key has trailing bytes after the DER SEQUENCE".into(),
        ));
    }
    Ok(())
}

/// Extract `Subject.CommonName` from the certificate half of a pair.
pub fn cn_from_cert(pair: &TlsCertPair) -> Result<String> {
    let (_, cert) = X509Certificate::from_der(&pair.cert_der)
        .map_err(|e| LwM2MError::CredentialInvalid(format!("invalid certificate: {e}")))?;

    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .ok_or_else(|| LwM2MError::CredentialInvalid("certificate has no CN".into()))
}
