//! Canonical resource path: `/<objectID>/<instanceID>/<resourceID>`.

use crate::error::{LwM2MError, Result};

/// Build the canonical path for a resource. No leading zeros, decimal only.
pub fn canonical_path(object_id: u16, instance_id: u16, resource_id: u16) -> String {
    format!("/{object_id}/{instance_id}/{resource_id}")
}

/// Parse a canonical path back into its three components.
pub fn parse_canonical_path(path: &str) -> Result<(u16, u16, u16)> {
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| LwM2MError::ProtocolError(format!("path missing leading slash: {path}")))?;
    let mut parts = rest.split('/');

    let mut next = |label: &str| -> Result<u16> {
        let raw = parts
            .next()
            .ok_or_else(|| LwM2MError::ProtocolError(format!("path missing {label}: {path}")))?;
        if raw.len() > 1 && raw.starts_with('0') {
            return Err(LwM2MError::ProtocolError(format!(
                "leading zero in {label}: {path}"
            )));
        }
        raw.parse::<u16>()
            .map_err(|e| LwM2MError::ProtocolError(format!("bad {label} in {path}: {e}")))
    };

    let object_id = next("objectID")?;
    let instance_id = next("instanceID")?;
    let resource_id = next("resourceID")?;

    if parts.next().is_some() {
        return Err(LwM2MError::ProtocolError(format!(
            "trailing path segments: {path}"
        )));
    }

    Ok((object_id, instance_id, resource_id))
}

/// Escape a canonical path into a flat filesystem-safe filename.
pub(crate) fn escape_for_filesystem(key: &str) -> String {
    key.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_path_formats_three_segments() {
        assert_eq!(canonical_path(0, 0, 1), "/0/0/1");
    }

    #[test]
    fn parse_roundtrips_canonical_path() {
        assert_eq!(parse_canonical_path("/0/0/1").unwrap(), (0, 0, 1));
    }

    #[test]
    fn parse_rejects_leading_zero() {
        assert!(parse_canonical_path("/0/01/1").is_err());
    }

    #[test]
    fn escape_replaces_every_slash() {
        assert_eq!(escape_for_filesystem("/0/0/1"), "_0_0_1");
    }
}
