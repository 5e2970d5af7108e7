//! CoAP URL parsing: `coaps://host:port?aid=<account>[&k=v...]`.

use url::Url;

use crate::error::{LwM2MError, Result};

/// A parsed CoAP URL: scheme checked, host authority extracted, `aid`
/// pulled out as the account id, remaining query parameters preserved in
/// their original order for replay during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapUrl {
    /// Original string, kept for logging/diagnostics.
    pub raw: String,
    /// `host:port` authority.
    pub host: String,
    /// The single required `aid` query value.
    pub account_id: String,
    /// Every query parameter except `aid`, in source order. Multi-valued
    /// keys appear once per value.
    pub query: Vec<(String, String)>,
}

/// Parse and validate a CoAP URL: scheme must be `coaps`, and the query
/// string must contain exactly one `aid` value.
pub fn parse_coap_url(s: &str) -> Result<CoapUrl> {
    let url = Url::parse(s).map_err(|e| LwM2MError::ConfigInvalid(format!("bad URL {s}: {e}")))?;

    if url.scheme() != "coaps" {
        return Err(LwM2MError::ConfigInvalid(format!(
            "unsupported scheme {:?}, expected coaps",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| LwM2MError::ConfigInvalid(format!("URL missing host: {s}")))?;
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut account_id = None;
    let mut query = Vec::new();
    for (k, v) in url.query_pairs() {
        if k == "aid" {
            if account_id.is_some() {
                return Err(LwM2MError::ConfigInvalid(format!(
                    "duplicate aid query parameter: {s}"
                )));
            }
            account_id = Some(v.into_owned());
        } else {
            query.push((k.into_owned(), v.into_owned()));
        }
    }

    let account_id = account_id
        .ok_or_else(|| LwM2MError::ConfigInvalid(format!("missing aid query parameter: {s}")))?;

    Ok(CoapUrl {
        raw: s.to_string(),
        host,
        account_id,
        query,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_extracts_host_and_account() {
        let parsed = parse_coap_url("coaps://bs.example.net:5684?aid=acct-42").unwrap();
        assert_eq!(parsed.host, "bs.example.net:5684");
        assert_eq!(parsed.account_id, "acct-42");
        assert!(parsed.query.is_empty());
    }

    #[test]
    fn rejects_wrong_scheme() {
        let err = parse_coap_url("http://x?aid=a").unwrap_err();
        assert!(matches!(err, LwM2MError::ConfigInvalid(_)));
    }

    #[test]
    fn rejects_duplicate_aid() {
        let err = parse_coap_url("coaps://x?aid=a&aid=b").unwrap_err();
        assert!(matches!(err, LwM2MError::ConfigInvalid(_)));
    }

    #[test]
    fn rejects_missing_aid() {
        let err = parse_coap_url("coaps://x").unwrap_err();
        assert!(matches!(err, LwM2MError::ConfigInvalid(_)));
    }

    #[test]
    fn preserves_other_query_parameters_in_order() {
        let parsed = parse_coap_url("coaps://x?aid=a&lt=300&b=2").unwrap();
        assert_eq!(
            parsed.query,
            vec![("lt".to_string(), "300".to_string()), ("b".to_string(), "2".to_string())]
        );
    }
}
