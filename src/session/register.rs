//! Registration session: posts the registration directory, then immediately
//! deregisters.

use std::future::Future;
use std::pin::Pin;

use crate::device::Device;
use crate::error::{LwM2MError, Result};
use crate::transport::{content_format, CoapRequest, CoapSession, DialOptions, Method, ResponseCode};

const LINK_FORMAT_BODY: &[u8] = b"</1>,</2>,</3>,</4>,</5>";

/// Dial with the LWM2M credential, register, and immediately deregister.
pub async fn register(device: &Device) -> Result<()> {
    device.require_register_ready()?;

    let lwm2m_url = device.lwm2m_url.as_ref().expect("checked by require_register_ready");
    let lwm2m_cert = device.lwm2m_cert.as_ref().expect("checked by require_register_ready");
    let endpoint_name = device
        .endpoint_name
        .as_ref()
        .expect("checked by require_register_ready");

    let options = DialOptions {
        host: &lwm2m_url.host,
        cert: lwm2m_cert,
        handlers: Vec::new(),
    };

    let endpoint_name = endpoint_name.clone();
    let query = lwm2m_url.query.clone();

    super::with_session(options, move |session| {
        Box::pin(async move { run_registration(session, &endpoint_name, &query).await })
            as Pin<Box<dyn Future<Output = Result<()>> + Send>>
    })
    .await
}

async fn run_registration(
    session: &mut dyn CoapSession,
    endpoint_name: &str,
    url_query: &[(String, String)],
) -> Result<()> {
    let mut queries = vec![("ep".to_string(), endpoint_name.to_string())];
    queries.extend(url_query.iter().cloned());

    let request = CoapRequest {
        method: Method::Post,
        path: vec!["rd".to_string()],
        content_format: Some(content_format::CORE_LINK_FORMAT),
        queries,
        body: LINK_FORMAT_BODY.to_vec(),
    };

    let response = session.send(request).await?;
    if response.code != ResponseCode::Created {
        return Err(LwM2MError::ProtocolError(format!(
            "POST /rd expected 2.01 Created, got {:?}",
            response.code
        )));
    }
    if response.location_path.is_empty() {
        return Err(LwM2MError::ProtocolError(
            "registration response missing Location-Path".into(),
        ));
    }

    let delete_request = CoapRequest {
        method: Method::Delete,
        path: response.location_path,
        content_format: None,
        queries: Vec::new(),
        body: Vec::new(),
    };
    let delete_response = session.send(delete_request).await?;
    if delete_response.code != ResponseCode::Deleted {
        return Err(LwM2MError::ProtocolError(format!(
            "DELETE registration location expected 2.02 Deleted, got {:?}",
            delete_response.code
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockCoapSession;
    use crate::transport::CoapResponse;

    #[tokio::test]
    async fn happy_path_registers_then_deletes_location() {
        let mut session = MockCoapSession::new(Vec::new());
        session.queue_response(Ok(CoapResponse {
            code: ResponseCode::Created,
            location_path: vec!["rd".to_string(), "abc123".to_string()],
            body: Vec::new(),
        }));
        session.queue_response(Ok(CoapResponse::empty(ResponseCode::Deleted)));

        let query = vec![("lt".to_string(), "300".to_string())];
        run_registration(&mut session, "node-1", &query).await.unwrap();

        assert_eq!(session.sent.len(), 2);
        assert_eq!(
            session.sent[0].queries,
            vec![("ep".to_string(), "node-1".to_string()), ("lt".to_string(), "300".to_string())]
        );
        assert_eq!(session.sent[1].path, vec!["rd".to_string(), "abc123".to_string()]);
    }

    #[tokio::test]
    async fn non_created_response_is_protocol_error() {
        let mut session = MockCoapSession::new(Vec::new());
        session.queue_response(Ok(CoapResponse::empty(ResponseCode::BadRequest)));

        let err = run_registration(&mut session, "node-1", &[]).await.unwrap_err();
        assert!(matches!(err, LwM2MError::ProtocolError(_)));
    }

    #[tokio::test]
    async fn non_deleted_delete_response_is_protocol_error() {
        let mut session = MockCoapSession::new(Vec::new());
        session.queue_response(Ok(CoapResponse {
            code: ResponseCode::Created,
            location_path: vec!["rd".to_string(), "abc".to_string()],
            body: Vec::new(),
        }));
        session.queue_response(Ok(CoapResponse::empty(ResponseCode::BadRequest)));

        let err = run_registration(&mut session, "node-1", &[]).await.unwrap_err();
        assert!(matches!(err, LwM2MError::ProtocolError(_)));
    }
}
