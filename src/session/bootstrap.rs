//! Bootstrap session: receives pushed object instances, then reloads LWM2M
//! credentials from the store once the server signals it is finished.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::cert::{cn_from_cert, validate_pkcs8_key_der, TlsCertPair};
use crate::device::Device;
use crate::error::{LwM2MError, Result};
use crate::store::path::canonical_path;
use crate::store::BlobStore;
use crate::tlv::{decode_one, NodeType};
use crate::transport::{
    content_format, CoapRequest, CoapResponse, CoapSession, DialOptions, InboundHandler, Method,
    ResponseCode,
};
use crate::url::parse_coap_url;

const BOOTSTRAP_FINISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a full bootstrap: dial, push `/bs`, wait for the server to push
/// object instances and finish, then reload LWM2M credentials into `device`.
pub async fn bootstrap(device: &mut Device, cancel: CancellationToken) -> Result<()> {
    device.require_bootstrap_ready()?;

    let (finish_tx, finish_rx) = oneshot::channel();
    let handlers = build_handlers(device.store.clone(), finish_tx);

    let bootstrap_url = device.bootstrap_url.clone().expect("checked by require_bootstrap_ready");
    let bootstrap_cert = device.bootstrap_cert.clone().expect("checked by require_bootstrap_ready");
    let bootstrap_id = device.bootstrap_id.clone().expect("checked by require_bootstrap_ready");
    let account_id = device.account_id.clone();

    let options = DialOptions {
        host: &bootstrap_url.host,
        cert: &bootstrap_cert,
        handlers,
    };

    super::with_session(options, move |session| {
        Box::pin(async move {
            run_bootstrap_session(session, &bootstrap_id, &account_id, finish_rx, cancel).await
        }) as Pin<Box<dyn Future<Output = Result<()>> + Send>>
    })
    .await?;

    reload_credentials(device).await
}

/// The part of bootstrap that only needs an already-open session: send
/// `POST /bs`, then wait for finish/timeout/cancellation.
async fn run_bootstrap_session(
    session: &mut dyn CoapSession,
    bootstrap_id: &str,
    account_id: &str,
    finish_rx: oneshot::Receiver<()>,
    cancel: CancellationToken,
) -> Result<()> {
    let request = CoapRequest {
        method: Method::Post,
        path: vec!["bs".to_string()],
        content_format: Some(content_format::TEXT_PLAIN),
        queries: vec![
            ("ep".to_string(), bootstrap_id.to_string()),
            ("aid".to_string(), account_id.to_string()),
        ],
        body: Vec::new(),
    };

    let response = session.send(request).await?;
    if response.code != ResponseCode::Changed {
        return Err(LwM2MError::ProtocolError(format!(
            "POST /bs expected 2.04 Changed, got {:?}",
            response.code
        )));
    }

    tokio::select! {
        result = finish_rx => {
            result.map_err(|_| LwM2MError::TransportError("finish handler dropped its sender".into()))
        }
        _ = tokio::time::sleep(BOOTSTRAP_FINISH_TIMEOUT) => Err(LwM2MError::Timeout),
        _ = cancel.cancelled() => Err(LwM2MError::Cancelled),
    }
}

/// Build the inbound handler set: object writes under `/0`, `/1`, `/3`, and
/// the finish signal under `/bs`.
fn build_handlers(
    store: Arc<dyn BlobStore>,
    finish_tx: oneshot::Sender<()>,
) -> Vec<(&'static str, InboundHandler)> {
    let finish_tx = Arc::new(StdMutex::new(Some(finish_tx)));

    let mut handlers: Vec<(&'static str, InboundHandler)> = vec![
        make_object_handler("0", store.clone()),
        make_object_handler("1", store.clone()),
        make_object_handler("3", store.clone()),
    ];
    handlers.push(("bs", make_finish_handler(finish_tx)));
    handlers
}

fn make_object_handler(prefix: &'static str, store: Arc<dyn BlobStore>) -> (&'static str, InboundHandler) {
    let handler: InboundHandler = Box::new(move |request: CoapRequest| {
        let store = store.clone();
        Box::pin(async move { handle_object_write(request, &*store) })
    });
    (prefix, handler)
}

fn handle_object_write(request: CoapRequest, store: &dyn BlobStore) -> CoapResponse {
    let Some(object_id) = request.path.first().and_then(|s| s.parse::<u16>().ok()) else {
        return CoapResponse::empty(ResponseCode::BadRequest);
    };

    match request.method {
        // The device holds no persistent state for these objects before
        // bootstrap; delete is a no-op acknowledgement.
        Method::Delete => CoapResponse::empty(ResponseCode::Deleted),
        Method::Put => {
            if request.content_format != Some(content_format::LWM2M_TLV) {
                return CoapResponse::empty(ResponseCode::UnsupportedContentFormat);
            }
            if request.body.is_empty() {
                return CoapResponse::empty(ResponseCode::BadRequest);
            }

            let Ok((root, _tail)) = decode_one(&request.body) else {
                return CoapResponse::empty(ResponseCode::BadRequest);
            };
            if root.node_type != NodeType::ObjectInstance {
                return CoapResponse::empty(ResponseCode::BadRequest);
            }

            let instance_id = root.id;
            for child in root.children_of(NodeType::Resource) {
                let key = canonical_path(object_id, instance_id, child.id);
                if store.put(&key, &child.value).is_err() {
                    return CoapResponse::empty(ResponseCode::BadRequest);
                }
            }
            CoapResponse::empty(ResponseCode::Changed)
        }
        _ => CoapResponse::empty(ResponseCode::MethodNotAllowed),
    }
}

fn make_finish_handler(finish_tx: Arc<StdMutex<Option<oneshot::Sender<()>>>>) -> InboundHandler {
    Box::new(move |_request: CoapRequest| {
        let finish_tx = finish_tx.clone();
        Box::pin(async move {
            if let Some(tx) = finish_tx.lock().expect("finish handler mutex poisoned").take() {
                let _ = tx.send(());
            }
            CoapResponse::empty(ResponseCode::Changed)
        })
    })
}

/// Read `/0/0/0`, `/0/0/3`, `/0/0/5` from the store and populate the
/// device's LWM2M fields.
async fn reload_credentials(device: &mut Device) -> Result<()> {
    let url_bytes = device.store.get("/0/0/0")?;
    let url_str = String::from_utf8(url_bytes)
        .map_err(|e| LwM2MError::ProtocolError(format!("LWM2M URL is not valid UTF-8: {e}")))?;
    let lwm2m_url = parse_coap_url(&url_str)?;

    let cert_der = device.store.get("/0/0/3")?;
    let key_der = device.store.get("/0/0/5")?;
    validate_pkcs8_key_der(&key_der)?;
    let cert = TlsCertPair { cert_der, key_der };
    let endpoint_name = cn_from_cert(&cert)?;

    device.adopt_lwm2m_credentials(lwm2m_url, cert, endpoint_name);
    device.require_register_ready()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::tlv::TlvNode;

    fn make_store() -> Arc<dyn BlobStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn resource_only_child_is_written_and_non_resource_children_ignored() {
        let store = make_store();
        let resource = TlvNode::leaf(NodeType::Resource, 3, b"1.0".to_vec());
        let multi = TlvNode::container(
            NodeType::MultiResource,
            6,
            vec![TlvNode::leaf(NodeType::ResourceInstance, 0, vec![1])],
        );
        let root = TlvNode::container(NodeType::ObjectInstance, 0, vec![resource, multi]);
        let bytes = crate::tlv::encode_node(&root);

        let request = CoapRequest {
            method: Method::Put,
            path: vec!["0".to_string()],
            content_format: Some(content_format::LWM2M_TLV),
            queries: Vec::new(),
            body: bytes,
        };

        let response = handle_object_write(request, &*store);
        assert_eq!(response.code, ResponseCode::Changed);
        assert_eq!(store.get("/0/0/3").unwrap(), b"1.0");
        assert!(store.get("/0/0/6").is_err());
    }

    #[test]
    fn delete_acknowledges_without_touching_store() {
        let store = make_store();
        let request = CoapRequest {
            method: Method::Delete,
            path: vec!["1".to_string()],
            content_format: None,
            queries: Vec::new(),
            body: Vec::new(),
        };
        let response = handle_object_write(request, &*store);
        assert_eq!(response.code, ResponseCode::Deleted);
    }

    #[test]
    fn non_integer_path_is_bad_request() {
        let store = make_store();
        let request = CoapRequest {
            method: Method::Put,
            path: vec!["x".to_string()],
            content_format: Some(content_format::LWM2M_TLV),
            queries: Vec::new(),
            body: vec![1, 2, 3],
        };
        let response = handle_object_write(request, &*store);
        assert_eq!(response.code, ResponseCode::BadRequest);
    }

    #[test]
    fn wrong_content_format_is_rejected() {
        let store = make_store();
        let request = CoapRequest {
            method: Method::Put,
            path: vec!["0".to_string()],
            content_format: Some(content_format::TEXT_PLAIN),
            queries: Vec::new(),
            body: vec![1, 2, 3],
        };
        let response = handle_object_write(request, &*store);
        assert_eq!(response.code, ResponseCode::UnsupportedContentFormat);
    }

    #[tokio::test]
    async fn end_to_end_mock_bootstrap_populates_store_and_reload() {
        use crate::transport::mock::MockCoapSession;
        use crate::transport::CoapResponse;

        let store = make_store();
        let (finish_tx, finish_rx) = oneshot::channel();
        let handlers = build_handlers(store.clone(), finish_tx);
        let mut session = MockCoapSession::new(handlers);
        session.queue_response(Ok(CoapResponse::empty(ResponseCode::Changed)));

        let cert = TlvNode::leaf(NodeType::Resource, 3, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let key = TlvNode::leaf(NodeType::Resource, 5, vec![0xCA, 0xFE]);
        let url = TlvNode::leaf(
            NodeType::Resource,
            0,
            b"coaps://lw.example:5684?aid=acct-42".to_vec(),
        );
        let root = TlvNode::container(NodeType::ObjectInstance, 0, vec![url, cert, key]);

        let put_request = CoapRequest {
            method: Method::Put,
            path: vec!["0".to_string()],
            content_format: Some(content_format::LWM2M_TLV),
            queries: Vec::new(),
            body: crate::tlv::encode_node(&root),
        };
        let put_response = session.push(put_request).await;
        assert_eq!(put_response.code, ResponseCode::Changed);

        let finish_request = CoapRequest {
            method: Method::Post,
            path: vec!["bs".to_string()],
            content_format: None,
            queries: Vec::new(),
            body: Vec::new(),
        };
        session.push(finish_request).await;

        let cancel = CancellationToken::new();
        run_bootstrap_session(&mut session, "bs-node", "acct-42", finish_rx, cancel)
            .await
            .unwrap();

        assert_eq!(store.get("/0/0/0").unwrap(), b"coaps://lw.example:5684?aid=acct-42");
        assert_eq!(store.get("/0/0/3").unwrap(), vec![0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(store.get("/0/0/5").unwrap(), vec![0xCA, 0xFE]);
    }

    #[tokio::test]
    async fn reload_rejects_a_garbage_private_key() {
        use crate::device::Device;

        let store = make_store();
        store
            .put("/0/0/0", b"coaps://lw.example:5684?aid=acct-42")
            .unwrap();
        store.put("/0/0/3", &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        store.put("/0/0/5", &[0xCA, 0xFE]).unwrap();

        let mut device = Device {
            account_id: "acct-42".into(),
            bootstrap_id: None,
            bootstrap_url: None,
            bootstrap_cert: None,
            endpoint_name: None,
            lwm2m_url: None,
            lwm2m_cert: None,
            store,
        };

        let err = reload_credentials(&mut device).await.unwrap_err();
        assert!(matches!(err, LwM2MError::CredentialInvalid(_)));
        assert!(!device.is_register_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn finish_never_arriving_times_out() {
        use crate::transport::mock::MockCoapSession;
        use crate::transport::CoapResponse;

        let store = make_store();
        let (_finish_tx, finish_rx) = oneshot::channel();
        let handlers = build_handlers(store, oneshot::channel().0);
        let mut session = MockCoapSession::new(handlers);
        session.queue_response(Ok(CoapResponse::empty(ResponseCode::Changed)));

        let cancel = CancellationToken::new();
        let result = run_bootstrap_session(&mut session, "bs-node", "acct-42", finish_rx, cancel).await;
        assert!(matches!(result, Err(LwM2MError::Timeout)));
    }

    #[tokio::test]
    async fn cancellation_before_finish_returns_cancelled() {
        use crate::transport::mock::MockCoapSession;
        use crate::transport::CoapResponse;

        let store = make_store();
        let (_finish_tx, finish_rx) = oneshot::channel();
        let handlers = build_handlers(store, oneshot::channel().0);
        let mut session = MockCoapSession::new(handlers);
        session.queue_response(Ok(CoapResponse::empty(ResponseCode::Changed)));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = run_bootstrap_session(&mut session, "bs-node", "acct-42", finish_rx, cancel).await;
        assert!(matches!(result, Err(LwM2MError::Cancelled)));
    }
}
