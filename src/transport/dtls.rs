//! DTLS 1.2 transport: the production [`CoapSession`] implementation.
//!
//! Dials a client-certificate-authenticated DTLS connection with
//! `webrtc-dtls`, then runs a small read loop over the datagram connection
//! that demultiplexes inbound CoAP requests (dispatched to the handler whose
//! registered path prefix matches) from responses to outbound requests
//! (matched by CoAP message id). Message encode/decode itself lives in
//! [`super::coap`].

use std::collections::HashMap;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use coap_lite::{MessageClass, Packet, RequestType};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use webrtc_dtls::config::{ClientAuthType, Config as DtlsConfig, ExtendedMasterSecretType};
use webrtc_dtls::conn::DTLSConn;
use webrtc_dtls::crypto::Certificate;
use webrtc_util::conn::Conn;

use crate::error::{LwM2MError, Result};

use super::coap::{decode_inbound, decode_response_code, encode_outbound, encode_response, location_path};
use super::{CoapRequest, CoapResponse, CoapSession, DialOptions, InboundHandler, ResponseCode};

/// A dialed DTLS+CoAP session.
pub struct DtlsCoapSession {
    conn: Arc<DTLSConn>,
    inbound_loop: tokio::task::JoinHandle<()>,
    pending: Arc<Mutex<HashMap<u16, mpsc::Sender<Packet>>>>,
    closed: bool,
}

impl DtlsCoapSession {
    /// Dial `options.host`, presenting `options.cert`, with peer
    /// verification disabled and the extended master secret required.
    pub async fn dial(options: DialOptions<'_>) -> Result<Self> {
        let addr = options
            .host
            .to_socket_addrs()
            .map_err(|e| LwM2MError::TransportError(format!("resolving {}: {e}", options.host)))?
            .next()
            .ok_or_else(|| LwM2MError::TransportError(format!("no address for {}", options.host)))?;

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|e| LwM2MError::TransportError(e.to_string()))?;
        socket
            .connect(addr)
            .await
            .map_err(|e| LwM2MError::TransportError(e.to_string()))?;

        let certificate = Certificate::from_key_pair(&options.cert.cert_der, &options.cert.key_der)
            .map_err(|e| LwM2MError::CredentialInvalid(format!("invalid TLS key pair: {e}")))?;

        let dtls_config = DtlsConfig {
            certificates: vec![certificate],
            insecure_skip_verify: true,
            extended_master_secret: ExtendedMasterSecretType::Require,
            client_auth: ClientAuthType::RequireAnyClientCert,
            ..Default::default()
        };

        let conn = DTLSConn::new(Arc::new(socket), dtls_config, true, None)
            .await
            .map_err(|e| LwM2MError::TransportError(format!("DTLS handshake failed: {e}")))?;
        let conn = Arc::new(conn);

        let pending: Arc<Mutex<HashMap<u16, mpsc::Sender<Packet>>>> = Arc::new(Mutex::new(HashMap::new()));
        let inbound_loop = spawn_inbound_loop(conn.clone(), pending.clone(), options.handlers);

        Ok(Self {
            conn,
            inbound_loop,
            pending,
            closed: false,
        })
    }
}

fn spawn_inbound_loop(
    conn: Arc<DTLSConn>,
    pending: Arc<Mutex<HashMap<u16, mpsc::Sender<Packet>>>>,
    handlers: Vec<(&'static str, InboundHandler)>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        loop {
            let n = match conn.recv(&mut buf).await {
                Ok(n) => n,
                Err(_) => return,
            };
            let Ok(packet) = Packet::from_bytes(&buf[..n]) else {
                continue;
            };

            if packet.header.code == MessageClass::Request(RequestType::UnKnown) {
                continue;
            }

            let message_id = packet.header.message_id;
            let mut waiter = pending.lock().await.remove(&message_id);
            if let Some(sender) = waiter.take() {
                let _ = sender.send(packet).await;
                continue;
            }

            // Not a pending reply: treat it as an inbound server-initiated
            // request and dispatch to the first matching handler prefix.
            let request = decode_inbound(&packet);
            let first_segment = request.path.first().map(String::as_str).unwrap_or("");
            let handler = handlers
                .iter()
                .find(|(prefix, _)| *prefix == first_segment)
                .map(|(_, h)| h);

            let response = match handler {
                Some(handler) => handler(request).await,
                None => CoapResponse::empty(ResponseCode::Forbidden),
            };

            let reply = encode_response(&packet, response);
            let _ = conn.send(&reply).await;
        }
    })
}

#[async_trait::async_trait]
impl CoapSession for DtlsCoapSession {
    async fn send(&mut self, request: CoapRequest) -> Result<CoapResponse> {
        let (message_id, bytes) = encode_outbound(&request);

        let (tx, mut rx) = mpsc::channel(1);
        self.pending.lock().await.insert(message_id, tx);

        self.conn
            .send(&bytes)
            .await
            .map_err(|e| LwM2MError::TransportError(e.to_string()))?;

        let packet = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .map_err(|_| LwM2MError::Timeout)?
            .ok_or_else(|| LwM2MError::TransportError("session closed while awaiting reply".into()))?;

        let code = decode_response_code(&packet)?;
        Ok(CoapResponse {
            code,
            location_path: location_path(&packet),
            body: packet.payload,
        })
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inbound_loop.abort();
        self.conn
            .close()
            .await
            .map_err(|e| LwM2MError::TransportError(e.to_string()))
    }
}

impl Drop for DtlsCoapSession {
    fn drop(&mut self) {
        self.inbound_loop.abort();
    }
}
