//! CoAP message encode/decode, built on `coap-lite`.
//!
//! Pure translation between the wire `coap_lite::Packet` representation and
//! this crate's [`CoapRequest`]/[`CoapResponse`] types; no I/O.

use coap_lite::{CoapOption, CoapRequest as WireRequest, MessageClass, Packet, RequestType};
use rand::RngCore;

use crate::error::{LwM2MError, Result};

use super::{CoapRequest, CoapResponse, Method, ResponseCode, URI_QUERY_OPTION};

/// Decode an inbound (server-initiated) request packet.
pub fn decode_inbound(packet: &Packet) -> CoapRequest {
    let method = match packet.header.code {
        MessageClass::Request(RequestType::Get) => Method::Get,
        MessageClass::Request(RequestType::Post) => Method::Post,
        MessageClass::Request(RequestType::Put) => Method::Put,
        MessageClass::Request(RequestType::Delete) => Method::Delete,
        _ => Method::Get,
    };

    let mut path = Vec::new();
    let mut content_format = None;
    let mut queries = Vec::new();
    for (number, values) in packet.options() {
        match *number {
            n if n == CoapOption::UriPath as u16 => {
                for v in values {
                    path.push(String::from_utf8_lossy(v).into_owned());
                }
            }
            n if n == CoapOption::ContentFormat as u16 => {
                if let Some(v) = values.front() {
                    if v.len() >= 2 {
                        content_format = Some(u16::from_be_bytes([v[0], v[1]]));
                    } else if v.len() == 1 {
                        content_format = Some(v[0] as u16);
                    }
                }
            }
            n if n == URI_QUERY_OPTION => {
                for v in values {
                    let s = String::from_utf8_lossy(v);
                    if let Some((k, val)) = s.split_once('=') {
                        queries.push((k.to_string(), val.to_string()));
                    }
                }
            }
            _ => {}
        }
    }

    CoapRequest {
        method,
        path,
        content_format,
        queries,
        body: packet.payload.clone(),
    }
}

/// Encode a response to `request_packet`'s message id and token.
pub fn encode_response(request_packet: &Packet, response: CoapResponse) -> Vec<u8> {
    let mut reply = Packet::new();
    reply.header.message_id = request_packet.header.message_id;
    reply.set_token(request_packet.get_token().to_vec());
    reply.header.code = match response.code {
        ResponseCode::Created => MessageClass::Response(coap_lite::ResponseType::Created),
        ResponseCode::Deleted => MessageClass::Response(coap_lite::ResponseType::Deleted),
        ResponseCode::Changed => MessageClass::Response(coap_lite::ResponseType::Changed),
        ResponseCode::BadRequest => MessageClass::Response(coap_lite::ResponseType::BadRequest),
        ResponseCode::Forbidden => MessageClass::Response(coap_lite::ResponseType::Forbidden),
        ResponseCode::MethodNotAllowed => {
            MessageClass::Response(coap_lite::ResponseType::MethodNotAllowed)
        }
        ResponseCode::UnsupportedContentFormat => {
            MessageClass::Response(coap_lite::ResponseType::UnsupportedContentFormat)
        }
    };
    for part in &response.location_path {
        reply.add_option(CoapOption::LocationPath, part.clone().into_bytes());
    }
    reply.payload = response.body;
    reply.to_bytes().unwrap_or_default()
}

/// Encode an outbound request, returning its message id (for reply
/// correlation) alongside the wire bytes.
pub fn encode_outbound(request: &CoapRequest) -> (u16, Vec<u8>) {
    let mut wire: WireRequest<()> = WireRequest::new();
    wire.set_method(match request.method {
        Method::Get => RequestType::Get,
        Method::Post => RequestType::Post,
        Method::Put => RequestType::Put,
        Method::Delete => RequestType::Delete,
    });
    wire.set_path(&request.path.join("/"));

    let mut token = vec![0u8; 4];
    rand::thread_rng().fill_bytes(&mut token);
    wire.message.set_token(token);

    let message_id = (rand::thread_rng().next_u32() & 0xFFFF) as u16;
    wire.message.header.message_id = message_id;

    if let Some(cf) = request.content_format {
        wire.message
            .add_option(CoapOption::ContentFormat, cf.to_be_bytes().to_vec());
    }
    for (k, v) in &request.queries {
        wire.message
            .add_option(CoapOption::UriQuery, format!("{k}={v}").into_bytes());
    }
    wire.message.payload = request.body.clone();

    (message_id, wire.message.to_bytes().unwrap_or_default())
}

/// Map a response packet's code onto [`ResponseCode`], rejecting anything
/// this client does not expect to receive.
pub fn decode_response_code(packet: &Packet) -> Result<ResponseCode> {
    match packet.header.code {
        MessageClass::Response(coap_lite::ResponseType::Created) => Ok(ResponseCode::Created),
        MessageClass::Response(coap_lite::ResponseType::Deleted) => Ok(ResponseCode::Deleted),
        MessageClass::Response(coap_lite::ResponseType::Changed) => Ok(ResponseCode::Changed),
        MessageClass::Response(coap_lite::ResponseType::BadRequest) => Ok(ResponseCode::BadRequest),
        MessageClass::Response(coap_lite::ResponseType::Forbidden) => Ok(ResponseCode::Forbidden),
        other => Err(LwM2MError::ProtocolError(format!(
            "unexpected response code: {other:?}"
        ))),
    }
}

/// Extract every `Location-Path` option value, in order.
pub fn location_path(packet: &Packet) -> Vec<String> {
    let mut location_path = Vec::new();
    for (number, values) in packet.options() {
        if *number == CoapOption::LocationPath as u16 {
            for v in values {
                location_path.push(String::from_utf8_lossy(v).into_owned());
            }
        }
    }
    location_path
}
