//! Parse TLV bytes into a tree of [`TlvNode`]s.

use crate::error::{LwM2MError, Result};

use super::header::{parse_length_bytes, Header};
use super::node::TlvNode;

/// Parse the first TLV node from `buf`, returning it alongside the unconsumed
/// tail. Recurses into container values to build the child list.
pub fn decode_one(buf: &[u8]) -> Result<(TlvNode, &[u8])> {
    let (&header_byte, rest) = buf
        .split_first()
        .ok_or_else(|| LwM2MError::TlvShort("empty input, expected header byte".into()))?;
    let header = Header::parse(header_byte);

    let id_len = header.id_width.byte_len();
    if rest.len() < id_len {
        return Err(LwM2MError::TlvShort(format!(
            "need {id_len} identifier byte(s), have {}",
            rest.len()
        )));
    }
    let (id_bytes, rest) = rest.split_at(id_len);
    let id = match id_bytes {
        [a] => *a as u16,
        [a, b] => u16::from_be_bytes([*a, *b]),
        _ => unreachable!("id_len is 1 or 2"),
    };

    let len_byte_count = header.length_byte_count();
    let (value_len, rest) = if len_byte_count == 0 {
        (header.inline_len as usize, rest)
    } else {
        if rest.len() < len_byte_count {
            return Err(LwM2MError::TlvShort(format!(
                "need {len_byte_count} length byte(s), have {}",
                rest.len()
            )));
        }
        let (len_bytes, rest) = rest.split_at(len_byte_count);
        (parse_length_bytes(len_bytes)?, rest)
    };

    if rest.len() < value_len {
        return Err(LwM2MError::TlvShort(format!(
            "need {value_len} value byte(s), have {}",
            rest.len()
        )));
    }
    let (value, tail) = rest.split_at(value_len);

    let children = if header.node_type.is_container() {
        decode_children(value)?
    } else {
        Vec::new()
    };

    Ok((
        TlvNode {
            node_type: header.node_type,
            id,
            value: value.to_vec(),
            children,
        },
        tail,
    ))
}

/// Parse `value` as a back-to-back sequence of child TLVs until exhausted.
fn decode_children(value: &[u8]) -> Result<Vec<TlvNode>> {
    let mut children = Vec::new();
    let mut remaining = value;
    while !remaining.is_empty() {
        let (child, tail) = decode_one(remaining)?;
        if tail.len() >= remaining.len() {
            return Err(LwM2MError::TlvStructure(
                "child parse did not consume any bytes".into(),
            ));
        }
        children.push(child);
        remaining = tail;
    }
    Ok(children)
}

/// Parse `buf` as a sequence of top-level TLV nodes, repeating `decode_one`
/// until no bytes remain.
pub fn decode_all(buf: &[u8]) -> Result<Vec<TlvNode>> {
    let mut nodes = Vec::new();
    let mut remaining = buf;
    while !remaining.is_empty() {
        let (node, tail) = decode_one(remaining)?;
        remaining = tail;
        nodes.push(node);
    }
    Ok(nodes)
}
