//! Serialize a [`TlvNode`] back to its wire form.

use super::header::{Header, IdWidth};
use super::node::TlvNode;

/// Encode `node` with the smallest legal length-of-length, using 1 identifier
/// byte when it fits in 8 bits, otherwise 2.
///
/// For container nodes the value bytes already hold the concatenation of the
/// encoded children (see [`TlvNode::container`]), so this never recurses.
pub fn encode_node(node: &TlvNode) -> Vec<u8> {
    let id_width = IdWidth::for_id(node.id);
    let (header_byte, length_bytes) = Header::encode(node.node_type, id_width, node.value.len());

    let mut out = Vec::with_capacity(1 + length_bytes.len() + 2 + node.value.len());
    out.push(header_byte);
    match id_width {
        IdWidth::One => out.push(node.id as u8),
        IdWidth::Two => out.extend_from_slice(&node.id.to_be_bytes()),
    }
    out.extend_from_slice(&length_bytes);
    out.extend_from_slice(&node.value);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::NodeType;

    #[test]
    fn one_byte_id_roundtrips_through_decode() {
        let node = TlvNode::leaf(NodeType::Resource, 5, vec![0x2A]);
        let bytes = encode_node(&node);
        assert_eq!(bytes, vec![0xC1, 5, 0x2A]);
    }

    #[test]
    fn two_byte_id_sets_width_bit() {
        let node = TlvNode::leaf(NodeType::Resource, 300, vec![1, 2]);
        let bytes = encode_node(&node);
        assert_eq!(bytes[0] & 0b0010_0000, 0b0010_0000);
        assert_eq!(&bytes[1..3], &300u16.to_be_bytes());
    }

    #[test]
    fn container_value_is_concatenated_children() {
        let child = TlvNode::leaf(NodeType::Resource, 0, vec![7]);
        let parent = TlvNode::container(NodeType::ObjectInstance, 0, vec![child.clone()]);
        assert_eq!(parent.value, encode_node(&child));
    }
}
