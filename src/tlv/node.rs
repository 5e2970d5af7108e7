//! TLV node tree.

/// Type tag carried in bits 7-6 of a TLV header.
///
/// Order matters: `(header >> 6) & 0x3` maps directly onto these variants
/// in declaration order (see OMA-TS-LightweightM2M §6.4.3.1, Table 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    /// Object instance; a container of `Resource` nodes.
    ObjectInstance,
    /// A single instance within a multiple-resource.
    ResourceInstance,
    /// Multiple-instance resource; a container of `ResourceInstance` nodes.
    MultiResource,
    /// Single-instance resource.
    Resource,
}

impl NodeType {
    /// Map a 2-bit type tag to a [`NodeType`].
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0b00 => NodeType::ObjectInstance,
            0b01 => NodeType::ResourceInstance,
            0b10 => NodeType::MultiResource,
            _ => NodeType::Resource,
        }
    }

    pub(crate) fn to_bits(self) -> u8 {
        match self {
            NodeType::ObjectInstance => 0b00,
            NodeType::ResourceInstance => 0b01,
            NodeType::MultiResource => 0b10,
            NodeType::Resource => 0b11,
        }
    }

    /// A node is a container iff its type is `ObjectInstance` or `MultiResource`.
    pub fn is_container(self) -> bool {
        matches!(self, NodeType::ObjectInstance | NodeType::MultiResource)
    }
}

/// A decoded TLV entry.
///
/// `value` always holds the original value bytes, even for container nodes
/// whose `children` were parsed out of that same slice — this lets callers
/// round-trip or re-inspect the raw bytes without re-encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvNode {
    /// Type tag.
    pub node_type: NodeType,
    /// Identifier (0..65535).
    pub id: u16,
    /// Raw value bytes (the container's un-reparsed value for container nodes).
    pub value: Vec<u8>,
    /// Direct children; always empty for non-container nodes.
    pub children: Vec<TlvNode>,
}

impl TlvNode {
    /// Construct a non-container (`Resource` or `ResourceInstance`) leaf node.
    pub fn leaf(node_type: NodeType, id: u16, value: Vec<u8>) -> Self {
        debug_assert!(!node_type.is_container());
        Self {
            node_type,
            id,
            value,
            children: Vec::new(),
        }
    }

    /// Construct a container (`ObjectInstance` or `MultiResource`) node from
    /// already-decoded children; `value` is the concatenation of their
    /// re-encodings.
    pub fn container(node_type: NodeType, id: u16, children: Vec<TlvNode>) -> Self {
        debug_assert!(node_type.is_container());
        let value = children
            .iter()
            .flat_map(super::encode::encode_node)
            .collect();
        Self {
            node_type,
            id,
            value,
            children,
        }
    }

    /// Direct children of the given type.
    pub fn children_of(&self, node_type: NodeType) -> impl Iterator<Item = &TlvNode> {
        self.children
            .iter()
            .filter(move |c| c.node_type == node_type)
    }
}
