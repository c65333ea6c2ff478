//! Shape hashing: a BLAKE3 identity for a subtree as it is currently
//! specialized.
//!
//! Two subtrees hash equal iff they have the same node kinds, operators,
//! literal values, slots and specialization states in the same positions.
//! Node ids and source spans do not participate, so a rewrite that does
//! not change any state leaves the hash unchanged.

use std::fmt;

use super::{NodeId, NodeKind, Tree};

const HASH_VERSION: u8 = 1;

/// A 256-bit BLAKE3 shape hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeHash(pub [u8; 32]);

impl ShapeHash {
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// First 8 hex digits.
    pub fn to_short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Debug for ShapeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl fmt::Display for ShapeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

pub(super) fn shape_hash(tree: &Tree, id: NodeId) -> ShapeHash {
    let mut buf = vec![HASH_VERSION];
    serialize(tree, id, &mut buf);
    ShapeHash(*blake3::hash(&buf).as_bytes())
}

fn serialize(tree: &Tree, id: NodeId, buf: &mut Vec<u8>) {
    let Some(node) = tree.get(id) else {
        buf.push(0);
        return;
    };
    push_str(buf, node.kind.label());
    push_str(buf, &node.kind.state_tag().to_string());
    match &node.kind {
        NodeKind::Root { name, .. } => push_str(buf, name),
        NodeKind::Literal(value) => {
            push_str(buf, value.kind().name());
            push_str(buf, &value.to_string());
        }
        NodeKind::Read { slot, .. } | NodeKind::Write { slot, .. } => {
            buf.extend_from_slice(&slot.0.to_le_bytes());
        }
        NodeKind::Block(_) | NodeKind::Operation(_) => {}
    }
    let children = node.kind.children();
    buf.extend_from_slice(&(children.len() as u32).to_le_bytes());
    for &child in children {
        serialize(tree, child, buf);
    }
}

/// Length-prefixed so adjacent strings cannot run together.
fn push_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}
