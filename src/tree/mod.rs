//! Node arena and the replace protocol.
//!
//! Nodes live in one arena and are addressed by [`NodeId`]. Parent links
//! are plain indices, so "replace" is rebinding one slot of the parent's
//! child list. A replaced node is dropped from the arena; its id is never
//! reused, so a stale id simply stops resolving.

mod hash;

use std::fmt;

use serde::Serialize;
use smallvec::SmallVec;

pub use hash::ShapeHash;

use crate::frame::Slot;
use crate::ops::{CaseSet, Operator};
use crate::span::Span;
use crate::specialize::{SpecState, StateTag};
use crate::value::Value;

// ─── Node identity ─────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ─── Node kinds ────────────────────────────────────────────────────

/// An operator application together with its specialization state.
#[derive(Clone, Debug)]
pub struct OpNode {
    pub op: Operator,
    pub operands: SmallVec<[NodeId; 3]>,
    pub state: SpecState,
    /// Cases that declined this node's inputs; survives rewrites.
    pub excluded: CaseSet,
}

/// Specialization of a local read or write, keyed on the slot kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LocalState {
    Uninitialized,
    Int,
    Bool,
    Generic,
}

impl LocalState {
    pub fn tag(self) -> StateTag {
        match self {
            LocalState::Uninitialized => StateTag::Uninitialized,
            LocalState::Int => StateTag::Specialized("int"),
            LocalState::Bool => StateTag::Specialized("bool"),
            LocalState::Generic => StateTag::Generic,
        }
    }
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    /// Entry point of a call; its name identifies the call in traces.
    Root { name: String, body: NodeId },
    Literal(Value),
    /// Children in order; yields the last value, `null` when empty.
    Block(Vec<NodeId>),
    Operation(OpNode),
    Read { slot: Slot, state: LocalState },
    Write { slot: Slot, value: NodeId, state: LocalState },
}

impl NodeKind {
    pub fn children(&self) -> &[NodeId] {
        match self {
            NodeKind::Root { body, .. } => std::slice::from_ref(body),
            NodeKind::Literal(_) | NodeKind::Read { .. } => &[],
            NodeKind::Block(children) => children,
            NodeKind::Operation(node) => &node.operands,
            NodeKind::Write { value, .. } => std::slice::from_ref(value),
        }
    }

    fn children_mut(&mut self) -> &mut [NodeId] {
        match self {
            NodeKind::Root { body, .. } => std::slice::from_mut(body),
            NodeKind::Literal(_) | NodeKind::Read { .. } => &mut [],
            NodeKind::Block(children) => children,
            NodeKind::Operation(node) => &mut node.operands,
            NodeKind::Write { value, .. } => std::slice::from_mut(value),
        }
    }

    pub fn state_tag(&self) -> StateTag {
        match self {
            NodeKind::Operation(node) => node.state.tag(node.op.table()),
            NodeKind::Read { state, .. } | NodeKind::Write { state, .. } => state.tag(),
            _ => StateTag::Stable,
        }
    }

    /// Short name used in traces.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Root { .. } => "root",
            NodeKind::Literal(_) => "literal",
            NodeKind::Block(_) => "block",
            NodeKind::Operation(node) => node.op.name(),
            NodeKind::Read { .. } => "read",
            NodeKind::Write { .. } => "write",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    /// Source section; follows the tree position across rewrites.
    pub span: Option<Span>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

// ─── Tree ──────────────────────────────────────────────────────────

/// Replaced nodes leave a `None` tombstone and every rewrite appends a
/// slot. Slots are never reused; each node rewrites a bounded number of
/// times (chain bound plus exclusions), so growth is bounded per node.
#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    live: usize,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node and adopt its children.
    ///
    /// Panics if a child already has a parent: tree edges are exclusive.
    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for &child in kind.children() {
            let node = self.nodes.get_mut(child.index()).and_then(Option::as_mut);
            match node {
                Some(node) => {
                    assert!(
                        node.parent.is_none(),
                        "node {} is already owned by {:?}",
                        child,
                        node.parent
                    );
                    node.parent = Some(id);
                }
                None => panic!("child {} does not exist", child),
            }
        }
        self.nodes.push(Some(Node {
            kind,
            parent: None,
            span: None,
        }));
        self.live += 1;
        id
    }

    pub fn literal(&mut self, value: impl Into<Value>) -> NodeId {
        self.insert(NodeKind::Literal(value.into()))
    }

    /// An uninitialized operation node over `operands`.
    pub fn op(&mut self, op: Operator, operands: &[NodeId]) -> NodeId {
        assert_eq!(
            operands.len(),
            op.arity(),
            "'{}' takes {} operands",
            op,
            op.arity()
        );
        self.insert(NodeKind::Operation(OpNode {
            op,
            operands: operands.iter().copied().collect(),
            state: SpecState::Uninitialized,
            excluded: CaseSet::default(),
        }))
    }

    pub fn read(&mut self, slot: Slot) -> NodeId {
        self.insert(NodeKind::Read {
            slot,
            state: LocalState::Uninitialized,
        })
    }

    pub fn write(&mut self, slot: Slot, value: NodeId) -> NodeId {
        self.insert(NodeKind::Write {
            slot,
            value,
            state: LocalState::Uninitialized,
        })
    }

    pub fn block(&mut self, children: &[NodeId]) -> NodeId {
        self.insert(NodeKind::Block(children.to_vec()))
    }

    pub fn root(&mut self, name: impl Into<String>, body: NodeId) -> NodeId {
        self.insert(NodeKind::Root {
            name: name.into(),
            body,
        })
    }

    /// Attach a source section to a node.
    pub fn set_span(&mut self, id: NodeId, span: Span) {
        if let Some(node) = self.get_mut(id) {
            node.span = Some(span);
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.get(id).map(|node| &node.kind)
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.get(id).and_then(|node| node.span)
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id) {
            Some(node) => node.kind.children(),
            None => &[],
        }
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).get(index).copied()
    }

    pub fn state(&self, id: NodeId) -> Option<StateTag> {
        self.kind(id).map(NodeKind::state_tag)
    }

    /// Number of nodes currently in the arena.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Rebind the slot of `parent` that holds `old` to `new`.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) -> Result<(), String> {
        let node = self
            .get_mut(parent)
            .ok_or_else(|| format!("parent {} does not exist", parent))?;
        let slot = node
            .kind
            .children_mut()
            .iter_mut()
            .find(|child| **child == old)
            .ok_or_else(|| format!("{} is not a child of {}", old, parent))?;
        *slot = new;
        Ok(())
    }

    /// Install a node of `kind` in the position `old` occupies.
    ///
    /// The new node takes over `old`'s source section and every child
    /// listed in `kind`; `old` leaves the arena. Children of `old` that
    /// `kind` does not list are dropped with it. Safe to call while `old`
    /// is executing as long as the caller continues with the returned id.
    pub fn replace(&mut self, old: NodeId, kind: NodeKind) -> Result<NodeId, String> {
        let parent = self
            .parent_of(old)
            .ok_or_else(|| format!("{} has no parent; a root cannot replace itself", old))?;
        if !self.children(parent).contains(&old) {
            return Err(format!("{} claims parent {} which does not list it", old, parent));
        }
        for &child in kind.children() {
            if self.parent_of(child) != Some(old) {
                return Err(format!("replacement adopts {} which {} does not own", child, old));
            }
        }

        let Some(old_node) = self.nodes.get_mut(old.index()).and_then(Option::take) else {
            return Err(format!("{} does not exist", old));
        };
        self.live -= 1;

        let new = NodeId(self.nodes.len() as u32);
        for &child in kind.children() {
            if let Some(node) = self.get_mut(child) {
                node.parent = Some(new);
            }
        }
        for &child in old_node.kind.children() {
            if !kind.children().contains(&child) {
                self.remove_subtree(child);
            }
        }
        self.nodes.push(Some(Node {
            kind,
            parent: Some(parent),
            span: old_node.span,
        }));
        self.live += 1;
        self.replace_child(parent, old, new)?;
        Ok(new)
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        self.live -= 1;
        for &child in node.kind.children() {
            self.remove_subtree(child);
        }
    }

    /// Whether `id` can be reached from `root` by following child edges.
    pub fn is_reachable(&self, root: NodeId, id: NodeId) -> bool {
        let mut stack = vec![root];
        while let Some(next) = stack.pop() {
            if next == id {
                return self.get(id).is_some();
            }
            stack.extend_from_slice(self.children(next));
        }
        false
    }

    /// Content hash of the subtree's structure and specialization states.
    pub fn shape_hash(&self, id: NodeId) -> ShapeHash {
        hash::shape_hash(self, id)
    }
}
