//! The execution engine: typed entry points, the rewrite controller, and
//! the drivers that move nodes through their specialization states.
//!
//! An `Engine` owns one tree. Executing a node may replace it (and only
//! it) in the tree; callers therefore hold on to roots or parents and
//! re-read child ids through [`Tree::child`] rather than caching them.

mod local;
mod operation;
#[cfg(test)]
mod tests;

use std::rc::Rc;

use num_bigint::BigInt;
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::frame::FrameStore;
use crate::observe::{Invalidation, InvalidationHook, RewriteRecord, TraceSink};
use crate::ops::Operator;
use crate::specialize::{Reason, StateTag};
use crate::tree::{NodeId, NodeKind, Tree};
use crate::value::{Narrow, Primitive, Value};

pub struct Engine {
    tree: Tree,
    config: EngineConfig,
    hooks: Vec<Box<dyn InvalidationHook>>,
    sinks: Vec<Box<dyn TraceSink>>,
    /// Name of the root being executed through `call`.
    call: Option<String>,
    rewrites: u64,
}

impl Engine {
    pub fn new(tree: Tree, config: EngineConfig) -> Self {
        Engine {
            tree,
            config,
            hooks: Vec::new(),
            sinks: Vec::new(),
            call: None,
            rewrites: 0,
        }
    }

    pub fn with_defaults(tree: Tree) -> Self {
        Self::new(tree, EngineConfig::default())
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut Tree {
        &mut self.tree
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Total number of rewrites performed so far.
    pub fn rewrites(&self) -> u64 {
        self.rewrites
    }

    pub fn on_invalidate(&mut self, hook: impl InvalidationHook + 'static) {
        self.hooks.push(Box::new(hook));
    }

    pub fn on_rewrite(&mut self, sink: impl TraceSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn state(&self, id: NodeId) -> Option<StateTag> {
        self.tree.state(id)
    }

    // ─── Entry points ──────────────────────────────────────────────

    /// Execute a root node. Rewrites performed during the call are
    /// attributed to the root's name.
    pub fn call(&mut self, root: NodeId, frame: &mut dyn FrameStore) -> Result<Value, EngineError> {
        let name = match self.tree.kind(root) {
            Some(NodeKind::Root { name, .. }) => name.clone(),
            _ => return Err(self.structural(format!("{} is not a root", root))),
        };
        let outer = self.call.replace(name);
        let result = self.execute(root, frame);
        self.call = outer;
        result
    }

    /// Generic entry point: always produces a value or a language error.
    pub fn execute(&mut self, id: NodeId, frame: &mut dyn FrameStore) -> Result<Value, EngineError> {
        match self.kind(id)? {
            NodeKind::Root { body, .. } => {
                let body = *body;
                self.execute(body, frame)
            }
            NodeKind::Literal(value) => Ok(value.clone()),
            NodeKind::Block(children) => {
                let children = children.clone();
                let mut last = Value::Null;
                for child in children {
                    last = self.execute(child, frame)?;
                }
                Ok(last)
            }
            NodeKind::Operation(_) => self.execute_operation(id, frame),
            NodeKind::Read { .. } => self.execute_read(id, frame),
            NodeKind::Write { .. } => self.execute_write(id, frame),
        }
    }

    /// Produce a raw integer, or `Retry` with whatever the node produced.
    pub fn execute_int(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<i64>, EngineError> {
        match self.kind(id)? {
            NodeKind::Literal(value) => Ok(i64::narrow(value.clone())),
            NodeKind::Operation(_) => self.execute_operation_int(id, frame),
            NodeKind::Read { .. } => self.read_int(id, frame),
            _ => self.execute(id, frame).map(i64::narrow),
        }
    }

    pub fn execute_bool(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<bool>, EngineError> {
        match self.kind(id)? {
            NodeKind::Literal(value) => Ok(bool::narrow(value.clone())),
            NodeKind::Operation(_) => self.execute_operation_bool(id, frame),
            NodeKind::Read { .. } => self.read_bool(id, frame),
            _ => self.execute(id, frame).map(bool::narrow),
        }
    }

    /// Big integers; plain integers widen.
    pub fn execute_big(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<Rc<BigInt>>, EngineError> {
        self.execute(id, frame).map(Primitive::narrow)
    }

    pub fn execute_str(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<Rc<str>>, EngineError> {
        self.execute(id, frame).map(Primitive::narrow)
    }

    // ─── Rewrite controller ────────────────────────────────────────

    /// Replace `old` with a node of `kind`, then notify observers.
    ///
    /// Returns the id now occupying `old`'s position; the caller must
    /// continue with it.
    fn rewrite(&mut self, old: NodeId, kind: NodeKind, reason: Reason) -> Result<NodeId, EngineError> {
        let Some(parent) = self.tree.parent_of(old) else {
            return Err(self.structural(format!(
                "{} has no parent; a root cannot replace itself",
                old
            )));
        };
        let previous = self.tree.state(old).unwrap_or(StateTag::Stable);
        let old_shape = (!self.hooks.is_empty()).then(|| self.tree.shape_hash(old));
        let label = kind.label();
        let next = kind.state_tag();

        let new = match self.tree.replace(old, kind) {
            Ok(new) => new,
            Err(e) => return Err(self.structural(e)),
        };
        self.rewrites += 1;

        if matches!(reason, Reason::BoundExceeded | Reason::NoApplicableCase) {
            warn!(node = label, from = %previous, %reason, "node collapsed to generic");
        } else {
            debug!(node = label, from = %previous, to = %next, %reason, %old, %new, "node rewritten");
        }

        if let Some(old_shape) = old_shape {
            let event = Invalidation {
                parent,
                old,
                new,
                old_shape,
            };
            for hook in &mut self.hooks {
                hook.invalidate(&event);
            }
        }

        if self.config.trace.enabled && !self.sinks.is_empty() {
            let record = RewriteRecord {
                node: label,
                replaced: old,
                installed: new,
                previous,
                next,
                reason,
                call: self.call.clone(),
            };
            for sink in &mut self.sinks {
                sink.record(&record);
            }
        }

        Ok(new)
    }

    // ─── Helpers ───────────────────────────────────────────────────

    fn kind(&self, id: NodeId) -> Result<&NodeKind, EngineError> {
        match self.tree.kind(id) {
            Some(kind) => Ok(kind),
            None => Err(self.structural(format!("{} is not in the tree", id))),
        }
    }

    fn structural(&self, message: String) -> EngineError {
        error!(call = ?self.call, "{}", message);
        EngineError::Structural(message)
    }

    fn unsupported(&self, id: NodeId, op: Operator, values: &[Value]) -> EngineError {
        EngineError::UnsupportedOperands {
            op,
            kinds: values.iter().map(Value::kind).collect(),
            span: self.tree.span(id),
        }
    }

    fn arithmetic(&self, id: NodeId, op: Operator, message: &'static str) -> EngineError {
        EngineError::Arithmetic {
            op,
            message,
            span: self.tree.span(id),
        }
    }
}
