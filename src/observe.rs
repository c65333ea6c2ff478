//! Observers of tree rewrites.
//!
//! Two in-process hooks: an [`InvalidationHook`] for a host layer that
//! keys compiled artifacts on subtree shape, and a [`TraceSink`] that
//! receives one [`RewriteRecord`] per rewrite. Both are plain callbacks;
//! nothing here is persisted or sent anywhere.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::specialize::{Reason, StateTag};
use crate::tree::{NodeId, ShapeHash};

/// Structural change notification fired on every successful replace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invalidation {
    pub parent: NodeId,
    pub old: NodeId,
    pub new: NodeId,
    /// Shape of the replaced subtree before the rewrite.
    pub old_shape: ShapeHash,
}

pub trait InvalidationHook {
    fn invalidate(&mut self, event: &Invalidation);
}

impl<F: FnMut(&Invalidation)> InvalidationHook for F {
    fn invalidate(&mut self, event: &Invalidation) {
        self(event)
    }
}

/// One rewrite, as seen by a trace sink.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RewriteRecord {
    /// Node kind label (operator name, `read`, `write`).
    pub node: &'static str,
    pub replaced: NodeId,
    pub installed: NodeId,
    pub previous: StateTag,
    pub next: StateTag,
    pub reason: Reason,
    /// Name of the enclosing root, when executing through `Engine::call`.
    pub call: Option<String>,
}

impl RewriteRecord {
    /// One-line rendering: `add: uninitialized -> specialized(int) (first execution)`.
    pub fn summary(&self) -> String {
        format!("{}: {} -> {} ({})", self.node, self.previous, self.next, self.reason)
    }
}

pub trait TraceSink {
    fn record(&mut self, record: &RewriteRecord);
}

impl<F: FnMut(&RewriteRecord)> TraceSink for F {
    fn record(&mut self, record: &RewriteRecord) {
        self(record)
    }
}

/// A trace sink that keeps every record; clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RewriteLog {
    records: Rc<RefCell<Vec<RewriteRecord>>>,
}

impl RewriteLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RewriteRecord> {
        self.records.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    pub fn summaries(&self) -> Vec<String> {
        self.records.borrow().iter().map(RewriteRecord::summary).collect()
    }
}

impl TraceSink for RewriteLog {
    fn record(&mut self, record: &RewriteRecord) {
        self.records.borrow_mut().push(record.clone());
    }
}
