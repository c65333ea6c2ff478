//! Local variable reads and writes, specialized on the frame slot kind.

use super::Engine;
use crate::error::EngineError;
use crate::frame::{FrameStore, Slot, SlotKind};
use crate::specialize::Reason;
use crate::tree::{LocalState, NodeId, NodeKind};
use crate::value::{Narrow, Primitive, Value};

impl Engine {
    pub(super) fn execute_read(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Value, EngineError> {
        let (slot, state) = self.read_node(id)?;
        match state {
            LocalState::Int => match frame.read_int(slot) {
                Narrow::Value(n) => Ok(Value::Int(n)),
                Narrow::Retry(value) => self.generalize(id, value),
            },
            LocalState::Bool => match frame.read_bool(slot) {
                Narrow::Value(b) => Ok(Value::Bool(b)),
                Narrow::Retry(value) => self.generalize(id, value),
            },
            LocalState::Generic => Ok(frame.read(slot)),
            LocalState::Uninitialized => {
                let next = match frame.slot_kind(slot) {
                    // Nothing to specialize on yet.
                    SlotKind::Illegal => return Ok(Value::Null),
                    SlotKind::Int => LocalState::Int,
                    SlotKind::Bool => LocalState::Bool,
                    SlotKind::Object => LocalState::Generic,
                };
                self.install_local(id, next, Reason::FirstExecution)?;
                Ok(frame.read(slot))
            }
        }
    }

    pub(super) fn read_int(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<i64>, EngineError> {
        let (slot, state) = self.read_node(id)?;
        if state != LocalState::Int {
            return self.execute_read(id, frame).map(i64::narrow);
        }
        match frame.read_int(slot) {
            Narrow::Value(n) => Ok(Narrow::Value(n)),
            Narrow::Retry(value) => self.generalize(id, value).map(Narrow::Retry),
        }
    }

    pub(super) fn read_bool(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<bool>, EngineError> {
        let (slot, state) = self.read_node(id)?;
        if state != LocalState::Bool {
            return self.execute_read(id, frame).map(bool::narrow);
        }
        match frame.read_bool(slot) {
            Narrow::Value(b) => Ok(Narrow::Value(b)),
            Narrow::Retry(value) => self.generalize(id, value).map(Narrow::Retry),
        }
    }

    /// Evaluate the value child and store it. The written value is also
    /// the node's result.
    pub(super) fn execute_write(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Value, EngineError> {
        let (slot, child, state) = match self.kind(id)? {
            NodeKind::Write { slot, value, state } => (*slot, *value, *state),
            other => return Err(self.structural(format!("{} is a {}, not a write", id, other.label()))),
        };
        match state {
            LocalState::Int => match self.execute_int(child, frame)? {
                Narrow::Value(n) => match frame.write_int(slot, n) {
                    Narrow::Value(()) => Ok(Value::Int(n)),
                    Narrow::Retry(value) => self.store_generic(id, slot, value, frame),
                },
                Narrow::Retry(value) => self.store_generic(id, slot, value, frame),
            },
            LocalState::Bool => match self.execute_bool(child, frame)? {
                Narrow::Value(b) => match frame.write_bool(slot, b) {
                    Narrow::Value(()) => Ok(Value::Bool(b)),
                    Narrow::Retry(value) => self.store_generic(id, slot, value, frame),
                },
                Narrow::Retry(value) => self.store_generic(id, slot, value, frame),
            },
            LocalState::Generic => {
                let value = self.execute(child, frame)?;
                frame.write(slot, value.clone());
                Ok(value)
            }
            LocalState::Uninitialized => {
                let value = self.execute(child, frame)?;
                let stored = match &value {
                    Value::Int(n) => frame.write_int(slot, *n).value().map(|()| LocalState::Int),
                    Value::Bool(b) => frame.write_bool(slot, *b).value().map(|()| LocalState::Bool),
                    _ => None,
                };
                let next = match stored {
                    Some(next) => next,
                    None => {
                        frame.write(slot, value.clone());
                        LocalState::Generic
                    }
                };
                self.install_local(id, next, Reason::FirstExecution)?;
                Ok(value)
            }
        }
    }

    /// A typed write met a value or slot of another kind: store it
    /// generically and stop specializing.
    fn store_generic(
        &mut self,
        id: NodeId,
        slot: Slot,
        value: Value,
        frame: &mut dyn FrameStore,
    ) -> Result<Value, EngineError> {
        frame.write(slot, value.clone());
        self.generalize(id, value)
    }

    /// Rewrite a local node to its generic form and pass `value` through.
    fn generalize(&mut self, id: NodeId, value: Value) -> Result<Value, EngineError> {
        self.install_local(id, LocalState::Generic, Reason::SlotKindChanged)?;
        Ok(value)
    }

    fn install_local(
        &mut self,
        id: NodeId,
        state: LocalState,
        reason: Reason,
    ) -> Result<NodeId, EngineError> {
        let kind = match self.kind(id)? {
            NodeKind::Read { slot, .. } => NodeKind::Read { slot: *slot, state },
            NodeKind::Write { slot, value, .. } => NodeKind::Write {
                slot: *slot,
                value: *value,
                state,
            },
            other => return Err(self.structural(format!("{} is a {}, not a local", id, other.label()))),
        };
        self.rewrite(id, kind, reason)
    }

    fn read_node(&self, id: NodeId) -> Result<(Slot, LocalState), EngineError> {
        match self.kind(id)? {
            NodeKind::Read { slot, state } => Ok((*slot, *state)),
            other => Err(self.structural(format!("{} is a {}, not a read", id, other.label()))),
        }
    }
}
