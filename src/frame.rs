//! Typed frame storage for local variables.
//!
//! Each slot remembers the representation it currently stores. Typed
//! reads and writes report a disagreement with [`Narrow::Retry`] instead
//! of failing; once a slot has held two different kinds it is generalized
//! to `Object` and stays there.

use serde::Serialize;

use crate::value::{Narrow, Value};

/// Index of a local variable slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slot(pub u16);

impl Slot {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stored representation of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Never written.
    Illegal,
    Int,
    Bool,
    Object,
}

/// Frame storage as consumed by read/write nodes.
pub trait FrameStore {
    fn slot_kind(&self, slot: Slot) -> SlotKind;

    /// Generic read; unwritten slots read as `null`.
    fn read(&self, slot: Slot) -> Value;

    fn read_int(&self, slot: Slot) -> Narrow<i64> {
        match self.read(slot) {
            Value::Int(n) if self.slot_kind(slot) == SlotKind::Int => Narrow::Value(n),
            other => Narrow::Retry(other),
        }
    }

    fn read_bool(&self, slot: Slot) -> Narrow<bool> {
        match self.read(slot) {
            Value::Bool(b) if self.slot_kind(slot) == SlotKind::Bool => Narrow::Value(b),
            other => Narrow::Retry(other),
        }
    }

    /// Generic write. Generalizes the slot to `Object` unless it is still
    /// unwritten and the value has a primitive kind.
    fn write(&mut self, slot: Slot, value: Value);

    /// Typed write; `Retry` carries the value back when the slot already
    /// stores another representation.
    fn write_int(&mut self, slot: Slot, value: i64) -> Narrow<()>;

    fn write_bool(&mut self, slot: Slot, value: bool) -> Narrow<()>;
}

/// The default frame: a vector of `(kind, value)` slots that grows on
/// write.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    slots: Vec<(SlotKind, Value)>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(count: usize) -> Self {
        Frame {
            slots: vec![(SlotKind::Illegal, Value::Null); count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut (SlotKind, Value) {
        let i = slot.index();
        if i >= self.slots.len() {
            self.slots.resize(i + 1, (SlotKind::Illegal, Value::Null));
        }
        &mut self.slots[i]
    }

    fn write_typed(&mut self, slot: Slot, kind: SlotKind, value: Value) -> Narrow<()> {
        let entry = self.slot_mut(slot);
        match entry.0 {
            SlotKind::Illegal => {
                *entry = (kind, value);
                Narrow::Value(())
            }
            k if k == kind => {
                entry.1 = value;
                Narrow::Value(())
            }
            _ => Narrow::Retry(value),
        }
    }
}

impl FrameStore for Frame {
    fn slot_kind(&self, slot: Slot) -> SlotKind {
        self.slots
            .get(slot.index())
            .map_or(SlotKind::Illegal, |(kind, _)| *kind)
    }

    fn read(&self, slot: Slot) -> Value {
        self.slots
            .get(slot.index())
            .map_or(Value::Null, |(_, value)| value.clone())
    }

    fn write(&mut self, slot: Slot, value: Value) {
        let entry = self.slot_mut(slot);
        let kind = match (entry.0, &value) {
            (SlotKind::Illegal | SlotKind::Int, Value::Int(_)) => SlotKind::Int,
            (SlotKind::Illegal | SlotKind::Bool, Value::Bool(_)) => SlotKind::Bool,
            _ => SlotKind::Object,
        };
        *entry = (kind, value);
    }

    fn write_int(&mut self, slot: Slot, value: i64) -> Narrow<()> {
        self.write_typed(slot, SlotKind::Int, Value::Int(value))
    }

    fn write_bool(&mut self, slot: Slot, value: bool) -> Narrow<()> {
        self.write_typed(slot, SlotKind::Bool, Value::Bool(value))
    }
}
