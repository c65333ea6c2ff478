//! Inline cache chain of a polymorphic node.

use smallvec::SmallVec;

use crate::ops::{CaseId, CaseTable};
use crate::value::Value;

/// Ordered list of cases a polymorphic node has adopted.
///
/// Entries keep adoption order (entry 0 is the case the node held while it
/// was monomorphic) and are tried first to last. A case appears at most
/// once, so the chain is trivially acyclic.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Chain {
    entries: SmallVec<[CaseId; 4]>,
}

impl Chain {
    /// Chain built when a monomorphic node misses its guard.
    pub fn pair(first: CaseId, second: CaseId) -> Result<Self, String> {
        let mut chain = Chain {
            entries: SmallVec::new(),
        };
        chain.entries.push(first);
        chain.push(second)?;
        Ok(chain)
    }

    pub fn entries(&self) -> &[CaseId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, case: CaseId) -> bool {
        self.entries.contains(&case)
    }

    /// First entry whose case accepts `values`.
    pub fn lookup(&self, table: &CaseTable, values: &[Value]) -> Option<CaseId> {
        self.entries
            .iter()
            .copied()
            .find(|id| table.get(*id).is_some_and(|case| case.accepts(values)))
    }

    /// Whether one more entry still fits under `bound`.
    pub fn has_room(&self, bound: usize) -> bool {
        self.entries.len() < bound
    }

    /// Append a newly specialized entry.
    pub fn push(&mut self, case: CaseId) -> Result<(), String> {
        if self.contains(case) {
            return Err(format!("case #{} is already cached in the chain", case.0));
        }
        self.entries.push(case);
        Ok(())
    }

    /// Drop an entry whose case was excluded. Order of the rest is kept.
    pub fn remove(&mut self, case: CaseId) -> bool {
        match self.entries.iter().position(|c| *c == case) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn names(&self, table: &CaseTable) -> Vec<&'static str> {
        self.entries.iter().map(|id| table.case_name(*id)).collect()
    }
}
