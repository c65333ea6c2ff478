//! The specialization state machine.
//!
//! ```text
//! Uninitialized ──first call──▶ Specialized(case)
//!       │                            │ guard miss
//!       │ no case                    ▼
//!       │                     Polymorphic[c0, c1, ..]  ◀─┐ miss, room left
//!       │                            │ ──────────────────┘
//!       ▼                            │ miss, chain full
//!    Generic ◀───────────────────────┘
//! ```
//!
//! This module is pure: [`transition`] decides the next state from the
//! current one and the operands that were just evaluated. Installing the
//! result into the tree is the engine's job.

pub mod chain;
#[cfg(test)]
mod tests;

use std::fmt;

use serde::Serialize;

pub use chain::Chain;

use crate::ops::{CaseId, CaseSet, CaseTable};
use crate::value::Value;

/// Specialization state of one operation node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecState {
    Uninitialized,
    Specialized(CaseId),
    Polymorphic(Chain),
    Generic,
}

impl SpecState {
    pub fn tag(&self, table: &CaseTable) -> StateTag {
        match self {
            SpecState::Uninitialized => StateTag::Uninitialized,
            SpecState::Specialized(case) => StateTag::Specialized(table.case_name(*case)),
            SpecState::Polymorphic(chain) => StateTag::Polymorphic(chain.names(table)),
            SpecState::Generic => StateTag::Generic,
        }
    }

    /// State left after `case` declined and was excluded.
    pub fn without(self, case: CaseId) -> SpecState {
        match self {
            SpecState::Specialized(c) if c == case => SpecState::Uninitialized,
            SpecState::Polymorphic(mut chain) => {
                chain.remove(case);
                let first = chain.entries().first().copied();
                match (chain.len(), first) {
                    (0, _) => SpecState::Uninitialized,
                    (1, Some(only)) => SpecState::Specialized(only),
                    _ => SpecState::Polymorphic(chain),
                }
            }
            other => other,
        }
    }
}

/// Observable summary of a node's state, used by trace records, shape
/// hashes and tests.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "state", content = "cases", rename_all = "lowercase")]
pub enum StateTag {
    Uninitialized,
    Specialized(&'static str),
    Polymorphic(Vec<&'static str>),
    Generic,
    /// Nodes that never rewrite (literals, blocks, roots).
    Stable,
}

impl StateTag {
    pub fn is_generic(&self) -> bool {
        matches!(self, StateTag::Generic)
    }

    pub fn chain_len(&self) -> usize {
        match self {
            StateTag::Specialized(_) => 1,
            StateTag::Polymorphic(cases) => cases.len(),
            _ => 0,
        }
    }
}

impl fmt::Display for StateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateTag::Uninitialized => f.write_str("uninitialized"),
            StateTag::Specialized(case) => write!(f, "specialized({})", case),
            StateTag::Polymorphic(cases) => write!(f, "polymorphic[{}]", cases.join(", ")),
            StateTag::Generic => f.write_str("generic"),
            StateTag::Stable => f.write_str("stable"),
        }
    }
}

/// Why a node was rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    FirstExecution,
    GuardMiss,
    CaseDeclined,
    BoundExceeded,
    NoApplicableCase,
    SlotKindChanged,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reason::FirstExecution => "first execution",
            Reason::GuardMiss => "guard miss",
            Reason::CaseDeclined => "case declined",
            Reason::BoundExceeded => "chain bound exceeded",
            Reason::NoApplicableCase => "no applicable case",
            Reason::SlotKindChanged => "slot kind changed",
        })
    }
}

/// Decision for one re-specialization step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: SpecState,
    /// The case that must run to complete the triggering call; `None`
    /// means the call completes through the generic path.
    pub adopted: Option<CaseId>,
    pub reason: Reason,
}

impl Transition {
    fn generic(reason: Reason) -> Self {
        Transition {
            next: SpecState::Generic,
            adopted: None,
            reason,
        }
    }
}

/// Pick the next state for a node in `state` that could not handle
/// `values` with its cached cases.
///
/// `bound` is the maximum number of cached cases: a monomorphic node
/// counts as a chain of one. Errors are structural invariant violations.
pub fn transition(
    state: &SpecState,
    table: &CaseTable,
    values: &[Value],
    excluded: CaseSet,
    bound: usize,
    reason: Reason,
) -> Result<Transition, String> {
    if *state == SpecState::Generic {
        return Err(format!("generic '{}' node asked to re-specialize", table.name));
    }
    let Some(case) = table.first_match(values, excluded) else {
        return Ok(Transition::generic(Reason::NoApplicableCase));
    };
    let next = match state {
        SpecState::Uninitialized => SpecState::Specialized(case),
        SpecState::Specialized(prev) => {
            if bound < 2 {
                return Ok(Transition::generic(Reason::BoundExceeded));
            }
            SpecState::Polymorphic(Chain::pair(*prev, case)?)
        }
        SpecState::Polymorphic(chain) => {
            if !chain.has_room(bound) {
                return Ok(Transition::generic(Reason::BoundExceeded));
            }
            let mut grown = chain.clone();
            grown.push(case)?;
            SpecState::Polymorphic(grown)
        }
        SpecState::Generic => return Ok(Transition::generic(reason)),
    };
    Ok(Transition {
        next,
        adopted: Some(case),
        reason,
    })
}
