//! Errors surfaced by the engine.
//!
//! Kind mismatches between a cached case and the values it sees are not
//! errors at all: they travel as [`crate::value::Narrow::Retry`] and drive
//! re-specialization. What remains splits into two families that callers
//! must keep apart:
//!
//! - language errors (`UnsupportedOperands`, `Arithmetic`) belong to the
//!   interpreted program and are reported like any runtime error;
//! - `Structural` means the engine itself broke a tree or chain
//!   invariant. It aborts the current execution and must not be retried.

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::ops::Operator;
use crate::span::Span;
use crate::value::Kind;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unsupported operand kinds for '{op}': {}", list_kinds(.kinds))]
    UnsupportedOperands {
        op: Operator,
        kinds: Vec<Kind>,
        span: Option<Span>,
    },

    #[error("{message} in '{op}'")]
    Arithmetic {
        op: Operator,
        message: &'static str,
        span: Option<Span>,
    },

    #[error("structural invariant violated: {0}")]
    Structural(String),
}

fn list_kinds(kinds: &[Kind]) -> String {
    kinds.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
}

impl EngineError {
    /// Whether the error belongs to the interpreted program rather than
    /// to the engine.
    pub fn is_language_error(&self) -> bool {
        !matches!(self, EngineError::Structural(_))
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            EngineError::UnsupportedOperands { span, .. } | EngineError::Arithmetic { span, .. } => {
                *span
            }
            EngineError::Structural(_) => None,
        }
    }

    /// Convert to a renderable diagnostic anchored at the failing node's
    /// source section.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.span().unwrap_or_else(Span::dummy);
        let diag = Diagnostic::error(self.to_string(), span);
        match self {
            EngineError::UnsupportedOperands { op, .. } => {
                let cases: Vec<&str> = op.table().cases.iter().map(|c| c.name).collect();
                diag.with_note(format!("'{}' is defined for: {}", op, cases.join(", ")))
            }
            EngineError::Arithmetic { .. } => diag,
            EngineError::Structural(_) => {
                diag.with_help("this is an engine bug, not an error in the program".to_string())
            }
        }
    }
}
