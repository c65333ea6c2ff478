//! Self-specializing operation nodes for tree-walking interpreters.
//!
//! Each operation node starts uninitialized, specializes to the operand
//! kinds it sees first, grows a bounded chain of cached cases when those
//! kinds vary, and settles on a fully generic form once the chain is full.
//! Specialization is done by replacing the node in its [`tree::Tree`];
//! the [`Engine`] drives execution and reports every rewrite to
//! registered observers.

pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod frame;
pub mod observe;
pub mod ops;
pub mod span;
pub mod specialize;
pub mod tree;
pub mod value;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
pub use frame::{Frame, FrameStore, Slot};
pub use observe::{Invalidation, RewriteLog, RewriteRecord};
pub use ops::Operator;
pub use specialize::{Reason, StateTag};
pub use tree::{NodeId, Tree};
pub use value::{Kind, Narrow, Value};
