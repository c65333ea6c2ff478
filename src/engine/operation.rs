//! Operation nodes: operand evaluation, cached-case dispatch, and
//! re-specialization.

use smallvec::{smallvec, SmallVec};
use tracing::trace;

use super::Engine;
use crate::error::EngineError;
use crate::frame::FrameStore;
use crate::ops::{Body, Case, CaseId, CaseSet, Failure, Guard, Operator, Plan, Yield};
use crate::specialize::{self, Reason, SpecState};
use crate::tree::{NodeId, NodeKind, OpNode};
use crate::value::{Narrow, Primitive, Value};

type Operands = SmallVec<[Value; 3]>;

/// Outcome of evaluating both operands of an integer case on raw ints.
enum Lane {
    Raw(i64, i64),
    /// An operand missed its guard; the node re-specialized and the call
    /// already completed with this value.
    Done(Value),
}

impl Engine {
    pub(super) fn execute_operation(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Value, EngineError> {
        let node = self.op_node(id)?;
        match &node.state {
            SpecState::Generic => {
                let values = self.evaluate_operands(&node, frame)?;
                self.run_generic(id, node.op, &values)
            }
            SpecState::Uninitialized => {
                let values = self.evaluate_operands(&node, frame)?;
                self.respecialize(id, SpecState::Uninitialized, node.excluded, values, Reason::FirstExecution)
            }
            SpecState::Specialized(case) => {
                let case = *case;
                let values = self.evaluate_guarded(&node, case, frame)?;
                self.dispatch(id, &node, Some(case), values)
            }
            SpecState::Polymorphic(chain) => {
                let values = self.evaluate_operands(&node, frame)?;
                let hit = chain.lookup(node.op.table(), &values);
                self.dispatch(id, &node, hit, values)
            }
        }
    }

    pub(super) fn execute_operation_int(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<i64>, EngineError> {
        let node = self.op_node(id)?;
        if let Some((case, Body::Int(f))) = self.int_case(&node) {
            return match self.int_operands(id, &node, frame)? {
                Lane::Done(value) => Ok(i64::narrow(value)),
                Lane::Raw(a, b) => match f(a, b) {
                    Yield::Done(n) => Ok(Narrow::Value(n)),
                    Yield::Fault(message) => Err(self.arithmetic(id, node.op, message)),
                    Yield::Decline => self
                        .decline(id, &node, case, smallvec![Value::Int(a), Value::Int(b)])
                        .map(i64::narrow),
                },
            };
        }
        self.execute_operation(id, frame).map(i64::narrow)
    }

    pub(super) fn execute_operation_bool(
        &mut self,
        id: NodeId,
        frame: &mut dyn FrameStore,
    ) -> Result<Narrow<bool>, EngineError> {
        let node = self.op_node(id)?;
        if let Some((_, Body::IntTest(f))) = self.int_case(&node) {
            return match self.int_operands(id, &node, frame)? {
                Lane::Done(value) => Ok(bool::narrow(value)),
                Lane::Raw(a, b) => Ok(Narrow::Value(f(a, b))),
            };
        }
        self.execute_operation(id, frame).map(bool::narrow)
    }

    // ─── Dispatch ──────────────────────────────────────────────────

    /// Run the cached case `hit` if it accepts `values`; otherwise
    /// re-specialize.
    fn dispatch(
        &mut self,
        id: NodeId,
        node: &OpNode,
        hit: Option<CaseId>,
        values: Operands,
    ) -> Result<Value, EngineError> {
        let table = node.op.table();
        let cached = hit.and_then(|c| table.get(c).map(|case| (c, case)));
        let Some((case_id, case)) = cached.filter(|(_, case)| case.accepts(&values)) else {
            trace!(op = %node.op, operands = ?kinds(&values), "guard miss");
            return self.respecialize(id, node.state.clone(), node.excluded, values, Reason::GuardMiss);
        };
        match case.apply(&values) {
            Yield::Done(value) => self.produced(node.op, case, value),
            Yield::Fault(message) => Err(self.arithmetic(id, node.op, message)),
            Yield::Decline => self.decline(id, node, case_id, values),
        }
    }

    /// A cached case declined inputs it had accepted: exclude it for good
    /// and pick again.
    fn decline(
        &mut self,
        id: NodeId,
        node: &OpNode,
        case: CaseId,
        values: Operands,
    ) -> Result<Value, EngineError> {
        trace!(op = %node.op, case = node.op.table().case_name(case), "case declined");
        let mut excluded = node.excluded;
        excluded.insert(case);
        let state = node.state.clone().without(case);
        self.respecialize(id, state, excluded, values, Reason::CaseDeclined)
    }

    /// Move the node at `id` to the next state for `values` and complete
    /// the call with the adopted case, or generically when none applies.
    ///
    /// `state` and `excluded` are what the node knows before the step;
    /// they may differ from the installed node after a decline. Every
    /// iteration installs exactly one replacement, and every decline grows
    /// the excluded set, so the loop ends within one pass over the table.
    fn respecialize(
        &mut self,
        id: NodeId,
        state: SpecState,
        excluded: CaseSet,
        values: Operands,
        reason: Reason,
    ) -> Result<Value, EngineError> {
        let op = self.op_node(id)?.op;
        let table = op.table();
        let bound = self.config.chain_bound(op);

        let mut current = id;
        let mut state = state;
        let mut excluded = excluded;
        let mut reason = reason;
        loop {
            let step = match specialize::transition(&state, table, &values, excluded, bound, reason) {
                Ok(step) => step,
                Err(e) => return Err(self.structural(e)),
            };
            current = self.install(current, step.next.clone(), excluded, step.reason)?;

            let Some(case_id) = step.adopted else {
                return self.run_generic(current, op, &values);
            };
            let Some(case) = table.get(case_id) else {
                return Err(self.structural(format!("'{}' has no case {}", op, case_id.index())));
            };
            match case.apply(&values) {
                Yield::Done(value) => return self.produced(op, case, value),
                Yield::Fault(message) => return Err(self.arithmetic(current, op, message)),
                Yield::Decline => {
                    excluded.insert(case_id);
                    state = step.next.without(case_id);
                    reason = Reason::CaseDeclined;
                }
            }
        }
    }

    /// Rewrite the operation at `id` into `state`, keeping its current
    /// operands. Operands are re-read from the tree: they may themselves
    /// have been replaced while this node was evaluating them.
    fn install(
        &mut self,
        id: NodeId,
        state: SpecState,
        excluded: CaseSet,
        reason: Reason,
    ) -> Result<NodeId, EngineError> {
        let mut node = self.op_node(id)?;
        node.state = state;
        node.excluded = excluded;
        self.rewrite(id, NodeKind::Operation(node), reason)
    }

    /// Results must have the kind their case declares.
    fn produced(&self, op: Operator, case: &Case, value: Value) -> Result<Value, EngineError> {
        if case.result.admits(&value) {
            return Ok(value);
        }
        Err(self.structural(format!(
            "'{}' case '{}' declares {:?} but produced {}",
            op,
            case.name,
            case.result,
            value.kind()
        )))
    }

    fn run_generic(&self, id: NodeId, op: Operator, values: &[Value]) -> Result<Value, EngineError> {
        op.table().generic(values).map_err(|failure| match failure {
            Failure::Unsupported => self.unsupported(id, op, values),
            Failure::Fault(message) => self.arithmetic(id, op, message),
        })
    }

    // ─── Operand evaluation ────────────────────────────────────────

    fn evaluate_operands(
        &mut self,
        node: &OpNode,
        frame: &mut dyn FrameStore,
    ) -> Result<Operands, EngineError> {
        let mut values = Operands::new();
        match node.op.table().plan {
            Plan::Eager => {
                for &child in &node.operands {
                    values.push(self.execute(child, frame)?);
                }
            }
            Plan::Select => {
                let first = self.operand(node, 0)?;
                let cond = self.execute(first, frame)?;
                let branch = match cond {
                    Value::Bool(true) => Some(1),
                    Value::Bool(false) => Some(2),
                    _ => None,
                };
                values.push(cond);
                if let Some(index) = branch {
                    let chosen = self.operand(node, index)?;
                    values.push(self.execute(chosen, frame)?);
                }
            }
            Plan::ShortCircuit(stop) => {
                let first = self.operand(node, 0)?;
                let left = self.execute(first, frame)?;
                let decided = left == Value::Bool(stop);
                values.push(left);
                if !decided {
                    let second = self.operand(node, 1)?;
                    values.push(self.execute(second, frame)?);
                }
            }
        }
        Ok(values)
    }

    /// Evaluate operands through the typed entry points the cached case's
    /// guards ask for. A child that cannot produce the kind hands back its
    /// value unchanged; the guard check in `dispatch` then misses.
    fn evaluate_guarded(
        &mut self,
        node: &OpNode,
        case: CaseId,
        frame: &mut dyn FrameStore,
    ) -> Result<Operands, EngineError> {
        let table = node.op.table();
        let Some(guards) = table.get(case).map(|c| c.guards) else {
            return self.evaluate_operands(node, frame);
        };
        if table.plan != Plan::Eager {
            return self.evaluate_operands(node, frame);
        }
        let mut values = Operands::new();
        for (index, &child) in node.operands.iter().enumerate() {
            let value = match guards.get(index) {
                Some(Guard::Int) => self.execute_int(child, frame)?.into_generic(),
                Some(Guard::Bool) => self.execute_bool(child, frame)?.into_generic(),
                _ => self.execute(child, frame)?,
            };
            values.push(value);
        }
        Ok(values)
    }

    /// The raw-integer case cached by a monomorphic eager node, if any.
    fn int_case(&self, node: &OpNode) -> Option<(CaseId, Body)> {
        let SpecState::Specialized(case_id) = node.state else {
            return None;
        };
        let table = node.op.table();
        let case = table.get(case_id)?;
        (table.plan == Plan::Eager && case.is_int_binary()).then_some((case_id, case.body))
    }

    /// Evaluate both operands as raw integers. On the first miss the
    /// remaining operand is evaluated generically and the node
    /// re-specializes with the values it has.
    fn int_operands(
        &mut self,
        id: NodeId,
        node: &OpNode,
        frame: &mut dyn FrameStore,
    ) -> Result<Lane, EngineError> {
        let left = self.operand(node, 0)?;
        let right = self.operand(node, 1)?;
        let a = match self.execute_int(left, frame)? {
            Narrow::Value(a) => a,
            Narrow::Retry(value) => {
                let other = self.execute(right, frame)?;
                return self.miss(id, node, smallvec![value, other]).map(Lane::Done);
            }
        };
        match self.execute_int(right, frame)? {
            Narrow::Value(b) => Ok(Lane::Raw(a, b)),
            Narrow::Retry(value) => self.miss(id, node, smallvec![Value::Int(a), value]).map(Lane::Done),
        }
    }

    fn miss(&mut self, id: NodeId, node: &OpNode, values: Operands) -> Result<Value, EngineError> {
        trace!(op = %node.op, operands = ?kinds(&values), "guard miss");
        self.respecialize(id, node.state.clone(), node.excluded, values, Reason::GuardMiss)
    }

    // ─── Access ────────────────────────────────────────────────────

    fn op_node(&self, id: NodeId) -> Result<OpNode, EngineError> {
        match self.kind(id)? {
            NodeKind::Operation(node) => Ok(node.clone()),
            other => Err(self.structural(format!("{} is a {}, not an operation", id, other.label()))),
        }
    }

    fn operand(&self, node: &OpNode, index: usize) -> Result<NodeId, EngineError> {
        match node.operands.get(index) {
            Some(&child) => Ok(child),
            None => Err(self.structural(format!("'{}' node is missing operand {}", node.op, index))),
        }
    }
}

fn kinds(values: &[Value]) -> Vec<&'static str> {
    values.iter().map(|v| v.kind().name()).collect()
}
