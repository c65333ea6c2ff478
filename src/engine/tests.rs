use std::cell::RefCell;
use std::rc::Rc;

use num_bigint::BigInt;

use super::*;
use crate::frame::{Frame, Slot, SlotKind};
use crate::observe::RewriteLog;
use crate::value::Kind;

/// `root(op(read 0, read 1))`
fn binary(op: Operator, config: EngineConfig) -> (Engine, NodeId) {
    let mut tree = Tree::new();
    let a = tree.read(Slot(0));
    let b = tree.read(Slot(1));
    let node = tree.op(op, &[a, b]);
    let root = tree.root("main", node);
    (Engine::new(tree, config), root)
}

fn run(
    engine: &mut Engine,
    root: NodeId,
    a: impl Into<Value>,
    b: impl Into<Value>,
) -> Result<Value, EngineError> {
    let mut frame = Frame::new();
    frame.write(Slot(0), a.into());
    frame.write(Slot(1), b.into());
    engine.call(root, &mut frame)
}

fn op_state(engine: &Engine, root: NodeId) -> StateTag {
    let node = engine.tree().child(root, 0).unwrap();
    engine.state(node).unwrap()
}

#[test]
fn test_first_execution_specializes() {
    let (mut engine, root) = binary(Operator::Add, EngineConfig::default());
    assert_eq!(run(&mut engine, root, 1, 2).unwrap(), Value::Int(3));
    assert_eq!(op_state(&engine, root), StateTag::Specialized("int"));
}

#[test]
fn test_guard_miss_grows_chain_in_adoption_order() {
    let (mut engine, root) = binary(Operator::Add, EngineConfig::default());
    run(&mut engine, root, 1, 2).unwrap();
    assert_eq!(run(&mut engine, root, "a", "b").unwrap(), Value::str("ab"));
    assert_eq!(
        op_state(&engine, root),
        StateTag::Polymorphic(vec!["int", "string"])
    );
    // Cached entries keep answering without further rewrites.
    let before = engine.rewrites();
    assert_eq!(run(&mut engine, root, 4, 5).unwrap(), Value::Int(9));
    assert_eq!(run(&mut engine, root, "x", 1).unwrap(), Value::str("x1"));
    assert_eq!(engine.rewrites(), before);
}

#[test]
fn test_bound_exceeded_collapses_to_generic() {
    let (mut engine, root) = binary(Operator::Lt, EngineConfig::default());
    assert_eq!(run(&mut engine, root, 1, 2).unwrap(), Value::Bool(true));
    assert_eq!(run(&mut engine, root, "b", "a").unwrap(), Value::Bool(false));
    assert_eq!(op_state(&engine, root).chain_len(), 2);

    let huge = Value::big(BigInt::from(10).pow(20));
    assert_eq!(run(&mut engine, root, huge, 1).unwrap(), Value::Bool(false));
    assert_eq!(op_state(&engine, root), StateTag::Generic);

    // Generic answers everything the cases do.
    assert_eq!(run(&mut engine, root, 3, 4).unwrap(), Value::Bool(true));
}

#[test]
fn test_bound_of_one_skips_polymorphism() {
    let config = EngineConfig::default().with_bound(Operator::Add, 1);
    let (mut engine, root) = binary(Operator::Add, config);
    run(&mut engine, root, 1, 2).unwrap();
    run(&mut engine, root, "a", "b").unwrap();
    assert_eq!(op_state(&engine, root), StateTag::Generic);
}

#[test]
fn test_overflow_excludes_int_case() {
    let (mut engine, root) = binary(Operator::Add, EngineConfig::default());
    run(&mut engine, root, 1, 2).unwrap();
    let sum = run(&mut engine, root, i64::MAX, 1).unwrap();
    assert_eq!(sum, Value::big(BigInt::from(i64::MAX) + 1));
    assert_eq!(op_state(&engine, root), StateTag::Specialized("big"));

    // Small operands stay on the widened case and still produce ints.
    let before = engine.rewrites();
    let small = run(&mut engine, root, 2, 3).unwrap();
    assert_eq!(small.kind(), Kind::Int);
    assert_eq!(small.describe(), "5");
    assert_eq!(engine.rewrites(), before);
    assert_eq!(op_state(&engine, root), StateTag::Specialized("big"));
}

#[test]
fn test_big_case_feeds_raw_ints_to_parent() {
    // (read 0 + read 1) < 10, first fed big integers
    let mut tree = Tree::new();
    let a = tree.read(Slot(0));
    let b = tree.read(Slot(1));
    let add = tree.op(Operator::Add, &[a, b]);
    let ten = tree.literal(10);
    let lt = tree.op(Operator::Lt, &[add, ten]);
    let root = tree.root("main", lt);
    let mut engine = Engine::with_defaults(tree);

    let mut frame = Frame::new();
    frame.write(Slot(0), Value::big(1));
    frame.write(Slot(1), Value::big(1));
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Bool(true));

    let lt = engine.tree().child(root, 0).unwrap();
    let add = engine.tree().child(lt, 0).unwrap();
    assert_eq!(engine.state(add), Some(StateTag::Specialized("big")));
    assert_eq!(engine.state(lt), Some(StateTag::Specialized("int")));

    let mut frame = Frame::new();
    frame.write(Slot(0), Value::Int(2));
    frame.write(Slot(1), Value::Int(3));
    let before = engine.rewrites();
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Bool(true));
    assert_eq!(engine.rewrites(), before);
    assert_eq!(engine.execute_int(add, &mut frame).unwrap(), Narrow::Value(5));
}

#[test]
fn test_overflow_on_first_execution() {
    let (mut engine, root) = binary(Operator::Mul, EngineConfig::default());
    let product = run(&mut engine, root, i64::MAX, 2).unwrap();
    assert_eq!(product, Value::big(BigInt::from(i64::MAX) * 2));
    assert_eq!(op_state(&engine, root), StateTag::Specialized("big"));
}

#[test]
fn test_division_by_zero_is_a_language_error() {
    let (mut engine, root) = binary(Operator::Div, EngineConfig::default());
    let err = run(&mut engine, root, 1, 0).unwrap_err();
    assert!(err.is_language_error());
    assert!(matches!(err, EngineError::Arithmetic { op: Operator::Div, .. }));
}

#[test]
fn test_unsupported_operands() {
    let (mut engine, root) = binary(Operator::Sub, EngineConfig::default());
    let err = run(&mut engine, root, "a", true).unwrap_err();
    assert_eq!(
        err,
        EngineError::UnsupportedOperands {
            op: Operator::Sub,
            kinds: vec![Kind::Str, Kind::Bool],
            span: None,
        }
    );
    assert_eq!(op_state(&engine, root), StateTag::Generic);
}

#[test]
fn test_error_carries_node_span() {
    let mut tree = Tree::new();
    let a = tree.literal(1);
    let b = tree.literal(0);
    let div = tree.op(Operator::Div, &[a, b]);
    tree.set_span(div, crate::span::Span::new(0, 4, 9));
    let root = tree.root("main", div);
    let mut engine = Engine::with_defaults(tree);
    let err = engine.call(root, &mut Frame::new()).unwrap_err();
    assert_eq!(err.span(), Some(crate::span::Span::new(0, 4, 9)));
}

#[test]
fn test_int_lane_converges() {
    // (a + b) * c
    let mut tree = Tree::new();
    let a = tree.read(Slot(0));
    let b = tree.read(Slot(1));
    let c = tree.literal(10);
    let add = tree.op(Operator::Add, &[a, b]);
    let mul = tree.op(Operator::Mul, &[add, c]);
    let root = tree.root("main", mul);
    let mut engine = Engine::with_defaults(tree);

    assert_eq!(run(&mut engine, root, 2, 3).unwrap(), Value::Int(50));
    let settled = engine.rewrites();
    for n in 0..5 {
        assert_eq!(run(&mut engine, root, n, 1).unwrap(), Value::Int((n + 1) * 10));
    }
    assert_eq!(engine.rewrites(), settled);
}

#[test]
fn test_int_lane_miss_completes_with_operand_value() {
    let mut tree = Tree::new();
    let a = tree.read(Slot(0));
    let b = tree.read(Slot(1));
    let add = tree.op(Operator::Add, &[a, b]);
    let one = tree.literal(1);
    let outer = tree.op(Operator::Add, &[add, one]);
    let root = tree.root("main", outer);
    let mut engine = Engine::with_defaults(tree);

    assert_eq!(run(&mut engine, root, 1, 1).unwrap(), Value::Int(3));
    assert_eq!(run(&mut engine, root, "a", "b").unwrap(), Value::str("ab1"));
    let outer = engine.tree().child(root, 0).unwrap();
    assert_eq!(
        engine.state(outer),
        Some(StateTag::Polymorphic(vec!["int", "string"]))
    );
}

#[test]
fn test_cond_evaluates_selected_branch_only() {
    let mut tree = Tree::new();
    let test = tree.read(Slot(0));
    let one = tree.literal(1);
    let two = tree.literal(2);
    let then = tree.write(Slot(2), one);
    let otherwise = tree.write(Slot(3), two);
    let cond = tree.op(Operator::Cond, &[test, then, otherwise]);
    let root = tree.root("main", cond);
    let mut engine = Engine::with_defaults(tree);

    let mut frame = Frame::new();
    frame.write(Slot(0), Value::Bool(true));
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Int(1));
    assert_eq!(frame.slot_kind(Slot(2)), SlotKind::Int);
    assert_eq!(frame.slot_kind(Slot(3)), SlotKind::Illegal);
}

#[test]
fn test_and_short_circuits() {
    let mut tree = Tree::new();
    let left = tree.literal(false);
    let flag = tree.literal(true);
    let right = tree.write(Slot(0), flag);
    let and = tree.op(Operator::And, &[left, right]);
    let root = tree.root("main", and);
    let mut engine = Engine::with_defaults(tree);

    let mut frame = Frame::new();
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Bool(false));
    assert_eq!(frame.slot_kind(Slot(0)), SlotKind::Illegal);
}

#[test]
fn test_read_generalizes_when_slot_kind_changes() {
    let mut tree = Tree::new();
    let read = tree.read(Slot(0));
    let root = tree.root("main", read);
    let mut engine = Engine::with_defaults(tree);
    let log = RewriteLog::new();
    engine.on_rewrite(log.clone());

    let mut frame = Frame::new();
    frame.write(Slot(0), Value::Int(7));
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Int(7));

    let mut frame = Frame::new();
    frame.write(Slot(0), Value::str("seven"));
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::str("seven"));
    assert_eq!(
        log.summaries(),
        vec![
            "read: uninitialized -> specialized(int) (first execution)",
            "read: specialized(int) -> generic (slot kind changed)",
        ]
    );
}

#[test]
fn test_unwritten_read_stays_uninitialized() {
    let mut tree = Tree::new();
    let read = tree.read(Slot(4));
    let root = tree.root("main", read);
    let mut engine = Engine::with_defaults(tree);
    assert_eq!(engine.call(root, &mut Frame::new()).unwrap(), Value::Null);
    assert_eq!(op_state(&engine, root), StateTag::Uninitialized);
    assert_eq!(engine.rewrites(), 0);
}

#[test]
fn test_write_specializes_on_value_kind() {
    let mut tree = Tree::new();
    let value = tree.read(Slot(0));
    let write = tree.write(Slot(1), value);
    let root = tree.root("main", write);
    let mut engine = Engine::with_defaults(tree);

    let mut frame = Frame::new();
    frame.write(Slot(0), Value::Bool(true));
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Bool(true));
    assert_eq!(op_state(&engine, root), StateTag::Specialized("bool"));
    assert_eq!(frame.slot_kind(Slot(1)), SlotKind::Bool);

    // Same frame, different kind: the slot and the node generalize.
    frame.write(Slot(0), Value::Int(3));
    assert_eq!(engine.call(root, &mut frame).unwrap(), Value::Int(3));
    assert_eq!(op_state(&engine, root), StateTag::Generic);
    assert_eq!(frame.slot_kind(Slot(1)), SlotKind::Object);
    assert_eq!(frame.read(Slot(1)), Value::Int(3));
}

#[test]
fn test_block_yields_last_value() {
    let mut tree = Tree::new();
    let one = tree.literal(1);
    let write = tree.write(Slot(0), one);
    let read = tree.read(Slot(0));
    let block = tree.block(&[write, read]);
    let root = tree.root("main", block);
    let mut engine = Engine::with_defaults(tree);
    assert_eq!(engine.call(root, &mut Frame::new()).unwrap(), Value::Int(1));

    let mut tree = Tree::new();
    let empty = tree.block(&[]);
    let root = tree.root("empty", empty);
    let mut engine = Engine::with_defaults(tree);
    assert_eq!(engine.call(root, &mut Frame::new()).unwrap(), Value::Null);
}

#[test]
fn test_invalidation_reports_parent_and_old_shape() {
    let (mut engine, root) = binary(Operator::Add, EngineConfig::default());
    let node = engine.tree().child(root, 0).unwrap();
    let shape = engine.tree().shape_hash(node);
    let events: Rc<RefCell<Vec<Invalidation>>> = Rc::default();
    let sink = Rc::clone(&events);
    engine.on_invalidate(move |event: &Invalidation| sink.borrow_mut().push(event.clone()));

    run(&mut engine, root, 1, 2).unwrap();
    let events = events.borrow();
    // Two reads specialize before the operation does.
    assert_eq!(events.len(), 3);
    let last = &events[2];
    assert_eq!(last.parent, root);
    assert_eq!(last.old, node);
    assert_eq!(engine.tree().child(root, 0), Some(last.new));
    assert_ne!(last.old_shape, shape, "operands were rewritten underneath");
    assert!(engine.tree().get(node).is_none());
}

#[test]
fn test_trace_records_name_the_call() {
    let (mut engine, root) = binary(Operator::Eq, EngineConfig::default());
    let log = RewriteLog::new();
    engine.on_rewrite(log.clone());
    run(&mut engine, root, true, false).unwrap();
    let records = log.records();
    assert!(records.iter().all(|r| r.call.as_deref() == Some("main")));
    let last = records.last().unwrap();
    assert_eq!(last.node, "eq");
    assert_eq!(last.next, StateTag::Specialized("bool"));
    assert_eq!(last.reason, Reason::FirstExecution);
}

#[test]
fn test_trace_can_be_disabled() {
    let mut config = EngineConfig::default();
    config.trace.enabled = false;
    let (mut engine, root) = binary(Operator::Add, config);
    let log = RewriteLog::new();
    engine.on_rewrite(log.clone());
    run(&mut engine, root, 1, 2).unwrap();
    assert!(log.is_empty());
    assert_eq!(engine.rewrites(), 3);
}

#[test]
fn test_call_requires_a_root() {
    let (mut engine, root) = binary(Operator::Add, EngineConfig::default());
    let node = engine.tree().child(root, 0).unwrap();
    let err = engine.call(node, &mut Frame::new()).unwrap_err();
    assert!(!err.is_language_error());
}

#[test]
fn test_typed_entry_points() {
    let mut tree = Tree::new();
    let a = tree.literal(4);
    let b = tree.literal(5);
    let lt = tree.op(Operator::Lt, &[a, b]);
    let root = tree.root("main", lt);
    let mut engine = Engine::with_defaults(tree);
    let mut frame = Frame::new();

    assert_eq!(engine.execute_bool(lt, &mut frame).unwrap(), Narrow::Value(true));
    let lt = engine.tree().child(root, 0).unwrap();
    assert_eq!(engine.execute_bool(lt, &mut frame).unwrap(), Narrow::Value(true));
    assert_eq!(
        engine.execute_int(lt, &mut frame).unwrap(),
        Narrow::Retry(Value::Bool(true))
    );
    let s = engine.tree().child(root, 0).unwrap();
    assert!(engine.execute_str(s, &mut frame).unwrap().is_retry());
}
