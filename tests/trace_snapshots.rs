use morphic::{Engine, EngineConfig, Frame, FrameStore, Operator, RewriteLog, Slot, Tree, Value};
use num_bigint::BigInt;

/// Run `op(read 0, read 1, ..)` once per combination and return the
/// rewrite trace, one summary per line. Failed calls add an error line.
fn trace(op: Operator, config: EngineConfig, calls: &[Vec<Value>]) -> String {
    let mut tree = Tree::new();
    let operands: Vec<_> = (0..op.arity()).map(|i| tree.read(Slot(i as u16))).collect();
    let node = tree.op(op, &operands);
    let root = tree.root("snapshot", node);
    let mut engine = Engine::new(tree, config);
    let log = RewriteLog::new();
    engine.on_rewrite(log.clone());

    let mut lines = Vec::new();
    for values in calls {
        let mut frame = Frame::new();
        for (i, value) in values.iter().enumerate() {
            frame.write(Slot(i as u16), value.clone());
        }
        let outcome = engine.call(root, &mut frame);
        lines.extend(log.summaries());
        log.clear();
        if let Err(e) = outcome {
            lines.push(format!("error: {}", e));
        }
    }
    lines.join("\n")
}

#[test]
fn test_trace_int_then_string() {
    let out = trace(
        Operator::Add,
        EngineConfig::default(),
        &[
            vec![Value::Int(2), Value::Int(3)],
            vec![Value::Int(2), Value::str("x")],
            vec![Value::Int(2), Value::Int(3)],
        ],
    );
    insta::assert_snapshot!(out, @r"
    read: uninitialized -> specialized(int) (first execution)
    read: uninitialized -> specialized(int) (first execution)
    add: uninitialized -> specialized(int) (first execution)
    read: specialized(int) -> generic (slot kind changed)
    add: specialized(int) -> polymorphic[int, string] (guard miss)
    ");
}

#[test]
fn test_trace_overflow_declines() {
    let out = trace(
        Operator::Mul,
        EngineConfig::default(),
        &[
            vec![Value::Int(3), Value::Int(4)],
            vec![Value::Int(i64::MAX), Value::Int(3)],
            vec![Value::Int(5), Value::Int(6)],
        ],
    );
    insta::assert_snapshot!(out, @r"
    read: uninitialized -> specialized(int) (first execution)
    read: uninitialized -> specialized(int) (first execution)
    mul: uninitialized -> specialized(int) (first execution)
    mul: specialized(int) -> specialized(big) (case declined)
    ");
}

#[test]
fn test_trace_collapse_to_generic() {
    let config = EngineConfig::default().with_bound(Operator::Le, 2);
    let huge = Value::big(BigInt::from(10).pow(19));
    let out = trace(
        Operator::Le,
        config,
        &[
            vec![Value::Int(1), Value::Int(2)],
            vec![huge.clone(), Value::Int(2)],
            vec![Value::str("a"), Value::str("b")],
            vec![Value::Int(1), Value::Int(2)],
        ],
    );
    insta::assert_snapshot!(out, @r"
    read: uninitialized -> specialized(int) (first execution)
    read: uninitialized -> specialized(int) (first execution)
    le: uninitialized -> specialized(int) (first execution)
    read: specialized(int) -> generic (slot kind changed)
    le: specialized(int) -> polymorphic[int, big] (guard miss)
    read: specialized(int) -> generic (slot kind changed)
    le: polymorphic[int, big] -> generic (chain bound exceeded)
    ");
}

#[test]
fn test_trace_no_applicable_case() {
    let out = trace(
        Operator::Not,
        EngineConfig::default(),
        &[vec![Value::Bool(true)], vec![Value::Int(1)]],
    );
    insta::assert_snapshot!(out, @r"
    read: uninitialized -> specialized(bool) (first execution)
    not: uninitialized -> specialized(bool) (first execution)
    read: specialized(bool) -> generic (slot kind changed)
    not: specialized(bool) -> generic (no applicable case)
    error: unsupported operand kinds for 'not': int
    ");
}
