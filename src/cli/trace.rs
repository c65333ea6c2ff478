use std::path::PathBuf;
use std::process;

use clap::Args;
use serde::Serialize;

use morphic::frame::{Frame, FrameStore, Slot};
use morphic::observe::{RewriteLog, RewriteRecord};
use morphic::specialize::StateTag;
use morphic::tree::{NodeId, Tree};
use morphic::value::Value;
use morphic::{Engine, EngineError};

use super::{load_config, parse_combo, resolve_operator};

#[derive(Args)]
pub struct TraceArgs {
    /// Operator name (see `morphic ops`)
    pub op: String,
    /// Operand combinations, one per call: 1,2  '"a",2'  42n,1
    #[arg(required = true)]
    pub combos: Vec<String>,
    /// Engine configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Print the calls and rewrite records as JSON
    #[arg(long)]
    pub json: bool,
}

/// Outcome of one call of the traced node.
#[derive(Serialize)]
struct CallReport {
    call: usize,
    operands: Vec<String>,
    result: Option<String>,
    error: Option<String>,
    state: StateTag,
    rewrites: Vec<RewriteRecord>,
}

pub fn cmd_trace(args: TraceArgs) {
    let op = resolve_operator(&args.op);
    let config = load_config(args.config.as_deref());

    let mut calls = Vec::with_capacity(args.combos.len());
    for combo in &args.combos {
        let values = match parse_combo(combo) {
            Ok(values) => values,
            Err(e) => {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        };
        if values.len() != op.arity() {
            eprintln!(
                "error: '{}' takes {} operands, got {} in '{}'",
                op,
                op.arity(),
                values.len(),
                combo
            );
            process::exit(1);
        }
        calls.push(values);
    }

    // root(op(read 0, read 1, ..)): operands come from the frame so one
    // node sees every combination.
    let mut tree = Tree::new();
    let operands: Vec<_> = (0..op.arity()).map(|i| tree.read(Slot(i as u16))).collect();
    let node = tree.op(op, &operands);
    let root = tree.root(format!("trace-{}", op), node);

    let mut engine = Engine::new(tree, config);
    let log = RewriteLog::new();
    engine.on_rewrite(log.clone());

    let mut reports = Vec::with_capacity(calls.len());
    for (index, values) in calls.into_iter().enumerate() {
        log.clear();
        let outcome = run_call(&mut engine, root, &values);
        if let Err(e) = &outcome {
            if !e.is_language_error() {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
        let state = engine
            .tree()
            .child(root, 0)
            .and_then(|id| engine.state(id))
            .unwrap_or(StateTag::Stable);
        let rewrites = log
            .records()
            .into_iter()
            .filter(|r| r.node == op.name())
            .collect();
        reports.push(CallReport {
            call: index + 1,
            operands: values.iter().map(Value::describe).collect(),
            result: outcome.as_ref().ok().map(Value::describe),
            error: outcome.err().map(|e| e.to_string()),
            state,
            rewrites,
        });
    }

    if args.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("error: cannot serialize trace: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    for report in &reports {
        let call = format!("{}({})", op, report.operands.join(", "));
        match (&report.result, &report.error) {
            (Some(result), _) => println!("call {}: {} = {}", report.call, call, result),
            (None, Some(error)) => println!("call {}: {} failed: {}", report.call, call, error),
            (None, None) => println!("call {}: {}", report.call, call),
        }
        for record in &report.rewrites {
            println!("  {}", record.summary());
        }
        println!("  state: {}", report.state);
    }
    eprintln!("{} rewrites total", engine.rewrites());
}

fn run_call(
    engine: &mut Engine,
    root: NodeId,
    values: &[Value],
) -> Result<Value, EngineError> {
    let mut frame = Frame::with_slots(values.len());
    for (slot, value) in values.iter().enumerate() {
        frame.write(Slot(slot as u16), value.clone());
    }
    engine.call(root, &mut frame)
}
