use super::{Body, Case, CaseTable, Guard, Plan, ResultKind, Returns, Yield};
use crate::value::Value;

// ── not ──

fn not_bool(values: &[Value]) -> Yield<Value> {
    match values {
        [Value::Bool(b)] => Yield::Done(Value::Bool(!b)),
        _ => Yield::Decline,
    }
}

pub(super) static NOT: CaseTable = CaseTable {
    name: "not",
    arity: 1,
    plan: Plan::Eager,
    returns: Returns::Boolean,
    cases: &[Case {
        name: "bool",
        guards: &[Guard::Bool],
        when: None,
        result: ResultKind::Bool,
        body: Body::Dyn(not_bool),
    }],
};

// ── and / or ──

/// Short-circuit result: the last operand that was evaluated.
fn last_evaluated(values: &[Value]) -> Yield<Value> {
    match values.last() {
        Some(v @ Value::Bool(_)) => Yield::Done(v.clone()),
        _ => Yield::Decline,
    }
}

pub(super) static AND: CaseTable = CaseTable {
    name: "and",
    arity: 2,
    plan: Plan::ShortCircuit(false),
    returns: Returns::Boolean,
    cases: &[Case {
        name: "bool",
        guards: &[Guard::Bool, Guard::Bool],
        when: None,
        result: ResultKind::Bool,
        body: Body::Dyn(last_evaluated),
    }],
};

pub(super) static OR: CaseTable = CaseTable {
    name: "or",
    arity: 2,
    plan: Plan::ShortCircuit(true),
    returns: Returns::Boolean,
    cases: &[Case {
        name: "bool",
        guards: &[Guard::Bool, Guard::Bool],
        when: None,
        result: ResultKind::Bool,
        body: Body::Dyn(last_evaluated),
    }],
};

// ── cond ──

/// The branch value was already selected by the plan; the cases only
/// differ in what they promise about its kind.
fn selected(values: &[Value]) -> Yield<Value> {
    match values {
        [Value::Bool(_), branch] => Yield::Done(branch.clone()),
        _ => Yield::Decline,
    }
}

pub(super) static COND: CaseTable = CaseTable {
    name: "cond",
    arity: 3,
    plan: Plan::Select,
    returns: Returns::Value,
    cases: &[
        Case {
            name: "int",
            guards: &[Guard::Bool, Guard::Int],
            when: None,
            result: ResultKind::Int,
            body: Body::Dyn(selected),
        },
        Case {
            name: "big",
            guards: &[Guard::Bool, Guard::Big],
            when: None,
            result: ResultKind::Big,
            body: Body::Dyn(selected),
        },
        Case {
            name: "any",
            guards: &[Guard::Bool, Guard::Any],
            when: None,
            result: ResultKind::Any,
            body: Body::Dyn(selected),
        },
    ],
};
