use std::cmp::Ordering;

use super::{Body, Case, CaseTable, Guard, Plan, ResultKind, Returns, Yield};
use crate::value::Value;

const INTS: &[Guard] = &[Guard::Int, Guard::Int];
const BIGS: &[Guard] = &[Guard::Big, Guard::Big];
const BOOLS: &[Guard] = &[Guard::Bool, Guard::Bool];
const STRS: &[Guard] = &[Guard::Str, Guard::Str];

fn ordering(values: &[Value]) -> Option<Ordering> {
    match values {
        [Value::Str(a), Value::Str(b)] => Some(a.cmp(b)),
        [a, b] => Some(a.as_big()?.cmp(&b.as_big()?)),
        _ => None,
    }
}

fn test(values: &[Value], f: impl FnOnce(Ordering) -> bool) -> Yield<Value> {
    match ordering(values) {
        Some(ord) => Yield::Done(Value::Bool(f(ord))),
        None => Yield::Decline,
    }
}

// ── lt / le ──

fn lt_int(a: i64, b: i64) -> bool {
    a < b
}

fn lt_dyn(values: &[Value]) -> Yield<Value> {
    test(values, Ordering::is_lt)
}

fn le_int(a: i64, b: i64) -> bool {
    a <= b
}

fn le_dyn(values: &[Value]) -> Yield<Value> {
    test(values, Ordering::is_le)
}

pub(super) static LT: CaseTable = CaseTable {
    name: "lt",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Boolean,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Bool,
            body: Body::IntTest(lt_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(lt_dyn),
        },
        Case {
            name: "string",
            guards: STRS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(lt_dyn),
        },
    ],
};

pub(super) static LE: CaseTable = CaseTable {
    name: "le",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Boolean,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Bool,
            body: Body::IntTest(le_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(le_dyn),
        },
        Case {
            name: "string",
            guards: STRS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(le_dyn),
        },
    ],
};

// ── eq ──

fn eq_int(a: i64, b: i64) -> bool {
    a == b
}

fn eq_dyn(values: &[Value]) -> Yield<Value> {
    match values {
        [a, b] => Yield::Done(Value::Bool(a == b)),
        _ => Yield::Decline,
    }
}

pub(super) static EQ: CaseTable = CaseTable {
    name: "eq",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Boolean,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Bool,
            body: Body::IntTest(eq_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(eq_dyn),
        },
        Case {
            name: "bool",
            guards: BOOLS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(eq_dyn),
        },
        Case {
            name: "string",
            guards: STRS,
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(eq_dyn),
        },
        // Values of unrelated kinds are simply unequal.
        Case {
            name: "other",
            guards: &[Guard::Any, Guard::Any],
            when: None,
            result: ResultKind::Bool,
            body: Body::Dyn(eq_dyn),
        },
    ],
};
