use num_bigint::BigInt;
use num_traits::Zero;

use super::{Body, Case, CaseTable, Guard, Plan, ResultKind, Returns, Yield};
use crate::value::Value;

const INTS: &[Guard] = &[Guard::Int, Guard::Int];
const BIGS: &[Guard] = &[Guard::Big, Guard::Big];
const ANYS: &[Guard] = &[Guard::Any, Guard::Any];

fn big_pair(values: &[Value]) -> Option<(BigInt, BigInt)> {
    match values {
        [a, b] => Some((a.as_big()?, b.as_big()?)),
        _ => None,
    }
}

fn big_op(values: &[Value], f: impl FnOnce(BigInt, BigInt) -> Yield<BigInt>) -> Yield<Value> {
    match big_pair(values) {
        Some((a, b)) => f(a, b).map(Value::from_big),
        None => Yield::Decline,
    }
}

fn checked(result: Option<i64>) -> Yield<i64> {
    match result {
        Some(n) => Yield::Done(n),
        None => Yield::Decline,
    }
}

// ── add ──

fn add_int(a: i64, b: i64) -> Yield<i64> {
    checked(a.checked_add(b))
}

fn add_big(values: &[Value]) -> Yield<Value> {
    big_op(values, |a, b| Yield::Done(a + b))
}

fn either_str(values: &[Value]) -> bool {
    values.iter().any(|v| matches!(v, Value::Str(_)))
}

fn concat(values: &[Value]) -> Yield<Value> {
    match values {
        [a, b] => Yield::Done(Value::str(format!("{}{}", a, b))),
        _ => Yield::Decline,
    }
}

pub(super) static ADD: CaseTable = CaseTable {
    name: "add",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Value,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Int,
            body: Body::Int(add_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Big,
            body: Body::Dyn(add_big),
        },
        Case {
            name: "string",
            guards: ANYS,
            when: Some(either_str),
            result: ResultKind::Str,
            body: Body::Dyn(concat),
        },
    ],
};

// ── sub ──

fn sub_int(a: i64, b: i64) -> Yield<i64> {
    checked(a.checked_sub(b))
}

fn sub_big(values: &[Value]) -> Yield<Value> {
    big_op(values, |a, b| Yield::Done(a - b))
}

pub(super) static SUB: CaseTable = CaseTable {
    name: "sub",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Value,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Int,
            body: Body::Int(sub_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Big,
            body: Body::Dyn(sub_big),
        },
    ],
};

// ── mul ──

fn mul_int(a: i64, b: i64) -> Yield<i64> {
    checked(a.checked_mul(b))
}

fn mul_big(values: &[Value]) -> Yield<Value> {
    big_op(values, |a, b| Yield::Done(a * b))
}

pub(super) static MUL: CaseTable = CaseTable {
    name: "mul",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Value,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Int,
            body: Body::Int(mul_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Big,
            body: Body::Dyn(mul_big),
        },
    ],
};

// ── div ──

const DIV_BY_ZERO: &str = "division by zero";

/// Truncating division. `MIN / -1` overflows and declines to the big case.
fn div_int(a: i64, b: i64) -> Yield<i64> {
    if b == 0 {
        return Yield::Fault(DIV_BY_ZERO);
    }
    checked(a.checked_div(b))
}

fn div_big(values: &[Value]) -> Yield<Value> {
    big_op(values, |a, b| {
        if b.is_zero() {
            Yield::Fault(DIV_BY_ZERO)
        } else {
            Yield::Done(a / b)
        }
    })
}

pub(super) static DIV: CaseTable = CaseTable {
    name: "div",
    arity: 2,
    plan: Plan::Eager,
    returns: Returns::Value,
    cases: &[
        Case {
            name: "int",
            guards: INTS,
            when: None,
            result: ResultKind::Int,
            body: Body::Int(div_int),
        },
        Case {
            name: "big",
            guards: BIGS,
            when: None,
            result: ResultKind::Big,
            body: Body::Dyn(div_big),
        },
    ],
};
