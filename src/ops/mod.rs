//! Operators and their specialization case tables.
//!
//! Every operator is described by one static [`CaseTable`]: how its
//! operands are evaluated and an ordered list of [`Case`]s. The engine
//! is the same for all operators; only the table differs. Case order is
//! part of each operator's contract: the first case whose guards hold
//! wins, both when a node specializes and on the generic path.

mod arith;
mod compare;
mod logic;

use std::fmt;

use serde::Serialize;

use crate::value::{Kind, Value};

// ─── Operators ─────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Eq,
    Not,
    And,
    Or,
    Cond,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Add,
        Operator::Sub,
        Operator::Mul,
        Operator::Div,
        Operator::Lt,
        Operator::Le,
        Operator::Eq,
        Operator::Not,
        Operator::And,
        Operator::Or,
        Operator::Cond,
    ];

    pub fn name(self) -> &'static str {
        self.table().name
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    pub fn table(self) -> &'static CaseTable {
        match self {
            Operator::Add => &arith::ADD,
            Operator::Sub => &arith::SUB,
            Operator::Mul => &arith::MUL,
            Operator::Div => &arith::DIV,
            Operator::Lt => &compare::LT,
            Operator::Le => &compare::LE,
            Operator::Eq => &compare::EQ,
            Operator::Not => &logic::NOT,
            Operator::And => &logic::AND,
            Operator::Or => &logic::OR,
            Operator::Cond => &logic::COND,
        }
    }

    pub fn arity(self) -> usize {
        self.table().arity
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ─── Table vocabulary ──────────────────────────────────────────────

/// How a node evaluates its operands before guards are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plan {
    /// All operands, left to right.
    Eager,
    /// Operand 0 is a boolean condition; only the selected branch of
    /// operands 1 and 2 is evaluated. Guards see `[condition, branch]`.
    Select,
    /// Operand 0, then operand 1 only if operand 0 is not the boolean
    /// `stop` value. Guards see one or two values.
    ShortCircuit(bool),
}

/// Result class of an operator, which picks its default chain bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Returns {
    Boolean,
    Value,
}

/// Per-operand kind predicate of a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Guard {
    Int,
    Bool,
    /// Big integers, and plain integers by widening.
    Big,
    Str,
    Any,
}

impl Guard {
    pub fn admits(self, value: &Value) -> bool {
        match self {
            Guard::Int => matches!(value, Value::Int(_)),
            Guard::Bool => matches!(value, Value::Bool(_)),
            Guard::Big => value.is_numeric(),
            Guard::Str => matches!(value, Value::Str(_)),
            Guard::Any => true,
        }
    }
}

/// Declared result kind of a case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Int,
    Bool,
    Big,
    Str,
    Any,
}

impl ResultKind {
    /// Whether `value` keeps the promise. Big bodies hand back results
    /// that fit in `i64` as plain integers.
    pub fn admits(self, value: &Value) -> bool {
        match self {
            ResultKind::Int => value.kind() == Kind::Int,
            ResultKind::Bool => value.kind() == Kind::Bool,
            ResultKind::Big => value.is_numeric(),
            ResultKind::Str => value.kind() == Kind::Str,
            ResultKind::Any => true,
        }
    }
}

/// What a case body did with inputs that passed its guards.
#[derive(Clone, Debug, PartialEq)]
pub enum Yield<T> {
    Done(T),
    /// The inputs fit the guards but not the case (integer overflow).
    /// The node excludes the case and re-specializes.
    Decline,
    /// A language-level fault such as division by zero.
    Fault(&'static str),
}

impl<T> Yield<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Yield<U> {
        match self {
            Yield::Done(v) => Yield::Done(f(v)),
            Yield::Decline => Yield::Decline,
            Yield::Fault(m) => Yield::Fault(m),
        }
    }
}

/// Operation body of a case.
///
/// `Int` and `IntTest` take raw integers so the engine can run them from
/// the typed entry points without building a `Value` for operands or
/// result.
#[derive(Clone, Copy)]
pub enum Body {
    Int(fn(i64, i64) -> Yield<i64>),
    IntTest(fn(i64, i64) -> bool),
    Dyn(fn(&[Value]) -> Yield<Value>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Int(_) => f.write_str("Body::Int"),
            Body::IntTest(_) => f.write_str("Body::IntTest"),
            Body::Dyn(_) => f.write_str("Body::Dyn"),
        }
    }
}

/// One specialization of an operator.
#[derive(Debug)]
pub struct Case {
    pub name: &'static str,
    pub guards: &'static [Guard],
    /// Extra predicate over the whole operand tuple, checked after guards.
    pub when: Option<fn(&[Value]) -> bool>,
    pub result: ResultKind,
    pub body: Body,
}

impl Case {
    pub fn accepts(&self, values: &[Value]) -> bool {
        values.len() <= self.guards.len()
            && self.guards.iter().zip(values).all(|(g, v)| g.admits(v))
            && self.when.map_or(true, |when| when(values))
    }

    pub fn apply(&self, values: &[Value]) -> Yield<Value> {
        match self.body {
            Body::Int(f) => match int_pair(values) {
                Some((a, b)) => f(a, b).map(Value::Int),
                None => Yield::Decline,
            },
            Body::IntTest(f) => match int_pair(values) {
                Some((a, b)) => Yield::Done(Value::Bool(f(a, b))),
                None => Yield::Decline,
            },
            Body::Dyn(f) => f(values),
        }
    }

    /// True when both operands are guarded as raw integers, which lets the
    /// typed entry points evaluate them without tagging.
    pub fn is_int_binary(&self) -> bool {
        self.guards == [Guard::Int, Guard::Int] && self.when.is_none()
    }
}

fn int_pair(values: &[Value]) -> Option<(i64, i64)> {
    match values {
        [Value::Int(a), Value::Int(b)] => Some((*a, *b)),
        _ => None,
    }
}

/// Index of a case within its table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseId(pub u8);

impl CaseId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Set of cases a node has excluded after they declined its inputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CaseSet(u32);

impl CaseSet {
    pub fn insert(&mut self, case: CaseId) {
        self.0 |= 1 << case.0;
    }

    pub fn contains(self, case: CaseId) -> bool {
        self.0 & (1 << case.0) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Why the generic path could not produce a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    Unsupported,
    Fault(&'static str),
}

// ─── Case tables ───────────────────────────────────────────────────

/// Static description of one operator.
#[derive(Debug)]
pub struct CaseTable {
    pub name: &'static str,
    pub arity: usize,
    pub plan: Plan,
    pub returns: Returns,
    pub cases: &'static [Case],
}

impl CaseTable {
    pub fn get(&self, id: CaseId) -> Option<&Case> {
        self.cases.get(id.index())
    }

    pub fn case_name(&self, id: CaseId) -> &'static str {
        self.get(id).map_or("?", |c| c.name)
    }

    /// First case in declared order that accepts `values` and is not
    /// excluded.
    pub fn first_match(&self, values: &[Value], excluded: CaseSet) -> Option<CaseId> {
        self.cases
            .iter()
            .enumerate()
            .map(|(i, case)| (CaseId(i as u8), case))
            .find(|(id, case)| !excluded.contains(*id) && case.accepts(values))
            .map(|(id, _)| id)
    }

    /// The fully dynamic path: scan every case in declared order, skipping
    /// ones that decline.
    pub fn generic(&self, values: &[Value]) -> Result<Value, Failure> {
        for case in self.cases {
            if !case.accepts(values) {
                continue;
            }
            match case.apply(values) {
                Yield::Done(v) => return Ok(v),
                Yield::Decline => continue,
                Yield::Fault(message) => return Err(Failure::Fault(message)),
            }
        }
        Err(Failure::Unsupported)
    }
}
