use super::*;
use crate::ops::Operator;

fn ints() -> Vec<Value> {
    vec![Value::Int(1), Value::Int(2)]
}

fn strs() -> Vec<Value> {
    vec![Value::str("a"), Value::Int(2)]
}

fn bigs() -> Vec<Value> {
    vec![Value::big(1), Value::big(2)]
}

fn step(state: &SpecState, op: Operator, values: &[Value], bound: usize) -> Transition {
    transition(state, op.table(), values, CaseSet::default(), bound, Reason::GuardMiss)
        .expect("transition")
}

#[test]
fn test_uninitialized_adopts_first_match() {
    let t = transition(
        &SpecState::Uninitialized,
        Operator::Add.table(),
        &ints(),
        CaseSet::default(),
        3,
        Reason::FirstExecution,
    )
    .unwrap();
    assert_eq!(t.next, SpecState::Specialized(CaseId(0)));
    assert_eq!(t.adopted, Some(CaseId(0)));
    assert_eq!(t.reason, Reason::FirstExecution);
}

#[test]
fn test_uninitialized_without_match_goes_generic() {
    let values = vec![Value::Bool(true), Value::Null];
    let t = step(&SpecState::Uninitialized, Operator::Add, &values, 3);
    assert_eq!(t.next, SpecState::Generic);
    assert_eq!(t.adopted, None);
    assert_eq!(t.reason, Reason::NoApplicableCase);
}

#[test]
fn test_specialized_miss_builds_pair() {
    let t = step(&SpecState::Specialized(CaseId(0)), Operator::Add, &strs(), 3);
    let SpecState::Polymorphic(chain) = &t.next else {
        panic!("expected polymorphic, got {:?}", t.next);
    };
    assert_eq!(chain.entries(), &[CaseId(0), CaseId(2)]);
    assert_eq!(t.adopted, Some(CaseId(2)));
}

#[test]
fn test_bound_one_skips_polymorphic() {
    let t = step(&SpecState::Specialized(CaseId(0)), Operator::Add, &strs(), 1);
    assert_eq!(t.next, SpecState::Generic);
    assert_eq!(t.reason, Reason::BoundExceeded);
}

#[test]
fn test_chain_grows_until_bound() {
    let pair = Chain::pair(CaseId(0), CaseId(2)).unwrap();
    let t = step(&SpecState::Polymorphic(pair.clone()), Operator::Add, &bigs(), 3);
    let SpecState::Polymorphic(grown) = &t.next else {
        panic!("expected polymorphic");
    };
    assert_eq!(grown.entries(), &[CaseId(0), CaseId(2), CaseId(1)]);

    let full = step(&SpecState::Polymorphic(pair), Operator::Add, &bigs(), 2);
    assert_eq!(full.next, SpecState::Generic);
    assert_eq!(full.reason, Reason::BoundExceeded);
}

#[test]
fn test_generic_refuses_to_transition() {
    let err = transition(
        &SpecState::Generic,
        Operator::Add.table(),
        &ints(),
        CaseSet::default(),
        3,
        Reason::GuardMiss,
    );
    assert!(err.is_err());
}

#[test]
fn test_chain_rejects_duplicates() {
    assert!(Chain::pair(CaseId(1), CaseId(1)).is_err());
    let mut chain = Chain::pair(CaseId(0), CaseId(1)).unwrap();
    assert!(chain.push(CaseId(0)).is_err());
    assert_eq!(chain.len(), 2);
}

#[test]
fn test_chain_lookup_first_match_in_entry_order() {
    // big is entry 0 and also admits ints, so it wins ties.
    let chain = Chain::pair(CaseId(1), CaseId(0)).unwrap();
    let table = Operator::Add.table();
    assert_eq!(chain.lookup(table, &ints()), Some(CaseId(1)));
    assert_eq!(chain.lookup(table, &strs()), None);
}

#[test]
fn test_without_shrinks_state() {
    assert_eq!(
        SpecState::Specialized(CaseId(0)).without(CaseId(0)),
        SpecState::Uninitialized
    );
    assert_eq!(
        SpecState::Specialized(CaseId(1)).without(CaseId(0)),
        SpecState::Specialized(CaseId(1))
    );
    let pair = Chain::pair(CaseId(0), CaseId(2)).unwrap();
    assert_eq!(
        SpecState::Polymorphic(pair).without(CaseId(0)),
        SpecState::Specialized(CaseId(2))
    );
    let mut three = Chain::pair(CaseId(0), CaseId(1)).unwrap();
    three.push(CaseId(2)).unwrap();
    let SpecState::Polymorphic(left) = SpecState::Polymorphic(three).without(CaseId(1)) else {
        panic!("expected polymorphic");
    };
    assert_eq!(left.entries(), &[CaseId(0), CaseId(2)]);
}

#[test]
fn test_state_tags_render() {
    let table = Operator::Add.table();
    let pair = Chain::pair(CaseId(0), CaseId(2)).unwrap();
    assert_eq!(SpecState::Uninitialized.tag(table).to_string(), "uninitialized");
    assert_eq!(SpecState::Specialized(CaseId(1)).tag(table).to_string(), "specialized(big)");
    let tag = SpecState::Polymorphic(pair).tag(table);
    assert_eq!(tag.to_string(), "polymorphic[int, string]");
    assert_eq!(tag.chain_len(), 2);
    assert!(SpecState::Generic.tag(table).is_generic());
}

#[test]
fn test_state_tag_serializes_adjacently() {
    let json = serde_json::to_string(&StateTag::Specialized("int")).unwrap();
    assert_eq!(json, r#"{"state":"specialized","cases":"int"}"#);
    let json = serde_json::to_string(&StateTag::Generic).unwrap();
    assert_eq!(json, r#"{"state":"generic"}"#);
}
