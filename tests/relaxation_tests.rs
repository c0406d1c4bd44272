//! Branch sizing on large formulas.
//!
//! Branches start short and are widened only when their target is out of
//! `i8` reach. These tests build conditionals and logical operators around
//! bodies of known size and check both the encoding chosen and the value
//! the evaluator computes.

mod common;

use common::*;
use formula::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

/// `1 + 2 + ... + n`: `3n - 1` bytes of code.
fn sum_events(n: u64) -> Vec<ReduceEvent<'static>> {
    let mut events = vec![int(1)];
    for i in 2..=n {
        events.push(int(i));
        events.push(bin(BinaryOp::Add));
    }
    events
}

fn sum(n: u64) -> i32 {
    (n * (n + 1) / 2) as i32
}

fn conditional(
    condition: bool,
    when_true: Vec<ReduceEvent<'static>>,
    when_false: Vec<ReduceEvent<'static>>,
) -> Vec<ReduceEvent<'static>> {
    let mut events = vec![lit(Literal::Bool(condition))];
    events.extend(when_true);
    events.extend(when_false);
    events.push(ev(NodeTag::Conditional));
    events
}

fn has(compiled: &CompiledExpression, op: OpCode) -> bool {
    compiled.chunk.opcodes().contains(&op)
}

// =============================================================================
// Reach boundary
// =============================================================================

#[test]
fn test_offset_127_stays_short() {
    init_tracing();
    // the false-branch jump skips 125 bytes of sum plus a 2 byte jump
    let compiled = compile_ok(&conditional(true, sum_events(42), vec![int(0)]));
    assert!(has(&compiled, OpCode::JumpIfFalse));
    assert!(!has(&compiled, OpCode::JumpIfFalseLong));
    assert_eq!(compiled.labels, vec![130, 132]);
    assert_eq!(run(&compiled, &Host::new()).unwrap().value, Value::I32(sum(42)));
}

#[test]
fn test_offset_128_goes_long() {
    let mut body = sum_events(42);
    body.push(un(UnaryOp::Neg));
    let compiled = compile_ok(&conditional(false, body, vec![int(0)]));
    assert!(has(&compiled, OpCode::JumpIfFalseLong));
    assert!(has(&compiled, OpCode::Jump));
    // 1 + 5 + 126 + 2
    assert_eq!(compiled.labels, vec![134, 136]);
    assert_eq!(run(&compiled, &Host::new()).unwrap().value, Value::I32(0));
}

#[test]
fn test_both_branches_long() {
    let compiled = compile_ok(&conditional(false, sum_events(60), sum_events(50)));
    assert!(has(&compiled, OpCode::JumpIfFalseLong));
    assert!(has(&compiled, OpCode::JumpLong));
    assert!(!has(&compiled, OpCode::Jump));
    assert_eq!(run(&compiled, &Host::new()).unwrap().value, Value::I32(sum(50)));

    let compiled = compile_ok(&conditional(true, sum_events(60), sum_events(50)));
    assert_eq!(run(&compiled, &Host::new()).unwrap().value, Value::I32(sum(60)));
}

#[test]
fn test_outer_branch_long_inner_short() {
    // inner: 1 + 2 + 123 + 2 + 2 = 130 bytes; its own jump reaches 125
    let mut inner_body = sum_events(41);
    inner_body.push(un(UnaryOp::Neg));
    let inner = conditional(true, inner_body, vec![int(0)]);
    let compiled = compile_ok(&conditional(true, inner, vec![int(7)]));
    assert_eq!(
        compiled
            .chunk
            .opcodes()
            .iter()
            .filter(|&&op| op == OpCode::JumpIfFalseLong)
            .count(),
        1
    );
    assert_eq!(
        run(&compiled, &Host::new()).unwrap().value,
        Value::I32(-sum(41))
    );
}

#[test]
fn test_wide_constants_inside_long_branch() {
    // more than 256 distinct constants switch to the wide form
    let compiled = compile_ok(&conditional(true, sum_events(300), vec![int(0)]));
    assert!(has(&compiled, OpCode::ConstantWide));
    assert!(has(&compiled, OpCode::JumpIfFalseLong));
    assert_eq!(run(&compiled, &Host::new()).unwrap().value, Value::I32(sum(300)));
}

#[test]
fn test_sum_of_thousands_of_terms() {
    // every term nests one level deeper on the left
    let compiled = compile_ok(&conditional(true, sum_events(4000), vec![int(0)]));
    assert!(has(&compiled, OpCode::JumpIfFalseLong));
    assert_eq!(run(&compiled, &Host::new()).unwrap().value, Value::I32(sum(4000)));
}

// =============================================================================
// Logical operators
// =============================================================================

#[test]
fn test_long_short_circuit() {
    // false && (sum == 0): the right side is never evaluated
    let mut events = vec![lit(Literal::Bool(false))];
    events.extend(sum_events(80));
    events.push(int(0));
    events.push(bin(BinaryOp::Eq));
    events.push(bin(BinaryOp::And));
    let compiled = compile_ok(&events);
    assert_eq!(compiled.result_type, ResultType::BOOL);
    let outcome = run(&compiled, &Host::new()).unwrap();
    assert!(!outcome.value.as_bool());
    assert_eq!(outcome.comparisons, 0);
    assert!(outcome.steps < 10, "took {} steps", outcome.steps);
}

#[test]
fn test_long_in_list() {
    // 3 in (1, sum(50), 3): the first item's jump to the hit skips the sum
    let mut events = vec![int(3), int(1)];
    events.extend(sum_events(50));
    events.push(int(3));
    events.push(ev(NodeTag::InList { count: 3 }));
    let compiled = compile_ok(&events);
    assert!(has(&compiled, OpCode::JumpIfTrueLong));
    assert!(has(&compiled, OpCode::JumpIfTrue));
    let outcome = run(&compiled, &Host::new()).unwrap();
    assert!(outcome.value.as_bool());
    assert_eq!(outcome.comparisons, 3);
}

// =============================================================================
// Random nesting
// =============================================================================

/// A formula shape: sums at the leaves, conditionals above them.
#[derive(Debug, Clone)]
enum Shape {
    Sum(u64),
    If(bool, Box<Shape>, Box<Shape>),
}

impl Shape {
    fn events(&self) -> Vec<ReduceEvent<'static>> {
        match self {
            Shape::Sum(n) => sum_events(*n),
            Shape::If(c, t, f) => conditional(*c, t.events(), f.events()),
        }
    }

    fn value(&self) -> i32 {
        match self {
            Shape::Sum(n) => sum(*n),
            Shape::If(true, t, _) => t.value(),
            Shape::If(false, _, f) => f.value(),
        }
    }
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = (1u64..70).prop_map(Shape::Sum);
    leaf.prop_recursive(4, 24, 2, |inner| {
        (any::<bool>(), inner.clone(), inner)
            .prop_map(|(c, t, f)| Shape::If(c, Box::new(t), Box::new(f)))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn nested_conditionals_evaluate_correctly(shape in shape()) {
        let compiled = compile_ok(&shape.events());
        let outcome = run(&compiled, &Host::new()).map_err(TestCaseError::fail)?;
        prop_assert_eq!(outcome.value, Value::I32(shape.value()));
        prop_assert!(compiled.labels.iter().all(|&l| l <= compiled.chunk.len()));
    }
}
