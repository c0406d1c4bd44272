//! Shared test infrastructure: a reference evaluator for compiled formulas.
//!
//! The evaluator runs a [`CompiledExpression`] directly over its bytecode.
//! Shifts do not mask their count and checked opcodes trap, so the tests
//! can observe exactly what the compiler emitted.

#![allow(dead_code)]

use std::collections::HashMap;

use formula::prelude::*;
use formula::compiler::bytecode::Constant;
use formula::types::runtime;

/// A value on the evaluator stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Null,
    /// A host object, by id.
    Obj(u32),
}

impl Value {
    pub fn as_bool(&self) -> bool {
        matches!(self, Value::I32(v) if *v != 0)
    }

    fn truth(b: bool) -> Value {
        Value::I32(i32::from(b))
    }

    fn render(&self) -> String {
        match self {
            Value::I32(v) => v.to_string(),
            Value::I64(v) => v.to_string(),
            Value::F32(v) => v.to_string(),
            Value::F64(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::Null => String::new(),
            Value::Obj(id) => format!("#{id}"),
        }
    }
}

type HostFn = Box<dyn Fn(&[Value]) -> Value>;
type FieldFn = Box<dyn Fn(&Value) -> Value>;

/// Native side of an evaluation: the owner object plus bound members.
pub struct Host {
    pub owner: Value,
    functions: HashMap<TypeHash, HostFn>,
    fields: HashMap<TypeHash, FieldFn>,
    statics: HashMap<TypeHash, Value>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// A host with the runtime helpers bound.
    pub fn new() -> Self {
        let host = Host {
            owner: Value::Null,
            functions: HashMap::new(),
            fields: HashMap::new(),
            statics: HashMap::new(),
        };
        host.function(runtime::STRING_CONCAT, |args| {
            Value::Str(format!("{}{}", args[0].render(), args[1].render()))
        })
        .function(runtime::STRING_CONCAT_OBJECT, |args| {
            Value::Str(format!("{}{}", args[0].render(), args[1].render()))
        })
        .function(runtime::STRING_EQUALS, |args| {
            let (Value::Str(a), Value::Str(b), Value::I32(mode)) = (&args[0], &args[1], &args[2])
            else {
                return Value::truth(args[0] == args[1]);
            };
            let ignore_case = mode % 2 == 1;
            Value::truth(if ignore_case {
                a.eq_ignore_ascii_case(b)
            } else {
                a == b
            })
        })
        .function(runtime::MATH_POW, |args| match (&args[0], &args[1]) {
            (Value::F64(a), Value::F64(b)) => Value::F64(a.powf(*b)),
            _ => Value::Null,
        })
    }

    pub fn owner(mut self, owner: Value) -> Self {
        self.owner = owner;
        self
    }

    /// Bind a static function, operator or instance method.
    ///
    /// Instance methods receive their target as the first argument.
    pub fn function(mut self, hash: TypeHash, f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        self.functions.insert(hash, Box::new(f));
        self
    }

    /// Bind an instance field.
    pub fn field(mut self, hash: TypeHash, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.fields.insert(hash, Box::new(f));
        self
    }

    pub fn static_field(mut self, hash: TypeHash, value: Value) -> Self {
        self.statics.insert(hash, value);
        self
    }
}

/// Result of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    /// Comparison instructions executed.
    pub comparisons: usize,
    /// Instructions executed.
    pub steps: usize,
}

const STEP_LIMIT: usize = 1_000_000;

/// Run a compiled expression to its `Return`.
pub fn run(compiled: &CompiledExpression, host: &Host) -> Result<Outcome, String> {
    let chunk = &compiled.chunk;
    let mut stack: Vec<Value> = Vec::new();
    let mut locals = vec![Value::Null; usize::from(compiled.local_count)];
    let mut comparisons = 0;
    let mut steps = 0;
    let mut pc = 0;

    macro_rules! pop {
        () => {
            stack.pop().ok_or_else(|| format!("stack underflow at {pc}"))?
        };
    }

    loop {
        steps += 1;
        if steps > STEP_LIMIT {
            return Err("step limit exceeded".into());
        }
        let op = chunk
            .read_op(pc)
            .ok_or_else(|| format!("bad opcode at {pc}"))?;
        let mut next = pc + 1 + op.operand_size();
        if op.is_comparison() {
            comparisons += 1;
        }

        match op {
            OpCode::Constant => {
                let index = chunk.read_byte(pc + 1).ok_or("truncated")?;
                stack.push(constant(compiled, u32::from(index))?);
            }
            OpCode::ConstantWide => {
                let index = chunk.read_u16(pc + 1).ok_or("truncated")?;
                stack.push(constant(compiled, u32::from(index))?);
            }
            OpCode::PushNull => stack.push(Value::Null),
            OpCode::PushTrue => stack.push(Value::truth(true)),
            OpCode::PushFalse => stack.push(Value::truth(false)),
            OpCode::Pop => {
                pop!();
            }
            OpCode::Dup => {
                let top = stack.last().cloned().ok_or("dup on empty stack")?;
                stack.push(top);
            }
            OpCode::GetLocal => {
                let slot = chunk.read_byte(pc + 1).ok_or("truncated")?;
                stack.push(locals[usize::from(slot)].clone());
            }
            OpCode::SetLocal => {
                let slot = chunk.read_byte(pc + 1).ok_or("truncated")?;
                locals[usize::from(slot)] = pop!();
            }
            OpCode::GetOwner => stack.push(host.owner.clone()),

            OpCode::Neg => {
                let v = pop!();
                stack.push(match v {
                    Value::I32(x) => Value::I32(x.wrapping_neg()),
                    Value::I64(x) => Value::I64(x.wrapping_neg()),
                    Value::F32(x) => Value::F32(-x),
                    Value::F64(x) => Value::F64(-x),
                    other => return Err(format!("NEG on {other:?}")),
                });
            }
            OpCode::BitNot => {
                let v = pop!();
                stack.push(match v {
                    Value::I32(x) => Value::I32(!x),
                    Value::I64(x) => Value::I64(!x),
                    other => return Err(format!("BIT_NOT on {other:?}")),
                });
            }
            OpCode::Not => {
                let v = pop!();
                stack.push(Value::truth(!v.as_bool()));
            }
            OpCode::Shl | OpCode::Shr | OpCode::ShrUnsigned => {
                let count = pop!();
                let value = pop!();
                let Value::I32(count) = count else {
                    return Err("shift count is not an int".into());
                };
                stack.push(shift(op, value, count as u32)?);
            }
            OpCode::Eq | OpCode::Gt | OpCode::GtUnsigned | OpCode::Lt | OpCode::LtUnsigned => {
                let b = pop!();
                let a = pop!();
                stack.push(Value::truth(compare(op, &a, &b)?));
            }
            OpCode::Add
            | OpCode::AddChecked
            | OpCode::AddCheckedUnsigned
            | OpCode::Sub
            | OpCode::SubChecked
            | OpCode::SubCheckedUnsigned
            | OpCode::Mul
            | OpCode::MulChecked
            | OpCode::MulCheckedUnsigned
            | OpCode::Div
            | OpCode::DivUnsigned
            | OpCode::Rem
            | OpCode::RemUnsigned
            | OpCode::And
            | OpCode::Or
            | OpCode::Xor => {
                let b = pop!();
                let a = pop!();
                stack.push(arithmetic(op, a, b)?);
            }

            OpCode::ToF32 | OpCode::ToF64 => {
                let v = pop!();
                let f = match v {
                    Value::I32(x) => f64::from(x),
                    Value::I64(x) => x as f64,
                    Value::F32(x) => f64::from(x),
                    Value::F64(x) => x,
                    other => return Err(format!("{} on {other:?}", op.name())),
                };
                stack.push(if op == OpCode::ToF32 {
                    Value::F32(f as f32)
                } else {
                    Value::F64(f)
                });
            }
            OpCode::ToFloatUnsigned => {
                let v = pop!();
                stack.push(match v {
                    Value::I32(x) => Value::I64(i64::from(x as u32)),
                    Value::I64(x) => Value::F64(x as u64 as f64),
                    other => return Err(format!("TO_FLOAT_UN on {other:?}")),
                });
            }
            op if op.name().starts_with("TO_") => {
                let v = pop!();
                stack.push(convert(op, v)?);
            }

            OpCode::Call | OpCode::CallMethod => {
                let index = chunk.read_u16(pc + 1).ok_or("truncated")?;
                let argc = usize::from(chunk.read_byte(pc + 3).ok_or("truncated")?);
                let hash = type_hash(compiled, index)?;
                let mut args = stack.split_off(
                    stack
                        .len()
                        .checked_sub(argc)
                        .ok_or("call arguments underflow")?,
                );
                if op == OpCode::CallMethod {
                    args.insert(0, pop!());
                }
                let f = host
                    .functions
                    .get(&hash)
                    .ok_or_else(|| format!("unbound function {hash:?}"))?;
                stack.push(f(&args));
            }
            OpCode::GetField => {
                let hash = type_hash(compiled, chunk.read_u16(pc + 1).ok_or("truncated")?)?;
                let target = pop!();
                let f = host
                    .fields
                    .get(&hash)
                    .ok_or_else(|| format!("unbound field {hash:?}"))?;
                stack.push(f(&target));
            }
            OpCode::GetStatic => {
                let hash = type_hash(compiled, chunk.read_u16(pc + 1).ok_or("truncated")?)?;
                let value = host
                    .statics
                    .get(&hash)
                    .cloned()
                    .ok_or_else(|| format!("unbound static {hash:?}"))?;
                stack.push(value);
            }
            OpCode::Box | OpCode::Unbox | OpCode::CastClass => {}

            OpCode::Jump | OpCode::JumpLong => {
                next = chunk.branch_target(pc).ok_or("bad branch")?;
            }
            OpCode::JumpIfFalse | OpCode::JumpIfFalseLong => {
                if !pop!().as_bool() {
                    next = chunk.branch_target(pc).ok_or("bad branch")?;
                }
            }
            OpCode::JumpIfTrue | OpCode::JumpIfTrueLong => {
                if pop!().as_bool() {
                    next = chunk.branch_target(pc).ok_or("bad branch")?;
                }
            }
            OpCode::Return => {
                let value = pop!();
                if !stack.is_empty() {
                    return Err(format!("{} values left on the stack", stack.len()));
                }
                return Ok(Outcome {
                    value,
                    comparisons,
                    steps,
                });
            }
            other => return Err(format!("unhandled {}", other.name())),
        }
        pc = next;
    }
}

fn constant(compiled: &CompiledExpression, index: u32) -> Result<Value, String> {
    Ok(match compiled.constants.get(index) {
        Some(Constant::Int32(v)) => Value::I32(*v),
        Some(Constant::Int64(v)) => Value::I64(*v),
        Some(Constant::Float32(v)) => Value::F32(*v),
        Some(Constant::Float64(v)) => Value::F64(*v),
        Some(Constant::String(s)) => Value::Str(s.clone()),
        other => return Err(format!("constant {index} is {other:?}")),
    })
}

fn type_hash(compiled: &CompiledExpression, index: u16) -> Result<TypeHash, String> {
    match compiled.constants.get(u32::from(index)) {
        Some(Constant::TypeHash(h)) => Ok(*h),
        other => Err(format!("constant {index} is not a hash: {other:?}")),
    }
}

macro_rules! int_op {
    ($op:expr, $x:expr, $y:expr, $s:ty, $u:ty) => {{
        let (x, y): ($s, $s) = ($x, $y);
        let (ux, uy) = (x as $u, y as $u);
        let r: Option<$s> = match $op {
            OpCode::Add => Some(x.wrapping_add(y)),
            OpCode::AddChecked => x.checked_add(y),
            OpCode::AddCheckedUnsigned => ux.checked_add(uy).map(|v| v as $s),
            OpCode::Sub => Some(x.wrapping_sub(y)),
            OpCode::SubChecked => x.checked_sub(y),
            OpCode::SubCheckedUnsigned => ux.checked_sub(uy).map(|v| v as $s),
            OpCode::Mul => Some(x.wrapping_mul(y)),
            OpCode::MulChecked => x.checked_mul(y),
            OpCode::MulCheckedUnsigned => ux.checked_mul(uy).map(|v| v as $s),
            OpCode::Div => x.checked_div(y),
            OpCode::DivUnsigned => ux.checked_div(uy).map(|v| v as $s),
            OpCode::Rem => x.checked_rem(y),
            OpCode::RemUnsigned => ux.checked_rem(uy).map(|v| v as $s),
            OpCode::And => Some(x & y),
            OpCode::Or => Some(x | y),
            OpCode::Xor => Some(x ^ y),
            _ => None,
        };
        r.ok_or_else(|| format!("{} trapped on {x} and {y}", $op.name()))
    }};
}

fn arithmetic(op: OpCode, a: Value, b: Value) -> Result<Value, String> {
    match (a, b) {
        (Value::I32(x), Value::I32(y)) => int_op!(op, x, y, i32, u32).map(Value::I32),
        (Value::I64(x), Value::I64(y)) => int_op!(op, x, y, i64, u64).map(Value::I64),
        (Value::F32(x), Value::F32(y)) => float_op(op, f64::from(x), f64::from(y))
            .map(|v| Value::F32(v as f32)),
        (Value::F64(x), Value::F64(y)) => float_op(op, x, y).map(Value::F64),
        (a, b) => Err(format!("{} on {a:?} and {b:?}", op.name())),
    }
}

fn float_op(op: OpCode, x: f64, y: f64) -> Result<f64, String> {
    Ok(match op {
        OpCode::Add | OpCode::AddChecked => x + y,
        OpCode::Sub | OpCode::SubChecked => x - y,
        OpCode::Mul | OpCode::MulChecked => x * y,
        OpCode::Div => x / y,
        OpCode::Rem => x % y,
        other => return Err(format!("{} on floats", other.name())),
    })
}

fn shift(op: OpCode, value: Value, count: u32) -> Result<Value, String> {
    Ok(match (op, value) {
        (OpCode::Shl, Value::I32(x)) => Value::I32(x.checked_shl(count).unwrap_or(0)),
        (OpCode::Shl, Value::I64(x)) => Value::I64(x.checked_shl(count).unwrap_or(0)),
        (OpCode::Shr, Value::I32(x)) => Value::I32(x.checked_shr(count).unwrap_or(x >> 31)),
        (OpCode::Shr, Value::I64(x)) => Value::I64(x.checked_shr(count).unwrap_or(x >> 63)),
        (OpCode::ShrUnsigned, Value::I32(x)) => {
            Value::I32((x as u32).checked_shr(count).unwrap_or(0) as i32)
        }
        (OpCode::ShrUnsigned, Value::I64(x)) => {
            Value::I64((x as u64).checked_shr(count).unwrap_or(0) as i64)
        }
        (op, v) => return Err(format!("{} on {v:?}", op.name())),
    })
}

fn compare(op: OpCode, a: &Value, b: &Value) -> Result<bool, String> {
    macro_rules! ordered {
        ($x:expr, $y:expr, $u:ty) => {
            match op {
                OpCode::Eq => $x == $y,
                OpCode::Gt => $x > $y,
                OpCode::Lt => $x < $y,
                OpCode::GtUnsigned => ($x as $u) > ($y as $u),
                OpCode::LtUnsigned => ($x as $u) < ($y as $u),
                _ => unreachable!(),
            }
        };
    }
    macro_rules! unordered {
        ($x:expr, $y:expr) => {
            match op {
                OpCode::Eq => $x == $y,
                OpCode::Gt => $x > $y,
                OpCode::Lt => $x < $y,
                OpCode::GtUnsigned => !($x <= $y),
                OpCode::LtUnsigned => !($x >= $y),
                _ => unreachable!(),
            }
        };
    }
    Ok(match (a, b) {
        (Value::I32(x), Value::I32(y)) => ordered!(*x, *y, u32),
        (Value::I64(x), Value::I64(y)) => ordered!(*x, *y, u64),
        (Value::F32(x), Value::F32(y)) => unordered!(*x, *y),
        (Value::F64(x), Value::F64(y)) => unordered!(*x, *y),
        (a, b) if op == OpCode::Eq => a == b,
        (a, b) => return Err(format!("{} on {a:?} and {b:?}", op.name())),
    })
}

/// Integer conversions: destination range, whether the source is read as
/// unsigned, and whether out-of-range values trap.
fn convert(op: OpCode, value: Value) -> Result<Value, String> {
    use OpCode::*;
    let name = op.name();
    let checked = name.contains("_OVF");
    let unsigned_source = name.ends_with("_UN") || op == ToU64;
    let (min, max, wide): (i128, i128, bool) = match op {
        ToI8 | ToI8Checked | ToI8CheckedUnsigned => (i8::MIN.into(), i8::MAX.into(), false),
        ToU8 | ToU8Checked | ToU8CheckedUnsigned => (0, u8::MAX.into(), false),
        ToI16 | ToI16Checked | ToI16CheckedUnsigned => (i16::MIN.into(), i16::MAX.into(), false),
        ToU16 | ToU16Checked | ToU16CheckedUnsigned => (0, u16::MAX.into(), false),
        ToI32 | ToI32Checked | ToI32CheckedUnsigned => (i32::MIN.into(), i32::MAX.into(), false),
        ToU32 | ToU32Checked | ToU32CheckedUnsigned => (0, u32::MAX.into(), false),
        ToI64 | ToI64Checked | ToI64CheckedUnsigned => (i64::MIN.into(), i64::MAX.into(), true),
        ToU64 | ToU64Checked | ToU64CheckedUnsigned => (0, u64::MAX.into(), true),
        other => return Err(format!("unhandled conversion {}", other.name())),
    };

    let n: i128 = match value {
        Value::I32(x) if unsigned_source => i128::from(x as u32),
        Value::I32(x) => i128::from(x),
        Value::I64(x) if unsigned_source => i128::from(x as u64),
        Value::I64(x) => i128::from(x),
        Value::F32(x) => float_source(f64::from(x), checked, min, max)?,
        Value::F64(x) => float_source(x, checked, min, max)?,
        other => return Err(format!("{name} on {other:?}")),
    };
    if checked && (n < min || n > max) {
        return Err(format!("{name} trapped on {n}"));
    }

    // two's complement wrap into the destination width
    let span = max - min + 1;
    let wrapped = (n - min).rem_euclid(span) + min;
    Ok(if wide {
        Value::I64(wrapped as i64)
    } else {
        Value::I32(wrapped as i32)
    })
}

fn float_source(x: f64, checked: bool, min: i128, max: i128) -> Result<i128, String> {
    let t = x.trunc();
    if checked && !(t >= min as f64 && t <= max as f64) {
        return Err(format!("conversion trapped on {x}"));
    }
    Ok(t as i128)
}

// =============================================================================
// Building formulas
// =============================================================================

/// One reduction event at column `col`.
pub fn at(tag: NodeTag<'_>, col: u32) -> ReduceEvent<'_> {
    ReduceEvent::new(tag, Span::new(1, col, 1))
}

pub fn ev(tag: NodeTag<'_>) -> ReduceEvent<'_> {
    at(tag, 1)
}

pub fn int(value: u64) -> ReduceEvent<'static> {
    ev(NodeTag::Integer(value))
}

pub fn real(value: f64) -> ReduceEvent<'static> {
    ev(NodeTag::Real(value))
}

pub fn lit(literal: Literal<'_>) -> ReduceEvent<'_> {
    ev(NodeTag::Literal(literal))
}

pub fn bin(op: BinaryOp) -> ReduceEvent<'static> {
    ev(NodeTag::Binary(op))
}

pub fn un(op: UnaryOp) -> ReduceEvent<'static> {
    ev(NodeTag::Unary(op))
}

pub fn cast(target: ResultType) -> ReduceEvent<'static> {
    ev(NodeTag::Cast(target))
}

/// Bare or targeted member read.
pub fn field(name: &str, has_target: bool) -> ReduceEvent<'_> {
    ev(NodeTag::Member {
        name,
        has_target,
        argc: None,
    })
}

pub fn call(name: &str, has_target: bool, argc: u8) -> ReduceEvent<'_> {
    ev(NodeTag::Member {
        name,
        has_target,
        argc: Some(argc),
    })
}

/// Compile against the primitive registry with default options.
pub fn compile_with(
    registry: &TypeRegistry,
    options: CompilerOptions,
    events: &[ReduceEvent<'_>],
) -> Result<CompiledExpression, CompilationError> {
    let ctx = CompilationContext::with_options(registry, options);
    compile_events(events, &ctx)
}

pub fn compile_ok(events: &[ReduceEvent<'_>]) -> CompiledExpression {
    let registry = TypeRegistry::with_primitives();
    compile_with(&registry, CompilerOptions::default(), events)
        .unwrap_or_else(|e| panic!("compile failed: {e}"))
}

pub fn compile_err(events: &[ReduceEvent<'_>]) -> CompilationError {
    let registry = TypeRegistry::with_primitives();
    match compile_with(&registry, CompilerOptions::default(), events) {
        Ok(compiled) => panic!("expected an error, got:\n{}", compiled.disassemble()),
        Err(e) => e,
    }
}

/// Compile and evaluate with the default host.
pub fn eval(events: &[ReduceEvent<'_>]) -> Value {
    let compiled = compile_ok(events);
    run(&compiled, &Host::new())
        .unwrap_or_else(|e| panic!("{e}\n{}", compiled.disassemble()))
        .value
}

/// Print compiler logs for a test when `RUST_LOG` is set.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
