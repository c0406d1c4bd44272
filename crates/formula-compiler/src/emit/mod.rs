//! Code emission.
//!
//! One walker, [`CodeGen`], turns an element tree into instructions through
//! a [`CodeSink`]. It runs twice per compile:
//!
//! 1. [`estimate_layout`] walks into a [`LayoutSink`] that only counts
//!    bytes, treating every branch as short, and records each branch and
//!    label offset.
//! 2. [`branch::relax`] decides which branches need the long encoding.
//! 3. [`emit`] walks the same tree into a [`BytecodeEmitter`] that follows
//!    the resulting [`BranchPlan`].
//!
//! Labels and temporary locals are allocated in walk order, so both passes
//! see identical numbering.

pub mod branch;
mod convert;
mod emitter;
mod layout;

pub use branch::{BranchPlan, BranchRecord, Layout, relax};
pub use convert::{NumericOps, explicit_ops, implicit_ops};
pub use emitter::{BytecodeEmitter, Emission};
pub use layout::LayoutSink;

use formula_core::{CompilationError, NumericKind, TypeHash, runtime};
use tracing::instrument;

use crate::bytecode::{Constant, ConstantPool, OpCode};
use crate::conversion::Conversion;
use crate::elements::{
    ArithmeticOp, ArithmeticPlan, CallTarget, CompareOp, ComparePlan, Element, ElementKind,
    ListItem, Literal, LogicalOp, LogicalPlan, MemberAccess, Receiver, ShiftOp, ShiftPlan,
    UnaryPlan,
};

type Result<T> = std::result::Result<T, CompilationError>;

/// Grow the stack when less than this remains.
const STACK_RED_ZONE: usize = 100 * 1024;

/// Size of each stack segment added by [`stacker::maybe_grow`].
const STACK_GROWTH: usize = 1024 * 1024;

/// A jump target, numbered in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);

impl Label {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    Always,
    /// Pops a bool and branches when it is false.
    IfFalse,
    /// Pops a bool and branches when it is true.
    IfTrue,
}

impl BranchKind {
    pub const fn short_op(self) -> OpCode {
        match self {
            BranchKind::Always => OpCode::Jump,
            BranchKind::IfFalse => OpCode::JumpIfFalse,
            BranchKind::IfTrue => OpCode::JumpIfTrue,
        }
    }

    pub const fn long_op(self) -> OpCode {
        match self {
            BranchKind::Always => OpCode::JumpLong,
            BranchKind::IfFalse => OpCode::JumpIfFalseLong,
            BranchKind::IfTrue => OpCode::JumpIfTrueLong,
        }
    }
}

/// Destination of emitted instructions.
pub trait CodeSink {
    /// Byte offset of the next instruction.
    fn offset(&self) -> usize;

    /// Source line for subsequent instructions.
    fn set_line(&mut self, line: u32);

    fn op(&mut self, op: OpCode);

    fn op_u8(&mut self, op: OpCode, operand: u8);

    /// Load a constant, using the wide form past index 255.
    fn constant(&mut self, constant: Constant) -> Result<()>;

    /// An instruction whose operand is the pool index of `hash`.
    fn hash_op(&mut self, op: OpCode, hash: TypeHash) -> Result<()>;

    /// `Call` or `CallMethod` of `hash` with `argc` arguments.
    fn call(&mut self, op: OpCode, hash: TypeHash, argc: u8) -> Result<()>;

    fn branch(&mut self, kind: BranchKind, target: Label);

    /// Bind `label` to the current offset.
    fn mark(&mut self, label: Label);
}

/// Pool index for an operand, or an error past the `u16` range.
pub(crate) fn pool_index(pool: &mut ConstantPool, constant: Constant) -> Result<u16> {
    let index = pool.add(constant);
    u16::try_from(index).map_err(|_| {
        CompilationError::internal(format!("constant pool exceeds {} entries", u16::MAX))
    })
}

/// Walks an element tree into a [`CodeSink`].
pub struct CodeGen<S> {
    sink: S,
    next_label: u32,
    live_locals: u16,
    max_locals: u16,
}

impl<S: CodeSink> CodeGen<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            next_label: 0,
            live_locals: 0,
            max_locals: 0,
        }
    }

    /// The sink and the number of temporary locals used.
    pub fn finish(self) -> (S, u16) {
        (self.sink, self.max_locals)
    }

    /// Emit a whole expression; `root` must be a root element.
    pub fn program(&mut self, root: &Element<'_>) -> Result<()> {
        if !root.is_root() {
            return Err(CompilationError::internal(
                "expression tree does not end in a root",
            ));
        }
        self.element(root)
    }

    // ==========================================================================
    // Bookkeeping
    // ==========================================================================

    fn new_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn alloc_local(&mut self) -> Result<u8> {
        let slot = u8::try_from(self.live_locals)
            .map_err(|_| CompilationError::internal("too many temporary locals"))?;
        self.live_locals += 1;
        self.max_locals = self.max_locals.max(self.live_locals);
        Ok(slot)
    }

    fn free_local(&mut self) {
        self.live_locals = self.live_locals.saturating_sub(1);
    }

    fn invoke(&mut self, call: &CallTarget<'_>) -> Result<()> {
        let argc = u8::try_from(call.argc())
            .map_err(|_| CompilationError::internal("call has more than 255 arguments"))?;
        let op = if call.is_static {
            OpCode::Call
        } else {
            OpCode::CallMethod
        };
        self.sink.call(op, call.method, argc)
    }

    /// Emit `element` followed by `conversion`.
    fn operand(&mut self, element: &Element<'_>, conversion: Conversion) -> Result<()> {
        self.element(element)?;
        self.conversion(conversion)
    }

    // ==========================================================================
    // Elements
    // ==========================================================================

    /// Left-deep operator chains nest as deep as the formula is long, so
    /// every level of the walk makes sure there is stack left to recurse into.
    fn element(&mut self, element: &Element<'_>) -> Result<()> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROWTH, || self.element_inner(element))
    }

    fn element_inner(&mut self, element: &Element<'_>) -> Result<()> {
        self.sink.set_line(element.span.line);
        match element.kind {
            ElementKind::Literal(literal) => self.literal(literal),
            ElementKind::Arithmetic {
                op,
                left,
                right,
                plan,
            } => self.arithmetic(op, left, right, &plan),
            ElementKind::Compare {
                op,
                left,
                right,
                plan,
            } => {
                let (lc, rc) = plan.operand_conversions();
                self.operand(left, lc)?;
                self.operand(right, rc)?;
                self.compare_tail(op, &plan)
            }
            ElementKind::Shift {
                op,
                left,
                right,
                plan,
            } => self.shift(op, left, right, &plan),
            ElementKind::Unary { operand, plan, .. } => self.unary(operand, &plan),
            ElementKind::Logical {
                op,
                left,
                right,
                plan,
            } => self.logical(op, left, right, &plan),
            ElementKind::Cast { operand, plan } => {
                self.element(operand)?;
                self.cast(plan)
            }
            ElementKind::Conditional {
                condition,
                when_true,
                when_false,
                true_conversion,
                false_conversion,
            } => {
                let otherwise = self.new_label();
                let end = self.new_label();
                self.element(condition)?;
                self.sink.branch(BranchKind::IfFalse, otherwise);
                self.operand(when_true, true_conversion)?;
                self.sink.branch(BranchKind::Always, end);
                self.sink.mark(otherwise);
                self.operand(when_false, false_conversion)?;
                self.sink.mark(end);
                Ok(())
            }
            ElementKind::InList { probe, items } => self.in_list(probe, items),
            ElementKind::InCollection {
                probe,
                collection,
                conversion,
                contains,
            } => {
                self.element(collection)?;
                self.operand(probe, conversion)?;
                self.sink.call(OpCode::CallMethod, contains, 1)
            }
            ElementKind::Member { receiver, access } => self.member(receiver, &access),
            ElementKind::Root { child, conversion } => {
                self.operand(child, conversion)?;
                self.sink.op(OpCode::Return);
                Ok(())
            }
        }
    }

    fn literal(&mut self, literal: Literal<'_>) -> Result<()> {
        match literal {
            Literal::Bool(true) => self.sink.op(OpCode::PushTrue),
            Literal::Bool(false) => self.sink.op(OpCode::PushFalse),
            Literal::Null => self.sink.op(OpCode::PushNull),
            Literal::Int(v) => return self.sink.constant(Constant::Int32(v)),
            Literal::UInt(v) => return self.sink.constant(Constant::Int32(v as i32)),
            Literal::Long(v) => return self.sink.constant(Constant::Int64(v)),
            Literal::ULong(v) => return self.sink.constant(Constant::Int64(v as i64)),
            Literal::Float(v) => return self.sink.constant(Constant::Float32(v)),
            Literal::Double(v) => return self.sink.constant(Constant::Float64(v)),
            Literal::Char(v) => return self.sink.constant(Constant::Int32(i32::from(v))),
            Literal::String(s) => return self.sink.constant(Constant::String(s.to_string())),
        }
        Ok(())
    }

    /// Constant `value` in the stack category of `kind`.
    fn numeric_constant(&mut self, kind: NumericKind, value: i8) -> Result<()> {
        let constant = match kind {
            NumericKind::I64 | NumericKind::U64 => Constant::Int64(i64::from(value)),
            NumericKind::F32 => Constant::Float32(f32::from(value)),
            NumericKind::F64 => Constant::Float64(f64::from(value)),
            _ => Constant::Int32(i32::from(value)),
        };
        self.sink.constant(constant)
    }

    fn arithmetic(
        &mut self,
        op: ArithmeticOp,
        left: &Element<'_>,
        right: &Element<'_>,
        plan: &ArithmeticPlan<'_>,
    ) -> Result<()> {
        match plan {
            ArithmeticPlan::Operator(call) => {
                self.operand(left, call.conversion(0))?;
                self.operand(right, call.conversion(1))?;
                self.invoke(call)
            }
            ArithmeticPlan::Numeric {
                checked,
                unsigned,
                left: lc,
                right: rc,
                ..
            } => {
                self.operand(left, *lc)?;
                self.operand(right, *rc)?;
                self.sink.op(arithmetic_op(op, *checked, *unsigned));
                Ok(())
            }
            ArithmeticPlan::Concat {
                helper,
                left: lc,
                right: rc,
            } => {
                self.operand(left, *lc)?;
                self.operand(right, *rc)?;
                self.sink.call(OpCode::Call, *helper, 2)
            }
            ArithmeticPlan::PowerUnrolled {
                exponent,
                kind,
                checked,
            } => {
                self.element(left)?;
                let slot = self.alloc_local()?;
                self.sink.op_u8(OpCode::SetLocal, slot);
                let mul = arithmetic_op(ArithmeticOp::Mul, *checked, kind.is_unsigned());
                self.power(*exponent, slot, *kind, mul)?;
                self.free_local();
                if kind.bits() < 32 {
                    for narrow in explicit_ops(NumericKind::I32, *kind, *checked).iter() {
                        self.sink.op(narrow);
                    }
                }
                Ok(())
            }
            ArithmeticPlan::PowerCall {
                left: lc,
                right: rc,
            } => {
                self.operand(left, *lc)?;
                self.operand(right, *rc)?;
                self.sink.call(OpCode::Call, runtime::MATH_POW, 2)
            }
        }
    }

    /// Square-and-multiply over the base stored in `slot`.
    fn power(&mut self, n: u32, slot: u8, kind: NumericKind, mul: OpCode) -> Result<()> {
        match n {
            0 => self.numeric_constant(kind, 1),
            1 => {
                self.sink.op_u8(OpCode::GetLocal, slot);
                Ok(())
            }
            n if n % 2 == 0 => {
                self.power(n / 2, slot, kind, mul)?;
                self.sink.op(OpCode::Dup);
                self.sink.op(mul);
                Ok(())
            }
            n => {
                self.power(n - 1, slot, kind, mul)?;
                self.sink.op_u8(OpCode::GetLocal, slot);
                self.sink.op(mul);
                Ok(())
            }
        }
    }

    /// Everything after both compare operands are on the stack.
    fn compare_tail(&mut self, op: CompareOp, plan: &ComparePlan<'_>) -> Result<()> {
        match plan {
            ComparePlan::Operator { call, negate } => {
                self.invoke(call)?;
                if *negate {
                    self.sink.op(OpCode::Not);
                }
            }
            ComparePlan::Numeric { kind, .. } | ComparePlan::Enum(kind) => {
                for code in compare_ops(op, kind.is_unsigned(), kind.is_floating()) {
                    self.sink.op(code);
                }
            }
            ComparePlan::String(mode) => {
                self.sink.constant(Constant::Int32(*mode as i32))?;
                self.sink.call(OpCode::Call, runtime::STRING_EQUALS, 3)?;
                if op == CompareOp::Ne {
                    self.sink.op(OpCode::Not);
                }
            }
            ComparePlan::Boolean | ComparePlan::Reference => {
                self.sink.op(OpCode::Eq);
                if op == CompareOp::Ne {
                    self.sink.op(OpCode::Not);
                }
            }
        }
        Ok(())
    }

    fn shift(
        &mut self,
        op: ShiftOp,
        left: &Element<'_>,
        right: &Element<'_>,
        plan: &ShiftPlan<'_>,
    ) -> Result<()> {
        match plan {
            ShiftPlan::Operator(call) => {
                self.operand(left, call.conversion(0))?;
                self.operand(right, call.conversion(1))?;
                self.invoke(call)
            }
            ShiftPlan::Numeric {
                kind,
                left: lc,
                right: rc,
            } => {
                self.operand(left, *lc)?;
                self.operand(right, *rc)?;
                let mask = if kind.is_wide() { 0x3F } else { 0x1F };
                self.sink.constant(Constant::Int32(mask))?;
                self.sink.op(OpCode::And);
                self.sink.op(match op {
                    ShiftOp::Shl => OpCode::Shl,
                    ShiftOp::Shr if kind.is_unsigned() => OpCode::ShrUnsigned,
                    ShiftOp::Shr => OpCode::Shr,
                });
                Ok(())
            }
        }
    }

    fn unary(&mut self, operand: &Element<'_>, plan: &UnaryPlan<'_>) -> Result<()> {
        match plan {
            UnaryPlan::Operator(call) => {
                self.operand(operand, call.conversion(0))?;
                self.invoke(call)
            }
            UnaryPlan::Negate {
                kind,
                checked: true,
                conversion,
            } => {
                self.numeric_constant(*kind, 0)?;
                self.operand(operand, *conversion)?;
                self.sink.op(OpCode::SubChecked);
                Ok(())
            }
            UnaryPlan::Negate { conversion, .. } => {
                self.operand(operand, *conversion)?;
                self.sink.op(OpCode::Neg);
                Ok(())
            }
            UnaryPlan::Plus { conversion } => self.operand(operand, *conversion),
            UnaryPlan::Not => {
                self.element(operand)?;
                self.sink.op(OpCode::Not);
                Ok(())
            }
            UnaryPlan::Complement { conversion, .. } => {
                self.operand(operand, *conversion)?;
                self.sink.op(OpCode::BitNot);
                Ok(())
            }
        }
    }

    fn logical(
        &mut self,
        op: LogicalOp,
        left: &Element<'_>,
        right: &Element<'_>,
        plan: &LogicalPlan<'_>,
    ) -> Result<()> {
        match plan {
            LogicalPlan::Operator(call) => {
                self.operand(left, call.conversion(0))?;
                self.operand(right, call.conversion(1))?;
                self.invoke(call)
            }
            LogicalPlan::ShortCircuit => {
                let end = self.new_label();
                self.element(left)?;
                self.sink.op(OpCode::Dup);
                let kind = match op {
                    LogicalOp::Or => BranchKind::IfTrue,
                    _ => BranchKind::IfFalse,
                };
                self.sink.branch(kind, end);
                self.sink.op(OpCode::Pop);
                self.element(right)?;
                self.sink.mark(end);
                Ok(())
            }
            LogicalPlan::BoolXor => {
                self.element(left)?;
                self.element(right)?;
                self.sink.op(OpCode::Xor);
                Ok(())
            }
            LogicalPlan::Bitwise {
                left: lc,
                right: rc,
                ..
            } => {
                self.operand(left, *lc)?;
                self.operand(right, *rc)?;
                self.sink.op(match op {
                    LogicalOp::And => OpCode::And,
                    LogicalOp::Or => OpCode::Or,
                    LogicalOp::Xor => OpCode::Xor,
                });
                Ok(())
            }
        }
    }

    /// Probe into a temporary, then one equality test per item; the first
    /// match jumps to the `true` tail.
    fn in_list(&mut self, probe: &Element<'_>, items: &[ListItem<'_>]) -> Result<()> {
        let hit = self.new_label();
        let end = self.new_label();
        self.element(probe)?;
        let slot = self.alloc_local()?;
        self.sink.op_u8(OpCode::SetLocal, slot);

        for item in items {
            let (lc, rc) = item.plan.operand_conversions();
            self.sink.op_u8(OpCode::GetLocal, slot);
            self.conversion(lc)?;
            self.operand(item.element, rc)?;
            self.compare_tail(CompareOp::Eq, &item.plan)?;
            self.sink.branch(BranchKind::IfTrue, hit);
        }
        self.free_local();

        self.sink.op(OpCode::PushFalse);
        self.sink.branch(BranchKind::Always, end);
        self.sink.mark(hit);
        self.sink.op(OpCode::PushTrue);
        self.sink.mark(end);
        Ok(())
    }

    fn member(&mut self, receiver: Receiver<'_>, access: &MemberAccess<'_>) -> Result<()> {
        match receiver {
            Receiver::Element(target) => self.element(target)?,
            Receiver::Owner => self.sink.op(OpCode::GetOwner),
            Receiver::Static => {}
        }
        let is_static = matches!(receiver, Receiver::Static);
        match access {
            MemberAccess::Field { member } => {
                let op = if is_static {
                    OpCode::GetStatic
                } else {
                    OpCode::GetField
                };
                self.sink.hash_op(op, *member)
            }
            MemberAccess::Property { member } => {
                let op = if is_static {
                    OpCode::Call
                } else {
                    OpCode::CallMethod
                };
                self.sink.call(op, *member, 0)
            }
            MemberAccess::Method { call, args } => {
                for (i, arg) in args.iter().enumerate() {
                    self.operand(arg, call.conversion(i))?;
                }
                self.invoke(call)
            }
        }
    }
}

/// Opcode for a built-in arithmetic operation.
fn arithmetic_op(op: ArithmeticOp, checked: bool, unsigned: bool) -> OpCode {
    match (op, checked, unsigned) {
        (ArithmeticOp::Add, false, _) => OpCode::Add,
        (ArithmeticOp::Add, true, false) => OpCode::AddChecked,
        (ArithmeticOp::Add, true, true) => OpCode::AddCheckedUnsigned,
        (ArithmeticOp::Sub, false, _) => OpCode::Sub,
        (ArithmeticOp::Sub, true, false) => OpCode::SubChecked,
        (ArithmeticOp::Sub, true, true) => OpCode::SubCheckedUnsigned,
        (ArithmeticOp::Mul | ArithmeticOp::Pow, false, _) => OpCode::Mul,
        (ArithmeticOp::Mul | ArithmeticOp::Pow, true, false) => OpCode::MulChecked,
        (ArithmeticOp::Mul | ArithmeticOp::Pow, true, true) => OpCode::MulCheckedUnsigned,
        (ArithmeticOp::Div, _, false) => OpCode::Div,
        (ArithmeticOp::Div, _, true) => OpCode::DivUnsigned,
        (ArithmeticOp::Mod, _, false) => OpCode::Rem,
        (ArithmeticOp::Mod, _, true) => OpCode::RemUnsigned,
    }
}

/// Instructions comparing two numbers already on the stack.
///
/// `<=` and `>=` are the negation of `>` and `<`; on floats the unordered
/// form is negated so that NaN compares false.
fn compare_ops(op: CompareOp, unsigned: bool, floating: bool) -> Vec<OpCode> {
    let unordered = unsigned || floating;
    match op {
        CompareOp::Eq => vec![OpCode::Eq],
        CompareOp::Ne => vec![OpCode::Eq, OpCode::Not],
        CompareOp::Lt if unsigned => vec![OpCode::LtUnsigned],
        CompareOp::Lt => vec![OpCode::Lt],
        CompareOp::Gt if unsigned => vec![OpCode::GtUnsigned],
        CompareOp::Gt => vec![OpCode::Gt],
        CompareOp::Le if unordered => vec![OpCode::GtUnsigned, OpCode::Not],
        CompareOp::Le => vec![OpCode::Gt, OpCode::Not],
        CompareOp::Ge if unordered => vec![OpCode::LtUnsigned, OpCode::Not],
        CompareOp::Ge => vec![OpCode::Lt, OpCode::Not],
    }
}

/// Trial pass: byte layout with every branch short.
#[instrument(level = "debug", skip_all)]
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn estimate_layout(tree: &Element<'_>) -> Result<Layout> {
    let mut codegen = CodeGen::new(LayoutSink::new());
    codegen.program(tree)?;
    let (sink, _) = codegen.finish();
    sink.into_layout()
}

/// Real pass: bytecode with branch encodings taken from `plan`.
#[instrument(level = "debug", skip_all, fields(long_branches = plan.long_count()))]
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn emit(tree: &Element<'_>, plan: &BranchPlan) -> Result<Emission> {
    let mut codegen = CodeGen::new(BytecodeEmitter::new(plan));
    codegen.program(tree)?;
    let (sink, local_count) = codegen.finish();
    sink.finish(local_count)
}
