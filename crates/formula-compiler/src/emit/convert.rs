//! Conversion and cast emission.

use formula_core::NumericKind;

use super::{CodeGen, CodeSink, Result};
use crate::bytecode::OpCode;
use crate::conversion::{CastPlan, Conversion, ConversionKind};

/// Up to two instructions converting between numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumericOps([Option<OpCode>; 2]);

impl NumericOps {
    const NONE: NumericOps = NumericOps([None, None]);

    const fn one(op: OpCode) -> Self {
        NumericOps([Some(op), None])
    }

    const fn two(first: OpCode, second: OpCode) -> Self {
        NumericOps([Some(first), Some(second)])
    }

    pub fn iter(&self) -> impl Iterator<Item = OpCode> + '_ {
        self.0.iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0].is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

fn to_float(from: NumericKind, to: NumericKind) -> NumericOps {
    let target = if to == NumericKind::F32 {
        OpCode::ToF32
    } else {
        OpCode::ToF64
    };
    match from {
        NumericKind::U32 | NumericKind::U64 => NumericOps::two(OpCode::ToFloatUnsigned, target),
        _ => NumericOps::one(target),
    }
}

/// Instructions for an implicit widening.
///
/// Values narrower than 64 bits already share the 32-bit stack slot, so
/// integral widening only costs an instruction when it crosses into a
/// 64-bit slot.
pub fn implicit_ops(from: NumericKind, to: NumericKind) -> NumericOps {
    if from == to {
        return NumericOps::NONE;
    }
    if to.is_floating() {
        return to_float(from, to);
    }
    if to.is_wide() && !from.is_wide() {
        return NumericOps::one(if from.is_unsigned() {
            OpCode::ToU64
        } else {
            OpCode::ToI64
        });
    }
    NumericOps::NONE
}

/// Instructions for an explicit numeric cast.
///
/// Checked casts trap when the value does not fit; the unsigned variant
/// reads an integral source as unsigned.
pub fn explicit_ops(from: NumericKind, to: NumericKind, checked: bool) -> NumericOps {
    if from == to {
        return NumericOps::NONE;
    }
    if to.is_floating() {
        return to_float(from, to);
    }

    if checked {
        let unsigned_source = from.is_integral() && from.is_unsigned();
        let (signed, unsigned) = match to {
            NumericKind::I8 => (OpCode::ToI8Checked, OpCode::ToI8CheckedUnsigned),
            NumericKind::U8 => (OpCode::ToU8Checked, OpCode::ToU8CheckedUnsigned),
            NumericKind::I16 => (OpCode::ToI16Checked, OpCode::ToI16CheckedUnsigned),
            NumericKind::U16 | NumericKind::Char => {
                (OpCode::ToU16Checked, OpCode::ToU16CheckedUnsigned)
            }
            NumericKind::I32 => (OpCode::ToI32Checked, OpCode::ToI32CheckedUnsigned),
            NumericKind::U32 => (OpCode::ToU32Checked, OpCode::ToU32CheckedUnsigned),
            NumericKind::I64 => (OpCode::ToI64Checked, OpCode::ToI64CheckedUnsigned),
            NumericKind::U64 | NumericKind::F32 | NumericKind::F64 => {
                (OpCode::ToU64Checked, OpCode::ToU64CheckedUnsigned)
            }
        };
        return NumericOps::one(if unsigned_source { unsigned } else { signed });
    }

    let op = match to {
        NumericKind::I64 | NumericKind::U64 if from.is_floating() => {
            if to == NumericKind::U64 {
                OpCode::ToU64
            } else {
                OpCode::ToI64
            }
        }
        NumericKind::I64 | NumericKind::U64 if from.is_unsigned() => OpCode::ToU64,
        NumericKind::I64 | NumericKind::U64 => OpCode::ToI64,
        NumericKind::I8 => OpCode::ToI8,
        NumericKind::U8 => OpCode::ToU8,
        NumericKind::I16 => OpCode::ToI16,
        NumericKind::U16 | NumericKind::Char => OpCode::ToU16,
        NumericKind::I32 => OpCode::ToI32,
        NumericKind::U32 | NumericKind::F32 | NumericKind::F64 => OpCode::ToU32,
    };
    NumericOps::one(op)
}

impl<S: CodeSink> CodeGen<S> {
    fn numeric_ops(&mut self, ops: NumericOps) {
        for op in ops.iter() {
            self.sink.op(op);
        }
    }

    /// Emit an implicit conversion of the value on top of the stack.
    pub(super) fn conversion(&mut self, conversion: Conversion) -> Result<()> {
        match conversion.kind {
            ConversionKind::Identity
            | ConversionKind::NullToReference
            | ConversionKind::ReferenceUpcast { .. } => Ok(()),
            ConversionKind::Numeric { from, to } => {
                self.numeric_ops(implicit_ops(from, to));
                Ok(())
            }
            ConversionKind::Boxing { value } => self.sink.hash_op(OpCode::Box, value),
            ConversionKind::UserDefined { method } => self.sink.call(OpCode::Call, method, 1),
        }
    }

    /// Emit an explicit cast of the value on top of the stack.
    pub(super) fn cast(&mut self, plan: CastPlan) -> Result<()> {
        match plan {
            CastPlan::Identity => Ok(()),
            CastPlan::Implicit(conversion) => self.conversion(conversion),
            CastPlan::Numeric { from, to, checked } => {
                self.numeric_ops(explicit_ops(from, to, checked));
                Ok(())
            }
            CastPlan::User { method } => self.sink.call(OpCode::Call, method, 1),
            CastPlan::CastClass { target } => self.sink.hash_op(OpCode::CastClass, target),
            CastPlan::Unbox { target } => self.sink.hash_op(OpCode::Unbox, target),
        }
    }
}
