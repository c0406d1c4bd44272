//! Instruction set.
//!
//! Each opcode is a single byte with its operands following inline
//! (big-endian). Values on the stack fall into five categories: 32-bit
//! integer, 64-bit integer, `float`, `double` and reference. Arithmetic
//! opcodes work on whichever category their operands are in; signedness
//! is chosen by opcode variant, not by the value.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool.
    /// Operand: u8 constant index
    Constant = 0,
    /// Push constant from pool.
    /// Operand: u16 constant index
    ConstantWide,
    PushNull,
    PushTrue,
    PushFalse,

    // =========================================================================
    // Stack and locals
    // =========================================================================
    Pop,
    Dup,
    /// Operand: u8 slot
    GetLocal,
    /// Pops into a temp slot.
    /// Operand: u8 slot
    SetLocal,
    /// Push the owner instance bare names resolve against.
    GetOwner,

    // =========================================================================
    // Arithmetic
    // =========================================================================
    Add,
    AddChecked,
    AddCheckedUnsigned,
    Sub,
    SubChecked,
    SubCheckedUnsigned,
    Mul,
    MulChecked,
    MulCheckedUnsigned,
    Div,
    DivUnsigned,
    Rem,
    RemUnsigned,
    Neg,

    // =========================================================================
    // Bitwise and logical
    // =========================================================================
    And,
    Or,
    Xor,
    BitNot,
    /// Boolean negation: pushes 1 when the operand is 0.
    Not,
    Shl,
    Shr,
    ShrUnsigned,

    // =========================================================================
    // Comparison (push bool)
    // =========================================================================
    Eq,
    Gt,
    /// Unsigned for integers; unordered-or-greater for floats.
    GtUnsigned,
    Lt,
    /// Unsigned for integers; unordered-or-less for floats.
    LtUnsigned,

    // =========================================================================
    // Numeric conversion
    // =========================================================================
    ToI8,
    ToI16,
    ToI32,
    ToI64,
    ToU8,
    ToU16,
    ToU32,
    ToU64,
    ToF32,
    ToF64,
    /// Reinterpret an integer as unsigned before a float conversion.
    ToFloatUnsigned,
    ToI8Checked,
    ToI16Checked,
    ToI32Checked,
    ToI64Checked,
    ToU8Checked,
    ToU16Checked,
    ToU32Checked,
    ToU64Checked,
    ToI8CheckedUnsigned,
    ToI16CheckedUnsigned,
    ToI32CheckedUnsigned,
    ToI64CheckedUnsigned,
    ToU8CheckedUnsigned,
    ToU16CheckedUnsigned,
    ToU32CheckedUnsigned,
    ToU64CheckedUnsigned,

    // =========================================================================
    // Calls and members
    // =========================================================================
    /// Call a static member or runtime helper.
    /// Operands: u16 constant index (TypeHash), u8 argument count
    Call,
    /// Call an instance member; the target is below the arguments.
    /// Operands: u16 constant index (TypeHash), u8 argument count
    CallMethod,
    /// Pop an instance and push one of its fields.
    /// Operand: u16 constant index (member hash)
    GetField,
    /// Push a static field.
    /// Operand: u16 constant index (member hash)
    GetStatic,

    // =========================================================================
    // Reference conversion
    // =========================================================================
    /// Box a value type.
    /// Operand: u16 constant index (TypeHash of the value type)
    Box,
    /// Unbox to a value type, failing on a type mismatch.
    /// Operand: u16 constant index (TypeHash)
    Unbox,
    /// Checked reference cast.
    /// Operand: u16 constant index (TypeHash)
    CastClass,

    // =========================================================================
    // Control flow
    // =========================================================================
    /// Operand: i8 offset from the end of the instruction
    Jump,
    /// Operand: i8 offset
    JumpIfFalse,
    /// Operand: i8 offset
    JumpIfTrue,
    /// Operand: i32 offset from the end of the instruction
    JumpLong,
    /// Operand: i32 offset
    JumpIfFalseLong,
    /// Operand: i32 offset
    JumpIfTrueLong,
    /// Return the top of the stack.
    Return,
}

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Size of the operands in bytes, not counting the opcode itself.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::Constant
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue => 1,

            OpCode::ConstantWide
            | OpCode::GetField
            | OpCode::GetStatic
            | OpCode::Box
            | OpCode::Unbox
            | OpCode::CastClass => 2,

            OpCode::Call | OpCode::CallMethod => 3,

            OpCode::JumpLong | OpCode::JumpIfFalseLong | OpCode::JumpIfTrueLong => 4,

            _ => 0,
        }
    }

    /// Whether this is a short or long branch.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            OpCode::Jump
                | OpCode::JumpIfFalse
                | OpCode::JumpIfTrue
                | OpCode::JumpLong
                | OpCode::JumpIfFalseLong
                | OpCode::JumpIfTrueLong
        )
    }

    /// Whether this instruction compares two values.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            OpCode::Eq | OpCode::Gt | OpCode::GtUnsigned | OpCode::Lt | OpCode::LtUnsigned
        )
    }

    /// Get the name of this opcode for disassembly.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantWide => "CONSTANT_WIDE",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::SetLocal => "SET_LOCAL",
            OpCode::GetOwner => "GET_OWNER",
            OpCode::Add => "ADD",
            OpCode::AddChecked => "ADD_OVF",
            OpCode::AddCheckedUnsigned => "ADD_OVF_UN",
            OpCode::Sub => "SUB",
            OpCode::SubChecked => "SUB_OVF",
            OpCode::SubCheckedUnsigned => "SUB_OVF_UN",
            OpCode::Mul => "MUL",
            OpCode::MulChecked => "MUL_OVF",
            OpCode::MulCheckedUnsigned => "MUL_OVF_UN",
            OpCode::Div => "DIV",
            OpCode::DivUnsigned => "DIV_UN",
            OpCode::Rem => "REM",
            OpCode::RemUnsigned => "REM_UN",
            OpCode::Neg => "NEG",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Xor => "XOR",
            OpCode::BitNot => "BIT_NOT",
            OpCode::Not => "NOT",
            OpCode::Shl => "SHL",
            OpCode::Shr => "SHR",
            OpCode::ShrUnsigned => "SHR_UN",
            OpCode::Eq => "EQ",
            OpCode::Gt => "GT",
            OpCode::GtUnsigned => "GT_UN",
            OpCode::Lt => "LT",
            OpCode::LtUnsigned => "LT_UN",
            OpCode::ToI8 => "TO_I8",
            OpCode::ToI16 => "TO_I16",
            OpCode::ToI32 => "TO_I32",
            OpCode::ToI64 => "TO_I64",
            OpCode::ToU8 => "TO_U8",
            OpCode::ToU16 => "TO_U16",
            OpCode::ToU32 => "TO_U32",
            OpCode::ToU64 => "TO_U64",
            OpCode::ToF32 => "TO_F32",
            OpCode::ToF64 => "TO_F64",
            OpCode::ToFloatUnsigned => "TO_FLOAT_UN",
            OpCode::ToI8Checked => "TO_I8_OVF",
            OpCode::ToI16Checked => "TO_I16_OVF",
            OpCode::ToI32Checked => "TO_I32_OVF",
            OpCode::ToI64Checked => "TO_I64_OVF",
            OpCode::ToU8Checked => "TO_U8_OVF",
            OpCode::ToU16Checked => "TO_U16_OVF",
            OpCode::ToU32Checked => "TO_U32_OVF",
            OpCode::ToU64Checked => "TO_U64_OVF",
            OpCode::ToI8CheckedUnsigned => "TO_I8_OVF_UN",
            OpCode::ToI16CheckedUnsigned => "TO_I16_OVF_UN",
            OpCode::ToI32CheckedUnsigned => "TO_I32_OVF_UN",
            OpCode::ToI64CheckedUnsigned => "TO_I64_OVF_UN",
            OpCode::ToU8CheckedUnsigned => "TO_U8_OVF_UN",
            OpCode::ToU16CheckedUnsigned => "TO_U16_OVF_UN",
            OpCode::ToU32CheckedUnsigned => "TO_U32_OVF_UN",
            OpCode::ToU64CheckedUnsigned => "TO_U64_OVF_UN",
            OpCode::Call => "CALL",
            OpCode::CallMethod => "CALL_METHOD",
            OpCode::GetField => "GET_FIELD",
            OpCode::GetStatic => "GET_STATIC",
            OpCode::Box => "BOX",
            OpCode::Unbox => "UNBOX",
            OpCode::CastClass => "CAST_CLASS",
            OpCode::Jump => "JUMP",
            OpCode::JumpIfFalse => "JUMP_IF_FALSE",
            OpCode::JumpIfTrue => "JUMP_IF_TRUE",
            OpCode::JumpLong => "JUMP_LONG",
            OpCode::JumpIfFalseLong => "JUMP_IF_FALSE_LONG",
            OpCode::JumpIfTrueLong => "JUMP_IF_TRUE_LONG",
            OpCode::Return => "RETURN",
        }
    }
}
