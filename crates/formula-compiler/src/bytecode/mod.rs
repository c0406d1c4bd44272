//! Bytecode types.
//!
//! - [`OpCode`] - The instruction set
//! - [`BytecodeChunk`] - The instruction stream of one expression
//! - [`Constant`] and [`ConstantPool`] - Literal and identity storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::BytecodeChunk;
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
