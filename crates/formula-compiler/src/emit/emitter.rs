//! Real sink: writes bytecode into a chunk.

use formula_core::{CompilationError, TypeHash};

use super::branch::BranchPlan;
use super::{BranchKind, CodeSink, Label, Result, pool_index};
use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};

/// A branch operand waiting for its label.
#[derive(Debug, Clone, Copy)]
struct Patch {
    /// Offset of the operand bytes.
    operand: usize,
    /// Offset just past the instruction; jumps are relative to it.
    end: usize,
    target: Label,
    long: bool,
}

/// Output of the real pass.
#[derive(Debug, Clone)]
pub struct Emission {
    pub chunk: BytecodeChunk,
    pub constants: ConstantPool,
    /// Final offset of every label.
    pub labels: Vec<usize>,
    /// Temporary locals the expression needs.
    pub local_count: u16,
}

/// Writes bytecode, choosing each branch's encoding from a [`BranchPlan`].
#[derive(Debug)]
pub struct BytecodeEmitter<'p> {
    chunk: BytecodeChunk,
    constants: ConstantPool,
    plan: &'p BranchPlan,
    branch_index: usize,
    patches: Vec<Patch>,
    labels: Vec<Option<usize>>,
    line: u32,
}

impl<'p> BytecodeEmitter<'p> {
    pub fn new(plan: &'p BranchPlan) -> Self {
        Self {
            chunk: BytecodeChunk::with_capacity(plan.size()),
            constants: ConstantPool::new(),
            plan,
            branch_index: 0,
            patches: Vec::with_capacity(plan.len()),
            labels: Vec::new(),
            line: 0,
        }
    }

    /// Patch every branch and hand back the finished code.
    pub fn finish(mut self, local_count: u16) -> Result<Emission> {
        if self.branch_index != self.plan.len() {
            return Err(CompilationError::internal(format!(
                "emitted {} branches but {} were planned",
                self.branch_index,
                self.plan.len()
            )));
        }

        let labels = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                offset.ok_or_else(|| CompilationError::internal(format!("label {i} never marked")))
            })
            .collect::<Result<Vec<usize>>>()?;

        for patch in &self.patches {
            let target = labels.get(patch.target.index()).copied().ok_or_else(|| {
                CompilationError::internal(format!("unknown label {}", patch.target.index()))
            })?;
            let delta = target as i64 - patch.end as i64;
            if patch.long {
                let delta = i32::try_from(delta).map_err(|_| {
                    CompilationError::internal("branch offset exceeds 32 bits")
                })?;
                self.chunk.patch_i32(patch.operand, delta);
            } else {
                let delta = i8::try_from(delta).map_err(|_| {
                    CompilationError::internal(format!(
                        "short branch at {} cannot reach {target}",
                        patch.operand - 1
                    ))
                })?;
                self.chunk.patch_i8(patch.operand, delta);
            }
        }

        Ok(Emission {
            chunk: self.chunk,
            constants: self.constants,
            labels,
            local_count,
        })
    }

    fn index_operand(&mut self, constant: Constant) -> Result<u16> {
        pool_index(&mut self.constants, constant)
    }
}

impl CodeSink for BytecodeEmitter<'_> {
    fn offset(&self) -> usize {
        self.chunk.current_offset()
    }

    fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    fn op(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.line);
    }

    fn op_u8(&mut self, op: OpCode, operand: u8) {
        self.chunk.write_op(op, self.line);
        self.chunk.write_byte(operand, self.line);
    }

    fn constant(&mut self, constant: Constant) -> Result<()> {
        let index = self.index_operand(constant)?;
        match u8::try_from(index) {
            Ok(narrow) => self.op_u8(OpCode::Constant, narrow),
            Err(_) => {
                self.chunk.write_op(OpCode::ConstantWide, self.line);
                self.chunk.write_u16(index, self.line);
            }
        }
        Ok(())
    }

    fn hash_op(&mut self, op: OpCode, hash: TypeHash) -> Result<()> {
        let index = self.index_operand(Constant::TypeHash(hash))?;
        self.chunk.write_op(op, self.line);
        self.chunk.write_u16(index, self.line);
        Ok(())
    }

    fn call(&mut self, op: OpCode, hash: TypeHash, argc: u8) -> Result<()> {
        self.hash_op(op, hash)?;
        self.chunk.write_byte(argc, self.line);
        Ok(())
    }

    fn branch(&mut self, kind: BranchKind, target: Label) {
        let long = self.plan.is_long(self.branch_index);
        self.branch_index += 1;
        let line = self.line;
        if long {
            self.chunk.write_op(kind.long_op(), line);
            let operand = self.chunk.current_offset();
            self.chunk.write_i32(0, line);
            self.patches.push(Patch {
                operand,
                end: operand + 4,
                target,
                long,
            });
        } else {
            self.chunk.write_op(kind.short_op(), line);
            let operand = self.chunk.current_offset();
            self.chunk.write_byte(0, line);
            self.patches.push(Patch {
                operand,
                end: operand + 1,
                target,
                long,
            });
        }
    }

    fn mark(&mut self, label: Label) {
        if self.labels.len() <= label.index() {
            self.labels.resize(label.index() + 1, None);
        }
        self.labels[label.index()] = Some(self.chunk.current_offset());
    }
}
