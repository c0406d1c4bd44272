//! Trial sink: counts bytes instead of writing them.

use formula_core::{CompilationError, TypeHash};

use super::branch::{BranchRecord, Layout, SHORT_BRANCH_SIZE};
use super::{BranchKind, CodeSink, Label, Result, pool_index};
use crate::bytecode::{Constant, ConstantPool, OpCode};

/// A branch seen before its label is bound.
#[derive(Debug, Clone, Copy)]
struct PendingBranch {
    start: usize,
    kind: BranchKind,
    target: Label,
}

/// Measures code size with every branch short.
///
/// Constants go through a private pool so the narrow/wide choice for
/// `Constant` matches what the real pass will make.
#[derive(Debug, Default)]
pub struct LayoutSink {
    offset: usize,
    constants: ConstantPool,
    branches: Vec<PendingBranch>,
    labels: Vec<Option<usize>>,
}

impl LayoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve branch targets; every label used must have been marked.
    pub fn into_layout(self) -> Result<Layout> {
        let labels = self
            .labels
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                offset.ok_or_else(|| CompilationError::internal(format!("label {i} never marked")))
            })
            .collect::<Result<Vec<usize>>>()?;

        let branches = self
            .branches
            .iter()
            .map(|b| {
                let target_offset = labels.get(b.target.index()).copied().ok_or_else(|| {
                    CompilationError::internal(format!(
                        "branch at {} targets unknown label {}",
                        b.start,
                        b.target.index()
                    ))
                })?;
                Ok(BranchRecord {
                    start: b.start,
                    kind: b.kind,
                    target: b.target,
                    target_offset,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Layout {
            branches,
            labels,
            size: self.offset,
        })
    }

    fn touch_label(&mut self, label: Label) {
        if self.labels.len() <= label.index() {
            self.labels.resize(label.index() + 1, None);
        }
    }
}

impl CodeSink for LayoutSink {
    fn offset(&self) -> usize {
        self.offset
    }

    fn set_line(&mut self, _line: u32) {}

    fn op(&mut self, op: OpCode) {
        self.offset += 1 + op.operand_size();
    }

    fn op_u8(&mut self, op: OpCode, _operand: u8) {
        self.op(op);
    }

    fn constant(&mut self, constant: Constant) -> Result<()> {
        let index = pool_index(&mut self.constants, constant)?;
        self.op(if index < 256 {
            OpCode::Constant
        } else {
            OpCode::ConstantWide
        });
        Ok(())
    }

    fn hash_op(&mut self, op: OpCode, hash: TypeHash) -> Result<()> {
        pool_index(&mut self.constants, Constant::TypeHash(hash))?;
        self.op(op);
        Ok(())
    }

    fn call(&mut self, op: OpCode, hash: TypeHash, _argc: u8) -> Result<()> {
        self.hash_op(op, hash)
    }

    fn branch(&mut self, kind: BranchKind, target: Label) {
        self.touch_label(target);
        self.branches.push(PendingBranch {
            start: self.offset,
            kind,
            target,
        });
        self.offset += SHORT_BRANCH_SIZE;
    }

    fn mark(&mut self, label: Label) {
        self.touch_label(label);
        self.labels[label.index()] = Some(self.offset);
    }
}
