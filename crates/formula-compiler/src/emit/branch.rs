//! Branch relaxation.
//!
//! The trial pass lays every branch out in its 2-byte short form. A short
//! branch reaches at most 127 bytes forward from the end of its
//! instruction; anything further, and every backward branch, needs the
//! 5-byte long form. Growing one branch pushes later code forward, which
//! can push an enclosing branch out of range, so branches are decided from
//! the last one back: by the time a branch is considered, every branch
//! between it and its target already has its final size.

use tracing::debug;

use super::{BranchKind, Label};

/// Size of a short branch: opcode and `i8` offset.
pub const SHORT_BRANCH_SIZE: usize = 2;
/// Size of a long branch: opcode and `i32` offset.
pub const LONG_BRANCH_SIZE: usize = 5;
/// Bytes a branch grows by when it becomes long.
pub const LONG_BRANCH_DELTA: usize = LONG_BRANCH_SIZE - SHORT_BRANCH_SIZE;

const SHORT_REACH: usize = i8::MAX as usize;

/// A branch as laid out by the trial pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchRecord {
    /// Offset of the branch opcode.
    pub start: usize,
    pub kind: BranchKind,
    pub target: Label,
    /// Offset of `target` in the trial layout.
    pub target_offset: usize,
}

/// Result of the trial pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    /// In emission order, so `start` is strictly increasing.
    pub branches: Vec<BranchRecord>,
    /// Trial offset of every label, by label index.
    pub labels: Vec<usize>,
    /// Code size with every branch short.
    pub size: usize,
}

/// Encoding decision for every branch, plus the final label offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchPlan {
    long: Vec<bool>,
    labels: Vec<usize>,
    size: usize,
}

impl BranchPlan {
    /// Whether the `index`th emitted branch uses the long form.
    #[inline]
    pub fn is_long(&self, index: usize) -> bool {
        self.long.get(index).copied().unwrap_or(false)
    }

    /// Number of branches planned.
    pub fn len(&self) -> usize {
        self.long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.long.is_empty()
    }

    pub fn long_count(&self) -> usize {
        self.long.iter().filter(|&&long| long).count()
    }

    /// Predicted final offset of every label.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Predicted final code size.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Decide which branches must be long.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn relax(layout: &Layout) -> BranchPlan {
    let branches = &layout.branches;
    let mut long = vec![false; branches.len()];

    for i in (0..branches.len()).rev() {
        let branch = branches[i];
        if branch.target_offset <= branch.start {
            long[i] = true;
            continue;
        }
        let grown = branches[i + 1..]
            .iter()
            .zip(&long[i + 1..])
            .filter(|&(other, &is_long)| is_long && other.start < branch.target_offset)
            .count();
        let distance = branch.target_offset - (branch.start + SHORT_BRANCH_SIZE)
            + LONG_BRANCH_DELTA * grown;
        long[i] = distance > SHORT_REACH;
    }

    let shift = |offset: usize| {
        let before = branches
            .iter()
            .zip(&long)
            .filter(|&(b, &is_long)| is_long && b.start < offset)
            .count();
        offset + LONG_BRANCH_DELTA * before
    };
    let labels = layout.labels.iter().map(|&offset| shift(offset)).collect();
    let size = shift(layout.size);

    let plan = BranchPlan { long, labels, size };
    debug!(
        branches = plan.len(),
        long = plan.long_count(),
        trial_size = layout.size,
        size = plan.size,
        "relaxed branches"
    );
    plan
}
