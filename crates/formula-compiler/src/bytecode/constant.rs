//! Constant pool for a compiled expression.
//!
//! Numeric constants are stored by stack category: unsigned values keep
//! their bit pattern in the signed slot of the same width.

use formula_core::TypeHash;
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// 32-bit integer slot (also `bool`, `char`, narrow and `uint` values).
    Int32(i32),
    /// 64-bit integer slot (`int64`, `uint64`).
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// String literal; the host interns it when loading the expression.
    String(String),
    /// Member, type or runtime helper identity.
    TypeHash(TypeHash),
}

/// Deduplicating constant pool.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
}

/// Hashable form of [`Constant`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int32(i32),
    Int64(i64),
    Float32(u32), // bit pattern
    Float64(u64), // bit pattern
    String(String),
    TypeHash(TypeHash),
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `constant`, appending it on first use.
    pub fn add(&mut self, constant: Constant) -> u32 {
        let next = self.constants.len() as u32;
        match self.index.entry(ConstantKey::of(&constant)) {
            Entry::Occupied(slot) => *slot.get(),
            Entry::Vacant(slot) => {
                slot.insert(next);
                self.constants.push(constant);
                next
            }
        }
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

impl ConstantKey {
    fn of(constant: &Constant) -> Self {
        match constant {
            Constant::Int32(v) => ConstantKey::Int32(*v),
            Constant::Int64(v) => ConstantKey::Int64(*v),
            Constant::Float32(v) => ConstantKey::Float32(v.to_bits()),
            Constant::Float64(v) => ConstantKey::Float64(v.to_bits()),
            Constant::String(s) => ConstantKey::String(s.clone()),
            Constant::TypeHash(h) => ConstantKey::TypeHash(*h),
        }
    }
}
