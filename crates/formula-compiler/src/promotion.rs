//! Numeric promotion table.
//!
//! Answers three questions about pairs of built-in numeric types:
//!
//! - [`result_of`]: the type a binary arithmetic or comparison is performed in
//! - [`is_implicitly_convertible`]: whether a value widens without a cast
//! - [`numeric_convert_score`]: how far along the widening ladder it moves
//!
//! The table is built once on first use and is read-only afterwards.
//! Enums never reach it; callers dispatch on `TypeKind::Enum` first.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use formula_core::NumericKind;

#[derive(Debug, Clone, Copy)]
struct PairRule {
    /// Type of `a op b`.
    binary: Option<NumericKind>,
    /// Ladder distance when `a` widens to `b`.
    widen_score: Option<u32>,
}

lazy_static! {
    static ref PROMOTION_TABLE: FxHashMap<(NumericKind, NumericKind), PairRule> = build_table();
}

fn build_table() -> FxHashMap<(NumericKind, NumericKind), PairRule> {
    let mut table = FxHashMap::default();
    for a in NumericKind::ALL {
        for b in NumericKind::ALL {
            let widen_score = widens(a, b).then(|| ladder_rank(b) - ladder_rank(a));
            table.insert(
                (a, b),
                PairRule {
                    binary: binary_result(a, b),
                    widen_score,
                },
            );
        }
    }
    table
}

/// Position on `i8 < u8 < i16 < char < u16 < i32 < u32 < i64 < u64 < f32 < f64`.
fn ladder_rank(kind: NumericKind) -> u32 {
    kind as u32
}

fn binary_result(a: NumericKind, b: NumericKind) -> Option<NumericKind> {
    use NumericKind::*;

    let either = |k: NumericKind| a == k || b == k;
    let other = |k: NumericKind| if a == k { b } else { a };

    if either(F64) {
        Some(F64)
    } else if either(F32) {
        Some(F32)
    } else if either(U64) {
        // no integral type holds both u64 and a signed value
        if other(U64).is_signed_integral() {
            None
        } else {
            Some(U64)
        }
    } else if either(I64) {
        Some(I64)
    } else if either(U32) {
        if other(U32).is_signed_integral() {
            Some(I64)
        } else {
            Some(U32)
        }
    } else {
        Some(I32)
    }
}

fn widens(src: NumericKind, dst: NumericKind) -> bool {
    use NumericKind::*;

    if src == dst {
        return true;
    }
    match (src.is_floating(), dst.is_floating()) {
        (_, true) => !(src == F64 && dst == F32),
        (true, false) => false,
        (false, false) => match (src, dst) {
            (Char, _) => matches!(dst, U16 | I32 | U32 | I64 | U64),
            (_, Char) => false,
            _ if src.is_unsigned() => dst.bits() > src.bits(),
            _ => dst.is_signed_integral() && dst.bits() > src.bits(),
        },
    }
}

fn rule(a: NumericKind, b: NumericKind) -> PairRule {
    PROMOTION_TABLE
        .get(&(a, b))
        .copied()
        .unwrap_or(PairRule {
            binary: None,
            widen_score: None,
        })
}

/// The type a binary operation on `a` and `b` is performed in.
///
/// `None` when no numeric type holds both, e.g. `uint64` with a signed type.
pub fn result_of(a: NumericKind, b: NumericKind) -> Option<NumericKind> {
    rule(a, b).binary
}

/// Whether `src` converts to `dst` without a cast.
pub fn is_implicitly_convertible(src: NumericKind, dst: NumericKind) -> bool {
    rule(src, dst).widen_score.is_some()
}

/// Ladder distance of an implicit conversion; 0 for identity.
pub fn numeric_convert_score(src: NumericKind, dst: NumericKind) -> Option<u32> {
    rule(src, dst).widen_score
}

/// Type of a shift or unary operation on `kind`: narrow integrals become `int`.
pub fn promote_unary(kind: NumericKind) -> NumericKind {
    match kind {
        NumericKind::U32 | NumericKind::I64 | NumericKind::U64 | NumericKind::F32 => kind,
        NumericKind::F64 => kind,
        _ => NumericKind::I32,
    }
}
