//! Type conversion system.
//!
//! Determines whether one type converts to another, at what cost, and what
//! the conversion does at runtime. Used for operand typing, overload
//! scoring and cast legality.
//!
//! ## Implicit conversion order
//!
//! 1. Identity
//! 2. Numeric widening (see [`crate::promotion`])
//! 3. `null` to a reference type
//! 4. Reference upcasts: base class, implemented interface, `object`,
//!    covariant arrays
//! 5. Boxing a value type into `object` or an implemented interface
//! 6. User-defined `opImplConv`

use formula_core::{NumericKind, ResultType, TypeHash};

use crate::context::CompilationContext;
use crate::promotion;

mod cast;
mod reference;
mod user_defined;

pub use cast::{CastPlan, find_cast};
pub use reference::find_reference_conversion;
pub use user_defined::{find_explicit_conversion, find_user_conversion};

/// A type conversion with its cost for overload resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub kind: ConversionKind,
    /// Lower is better; 0 is an exact match.
    pub cost: f32,
    pub is_implicit: bool,
}

/// What a conversion does at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    /// No conversion needed.
    Identity,
    /// Built-in numeric widening.
    Numeric { from: NumericKind, to: NumericKind },
    /// `null` literal to any reference type.
    NullToReference,
    /// Reference to a base class, interface, `object` or covariant array.
    ReferenceUpcast { target: TypeHash },
    /// Value type boxed into a reference.
    Boxing { value: TypeHash },
    /// Call to a user conversion operator.
    UserDefined { method: TypeHash },
}

impl Conversion {
    /// Exact match.
    pub const EXACT: f32 = 0.0;
    /// User-defined implicit conversion.
    pub const USER_IMPLICIT: f32 = 1.0;
    /// Per level of class inheritance between source and target.
    pub const INHERITANCE_STEP: f32 = 1.0;
    /// `null` to a reference type.
    pub const NULL_REFERENCE: f32 = 1.0;
    /// Class to an interface it implements.
    pub const INTERFACE_TARGET: f32 = 5.0;
    /// Boxing a value type.
    pub const BOXING: f32 = 8.0;

    pub const fn identity() -> Self {
        Self {
            kind: ConversionKind::Identity,
            cost: Self::EXACT,
            is_implicit: true,
        }
    }

    pub(crate) const fn implicit(kind: ConversionKind, cost: f32) -> Self {
        Self {
            kind,
            cost,
            is_implicit: true,
        }
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        matches!(self.kind, ConversionKind::Identity)
    }
}

/// Find the implicit conversion from `source` to `target`, if any.
pub fn find_conversion(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'_>,
) -> Option<Conversion> {
    if source == target {
        return Some(Conversion::identity());
    }

    if let (Some(from), Some(to)) = (source.as_numeric(), target.as_numeric()) {
        return promotion::numeric_convert_score(from, to).map(|score| {
            Conversion::implicit(ConversionKind::Numeric { from, to }, score as f32)
        });
    }

    if let Some(conv) = reference::find_reference_conversion(source, target, ctx) {
        return Some(conv);
    }

    user_defined::find_user_conversion(source, target, ctx).map(|member| {
        Conversion::implicit(
            ConversionKind::UserDefined {
                method: member.hash,
            },
            Conversion::USER_IMPLICIT,
        )
    })
}

/// Check if implicit conversion is possible.
pub fn can_implicitly_convert(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'_>,
) -> bool {
    find_conversion(source, target, ctx).is_some()
}
