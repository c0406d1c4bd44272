//! Explicit cast legality.
//!
//! Rules are tried in order; the first that applies decides the plan:
//!
//! 1. Identity
//! 2. Any implicit conversion
//! 3. Numeric to numeric
//! 4. Enum to or from its underlying type (and hence any numeric or enum)
//! 5. User `opConv` / `opImplConv`
//! 6. Reference downcasts: from `object`, covariant arrays, class
//!    hierarchy, unsealed class and interface, interface to interface
//! 7. Unboxing a reference into a value type

use formula_core::{CompilationError, NumericKind, ResultType, Span, TypeHash};

use super::{Conversion, find_conversion, find_explicit_conversion};
use crate::context::CompilationContext;

/// How an explicit cast is carried out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CastPlan {
    /// Source and target are the same type.
    Identity,
    /// The cast is an implicit conversion spelled out.
    Implicit(Conversion),
    /// Numeric (or enum representation) conversion.
    Numeric {
        from: NumericKind,
        to: NumericKind,
        checked: bool,
    },
    /// Call a user conversion operator.
    User { method: TypeHash },
    /// Checked reference cast.
    CastClass { target: TypeHash },
    /// Unbox a reference into a value type.
    Unbox { target: TypeHash },
}

/// Decide how to cast `source` to `target`.
pub fn find_cast(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'_>,
    span: Span,
) -> Result<CastPlan, CompilationError> {
    if source == target {
        return Ok(CastPlan::Identity);
    }

    if let Some(conv) = find_conversion(source, target, ctx) {
        return Ok(CastPlan::Implicit(conv));
    }

    if let (Some(from), Some(to)) = (numeric_view(source, ctx), numeric_view(target, ctx)) {
        if from == to {
            // enum and its own underlying type share a representation
            return Ok(CastPlan::Identity);
        }
        return Ok(CastPlan::Numeric {
            from,
            to,
            checked: ctx.options().checked,
        });
    }

    if let Some(member) = find_explicit_conversion(source, target, ctx, span)? {
        return Ok(CastPlan::User {
            method: member.hash,
        });
    }

    if source.is_reference_type() && target.is_reference_type() && is_downcast(source, target, ctx)
    {
        return Ok(CastPlan::CastClass {
            target: target.type_hash,
        });
    }

    if target.is_value_type() && can_unbox(source, target, ctx) {
        return Ok(CastPlan::Unbox {
            target: target.type_hash,
        });
    }

    Err(CompilationError::InvalidExplicitCast {
        from: ctx.type_name(source),
        to: ctx.type_name(target),
        span,
    })
}

/// Numeric representation of a numeric type or an enum.
fn numeric_view(ty: ResultType, ctx: &CompilationContext<'_>) -> Option<NumericKind> {
    if ty.is_enum() {
        return ctx.get_type(ty.type_hash).and_then(|entry| entry.underlying);
    }
    ty.as_numeric()
}

fn is_sealed(ty: ResultType, ctx: &CompilationContext<'_>) -> bool {
    ctx.get_type(ty.type_hash)
        .map(|entry| entry.is_sealed())
        .unwrap_or(false)
}

fn is_downcast(source: ResultType, target: ResultType, ctx: &CompilationContext<'_>) -> bool {
    if source.is_null() || target.is_null() {
        return false;
    }
    if source.is_object() {
        return true;
    }
    if source.is_array() && target.is_array() {
        return is_array_cast(source, target, ctx);
    }

    let class_like = |ty: ResultType| ty.is_class() || ty.is_string() || ty.is_array();
    match (class_like(source), class_like(target)) {
        (true, true) => ctx
            .inheritance_distance(target.type_hash, source.type_hash)
            .is_some(),
        (true, false) if target.is_interface() => {
            !is_sealed(source, ctx) && !ctx.implements(source.type_hash, target.type_hash)
        }
        (false, true) if source.is_interface() => {
            !is_sealed(target, ctx) || ctx.implements(target.type_hash, source.type_hash)
        }
        (false, false) => source.is_interface() && target.is_interface(),
        _ => false,
    }
}

fn is_array_cast(source: ResultType, target: ResultType, ctx: &CompilationContext<'_>) -> bool {
    let (Some(src), Some(dst)) = (ctx.get_type(source.type_hash), ctx.get_type(target.type_hash))
    else {
        return false;
    };
    let (Some(src_elem), Some(dst_elem)) = (src.element, dst.element) else {
        return false;
    };
    src.rank == dst.rank
        && src_elem.is_reference_type()
        && dst_elem.is_reference_type()
        && (src_elem == dst_elem || is_downcast(src_elem, dst_elem, ctx))
}

fn can_unbox(source: ResultType, target: ResultType, ctx: &CompilationContext<'_>) -> bool {
    source.is_object()
        || (source.is_interface() && ctx.implements(target.type_hash, source.type_hash))
}
