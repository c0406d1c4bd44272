//! Implicit conversions into reference types.

use formula_core::ResultType;

use super::{Conversion, ConversionKind};
use crate::context::CompilationContext;

/// Find an implicit conversion whose target is a reference type.
///
/// Covers `null`, upcasts along the class hierarchy, interface targets,
/// covariant arrays and boxing of value types.
pub fn find_reference_conversion(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'_>,
) -> Option<Conversion> {
    if !target.is_reference_type() || target.is_null() {
        return None;
    }

    if source.is_null() {
        return Some(Conversion::implicit(
            ConversionKind::NullToReference,
            Conversion::NULL_REFERENCE,
        ));
    }

    if source.is_value_type() {
        return find_boxing(source, target, ctx);
    }

    if !source.is_reference_type() {
        return None;
    }

    let upcast = ConversionKind::ReferenceUpcast {
        target: target.type_hash,
    };

    if let Some(depth) = ctx.inheritance_distance(source.type_hash, target.type_hash) {
        return Some(Conversion::implicit(
            upcast,
            depth as f32 * Conversion::INHERITANCE_STEP,
        ));
    }

    if target.is_object() {
        // interfaces and arrays reach object without a registered base chain
        return Some(Conversion::implicit(upcast, Conversion::INHERITANCE_STEP));
    }

    if target.is_interface() && ctx.implements(source.type_hash, target.type_hash) {
        return Some(Conversion::implicit(upcast, Conversion::INTERFACE_TARGET));
    }

    if source.is_array() && target.is_array() && is_covariant(source, target, ctx) {
        return Some(Conversion::implicit(upcast, Conversion::INHERITANCE_STEP));
    }

    None
}

fn find_boxing(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'_>,
) -> Option<Conversion> {
    let boxes = target.is_object()
        || (target.is_interface() && ctx.implements(source.type_hash, target.type_hash));
    boxes.then(|| {
        Conversion::implicit(
            ConversionKind::Boxing {
                value: source.type_hash,
            },
            Conversion::BOXING,
        )
    })
}

/// `S[] -> T[]` when ranks match and `S -> T` is a reference upcast.
fn is_covariant(source: ResultType, target: ResultType, ctx: &CompilationContext<'_>) -> bool {
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
        && matches!(
            find_reference_conversion(src_elem, dst_elem, ctx),
            Some(Conversion {
                kind: ConversionKind::ReferenceUpcast { .. },
                ..
            })
        )
}
