//! Comparison operators and shifts.

use formula_core::{CompilationError, ResultType, Span};

use super::{Result, TreeBuilder, numeric_conversion};
use crate::conversion::find_conversion;
use crate::elements::{CompareOp, ComparePlan, Element, ElementKind, ShiftOp, ShiftPlan};
use crate::overload::{OperatorName, find_operator};
use crate::promotion;

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type a comparison. The result is always `bool`.
    pub fn compare(
        &self,
        op: CompareOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let plan = self.compare_plan(op, left.result_type, right.result_type, span)?;
        let kind = ElementKind::Compare {
            op,
            left,
            right,
            plan,
        };
        Ok(self.alloc(kind, ResultType::BOOL, span))
    }

    /// Choose how to compare two operand types.
    ///
    /// Tried in order: operator overload, numeric pair, string equality,
    /// boolean equality, reference identity, same-enum comparison.
    pub(crate) fn compare_plan(
        &self,
        op: CompareOp,
        lt: ResultType,
        rt: ResultType,
        span: Span,
    ) -> Result<ComparePlan<'a>> {
        if let Some(candidate) = find_operator(compare_operator(op), lt, rt, self.ctx, span)? {
            return Ok(ComparePlan::Operator {
                call: self.call_target(&candidate),
                negate: false,
            });
        }
        if op == CompareOp::Ne {
            // `a != b` falls back to `!(a == b)`
            if let Some(candidate) = find_operator(OperatorName::Equals, lt, rt, self.ctx, span)? {
                return Ok(ComparePlan::Operator {
                    call: self.call_target(&candidate),
                    negate: true,
                });
            }
        }

        if let (Some(l), Some(r)) = (lt.as_numeric(), rt.as_numeric()) {
            let Some(kind) = promotion::result_of(l, r) else {
                return Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span));
            };
            return Ok(ComparePlan::Numeric {
                kind,
                left: numeric_conversion(l, kind),
                right: numeric_conversion(r, kind),
            });
        }

        if lt.is_enum() && lt == rt {
            let underlying = self
                .ctx
                .get_type(lt.type_hash)
                .and_then(|entry| entry.underlying)
                .ok_or_else(|| {
                    CompilationError::internal(format!(
                        "enum '{}' has no underlying type",
                        self.ctx.type_name(lt)
                    ))
                })?;
            return Ok(ComparePlan::Enum(underlying));
        }

        if op.is_relational() {
            return Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span));
        }

        if lt.is_string() && rt.is_string() {
            return Ok(ComparePlan::String(self.ctx.options().string_comparison));
        }

        if lt.is_bool() && rt.is_bool() {
            return Ok(ComparePlan::Boolean);
        }

        if lt.is_reference_type()
            && rt.is_reference_type()
            && (find_conversion(lt, rt, self.ctx).is_some()
                || find_conversion(rt, lt, self.ctx).is_some())
        {
            return Ok(ComparePlan::Reference);
        }

        Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span))
    }

    /// Type a shift. The count converts to `int`; the value must be integral.
    pub fn shift(
        &self,
        op: ShiftOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let (lt, rt) = (left.result_type, right.result_type);
        let name = match op {
            ShiftOp::Shl => OperatorName::Shl,
            ShiftOp::Shr => OperatorName::Shr,
        };

        if let Some(candidate) = find_operator(name, lt, rt, self.ctx, span)? {
            let kind = ElementKind::Shift {
                op,
                left,
                right,
                plan: ShiftPlan::Operator(self.call_target(&candidate)),
            };
            return Ok(self.alloc(kind, candidate.return_type, span));
        }

        let value = lt.as_numeric().filter(|k| k.is_integral());
        let count = find_conversion(rt, ResultType::INT32, self.ctx);
        let (Some(value), Some(count)) = (value, count) else {
            return Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span));
        };

        let kind = promotion::promote_unary(value);
        let plan = ShiftPlan::Numeric {
            kind,
            left: numeric_conversion(value, kind),
            right: count,
        };
        let element = ElementKind::Shift {
            op,
            left,
            right,
            plan,
        };
        Ok(self.alloc(element, ResultType::numeric(kind), span))
    }
}

fn compare_operator(op: CompareOp) -> OperatorName {
    match op {
        CompareOp::Eq => OperatorName::Equals,
        CompareOp::Ne => OperatorName::NotEquals,
        CompareOp::Lt => OperatorName::Less,
        CompareOp::Gt => OperatorName::Greater,
        CompareOp::Le => OperatorName::LessEqual,
        CompareOp::Ge => OperatorName::GreaterEqual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompilationContext;
    use crate::elements::Literal;
    use crate::options::{CompilerOptions, StringComparison};
    use bumpalo::Bump;
    use formula_core::{Member, NumericKind, TypeFlags};
    use formula_registry::TypeRegistry;

    #[test]
    fn numeric_compare_is_bool_over_promoted_kind() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let s = Span::default();
        let one = b.integer(1, s);
        let big = b.literal(Literal::UInt(2), s);
        let cmp = b.compare(CompareOp::Lt, one, big, s).unwrap();
        assert_eq!(cmp.result_type, ResultType::BOOL);
        assert!(matches!(
            cmp.kind,
            ElementKind::Compare {
                plan: ComparePlan::Numeric {
                    kind: NumericKind::I64,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn strings_compare_for_equality_only() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::with_options(
            &registry,
            CompilerOptions::new().with_string_comparison(StringComparison::OrdinalIgnoreCase),
        );
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let s = Span::default();
        let a = b.literal(Literal::String("a"), s);
        let eq = b.compare(CompareOp::Eq, a, a, s).unwrap();
        assert!(matches!(
            eq.kind,
            ElementKind::Compare {
                plan: ComparePlan::String(StringComparison::OrdinalIgnoreCase),
                ..
            }
        ));
        assert!(b.compare(CompareOp::Lt, a, a, s).is_err());
    }

    #[test]
    fn bool_and_reference_equality() {
        let mut registry = TypeRegistry::with_primitives();
        let animal = registry
            .register_class("Animal", None, &[], TypeFlags::empty())
            .unwrap();
        let rock = registry
            .register_class("Rock", None, &[], TypeFlags::SEALED)
            .unwrap();
        registry
            .register_member(Member::field(animal.type_hash, "self", animal))
            .unwrap();
        registry
            .register_member(Member::field(animal.type_hash, "rock", rock))
            .unwrap();
        let ctx = CompilationContext::with_options(
            &registry,
            CompilerOptions::new().with_owner(animal.type_hash),
        );
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let s = Span::default();

        let yes = b.literal(Literal::Bool(true), s);
        assert!(b.compare(CompareOp::Ne, yes, yes, s).is_ok());
        assert!(b.compare(CompareOp::Gt, yes, yes, s).is_err());

        let me = b.member("self", None, &[], false, s).unwrap();
        let null = b.literal(Literal::Null, s);
        let stone = b.member("rock", None, &[], false, s).unwrap();
        let with_null = b.compare(CompareOp::Eq, me, null, s).unwrap();
        assert!(matches!(
            with_null.kind,
            ElementKind::Compare {
                plan: ComparePlan::Reference,
                ..
            }
        ));
        assert!(b.compare(CompareOp::Eq, me, stone, s).is_err());
    }

    #[test]
    fn enums_compare_through_underlying() {
        let mut registry = TypeRegistry::with_primitives();
        let status = registry.register_enum("Status", NumericKind::U8).unwrap();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let plan = TreeBuilder::new(&arena, &ctx)
            .compare_plan(CompareOp::Ge, status, status, Span::default())
            .unwrap();
        assert_eq!(plan, ComparePlan::Enum(NumericKind::U8));
    }

    #[test]
    fn not_equals_falls_back_to_equals_overload() {
        let mut registry = TypeRegistry::with_primitives();
        let money = registry.register_struct("Money").unwrap();
        registry
            .register_member(Member::operator(
                money.type_hash,
                "opEquals",
                vec![money, money],
                ResultType::BOOL,
            ))
            .unwrap();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let plan = TreeBuilder::new(&arena, &ctx)
            .compare_plan(CompareOp::Ne, money, money, Span::default())
            .unwrap();
        assert!(matches!(plan, ComparePlan::Operator { negate: true, .. }));
    }

    #[test]
    fn shift_result_follows_left_operand() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let arena = Bump::new();
        let b = TreeBuilder::new(&arena, &ctx);
        let s = Span::default();
        let byte = b.literal(Literal::Int(1), s);
        let long = b.literal(Literal::Long(1), s);
        let count = b.integer(3, s);
        let wide_count = b.literal(Literal::Long(3), s);
        assert_eq!(
            b.shift(ShiftOp::Shl, byte, count, s).unwrap().result_type,
            ResultType::INT32
        );
        assert_eq!(
            b.shift(ShiftOp::Shr, long, count, s).unwrap().result_type,
            ResultType::INT64
        );
        // count must fit in an int
        assert!(b.shift(ShiftOp::Shl, byte, wide_count, s).is_err());
        let real = b.real(1.0, s);
        assert!(b.shift(ShiftOp::Shl, real, count, s).is_err());
    }
}
