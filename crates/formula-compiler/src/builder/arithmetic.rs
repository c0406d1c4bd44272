//! Arithmetic operators: `+ - * / % **`.

use formula_core::{NumericKind, ResultType, Span, runtime};

use super::{Result, TreeBuilder, numeric_conversion};
use crate::conversion::{Conversion, ConversionKind};
use crate::elements::{ArithmeticOp, ArithmeticPlan, Element, ElementKind};
use crate::overload::{OperatorName, find_operator};
use crate::promotion;

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type an arithmetic operator.
    ///
    /// Tried in order: operator overload, numeric promotion, string
    /// concatenation for `+`. Power has its own numeric rule.
    pub fn arithmetic(
        &self,
        op: ArithmeticOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let (lt, rt) = (left.result_type, right.result_type);

        if let Some(candidate) = find_operator(arithmetic_operator(op), lt, rt, self.ctx, span)? {
            let call = self.call_target(&candidate);
            let kind = ElementKind::Arithmetic {
                op,
                left,
                right,
                plan: ArithmeticPlan::Operator(call),
            };
            return Ok(self.alloc(kind, candidate.return_type, span));
        }

        if op == ArithmeticOp::Pow {
            return self.power(left, right, span);
        }

        if let (Some(l), Some(r)) = (lt.as_numeric(), rt.as_numeric()) {
            let Some(kind) = promotion::result_of(l, r) else {
                return Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span));
            };
            let plan = ArithmeticPlan::Numeric {
                kind,
                checked: self.ctx.options().checked && kind.is_integral(),
                unsigned: l.is_unsigned() && r.is_unsigned(),
                left: numeric_conversion(l, kind),
                right: numeric_conversion(r, kind),
            };
            let kind_elem = ElementKind::Arithmetic {
                op,
                left,
                right,
                plan,
            };
            return Ok(self.alloc(kind_elem, ResultType::numeric(kind), span));
        }

        if op == ArithmeticOp::Add && (lt.is_string() || rt.is_string()) {
            return self.concat(left, right, span);
        }

        Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span))
    }

    fn power(
        &self,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let (lt, rt) = (left.result_type, right.result_type);
        let (Some(base), Some(exp)) = (lt.as_numeric(), rt.as_numeric()) else {
            return Err(self.ctx.binary_mismatch("**", lt, rt, span));
        };

        if let Some(exponent) = right.as_non_negative_int() {
            let plan = ArithmeticPlan::PowerUnrolled {
                exponent,
                kind: base,
                checked: self.ctx.options().checked && base.is_integral(),
            };
            let kind = ElementKind::Arithmetic {
                op: ArithmeticOp::Pow,
                left,
                right,
                plan,
            };
            return Ok(self.alloc(kind, lt, span));
        }

        let plan = ArithmeticPlan::PowerCall {
            left: numeric_conversion(base, NumericKind::F64),
            right: numeric_conversion(exp, NumericKind::F64),
        };
        let kind = ElementKind::Arithmetic {
            op: ArithmeticOp::Pow,
            left,
            right,
            plan,
        };
        Ok(self.alloc(kind, ResultType::DOUBLE, span))
    }

    fn concat(
        &self,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let (lt, rt) = (left.result_type, right.result_type);
        if lt.is_void() || rt.is_void() {
            return Err(self.ctx.binary_mismatch("+", lt, rt, span));
        }

        let helper = if lt.is_string() && rt.is_string() {
            runtime::STRING_CONCAT
        } else {
            runtime::STRING_CONCAT_OBJECT
        };
        let plan = ArithmeticPlan::Concat {
            helper,
            left: as_object(lt),
            right: as_object(rt),
        };
        let kind = ElementKind::Arithmetic {
            op: ArithmeticOp::Add,
            left,
            right,
            plan,
        };
        Ok(self.alloc(kind, ResultType::STRING, span))
    }
}

/// Conversion of a concatenation operand into a helper argument.
fn as_object(ty: ResultType) -> Conversion {
    if ty.is_string() {
        Conversion::identity()
    } else if ty.is_value_type() {
        Conversion::implicit(
            ConversionKind::Boxing {
                value: ty.type_hash,
            },
            Conversion::BOXING,
        )
    } else if ty.is_null() {
        Conversion::implicit(ConversionKind::NullToReference, Conversion::NULL_REFERENCE)
    } else {
        Conversion::implicit(
            ConversionKind::ReferenceUpcast {
                target: ResultType::OBJECT.type_hash,
            },
            Conversion::INHERITANCE_STEP,
        )
    }
}

fn arithmetic_operator(op: ArithmeticOp) -> OperatorName {
    match op {
        ArithmeticOp::Add => OperatorName::Add,
        ArithmeticOp::Sub => OperatorName::Sub,
        ArithmeticOp::Mul => OperatorName::Mul,
        ArithmeticOp::Div => OperatorName::Div,
        ArithmeticOp::Mod => OperatorName::Mod,
        ArithmeticOp::Pow => OperatorName::Pow,
    }
}
