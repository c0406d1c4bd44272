//! Logical (`and or xor`) and unary (`- + ! ~`) operators.

use formula_core::{CompilationError, NumericKind, ResultType, Span};

use super::{Result, TreeBuilder, numeric_conversion};
use crate::elements::{Element, ElementKind, LogicalOp, LogicalPlan, UnaryOp, UnaryPlan};
use crate::overload::{OperatorName, find_operator, find_unary_operator};
use crate::promotion;

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type `and`, `or` or `xor`.
    ///
    /// Boolean operands short-circuit (`xor` excepted); integral operands
    /// combine bitwise in their promoted type.
    pub fn logical(
        &self,
        op: LogicalOp,
        left: &'a Element<'a>,
        right: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let (lt, rt) = (left.result_type, right.result_type);
        let name = match op {
            LogicalOp::And => OperatorName::And,
            LogicalOp::Or => OperatorName::Or,
            LogicalOp::Xor => OperatorName::Xor,
        };

        let (plan, result_type) =
            if let Some(candidate) = find_operator(name, lt, rt, self.ctx, span)? {
                (
                    LogicalPlan::Operator(self.call_target(&candidate)),
                    candidate.return_type,
                )
            } else if lt.is_bool() && rt.is_bool() {
                let plan = match op {
                    LogicalOp::Xor => LogicalPlan::BoolXor,
                    _ => LogicalPlan::ShortCircuit,
                };
                (plan, ResultType::BOOL)
            } else {
                let integral = |ty: ResultType| ty.as_numeric().filter(|k| k.is_integral());
                let kind = match (integral(lt), integral(rt)) {
                    (Some(l), Some(r)) => promotion::result_of(l, r).map(|k| (l, r, k)),
                    _ => None,
                };
                let Some((l, r, kind)) = kind else {
                    return Err(self.ctx.binary_mismatch(op.symbol(), lt, rt, span));
                };
                let plan = LogicalPlan::Bitwise {
                    kind,
                    left: numeric_conversion(l, kind),
                    right: numeric_conversion(r, kind),
                };
                (plan, ResultType::numeric(kind))
            };

        let kind = ElementKind::Logical {
            op,
            left,
            right,
            plan,
        };
        Ok(self.alloc(kind, result_type, span))
    }

    /// Type a unary operator.
    pub fn unary(
        &self,
        op: UnaryOp,
        operand: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let ty = operand.result_type;
        let name = match op {
            UnaryOp::Neg => OperatorName::Neg,
            UnaryOp::Plus => OperatorName::Plus,
            UnaryOp::Not => OperatorName::Not,
            UnaryOp::Complement => OperatorName::Com,
        };

        if let Some(candidate) = find_unary_operator(name, ty, self.ctx, span)? {
            let kind = ElementKind::Unary {
                op,
                operand,
                plan: UnaryPlan::Operator(self.call_target(&candidate)),
            };
            return Ok(self.alloc(kind, candidate.return_type, span));
        }

        let mismatch = || {
            CompilationError::mismatch(
                format!(
                    "operator '{}' cannot be applied to '{}'",
                    op.symbol(),
                    self.ctx.type_name(ty)
                ),
                span,
            )
        };

        let (plan, result_type) = match (op, ty.as_numeric()) {
            (UnaryOp::Not, _) if ty.is_bool() => (UnaryPlan::Not, ResultType::BOOL),
            (UnaryOp::Neg, Some(from)) => {
                // u32 negates as int64; u64 has no signed partner
                let kind = promotion::result_of(from, NumericKind::I32)
                    .ok_or_else(mismatch)?;
                let plan = UnaryPlan::Negate {
                    kind,
                    checked: self.ctx.options().checked && kind.is_integral(),
                    conversion: numeric_conversion(from, kind),
                };
                (plan, ResultType::numeric(kind))
            }
            (UnaryOp::Plus, Some(from)) => {
                let kind = promotion::promote_unary(from);
                let plan = UnaryPlan::Plus {
                    conversion: numeric_conversion(from, kind),
                };
                (plan, ResultType::numeric(kind))
            }
            (UnaryOp::Complement, Some(from)) if from.is_integral() => {
                let kind = promotion::promote_unary(from);
                let plan = UnaryPlan::Complement {
                    kind,
                    conversion: numeric_conversion(from, kind),
                };
                (plan, ResultType::numeric(kind))
            }
            _ => return Err(mismatch()),
        };

        Ok(self.alloc(ElementKind::Unary { op, operand, plan }, result_type, span))
    }
}
