//! `if(condition, when_true, when_false)`.

use formula_core::{CompilationError, Span};

use super::{Result, TreeBuilder};
use crate::conversion::{Conversion, find_conversion};
use crate::elements::{Element, ElementKind};

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type a conditional.
    ///
    /// The result is the true branch's type when the false branch converts
    /// into it, otherwise the false branch's type when the true branch
    /// converts into that.
    pub fn conditional(
        &self,
        condition: &'a Element<'a>,
        when_true: &'a Element<'a>,
        when_false: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        if !condition.result_type.is_bool() {
            return Err(CompilationError::mismatch(
                format!(
                    "condition must be 'bool', found '{}'",
                    self.ctx.type_name(condition.result_type)
                ),
                condition.span,
            ));
        }

        let (tt, ft) = (when_true.result_type, when_false.result_type);
        let (result_type, true_conversion, false_conversion) =
            if let Some(conv) = find_conversion(ft, tt, self.ctx) {
                (tt, Conversion::identity(), conv)
            } else if let Some(conv) = find_conversion(tt, ft, self.ctx) {
                (ft, conv, Conversion::identity())
            } else {
                return Err(CompilationError::mismatch(
                    format!(
                        "branch types '{}' and '{}' are neither convertible",
                        self.ctx.type_name(tt),
                        self.ctx.type_name(ft)
                    ),
                    span,
                ));
            };

        let kind = ElementKind::Conditional {
            condition,
            when_true,
            when_false,
            true_conversion,
            false_conversion,
        };
        Ok(self.alloc(kind, result_type, span))
    }
}
