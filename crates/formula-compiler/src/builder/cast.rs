//! Explicit casts.

use formula_core::{ResultType, Span};

use super::{Result, TreeBuilder};
use crate::conversion::find_cast;
use crate::elements::{Element, ElementKind};

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type an explicit cast of `operand` to `target`.
    pub fn cast(
        &self,
        operand: &'a Element<'a>,
        target: ResultType,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let plan = find_cast(operand.result_type, target, self.ctx, span)?;
        Ok(self.alloc(ElementKind::Cast { operand, plan }, target, span))
    }
}
