//! Set membership: `x in (a, b, c)` and `x in collection`.

use formula_core::{CollectionInterface, CompilationError, ResultType, Span, TypeHash};

use super::{Result, TreeBuilder};
use crate::conversion::find_conversion;
use crate::elements::{CompareOp, Element, ElementKind, ListItem};

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type `probe in (items...)`. Each item must be equality-comparable
    /// with the probe.
    pub fn in_list(
        &self,
        probe: &'a Element<'a>,
        items: &[&'a Element<'a>],
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let mut list = Vec::with_capacity(items.len());
        for &item in items {
            let plan = self
                .compare_plan(CompareOp::Eq, probe.result_type, item.result_type, item.span)
                .map_err(|err| match err {
                    CompilationError::TypeMismatch { .. } => CompilationError::mismatch(
                        format!(
                            "'in' item of type '{}' cannot be compared with '{}'",
                            self.ctx.type_name(item.result_type),
                            self.ctx.type_name(probe.result_type)
                        ),
                        item.span,
                    ),
                    other => other,
                })?;
            list.push(ListItem {
                element: item,
                plan,
            });
        }

        let items = self.arena.alloc_slice_copy(&list);
        Ok(self.alloc(ElementKind::InList { probe, items }, ResultType::BOOL, span))
    }

    /// Type `probe in collection` against the collection's best interface.
    pub fn in_collection(
        &self,
        probe: &'a Element<'a>,
        collection: &'a Element<'a>,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let Some(interface) = self.collection_interface(collection.result_type.type_hash) else {
            return Err(CompilationError::mismatch(
                format!(
                    "'{}' is not a collection",
                    self.ctx.type_name(collection.result_type)
                ),
                collection.span,
            ));
        };

        let conversion = find_conversion(probe.result_type, interface.element, self.ctx)
            .ok_or_else(|| {
                CompilationError::mismatch(
                    format!(
                        "cannot search for '{}' in a collection of '{}'",
                        self.ctx.type_name(probe.result_type),
                        self.ctx.type_name(interface.element)
                    ),
                    probe.span,
                )
            })?;

        let kind = ElementKind::InCollection {
            probe,
            collection,
            conversion,
            contains: interface.contains,
        };
        Ok(self.alloc(kind, ResultType::BOOL, span))
    }

    /// Preferred collection interface of `ty` or its base classes.
    fn collection_interface(&self, ty: TypeHash) -> Option<CollectionInterface> {
        let mut best: Option<CollectionInterface> = None;
        let mut current = self.ctx.get_type(ty);
        while let Some(entry) = current {
            for &candidate in &entry.collections {
                if best.is_none_or(|b| candidate.kind < b.kind) {
                    best = Some(candidate);
                }
            }
            current = entry.base.and_then(|base| self.ctx.get_type(base));
        }
        best
    }
}
