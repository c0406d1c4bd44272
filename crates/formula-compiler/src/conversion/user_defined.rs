//! User-defined conversion operators (`opImplConv`, `opConv`).
//!
//! A conversion operator is a static member taking the source value and
//! returning the target. It may be declared on either type.

use formula_core::{CompilationError, Member, MemberKind, ResultType, Span};

use crate::context::CompilationContext;

const IMPLICIT_NAME: &str = "opImplConv";
const EXPLICIT_NAME: &str = "opConv";

fn conversions_named<'r>(
    name: &str,
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'r>,
) -> Vec<&'r Member> {
    let mut found: Vec<&'r Member> = Vec::new();
    let owners = if source.type_hash == target.type_hash {
        vec![source.type_hash]
    } else {
        vec![source.type_hash, target.type_hash]
    };
    for owner in owners {
        for member in ctx.members_of(owner, name) {
            let matches = matches!(member.kind, MemberKind::Conversion { .. })
                && member.params.as_slice() == [source]
                && member.return_type == target;
            if matches && !found.iter().any(|m| m.hash == member.hash) {
                found.push(member);
            }
        }
    }
    found
}

/// Find an `opImplConv` from `source` to `target` declared on either type.
pub fn find_user_conversion<'r>(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'r>,
) -> Option<&'r Member> {
    conversions_named(IMPLICIT_NAME, source, target, ctx)
        .into_iter()
        .next()
}

/// Find an explicit (`opConv`) or implicit (`opImplConv`) conversion for a cast.
///
/// Declarations on both types are ambiguous.
pub fn find_explicit_conversion<'r>(
    source: ResultType,
    target: ResultType,
    ctx: &CompilationContext<'r>,
    span: Span,
) -> Result<Option<&'r Member>, CompilationError> {
    let mut found = conversions_named(EXPLICIT_NAME, source, target, ctx);
    found.extend(conversions_named(IMPLICIT_NAME, source, target, ctx));
    match found.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(*single)),
        [first, second, ..] => Err(CompilationError::AmbiguousMatch {
            name: format!(
                "conversion from '{}' to '{}'",
                ctx.type_name(source),
                ctx.type_name(target)
            ),
            candidates: format!(
                "{}::{} and {}::{}",
                ctx.resolver().type_name(first.owner),
                first.name,
                ctx.resolver().type_name(second.owner),
                second.name
            ),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_registry::TypeRegistry;

    #[test]
    fn implicit_found_on_target_type() {
        let mut registry = TypeRegistry::with_primitives();
        let money = registry.register_struct("Money").unwrap();
        registry
            .register_member(Member::conversion(money.type_hash, ResultType::INT32, money, true))
            .unwrap();
        let ctx = CompilationContext::new(&registry);
        assert!(find_user_conversion(ResultType::INT32, money, &ctx).is_some());
        assert!(find_user_conversion(ResultType::INT64, money, &ctx).is_none());
    }

    #[test]
    fn explicit_only_is_not_implicit() {
        let mut registry = TypeRegistry::with_primitives();
        let money = registry.register_struct("Money").unwrap();
        registry
            .register_member(Member::conversion(money.type_hash, money, ResultType::INT32, false))
            .unwrap();
        let ctx = CompilationContext::new(&registry);
        assert!(find_user_conversion(money, ResultType::INT32, &ctx).is_none());
        let found = find_explicit_conversion(money, ResultType::INT32, &ctx, Span::default());
        assert_eq!(found.unwrap().map(|m| m.name.as_str()), Some("opConv"));
    }

    #[test]
    fn declared_on_both_types_is_ambiguous() {
        let mut registry = TypeRegistry::with_primitives();
        let money = registry.register_struct("Money").unwrap();
        let euro = registry.register_struct("Euro").unwrap();
        registry
            .register_member(Member::conversion(money.type_hash, money, euro, false))
            .unwrap();
        registry
            .register_member(Member::conversion(euro.type_hash, money, euro, false))
            .unwrap();
        let ctx = CompilationContext::new(&registry);
        let err = find_explicit_conversion(money, euro, &ctx, Span::new(1, 1, 4)).unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousMatch { .. }));
    }
}
