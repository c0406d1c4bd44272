//! CompilationContext - the resolver and options for one compile.

use formula_core::{
    CompilationError, Member, MemberResolver, ResultType, Scope, Span, TypeEntry, TypeHash,
    TypeKind,
};

use crate::options::CompilerOptions;

/// Read-only state shared by every stage of a compile.
pub struct CompilationContext<'r> {
    resolver: &'r dyn MemberResolver,
    options: CompilerOptions,
}

impl<'r> CompilationContext<'r> {
    pub fn new(resolver: &'r dyn MemberResolver) -> Self {
        Self::with_options(resolver, CompilerOptions::default())
    }

    pub fn with_options(resolver: &'r dyn MemberResolver, options: CompilerOptions) -> Self {
        Self { resolver, options }
    }

    #[inline]
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    #[inline]
    pub fn resolver(&self) -> &'r dyn MemberResolver {
        self.resolver
    }

    pub fn get_type(&self, hash: TypeHash) -> Option<&'r TypeEntry> {
        self.resolver.type_entry(hash)
    }

    /// Display name of a type for diagnostics.
    pub fn type_name(&self, ty: ResultType) -> String {
        match ty.kind {
            TypeKind::Enum
            | TypeKind::Struct
            | TypeKind::Class
            | TypeKind::Interface
            | TypeKind::Array => self.resolver.type_name(ty.type_hash),
            _ => ty.to_string(),
        }
    }

    /// The single-rank array type of `element`, registered or not.
    pub fn array_type(&self, element: ResultType) -> ResultType {
        let name = format!("{}[]", self.resolver.type_name(element.type_hash));
        ResultType::new(TypeHash::from_name(&name), TypeKind::Array)
    }

    /// Members named `name` on `ty`, honouring the case option.
    pub fn members_of(&self, ty: TypeHash, name: &str) -> Vec<&'r Member> {
        self.resolver
            .resolve(name, Scope::Type(ty), self.options.ignore_case)
    }

    /// Members visible as bare names: the owner type, then the global namespace.
    pub fn bare_members(&self, name: &str) -> Vec<&'r Member> {
        if let Some(owner) = self.options.owner {
            let found = self.members_of(owner, name);
            if !found.is_empty() {
                return found;
            }
        }
        self.resolver
            .resolve(name, Scope::Namespace(""), self.options.ignore_case)
    }

    /// Name of the scope bare names resolve in, for diagnostics.
    pub fn bare_scope_name(&self) -> String {
        match self.options.owner {
            Some(owner) => self.resolver.type_name(owner),
            None => "the global namespace".to_string(),
        }
    }

    pub fn inheritance_distance(&self, derived: TypeHash, base: TypeHash) -> Option<u32> {
        self.resolver.inheritance_distance(derived, base)
    }

    pub fn implements(&self, ty: TypeHash, interface: TypeHash) -> bool {
        self.resolver.implements(ty, interface)
    }

    /// A [`CompilationError::TypeMismatch`] naming two operand types.
    pub fn binary_mismatch(
        &self,
        op: &str,
        left: ResultType,
        right: ResultType,
        span: Span,
    ) -> CompilationError {
        CompilationError::mismatch(
            format!(
                "operator '{op}' cannot be applied to '{}' and '{}'",
                self.type_name(left),
                self.type_name(right)
            ),
            span,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_core::TypeFlags;
    use formula_registry::TypeRegistry;

    #[test]
    fn bare_names_prefer_owner() {
        let mut registry = TypeRegistry::with_primitives();
        let order = registry
            .register_class("Order", None, &[], TypeFlags::empty())
            .unwrap();
        registry
            .register_member(Member::field(order.type_hash, "total", ResultType::DOUBLE))
            .unwrap();
        registry
            .register_function("", "total", vec![], ResultType::INT32)
            .unwrap();

        let ctx = CompilationContext::with_options(
            &registry,
            CompilerOptions::new().with_owner(order.type_hash),
        );
        let found = ctx.bare_members("total");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].return_type, ResultType::DOUBLE);
        assert_eq!(ctx.bare_scope_name(), "Order");

        let global = CompilationContext::new(&registry);
        assert_eq!(global.bare_members("total")[0].return_type, ResultType::INT32);
    }

    #[test]
    fn type_names_for_builtins_and_host_types() {
        let mut registry = TypeRegistry::with_primitives();
        let money = registry.register_struct("Money").unwrap();
        let ctx = CompilationContext::new(&registry);
        assert_eq!(ctx.type_name(ResultType::UINT32), "uint");
        assert_eq!(ctx.type_name(money), "Money");
    }

    #[test]
    fn array_type_matches_registered_array() {
        let mut registry = TypeRegistry::with_primitives();
        let money = registry.register_struct("Money").unwrap();
        let monies = registry.array_of(money, 1).unwrap();
        let ints = registry.array_of(ResultType::INT32, 1).unwrap();
        let ctx = CompilationContext::new(&registry);
        assert_eq!(ctx.array_type(money), monies);
        assert_eq!(ctx.array_type(ResultType::INT32), ints);
        assert_eq!(ctx.type_name(ctx.array_type(money)), "Money[]");
    }
}
