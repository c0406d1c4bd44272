//! Field, property and method access.
//!
//! Names resolve against the target element's type, or for bare names
//! against the configured owner type and then the global namespace.

use formula_core::{CompilationError, Member, MemberKind, ResultType, Span};

use super::{Result, TreeBuilder};
use crate::elements::{Element, ElementKind, MemberAccess, Receiver};
use crate::overload::resolve_overload;

impl<'a, 'r> TreeBuilder<'a, 'r> {
    /// Type a member access or call.
    ///
    /// `is_call` distinguishes `name()` from a plain `name`.
    pub fn member(
        &self,
        name: &str,
        target: Option<&'a Element<'a>>,
        args: &[&'a Element<'a>],
        is_call: bool,
        span: Span,
    ) -> Result<&'a Element<'a>> {
        let found = match target {
            Some(t) => self.ctx.members_of(t.result_type.type_hash, name),
            None => self.ctx.bare_members(name),
        };
        if found.is_empty() {
            let scope = match target {
                Some(t) => format!("'{}'", self.ctx.type_name(t.result_type)),
                None => self.ctx.bare_scope_name(),
            };
            return Err(CompilationError::UndefinedName {
                name: name.to_string(),
                scope,
                span,
            });
        }

        if !is_call {
            let value = found
                .iter()
                .find(|m| matches!(m.kind, MemberKind::Field | MemberKind::Property));
            return match value {
                Some(member) => Ok(self.value_member(member, target, span)),
                None => Err(CompilationError::mismatch(
                    format!("'{name}' is a method and must be called"),
                    span,
                )),
            };
        }

        let methods: Vec<&'r Member> = found
            .into_iter()
            .filter(|m| m.kind == MemberKind::Method)
            .collect();
        if methods.is_empty() {
            return Err(CompilationError::mismatch(
                format!("'{name}' is not a method"),
                span,
            ));
        }

        let arg_types: Vec<ResultType> = args.iter().map(|a| a.result_type).collect();
        let candidate = resolve_overload(name, &methods, &arg_types, self.ctx, span)?;
        let call = self.call_target(&candidate);
        let receiver = self.receiver(candidate.member, target);
        let access = MemberAccess::Method {
            call,
            args: self.arena.alloc_slice_copy(args),
        };
        Ok(self.alloc(
            ElementKind::Member { receiver, access },
            candidate.return_type,
            span,
        ))
    }

    fn value_member(
        &self,
        member: &Member,
        target: Option<&'a Element<'a>>,
        span: Span,
    ) -> &'a Element<'a> {
        let access = match member.kind {
            MemberKind::Property => MemberAccess::Property {
                member: member.hash,
            },
            _ => MemberAccess::Field {
                member: member.hash,
            },
        };
        let receiver = self.receiver(member, target);
        self.alloc(
            ElementKind::Member { receiver, access },
            member.return_type,
            span,
        )
    }

    /// Static members ignore the target; bare instance members read the owner.
    fn receiver(&self, member: &Member, target: Option<&'a Element<'a>>) -> Receiver<'a> {
        match (member.is_static, target) {
            (true, _) => Receiver::Static,
            (false, Some(t)) => Receiver::Element(t),
            (false, None) => Receiver::Owner,
        }
    }
}
