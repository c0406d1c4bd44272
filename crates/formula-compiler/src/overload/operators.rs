//! Operator overload lookup.
//!
//! Operators are static members named by convention (`opAdd`, `opEquals`,
//! ...). A binary operator may be declared on either operand's type; both
//! are searched independently and a hit on each side is only resolved when
//! one of them scores strictly better.

use std::fmt;

use formula_core::{CompilationError, Member, MemberKind, ResultType, Span, TypeHash};

use super::{Candidate, describe, find_best_match, score_candidate};
use crate::context::CompilationContext;

/// Convention method names for overloadable operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorName {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Equals,
    NotEquals,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Neg,
    Plus,
    Not,
    Com,
}

impl OperatorName {
    pub const fn method_name(self) -> &'static str {
        match self {
            Self::Add => "opAdd",
            Self::Sub => "opSub",
            Self::Mul => "opMul",
            Self::Div => "opDiv",
            Self::Mod => "opMod",
            Self::Pow => "opPow",
            Self::Equals => "opEquals",
            Self::NotEquals => "opNotEquals",
            Self::Less => "opLess",
            Self::Greater => "opGreater",
            Self::LessEqual => "opLessEqual",
            Self::GreaterEqual => "opGreaterEqual",
            Self::Shl => "opShl",
            Self::Shr => "opShr",
            Self::And => "opAnd",
            Self::Or => "opOr",
            Self::Xor => "opXor",
            Self::Neg => "opNeg",
            Self::Plus => "opPlus",
            Self::Not => "opNot",
            Self::Com => "opCom",
        }
    }

    /// Source spelling, for diagnostics.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add | Self::Plus => "+",
            Self::Sub | Self::Neg => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessEqual => "<=",
            Self::GreaterEqual => ">=",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "!",
            Self::Com => "~",
        }
    }

    /// Number of operands the overload takes.
    pub const fn arity(self) -> usize {
        match self {
            Self::Neg | Self::Plus | Self::Not | Self::Com => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for OperatorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Operator overloads named `op` declared on `owner`.
fn operators_on<'r>(
    op: OperatorName,
    owner: TypeHash,
    ctx: &CompilationContext<'r>,
) -> Vec<&'r Member> {
    ctx.members_of(owner, op.method_name())
        .into_iter()
        .filter(|m| m.kind == MemberKind::Operator && m.params.len() == op.arity())
        .collect()
}

/// Best overload declared on one type, if any applies.
fn best_on<'r>(
    op: OperatorName,
    owner: TypeHash,
    args: &[ResultType],
    ctx: &CompilationContext<'r>,
    span: Span,
) -> Result<Option<Candidate<'r>>, CompilationError> {
    let viable: Vec<Candidate<'r>> = operators_on(op, owner, ctx)
        .into_iter()
        .filter_map(|member| score_candidate(member, args, ctx))
        .collect();
    if viable.is_empty() {
        return Ok(None);
    }
    find_best_match(op.method_name(), viable, ctx, span).map(Some)
}

/// Find a user overload of binary operator `op` for `left op right`.
///
/// Returns `Ok(None)` when neither type declares an applicable overload.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn find_operator<'r>(
    op: OperatorName,
    left: ResultType,
    right: ResultType,
    ctx: &CompilationContext<'r>,
    span: Span,
) -> Result<Option<Candidate<'r>>, CompilationError> {
    let args = [left, right];
    let on_left = best_on(op, left.type_hash, &args, ctx, span)?;
    if left.type_hash == right.type_hash {
        return Ok(on_left);
    }
    let on_right = best_on(op, right.type_hash, &args, ctx, span)?;

    match (on_left, on_right) {
        (None, None) => Ok(None),
        (Some(found), None) | (None, Some(found)) => Ok(Some(found)),
        (Some(l), Some(r)) if l.member.hash == r.member.hash => Ok(Some(l)),
        (Some(l), Some(r)) if l.score < r.score => Ok(Some(l)),
        (Some(l), Some(r)) if r.score < l.score => Ok(Some(r)),
        (Some(l), Some(r)) => Err(CompilationError::AmbiguousMatch {
            name: format!("operator '{}'", op.symbol()),
            candidates: format!(
                "{}::{} and {}::{}",
                ctx.resolver().type_name(l.member.owner),
                describe(l.member, ctx),
                ctx.resolver().type_name(r.member.owner),
                describe(r.member, ctx)
            ),
            span,
        }),
    }
}

/// Find a user overload of unary operator `op` on `operand`'s type.
pub fn find_unary_operator<'r>(
    op: OperatorName,
    operand: ResultType,
    ctx: &CompilationContext<'r>,
    span: Span,
) -> Result<Option<Candidate<'r>>, CompilationError> {
    best_on(op, operand.type_hash, &[operand], ctx, span)
}
