//! Overload resolution.
//!
//! Every candidate that accepts the arguments gets a score: the average of
//! its per-argument conversion costs, plus [`PARAM_ARRAY_PENALTY`] when the
//! call only fits by expanding a trailing parameter array. The lowest score
//! wins; a tie for lowest is ambiguous.

use formula_core::{CompilationError, Member, ResultType, Span};

use crate::context::CompilationContext;
use crate::conversion::{Conversion, find_conversion};

mod operators;
mod ranking;

pub use operators::{OperatorName, find_operator, find_unary_operator};
pub use ranking::find_best_match;

/// Added to the score of a call that needs param-array expansion.
///
/// Larger than any average of fixed-parameter conversion costs.
pub const PARAM_ARRAY_PENALTY: f32 = 1000.0;

/// A member that accepts the call's arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<'r> {
    pub member: &'r Member,
    /// Fixed parameter types.
    pub params: Vec<ResultType>,
    /// Element type of the trailing parameter array.
    pub variadic: Option<ResultType>,
    pub return_type: ResultType,
    /// Lower is better; 0 is an exact match.
    pub score: f32,
    /// One conversion per argument.
    pub conversions: Vec<Conversion>,
    /// Whether the trailing arguments fill a parameter array.
    pub expanded: bool,
}

/// Score `member` against `args`, or `None` if it cannot accept them.
///
/// A parameter-array member is tried both ways when the arguments allow
/// it: with the tail expanded into elements (penalised) and with the last
/// argument passed as the array itself. The lower score is kept.
pub fn score_candidate<'r>(
    member: &'r Member,
    args: &[ResultType],
    ctx: &CompilationContext<'_>,
) -> Option<Candidate<'r>> {
    let fixed = member.params.len();
    let Some(element) = member.variadic else {
        if args.len() != fixed {
            return None;
        }
        return score_form(member, args, param_types(member, None), false, ctx);
    };
    if args.len() < fixed {
        return None;
    }

    let expanded = score_form(
        member,
        args,
        param_types(member, Some(element)),
        true,
        ctx,
    );
    let direct = if args.len() == fixed + 1 {
        let array = ctx.array_type(element);
        score_form(member, args, param_types(member, Some(array)), false, ctx)
    } else {
        None
    };

    match (direct, expanded) {
        (Some(direct), Some(expanded)) if expanded.score < direct.score => Some(expanded),
        (Some(direct), _) => Some(direct),
        (None, expanded) => expanded,
    }
}

/// Parameter type for each argument position: the fixed parameters, then
/// `tail` repeated.
fn param_types(
    member: &Member,
    tail: Option<ResultType>,
) -> impl Fn(usize) -> Option<ResultType> + '_ {
    move |i| member.params.get(i).copied().or(tail)
}

fn score_form<'r>(
    member: &'r Member,
    args: &[ResultType],
    param_at: impl Fn(usize) -> Option<ResultType>,
    expanded: bool,
    ctx: &CompilationContext<'_>,
) -> Option<Candidate<'r>> {
    let mut conversions = Vec::with_capacity(args.len());
    for (i, &arg) in args.iter().enumerate() {
        conversions.push(find_conversion(arg, param_at(i)?, ctx)?);
    }

    let total: f32 = conversions.iter().map(|c| c.cost).sum();
    let mut score = if conversions.is_empty() {
        0.0
    } else {
        total / conversions.len() as f32
    };
    if expanded {
        score += PARAM_ARRAY_PENALTY;
    }

    Some(Candidate {
        member,
        params: member.params.clone(),
        variadic: member.variadic,
        return_type: member.return_type,
        score,
        conversions,
        expanded,
    })
}

/// Pick the best of `candidates` for a call with `args`.
///
/// Fails with `TypeMismatch` when nothing accepts the arguments and with
/// `AmbiguousMatch` when the best score is shared.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_overload<'r>(
    name: &str,
    candidates: &[&'r Member],
    args: &[ResultType],
    ctx: &CompilationContext<'_>,
    span: Span,
) -> Result<Candidate<'r>, CompilationError> {
    let viable: Vec<Candidate<'r>> = candidates
        .iter()
        .filter_map(|&member| score_candidate(member, args, ctx))
        .collect();

    if viable.is_empty() {
        let arg_list: Vec<String> = args.iter().map(|a| ctx.type_name(*a)).collect();
        return Err(CompilationError::mismatch(
            format!("no overload of '{name}' accepts ({})", arg_list.join(", ")),
            span,
        ));
    }

    find_best_match(name, viable, ctx, span)
}

/// Signature of a member for diagnostics, e.g. `max(int, int)`.
pub(crate) fn describe(member: &Member, ctx: &CompilationContext<'_>) -> String {
    let mut params: Vec<String> = member.params.iter().map(|p| ctx.type_name(*p)).collect();
    if let Some(element) = member.variadic {
        params.push(format!("params {}[]", ctx.type_name(element)));
    }
    format!("{}({})", member.name, params.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_core::TypeHash;
    use formula_registry::TypeRegistry;

    fn owner() -> TypeHash {
        TypeHash::from_name("Math")
    }

    fn method(params: Vec<ResultType>, ret: ResultType) -> Member {
        Member::function(owner(), "max", params, ret)
    }

    #[test]
    fn exact_match_scores_zero_and_wins() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let ints = method(vec![ResultType::INT32, ResultType::INT32], ResultType::INT32);
        let doubles = method(vec![ResultType::DOUBLE, ResultType::DOUBLE], ResultType::DOUBLE);
        let chosen = resolve_overload(
            "max",
            &[&doubles, &ints],
            &[ResultType::INT32, ResultType::INT32],
            &ctx,
            Span::default(),
        )
        .unwrap();
        assert_eq!(chosen.score, 0.0);
        assert_eq!(chosen.return_type, ResultType::INT32);
    }

    #[test]
    fn closest_widening_wins() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let longs = method(vec![ResultType::INT64], ResultType::INT64);
        let doubles = method(vec![ResultType::DOUBLE], ResultType::DOUBLE);
        let chosen = resolve_overload(
            "max",
            &[&doubles, &longs],
            &[ResultType::INT32],
            &ctx,
            Span::default(),
        )
        .unwrap();
        assert_eq!(chosen.return_type, ResultType::INT64);
    }

    #[test]
    fn score_is_average_of_arguments() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        // int -> int64 costs 2, int64 -> int64 costs 0
        let m = method(vec![ResultType::INT64, ResultType::INT64], ResultType::INT64);
        let c = score_candidate(&m, &[ResultType::INT32, ResultType::INT64], &ctx).unwrap();
        assert_eq!(c.score, 1.0);
        assert!(!c.expanded);
    }

    #[test]
    fn param_array_is_penalised() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let variadic = method(vec![], ResultType::DOUBLE).with_variadic(ResultType::DOUBLE);
        let pair = method(vec![ResultType::DOUBLE, ResultType::DOUBLE], ResultType::DOUBLE);
        let args = [ResultType::DOUBLE, ResultType::DOUBLE];

        let expanded = score_candidate(&variadic, &args, &ctx).unwrap();
        assert!(expanded.expanded);
        assert_eq!(expanded.score, PARAM_ARRAY_PENALTY);

        let chosen = resolve_overload("max", &[&variadic, &pair], &args, &ctx, Span::default())
            .unwrap();
        assert!(!chosen.expanded);

        let three = [ResultType::INT32; 3];
        let only = resolve_overload("max", &[&variadic, &pair], &three, &ctx, Span::default())
            .unwrap();
        assert!(only.expanded);
        assert_eq!(only.conversions.len(), 3);
    }

    #[test]
    fn array_argument_fills_param_array_directly() {
        let mut registry = TypeRegistry::with_primitives();
        let doubles = registry.array_of(ResultType::DOUBLE, 1).unwrap();
        let ints = registry.array_of(ResultType::INT32, 1).unwrap();
        let ctx = CompilationContext::new(&registry);
        let variadic = method(vec![ResultType::STRING], ResultType::DOUBLE)
            .with_variadic(ResultType::DOUBLE);

        let direct = score_candidate(&variadic, &[ResultType::STRING, doubles], &ctx).unwrap();
        assert!(!direct.expanded);
        assert_eq!(direct.score, 0.0);
        assert_eq!(direct.conversions.len(), 2);

        // a lone element still goes through expansion
        let single =
            score_candidate(&variadic, &[ResultType::STRING, ResultType::INT32], &ctx).unwrap();
        assert!(single.expanded);
        assert!(single.score > PARAM_ARRAY_PENALTY);

        // int[] is neither a double nor a double[]
        assert!(score_candidate(&variadic, &[ResultType::STRING, ints], &ctx).is_none());
    }

    #[test]
    fn empty_tail_keeps_penalty() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let variadic = method(vec![ResultType::INT32], ResultType::INT32)
            .with_variadic(ResultType::INT32);
        let single = method(vec![ResultType::INT32], ResultType::INT32);
        let args = [ResultType::INT32];

        let only = score_candidate(&variadic, &args, &ctx).unwrap();
        assert!(only.expanded);
        assert_eq!(only.score, PARAM_ARRAY_PENALTY);

        let chosen = resolve_overload("max", &[&variadic, &single], &args, &ctx, Span::default())
            .unwrap();
        assert!(chosen.variadic.is_none());
        assert_eq!(chosen.score, 0.0);
    }

    #[test]
    fn equal_scores_are_ambiguous() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        // (int64, double) and (double, int64) both cost (2 + 5) / 2 for (int, int)
        let a = method(vec![ResultType::INT64, ResultType::DOUBLE], ResultType::DOUBLE);
        let b = method(vec![ResultType::DOUBLE, ResultType::INT64], ResultType::DOUBLE);
        let err = resolve_overload(
            "max",
            &[&a, &b],
            &[ResultType::INT32, ResultType::INT32],
            &ctx,
            Span::new(2, 3, 3),
        )
        .unwrap_err();
        assert!(matches!(err, CompilationError::AmbiguousMatch { .. }));
        assert_eq!(err.span(), Span::new(2, 3, 3));
    }

    #[test]
    fn no_viable_candidate() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let m = method(vec![ResultType::INT32], ResultType::INT32);
        let err = resolve_overload("max", &[&m], &[ResultType::STRING], &ctx, Span::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "at 0:0: no overload of 'max' accepts (string)"
        );
    }

    #[test]
    fn describe_includes_param_array() {
        let registry = TypeRegistry::with_primitives();
        let ctx = CompilationContext::new(&registry);
        let m = method(vec![ResultType::STRING], ResultType::STRING).with_variadic(ResultType::OBJECT);
        assert_eq!(describe(&m, &ctx), "max(string, params object[])");
    }
}
