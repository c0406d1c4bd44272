//! Score-based ranking for overload resolution.

use ordered_float::OrderedFloat;
use tracing::trace;

use formula_core::{CompilationError, Span};

use super::{Candidate, describe};
use crate::context::CompilationContext;

/// Select the viable candidate with the lowest score.
///
/// Candidates sharing the lowest score are ambiguous; there is no
/// further tie-breaking.
pub fn find_best_match<'r>(
    name: &str,
    mut viable: Vec<Candidate<'r>>,
    ctx: &CompilationContext<'_>,
    span: Span,
) -> Result<Candidate<'r>, CompilationError> {
    if viable.is_empty() {
        return Err(CompilationError::internal(format!(
            "no viable candidates for '{name}'"
        )));
    }

    viable.sort_by_key(|c| OrderedFloat(c.score));

    if let [best, second, ..] = viable.as_slice() {
        if OrderedFloat(best.score) == OrderedFloat(second.score) {
            return Err(CompilationError::AmbiguousMatch {
                name: name.to_string(),
                candidates: format!(
                    "{} and {}",
                    describe(best.member, ctx),
                    describe(second.member, ctx)
                ),
                span,
            });
        }
    }

    let best = viable.swap_remove(0);
    trace!(
        name,
        chosen = %describe(best.member, ctx),
        score = best.score,
        "overload resolved"
    );
    Ok(best)
}
