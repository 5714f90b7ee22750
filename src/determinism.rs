//! Classifies transformation terms for `update` and `replace`.
//!
//! A transformation may run atomically only if evaluating it twice on the same
//! row must give the same result. Script evaluation and table reads can differ
//! between evaluations, so any term that contains one is non-deterministic.

use tracing::trace;

use crate::{
    ast::Term,
    error::{ConstructionError, QueryResult, ResultExt},
};

/// Whether `term` always evaluates to the same result for the same bindings.
pub fn is_deterministic(term: &Term) -> bool {
    match term {
        // Scripts are opaque to the classifier
        Term::Js(_) => false,

        // Table reads and writes observe storage
        Term::Table(_)
        | Term::Get { .. }
        | Term::Insert { .. }
        | Term::Delete(_)
        | Term::Update { .. }
        | Term::Replace { .. } => false,

        Term::Datum(_) | Term::Var(_) | Term::ImplicitVar => true,

        Term::MakeArray(_)
        | Term::MakeObject(_)
        | Term::Func { .. }
        | Term::Let { .. }
        | Term::Branch { .. }
        | Term::Unary { .. }
        | Term::Binary { .. }
        | Term::GetAttr { .. }
        | Term::Contains { .. }
        | Term::Merge { .. }
        | Term::Pick { .. }
        | Term::Unpick { .. }
        | Term::Pluck { .. }
        | Term::Without { .. }
        | Term::Append { .. }
        | Term::Nth { .. }
        | Term::Slice { .. }
        | Term::Count(_)
        | Term::Union { .. }
        | Term::ArrayToStream(_)
        | Term::StreamToArray(_)
        | Term::Limit { .. }
        | Term::Skip { .. }
        | Term::Distinct(_)
        | Term::Map { .. }
        | Term::Filter { .. }
        | Term::ConcatMap { .. }
        | Term::Reduce { .. }
        | Term::GroupedMapReduce { .. }
        | Term::OrderBy { .. }
        | Term::Between { .. } => term.children().into_iter().all(is_deterministic),
    }
}

/// Reject, before anything runs, an `update` or `replace` of a single row
/// (`get`) whose transformation is not deterministic and not acknowledged.
///
/// Multi-row selections are not rejected here; they report every row as an
/// error instead.
pub fn check_single_row_mutations(term: &Term) -> QueryResult<()> {
    if let Term::Update {
        selection,
        func,
        non_atomic,
    }
    | Term::Replace {
        selection,
        func,
        non_atomic,
    } = term
        && matches!(**selection, Term::Get { .. })
        && !*non_atomic
        && !is_deterministic(func)
    {
        let op = if matches!(term, Term::Update { .. }) {
            "update"
        } else {
            "replace"
        };
        trace!(op, "rejecting single-row mutation");
        return Err(ConstructionError::NotDeterministic { op }.into());
    }

    match term {
        Term::MakeObject(pairs) => pairs
            .iter()
            .try_for_each(|(key, value)| check_single_row_mutations(value).at_key(key)),
        Term::Let { bindings, body } => {
            for (name, value) in bindings {
                check_single_row_mutations(value).at_key(name)?;
            }
            check_single_row_mutations(body).at(bindings.len())
        }
        _ => term
            .children()
            .into_iter()
            .enumerate()
            .try_for_each(|(i, child)| check_single_row_mutations(child).at(i)),
    }
}
