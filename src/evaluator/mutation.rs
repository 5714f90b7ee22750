//! `update` and `replace`.
//!
//! Both apply a transformation to every row of a selection and report counts
//! rather than rows. A transformation that cannot be proven deterministic is
//! only applied when the caller passed `non_atomic`; otherwise nothing is
//! written and every row is reported as an error (a single-row selection fails
//! outright instead).
//!
//! Over a multi-row selection a row whose transformation fails is counted under
//! `errors` and left untouched, and the remaining rows are still processed.
//! Over a single row the failure is raised.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::{Closure, Evaluator, type_error};
use crate::{
    ast::Term,
    determinism::is_deterministic,
    error::{ConstructionError, EvalError, Expected, QueryError, QueryResult, ResultExt},
    evaluator::{Env, Evaluated},
    stream::Selection,
    table::{TableError, primary_key_of},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mutation {
    Update,
    Replace,
}

impl Mutation {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Mutation::Update => "update",
            Mutation::Replace => "replace",
        }
    }
}

/// Per-row outcome counts of one mutation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MutationStats {
    pub inserted: usize,
    pub updated: usize,
    pub modified: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errors: usize,
    pub first_error: Option<String>,
}

impl MutationStats {
    fn record_error(&mut self, message: String) {
        self.errors += 1;
        self.first_error.get_or_insert(message);
    }

    /// `{updated, skipped, errors}` for update, `{inserted, deleted, modified,
    /// errors}` for replace; `first_error` when anything failed.
    fn to_value(&self, mutation: Mutation) -> Value {
        let mut fields = match mutation {
            Mutation::Update => vec![
                ("updated", Value::from(self.updated)),
                ("skipped", Value::from(self.skipped)),
            ],
            Mutation::Replace => vec![
                ("inserted", Value::from(self.inserted)),
                ("deleted", Value::from(self.deleted)),
                ("modified", Value::from(self.modified)),
            ],
        };
        fields.push(("errors", Value::from(self.errors)));
        if let Some(message) = &self.first_error {
            fields.push(("first_error", Value::from(message.as_str())));
        }
        Value::object(fields)
    }
}

/// What a mutation applies to.
enum Target {
    Rows(Selection, Vec<Value>),
    Single(Selection, Value, Option<Value>),
}

impl<'s> Evaluator<'s> {
    pub(super) fn eval_update(
        &self,
        selection: &Term,
        func: &Term,
        non_atomic: bool,
        env: &Env,
    ) -> QueryResult<Value> {
        self.mutate(Mutation::Update, selection, func, non_atomic, env)
    }

    pub(super) fn eval_replace(
        &self,
        selection: &Term,
        func: &Term,
        non_atomic: bool,
        env: &Env,
    ) -> QueryResult<Value> {
        self.mutate(Mutation::Replace, selection, func, non_atomic, env)
    }

    fn target(&self, selection: &Term, env: &Env) -> QueryResult<Target> {
        match self.eval(selection, env)? {
            Evaluated::Row(single) => Ok(Target::Single(single.selection, single.key, single.row)),
            Evaluated::Stream(stream) => match stream.selection().cloned() {
                Some(target) => Ok(Target::Rows(target, stream.collect()?)),
                None => Err(EvalError::TypeMismatch {
                    expected: Expected::Selection,
                    found: "stream",
                }
                .into()),
            },
            other => Err(EvalError::TypeMismatch {
                expected: Expected::Selection,
                found: other.kind_name(),
            }
            .into()),
        }
    }

    fn mutate(
        &self,
        mutation: Mutation,
        selection: &Term,
        func: &Term,
        non_atomic: bool,
        env: &Env,
    ) -> QueryResult<Value> {
        let target = self.target(selection, env).at(0)?;
        let deterministic = is_deterministic(func);
        debug!(op = mutation.name(), deterministic, non_atomic, "classified transformation");

        let closure = self.function(func, env);
        let mut stats = MutationStats::default();
        match target {
            Target::Single(selection, key, row) => {
                if !deterministic && !non_atomic {
                    return Err(ConstructionError::NotDeterministic {
                        op: mutation.name(),
                    }
                    .into());
                }
                self.apply(mutation, &selection, &closure, key, row, &mut stats)
                    .at(1)?;
            }
            Target::Rows(selection, rows) => {
                if !deterministic && !non_atomic {
                    let refusal = ConstructionError::NotDeterministic {
                        op: mutation.name(),
                    };
                    warn!(
                        op = mutation.name(),
                        table = %selection.table,
                        rows = rows.len(),
                        "refusing non-deterministic transformation"
                    );
                    for _ in &rows {
                        stats.record_error(refusal.to_string());
                    }
                    return Ok(stats.to_value(mutation));
                }
                for row in rows {
                    let outcome = primary_key_of(&row, &selection.primary_key)
                        .map_err(QueryError::from)
                        .and_then(|key| {
                            self.apply(mutation, &selection, &closure, key, Some(row), &mut stats)
                        });
                    if let Err(e) = outcome {
                        stats.record_error(e.to_string());
                    }
                }
            }
        }

        debug!(
            op = mutation.name(),
            inserted = stats.inserted,
            updated = stats.updated,
            modified = stats.modified,
            deleted = stats.deleted,
            skipped = stats.skipped,
            errors = stats.errors,
            "mutation finished"
        );
        Ok(stats.to_value(mutation))
    }

    fn apply<'a>(
        &'a self,
        mutation: Mutation,
        selection: &Selection,
        closure: &Closure<'a>,
        key: Value,
        row: Option<Value>,
        stats: &mut MutationStats,
    ) -> QueryResult<()> {
        match mutation {
            Mutation::Update => self.update_row(selection, closure, row, stats),
            Mutation::Replace => self.replace_row(selection, closure, key, row, stats),
        }
    }

    /// A merge that leaves the row as it was still counts as `updated`; the
    /// response has no `unchanged` field. Such a row is not rewritten.
    fn update_row<'a>(
        &'a self,
        selection: &Selection,
        closure: &Closure<'a>,
        row: Option<Value>,
        stats: &mut MutationStats,
    ) -> QueryResult<()> {
        let Some(row) = row else {
            stats.skipped += 1;
            return Ok(());
        };
        match self.call_datum(closure, vec![row.clone()])? {
            Value::Null => stats.skipped += 1,
            Value::Object(patch) => {
                let mut merged: HashMap<String, Value> = match &row {
                    Value::Object(fields) => fields.clone(),
                    other => return Err(type_error(Expected::Object, other)),
                };
                merged.extend(patch);
                let merged = Value::Object(merged);
                check_same_key(&selection.primary_key, &row, &merged)?;
                if merged != row {
                    self.store.replace_row(&selection.table, merged)?;
                }
                stats.updated += 1;
            }
            other => return Err(type_error(Expected::Object, &other)),
        }
        Ok(())
    }

    fn replace_row<'a>(
        &'a self,
        selection: &Selection,
        closure: &Closure<'a>,
        key: Value,
        row: Option<Value>,
        stats: &mut MutationStats,
    ) -> QueryResult<()> {
        let current = row.clone().unwrap_or(Value::Null);
        match self.call_datum(closure, vec![current])? {
            Value::Null => {
                if row.is_some() && self.store.delete_row(&selection.table, &key)? {
                    stats.deleted += 1;
                }
            }
            replacement @ Value::Object(_) => {
                let new_key = primary_key_of(&replacement, &selection.primary_key)?;
                if new_key != key {
                    return Err(TableError::PrimaryKeyChanged {
                        key: selection.primary_key.clone(),
                        old: key.to_string(),
                        new: new_key.to_string(),
                    }
                    .into());
                }
                match row {
                    Some(existing) => {
                        if existing != replacement {
                            self.store.replace_row(&selection.table, replacement)?;
                        }
                        stats.modified += 1;
                    }
                    None => {
                        self.store.replace_row(&selection.table, replacement)?;
                        stats.inserted += 1;
                    }
                }
            }
            other => return Err(type_error(Expected::Object, &other)),
        }
        Ok(())
    }
}

fn check_same_key(primary_key: &str, before: &Value, after: &Value) -> QueryResult<()> {
    let old = primary_key_of(before, primary_key)?;
    let new = primary_key_of(after, primary_key)?;
    if old != new {
        return Err(TableError::PrimaryKeyChanged {
            key: primary_key.to_string(),
            old: old.to_string(),
            new: new.to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        let stats = MutationStats {
            updated: 2,
            skipped: 1,
            ..Default::default()
        };
        assert_eq!(
            stats.to_value(Mutation::Update),
            Value::object([
                ("updated", Value::from(2)),
                ("skipped", Value::from(1)),
                ("errors", Value::from(0)),
            ])
        );

        let mut failed = MutationStats::default();
        failed.record_error("first".into());
        failed.record_error("second".into());
        assert_eq!(
            failed.to_value(Mutation::Replace),
            Value::object([
                ("inserted", Value::from(0)),
                ("deleted", Value::from(0)),
                ("modified", Value::from(0)),
                ("errors", Value::from(2)),
                ("first_error", Value::from("first")),
            ])
        );
    }
}
