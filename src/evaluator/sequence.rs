//! Sequence transforms.
//!
//! Array operands produce arrays and stream operands produce lazy streams. Per
//! element callbacks run when the stream is pulled, so their errors surface at
//! whichever term materializes it; they are located at the function operand.

use super::{Closure, Evaluator, Seq, expect_array, expect_nonnegative, finish, type_error};
use crate::{
    ast::Term,
    error::{EvalError, Expected, QueryError, QueryResult, ResultExt},
    evaluator::{Env, Evaluated},
    stream::Stream,
    value::Value,
};

impl<'s> Evaluator<'s> {
    pub(super) fn eval_array_to_stream<'a>(
        &'a self,
        array: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        match self.sequence(array, env).at(0)? {
            Seq::Array(items) => Ok(Evaluated::Stream(Stream::from_values(items))),
            Seq::Stream(stream) => Ok(Evaluated::Stream(stream)),
        }
    }

    pub(super) fn eval_union<'a>(
        &'a self,
        left: &'a Term,
        right: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let lhs = self.sequence(left, env).at(0)?;
        let rhs = self.sequence(right, env).at(1)?;
        match (lhs, rhs) {
            (Seq::Array(mut a), Seq::Array(b)) => {
                a.extend(b);
                Ok(Evaluated::Datum(Value::Array(a)))
            }
            (a, b) => Ok(Evaluated::Stream(a.into_stream().chain(b.into_stream()))),
        }
    }

    /// `limit` when `skip` is false, `skip` otherwise.
    pub(super) fn eval_limit<'a>(
        &'a self,
        sequence: &'a Term,
        count: &'a Term,
        skip: bool,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let seq = self.sequence(sequence, env).at(0)?;
        let what = if skip { "Skip count" } else { "Limit" };
        let n = self
            .datum(count, env)
            .and_then(|v| expect_nonnegative(what, v))
            .at(1)?;
        let was_array = seq.is_array();
        let stream = seq.into_stream();
        finish(was_array, if skip { stream.skip(n) } else { stream.limit(n) })
    }

    pub(super) fn eval_map<'a>(
        &'a self,
        sequence: &'a Term,
        func: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let seq = self.sequence(sequence, env).at(0)?;
        let was_array = seq.is_array();
        let closure = self.function(func, env);
        let mapped = seq
            .into_stream()
            .map_with(move |row| self.call_datum(&closure, vec![row]).at(1));
        finish(was_array, mapped)
    }

    pub(super) fn eval_filter<'a>(
        &'a self,
        sequence: &'a Term,
        predicate: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let seq = self.sequence(sequence, env).at(0)?;
        let was_array = seq.is_array();
        let closure = self.function(predicate, env);
        let filtered = seq
            .into_stream()
            .filter_with(move |row| self.test_row(&closure, row).at(1));
        finish(was_array, filtered)
    }

    /// A predicate yields a bool, or an example object every field of which
    /// must equal the row's field of the same name.
    fn test_row<'a>(&'a self, predicate: &Closure<'a>, row: &Value) -> QueryResult<bool> {
        match self.call_datum(predicate, vec![row.clone()])? {
            Value::Bool(b) => Ok(b),
            Value::Object(example) => {
                let fields = row
                    .as_object()
                    .ok_or_else(|| type_error(Expected::Object, row))?;
                Ok(example
                    .iter()
                    .all(|(k, v)| fields.get(k).is_some_and(|field| field == v)))
            }
            other => Err(type_error(Expected::Bool, &other)),
        }
    }

    pub(super) fn eval_concat_map<'a>(
        &'a self,
        sequence: &'a Term,
        func: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let seq = self.sequence(sequence, env).at(0)?;
        let was_array = seq.is_array();
        let closure = self.function(func, env);
        let flattened = seq.into_stream().flat_map_with(move |row| {
            match self.call(&closure, vec![row]).at(1)? {
                Evaluated::Stream(inner) => Ok(inner),
                Evaluated::Datum(Value::Array(items)) => Ok(Stream::from_values(items)),
                other => Err(QueryError::from(EvalError::TypeMismatch {
                    expected: Expected::Sequence,
                    found: other.kind_name(),
                }))
                .at(1),
            }
        });
        finish(was_array, flattened)
    }

    pub(super) fn eval_reduce(
        &self,
        sequence: &Term,
        base: &Term,
        func: &Term,
        env: &Env,
    ) -> QueryResult<Value> {
        let stream = self.sequence(sequence, env).at(0)?.into_stream();
        let base = self.datum(base, env).at(1)?;
        let closure = self.function(func, env);
        stream
            .fold(base, |acc, row| self.call_datum(&closure, vec![acc, row]))
            .at(2)
    }

    pub(super) fn eval_grouped_map_reduce(
        &self,
        sequence: &Term,
        group: &Term,
        mapping: &Term,
        base: &Term,
        reduction: &Term,
        env: &Env,
    ) -> QueryResult<Value> {
        let stream = self.sequence(sequence, env).at(0)?.into_stream();
        let group = self.function(group, env);
        let mapping = self.function(mapping, env);
        let base = self.datum(base, env).at(3)?;
        let reduction = self.function(reduction, env);
        stream.grouped_map_reduce(
            |row| self.call_datum(&group, vec![row.clone()]).at(1),
            |row| self.call_datum(&mapping, vec![row]).at(2),
            base,
            |acc, row| self.call_datum(&reduction, vec![acc, row]).at(4),
        )
    }
}

/// Rows to write: a single object, an array of them, or a stream.
pub(super) fn rows_of(evaluated: Evaluated<'_>) -> QueryResult<Vec<Value>> {
    match evaluated {
        Evaluated::Datum(Value::Array(items)) => Ok(items),
        Evaluated::Datum(value @ Value::Object(_)) => Ok(vec![value]),
        Evaluated::Stream(stream) => stream.collect(),
        Evaluated::Row(single) => Ok(single.row.into_iter().collect()),
        Evaluated::Datum(other) => expect_array(other),
        Evaluated::Function(_) => Err(EvalError::TypeMismatch {
            expected: Expected::Array,
            found: "function",
        }
        .into()),
    }
}
