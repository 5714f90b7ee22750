//! Attribute, index and range access.

use super::{Evaluator, Seq, expect_integer, expect_object, finish};
use crate::{
    ast::Term,
    error::{EvalError, QueryError, QueryResult, ResultExt},
    evaluator::{Env, Evaluated},
    value::Value,
};

/// Resolve a possibly negative array index.
fn array_index(index: i64, len: usize) -> QueryResult<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        return Err(EvalError::OutOfBounds { index, len }.into());
    }
    Ok(resolved as usize)
}

/// Python-style bound: negative counts from the end, then clamp to `[0, len]`.
fn clamp_bound(bound: i64, len: usize) -> i64 {
    let len = len as i64;
    let bound = if bound < 0 { bound + len } else { bound };
    bound.clamp(0, len)
}

fn optional_integer(value: Value) -> QueryResult<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        other => expect_integer(other).map(Some),
    }
}

impl<'s> Evaluator<'s> {
    pub(super) fn eval_get_attr(&self, object: &Term, attr: &str, env: &Env) -> QueryResult<Value> {
        let mut fields = self.datum(object, env).and_then(expect_object).at(0)?;
        fields
            .remove(attr)
            .ok_or_else(|| EvalError::MissingAttribute(attr.to_string()).into())
    }

    pub(super) fn eval_contains(&self, object: &Term, attr: &str, env: &Env) -> QueryResult<Value> {
        let fields = self.datum(object, env).and_then(expect_object).at(0)?;
        Ok(Value::Bool(fields.contains_key(attr)))
    }

    pub(super) fn eval_nth(&self, sequence: &Term, index: &Term, env: &Env) -> QueryResult<Value> {
        let seq = self.sequence(sequence, env).at(0)?;
        let index = self.datum(index, env).and_then(expect_integer).at(1)?;
        match seq {
            Seq::Array(mut items) => {
                let i = array_index(index, items.len())?;
                Ok(items.swap_remove(i))
            }
            Seq::Stream(stream) => {
                if index < 0 {
                    return Err(EvalError::Negative {
                        what: "Stream index",
                        value: index,
                    }
                    .into());
                }
                stream.nth(index as usize)
            }
        }
    }

    pub(super) fn eval_slice<'a>(
        &'a self,
        sequence: &'a Term,
        start: &'a Term,
        end: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let seq = self.sequence(sequence, env).at(0)?;
        let lo = self.datum(start, env).and_then(optional_integer).at(1)?;
        let hi = self.datum(end, env).and_then(optional_integer).at(2)?;
        match seq {
            Seq::Array(items) => {
                let len = items.len();
                let lo = lo.map_or(0, |b| clamp_bound(b, len));
                let hi = hi.map_or(len as i64, |b| clamp_bound(b, len));
                if lo > hi {
                    return Err(EvalError::RangeOrder { start: lo, end: hi }.into());
                }
                let slice = items
                    .into_iter()
                    .skip(lo as usize)
                    .take((hi - lo) as usize)
                    .collect();
                Ok(Evaluated::Datum(Value::Array(slice)))
            }
            Seq::Stream(stream) => {
                let lo = lo.unwrap_or(0);
                if lo < 0 {
                    return Err(QueryError::from(EvalError::Negative {
                        what: "Slice start",
                        value: lo,
                    }))
                    .at(1);
                }
                let stream = stream.skip(lo as usize);
                match hi {
                    None => finish(false, stream),
                    Some(hi) if hi < 0 => Err(QueryError::from(EvalError::Negative {
                        what: "Slice end",
                        value: hi,
                    }))
                    .at(2),
                    Some(hi) if lo > hi => {
                        Err(EvalError::RangeOrder { start: lo, end: hi }.into())
                    }
                    Some(hi) => finish(false, stream.limit((hi - lo) as usize)),
                }
            }
        }
    }

    pub(super) fn eval_count(&self, sequence: &Term, env: &Env) -> QueryResult<Value> {
        let n = match self.sequence(sequence, env).at(0)? {
            Seq::Array(items) => items.len(),
            Seq::Stream(stream) => stream.count().at(0)?,
        };
        Ok(Value::from(n))
    }
}
