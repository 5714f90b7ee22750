//! Lazy sequences.
//!
//! A [`Stream`] wraps a pull-based iterator of `QueryResult<Value>`. Transforms
//! wrap the source iterator without consuming it; nothing is pulled until a
//! terminal operation ([`Stream::collect`], [`Stream::count`], [`Stream::fold`],
//! [`Stream::nth`], ordering or grouping) drives it. An error produced while
//! pulling an element is yielded in its place and surfaces at the terminal
//! operation.
//!
//! Streams that come straight from a table remember where they came from (their
//! [`Selection`]). Row-preserving transforms (`filter`, `limit`, `skip`,
//! ordering) keep it, so `delete`, `update` and `replace` can target the rows;
//! value-producing transforms (`map`, `concat_map`, `distinct`, `union`) drop it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter;

use tracing::trace;

use crate::{
    ast::OrderKey,
    error::{EvalError, Expected, QueryResult},
    value::Value,
};

type Rows<'a> = Box<dyn Iterator<Item = QueryResult<Value>> + 'a>;

/// The table a stream's rows belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub table: String,
    pub primary_key: String,
}

pub struct Stream<'a> {
    rows: Rows<'a>,
    selection: Option<Selection>,
}

impl fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl<'a> Iterator for Stream<'a> {
    type Item = QueryResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl<'a> Stream<'a> {
    fn new(rows: Rows<'a>, selection: Option<Selection>) -> Self {
        Stream { rows, selection }
    }

    /// A restartable stream over an array's elements.
    pub fn from_values(values: Vec<Value>) -> Self {
        Stream::new(Box::new(values.into_iter().map(Ok)), None)
    }

    /// A stream over rows read from `selection`'s table.
    pub fn from_table(rows: Vec<Value>, selection: Selection) -> Self {
        Stream::new(Box::new(rows.into_iter().map(Ok)), Some(selection))
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn limit(self, n: usize) -> Self {
        Stream::new(Box::new(self.rows.take(n)), self.selection)
    }

    pub fn skip(self, n: usize) -> Self {
        let mut remaining = n;
        let rows = self.rows.filter(move |row| {
            // Errors are never skipped over
            if row.is_ok() && remaining > 0 {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        Stream::new(Box::new(rows), self.selection)
    }

    /// First occurrence of every value, in order.
    pub fn distinct(self) -> Self {
        let mut seen = BTreeSet::new();
        let rows = self.rows.filter(move |row| match row {
            Ok(value) => seen.insert(value.clone()),
            Err(_) => true,
        });
        Stream::new(Box::new(rows), None)
    }

    pub fn map_with(self, mut f: impl FnMut(Value) -> QueryResult<Value> + 'a) -> Self {
        Stream::new(Box::new(self.rows.map(move |row| row.and_then(&mut f))), None)
    }

    /// Keep the rows for which `f` holds; `f` failing yields the failure.
    pub fn filter_with(self, mut f: impl FnMut(&Value) -> QueryResult<bool> + 'a) -> Self {
        let rows = self.rows.filter_map(move |row| match row {
            Ok(value) => match f(&value) {
                Ok(true) => Some(Ok(value)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        });
        Stream::new(Box::new(rows), self.selection)
    }

    /// Map every element to a stream and flatten one level.
    pub fn flat_map_with(self, mut f: impl FnMut(Value) -> QueryResult<Stream<'a>> + 'a) -> Self {
        let rows = self.rows.flat_map(move |row| -> Rows<'a> {
            match row.and_then(&mut f) {
                Ok(inner) => inner.rows,
                Err(e) => Box::new(iter::once(Err(e))),
            }
        });
        Stream::new(Box::new(rows), None)
    }

    pub fn chain(self, other: Stream<'a>) -> Self {
        Stream::new(Box::new(self.rows.chain(other.rows)), None)
    }

    /// Element at `index`, pulling no further than needed.
    pub fn nth(self, index: usize) -> QueryResult<Value> {
        let mut seen = 0;
        for row in self.rows {
            let value = row?;
            if seen == index {
                return Ok(value);
            }
            seen += 1;
        }
        Err(EvalError::OutOfBounds {
            index: index as i64,
            len: seen,
        }
        .into())
    }

    pub fn collect(self) -> QueryResult<Vec<Value>> {
        let values = self.rows.collect::<QueryResult<Vec<_>>>()?;
        trace!(len = values.len(), "materialized stream");
        Ok(values)
    }

    pub fn count(mut self) -> QueryResult<usize> {
        self.rows.try_fold(0, |n, row| row.map(|_| n + 1))
    }

    /// Strict left fold; `base` is returned untouched for an empty stream.
    pub fn fold(
        mut self,
        base: Value,
        mut f: impl FnMut(Value, Value) -> QueryResult<Value>,
    ) -> QueryResult<Value> {
        self.rows
            .try_fold(base, |acc, row| row.and_then(|value| f(acc, value)))
    }

    /// Stable multi-key sort. Every row must be an object holding every key field.
    pub fn order_by(self, keys: &[OrderKey]) -> QueryResult<Self> {
        let selection = self.selection.clone();
        let mut keyed = Vec::new();
        for row in self.rows {
            let row = row?;
            let fields = row.as_object().ok_or(EvalError::TypeMismatch {
                expected: Expected::Object,
                found: row.kind_name(),
            })?;
            let sort_key = keys
                .iter()
                .map(|key| {
                    fields
                        .get(&key.field)
                        .cloned()
                        .ok_or_else(|| EvalError::MissingAttribute(key.field.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            keyed.push((sort_key, row));
        }
        trace!(rows = keyed.len(), keys = keys.len(), "sorting stream");

        keyed.sort_by(|(a, _), (b, _)| compare_keys(keys, a, b));
        let rows = keyed.into_iter().map(|(_, row)| Ok(row));
        Ok(Stream::new(Box::new(rows), selection))
    }

    /// Group, map and fold per group; groups come out in ascending key order.
    pub fn grouped_map_reduce(
        self,
        mut group: impl FnMut(&Value) -> QueryResult<Value>,
        mut mapping: impl FnMut(Value) -> QueryResult<Value>,
        base: Value,
        mut reduction: impl FnMut(Value, Value) -> QueryResult<Value>,
    ) -> QueryResult<Value> {
        let mut groups: BTreeMap<Value, Value> = BTreeMap::new();
        for row in self.rows {
            let row = row?;
            let key = group(&row)?;
            let mapped = mapping(row)?;
            let acc = groups.remove(&key).unwrap_or_else(|| base.clone());
            groups.insert(key, reduction(acc, mapped)?);
        }
        trace!(groups = groups.len(), "grouped stream");

        Ok(Value::Array(
            groups
                .into_iter()
                .map(|(group, reduction)| {
                    Value::object([("group", group), ("reduction", reduction)])
                })
                .collect(),
        ))
    }
}

fn compare_keys(keys: &[OrderKey], a: &[Value], b: &[Value]) -> Ordering {
    for ((key, x), y) in keys.iter().zip(a).zip(b) {
        let ordering = if key.ascending { x.cmp(y) } else { y.cmp(x) };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    fn values(json: serde_json::Value) -> Vec<Value> {
        match Value::from(json) {
            Value::Array(items) => items,
            other => vec![other],
        }
    }

    fn numbers(range: std::ops::Range<i32>) -> Stream<'static> {
        Stream::from_values(range.map(Value::from).collect())
    }

    #[test]
    fn test_transforms_are_lazy() {
        let pulled = Rc::new(Cell::new(0));
        let counter = pulled.clone();
        let stream = numbers(0..100).map_with(move |v| {
            counter.set(counter.get() + 1);
            Ok(v)
        });
        let first = stream.limit(3).collect().unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(pulled.get(), 3);
    }

    #[test]
    fn test_limit_skip() {
        assert_eq!(numbers(0..10).skip(8).collect().unwrap(), values(json!([8, 9])));
        assert_eq!(numbers(0..3).limit(10).count().unwrap(), 3);
        assert_eq!(numbers(0..3).skip(10).count().unwrap(), 0);
    }

    #[test]
    fn test_distinct_keeps_first_occurrence() {
        let stream = Stream::from_values(values(json!([3, true, 1, 3, 2, true, 1.0])));
        assert_eq!(stream.distinct().collect().unwrap(), values(json!([3, true, 1, 2])));
    }

    #[test]
    fn test_errors_surface_at_materialization() {
        let stream = numbers(0..5).map_with(|v| {
            if v == Value::from(2) {
                Err(EvalError::MissingAttribute("x".into()).into())
            } else {
                Ok(v)
            }
        });
        let err: QueryError = stream.collect().unwrap_err();
        assert!(err.to_string().contains("missing attribute"));
    }

    #[test]
    fn test_nth_reports_bounds() {
        assert_eq!(numbers(0..3).nth(2).unwrap(), Value::from(2));
        let err = numbers(0..3).nth(3).unwrap_err();
        assert!(err.to_string().contains("bounds"));
    }

    #[test]
    fn test_fold_on_empty_returns_base() {
        let sum = numbers(0..0).fold(Value::from("base"), |_, _| panic!("not called"));
        assert_eq!(sum.unwrap(), Value::from("base"));
    }

    #[test]
    fn test_order_by_is_stable_and_multi_key() {
        let docs = values(json!([
            {"id": 0, "a": 1, "b": 1},
            {"id": 1, "a": 0, "b": 2},
            {"id": 2, "a": 1, "b": 0},
            {"id": 3, "a": 0, "b": 2},
        ]));
        let sorted = Stream::from_values(docs)
            .order_by(&[OrderKey::asc("a"), OrderKey::desc("b")])
            .unwrap()
            .collect()
            .unwrap();
        let ids: Vec<Value> = sorted
            .iter()
            .map(|d| d.as_object().unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, values(json!([1, 3, 0, 2])));
    }

    #[test]
    fn test_order_by_missing_field() {
        let err = Stream::from_values(values(json!([{"a": 1}, {"b": 2}])))
            .order_by(&[OrderKey::asc("a")])
            .unwrap_err();
        assert!(err.to_string().contains("missing attribute"));
    }

    #[test]
    fn test_grouped_map_reduce_sorts_groups() {
        let result = numbers(0..10)
            .grouped_map_reduce(
                |v| Ok(Value::from(v.as_integer().unwrap_or(0) % 3)),
                Ok,
                Value::from(0),
                |acc, v| Ok(Value::from(acc.as_number().unwrap_or(0.0) + v.as_number().unwrap_or(0.0))),
            )
            .unwrap();
        assert_eq!(
            result,
            Value::from(json!([
                {"group": 0, "reduction": 18},
                {"group": 1, "reduction": 12},
                {"group": 2, "reduction": 15},
            ]))
        );
    }

    #[test]
    fn test_selection_survives_row_preserving_transforms() {
        let selection = Selection {
            table: "t".into(),
            primary_key: "id".into(),
        };
        let stream = Stream::from_table(values(json!([{"id": 0}])), selection.clone());
        let kept = stream.filter_with(|_| Ok(true)).limit(1).skip(0);
        assert_eq!(kept.selection(), Some(&selection));
        assert_eq!(kept.map_with(Ok).selection(), None);
    }
}
