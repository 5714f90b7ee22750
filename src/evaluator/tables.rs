//! Table reads, inserts and deletes.

use tracing::debug;

use super::{Evaluator, SingleRow, sequence::rows_of};
use crate::{
    ast::Term,
    error::{EvalError, Expected, QueryError, QueryResult, ResultExt},
    evaluator::{Env, Evaluated},
    stream::{Selection, Stream},
    table::primary_key_of,
    value::Value,
};

impl<'s> Evaluator<'s> {
    fn selection_of(&self, table: &str) -> QueryResult<Selection> {
        Ok(Selection {
            table: table.to_string(),
            primary_key: self.store.primary_key(table)?,
        })
    }

    /// Operand that must be written as `table(...)`.
    fn table_name<'a>(&'a self, term: &'a Term, env: &Env) -> QueryResult<&'a str> {
        match term {
            Term::Table(name) => Ok(name),
            other => {
                let found = self.eval(other, env)?.kind_name();
                Err(EvalError::TypeMismatch {
                    expected: Expected::Table,
                    found,
                }
                .into())
            }
        }
    }

    pub(super) fn eval_table(&self, name: &str) -> QueryResult<Stream<'_>> {
        let selection = self.selection_of(name)?;
        let rows = self.store.scan(name)?;
        debug!(table = name, rows = rows.len(), "scanned table");
        Ok(Stream::from_table(rows, selection))
    }

    pub(super) fn eval_get<'a>(
        &'a self,
        table: &'a Term,
        key: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let name = self.table_name(table, env).at(0)?;
        let key = self.datum(key, env).at(1)?;
        let selection = self.selection_of(name).at(0)?;
        let row = self.store.get(name, &key)?;
        Ok(Evaluated::Row(SingleRow {
            selection,
            key,
            row,
        }))
    }

    pub(super) fn eval_between<'a>(
        &'a self,
        sequence: &'a Term,
        lower: &'a Term,
        upper: &'a Term,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let lower_key = self.datum(lower, env).at(1)?;
        let upper_key = self.datum(upper, env).at(2)?;

        if let Term::Table(name) = sequence {
            let selection = self.selection_of(name).at(0)?;
            let rows = self.store.between(name, &lower_key, &upper_key)?;
            return Ok(Evaluated::Stream(Stream::from_table(rows, selection)));
        }

        let evaluated = self.eval(sequence, env).at(0)?;
        let selection = match &evaluated {
            Evaluated::Stream(stream) => stream.selection().cloned(),
            _ => None,
        };
        match (evaluated, selection) {
            (Evaluated::Stream(stream), Some(selection)) => {
                let in_range = stream.filter_with(move |row| {
                    let key = primary_key_of(row, &selection.primary_key)?;
                    Ok(key >= lower_key && key <= upper_key)
                });
                Ok(Evaluated::Stream(in_range))
            }
            (other, _) => Err(QueryError::from(EvalError::TypeMismatch {
                expected: Expected::Selection,
                found: other.kind_name(),
            }))
            .at(0),
        }
    }

    pub(super) fn eval_insert(&self, table: &Term, rows: &Term, env: &Env) -> QueryResult<Value> {
        let name = self.table_name(table, env).at(0)?;
        let rows = self.eval(rows, env).and_then(rows_of).at(1)?;
        let summary = self.store.insert(name, rows)?;
        debug!(
            table = name,
            inserted = summary.inserted,
            errors = summary.errors,
            "inserted rows"
        );
        Ok(summary.to_value())
    }

    pub(super) fn eval_delete(&self, selection: &Term, env: &Env) -> QueryResult<Value> {
        let deleted = match self.eval(selection, env).at(0)? {
            Evaluated::Stream(stream) => {
                let Some(target) = stream.selection().cloned() else {
                    return Err(QueryError::from(EvalError::TypeMismatch {
                        expected: Expected::Selection,
                        found: "stream",
                    }))
                    .at(0);
                };
                let rows = stream.collect().at(0)?;
                let mut deleted = 0;
                for row in &rows {
                    let key = primary_key_of(row, &target.primary_key)?;
                    if self.store.delete_row(&target.table, &key)? {
                        deleted += 1;
                    }
                }
                debug!(table = %target.table, deleted, "deleted rows");
                deleted
            }
            Evaluated::Row(single) => {
                let removed = single.row.is_some()
                    && self.store.delete_row(&single.selection.table, &single.key)?;
                usize::from(removed)
            }
            other => {
                return Err(QueryError::from(EvalError::TypeMismatch {
                    expected: Expected::Selection,
                    found: other.kind_name(),
                }))
                .at(0);
            }
        };
        Ok(Value::object([("deleted", Value::from(deleted))]))
    }
}
