//! # Query Evaluator
//!
//! Walks a [`Term`] top-down against a lexical [`Env`], producing an
//! [`Evaluated`] result: a datum, a lazy stream, a single-row selection or a
//! function. [`Evaluator::run`] is the entry point; it checks scopes, evaluates
//! and materializes whatever comes out into a [`Value`].
//!
//! Operators live in the submodules, grouped by the kind of operand they work
//! on; this file holds the dispatch and the conversions every operator shares.

use std::collections::HashMap;

use tracing::debug;

use crate::{
    ast::Term,
    checker::check_scopes,
    config::EngineConfig,
    determinism::check_single_row_mutations,
    error::{ConstructionError, EvalError, Expected, QueryError, QueryResult, ResultExt},
    script::ScriptBridge,
    stream::{Selection, Stream},
    table::TableStore,
    value::Value,
};

mod access;
mod arith;
pub mod env;
mod js;
mod mutation;
mod objects;
mod sequence;
mod tables;

pub use env::Env;

/// A single row addressed by primary key, as produced by `get`.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleRow {
    pub selection: Selection,
    pub key: Value,
    /// `None` when no row has that key
    pub row: Option<Value>,
}

/// A function value: parameters, body and the environment it closed over.
///
/// A plain term written where a function is expected becomes an implicit
/// closure; calling it binds its first argument to the implicit row instead of
/// to a parameter.
#[derive(Debug, Clone)]
pub struct Closure<'a> {
    params: &'a [String],
    body: &'a Term,
    env: Env,
    implicit: bool,
}

/// Result of evaluating a term.
#[derive(Debug)]
pub enum Evaluated<'a> {
    Datum(Value),
    Stream(Stream<'a>),
    Row(SingleRow),
    Function(Closure<'a>),
}

impl Evaluated<'_> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Evaluated::Datum(v) => v.kind_name(),
            Evaluated::Stream(_) => "stream",
            Evaluated::Row(_) => "single row selection",
            Evaluated::Function(_) => "function",
        }
    }
}

/// A sequence operand. Arrays stay arrays through transforms; streams stay lazy.
enum Seq<'a> {
    Array(Vec<Value>),
    Stream(Stream<'a>),
}

impl<'a> Seq<'a> {
    fn is_array(&self) -> bool {
        matches!(self, Seq::Array(_))
    }

    fn into_stream(self) -> Stream<'a> {
        match self {
            Seq::Array(items) => Stream::from_values(items),
            Seq::Stream(stream) => stream,
        }
    }
}

/// Re-materialize a transformed sequence if it started out as an array.
fn finish(was_array: bool, stream: Stream<'_>) -> QueryResult<Evaluated<'_>> {
    if was_array {
        Ok(Evaluated::Datum(Value::Array(stream.collect()?)))
    } else {
        Ok(Evaluated::Stream(stream))
    }
}

pub(crate) fn type_error(expected: Expected, found: &Value) -> QueryError {
    EvalError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
    .into()
}

pub(crate) fn expect_bool(value: Value) -> QueryResult<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(type_error(Expected::Bool, &other)),
    }
}

pub(crate) fn expect_array(value: Value) -> QueryResult<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(type_error(Expected::Array, &other)),
    }
}

pub(crate) fn expect_object(value: Value) -> QueryResult<HashMap<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(type_error(Expected::Object, &other)),
    }
}

/// Index-like operands: any value that is not a whole number is an "integer" error.
pub(crate) fn expect_integer(value: Value) -> QueryResult<i64> {
    value
        .as_integer()
        .ok_or_else(|| EvalError::NotInteger(value.to_string()).into())
}

pub(crate) fn expect_nonnegative(what: &'static str, value: Value) -> QueryResult<usize> {
    let n = expect_integer(value)?;
    usize::try_from(n).map_err(|_| EvalError::Negative { what, value: n }.into())
}

/// Evaluates queries against a table store and a script bridge.
pub struct Evaluator<'s> {
    store: &'s dyn TableStore,
    bridge: &'s dyn ScriptBridge,
    config: EngineConfig,
}

impl<'s> Evaluator<'s> {
    pub fn new(store: &'s dyn TableStore, bridge: &'s dyn ScriptBridge) -> Self {
        Self::with_config(store, bridge, EngineConfig::default())
    }

    pub fn with_config(
        store: &'s dyn TableStore,
        bridge: &'s dyn ScriptBridge,
        config: EngineConfig,
    ) -> Self {
        Evaluator {
            store,
            bridge,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate `term` and return its value.
    ///
    /// Scope errors and unacknowledged non-deterministic single-row mutations
    /// are reported as construction errors before anything runs. A stream
    /// result is materialized into an array; a single-row selection yields its
    /// row, or null when the key is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use reql_eval::{Evaluator, MemoryStore, ScriptEngine, Value};
    /// use reql_eval::query::{expr, let_, letvar};
    ///
    /// let store = MemoryStore::default();
    /// let scripts = ScriptEngine::new();
    /// let evaluator = Evaluator::new(&store, &scripts);
    ///
    /// let q = let_([("x", 3)], letvar("x") * 2);
    /// assert_eq!(evaluator.run(&q).unwrap(), Value::from(6));
    /// ```
    pub fn run(&self, term: &Term) -> QueryResult<Value> {
        debug!(query = %term, "running query");
        check_scopes(term)?;
        check_single_row_mutations(term)?;

        let result = self
            .eval(term, &Env::new())
            .and_then(|evaluated| self.into_datum(evaluated));
        match &result {
            Ok(value) => debug!(kind = value.kind_name(), "query finished"),
            Err(e) => debug!(error = %e, location = %e.location(), "query failed"),
        }
        result
    }

    /// Convert any result to a datum: streams are drained, rows unwrapped.
    pub(crate) fn into_datum(&self, evaluated: Evaluated<'_>) -> QueryResult<Value> {
        match evaluated {
            Evaluated::Datum(value) => Ok(value),
            Evaluated::Stream(stream) => Ok(Value::Array(stream.collect()?)),
            Evaluated::Row(single) => Ok(single.row.unwrap_or(Value::Null)),
            Evaluated::Function(_) => Err(EvalError::TypeMismatch {
                expected: Expected::Datum,
                found: "function",
            }
            .into()),
        }
    }

    pub(crate) fn datum<'a>(&'a self, term: &'a Term, env: &Env) -> QueryResult<Value> {
        let evaluated = self.eval(term, env)?;
        self.into_datum(evaluated)
    }

    fn sequence<'a>(&'a self, term: &'a Term, env: &Env) -> QueryResult<Seq<'a>> {
        match self.eval(term, env)? {
            Evaluated::Datum(Value::Array(items)) => Ok(Seq::Array(items)),
            Evaluated::Stream(stream) => Ok(Seq::Stream(stream)),
            other => Err(EvalError::TypeMismatch {
                expected: Expected::Sequence,
                found: other.kind_name(),
            }
            .into()),
        }
    }

    /// Evaluate a function position.
    pub(crate) fn function<'a>(&'a self, term: &'a Term, env: &Env) -> Closure<'a> {
        match term {
            Term::Func { params, body } => Closure {
                params,
                body,
                env: env.clone(),
                implicit: false,
            },
            other => Closure {
                params: &[],
                body: other,
                env: env.clone(),
                implicit: true,
            },
        }
    }

    pub(crate) fn call<'a>(
        &'a self,
        closure: &Closure<'a>,
        args: Vec<Value>,
    ) -> QueryResult<Evaluated<'a>> {
        let env = if closure.implicit {
            let row = args.into_iter().next().unwrap_or(Value::Null);
            closure.env.with_implicit(row)
        } else {
            if closure.params.len() != args.len() {
                return Err(EvalError::Arity {
                    expected: closure.params.len(),
                    found: args.len(),
                }
                .into());
            }
            let mut env = closure.env.clone();
            for (name, value) in closure.params.iter().zip(args) {
                env.bind(name.as_str(), value);
            }
            env
        };
        self.eval(closure.body, &env)
    }

    pub(crate) fn call_datum<'a>(
        &'a self,
        closure: &Closure<'a>,
        args: Vec<Value>,
    ) -> QueryResult<Value> {
        let evaluated = self.call(closure, args)?;
        self.into_datum(evaluated)
    }

    pub(crate) fn eval<'a>(&'a self, term: &'a Term, env: &Env) -> QueryResult<Evaluated<'a>> {
        let datum = |value| Ok(Evaluated::Datum(value));
        match term {
            // Literals and references
            Term::Datum(value) => datum(value.clone()),
            Term::MakeArray(items) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    out.push(self.datum(item, env).at(i)?);
                }
                datum(Value::Array(out))
            }
            Term::MakeObject(pairs) => {
                let mut out = HashMap::with_capacity(pairs.len());
                for (key, value) in pairs {
                    out.insert(key.clone(), self.datum(value, env).at_key(key)?);
                }
                datum(Value::Object(out))
            }
            Term::Var(name) => match env.lookup(name) {
                Some(value) => datum(value.clone()),
                None => Err(ConstructionError::Unbound(name.clone()).into()),
            },
            Term::ImplicitVar => match env.implicit() {
                Some(row) => datum(row.clone()),
                None => Err(ConstructionError::ImplicitUnbound.into()),
            },

            // Binding forms
            Term::Func { .. } => Ok(Evaluated::Function(self.function(term, env))),
            Term::Let { bindings, body } => {
                let mut scope = env.clone();
                for (name, value) in bindings {
                    let value = self.datum(value, &scope).at_key(name)?;
                    scope.bind(name.as_str(), value);
                }
                self.eval(body, &scope).at(bindings.len())
            }
            Term::Branch {
                test,
                then,
                otherwise,
            } => {
                if self.datum(test, env).and_then(expect_bool).at(0)? {
                    self.eval(then, env).at(1)
                } else {
                    self.eval(otherwise, env).at(2)
                }
            }
            Term::Js(source) => self.eval_js(source, env).map(Evaluated::Datum),

            // Operators
            Term::Unary { op, operand } => self.eval_unary(*op, operand, env).map(Evaluated::Datum),
            Term::Binary { op, left, right } => {
                self.eval_binary(*op, left, right, env).map(Evaluated::Datum)
            }

            // Objects
            Term::GetAttr { object, attr } => self.eval_get_attr(object, attr, env).map(Evaluated::Datum),
            Term::Contains { object, attr } => {
                self.eval_contains(object, attr, env).map(Evaluated::Datum)
            }
            Term::Merge { left, right } => self.eval_merge(left, right, env).map(Evaluated::Datum),
            Term::Pick { object, keys } => {
                self.eval_pick(object, keys, true, env).map(Evaluated::Datum)
            }
            Term::Unpick { object, keys } => {
                self.eval_pick(object, keys, false, env).map(Evaluated::Datum)
            }
            Term::Pluck { sequence, keys } => self.eval_pluck(sequence, keys, true, env),
            Term::Without { sequence, keys } => self.eval_pluck(sequence, keys, false, env),

            // Arrays and sequences
            Term::Append { array, item } => self.eval_append(array, item, env).map(Evaluated::Datum),
            Term::Nth { sequence, index } => self.eval_nth(sequence, index, env).map(Evaluated::Datum),
            Term::Slice {
                sequence,
                start,
                end,
            } => self.eval_slice(sequence, start, end, env),
            Term::Count(sequence) => self.eval_count(sequence, env).map(Evaluated::Datum),
            Term::Union { left, right } => self.eval_union(left, right, env),
            Term::ArrayToStream(array) => self.eval_array_to_stream(array, env),
            Term::StreamToArray(sequence) => {
                let items = self.sequence(sequence, env).at(0)?.into_stream().collect().at(0)?;
                datum(Value::Array(items))
            }
            Term::Limit { sequence, count } => self.eval_limit(sequence, count, false, env),
            Term::Skip { sequence, count } => self.eval_limit(sequence, count, true, env),
            Term::Distinct(sequence) => {
                let seq = self.sequence(sequence, env).at(0)?;
                let was_array = seq.is_array();
                finish(was_array, seq.into_stream().distinct())
            }
            Term::Map { sequence, func } => self.eval_map(sequence, func, env),
            Term::Filter {
                sequence,
                predicate,
            } => self.eval_filter(sequence, predicate, env),
            Term::ConcatMap { sequence, func } => self.eval_concat_map(sequence, func, env),
            Term::Reduce {
                sequence,
                base,
                func,
            } => self.eval_reduce(sequence, base, func, env).map(Evaluated::Datum),
            Term::GroupedMapReduce {
                sequence,
                group,
                mapping,
                base,
                reduction,
            } => self
                .eval_grouped_map_reduce(sequence, group, mapping, base, reduction, env)
                .map(Evaluated::Datum),
            Term::OrderBy { sequence, keys } => {
                let seq = self.sequence(sequence, env).at(0)?;
                let was_array = seq.is_array();
                let sorted = seq.into_stream().order_by(keys).at(0)?;
                finish(was_array, sorted)
            }

            // Tables
            Term::Table(name) => self.eval_table(name).map(Evaluated::Stream),
            Term::Get { table, key } => self.eval_get(table, key, env),
            Term::Between {
                sequence,
                lower,
                upper,
            } => self.eval_between(sequence, lower, upper, env),
            Term::Insert { table, rows } => self.eval_insert(table, rows, env).map(Evaluated::Datum),
            Term::Delete(selection) => self.eval_delete(selection, env).map(Evaluated::Datum),
            Term::Update {
                selection,
                func,
                non_atomic,
            } => self
                .eval_update(selection, func, *non_atomic, env)
                .map(Evaluated::Datum),
            Term::Replace {
                selection,
                func,
                non_atomic,
            } => self
                .eval_replace(selection, func, *non_atomic, env)
                .map(Evaluated::Datum),
        }
    }
}
