#![allow(dead_code)]

use reql_eval::query::table;
use reql_eval::{Evaluator, MemoryStore, QueryResult, ScriptEngine, Term, Value};
use serde_json::json;

/// A store and a script engine to run queries against.
pub struct Harness {
    pub store: MemoryStore,
    pub scripts: ScriptEngine,
}

impl Harness {
    pub fn new() -> Self {
        Harness {
            store: MemoryStore::default(),
            scripts: ScriptEngine::new(),
        }
    }

    /// A harness whose table `tbl` holds `{"id": n}` for n in 0..count.
    pub fn with_ids(count: usize) -> Self {
        let harness = Harness::new();
        let rows: Vec<serde_json::Value> = (0..count).map(|id| json!({ "id": id })).collect();
        harness.ok(&table("tbl").insert(serde_json::Value::from(rows)));
        harness
    }

    pub fn run(&self, term: &Term) -> QueryResult<Value> {
        Evaluator::new(&self.store, &self.scripts).run(term)
    }

    pub fn ok(&self, term: &Term) -> Value {
        match self.run(term) {
            Ok(value) => value,
            Err(e) => panic!("{} failed: {} at {}", term, e, e.location()),
        }
    }

    /// Run expecting an execution error whose message contains `keyword`.
    pub fn exec_err(&self, term: &Term, keyword: &str) {
        match self.run(term) {
            Err(e) if e.is_execution() => assert!(
                e.to_string().contains(keyword),
                "`{}` does not mention `{}`",
                e,
                keyword
            ),
            other => panic!("{}: expected an execution error, got {:?}", term, other),
        }
    }

    /// Run expecting a construction error whose message contains `keyword`.
    pub fn construction_err(&self, term: &Term, keyword: &str) {
        match self.run(term) {
            Err(e) if e.is_construction() => assert!(
                e.to_string().contains(keyword),
                "`{}` does not mention `{}`",
                e,
                keyword
            ),
            other => panic!("{}: expected a construction error, got {:?}", term, other),
        }
    }

    /// Integer field `field` of a response document.
    pub fn count(&self, term: &Term, field: &str) -> i64 {
        let response = self.ok(term);
        response
            .as_object()
            .and_then(|fields| fields.get(field))
            .and_then(Value::as_integer)
            .unwrap_or_else(|| panic!("{} has no count `{}`", response, field))
    }
}

pub fn doc(json: serde_json::Value) -> Value {
    Value::from(json)
}

pub fn run(term: &Term) -> QueryResult<Value> {
    Harness::new().run(term)
}

pub fn ok(term: &Term) -> Value {
    Harness::new().ok(term)
}

pub fn exec_err(term: &Term, keyword: &str) {
    Harness::new().exec_err(term, keyword)
}
