//! # reql-eval
//!
//! An evaluation engine for document queries in the style of ReQL: queries are
//! trees of [`Term`]s built with the functions in [`query`], evaluated against
//! a [`TableStore`] by an [`Evaluator`].
//!
//! ## Architecture Overview
//!
//! - **[value]** - Datum model and the cross-kind total order
//! - **[ast]** / **[query]** - The expression tree and its builder surface
//! - **[checker]** / **[determinism]** - Static checks run before evaluation
//! - **[evaluator]** - Term evaluation, operators and table mutations
//! - **[stream]** - Lazy sequences with table provenance
//! - **[table]** - Storage seam and the in-memory store
//! - **[script]** - Embedded script bridge and its bundled interpreter
//! - **[config]** / **[output]** - Engine settings and JSON rendering
//!
//! ## Quick Start
//!
//! ```
//! use reql_eval::query::{expr, func1, table};
//! use reql_eval::{Evaluator, MemoryStore, ScriptEngine, Value};
//! use serde_json::json;
//!
//! let store = MemoryStore::default();
//! let scripts = ScriptEngine::new();
//! let evaluator = Evaluator::new(&store, &scripts);
//!
//! evaluator
//!     .run(&table("users").insert(json!([
//!         {"id": 1, "name": "ada", "age": 36},
//!         {"id": 2, "name": "bob", "age": 17},
//!     ])))
//!     .unwrap();
//!
//! let adults = table("users")
//!     .filter(func1(|u| u.get_field("age").ge(18)))
//!     .map(func1(|u| u.get_field("name")));
//! assert_eq!(evaluator.run(&adults).unwrap(), Value::from(json!(["ada"])));
//! ```
//!
//! ## Errors
//!
//! [`Evaluator::run`] returns a [`QueryError`]: a construction error when the
//! query is rejected before it runs, or an execution error raised while it
//! runs. Both carry a [`error::Location`] naming the failing sub-expression.

pub mod ast;
pub mod checker;
pub mod config;
pub mod determinism;
pub mod error;
pub mod evaluator;
pub mod output;
pub mod query;
pub mod script;
pub mod stream;
pub mod table;
pub mod value;

pub use ast::{BinOp, OrderKey, Term, UnaryOp};
pub use config::{ConfigError, EngineConfig};
pub use error::{ConstructionError, EvalError, QueryError, QueryResult};
pub use evaluator::{Env, Evaluated, Evaluator};
pub use output::{to_json, to_json_pretty};
pub use script::{BridgeError, ScriptBridge, ScriptContext, ScriptEngine, ScriptSource};
pub use stream::{Selection, Stream};
pub use table::{MemoryStore, TableError, TableStore};
pub use value::Value;
