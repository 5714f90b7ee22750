//! # Script Bridge
//!
//! `js(...)` terms hand a snippet of JavaScript to a [`ScriptBridge`] and map its
//! result back into a [`Value`]. The evaluator only knows the contract defined
//! here; [`ScriptEngine`] is the bundled implementation, a small interpreter for
//! the subset of JavaScript that embedded snippets use.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Token types
//! - **[lexer]** - Source text to tokens
//! - **[syntax]** - Expression and statement trees
//! - **[parser]** - Recursive-descent parser
//! - **[interpreter]** - Reference-typed script values and execution
//!
//! ## Quick Start
//!
//! ```
//! use reql_eval::script::{ScriptBridge, ScriptContext, ScriptEngine, ScriptSource};
//! use reql_eval::Value;
//!
//! let engine = ScriptEngine::new();
//! let mut ctx = ScriptContext::default();
//! ctx.bind("x", Value::from(2));
//!
//! let four = engine
//!     .evaluate(&ScriptSource::Expression("x + 2".into()), &ctx)
//!     .unwrap();
//! assert_eq!(four, Value::from(4));
//! ```
//!
//! ## Failure modes
//!
//! A result of `undefined` and a result whose object graph contains a cycle have
//! no [`Value`] spelling; both are reported as [`BridgeError`]s, as are syntax
//! errors and runtime errors such as references to unknown names.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use crate::{error::EvalError, value::Value};

pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod syntax;
pub mod tokens;

pub use interpreter::ScriptEngine;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// A single expression; its value is the result (`js("2 + 2")`)
    Expression(String),
    /// A function body; the result is what it returns (`js_body("return 0;")`)
    Body(String),
}

impl ScriptSource {
    pub fn text(&self) -> &str {
        match self {
            ScriptSource::Expression(src) | ScriptSource::Body(src) => src,
        }
    }
}

impl fmt::Display for ScriptSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptSource::Expression(src) => write!(f, "js({:?})", src),
            ScriptSource::Body(src) => write!(f, "js_body({:?})", src),
        }
    }
}

/// Inputs visible to a script.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    /// Variables in scope at the `js` term; innermost binding wins
    pub bindings: HashMap<String, Value>,
    /// Value of `this`: the implicit row, or an empty object
    pub receiver: Value,
    /// Deepest nesting accepted when converting the result back
    pub max_depth: usize,
}

impl Default for ScriptContext {
    fn default() -> Self {
        ScriptContext {
            bindings: HashMap::new(),
            receiver: Value::Object(HashMap::new()),
            max_depth: 1024,
        }
    }
}

impl ScriptContext {
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("script result is undefined")]
    Undefined,

    #[error("script result is a cyclic datastructure")]
    Cyclic,

    #[error("script result is nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("{0}")]
    Runtime(String),

    #[error("SyntaxError: {0}")]
    Syntax(String),
}

impl From<BridgeError> for EvalError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::Undefined => EvalError::ScriptUndefined,
            BridgeError::Cyclic => EvalError::ScriptCyclic,
            other => EvalError::Script(other.to_string()),
        }
    }
}

/// Pluggable evaluator for embedded scripts.
///
/// Implementations must be safe to share between threads; the evaluator holds
/// a shared reference for the duration of a query.
pub trait ScriptBridge: Send + Sync {
    fn evaluate(&self, source: &ScriptSource, ctx: &ScriptContext) -> Result<Value, BridgeError>;
}
