//! Error taxonomy for query evaluation.
//!
//! Callers see a single [`QueryError`] with two categories:
//!
//! - **Construction** errors are found by inspecting the query before anything
//!   runs (an unbound variable, a non-deterministic single-row mutation).
//! - **Execution** errors are raised while evaluating (type mismatches,
//!   out-of-range access, missing attributes, script failures).
//!
//! Every message contains a stable keyword (`number`, `bool`, `array`,
//! `object`, `integer`, `bounds`, `missing`, `deterministic`, `undefined`,
//! `cyclic`, `nonnegative`, `greater`, `not in scope`) that callers may match on.
//! Both categories carry a [`Location`] naming the offending sub-expression.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::table::TableError;

/// What a typed operand position accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    Number,
    Bool,
    String,
    Array,
    Object,
    Function,
    /// An array or a stream
    Sequence,
    /// Rows selected from a table
    Selection,
    /// Anything but a stream or a function
    Datum,
    /// A table reference
    Table,
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Expected::Number => "number",
            Expected::Bool => "bool",
            Expected::String => "string",
            Expected::Array => "array",
            Expected::Object => "object",
            Expected::Function => "function",
            Expected::Sequence => "array or stream",
            Expected::Selection => "table selection",
            Expected::Datum => "datum",
            Expected::Table => "table",
        };
        f.write_str(name)
    }
}

/// Failures raised while evaluating a query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("Expected type {expected} but found {found}")]
    TypeMismatch {
        expected: Expected,
        found: &'static str,
    },

    #[error("Can only {op} numbers, but found {found}")]
    Arithmetic { op: &'static str, found: &'static str },

    #[error("Expected an integer but found {0}")]
    NotInteger(String),

    #[error("{what} must be nonnegative, got {value}")]
    Negative { what: &'static str, value: i64 },

    #[error("Index {index} is out of bounds for a sequence of {len} elements")]
    OutOfBounds { index: i64, len: usize },

    #[error("Slice start {start} is greater than slice end {end}")]
    RangeOrder { start: i64, end: i64 },

    #[error("Object is missing attribute `{0}`")]
    MissingAttribute(String),

    #[error("Function expects {expected} arguments but was called with {found}")]
    Arity { expected: usize, found: usize },

    #[error("Script returned undefined")]
    ScriptUndefined,

    #[error("Script returned a cyclic datastructure")]
    ScriptCyclic,

    #[error("Script error: {0}")]
    Script(String),

    #[error("Script evaluation is disabled by configuration")]
    ScriptingDisabled,

    #[error(transparent)]
    Table(#[from] TableError),
}

/// Failures detected before evaluation starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("Variable `{0}` is not in scope")]
    Unbound(String),

    #[error("Implicit row variable is not in scope outside a function position")]
    ImplicitUnbound,

    #[error(
        "Could not prove the {op} transformation deterministic; pass non_atomic to apply it row by row"
    )]
    NotDeterministic { op: &'static str },
}

/// One step from a term down to one of its operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Positional operand
    Arg(usize),
    /// Named operand: an object literal entry or a `let` binding
    Key(String),
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Arg(n) => write!(f, "arg {}", n),
            Frame::Key(k) => write!(f, "key `{}`", k),
        }
    }
}

/// Path from the query root to the sub-expression that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    frames: VecDeque<Frame>,
}

impl Location {
    /// Frames ordered from the query root downwards.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    pub fn is_root(&self) -> bool {
        self.frames.is_empty()
    }

    fn enter(&mut self, frame: Frame) {
        self.frames.push_front(frame);
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.frames.is_empty() {
            return f.write_str("<root>");
        }
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{}", frame)?;
        }
        Ok(())
    }
}

/// Error returned by [`crate::Evaluator::run`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("Query construction error: {source}")]
    Construction {
        source: ConstructionError,
        location: Location,
    },

    #[error("Execution error: {source}")]
    Execution { source: EvalError, location: Location },
}

impl QueryError {
    /// Which sub-expression failed.
    pub fn location(&self) -> &Location {
        match self {
            QueryError::Construction { location, .. } | QueryError::Execution { location, .. } => {
                location
            }
        }
    }

    pub fn is_construction(&self) -> bool {
        matches!(self, QueryError::Construction { .. })
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, QueryError::Execution { .. })
    }

    /// Record that this error surfaced through `frame` of an enclosing term.
    pub(crate) fn within(mut self, frame: Frame) -> Self {
        match &mut self {
            QueryError::Construction { location, .. } | QueryError::Execution { location, .. } => {
                location.enter(frame)
            }
        }
        self
    }
}

impl From<EvalError> for QueryError {
    fn from(source: EvalError) -> Self {
        QueryError::Execution {
            source,
            location: Location::default(),
        }
    }
}

impl From<ConstructionError> for QueryError {
    fn from(source: ConstructionError) -> Self {
        QueryError::Construction {
            source,
            location: Location::default(),
        }
    }
}

impl From<TableError> for QueryError {
    fn from(e: TableError) -> Self {
        EvalError::Table(e).into()
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

/// Attach location frames while an error propagates outwards.
pub(crate) trait ResultExt<T> {
    fn at(self, arg: usize) -> QueryResult<T>;
    fn at_key(self, key: &str) -> QueryResult<T>;
}

impl<T> ResultExt<T> for QueryResult<T> {
    fn at(self, arg: usize) -> QueryResult<T> {
        self.map_err(|e| e.within(Frame::Arg(arg)))
    }

    fn at_key(self, key: &str) -> QueryResult<T> {
        self.map_err(|e| e.within(Frame::Key(key.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_is_root_first() {
        let err: QueryResult<()> = Err(EvalError::MissingAttribute("c".into()).into());
        let err = err.at(1).at_key("a").at(0).unwrap_err();
        let frames: Vec<_> = err.location().frames().cloned().collect();
        assert_eq!(
            frames,
            vec![Frame::Arg(0), Frame::Key("a".into()), Frame::Arg(1)]
        );
        assert_eq!(err.location().to_string(), "arg 0 > key `a` > arg 1");
    }

    #[test]
    fn test_messages_carry_keywords() {
        let cases: Vec<(QueryError, &str)> = vec![
            (
                EvalError::Arithmetic { op: "add", found: "string" }.into(),
                "numbers",
            ),
            (EvalError::NotInteger("0.5".into()).into(), "integer"),
            (
                EvalError::Negative { what: "Limit", value: -1 }.into(),
                "nonnegative",
            ),
            (EvalError::OutOfBounds { index: 1, len: 1 }.into(), "bounds"),
            (EvalError::RangeOrder { start: 5, end: 3 }.into(), "greater"),
            (EvalError::MissingAttribute("c".into()).into(), "missing attribute"),
            (EvalError::ScriptCyclic.into(), "cyclic datastructure"),
            (ConstructionError::Unbound("x".into()).into(), "not in scope"),
            (
                ConstructionError::NotDeterministic { op: "update" }.into(),
                "deterministic",
            ),
        ];
        for (err, keyword) in cases {
            assert!(err.to_string().contains(keyword), "{} lacks {}", err, keyword);
        }
    }

    #[test]
    fn test_categories() {
        let construction: QueryError = ConstructionError::Unbound("x".into()).into();
        assert!(construction.is_construction());
        assert!(construction.location().is_root());
        let execution: QueryError = EvalError::ScriptUndefined.into();
        assert!(execution.is_execution());
    }
}
