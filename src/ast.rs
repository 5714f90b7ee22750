//! # Query Expression Tree
//!
//! This module defines the tree a query is made of. Queries are not parsed from
//! text; they are assembled with the builder functions in [`crate::query`], the
//! way a driver assembles them, and then handed to the evaluator.
//!
//! ## Architecture Overview
//!
//! - **[term]** - The [`Term`] node type and its operand walk
//! - **[operators]** - Binary and unary operators
//! - **[ordering]** - `order_by` keys
//!
//! ## Quick Start
//!
//! ```
//! use reql_eval::query::{expr, func2};
//!
//! // [1, 2, 3].array_to_stream().reduce(0, (a, b) => a + b)
//! let sum = expr(vec![1, 2, 3])
//!     .array_to_stream()
//!     .reduce(0, func2(|a, b| a + b));
//! assert!(sum.to_string().contains("reduce"));
//! ```
//!
//! ## Core Concepts
//!
//! ### Values, streams and functions
//!
//! A term evaluates to a datum (a [`crate::Value`]), a lazy stream, a single-row
//! selection from a table, or a function. Streams stay lazy until something
//! materializes them: `stream_to_array`, `reduce`, `count`, ordering, a mutation,
//! or the end of `run`.
//!
//! ### Operand positions
//!
//! [`Term::children`] lists operands in a fixed order. Error locations name a
//! path of those positions from the root down to the failing term.
//!
//! ### Implicit row
//!
//! Positions that take a function (`map`, `filter`, `concat_map`, `update`,
//! `replace`, grouping) also accept a plain term. It is evaluated once per
//! element with the element bound to [`Term::ImplicitVar`] (`row()`), and
//! embedded scripts see it as `this`.
pub mod operators;
pub mod ordering;
pub mod term;

pub use operators::{BinOp, UnaryOp};
pub use ordering::OrderKey;
pub use term::Term;
