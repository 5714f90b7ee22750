//! Builder surface for query terms.
//!
//! Mirrors how a driver spells queries: start from [`expr`], [`table`] or a
//! free function, chain methods, and use the ordinary Rust operators for
//! arithmetic, comparison-free logic and negation.
//!
//! ```
//! use reql_eval::query::{expr, func1, table};
//! use serde_json::json;
//!
//! let total = (expr(3) + 4) * -expr(6);
//! let names = table("users").order_by(["id"]).map(func1(|u| u.get_field("name")));
//! let merged = expr(json!({"a": 5})).merge(json!({"a": 3}));
//! # let _ = (total, names, merged);
//! ```

use std::ops;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    ast::{BinOp, OrderKey, Term, UnaryOp},
    script::ScriptSource,
    value::Value,
};

/// Wrap anything convertible into a term.
pub fn expr<T: Into<Term>>(value: T) -> Term {
    value.into()
}

/// The implicit row of a function position.
pub fn row() -> Term {
    Term::ImplicitVar
}

/// Reference a variable bound by [`let_`] or a function parameter.
pub fn letvar(name: impl Into<String>) -> Term {
    Term::Var(name.into())
}

/// Bind names in order, then evaluate `body`; later bindings see earlier ones.
pub fn let_<I, K, V>(bindings: I, body: impl Into<Term>) -> Term
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Term>,
{
    Term::Let {
        bindings: bindings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect(),
        body: Box::new(body.into()),
    }
}

pub fn branch(test: impl Into<Term>, then: impl Into<Term>, otherwise: impl Into<Term>) -> Term {
    Term::Branch {
        test: Box::new(test.into()),
        then: Box::new(then.into()),
        otherwise: Box::new(otherwise.into()),
    }
}

/// Evaluate a script expression, e.g. `js("2 + 2")`.
pub fn js(source: impl Into<String>) -> Term {
    Term::Js(ScriptSource::Expression(source.into()))
}

/// Evaluate a script function body, e.g. `js_body("return 0;")`.
pub fn js_body(source: impl Into<String>) -> Term {
    Term::Js(ScriptSource::Body(source.into()))
}

pub fn union(left: impl Into<Term>, right: impl Into<Term>) -> Term {
    Term::Union {
        left: Box::new(left.into()),
        right: Box::new(right.into()),
    }
}

pub fn table(name: impl Into<String>) -> Term {
    Term::Table(name.into())
}

pub fn asc(field: impl Into<String>) -> OrderKey {
    OrderKey::asc(field)
}

pub fn desc(field: impl Into<String>) -> OrderKey {
    OrderKey::desc(field)
}

static NEXT_VAR: AtomicUsize = AtomicUsize::new(0);

fn fresh_var() -> String {
    format!("var_{}", NEXT_VAR.fetch_add(1, Ordering::Relaxed))
}

/// One-argument function; the closure receives the parameter as a term.
pub fn func1(build: impl FnOnce(Term) -> Term) -> Term {
    let x = fresh_var();
    let body = build(Term::Var(x.clone()));
    Term::Func {
        params: vec![x],
        body: Box::new(body),
    }
}

/// Two-argument function, as taken by `reduce`.
pub fn func2(build: impl FnOnce(Term, Term) -> Term) -> Term {
    let a = fresh_var();
    let b = fresh_var();
    let body = build(Term::Var(a.clone()), Term::Var(b.clone()));
    Term::Func {
        params: vec![a, b],
        body: Box::new(body),
    }
}

fn keys<I, K>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    keys.into_iter().map(Into::into).collect()
}

impl Term {
    fn binary(self, op: BinOp, other: impl Into<Term>) -> Term {
        Term::Binary {
            op,
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn eq(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::Equal, other)
    }

    pub fn ne(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::NotEqual, other)
    }

    pub fn lt(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::LessThan, other)
    }

    pub fn le(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::LessEqual, other)
    }

    pub fn gt(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::GreaterThan, other)
    }

    pub fn ge(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::GreaterEqual, other)
    }

    pub fn and(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::And, other)
    }

    pub fn or(self, other: impl Into<Term>) -> Term {
        self.binary(BinOp::Or, other)
    }

    pub fn get_field(self, attr: impl Into<String>) -> Term {
        Term::GetAttr {
            object: Box::new(self),
            attr: attr.into(),
        }
    }

    pub fn contains(self, attr: impl Into<String>) -> Term {
        Term::Contains {
            object: Box::new(self),
            attr: attr.into(),
        }
    }

    pub fn merge(self, other: impl Into<Term>) -> Term {
        Term::Merge {
            left: Box::new(self),
            right: Box::new(other.into()),
        }
    }

    pub fn pick<I, K>(self, attrs: I) -> Term
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Term::Pick {
            object: Box::new(self),
            keys: keys(attrs),
        }
    }

    pub fn unpick<I, K>(self, attrs: I) -> Term
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Term::Unpick {
            object: Box::new(self),
            keys: keys(attrs),
        }
    }

    pub fn pluck<I, K>(self, attrs: I) -> Term
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Term::Pluck {
            sequence: Box::new(self),
            keys: keys(attrs),
        }
    }

    pub fn without<I, K>(self, attrs: I) -> Term
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Term::Without {
            sequence: Box::new(self),
            keys: keys(attrs),
        }
    }

    pub fn append(self, item: impl Into<Term>) -> Term {
        Term::Append {
            array: Box::new(self),
            item: Box::new(item.into()),
        }
    }

    /// `seq[index]`
    pub fn nth(self, index: impl Into<Term>) -> Term {
        Term::Nth {
            sequence: Box::new(self),
            index: Box::new(index.into()),
        }
    }

    /// `seq[start:end]`; pass `()` for an omitted bound.
    pub fn slice(self, start: impl Into<Term>, end: impl Into<Term>) -> Term {
        Term::Slice {
            sequence: Box::new(self),
            start: Box::new(start.into()),
            end: Box::new(end.into()),
        }
    }

    pub fn count(self) -> Term {
        Term::Count(Box::new(self))
    }

    pub fn union(self, other: impl Into<Term>) -> Term {
        union(self, other)
    }

    pub fn array_to_stream(self) -> Term {
        Term::ArrayToStream(Box::new(self))
    }

    pub fn stream_to_array(self) -> Term {
        Term::StreamToArray(Box::new(self))
    }

    pub fn limit(self, count: impl Into<Term>) -> Term {
        Term::Limit {
            sequence: Box::new(self),
            count: Box::new(count.into()),
        }
    }

    pub fn skip(self, count: impl Into<Term>) -> Term {
        Term::Skip {
            sequence: Box::new(self),
            count: Box::new(count.into()),
        }
    }

    pub fn distinct(self) -> Term {
        Term::Distinct(Box::new(self))
    }

    pub fn map(self, func: impl Into<Term>) -> Term {
        Term::Map {
            sequence: Box::new(self),
            func: Box::new(func.into()),
        }
    }

    pub fn filter(self, predicate: impl Into<Term>) -> Term {
        Term::Filter {
            sequence: Box::new(self),
            predicate: Box::new(predicate.into()),
        }
    }

    pub fn concat_map(self, func: impl Into<Term>) -> Term {
        Term::ConcatMap {
            sequence: Box::new(self),
            func: Box::new(func.into()),
        }
    }

    pub fn reduce(self, base: impl Into<Term>, func: impl Into<Term>) -> Term {
        Term::Reduce {
            sequence: Box::new(self),
            base: Box::new(base.into()),
            func: Box::new(func.into()),
        }
    }

    pub fn grouped_map_reduce(
        self,
        group: impl Into<Term>,
        mapping: impl Into<Term>,
        base: impl Into<Term>,
        reduction: impl Into<Term>,
    ) -> Term {
        Term::GroupedMapReduce {
            sequence: Box::new(self),
            group: Box::new(group.into()),
            mapping: Box::new(mapping.into()),
            base: Box::new(base.into()),
            reduction: Box::new(reduction.into()),
        }
    }

    pub fn order_by<I, K>(self, keys: I) -> Term
    where
        I: IntoIterator<Item = K>,
        K: Into<OrderKey>,
    {
        Term::OrderBy {
            sequence: Box::new(self),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn get(self, key: impl Into<Term>) -> Term {
        Term::Get {
            table: Box::new(self),
            key: Box::new(key.into()),
        }
    }

    pub fn between(self, lower: impl Into<Term>, upper: impl Into<Term>) -> Term {
        Term::Between {
            sequence: Box::new(self),
            lower: Box::new(lower.into()),
            upper: Box::new(upper.into()),
        }
    }

    pub fn insert(self, rows: impl Into<Term>) -> Term {
        Term::Insert {
            table: Box::new(self),
            rows: Box::new(rows.into()),
        }
    }

    pub fn delete(self) -> Term {
        Term::Delete(Box::new(self))
    }

    pub fn update(self, func: impl Into<Term>) -> Term {
        self.update_with(func, false)
    }

    /// `update` with an explicit non-atomic acknowledgment.
    pub fn update_with(self, func: impl Into<Term>, non_atomic: bool) -> Term {
        Term::Update {
            selection: Box::new(self),
            func: Box::new(func.into()),
            non_atomic,
        }
    }

    pub fn replace(self, func: impl Into<Term>) -> Term {
        self.replace_with(func, false)
    }

    /// `replace` with an explicit non-atomic acknowledgment.
    pub fn replace_with(self, func: impl Into<Term>, non_atomic: bool) -> Term {
        Term::Replace {
            selection: Box::new(self),
            func: Box::new(func.into()),
            non_atomic,
        }
    }
}

// Conversions

impl From<Value> for Term {
    fn from(v: Value) -> Self {
        Term::Datum(v)
    }
}

impl From<serde_json::Value> for Term {
    fn from(json: serde_json::Value) -> Self {
        Term::Datum(json.into())
    }
}

macro_rules! datum_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Term {
                fn from(v: $t) -> Self {
                    Term::Datum(Value::from(v))
                }
            }
        )*
    };
}

datum_from!(bool, f64, i64, i32, usize, &str, String, ());

impl<T: Into<Term>> From<Option<T>> for Term {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(t) => t.into(),
            None => Term::Datum(Value::Null),
        }
    }
}

impl<T: Into<Term>> From<Vec<T>> for Term {
    fn from(items: Vec<T>) -> Self {
        Term::MakeArray(items.into_iter().map(Into::into).collect())
    }
}

// Operators

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<T: Into<Term>> ops::$trait<T> for Term {
            type Output = Term;

            fn $method(self, rhs: T) -> Term {
                self.binary($op, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinOp::Add);
binary_operator!(Sub, sub, BinOp::Subtract);
binary_operator!(Mul, mul, BinOp::Multiply);
binary_operator!(Div, div, BinOp::Divide);
binary_operator!(Rem, rem, BinOp::Modulo);
binary_operator!(BitAnd, bitand, BinOp::And);
binary_operator!(BitOr, bitor, BinOp::Or);

/// `3 + expr(4)`: numeric left operands.
macro_rules! reflected_operator {
    ($lhs:ty; $($trait:ident, $method:ident, $op:expr);*) => {
        $(
            impl ops::$trait<Term> for $lhs {
                type Output = Term;

                fn $method(self, rhs: Term) -> Term {
                    expr(self).binary($op, rhs)
                }
            }
        )*
    };
}

reflected_operator!(i32; Add, add, BinOp::Add; Sub, sub, BinOp::Subtract; Mul, mul, BinOp::Multiply; Div, div, BinOp::Divide; Rem, rem, BinOp::Modulo);
reflected_operator!(f64; Add, add, BinOp::Add; Sub, sub, BinOp::Subtract; Mul, mul, BinOp::Multiply; Div, div, BinOp::Divide; Rem, rem, BinOp::Modulo);

impl ops::Neg for Term {
    type Output = Term;

    fn neg(self) -> Term {
        Term::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(self),
        }
    }
}

impl ops::Not for Term {
    type Output = Term;

    fn not(self) -> Term {
        Term::Unary {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}
