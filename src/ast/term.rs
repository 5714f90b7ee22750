use std::fmt;

use crate::{
    ast::{BinOp, OrderKey, UnaryOp},
    script::ScriptSource,
    value::Value,
};

/// A node of the query expression tree.
///
/// Queries are built with the functions and methods in [`crate::query`] and
/// evaluated by [`crate::Evaluator`]. Operand positions are numbered in the
/// order the fields appear here; error locations refer to those numbers.
#[derive(Debug, Clone)]
pub enum Term {
    // Literals
    /// Literal datum
    ///
    /// # Example
    /// ```text
    /// expr(3), expr("foo"), expr(json!({"a": 1}))
    /// ```
    Datum(Value),

    /// Array whose elements are computed
    MakeArray(Vec<Term>),

    /// Object whose values are computed
    MakeObject(Vec<(String, Term)>),

    // References
    /// Variable bound by `let_` or a function parameter (`letvar("x")`)
    Var(String),

    /// The implicit row (`row()`), bound when a plain term is used as a function
    ImplicitVar,

    // Binding forms
    /// Function literal
    ///
    /// # Example
    /// ```text
    /// func2(|acc, x| acc + x)
    /// ```
    Func { params: Vec<String>, body: Box<Term> },

    /// Sequential bindings; later bindings see earlier ones
    ///
    /// # Example
    /// ```text
    /// let_([("x", 3), ("y", 4)], letvar("x"))
    /// ```
    Let {
        bindings: Vec<(String, Term)>,
        body: Box<Term>,
    },

    /// Conditional; the test must be a bool
    Branch {
        test: Box<Term>,
        then: Box<Term>,
        otherwise: Box<Term>,
    },

    /// Embedded script evaluation
    Js(ScriptSource),

    // Operators
    Unary { op: UnaryOp, operand: Box<Term> },

    Binary {
        op: BinOp,
        left: Box<Term>,
        right: Box<Term>,
    },

    // Objects
    /// Attribute access (`obj["foo"]`)
    GetAttr { object: Box<Term>, attr: String },

    /// Attribute presence test; never fails on a missing key
    Contains { object: Box<Term>, attr: String },

    /// Right-biased object merge
    Merge { left: Box<Term>, right: Box<Term> },

    Pick { object: Box<Term>, keys: Vec<String> },

    Unpick { object: Box<Term>, keys: Vec<String> },

    /// `pick` applied to every element of a sequence
    Pluck { sequence: Box<Term>, keys: Vec<String> },

    /// `unpick` applied to every element of a sequence
    Without { sequence: Box<Term>, keys: Vec<String> },

    // Arrays and sequences
    Append { array: Box<Term>, item: Box<Term> },

    /// Single element access (`seq[i]`)
    Nth { sequence: Box<Term>, index: Box<Term> },

    /// Range access (`seq[start:end]`); a null bound means "omitted"
    Slice {
        sequence: Box<Term>,
        start: Box<Term>,
        end: Box<Term>,
    },

    Count(Box<Term>),

    Union { left: Box<Term>, right: Box<Term> },

    ArrayToStream(Box<Term>),

    StreamToArray(Box<Term>),

    Limit { sequence: Box<Term>, count: Box<Term> },

    Skip { sequence: Box<Term>, count: Box<Term> },

    Distinct(Box<Term>),

    Map { sequence: Box<Term>, func: Box<Term> },

    Filter {
        sequence: Box<Term>,
        predicate: Box<Term>,
    },

    ConcatMap { sequence: Box<Term>, func: Box<Term> },

    Reduce {
        sequence: Box<Term>,
        base: Box<Term>,
        func: Box<Term>,
    },

    GroupedMapReduce {
        sequence: Box<Term>,
        group: Box<Term>,
        mapping: Box<Term>,
        base: Box<Term>,
        reduction: Box<Term>,
    },

    OrderBy {
        sequence: Box<Term>,
        keys: Vec<OrderKey>,
    },

    // Tables
    /// Every row of a table, in primary-key order
    Table(String),

    /// Single row by primary key
    Get { table: Box<Term>, key: Box<Term> },

    /// Rows whose primary key lies in `[lower, upper]`
    Between {
        sequence: Box<Term>,
        lower: Box<Term>,
        upper: Box<Term>,
    },

    Insert { table: Box<Term>, rows: Box<Term> },

    Delete(Box<Term>),

    Update {
        selection: Box<Term>,
        func: Box<Term>,
        non_atomic: bool,
    },

    Replace {
        selection: Box<Term>,
        func: Box<Term>,
        non_atomic: bool,
    },
}

impl Term {
    /// Direct operands, in operand-position order.
    pub fn children(&self) -> Vec<&Term> {
        match self {
            Term::Datum(_) | Term::Var(_) | Term::ImplicitVar | Term::Js(_) | Term::Table(_) => {
                vec![]
            }
            Term::MakeArray(items) => items.iter().collect(),
            Term::MakeObject(pairs) => pairs.iter().map(|(_, t)| t).collect(),
            Term::Func { body, .. } => vec![&**body],
            Term::Let { bindings, body } => bindings
                .iter()
                .map(|(_, t)| t)
                .chain(std::iter::once(&**body))
                .collect(),
            Term::Branch {
                test,
                then,
                otherwise,
            } => vec![&**test, &**then, &**otherwise],
            Term::Unary { operand, .. } => vec![&**operand],
            Term::Binary { left, right, .. }
            | Term::Merge { left, right }
            | Term::Union { left, right } => vec![&**left, &**right],
            Term::GetAttr { object, .. }
            | Term::Contains { object, .. }
            | Term::Pick { object, .. }
            | Term::Unpick { object, .. } => vec![&**object],
            Term::Pluck { sequence, .. }
            | Term::Without { sequence, .. }
            | Term::OrderBy { sequence, .. } => vec![&**sequence],
            Term::Append { array, item } => vec![&**array, &**item],
            Term::Nth { sequence, index } => vec![&**sequence, &**index],
            Term::Slice {
                sequence,
                start,
                end,
            } => vec![&**sequence, &**start, &**end],
            Term::Count(t)
            | Term::ArrayToStream(t)
            | Term::StreamToArray(t)
            | Term::Distinct(t)
            | Term::Delete(t) => vec![&**t],
            Term::Limit { sequence, count } | Term::Skip { sequence, count } => {
                vec![&**sequence, &**count]
            }
            Term::Map { sequence, func } | Term::ConcatMap { sequence, func } => {
                vec![&**sequence, &**func]
            }
            Term::Filter {
                sequence,
                predicate,
            } => vec![&**sequence, &**predicate],
            Term::Reduce {
                sequence,
                base,
                func,
            } => vec![&**sequence, &**base, &**func],
            Term::GroupedMapReduce {
                sequence,
                group,
                mapping,
                base,
                reduction,
            } => vec![&**sequence, &**group, &**mapping, &**base, &**reduction],
            Term::Get { table, key } => vec![&**table, &**key],
            Term::Between {
                sequence,
                lower,
                upper,
            } => vec![&**sequence, &**lower, &**upper],
            Term::Insert { table, rows } => vec![&**table, &**rows],
            Term::Update {
                selection, func, ..
            }
            | Term::Replace {
                selection, func, ..
            } => vec![&**selection, &**func],
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_keys(f: &mut fmt::Formatter<'_>, keys: &[String]) -> fmt::Result {
    let quoted: Vec<String> = keys.iter().map(|k| format!("{:?}", k)).collect();
    write_list(f, &quoted)
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ascending {
            write!(f, "asc({:?})", self.field)
        } else {
            write!(f, "desc({:?})", self.field)
        }
    }
}

/// Renders the query in builder notation. A variable renders as its bare name,
/// so `format!("{}.id == 1", x)` splices a function parameter into a script.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Datum(v) => write!(f, "{}", v),
            Term::MakeArray(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Term::MakeObject(pairs) => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Term::Var(name) => f.write_str(name),
            Term::ImplicitVar => f.write_str("row()"),
            Term::Func { params, body } => {
                write!(f, "func({}) {{ {} }}", params.join(", "), body)
            }
            Term::Let { bindings, body } => {
                f.write_str("let_(")?;
                for (name, value) in bindings {
                    write!(f, "{} = {}, ", name, value)?;
                }
                write!(f, "{})", body)
            }
            Term::Branch {
                test,
                then,
                otherwise,
            } => write!(f, "branch({}, {}, {})", test, then, otherwise),
            Term::Js(source) => write!(f, "{}", source),
            Term::Unary {
                op: UnaryOp::Negate,
                operand,
            } => write!(f, "-{}", operand),
            Term::Unary {
                op: UnaryOp::Not,
                operand,
            } => write!(f, "!{}", operand),
            Term::Binary { op, left, right } => write!(f, "({} {} {})", left, op.symbol(), right),
            Term::GetAttr { object, attr } => write!(f, "{}[{:?}]", object, attr),
            Term::Contains { object, attr } => write!(f, "{}.contains({:?})", object, attr),
            Term::Merge { left, right } => write!(f, "{}.merge({})", left, right),
            Term::Pick { object, keys } => {
                write!(f, "{}.pick(", object)?;
                write_keys(f, keys)?;
                f.write_str(")")
            }
            Term::Unpick { object, keys } => {
                write!(f, "{}.unpick(", object)?;
                write_keys(f, keys)?;
                f.write_str(")")
            }
            Term::Pluck { sequence, keys } => {
                write!(f, "{}.pluck(", sequence)?;
                write_keys(f, keys)?;
                f.write_str(")")
            }
            Term::Without { sequence, keys } => {
                write!(f, "{}.without(", sequence)?;
                write_keys(f, keys)?;
                f.write_str(")")
            }
            Term::Append { array, item } => write!(f, "{}.append({})", array, item),
            Term::Nth { sequence, index } => write!(f, "{}[{}]", sequence, index),
            Term::Slice {
                sequence,
                start,
                end,
            } => write!(f, "{}[{}:{}]", sequence, start, end),
            Term::Count(t) => write!(f, "{}.count()", t),
            Term::Union { left, right } => write!(f, "{}.union({})", left, right),
            Term::ArrayToStream(t) => write!(f, "{}.array_to_stream()", t),
            Term::StreamToArray(t) => write!(f, "{}.stream_to_array()", t),
            Term::Limit { sequence, count } => write!(f, "{}.limit({})", sequence, count),
            Term::Skip { sequence, count } => write!(f, "{}.skip({})", sequence, count),
            Term::Distinct(t) => write!(f, "{}.distinct()", t),
            Term::Map { sequence, func } => write!(f, "{}.map({})", sequence, func),
            Term::Filter {
                sequence,
                predicate,
            } => write!(f, "{}.filter({})", sequence, predicate),
            Term::ConcatMap { sequence, func } => write!(f, "{}.concat_map({})", sequence, func),
            Term::Reduce {
                sequence,
                base,
                func,
            } => write!(f, "{}.reduce({}, {})", sequence, base, func),
            Term::GroupedMapReduce {
                sequence,
                group,
                mapping,
                base,
                reduction,
            } => write!(
                f,
                "{}.grouped_map_reduce({}, {}, {}, {})",
                sequence, group, mapping, base, reduction
            ),
            Term::OrderBy { sequence, keys } => {
                write!(f, "{}.order_by(", sequence)?;
                write_list(f, keys)?;
                f.write_str(")")
            }
            Term::Table(name) => write!(f, "table({:?})", name),
            Term::Get { table, key } => write!(f, "{}.get({})", table, key),
            Term::Between {
                sequence,
                lower,
                upper,
            } => write!(f, "{}.between({}, {})", sequence, lower, upper),
            Term::Insert { table, rows } => write!(f, "{}.insert({})", table, rows),
            Term::Delete(t) => write!(f, "{}.delete()", t),
            Term::Update {
                selection,
                func,
                non_atomic,
            } => write!(f, "{}.update({}, non_atomic={})", selection, func, non_atomic),
            Term::Replace {
                selection,
                func,
                non_atomic,
            } => write!(f, "{}.replace({}, non_atomic={})", selection, func, non_atomic),
        }
    }
}
