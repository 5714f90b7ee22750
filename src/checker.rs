//! Static scope check, run before a query is evaluated.
//!
//! Every `letvar` must name a binding introduced by an enclosing `let_` or
//! function, and `row()` may only appear where a function is expected (or inside
//! a function written there). Violations are construction errors, so nothing is
//! evaluated and no table is touched.

use crate::{
    ast::Term,
    error::{ConstructionError, QueryResult, ResultExt},
};

pub fn check_scopes(term: &Term) -> QueryResult<()> {
    Scope::default().check(term)
}

#[derive(Default)]
struct Scope<'t> {
    names: Vec<&'t str>,
    implicit: bool,
}

impl<'t> Scope<'t> {
    fn check(&mut self, term: &'t Term) -> QueryResult<()> {
        match term {
            Term::Var(name) => {
                if self.names.iter().rev().any(|bound| *bound == name.as_str()) {
                    Ok(())
                } else {
                    Err(ConstructionError::Unbound(name.clone()).into())
                }
            }
            Term::ImplicitVar => {
                if self.implicit {
                    Ok(())
                } else {
                    Err(ConstructionError::ImplicitUnbound.into())
                }
            }
            Term::Func { params, body } => {
                let depth = self.names.len();
                self.names.extend(params.iter().map(String::as_str));
                let result = self.check(body).at(0);
                self.names.truncate(depth);
                result
            }
            Term::Let { bindings, body } => {
                let depth = self.names.len();
                let mut result = Ok(());
                for (name, value) in bindings {
                    result = self.check(value).at_key(name);
                    if result.is_err() {
                        break;
                    }
                    self.names.push(name);
                }
                if result.is_ok() {
                    result = self.check(body).at(bindings.len());
                }
                self.names.truncate(depth);
                result
            }
            Term::MakeObject(pairs) => {
                for (key, value) in pairs {
                    self.check(value).at_key(key)?;
                }
                Ok(())
            }
            Term::Map { sequence, func } | Term::ConcatMap { sequence, func } => {
                self.check(sequence).at(0)?;
                self.check_function(func).at(1)
            }
            Term::Filter {
                sequence,
                predicate,
            } => {
                self.check(sequence).at(0)?;
                self.check_function(predicate).at(1)
            }
            Term::Reduce {
                sequence,
                base,
                func,
            } => {
                self.check(sequence).at(0)?;
                self.check(base).at(1)?;
                self.check_function(func).at(2)
            }
            Term::GroupedMapReduce {
                sequence,
                group,
                mapping,
                base,
                reduction,
            } => {
                self.check(sequence).at(0)?;
                self.check_function(group).at(1)?;
                self.check_function(mapping).at(2)?;
                self.check(base).at(3)?;
                self.check_function(reduction).at(4)
            }
            Term::Update {
                selection, func, ..
            }
            | Term::Replace {
                selection, func, ..
            } => {
                self.check(selection).at(0)?;
                self.check_function(func).at(1)
            }
            _ => {
                for (i, child) in term.children().into_iter().enumerate() {
                    self.check(child).at(i)?;
                }
                Ok(())
            }
        }
    }

    /// A function position: a plain term there is evaluated per element with
    /// the element bound to the implicit row.
    fn check_function(&mut self, term: &'t Term) -> QueryResult<()> {
        if matches!(term, Term::Func { .. }) {
            return self.check(term);
        }
        let outer = std::mem::replace(&mut self.implicit, true);
        let result = self.check(term);
        self.implicit = outer;
        result
    }
}
