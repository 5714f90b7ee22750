use std::collections::HashMap;

use crate::value::Value;

/// Lexical environment: an ordered list of bindings plus the implicit row.
///
/// Lookups search innermost-first, so a later binding of a name shadows an
/// earlier one. Environments are cloned into closures and lazy streams; they
/// are never shared mutably.
#[derive(Debug, Clone, Default)]
pub struct Env {
    bindings: Vec<(String, Value)>,
    implicit: Option<Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.push((name.into(), value));
    }

    pub fn implicit(&self) -> Option<&Value> {
        self.implicit.as_ref()
    }

    /// Same bindings, with `row` as the implicit row.
    pub fn with_implicit(&self, row: Value) -> Env {
        Env {
            bindings: self.bindings.clone(),
            implicit: Some(row),
        }
    }

    /// Every visible name with its innermost value.
    pub fn visible(&self) -> HashMap<String, Value> {
        self.bindings.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_binding_wins() {
        let mut env = Env::new();
        env.bind("x", Value::from(1));
        env.bind("y", Value::from(2));
        env.bind("x", Value::from(3));
        assert_eq!(env.lookup("x"), Some(&Value::from(3)));
        assert_eq!(env.visible()["x"], Value::from(3));
        assert_eq!(env.lookup("z"), None);
    }

    #[test]
    fn test_implicit_row_is_separate_from_bindings() {
        let env = Env::new().with_implicit(Value::from("row"));
        assert_eq!(env.implicit(), Some(&Value::from("row")));
        assert!(env.visible().is_empty());
    }
}
