use std::collections::HashMap;

use super::{Evaluator, expect_array, expect_object, finish};
use crate::{
    ast::Term,
    error::{QueryResult, ResultExt},
    evaluator::{Env, Evaluated},
    value::Value,
};

/// Keep (`keep = true`) or drop the named keys. Absent keys are ignored.
fn project(fields: HashMap<String, Value>, keys: &[String], keep: bool) -> HashMap<String, Value> {
    fields
        .into_iter()
        .filter(|(k, _)| keys.contains(k) == keep)
        .collect()
}

impl<'s> Evaluator<'s> {
    pub(super) fn eval_merge(&self, left: &Term, right: &Term, env: &Env) -> QueryResult<Value> {
        let mut base = self.datum(left, env).and_then(expect_object).at(0)?;
        let overlay = self.datum(right, env).and_then(expect_object).at(1)?;
        base.extend(overlay);
        Ok(Value::Object(base))
    }

    pub(super) fn eval_pick(
        &self,
        object: &Term,
        keys: &[String],
        keep: bool,
        env: &Env,
    ) -> QueryResult<Value> {
        let fields = self.datum(object, env).and_then(expect_object).at(0)?;
        Ok(Value::Object(project(fields, keys, keep)))
    }

    /// `pick`/`unpick` lifted over a sequence of objects.
    pub(super) fn eval_pluck<'a>(
        &'a self,
        sequence: &'a Term,
        keys: &'a [String],
        keep: bool,
        env: &Env,
    ) -> QueryResult<Evaluated<'a>> {
        let seq = self.sequence(sequence, env).at(0)?;
        let was_array = seq.is_array();
        let projected = seq.into_stream().map_with(move |row| {
            let fields = expect_object(row).at(0)?;
            Ok(Value::Object(project(fields, keys, keep)))
        });
        finish(was_array, projected)
    }

    pub(super) fn eval_append(&self, array: &Term, item: &Term, env: &Env) -> QueryResult<Value> {
        let mut items = self.datum(array, env).and_then(expect_array).at(0)?;
        items.push(self.datum(item, env).at(1)?);
        Ok(Value::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(json: serde_json::Value) -> HashMap<String, Value> {
        match Value::from(json) {
            Value::Object(map) => map,
            other => panic!("not an object: {}", other),
        }
    }

    #[test]
    fn test_project_ignores_absent_keys() {
        let keys = vec!["a".to_string(), "zz".to_string()];
        assert_eq!(
            Value::Object(project(fields(json!({"a": 1, "b": 2})), &keys, true)),
            Value::from(json!({"a": 1}))
        );
        assert_eq!(
            Value::Object(project(fields(json!({"a": 1, "b": 2})), &keys, false)),
            Value::from(json!({"b": 2}))
        );
    }
}
