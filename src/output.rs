//! JSON rendering of query results.
//!
//! Values render as standard JSON with object keys sorted, so output is
//! deterministic. Whole numbers print without a fraction; NaN and the
//! infinities, which JSON cannot spell, print as `null`.
//!
//! # Examples
//!
//! ```
//! use reql_eval::Value;
//! use reql_eval::output::{to_json, to_json_pretty};
//!
//! let value = Value::object([("b", Value::from(2)), ("a", Value::from(0.5))]);
//! assert_eq!(to_json(&value), r#"{"a":0.5,"b":2}"#);
//! assert_eq!(to_json_pretty(&value), "{\n  \"a\": 0.5,\n  \"b\": 2\n}");
//! ```

use serde_json::json;

use crate::{
    error::{Frame, QueryError, QueryResult},
    value::Value,
};

pub fn to_json(value: &Value) -> String {
    serde_json::Value::from(value.clone()).to_string()
}

pub fn to_json_pretty(value: &Value) -> String {
    format!("{:#}", serde_json::Value::from(value.clone()))
}

/// A failure as a response document: category, message and location path.
pub fn error_document(error: &QueryError) -> serde_json::Value {
    let (kind, message) = match error {
        QueryError::Construction { source, .. } => ("construction", source.to_string()),
        QueryError::Execution { source, .. } => ("execution", source.to_string()),
    };
    let location: Vec<serde_json::Value> = error
        .location()
        .frames()
        .map(|frame| match frame {
            Frame::Arg(n) => json!(n),
            Frame::Key(k) => json!(k),
        })
        .collect();
    json!({
        "error": {
            "kind": kind,
            "message": message,
            "location": location,
        }
    })
}

/// `{"result": ...}` on success, [`error_document`] on failure.
pub fn response_document(result: &QueryResult<Value>) -> serde_json::Value {
    match result {
        Ok(value) => json!({ "result": serde_json::Value::from(value.clone()) }),
        Err(e) => error_document(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvalError, ResultExt};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whole_numbers_have_no_fraction() {
        assert_eq!(to_json(&Value::from(3)), "3");
        assert_eq!(to_json(&Value::from(2.5)), "2.5");
        assert_eq!(to_json(&Value::Number(f64::NAN)), "null");
    }

    #[test]
    fn test_error_document_carries_location() {
        let result: QueryResult<Value> = Err(EvalError::MissingAttribute("c".into()).into());
        let result = result.at(1).at_key("a");
        assert_eq!(
            response_document(&result),
            json!({
                "error": {
                    "kind": "execution",
                    "message": "Object is missing attribute `c`",
                    "location": ["a", 1],
                }
            })
        );
    }

    #[test]
    fn test_success_document() {
        let result = Ok(Value::from(vec![Value::from("ü")]));
        assert_eq!(response_document(&result), json!({"result": ["ü"]}));
    }
}
