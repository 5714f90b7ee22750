use tracing::trace;

use super::{Evaluator, expect_array, expect_bool};
use crate::{
    ast::{BinOp, Term, UnaryOp},
    error::{EvalError, QueryError, QueryResult, ResultExt},
    evaluator::Env,
    value::Value,
};

fn number(op: BinOp, value: &Value) -> QueryResult<f64> {
    value.as_number().ok_or_else(|| {
        EvalError::Arithmetic {
            op: op.verb(),
            found: value.kind_name(),
        }
        .into()
    })
}

fn apply_numeric(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        // Sign follows the dividend, like fmod
        BinOp::Modulo => a % b,
        _ => unreachable!("not an arithmetic operator: {:?}", op),
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> bool {
    match op {
        BinOp::Equal => left == right,
        BinOp::NotEqual => left != right,
        BinOp::LessThan => left < right,
        BinOp::GreaterThan => left > right,
        BinOp::LessEqual => left <= right,
        BinOp::GreaterEqual => left >= right,
        _ => unreachable!("not a comparison: {:?}", op),
    }
}

impl<'s> Evaluator<'s> {
    pub(super) fn eval_unary(&self, op: UnaryOp, operand: &Term, env: &Env) -> QueryResult<Value> {
        let value = self.datum(operand, env).at(0)?;
        match op {
            UnaryOp::Negate => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(QueryError::from(EvalError::Arithmetic {
                    op: "negate",
                    found: other.kind_name(),
                }))
                .at(0),
            },
            UnaryOp::Not => expect_bool(value).map(|b| Value::Bool(!b)).at(0),
        }
    }

    pub(super) fn eval_binary(
        &self,
        op: BinOp,
        left: &Term,
        right: &Term,
        env: &Env,
    ) -> QueryResult<Value> {
        match op {
            BinOp::And | BinOp::Or => {
                let short_circuit = op == BinOp::Or;
                let lhs = self.datum(left, env).and_then(expect_bool).at(0)?;
                if lhs == short_circuit {
                    trace!(op = op.symbol(), "short-circuited");
                    return Ok(Value::Bool(lhs));
                }
                let rhs = self.datum(right, env).and_then(expect_bool).at(1)?;
                Ok(Value::Bool(rhs))
            }
            BinOp::Equal
            | BinOp::NotEqual
            | BinOp::LessThan
            | BinOp::GreaterThan
            | BinOp::LessEqual
            | BinOp::GreaterEqual => {
                let lhs = self.datum(left, env).at(0)?;
                let rhs = self.datum(right, env).at(1)?;
                Ok(Value::Bool(compare(op, &lhs, &rhs)))
            }
            BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
                let lhs = self.datum(left, env).at(0)?;
                let rhs = self.datum(right, env).at(1)?;
                if op == BinOp::Add
                    && let Value::Array(mut items) = lhs
                {
                    items.extend(expect_array(rhs).at(1)?);
                    return Ok(Value::Array(items));
                }
                let a = number(op, &lhs).at(0)?;
                let b = number(op, &rhs).at(1)?;
                Ok(Value::Number(apply_numeric(op, a, b)))
            }
        }
    }
}
