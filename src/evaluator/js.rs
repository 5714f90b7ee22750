use std::collections::HashMap;

use tracing::trace;

use super::Evaluator;
use crate::{
    error::{EvalError, QueryResult},
    evaluator::Env,
    script::{ScriptContext, ScriptSource},
    value::Value,
};

impl<'s> Evaluator<'s> {
    /// Hand a script to the bridge with every visible binding and the implicit
    /// row as `this`.
    pub(super) fn eval_js(&self, source: &ScriptSource, env: &Env) -> QueryResult<Value> {
        if !self.config.script.enabled {
            return Err(EvalError::ScriptingDisabled.into());
        }
        let ctx = ScriptContext {
            bindings: env.visible(),
            receiver: env
                .implicit()
                .cloned()
                .unwrap_or_else(|| Value::Object(HashMap::new())),
            max_depth: self.config.script.max_depth,
        };
        trace!(script = %source, bindings = ctx.bindings.len(), "calling script bridge");
        self.bridge
            .evaluate(source, &ctx)
            .map_err(|e| EvalError::from(e).into())
    }
}
