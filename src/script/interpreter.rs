use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::{
    script::{
        BridgeError, ScriptBridge, ScriptContext, ScriptSource,
        lexer::Lexer,
        parser::Parser,
        syntax::{BinaryOp, Expr, Stmt, UnaryOp},
    },
    value::Value,
};

type ScriptResult<T> = Result<T, BridgeError>;

/// Runtime value inside a script.
///
/// Arrays and objects are shared references, as in JavaScript, so a script can
/// build a graph that refers back to itself.
#[derive(Debug, Clone)]
enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<JsValue>>>),
    Object(Rc<RefCell<BTreeMap<String, JsValue>>>),
}

impl JsValue {
    fn array(items: Vec<JsValue>) -> Self {
        JsValue::Array(Rc::new(RefCell::new(items)))
    }

    fn object(map: BTreeMap<String, JsValue>) -> Self {
        JsValue::Object(Rc::new(RefCell::new(map)))
    }

    fn type_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Null => "null",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Array(_) | JsValue::Object(_) => "object",
        }
    }

    fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Array(_) | JsValue::Object(_) => true,
        }
    }

    fn to_number(&self) -> f64 {
        match self {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => f64::from(u8::from(*b)),
            JsValue::Number(n) => *n,
            JsValue::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            JsValue::Array(_) | JsValue::Object(_) => {
                let text = self.to_js_string();
                JsValue::String(text).to_number()
            }
        }
    }

    fn to_js_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) => number_to_string(*n),
            JsValue::String(s) => s.clone(),
            JsValue::Array(items) => items
                .borrow()
                .iter()
                .map(|item| match item {
                    JsValue::Undefined | JsValue::Null => String::new(),
                    other => other.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            JsValue::Object(_) => "[object Object]".to_string(),
        }
    }

    fn is_primitive(&self) -> bool {
        !matches!(self, JsValue::Array(_) | JsValue::Object(_))
    }
}

/// `Number.prototype.toString()`: shortest round-trip digits, positional for
/// decimal exponents in -7..21, exponential (`1e+21`, `1.5e-7`) otherwise.
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n < 0.0 {
        return format!("-{}", number_to_string(-n));
    }
    if n.is_infinite() {
        return "Infinity".to_string();
    }

    // `{:e}` yields the shortest digits as `d.ddde<exp>`
    let scientific = format!("{:e}", n);
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= point && point <= 21 {
        format!("{}{}", digits, "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    } else if -6 < point && point <= 0 {
        format!("0.{}{}", "0".repeat(-point as usize), digits)
    } else {
        let sign = if point - 1 < 0 { '-' } else { '+' };
        let (lead, rest) = digits.split_at(1);
        let fraction = if rest.is_empty() { String::new() } else { format!(".{}", rest) };
        format!("{}{}e{}{}", lead, fraction, sign, (point - 1).abs())
    }
}

fn strict_equal(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Bool(x), JsValue::Bool(y)) => x == y,
        (JsValue::Number(x), JsValue::Number(y)) => x == y,
        (JsValue::String(x), JsValue::String(y)) => x == y,
        (JsValue::Array(x), JsValue::Array(y)) => Rc::ptr_eq(x, y),
        (JsValue::Object(x), JsValue::Object(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

fn loose_equal(a: &JsValue, b: &JsValue) -> bool {
    match (a, b) {
        (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => true,
        (JsValue::Undefined | JsValue::Null, _) | (_, JsValue::Undefined | JsValue::Null) => false,
        _ if a.type_name() == b.type_name() => strict_equal(a, b),
        (JsValue::Array(_) | JsValue::Object(_), other) if other.is_primitive() => {
            loose_equal(&JsValue::String(a.to_js_string()), other)
        }
        (other, JsValue::Array(_) | JsValue::Object(_)) if other.is_primitive() => {
            loose_equal(other, &JsValue::String(b.to_js_string()))
        }
        _ => a.to_number() == b.to_number(),
    }
}

fn from_value(value: &Value) -> JsValue {
    match value {
        Value::Null => JsValue::Null,
        Value::Bool(b) => JsValue::Bool(*b),
        Value::Number(n) => JsValue::Number(*n),
        Value::String(s) => JsValue::String(s.clone()),
        Value::Array(items) => JsValue::array(items.iter().map(from_value).collect()),
        Value::Object(map) => JsValue::object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_value(v)))
                .collect(),
        ),
    }
}

/// Converts a script result back into a [`Value`], refusing cycles.
struct Exporter {
    max_depth: usize,
    /// Containers on the current path from the root
    visiting: HashSet<usize>,
}

impl Exporter {
    fn export(&mut self, value: &JsValue, depth: usize) -> ScriptResult<Value> {
        if depth > self.max_depth {
            return Err(BridgeError::TooDeep(self.max_depth));
        }
        match value {
            JsValue::Undefined => Err(BridgeError::Undefined),
            JsValue::Null => Ok(Value::Null),
            JsValue::Bool(b) => Ok(Value::Bool(*b)),
            JsValue::Number(n) => Ok(Value::Number(*n)),
            JsValue::String(s) => Ok(Value::String(s.clone())),
            JsValue::Array(items) => {
                let id = Rc::as_ptr(items) as usize;
                self.enter(id)?;
                let mut out = Vec::with_capacity(items.borrow().len());
                for item in items.borrow().iter() {
                    // Undefined array slots become null, as JSON does it
                    let exported = match item {
                        JsValue::Undefined => Value::Null,
                        other => self.export(other, depth + 1)?,
                    };
                    out.push(exported);
                }
                self.visiting.remove(&id);
                Ok(Value::Array(out))
            }
            JsValue::Object(map) => {
                let id = Rc::as_ptr(map) as usize;
                self.enter(id)?;
                let mut out = HashMap::new();
                for (key, item) in map.borrow().iter() {
                    if matches!(item, JsValue::Undefined) {
                        continue;
                    }
                    out.insert(key.clone(), self.export(item, depth + 1)?);
                }
                self.visiting.remove(&id);
                Ok(Value::Object(out))
            }
        }
    }

    fn enter(&mut self, id: usize) -> ScriptResult<()> {
        if self.visiting.insert(id) {
            Ok(())
        } else {
            Err(BridgeError::Cyclic)
        }
    }
}

enum Flow {
    Normal,
    Return(JsValue),
}

/// One script execution: a receiver and a stack of lexical scopes.
struct Interpreter {
    this: JsValue,
    scopes: Vec<HashMap<String, JsValue>>,
}

impl Interpreter {
    fn new(ctx: &ScriptContext) -> Self {
        let mut globals: HashMap<String, JsValue> = ctx
            .bindings
            .iter()
            .map(|(name, value)| (name.clone(), from_value(value)))
            .collect();
        globals.insert("undefined".to_string(), JsValue::Undefined);
        globals.insert("NaN".to_string(), JsValue::Number(f64::NAN));
        globals.insert("Infinity".to_string(), JsValue::Number(f64::INFINITY));
        Interpreter {
            this: from_value(&ctx.receiver),
            scopes: vec![globals],
        }
    }

    fn lookup(&self, name: &str) -> ScriptResult<JsValue> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .ok_or_else(|| BridgeError::Runtime(format!("ReferenceError: {} is not defined", name)))
    }

    fn declare(&mut self, name: &str, value: JsValue) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }

    fn assign_variable(&mut self, name: &str, value: JsValue) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(name) {
                *slot = value;
                return;
            }
        }
        // Undeclared assignment creates a global
        if let Some(globals) = self.scopes.first_mut() {
            globals.insert(name.to_string(), value);
        }
    }

    fn exec_block(&mut self, statements: &[Stmt]) -> ScriptResult<Flow> {
        self.scopes.push(HashMap::new());
        let mut flow = Ok(Flow::Normal);
        for stmt in statements {
            flow = self.exec(stmt);
            if !matches!(flow, Ok(Flow::Normal)) {
                break;
            }
        }
        self.scopes.pop();
        flow
    }

    fn exec(&mut self, stmt: &Stmt) -> ScriptResult<Flow> {
        match stmt {
            Stmt::Empty => Ok(Flow::Normal),
            Stmt::Expression(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Declare(declarations) => {
                for (name, init) in declarations {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => JsValue::Undefined,
                    };
                    self.declare(name, value);
                }
                Ok(Flow::Normal)
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => JsValue::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test)?.truthy() {
                    self.exec(then)
                } else if let Some(otherwise) = otherwise {
                    self.exec(otherwise)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::Block(statements) => self.exec_block(statements),
        }
    }

    fn eval(&mut self, expr: &Expr) -> ScriptResult<JsValue> {
        match expr {
            Expr::Number(n) => Ok(JsValue::Number(*n)),
            Expr::String(s) => Ok(JsValue::String(s.clone())),
            Expr::Boolean(b) => Ok(JsValue::Bool(*b)),
            Expr::Null => Ok(JsValue::Null),
            Expr::This => Ok(self.this.clone()),
            Expr::Identifier(name) => self.lookup(name),
            Expr::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<ScriptResult<Vec<_>>>()?;
                Ok(JsValue::array(items))
            }
            Expr::Object(pairs) => {
                let mut map = BTreeMap::new();
                for (key, value) in pairs {
                    map.insert(key.clone(), self.eval(value)?);
                }
                Ok(JsValue::object(map))
            }
            Expr::Member { object, property } => {
                let object = self.eval(object)?;
                let property = self.eval(property)?;
                get_property(&object, &property)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                Ok(match op {
                    UnaryOp::Negate => JsValue::Number(-operand.to_number()),
                    UnaryOp::Plus => JsValue::Number(operand.to_number()),
                    UnaryOp::Not => JsValue::Bool(!operand.truthy()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { and, left, right } => {
                let left = self.eval(left)?;
                if left.truthy() == *and {
                    self.eval(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test)?.truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
            Expr::Assign { target, value } => {
                let value = self.eval(value)?;
                match &**target {
                    Expr::Identifier(name) => self.assign_variable(name, value.clone()),
                    Expr::Member { object, property } => {
                        let object = self.eval(object)?;
                        let property = self.eval(property)?;
                        set_property(&object, &property, value.clone())?;
                    }
                    _ => {
                        return Err(BridgeError::Syntax(
                            "invalid left-hand side in assignment".to_string(),
                        ));
                    }
                }
                Ok(value)
            }
        }
    }
}

fn array_index(property: &JsValue) -> Option<usize> {
    let n = match property {
        JsValue::Number(n) => *n,
        JsValue::String(s) => s.parse::<f64>().ok()?,
        _ => return None,
    };
    (n >= 0.0 && n.fract() == 0.0).then_some(n as usize)
}

fn get_property(object: &JsValue, property: &JsValue) -> ScriptResult<JsValue> {
    let key = property.to_js_string();
    match object {
        JsValue::Undefined | JsValue::Null => Err(BridgeError::Runtime(format!(
            "TypeError: Cannot read properties of {} (reading '{}')",
            object.type_name(),
            key
        ))),
        JsValue::Array(items) => {
            let items = items.borrow();
            if key == "length" {
                return Ok(JsValue::Number(items.len() as f64));
            }
            Ok(array_index(property)
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(JsValue::Undefined))
        }
        JsValue::String(s) => {
            if key == "length" {
                return Ok(JsValue::Number(s.chars().count() as f64));
            }
            Ok(array_index(property)
                .and_then(|i| s.chars().nth(i))
                .map(|c| JsValue::String(c.to_string()))
                .unwrap_or(JsValue::Undefined))
        }
        JsValue::Object(map) => Ok(map.borrow().get(&key).cloned().unwrap_or(JsValue::Undefined)),
        JsValue::Bool(_) | JsValue::Number(_) => Ok(JsValue::Undefined),
    }
}

fn set_property(object: &JsValue, property: &JsValue, value: JsValue) -> ScriptResult<()> {
    match object {
        JsValue::Object(map) => {
            map.borrow_mut().insert(property.to_js_string(), value);
            Ok(())
        }
        JsValue::Array(items) => {
            let Some(index) = array_index(property) else {
                return Err(BridgeError::Runtime(format!(
                    "TypeError: cannot set property '{}' of an array",
                    property.to_js_string()
                )));
            };
            let mut items = items.borrow_mut();
            if index >= items.len() {
                items.resize(index + 1, JsValue::Undefined);
            }
            items[index] = value;
            Ok(())
        }
        JsValue::Undefined | JsValue::Null => Err(BridgeError::Runtime(format!(
            "TypeError: Cannot set properties of {} (setting '{}')",
            object.type_name(),
            property.to_js_string()
        ))),
        // Writes to primitives are silently dropped
        _ => Ok(()),
    }
}

fn binary(op: BinaryOp, left: &JsValue, right: &JsValue) -> JsValue {
    match op {
        BinaryOp::Add => {
            let left_str = !left.is_primitive() || matches!(left, JsValue::String(_));
            let right_str = !right.is_primitive() || matches!(right, JsValue::String(_));
            if left_str || right_str {
                JsValue::String(left.to_js_string() + &right.to_js_string())
            } else {
                JsValue::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Subtract => JsValue::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => JsValue::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => JsValue::Number(left.to_number() / right.to_number()),
        BinaryOp::Modulo => JsValue::Number(left.to_number() % right.to_number()),
        BinaryOp::LooseEqual => JsValue::Bool(loose_equal(left, right)),
        BinaryOp::LooseNotEqual => JsValue::Bool(!loose_equal(left, right)),
        BinaryOp::StrictEqual => JsValue::Bool(strict_equal(left, right)),
        BinaryOp::StrictNotEqual => JsValue::Bool(!strict_equal(left, right)),
        BinaryOp::LessThan
        | BinaryOp::LessEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterEqual => {
            let ordering = match (left, right) {
                (JsValue::String(a), JsValue::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            let Some(ordering) = ordering else {
                return JsValue::Bool(false);
            };
            JsValue::Bool(match op {
                BinaryOp::LessThan => ordering.is_lt(),
                BinaryOp::LessEqual => ordering.is_le(),
                BinaryOp::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            })
        }
    }
}

/// The bundled [`ScriptBridge`]: parses and interprets each snippet afresh.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptEngine;

impl ScriptEngine {
    pub fn new() -> Self {
        ScriptEngine
    }
}

impl ScriptBridge for ScriptEngine {
    fn evaluate(&self, source: &ScriptSource, ctx: &ScriptContext) -> ScriptResult<Value> {
        trace!(%source, bindings = ctx.bindings.len(), "interpreting script");
        let mut parser = Parser::new(Lexer::new(source.text()))?;
        let mut interpreter = Interpreter::new(ctx);

        let result = match source {
            ScriptSource::Expression(_) => {
                let expr = parser.parse_expression_source()?;
                interpreter.eval(&expr)?
            }
            ScriptSource::Body(_) => {
                let body = parser.parse_body()?;
                match interpreter.exec_block(&body)? {
                    Flow::Return(value) => value,
                    Flow::Normal => JsValue::Undefined,
                }
            }
        };

        let mut exporter = Exporter {
            max_depth: ctx.max_depth,
            visiting: HashSet::new(),
        };
        exporter.export(&result, 0)
    }
}
