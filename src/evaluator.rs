// Expression evaluator
//
// Single-threaded depth-first tree walk with short-circuit && / || and
// lazy ternary branches. Missing keys, null receivers, and wrong-typed
// operands all degrade to undefined/false/NaN instead of raising; the
// only runtime errors are the call-depth cap, unknown or malformed
// callees, and regex compilation failures.

use indexmap::IndexMap;
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, ExprKind};
use crate::functions::{self, FunctionError};
use crate::trace::Tracer;
use crate::value::{format_number, Value};
use crate::Options;

/// Property names that can never be read through member or index access.
/// Lookups against them yield undefined, keeping the host's object graph
/// unobservable beyond the plain context data.
const POISON_KEYS: &[&str] = &["__proto__", "constructor", "prototype"];

/// Evaluation-phase errors.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Max call depth exceeded ({limit})")]
    MaxCallDepthExceeded { limit: usize },

    #[error("Function not allowed: {name}")]
    FunctionNotAllowed { name: String },

    #[error("Invalid function call target")]
    InvalidCallTarget,

    #[error("Invalid regular expression: {0}")]
    InvalidRegex(regex::Error),
}

impl From<FunctionError> for EvaluatorError {
    fn from(e: FunctionError) -> Self {
        match e {
            FunctionError::NotAllowed(name) => EvaluatorError::FunctionNotAllowed { name },
            FunctionError::InvalidRegex(e) => EvaluatorError::InvalidRegex(e),
        }
    }
}

/// Evaluation context: the read-only attribute bag supplied by the host.
///
/// Bare identifiers in an expression resolve against these top-level keys;
/// everything deeper is reached through member/index access or builtins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    bindings: IndexMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            bindings: IndexMap::new(),
        }
    }

    /// Bind a top-level name. Builder-style so contexts chain.
    pub fn bind(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Build a context from a JSON object string. Non-object JSON yields
    /// an empty context.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let value = Value::from_json_str(s)?;
        Ok(Self::from_value(value))
    }

    /// Build a context from a mapping value; anything else yields an
    /// empty context.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Context {
                bindings: map.as_ref().clone(),
            },
            _ => Context::new(),
        }
    }
}

impl From<IndexMap<String, Value>> for Context {
    fn from(bindings: IndexMap<String, Value>) -> Self {
        Context { bindings }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Context {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// Evaluator for compiled expressions.
///
/// Per-call scratch state: the borrowed context and options, the current
/// function-call depth, and an optional bounded trace buffer.
pub struct Evaluator<'a> {
    context: &'a Context,
    options: &'a Options,
    call_depth: usize,
    tracer: Option<Tracer>,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a Context, options: &'a Options) -> Self {
        Evaluator {
            context,
            options,
            call_depth: 0,
            tracer: None,
        }
    }

    /// An evaluator that records a post-order trace, bounded by
    /// `max_trace_entries`.
    pub fn with_trace(context: &'a Context, options: &'a Options) -> Self {
        Evaluator {
            context,
            options,
            call_depth: 0,
            tracer: Some(Tracer::new(options.max_trace_entries)),
        }
    }

    /// Take the recorded trace out of the evaluator.
    pub fn into_trace(self) -> Vec<crate::trace::TraceEntry> {
        self.tracer.map(Tracer::into_entries).unwrap_or_default()
    }

    /// Evaluate a node. Children record their trace entries inside the
    /// recursive call, so the buffer ends up in post-order.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, EvaluatorError> {
        let value = self.evaluate_inner(expr)?;
        if let Some(tracer) = &mut self.tracer {
            tracer.record(expr, &value);
        }
        Ok(value)
    }

    fn evaluate_inner(&mut self, expr: &Expr) -> Result<Value, EvaluatorError> {
        match &expr.kind {
            ExprKind::Literal(lit) => Ok(lit.to_value()),

            ExprKind::Identifier(name) => Ok(self
                .context
                .lookup(name)
                .cloned()
                .unwrap_or(Value::Undefined)),

            ExprKind::Member { object, property } => {
                let obj = self.evaluate(object)?;
                Ok(member_access(&obj, property))
            }

            ExprKind::Index { object, index } => {
                let obj = self.evaluate(object)?;
                let idx = self.evaluate(index)?;
                Ok(index_access(&obj, &idx))
            }

            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for elem in elements {
                    // Containers never hold the absent tag
                    values.push(match self.evaluate(elem)? {
                        Value::Undefined => Value::Null,
                        value => value,
                    });
                }
                Ok(Value::array(values))
            }

            ExprKind::Unary { operand } => {
                let value = self.evaluate(operand)?;
                Ok(Value::Bool(!is_truthy(&value)))
            }

            ExprKind::Binary { op, lhs, rhs } => self.evaluate_binary(*op, lhs, rhs),

            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                // Exactly one branch is evaluated (and traced)
                let cond = self.evaluate(condition)?;
                if is_truthy(&cond) {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            ExprKind::Call { callee, args } => self.evaluate_call(callee, args),
        }
    }

    fn evaluate_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Value, EvaluatorError> {
        // Short-circuit forms first: the right operand must not be
        // evaluated (or traced) when the left decides the outcome.
        match op {
            BinaryOp::And => {
                let left = self.evaluate(lhs)?;
                if !is_truthy(&left) {
                    return Ok(Value::Bool(false));
                }
                let right = self.evaluate(rhs)?;
                return Ok(Value::Bool(is_truthy(&right)));
            }
            BinaryOp::Or => {
                let left = self.evaluate(lhs)?;
                if is_truthy(&left) {
                    return Ok(Value::Bool(true));
                }
                let right = self.evaluate(rhs)?;
                return Ok(Value::Bool(is_truthy(&right)));
            }
            _ => {}
        }

        let left = self.evaluate(lhs)?;
        let right = self.evaluate(rhs)?;

        let result = match op {
            BinaryOp::Equal => Value::Bool(left == right),
            BinaryOp::NotEqual => Value::Bool(left != right),

            // Relational comparison coerces both sides to number; NaN
            // makes every comparison false.
            BinaryOp::LessThan => Value::Bool(to_number(&left) < to_number(&right)),
            BinaryOp::LessThanOrEqual => Value::Bool(to_number(&left) <= to_number(&right)),
            BinaryOp::GreaterThan => Value::Bool(to_number(&left) > to_number(&right)),
            BinaryOp::GreaterThanOrEqual => Value::Bool(to_number(&left) >= to_number(&right)),

            BinaryOp::Add => {
                if left.is_string() || right.is_string() {
                    let mut s = concat_string(&left);
                    s.push_str(&concat_string(&right));
                    Value::from(s)
                } else {
                    Value::Number(to_number(&left) + to_number(&right))
                }
            }

            BinaryOp::In => {
                let found = match &right {
                    Value::Array(arr) => arr.iter().any(|e| *e == left),
                    Value::String(haystack) => left
                        .as_str()
                        .is_some_and(|needle| haystack.contains(needle)),
                    Value::Object(map) => {
                        left.as_str().is_some_and(|key| map.contains_key(key))
                    }
                    _ => false,
                };
                Value::Bool(found)
            }

            // And/Or handled above
            BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled earlier"),
        };
        Ok(result)
    }

    fn evaluate_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EvaluatorError> {
        self.call_depth += 1;
        if self.call_depth > self.options.max_call_depth {
            self.call_depth -= 1;
            return Err(EvaluatorError::MaxCallDepthExceeded {
                limit: self.options.max_call_depth,
            });
        }
        let result = self.call_inner(callee, args);
        self.call_depth -= 1;
        result
    }

    fn call_inner(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EvaluatorError> {
        // Dispatch is by name only. A member-access callee resolves to its
        // property name and the receiver expression is never evaluated;
        // the language has no method dispatch.
        let name = match &callee.kind {
            ExprKind::Identifier(name) => name.as_str(),
            ExprKind::Member { property, .. } => property.as_str(),
            _ => return Err(EvaluatorError::InvalidCallTarget),
        };

        let mut argv = Vec::with_capacity(args.len());
        for arg in args {
            argv.push(self.evaluate(arg)?);
        }

        functions::dispatch(name, &argv).map_err(EvaluatorError::from)
    }
}

// ── Access helpers ───────────────────────────────────────────────────────────

/// Property access: null-safe and poison-key-safe. Absent keys and
/// non-mapping receivers yield undefined.
fn member_access(obj: &Value, property: &str) -> Value {
    if obj.is_null() || obj.is_undefined() {
        return Value::Undefined;
    }
    if POISON_KEYS.contains(&property) {
        return Value::Undefined;
    }
    obj.get(property).cloned().unwrap_or(Value::Undefined)
}

/// Computed access. Numbers index sequences (integral, in-range), strings
/// key into mappings through the poison filter; everything else yields
/// undefined.
fn index_access(obj: &Value, index: &Value) -> Value {
    if obj.is_null() || obj.is_undefined() {
        return Value::Undefined;
    }
    match index {
        Value::Number(n) => {
            if n.fract() != 0.0 || *n < 0.0 {
                return Value::Undefined;
            }
            obj.get_index(*n as usize).cloned().unwrap_or(Value::Undefined)
        }
        Value::String(key) => member_access(obj, key),
        _ => Value::Undefined,
    }
}

// ── Coercions ────────────────────────────────────────────────────────────────

/// Boolean coercion: null, undefined, false, 0, NaN, and the empty string
/// are falsy; everything else (including empty sequences and mappings) is
/// truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Undefined => false,
        Value::Bool(b) => *b,
        Value::Number(n) => !n.is_nan() && *n != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric coercion for relational operators and non-string addition.
/// Booleans become 0/1, strings parse as decimal after trimming, and
/// everything else (null, undefined, containers, unparsable text) is NaN.
fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// String coercion for `+` when either side is a string: null renders as
/// "null", undefined as the empty string, containers as compact JSON.
fn concat_string(value: &Value) -> String {
    match value {
        Value::Undefined => String::new(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.is_nan() {
                "NaN".to_string()
            } else if n.is_infinite() {
                if *n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
            } else {
                format_number(*n)
            }
        }
        Value::String(s) => s.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}
