// cel-lite - Sandboxed expression engine for identity-provider policy rules
// Copyright (c) 2026 cel-lite contributors
// Licensed under the MIT License

//! # cel-lite
//!
//! A compact, sandboxed expression language for identity-provider attribute
//! mapping, group-assignment rules, and policy preconditions. Host
//! applications compile an administrator-authored expression once, then
//! evaluate it against read-only context maps to obtain a deterministic
//! value — optionally with a step-by-step trace.
//!
//! ```
//! use cel_lite::{compile, Context, cel};
//!
//! let program = compile("has(saml.mail) ? lower(first(saml.mail)) : 'n/a'").unwrap();
//! let context = Context::new().bind("saml", cel!({"mail": ["USER@EXAMPLE.COM"]}));
//! let result = program.eval(&context).unwrap();
//! assert_eq!(result, cel!("user@example.com"));
//! ```
//!
//! ## Architecture
//!
//! - `parser` - Lexer and recursive-descent parser (expression → AST)
//! - `ast` - Expression nodes with stable ids and the pretty-printer
//! - `evaluator` - Tree-walking evaluator with short-circuit semantics
//! - `functions` - The closed builtin allow-list
//! - `trace` - Bounded post-order evaluation trace
//! - `value` - Tagged runtime value with an explicit undefined
//!
//! ## Sandbox guarantees
//!
//! Expressions cannot loop, define functions, mutate anything, perform
//! I/O, observe time or randomness, or reach host objects: identifiers
//! resolve only against the supplied context, property access filters the
//! poison keys `__proto__`/`constructor`/`prototype`, and total work is
//! bounded by the compile-time node cap and the runtime call-depth cap.
//! Missing keys and wrong-typed operands degrade to undefined/false
//! rather than raising, so sparse contexts on authentication paths never
//! throw.
//!
//! ## Regex flavor
//!
//! `matches` and `regexReplace` use the Rust [`regex`] crate: RE2-style
//! syntax with no backreferences or lookaround. Replacement strings may
//! reference capture groups as `$1`, `$2`, …

use serde::Deserialize;
use thiserror::Error;

pub mod ast;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod trace;
pub mod value;

pub use evaluator::{Context, EvaluatorError};
pub use functions::{FunctionSpec, FUNCTIONS};
pub use parser::ParserError;
pub use trace::TraceEntry;
pub use value::Value;

/// Resource limits applied at compile and evaluation time.
///
/// Deserializable so hosts can load overrides from configuration; omitted
/// fields keep their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    /// Longest accepted source, in bytes. Checked before lexing.
    pub max_expression_length: usize,
    /// Largest accepted AST; the parser aborts beyond this.
    pub max_ast_nodes: usize,
    /// Deepest allowed function-call nesting during evaluation.
    pub max_call_depth: usize,
    /// Trace entries recorded by `explain` before silently dropping.
    pub max_trace_entries: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_expression_length: 4096,
            max_ast_nodes: 2000,
            max_call_depth: 50,
            max_trace_entries: 5000,
        }
    }
}

/// Top-level error: a compile-phase or evaluation-phase failure.
#[derive(Error, Debug)]
pub enum CelError {
    #[error(transparent)]
    Parse(#[from] ParserError),

    #[error(transparent)]
    Eval(#[from] EvaluatorError),
}

impl CelError {
    /// Byte offset into the source, for compile-phase errors that have one.
    pub fn position(&self) -> Option<usize> {
        match self {
            CelError::Parse(e) => e.position(),
            CelError::Eval(_) => None,
        }
    }
}

/// A compiled expression: source text, immutable AST, and the resolved
/// option set.
///
/// Programs are immutable and `Send + Sync`; one program may be evaluated
/// concurrently against independent contexts.
///
/// # Examples
///
/// ```
/// use cel_lite::{compile, Context, cel};
///
/// // Compile once
/// let program = compile("'student' in affiliations").unwrap();
///
/// // Evaluate many times
/// let ctx = Context::new().bind("affiliations", cel!(["member", "student"]));
/// assert_eq!(program.eval(&ctx).unwrap(), cel!(true));
///
/// let ctx = Context::new().bind("affiliations", cel!(["staff"]));
/// assert_eq!(program.eval(&ctx).unwrap(), cel!(false));
/// ```
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    root: ast::Expr,
    options: Options,
}

impl Program {
    /// The original expression text, exactly as compiled.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The option set this program was compiled with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The root of the parsed expression.
    pub fn root(&self) -> &ast::Expr {
        &self.root
    }

    /// Evaluate against a context and return the resulting value.
    pub fn eval(&self, context: &Context) -> Result<Value, CelError> {
        let mut evaluator = evaluator::Evaluator::new(context, &self.options);
        evaluator.evaluate(&self.root).map_err(CelError::from)
    }

    /// Evaluate with tracing. The trace holds one post-order entry per
    /// node actually evaluated; if evaluation fails mid-walk, the trace
    /// still contains everything recorded before the failing node.
    pub fn explain(&self, context: &Context) -> Explanation {
        let mut evaluator = evaluator::Evaluator::with_trace(context, &self.options);
        let result = evaluator.evaluate(&self.root).map_err(CelError::from);
        Explanation {
            result,
            trace: evaluator.into_trace(),
        }
    }
}

/// Outcome of an explained evaluation: the result (or the error that
/// interrupted it) plus the recorded trace.
#[derive(Debug)]
pub struct Explanation {
    pub result: Result<Value, CelError>,
    pub trace: Vec<TraceEntry>,
}

/// Compile an expression with default options.
///
/// # Errors
///
/// Returns a compile-phase error when the source is too long, fails to
/// lex or parse, or exceeds the node cap.
pub fn compile(source: &str) -> Result<Program, CelError> {
    compile_with_options(source, Options::default())
}

/// Compile an expression with explicit options.
pub fn compile_with_options(source: &str, options: Options) -> Result<Program, CelError> {
    if source.len() > options.max_expression_length {
        return Err(ParserError::ExpressionTooLong {
            length: source.len(),
            limit: options.max_expression_length,
        }
        .into());
    }
    let root = parser::parse(source, options.max_ast_nodes)?;
    Ok(Program {
        source: source.to_string(),
        root,
        options,
    })
}

/// Compile and evaluate in one step.
///
/// For repeated evaluations of the same expression, use [`compile`] and
/// keep the [`Program`].
pub fn evaluate(source: &str, context: &Context) -> Result<Value, CelError> {
    compile(source)?.eval(context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_preserves_source() {
        let source = "  has( saml.mail )  ";
        let program = compile(source).unwrap();
        assert_eq!(program.source(), source);
    }

    #[test]
    fn test_compile_rejects_long_source() {
        let options = Options {
            max_expression_length: 10,
            ..Options::default()
        };
        let err = compile_with_options("1 + 2 + 3 + 4", options).unwrap_err();
        assert!(matches!(
            err,
            CelError::Parse(ParserError::ExpressionTooLong { length: 13, limit: 10 })
        ));
        assert!(compile_with_options("1 + 2", options).is_ok());
    }

    #[test]
    fn test_compile_rejects_complex_source() {
        let options = Options {
            max_ast_nodes: 4,
            ..Options::default()
        };
        assert!(matches!(
            compile_with_options("1 + 2 + 3 + 4", options).unwrap_err(),
            CelError::Parse(ParserError::TooComplex { limit: 4 })
        ));
    }

    #[test]
    fn test_one_shot_evaluate() {
        let ctx = Context::new().bind("n", cel!(2));
        assert_eq!(evaluate("n + 1", &ctx).unwrap(), cel!(3));
    }

    #[test]
    fn test_error_positions() {
        let err = compile("1 + @").unwrap_err();
        assert_eq!(err.position(), Some(4));

        let ctx = Context::new();
        let err = compile("nope(1)").unwrap().eval(&ctx).unwrap_err();
        assert_eq!(err.position(), None);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: Options = serde_json::from_str(r#"{"maxCallDepth": 5}"#).unwrap();
        assert_eq!(options.max_call_depth, 5);
        assert_eq!(options.max_expression_length, 4096);
        assert_eq!(options.max_ast_nodes, 2000);
        assert_eq!(options.max_trace_entries, 5000);
    }

    #[test]
    fn test_program_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Program>();
        assert_send_sync::<Value>();
    }

    #[test]
    fn test_explain_matches_eval() {
        let program = compile("1 + 2 == 3 ? 'yes' : 'no'").unwrap();
        let ctx = Context::new();
        let explanation = program.explain(&ctx);
        assert_eq!(explanation.result.unwrap(), program.eval(&ctx).unwrap());
        assert!(!explanation.trace.is_empty());
    }
}
