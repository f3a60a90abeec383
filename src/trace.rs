// Evaluation trace
//
// When a program is explained, the evaluator records one entry per node it
// actually evaluates, in post-order (children before parents). Nodes
// suppressed by short-circuiting or an untaken ternary branch never appear.

use serde::Serialize;

use crate::ast::Expr;
use crate::value::Value;

/// One step of an explained evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    /// Stable id of the AST node (parse order).
    pub id: u32,
    /// Node shape tag, e.g. "binary" or "call".
    pub kind: &'static str,
    /// Deterministic pretty-printed form of the node.
    pub expr: String,
    /// The value the node produced.
    pub value: Value,
}

/// Bounded trace buffer. Once full, further writes are silently dropped
/// while evaluation continues to completion.
pub(crate) struct Tracer {
    entries: Vec<TraceEntry>,
    limit: usize,
}

impl Tracer {
    pub fn new(limit: usize) -> Self {
        Tracer {
            entries: Vec::new(),
            limit,
        }
    }

    pub fn record(&mut self, expr: &Expr, value: &Value) {
        if self.entries.len() >= self.limit {
            return;
        }
        self.entries.push(TraceEntry {
            id: expr.id,
            kind: expr.kind_name(),
            expr: expr.pretty(),
            value: value.clone(),
        });
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}
