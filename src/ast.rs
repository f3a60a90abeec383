// Abstract Syntax Tree definitions
//
// Nodes are immutable after parse. Each carries a stable id assigned in
// parse order and the byte offset of the expression's first token; the id
// is what trace entries refer back to.

use serde::{Deserialize, Serialize};

use crate::value::{escape_json_string, format_number, Value};

/// An expression node: stable id, source byte offset, and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub id: u32,
    pub pos: usize,
    pub kind: ExprKind,
}

/// The closed set of expression shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Literal value: null, boolean, finite number, or string.
    Literal(Literal),

    /// Bare identifier resolved against the top-level context.
    Identifier(String),

    /// Property access (e.g. `saml.attributes`).
    Member {
        object: Box<Expr>,
        property: String,
    },

    /// Computed access (e.g. `groups[0]`, `attrs['urn:...:mail']`).
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// Function call. The callee must resolve to an allow-listed name at
    /// evaluation time; only identifier and member callees are callable.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },

    /// Boolean negation, the only unary operator.
    Unary {
        operand: Box<Expr>,
    },

    /// Binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    /// Array literal.
    Array(Vec<Expr>),

    /// Conditional (`cond ? then : else`).
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
}

/// Literal payloads, decoded at lex time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Literal {
    /// Materialize the literal as a runtime value.
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::string(s.as_str()),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Add,
    In,
}

impl BinaryOp {
    /// Source spelling of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::In => "in",
        }
    }
}

impl Expr {
    /// Short tag naming the node shape, used in trace entries.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Literal(_) => "literal",
            ExprKind::Identifier(_) => "identifier",
            ExprKind::Member { .. } => "member",
            ExprKind::Index { .. } => "index",
            ExprKind::Call { .. } => "call",
            ExprKind::Unary { .. } => "unary",
            ExprKind::Binary { .. } => "binary",
            ExprKind::Array(_) => "array",
            ExprKind::Ternary { .. } => "ternary",
        }
    }

    /// Deterministic pretty-printed form of the expression.
    ///
    /// Strings are JSON-quoted, numbers print in canonical decimal, binary
    /// and ternary nodes are parenthesized. The output is independent of
    /// the original source's whitespace.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out);
        out
    }

    fn write_pretty(&self, out: &mut String) {
        match &self.kind {
            ExprKind::Literal(Literal::Null) => out.push_str("null"),
            ExprKind::Literal(Literal::Bool(b)) => {
                out.push_str(if *b { "true" } else { "false" })
            }
            ExprKind::Literal(Literal::Number(n)) => out.push_str(&format_number(*n)),
            ExprKind::Literal(Literal::String(s)) => {
                out.push('"');
                out.push_str(&escape_json_string(s));
                out.push('"');
            }
            ExprKind::Identifier(name) => out.push_str(name),
            ExprKind::Member { object, property } => {
                object.write_pretty(out);
                out.push('.');
                out.push_str(property);
            }
            ExprKind::Index { object, index } => {
                object.write_pretty(out);
                out.push('[');
                index.write_pretty(out);
                out.push(']');
            }
            ExprKind::Call { callee, args } => {
                callee.write_pretty(out);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.write_pretty(out);
                }
                out.push(')');
            }
            ExprKind::Unary { operand } => {
                out.push('!');
                operand.write_pretty(out);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                out.push('(');
                lhs.write_pretty(out);
                out.push(' ');
                out.push_str(op.symbol());
                out.push(' ');
                rhs.write_pretty(out);
                out.push(')');
            }
            ExprKind::Array(elements) => {
                out.push('[');
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    elem.write_pretty(out);
                }
                out.push(']');
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push('(');
                condition.write_pretty(out);
                out.push_str(" ? ");
                then_branch.write_pretty(out);
                out.push_str(" : ");
                else_branch.write_pretty(out);
                out.push(')');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(id: u32, kind: ExprKind) -> Expr {
        Expr { id, pos: 0, kind }
    }

    #[test]
    fn test_literal_to_value() {
        assert_eq!(Literal::Null.to_value(), Value::Null);
        assert_eq!(Literal::Bool(true).to_value(), Value::Bool(true));
        assert_eq!(Literal::Number(2.5).to_value(), Value::Number(2.5));
        assert_eq!(
            Literal::String("x".to_string()).to_value(),
            Value::string("x")
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(expr(0, ExprKind::Literal(Literal::Null)).kind_name(), "literal");
        assert_eq!(
            expr(0, ExprKind::Identifier("x".to_string())).kind_name(),
            "identifier"
        );
        assert_eq!(expr(0, ExprKind::Array(vec![])).kind_name(), "array");
    }

    #[test]
    fn test_pretty_literals() {
        assert_eq!(expr(0, ExprKind::Literal(Literal::Null)).pretty(), "null");
        assert_eq!(expr(0, ExprKind::Literal(Literal::Bool(false))).pretty(), "false");
        assert_eq!(expr(0, ExprKind::Literal(Literal::Number(3.0))).pretty(), "3");
        assert_eq!(expr(0, ExprKind::Literal(Literal::Number(3.25))).pretty(), "3.25");
        assert_eq!(
            expr(0, ExprKind::Literal(Literal::String("a\"b".to_string()))).pretty(),
            "\"a\\\"b\""
        );
    }

    #[test]
    fn test_pretty_access_chain() {
        let chain = expr(
            2,
            ExprKind::Index {
                object: Box::new(expr(
                    1,
                    ExprKind::Member {
                        object: Box::new(expr(0, ExprKind::Identifier("saml".to_string()))),
                        property: "groups".to_string(),
                    },
                )),
                index: Box::new(expr(3, ExprKind::Literal(Literal::Number(0.0)))),
            },
        );
        assert_eq!(chain.pretty(), "saml.groups[0]");
    }

    #[test]
    fn test_pretty_call_and_operators() {
        let call = expr(
            1,
            ExprKind::Call {
                callee: Box::new(expr(0, ExprKind::Identifier("lower".to_string()))),
                args: vec![
                    expr(2, ExprKind::Identifier("a".to_string())),
                    expr(3, ExprKind::Literal(Literal::Number(1.0))),
                ],
            },
        );
        assert_eq!(call.pretty(), "lower(a, 1)");

        let bin = expr(
            2,
            ExprKind::Binary {
                op: BinaryOp::In,
                lhs: Box::new(expr(0, ExprKind::Literal(Literal::String("x".to_string())))),
                rhs: Box::new(expr(1, ExprKind::Identifier("groups".to_string()))),
            },
        );
        assert_eq!(bin.pretty(), "(\"x\" in groups)");

        let not = expr(
            1,
            ExprKind::Unary {
                operand: Box::new(expr(0, ExprKind::Identifier("ok".to_string()))),
            },
        );
        assert_eq!(not.pretty(), "!ok");
    }

    #[test]
    fn test_pretty_ternary_and_array() {
        let t = expr(
            3,
            ExprKind::Ternary {
                condition: Box::new(expr(0, ExprKind::Identifier("c".to_string()))),
                then_branch: Box::new(expr(1, ExprKind::Literal(Literal::Number(1.0)))),
                else_branch: Box::new(expr(2, ExprKind::Literal(Literal::Number(2.0)))),
            },
        );
        assert_eq!(t.pretty(), "(c ? 1 : 2)");

        let arr = expr(
            0,
            ExprKind::Array(vec![
                expr(1, ExprKind::Literal(Literal::Number(1.0))),
                expr(2, ExprKind::Literal(Literal::String("two".to_string()))),
            ]),
        );
        assert_eq!(arr.pretty(), "[1, \"two\"]");
    }
}
