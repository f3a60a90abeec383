// Built-in function implementations
//
// The allow-list is closed: any other callee name is rejected at dispatch.
// Builtins are deliberately lenient about argument types - a wrong-typed
// argument yields a pass-through value, false, or an empty result rather
// than an error, so sparse contexts on authentication paths never throw.
// The only runtime failures a builtin can raise are regex compilation
// errors inside `matches` and `regexReplace`.

use crate::value::{format_number, Value};
use thiserror::Error;

/// Function errors.
#[derive(Error, Debug)]
pub enum FunctionError {
    #[error("Function not allowed: {0}")]
    NotAllowed(String),

    #[error("Invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// Arity metadata for one builtin, shared with editor tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub min_args: usize,
    /// None means variadic.
    pub max_args: Option<usize>,
}

/// The closed allow-list with arities. `dispatch` accepts exactly these
/// names; extra arguments beyond `max_args` are ignored and missing ones
/// read as undefined.
pub const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec { name: "has", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "exists", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "size", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "first", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "last", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "collect", min_args: 1, max_args: None },
    FunctionSpec { name: "lower", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "upper", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "trim", min_args: 1, max_args: Some(1) },
    FunctionSpec { name: "contains", min_args: 2, max_args: Some(2) },
    FunctionSpec { name: "containsAny", min_args: 2, max_args: Some(2) },
    FunctionSpec { name: "startsWith", min_args: 2, max_args: Some(2) },
    FunctionSpec { name: "endsWith", min_args: 2, max_args: Some(2) },
    FunctionSpec { name: "matches", min_args: 2, max_args: Some(2) },
    FunctionSpec { name: "regexReplace", min_args: 3, max_args: Some(3) },
    FunctionSpec { name: "coalesce", min_args: 1, max_args: None },
    FunctionSpec { name: "join", min_args: 2, max_args: Some(2) },
    FunctionSpec { name: "split", min_args: 2, max_args: Some(2) },
];

/// Whether a name is on the allow-list.
pub fn is_allowed(name: &str) -> bool {
    FUNCTIONS.iter().any(|spec| spec.name == name)
}

/// Dispatch a call by name. Unknown names raise `NotAllowed`.
pub(crate) fn dispatch(name: &str, args: &[Value]) -> Result<Value, FunctionError> {
    match name {
        "has" | "exists" => Ok(sequence::exists(args)),
        "size" => Ok(sequence::size(args)),
        "first" => Ok(sequence::first(args)),
        "last" => Ok(sequence::last(args)),
        "collect" => Ok(sequence::collect(args)),
        "contains" => Ok(sequence::contains(args)),
        "containsAny" => Ok(sequence::contains_any(args)),
        "coalesce" => Ok(sequence::coalesce(args)),
        "join" => Ok(sequence::join(args)),
        "lower" => Ok(string::lower(args)),
        "upper" => Ok(string::upper(args)),
        "trim" => Ok(string::trim(args)),
        "startsWith" => Ok(string::starts_with(args)),
        "endsWith" => Ok(string::ends_with(args)),
        "split" => Ok(string::split(args)),
        "matches" => pattern::matches(args),
        "regexReplace" => pattern::regex_replace(args),
        _ => Err(FunctionError::NotAllowed(name.to_string())),
    }
}

static UNDEFINED: Value = Value::Undefined;

/// Argument accessor: missing positions read as undefined.
fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&UNDEFINED)
}

/// Stringification used by `join` for elements and separator: null and
/// undefined render as empty strings, containers as compact JSON.
fn join_string(value: &Value) -> String {
    match value {
        Value::Null | Value::Undefined => String::new(),
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

/// Sequence and presence helpers.
pub mod sequence {
    use super::*;

    /// has(x) / exists(x) - sequences test non-emptiness, everything else
    /// tests presence (not null, not undefined).
    pub fn exists(args: &[Value]) -> Value {
        let v = arg(args, 0);
        match v {
            Value::Array(arr) => Value::Bool(!arr.is_empty()),
            Value::Null | Value::Undefined => Value::Bool(false),
            _ => Value::Bool(true),
        }
    }

    /// size(x) - element count for sequences, scalar-value count for
    /// strings, key count for mappings, 0 for everything else.
    pub fn size(args: &[Value]) -> Value {
        let v = arg(args, 0);
        match v {
            Value::Array(arr) => Value::from(arr.len()),
            Value::String(s) => Value::from(s.chars().count()),
            Value::Object(map) => Value::from(map.len()),
            _ => Value::from(0),
        }
    }

    /// first(x) - head of a sequence (undefined when empty), pass-through
    /// otherwise.
    pub fn first(args: &[Value]) -> Value {
        let v = arg(args, 0);
        match v {
            Value::Array(arr) => arr.first().cloned().unwrap_or(Value::Undefined),
            other => other.clone(),
        }
    }

    /// last(x) - final element of a sequence (undefined when empty),
    /// pass-through otherwise.
    pub fn last(args: &[Value]) -> Value {
        let v = arg(args, 0);
        match v {
            Value::Array(arr) => arr.last().cloned().unwrap_or(Value::Undefined),
            other => other.clone(),
        }
    }

    /// collect(...) - normalize to a sequence: a lone sequence argument
    /// passes through, a lone scalar is wrapped, multiple arguments are
    /// gathered in order. Undefined arguments are stored as null so the
    /// absent tag never ends up inside a container.
    pub fn collect(args: &[Value]) -> Value {
        if args.len() == 1 {
            return match &args[0] {
                arr @ Value::Array(_) => arr.clone(),
                Value::Undefined => Value::array(vec![Value::Null]),
                other => Value::array(vec![other.clone()]),
            };
        }
        let elements = args
            .iter()
            .map(|v| match v {
                Value::Undefined => Value::Null,
                other => other.clone(),
            })
            .collect();
        Value::array(elements)
    }

    /// contains(haystack, needle) - deep-equality membership for
    /// sequences, substring test for string pairs, false otherwise.
    pub fn contains(args: &[Value]) -> Value {
        let haystack = arg(args, 0);
        let needle = arg(args, 1);
        let found = match (haystack, needle) {
            (Value::Array(arr), needle) => arr.iter().any(|e| e == needle),
            (Value::String(s), Value::String(sub)) => s.contains(&**sub),
            _ => false,
        };
        Value::Bool(found)
    }

    /// containsAny(haystack, candidates) - true when both are sequences
    /// and any candidate occurs in the haystack by deep equality.
    pub fn contains_any(args: &[Value]) -> Value {
        let found = match (arg(args, 0), arg(args, 1)) {
            (Value::Array(haystack), Value::Array(candidates)) => candidates
                .iter()
                .any(|c| haystack.iter().any(|h| h == c)),
            _ => false,
        };
        Value::Bool(found)
    }

    /// coalesce(...) - first argument that is neither null, undefined, nor
    /// an empty sequence; undefined when none qualifies.
    pub fn coalesce(args: &[Value]) -> Value {
        for v in args {
            match v {
                Value::Null | Value::Undefined => continue,
                Value::Array(arr) if arr.is_empty() => continue,
                other => return other.clone(),
            }
        }
        Value::Undefined
    }

    /// join(seq, sep) - elements stringified and joined. A string first
    /// argument passes through; any other non-sequence yields the empty
    /// string.
    pub fn join(args: &[Value]) -> Value {
        match arg(args, 0) {
            Value::Array(arr) => {
                let sep = join_string(arg(args, 1));
                let joined = arr
                    .iter()
                    .map(join_string)
                    .collect::<Vec<_>>()
                    .join(&sep);
                Value::from(joined)
            }
            Value::String(s) => Value::String(s.clone()),
            _ => Value::from(""),
        }
    }
}

/// String transforms.
pub mod string {
    use super::*;

    /// lower(s) - lowercased string, pass-through for non-strings.
    pub fn lower(args: &[Value]) -> Value {
        match arg(args, 0) {
            Value::String(s) => Value::from(s.to_lowercase()),
            other => other.clone(),
        }
    }

    /// upper(s) - uppercased string, pass-through for non-strings.
    pub fn upper(args: &[Value]) -> Value {
        match arg(args, 0) {
            Value::String(s) => Value::from(s.to_uppercase()),
            other => other.clone(),
        }
    }

    /// trim(s) - strips leading/trailing Unicode whitespace (str::trim),
    /// pass-through for non-strings.
    pub fn trim(args: &[Value]) -> Value {
        match arg(args, 0) {
            Value::String(s) => Value::from(s.trim()),
            other => other.clone(),
        }
    }

    /// startsWith(s, prefix) - false unless both are strings.
    pub fn starts_with(args: &[Value]) -> Value {
        let result = match (arg(args, 0), arg(args, 1)) {
            (Value::String(s), Value::String(prefix)) => s.starts_with(&**prefix),
            _ => false,
        };
        Value::Bool(result)
    }

    /// endsWith(s, suffix) - false unless both are strings.
    pub fn ends_with(args: &[Value]) -> Value {
        let result = match (arg(args, 0), arg(args, 1)) {
            (Value::String(s), Value::String(suffix)) => s.ends_with(&**suffix),
            _ => false,
        };
        Value::Bool(result)
    }

    /// split(s, sep) - split a string by a string separator; an empty
    /// separator splits into single characters. Anything else yields the
    /// empty sequence.
    pub fn split(args: &[Value]) -> Value {
        match (arg(args, 0), arg(args, 1)) {
            (Value::String(s), Value::String(sep)) => {
                let parts: Vec<Value> = if sep.is_empty() {
                    s.chars().map(|c| Value::from(c.to_string())).collect()
                } else {
                    s.split(&**sep).map(Value::from).collect()
                };
                Value::array(parts)
            }
            _ => Value::array(vec![]),
        }
    }
}

/// Regex-backed predicates and transforms. Patterns use the Rust `regex`
/// crate flavor and compile per call; a pattern that fails to compile is
/// the one case where a builtin raises.
pub mod pattern {
    use super::*;

    /// matches(s, pattern) - unanchored regex test; false unless both
    /// arguments are strings.
    pub fn matches(args: &[Value]) -> Result<Value, FunctionError> {
        match (arg(args, 0), arg(args, 1)) {
            (Value::String(s), Value::String(pat)) => {
                let re = regex::Regex::new(pat)?;
                Ok(Value::Bool(re.is_match(s)))
            }
            _ => Ok(Value::Bool(false)),
        }
    }

    /// regexReplace(s, pattern, replacement) - global replace; the
    /// replacement may reference capture groups as $1, $2, … The first
    /// argument passes through unless all three are strings.
    pub fn regex_replace(args: &[Value]) -> Result<Value, FunctionError> {
        match (arg(args, 0), arg(args, 1), arg(args, 2)) {
            (Value::String(s), Value::String(pat), Value::String(replacement)) => {
                let re = regex::Regex::new(pat)?;
                Ok(Value::from(re.replace_all(s, &**replacement).into_owned()))
            }
            (first, _, _) => Ok(first.clone()),
        }
    }
}
