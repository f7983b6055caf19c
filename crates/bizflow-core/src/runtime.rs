//! Execution context and `{{path}}` template resolution.
//!
//! The context maps each executed node id to `{ "output": <value> }`, so a
//! template reaches a previous node's output as `{{node_id.output.field}}`.
//! Later outputs of the same node replace earlier ones.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::NodeData;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder regex is valid"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionContext {
    outputs: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `output` as the latest output of `node_id`.
    pub fn record(&mut self, node_id: &str, output: Value) {
        let mut entry = Map::new();
        entry.insert("output".to_string(), output);
        self.outputs.insert(node_id.to_string(), Value::Object(entry));
    }

    pub fn output(&self, node_id: &str) -> Option<&Value> {
        self.outputs.get(node_id)?.get("output")
    }

    /// Dotted lookup (`a.b.0.c`). Numeric segments index into arrays.
    /// Returns `None` as soon as a segment does not exist.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.trim().split('.').map(str::trim);
        let first = segments.next().filter(|s| !s.is_empty())?;
        let mut current = self.outputs.get(first)?;
        for segment in segments {
            current = step_into(current, segment)?;
        }
        Some(current)
    }

    /// Replace every `{{path}}` with the value found in the context.
    /// Placeholders that do not resolve are left exactly as written.
    pub fn resolve_template(&self, template: &str) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match self.lookup(&caps[1]) {
                Some(value) => display_value(value),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Resolve templates in every string-valued field. Other values are
    /// copied unchanged.
    pub fn resolve_data(&self, data: &NodeData) -> NodeData {
        data.iter()
            .map(|(key, value)| {
                let resolved = match value {
                    Value::String(s) => Value::String(self.resolve_template(s)),
                    other => other.clone(),
                };
                (key.clone(), resolved)
            })
            .collect()
    }

    /// The whole context as one JSON object.
    pub fn as_value(&self) -> Value {
        Value::Object(self.outputs.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Whether `text` still contains a `{{...}}` placeholder.
pub fn has_placeholder(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

pub(crate) fn step_into<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Text form used when a value is spliced into a string. Strings are
/// inserted raw, integral numbers without a fraction, everything else as
/// compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(_) => value_as_f64(value)
            .map(format_number)
            .unwrap_or_else(|| value.to_string()),
        other => other.to_string(),
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A value is "empty" when it carries no meaningful content.
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Equality with light type coercion.
///
/// - `bool` == `"true"` / `"false"`
/// - `number` == `number` using f64 epsilon comparison
/// - `number` == numeric string
/// - arrays and objects compare structurally
pub(crate) fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::String(l), Value::String(r)) => l == r,
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_)) => {
            match (value_as_f64(left), value_as_f64(right)) {
                (Some(l), Some(r)) => (l - r).abs() < f64::EPSILON,
                _ => false,
            }
        }
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            if *b {
                s == "true"
            } else {
                s == "false"
            }
        }
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => left == right,
        _ => false,
    }
}

/// Numeric comparison with extraction from Number or parseable String.
pub(crate) fn compare_numbers(left: &Value, right: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (value_as_f64(left), value_as_f64(right)) {
        (Some(l), Some(r)) => cmp(l, r),
        _ => false,
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Substring test on the text forms of both values; arrays test membership.
pub(crate) fn string_contains(haystack: &Value, needle: &Value) -> bool {
    if let Value::Array(items) = haystack {
        return items.iter().any(|item| values_equal(item, needle));
    }
    display_value(haystack).contains(&display_value(needle))
}
