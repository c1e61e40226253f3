//! Bundled expression evaluator.
//!
//! `BasicExecer` evaluates a small comparison/membership language over
//! dotted JSON paths, e.g. `input.day <= 3 && input.kind == "annual"` for
//! guards and `[input.bzr, "F009"]` for candidate lists. Paths resolve
//! against the routing data context; missing paths read as `null`.
//! Predefined variables injected at construction are visible to every
//! expression under their own top-level names.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use super::Execer;
use crate::error::FlowError;

pub struct BasicExecer {
    predefined: Map<String, Value>,
}

impl BasicExecer {
    pub fn new() -> Self {
        Self {
            predefined: Map::new(),
        }
    }

    /// Inject a named variable visible to every expression (constant
    /// lookup tables, helper data).
    pub fn with_var(mut self, name: impl Into<String>, value: Value) -> Self {
        self.predefined.insert(name.into(), value);
        self
    }

    fn scope(&self, ctx: &Value) -> Value {
        if self.predefined.is_empty() {
            return ctx.clone();
        }
        let mut merged = self.predefined.clone();
        if let Value::Object(fields) = ctx {
            for (k, v) in fields {
                merged.insert(k.clone(), v.clone());
            }
        }
        Value::Object(merged)
    }
}

impl Default for BasicExecer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Execer for BasicExecer {
    async fn exec_bool(
        &self,
        expression: &str,
        ctx: &Value,
        cancel: &CancellationToken,
    ) -> Result<bool, FlowError> {
        let scope = self.scope(ctx);
        let exp = expression.to_string();
        run_guarded(expression, cancel, move || eval_bool(&exp, &scope)).await
    }

    async fn exec_strings(
        &self,
        expression: &str,
        ctx: &Value,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, FlowError> {
        let scope = self.scope(ctx);
        let exp = expression.to_string();
        run_guarded(expression, cancel, move || eval_strings(&exp, &scope)).await
    }
}

/// Run the evaluation off the caller and race it against the token.
async fn run_guarded<T, F>(
    expression: &str,
    cancel: &CancellationToken,
    eval: F,
) -> Result<T, FlowError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, FlowError> + Send + 'static,
{
    let label = expression.to_string();
    let handle = tokio::task::spawn_blocking(eval);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FlowError::ExpressionCancelled(label)),
        joined = handle => match joined {
            Ok(result) => result,
            Err(e) => Err(FlowError::expression(label, e)),
        },
    }
}

// ================================
// Boolean expressions
// ================================

fn eval_bool(exp: &str, scope: &Value) -> Result<bool, FlowError> {
    if exp.trim().is_empty() {
        return Err(FlowError::expression(exp, "empty expression"));
    }
    for or_part in split_top(exp, "||") {
        let mut all = true;
        for and_part in split_top(or_part, "&&") {
            if !eval_atom(and_part, scope, exp)? {
                all = false;
                break;
            }
        }
        if all {
            return Ok(true);
        }
    }
    Ok(false)
}

fn eval_atom(atom: &str, scope: &Value, whole: &str) -> Result<bool, FlowError> {
    if let Some((lhs, op, rhs)) = find_comparison(atom) {
        let left = eval_operand(lhs, scope, whole)?;
        let right = eval_operand(rhs, scope, whole)?;
        return compare(&left, op, &right, whole);
    }
    let value = eval_operand(atom, scope, whole)?;
    Ok(truthy(&value))
}

/// Locate the top-level comparison operator, if any.
fn find_comparison(atom: &str) -> Option<(&str, &str, &str)> {
    let bytes = atom.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                for op in ["==", "!=", ">=", "<="] {
                    if atom[i..].starts_with(op) {
                        return Some((&atom[..i], op, &atom[i + 2..]));
                    }
                }
                if (b == b'>' || b == b'<') && bytes.get(i + 1) != Some(&b'=') {
                    return Some((&atom[..i], &atom[i..i + 1], &atom[i + 1..]));
                }
                if atom[i..].starts_with(" contains ") {
                    return Some((&atom[..i], "contains", &atom[i + 10..]));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split at top level on a separator, honoring quotes and brackets.
fn split_top<'a>(exp: &'a str, sep: &str) -> Vec<&'a str> {
    let bytes = exp.as_bytes();
    let mut parts = Vec::new();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'[' | b'(' => depth += 1,
            b']' | b')' => depth = depth.saturating_sub(1),
            _ if depth == 0 && exp[i..].starts_with(sep) => {
                parts.push(&exp[start..i]);
                i += sep.len();
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&exp[start..]);
    parts
}

// ================================
// Operands
// ================================

fn eval_operand(raw: &str, scope: &Value, whole: &str) -> Result<Value, FlowError> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(FlowError::expression(whole, "missing operand"));
    }
    if (token.starts_with('"') && token.ends_with('"') && token.len() >= 2)
        || (token.starts_with('\'') && token.ends_with('\'') && token.len() >= 2)
    {
        return Ok(Value::String(token[1..token.len() - 1].to_string()));
    }
    if token.starts_with('[') && token.ends_with(']') {
        let inner = &token[1..token.len() - 1];
        let mut items = Vec::new();
        if !inner.trim().is_empty() {
            for part in split_top(inner, ",") {
                items.push(eval_operand(part, scope, whole)?);
            }
        }
        return Ok(Value::Array(items));
    }
    match token {
        "true" => return Ok(Value::Bool(true)),
        "false" => return Ok(Value::Bool(false)),
        "null" => return Ok(Value::Null),
        _ => {}
    }
    if token.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return serde_json::from_str::<Value>(token)
            .map_err(|_| FlowError::expression(whole, format!("bad number `{token}`")));
    }
    if token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Ok(lookup_path(token, scope));
    }
    Err(FlowError::expression(
        whole,
        format!("unsupported token `{token}`"),
    ))
}

/// Walk a dotted path through the scope; anything missing reads as null.
fn lookup_path(path: &str, scope: &Value) -> Value {
    let mut current = scope;
    for key in path.split('.') {
        match current.get(key) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

// ================================
// Comparison with type coercion
// ================================

fn compare(left: &Value, op: &str, right: &Value, whole: &str) -> Result<bool, FlowError> {
    match op {
        "==" => Ok(loose_equal(left, right)),
        "!=" => Ok(!loose_equal(left, right)),
        ">" => numeric(left, right, whole, |a, b| a > b),
        "<" => numeric(left, right, whole, |a, b| a < b),
        ">=" => numeric(left, right, whole, |a, b| a >= b),
        "<=" => numeric(left, right, whole, |a, b| a <= b),
        "contains" => Ok(contains(left, right)),
        _ => Err(FlowError::expression(
            whole,
            format!("unknown operator `{op}`"),
        )),
    }
}

fn numeric<F>(left: &Value, right: &Value, whole: &str, cmp: F) -> Result<bool, FlowError>
where
    F: Fn(f64, f64) -> bool,
{
    Ok(cmp(to_f64(left, whole)?, to_f64(right, whole)?))
}

fn to_f64(value: &Value, whole: &str) -> Result<f64, FlowError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| FlowError::expression(whole, "number out of range")),
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|_| FlowError::expression(whole, format!("`{s}` is not a number"))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(0.0),
        other => Err(FlowError::expression(
            whole,
            format!("cannot convert {other} to number"),
        )),
    }
}

fn loose_equal(left: &Value, right: &Value) -> bool {
    if left == right {
        return true;
    }
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            match s.parse::<f64>() {
                Ok(parsed) => Some(parsed) == n.as_f64(),
                Err(_) => false,
            }
        }
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            match s.to_lowercase().as_str() {
                "true" => *b,
                "false" => !*b,
                _ => false,
            }
        }
        _ => false,
    }
}

fn contains(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::String(s), Value::String(t)) => s.contains(t.as_str()),
        (Value::String(s), Value::Number(n)) => s.contains(&n.to_string()),
        (Value::Array(arr), t) => arr.iter().any(|item| loose_equal(item, t)),
        _ => false,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

// ================================
// String-list expressions
// ================================

fn eval_strings(exp: &str, scope: &Value) -> Result<Vec<String>, FlowError> {
    let value = eval_operand(exp, scope, exp)?;
    Ok(flatten_strings(&value))
}

fn flatten_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Null => vec![],
        Value::Array(arr) => arr.iter().flat_map(flatten_strings).collect(),
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Object(_) => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scope() -> Value {
        json!({
            "input": {"day": 2, "action": "pass", "bzr": "F002", "tags": ["a", "b"]},
            "flow": {"launcher": "F001"},
            "node": {"record_id": "ni-1"},
        })
    }

    fn exec() -> BasicExecer {
        BasicExecer::new()
    }

    async fn check_bool(exp: &str) -> Result<bool, FlowError> {
        exec()
            .exec_bool(exp, &scope(), &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn test_numeric_comparisons() {
        assert!(check_bool("input.day <= 3").await.unwrap());
        assert!(check_bool("input.day > 1").await.unwrap());
        assert!(!check_bool("input.day >= 5").await.unwrap());
        assert!(check_bool("input.day < 3").await.unwrap());
    }

    #[tokio::test]
    async fn test_string_equality() {
        assert!(check_bool("input.action == \"pass\"").await.unwrap());
        assert!(check_bool("input.action != 'reject'").await.unwrap());
        assert!(!check_bool("input.action == \"reject\"").await.unwrap());
    }

    #[tokio::test]
    async fn test_cross_type_equality() {
        assert!(check_bool("input.day == \"2\"").await.unwrap());
        assert!(check_bool("\"2\" == input.day").await.unwrap());
    }

    #[tokio::test]
    async fn test_logical_operators() {
        assert!(check_bool("input.day <= 3 && input.action == \"pass\"")
            .await
            .unwrap());
        assert!(check_bool("input.day > 5 || input.action == \"pass\"")
            .await
            .unwrap());
        assert!(!check_bool("input.day > 5 && input.action == \"pass\"")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_path_reads_null() {
        assert!(!check_bool("input.unknown == \"x\"").await.unwrap());
        assert!(check_bool("input.unknown == null").await.unwrap());
    }

    #[tokio::test]
    async fn test_truthy_bare_path() {
        assert!(check_bool("input.action").await.unwrap());
        assert!(!check_bool("input.unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_contains() {
        assert!(check_bool("input.tags contains \"a\"").await.unwrap());
        assert!(!check_bool("input.tags contains \"z\"").await.unwrap());
        assert!(check_bool("input.action contains \"as\"").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_expression_errors() {
        assert!(check_bool("input.day <=").await.is_err());
        assert!(check_bool("@@@").await.is_err());
        assert!(check_bool("").await.is_err());
        // Non-numeric operand under a numeric comparison is a fault,
        // never "false".
        assert!(check_bool("input.action > 3").await.is_err());
    }

    #[tokio::test]
    async fn test_string_list() {
        let got = exec()
            .exec_strings("[input.bzr, \"F009\"]", &scope(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got, vec!["F002", "F009"]);
    }

    #[tokio::test]
    async fn test_string_list_single_path() {
        let got = exec()
            .exec_strings("input.bzr", &scope(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got, vec!["F002"]);
        let got = exec()
            .exec_strings("input.tags", &scope(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_string_list_missing_is_empty() {
        let got = exec()
            .exec_strings("input.nobody", &scope(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_predefined_vars() {
        let execer = BasicExecer::new().with_var("env", json!({"region": "cn"}));
        let ok = execer
            .exec_bool("env.region == \"cn\"", &scope(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = exec()
            .exec_bool("input.day <= 3", &scope(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::ExpressionCancelled(_)));
    }
}
