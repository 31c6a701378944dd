//! `ifStringOps` methods on `roString`
//!
//! Positions and lengths count characters, not bytes.

use super::{array, boxed};
use crate::error::EvalError;
use crate::eval::Interpreter;
use crate::value::{Callable, MethodFn, Object, Param, Signature, Value, ValueKind};

pub(super) fn methods() -> Vec<Callable> {
    use ValueKind as K;
    let m = |name: &str, params: Vec<Param>, returns: ValueKind, f: MethodFn| {
        Callable::method(name, Signature::new(params, returns), f)
    };
    vec![
        m("len", vec![], K::Int32, len),
        m("left", vec![Param::required("count", K::Int32)], K::String, left),
        m("right", vec![Param::required("count", K::Int32)], K::String, right),
        m(
            "mid",
            vec![
                Param::required("start", K::Int32),
                Param::optional("count", K::Dynamic, Value::Invalid),
            ],
            K::String,
            mid,
        ),
        m(
            "instr",
            vec![
                Param::required("first", K::Dynamic),
                Param::optional("second", K::Dynamic, Value::Invalid),
            ],
            K::Int32,
            instr,
        ),
        m(
            "replace",
            vec![Param::required("from", K::String), Param::required("to", K::String)],
            K::String,
            replace,
        ),
        m("split", vec![Param::required("separator", K::String)], K::Object, split),
        m("tokenize", vec![Param::required("delimiters", K::String)], K::Object, tokenize),
        m("trim", vec![], K::String, trim),
        m("toInt", vec![], K::Int32, to_int),
        m("toFloat", vec![], K::Float, to_float),
        m("ucase", vec![], K::String, ucase),
        m("lcase", vec![], K::String, lcase),
        m("toUpper", vec![], K::String, ucase),
        m("toLower", vec![], K::String, lcase),
        m("startsWith", vec![Param::required("prefix", K::String)], K::Boolean, starts_with),
        m("endsWith", vec![Param::required("suffix", K::String)], K::Boolean, ends_with),
        m("isEmpty", vec![], K::Boolean, is_empty),
        m(
            "appendString",
            vec![Param::required("text", K::String), Param::required("count", K::Int32)],
            K::Void,
            append_string,
        ),
    ]
}

fn text(this: &Object) -> Result<String, EvalError> {
    match boxed::inner(this)? {
        Value::String(s) => Ok(s.to_string()),
        other => Ok(other.to_string()),
    }
}

fn int_arg(args: &[Value], i: usize) -> i64 {
    args.get(i).and_then(Value::to_i64).unwrap_or(0)
}

fn str_arg(args: &[Value], i: usize) -> &str {
    args.get(i).and_then(Value::as_str).unwrap_or_default()
}

fn take_chars(s: &str, skip: usize, count: usize) -> String {
    s.chars().skip(skip).take(count).collect()
}

fn len(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Int32(text(this)?.chars().count() as i32))
}

fn left(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let count = int_arg(args, 0).max(0) as usize;
    Ok(Value::from(take_chars(&text(this)?, 0, count)))
}

fn right(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let s = text(this)?;
    let total = s.chars().count();
    let count = (int_arg(args, 0).max(0) as usize).min(total);
    Ok(Value::from(take_chars(&s, total - count, count)))
}

fn mid(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let s = text(this)?;
    let start = int_arg(args, 0).max(0) as usize;
    let count = match args.get(1) {
        Some(v) if !v.is_invalid() => v.to_i64().unwrap_or(0).max(0) as usize,
        _ => usize::MAX,
    };
    Ok(Value::from(take_chars(&s, start, count)))
}

/// `instr(substring)` or `instr(start, substring)`; zero-based, -1 when
/// not found.
fn instr(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let s = text(this)?;
    let (start, needle) = match (args.first(), args.get(1)) {
        (Some(start), Some(Value::String(needle))) => (start.to_i64().unwrap_or(0).max(0) as usize, needle.to_string()),
        (Some(Value::String(needle)), _) => (0, needle.to_string()),
        _ => return Err(EvalError::type_mismatch("instr expects a substring")),
    };
    let chars: Vec<char> = s.chars().collect();
    let needle: Vec<char> = needle.chars().collect();
    if start > chars.len() {
        return Ok(Value::Int32(-1));
    }
    let found = (start..=chars.len().saturating_sub(needle.len()))
        .find(|&i| chars.get(i..i + needle.len()) == Some(&needle[..]));
    Ok(Value::Int32(found.map_or(-1, |i| i as i32)))
}

fn replace(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let s = text(this)?;
    let from = str_arg(args, 0);
    if from.is_empty() {
        return Ok(Value::from(s));
    }
    Ok(Value::from(s.replace(from, str_arg(args, 1))))
}

fn split(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let s = text(this)?;
    let separator = str_arg(args, 0);
    let parts: Vec<Value> = if separator.is_empty() {
        s.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        s.split(separator).map(Value::from).collect()
    };
    Ok(array::new_value(parts))
}

fn tokenize(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let s = text(this)?;
    let delimiters: Vec<char> = str_arg(args, 0).chars().collect();
    let tokens = s
        .split(|c| delimiters.contains(&c))
        .filter(|t| !t.is_empty())
        .map(Value::from)
        .collect();
    Ok(array::new_value(tokens))
}

fn trim(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::from(text(this)?.trim()))
}

/// Leading numeric prefix of a string, as `Val()` reads it.
pub(crate) fn parse_number_prefix(s: &str) -> f64 {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    let bytes = s.as_bytes();
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    if !seen_digit {
        return 0.0;
    }
    s[..end].parse().unwrap_or(0.0)
}

fn to_int(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Int32(parse_number_prefix(&text(this)?).trunc() as i32))
}

fn to_float(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Float(parse_number_prefix(&text(this)?) as f32))
}

fn ucase(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::from(text(this)?.to_uppercase()))
}

fn lcase(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::from(text(this)?.to_lowercase()))
}

fn starts_with(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(text(this)?.starts_with(str_arg(args, 0))))
}

fn ends_with(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(text(this)?.ends_with(str_arg(args, 0))))
}

fn is_empty(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(text(this)?.is_empty()))
}

fn append_string(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let mut s = text(this)?;
    let count = int_arg(args, 1).max(0) as usize;
    s.push_str(&take_chars(str_arg(args, 0), 0, count));
    boxed::replace(this, Value::from(s))?;
    Ok(Value::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_prefix() {
        assert_eq!(parse_number_prefix("42abc"), 42.0);
        assert_eq!(parse_number_prefix("  -3.5"), -3.5);
        assert_eq!(parse_number_prefix("abc"), 0.0);
        assert_eq!(parse_number_prefix("1.2.3"), 1.2);
    }

    #[test]
    fn test_take_chars_counts_characters() {
        assert_eq!(take_chars("héllo", 1, 3), "éll");
    }
}
