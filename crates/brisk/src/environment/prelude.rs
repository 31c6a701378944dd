//! Standard prelude with built-in functions

use std::rc::Rc;
use std::time::Duration;

use super::Environment;
use crate::component::{self, array, assoc_array, boxed, parse_number_prefix};
use crate::error::{EvalError, RuntimeErrorDetail};
use crate::eval::Interpreter;
use crate::value::json::{from_json, to_json};
use crate::value::{Callable, Param, Signature, Value, ValueKind};

impl Environment {
    /// Create an environment with the built-in functions loaded.
    pub fn with_prelude() -> Self {
        let mut env = Self::new();
        env.load_prelude();
        env
    }

    /// Load the built-in functions as globals.
    pub fn load_prelude(&mut self) {
        use ValueKind as K;
        let sig = |params: Vec<Param>, returns: ValueKind| Signature::new(params, returns);
        let req = Param::required;

        // Objects and interfaces
        self.define_function(Callable::native(
            "GetInterface",
            sig(vec![req("object", K::Dynamic), req("ifname", K::String)], K::Dynamic),
            |_, args| Ok(component::get_interface(&args[0], str_arg(args, 1))),
        ));
        self.define_function(Callable::native(
            "FindMemberFunction",
            sig(vec![req("object", K::Dynamic), req("funName", K::String)], K::Dynamic),
            |_, args| Ok(component::find_member_function(&args[0], str_arg(args, 1))),
        ));
        self.define_function(Callable::native(
            "Box",
            sig(vec![req("value", K::Dynamic)], K::Object),
            |_, args| Ok(boxed::box_value(&args[0]).map_or_else(|| args[0].clone(), Value::Object)),
        ));
        self.define_function(Callable::native(
            "CreateObject",
            Signature {
                params: vec![req("name", K::String)],
                returns: K::Dynamic,
                variadic: true,
            },
            builtin_create_object,
        ));
        self.define_function(Callable::native(
            "Type",
            sig(
                vec![req("value", K::Dynamic), Param::optional("version", K::Int32, Value::Int32(2))],
                K::String,
            ),
            |_, args| Ok(Value::from(args[0].type_name())),
        ));
        self.define_function(Callable::native("GetGlobalAA", sig(vec![], K::Object), |interp, _| {
            Ok(Value::Object(Rc::clone(interp.env().global_aa())))
        }));

        // Strings
        self.define_function(Callable::native("Len", sig(vec![req("s", K::String)], K::Int32), |_, args| {
            Ok(Value::Int32(str_arg(args, 0).chars().count() as i32))
        }));
        self.define_function(Callable::native("UCase", sig(vec![req("s", K::String)], K::String), |_, args| {
            Ok(Value::from(str_arg(args, 0).to_uppercase()))
        }));
        self.define_function(Callable::native("LCase", sig(vec![req("s", K::String)], K::String), |_, args| {
            Ok(Value::from(str_arg(args, 0).to_lowercase()))
        }));
        self.define_function(Callable::native(
            "Left",
            sig(vec![req("s", K::String), req("n", K::Int32)], K::String),
            |_, args| Ok(Value::from(chars(str_arg(args, 0), 0, int_arg(args, 1)))),
        ));
        self.define_function(Callable::native(
            "Right",
            sig(vec![req("s", K::String), req("n", K::Int32)], K::String),
            |_, args| {
                let s = str_arg(args, 0);
                let len = s.chars().count() as i64;
                let n = int_arg(args, 1).clamp(0, len);
                Ok(Value::from(chars(s, len - n, n)))
            },
        ));
        self.define_function(Callable::native(
            "Mid",
            sig(
                vec![req("s", K::String), req("p", K::Int32), Param::optional("n", K::Int32, Value::Int32(i32::MAX))],
                K::String,
            ),
            |_, args| Ok(Value::from(chars(str_arg(args, 0), int_arg(args, 1) - 1, int_arg(args, 2)))),
        ));
        self.define_function(Callable::native(
            "Instr",
            sig(vec![req("start", K::Int32), req("text", K::String), req("substring", K::String)], K::Int32),
            |_, args| Ok(Value::Int32(instr(int_arg(args, 0), str_arg(args, 1), str_arg(args, 2)))),
        ));
        self.define_function(Callable::native("Chr", sig(vec![req("ch", K::Int32)], K::String), |_, args| {
            let c = u32::try_from(int_arg(args, 0)).ok().and_then(char::from_u32);
            Ok(Value::from(c.map(String::from).unwrap_or_default()))
        }));
        self.define_function(Callable::native("Asc", sig(vec![req("letter", K::String)], K::Int32), |_, args| {
            Ok(Value::Int32(str_arg(args, 0).chars().next().map_or(0, |c| c as i32)))
        }));
        self.define_function(Callable::native("Str", sig(vec![req("value", K::Double)], K::String), |_, args| {
            Ok(Value::from(builtin_str(&args[0])))
        }));
        self.define_function(Callable::native(
            "StrI",
            sig(
                vec![req("value", K::Int32), Param::optional("radix", K::Int32, Value::Int32(10))],
                K::String,
            ),
            |_, args| {
                let radix = int_arg(args, 1);
                if !(2..=36).contains(&radix) {
                    return Ok(Value::from(""));
                }
                Ok(Value::from(to_radix(int_arg(args, 0), radix as u32)))
            },
        ));
        self.define_function(Callable::native(
            "Val",
            sig(
                vec![req("s", K::String), Param::optional("radix", K::Int32, Value::Invalid)],
                K::Dynamic,
            ),
            |_, args| Ok(builtin_val(str_arg(args, 0), &args[1])),
        ));

        // Math
        self.define_function(Callable::native("Int", sig(vec![req("x", K::Dynamic)], K::Int32), |_, args| {
            to_int32(&args[0], f64::floor)
        }));
        self.define_function(Callable::native("Fix", sig(vec![req("x", K::Dynamic)], K::Int32), |_, args| {
            to_int32(&args[0], f64::trunc)
        }));
        self.define_function(Callable::native("Cint", sig(vec![req("x", K::Dynamic)], K::Int32), |_, args| {
            to_int32(&args[0], f64::round)
        }));
        self.define_function(Callable::native("Abs", sig(vec![req("x", K::Dynamic)], K::Dynamic), |_, args| {
            match unboxed(&args[0]) {
                Value::Int32(n) => Ok(Value::Int32(n.wrapping_abs())),
                Value::Int64(n) => Ok(Value::Int64(n.wrapping_abs())),
                Value::Float(n) => Ok(Value::Float(n.abs())),
                Value::Double(n) => Ok(Value::Double(n.abs())),
                other => Err(EvalError::type_mismatch(format!(
                    "Abs expects a number, got {}",
                    other.type_name()
                ))),
            }
        }));
        self.define_function(Callable::native("Sgn", sig(vec![req("x", K::Double)], K::Int32), |_, args| {
            let n = args[0].as_f64().unwrap_or(0.0);
            Ok(Value::Int32(if n > 0.0 { 1 } else if n < 0.0 { -1 } else { 0 }))
        }));
        self.define_function(Callable::native("Sqr", sig(vec![req("x", K::Double)], K::Float), |_, args| {
            Ok(Value::Float(args[0].as_f64().unwrap_or(0.0).sqrt() as f32))
        }));

        // JSON
        self.define_function(Callable::native(
            "FormatJson",
            sig(
                vec![req("object", K::Dynamic), Param::optional("flags", K::Int32, Value::Int32(0))],
                K::String,
            ),
            |interp, args| match to_json(&args[0]) {
                Ok(json) => Ok(Value::from(json.to_string())),
                Err(err) => {
                    interp.warn(&format!("FormatJson: {err}"));
                    Ok(Value::from(""))
                }
            },
        ));
        self.define_function(Callable::native(
            "ParseJson",
            sig(vec![req("text", K::String)], K::Dynamic),
            |interp, args| match serde_json::from_str::<serde_json::Value>(str_arg(args, 0)) {
                Ok(json) => Ok(from_json(&json)),
                Err(err) => {
                    interp.warn(&format!("ParseJson: {err}"));
                    Ok(Value::Invalid)
                }
            },
        ));

        // Runtime
        self.define_function(Callable::native(
            "Sleep",
            sig(vec![req("milliseconds", K::Int32)], K::Void),
            |interp, args| {
                let millis = u64::try_from(int_arg(args, 0)).unwrap_or(0);
                if interp.ctx().sleep(Duration::from_millis(millis)) {
                    return Err(EvalError::Interrupted);
                }
                Ok(Value::Invalid)
            },
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Function Implementations
// ═══════════════════════════════════════════════════════════════════════

fn str_arg(args: &[Value], i: usize) -> &str {
    args.get(i).and_then(Value::as_str).unwrap_or("")
}

fn int_arg(args: &[Value], i: usize) -> i64 {
    args.get(i).and_then(Value::to_i64).unwrap_or(0)
}

fn unboxed(value: &Value) -> Value {
    match value {
        Value::Object(obj) => boxed::unbox(obj).unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// `count` characters of `s` starting at character `start`.
fn chars(s: &str, start: i64, count: i64) -> String {
    s.chars()
        .skip(start.max(0) as usize)
        .take(count.max(0) as usize)
        .collect()
}

/// One-based position of `needle` at or after `start`, 0 when absent.
fn instr(start: i64, haystack: &str, needle: &str) -> i32 {
    let skip = (start.max(1) - 1) as usize;
    let tail: String = haystack.chars().skip(skip).collect();
    match tail.find(needle) {
        Some(byte) => (skip + tail[..byte].chars().count() + 1) as i32,
        None => 0,
    }
}

/// `Str()` leaves room for a sign: non-negative numbers get a leading space.
fn builtin_str(value: &Value) -> String {
    let n = value.as_f64().unwrap_or(0.0);
    let text = Value::Float(n as f32).to_string();
    if n >= 0.0 {
        format!(" {text}")
    } else {
        text
    }
}

fn to_radix(value: i64, radix: u32) -> String {
    let negative = value < 0;
    let mut n = value.unsigned_abs();
    let mut digits = Vec::new();
    loop {
        let digit = (n % radix as u64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        n /= radix as u64;
        if n == 0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

fn builtin_val(text: &str, radix: &Value) -> Value {
    match radix.to_i64() {
        Some(radix) if (2..=36).contains(&radix) => {
            let trimmed = text.trim();
            let digits = trimmed
                .strip_prefix("0x")
                .or_else(|| trimmed.strip_prefix("0X"))
                .filter(|_| radix == 16)
                .unwrap_or(trimmed);
            Value::Int32(i64::from_str_radix(digits, radix as u32).unwrap_or(0) as i32)
        }
        Some(_) => Value::Int32(0),
        None => Value::Float(parse_number_prefix(text) as f32),
    }
}

fn to_int32(value: &Value, round: fn(f64) -> f64) -> Result<Value, EvalError> {
    match unboxed(value) {
        Value::Int32(n) => Ok(Value::Int32(n)),
        Value::Int64(n) => Ok(Value::Int32(n.clamp(i32::MIN as i64, i32::MAX as i64) as i32)),
        Value::Float(n) => Ok(Value::Int32(round(n as f64) as i32)),
        Value::Double(n) => Ok(Value::Int32(round(n) as i32)),
        other => Err(EvalError::type_mismatch(format!(
            "{} Expected a number, got {}",
            RuntimeErrorDetail::TypeMismatch.message(),
            other.type_name()
        ))),
    }
}

fn builtin_create_object(interp: &mut Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let name = str_arg(args, 0);
    let created = match name.to_ascii_lowercase().as_str() {
        "roassociativearray" => Some(assoc_array::new_value(Vec::new())),
        "roarray" => Some(array::new_value(Vec::new())),
        "rosgnode" => {
            let node_type = str_arg(args, 1);
            let node = interp.node_types().create(node_type);
            if node.is_none() {
                interp.warn(&format!("Failed to create roSGNode with type {node_type}"));
            }
            node.map(Value::Object)
        }
        "rostring" => boxed::box_value(&Value::from("")).map(Value::Object),
        "roboolean" => boxed::box_value(&Value::Bool(false)).map(Value::Object),
        "roint" => boxed::box_value(&Value::Int32(0)).map(Value::Object),
        "rolonginteger" => boxed::box_value(&Value::Int64(0)).map(Value::Object),
        "rofloat" => boxed::box_value(&Value::Float(0.0)).map(Value::Object),
        "rodouble" => boxed::box_value(&Value::Double(0.0)).map(Value::Object),
        _ => {
            interp.warn(&format!(
                "{} CreateObject: {name}",
                RuntimeErrorDetail::ObjectClassNotFound.message()
            ));
            None
        }
    };
    Ok(created.unwrap_or(Value::Invalid))
}
