//! printf-style formatting for `toStr(format)` and number display
//!
//! Supports `%d %i %u %x %X %o %f %F %e %E %g %G %s %c %%` with the `-+ 0#`
//! flags, a minimum width and a precision.

use super::Value;
use crate::error::{EvalError, RuntimeErrorDetail};

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alternate: bool,
}

#[derive(Debug, Clone, Copy)]
struct Spec {
    flags: Flags,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: char,
}

enum Piece {
    Text(String),
    Spec(Spec),
}

/// Largest width or precision a specifier may ask for.
const MAX_FIELD: usize = 512;

fn invalid_specifier(format: &str) -> EvalError {
    EvalError::runtime(
        RuntimeErrorDetail::InvalidFormatSpecifier,
        format!("Invalid format specifier in \"{format}\""),
    )
}

fn parse(format: &str) -> Result<Vec<Piece>, EvalError> {
    let mut pieces = Vec::new();
    let mut text = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            text.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            text.push('%');
            continue;
        }
        if !text.is_empty() {
            pieces.push(Piece::Text(std::mem::take(&mut text)));
        }

        let mut flags = Flags::default();
        while let Some(&f) = chars.peek() {
            match f {
                '-' => flags.left = true,
                '+' => flags.plus = true,
                ' ' => flags.space = true,
                '0' => flags.zero = true,
                '#' => flags.alternate = true,
                _ => break,
            }
            chars.next();
        }

        let mut width = String::new();
        while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            width.push(d);
            chars.next();
        }

        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(&d) = chars.peek().filter(|d| d.is_ascii_digit()) {
                digits.push(d);
                chars.next();
            }
            precision = Some(field_size(&digits, format)?.unwrap_or(0));
        }

        let conversion = match chars.next() {
            Some(c) if "diuxXofFeEgGsc".contains(c) => c,
            _ => return Err(invalid_specifier(format)),
        };

        pieces.push(Piece::Spec(Spec {
            flags,
            width: field_size(&width, format)?,
            precision,
            conversion,
        }));
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(text));
    }
    Ok(pieces)
}

/// Width or precision digits, `None` when absent.
fn field_size(digits: &str, format: &str) -> Result<Option<usize>, EvalError> {
    if digits.is_empty() {
        return Ok(None);
    }
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_FIELD => Ok(Some(n)),
        _ => Err(invalid_specifier(format)),
    }
}

/// Format `value` through `format`. Every conversion in the format
/// consumes the same value. A format with no `%` is returned unchanged.
pub fn sprintf(format: &str, value: &Value) -> Result<String, EvalError> {
    if !format.contains('%') {
        return Ok(format.to_string());
    }
    let mut out = String::new();
    for piece in parse(format)? {
        match piece {
            Piece::Text(text) => out.push_str(&text),
            Piece::Spec(spec) => out.push_str(&render(spec, value)?),
        }
    }
    Ok(out)
}

fn number(spec: Spec, value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64().ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "Format '%{}' expects a number, received {}",
                spec.conversion,
                other.type_name()
            ))
        }),
    }
}

fn render(spec: Spec, value: &Value) -> Result<String, EvalError> {
    let (sign_body, numeric) = match spec.conversion {
        'd' | 'i' | 'u' => {
            let n = integer(spec, value)?;
            (split_sign(n.to_string()), true)
        }
        'x' | 'X' | 'o' => {
            let n = integer(spec, value)?;
            // Negative values print as their 32-bit two's complement
            let bits = if n < 0 && n >= i32::MIN as i64 { n as i32 as u32 as u64 } else { n as u64 };
            let mut digits = match spec.conversion {
                'x' => format!("{bits:x}"),
                'X' => format!("{bits:X}"),
                _ => format!("{bits:o}"),
            };
            if spec.flags.alternate && bits != 0 {
                digits = match spec.conversion {
                    'x' => format!("0x{digits}"),
                    'X' => format!("0X{digits}"),
                    _ => format!("0{digits}"),
                };
            }
            ((String::new(), digits), true)
        }
        'f' | 'F' => {
            let n = number(spec, value)?;
            (split_sign(fixed(n, spec.precision.unwrap_or(6))), true)
        }
        'e' | 'E' => {
            let n = number(spec, value)?;
            let s = exponential(n, spec.precision.unwrap_or(6));
            (split_sign(upper_if(s, spec.conversion == 'E')), true)
        }
        'g' | 'G' => {
            let n = number(spec, value)?;
            let s = general(n, spec.precision.unwrap_or(6), spec.flags.alternate);
            (split_sign(upper_if(s, spec.conversion == 'G')), true)
        }
        'c' => {
            let c = match value {
                Value::String(s) => s.chars().next().map(String::from).unwrap_or_default(),
                other => {
                    let code = integer(spec, other)?;
                    char::from_u32(code as u32).map(String::from).unwrap_or_default()
                }
            };
            ((String::new(), c), false)
        }
        _ => {
            let mut s = value.to_string();
            if let Some(precision) = spec.precision {
                s = s.chars().take(precision).collect();
            }
            ((String::new(), s), false)
        }
    };

    let (sign, body) = sign_body;
    let sign = if !sign.is_empty() {
        sign
    } else if numeric && spec.flags.plus {
        "+".to_string()
    } else if numeric && spec.flags.space {
        " ".to_string()
    } else {
        String::new()
    };
    Ok(pad(spec, numeric, &sign, &body))
}

fn integer(spec: Spec, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Bool(b) => Ok(*b as i64),
        other => other.to_i64().ok_or_else(|| {
            EvalError::type_mismatch(format!(
                "Format '%{}' expects a number, received {}",
                spec.conversion,
                other.type_name()
            ))
        }),
    }
}

fn split_sign(s: String) -> (String, String) {
    match s.strip_prefix('-') {
        Some(rest) => ("-".to_string(), rest.to_string()),
        None => (String::new(), s),
    }
}

fn upper_if(s: String, upper: bool) -> String {
    if upper {
        s.to_uppercase()
    } else {
        s
    }
}

fn pad(spec: Spec, numeric: bool, sign: &str, body: &str) -> String {
    let len = sign.chars().count() + body.chars().count();
    let width = spec.width.unwrap_or(0);
    if len >= width {
        return format!("{sign}{body}");
    }
    let fill = width - len;
    if spec.flags.left {
        format!("{sign}{body}{}", " ".repeat(fill))
    } else if spec.flags.zero && numeric {
        format!("{sign}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{sign}{body}", " ".repeat(fill))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Floating Point Conversions
// ═══════════════════════════════════════════════════════════════════════

fn non_finite(n: f64) -> Option<String> {
    if n.is_nan() {
        Some("nan".to_string())
    } else if n.is_infinite() {
        Some(if n > 0.0 { "inf" } else { "-inf" }.to_string())
    } else {
        None
    }
}

fn fixed(n: f64, precision: usize) -> String {
    non_finite(n).unwrap_or_else(|| format!("{n:.precision$}"))
}

/// C-style exponent: `1.5e+03` rather than Rust's `1.5e3`.
fn exponential(n: f64, precision: usize) -> String {
    if let Some(s) = non_finite(n) {
        return s;
    }
    let raw = format!("{n:.precision$e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}

/// `%g`: shortest of fixed and exponential for `precision` significant
/// digits, trailing zeros removed unless `alternate`.
pub fn general(n: f64, precision: usize, alternate: bool) -> String {
    if let Some(s) = non_finite(n) {
        return s;
    }
    let precision = precision.max(1);
    if n == 0.0 {
        return if alternate {
            format!("{:.*}", precision - 1, 0.0)
        } else {
            "0".to_string()
        };
    }

    let scientific = format!("{:.*e}", precision - 1, n);
    let exp: i32 = scientific
        .split_once('e')
        .and_then(|(_, e)| e.parse().ok())
        .unwrap_or(0);

    let s = if exp < -4 || exp >= precision as i32 {
        exponential(n, precision - 1)
    } else {
        fixed(n, (precision as i32 - 1 - exp).max(0) as usize)
    };

    if alternate {
        return s;
    }
    strip_trailing_zeros(&s)
}

fn strip_trailing_zeros(s: &str) -> String {
    let (mantissa, exponent) = match s.find('e') {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    };
    if !mantissa.contains('.') {
        return s.to_string();
    }
    let trimmed = mantissa.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed}{exponent}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(format: &str, value: Value) -> String {
        sprintf(format, &value).unwrap()
    }

    #[test]
    fn test_no_tokens_returns_format() {
        assert_eq!(fmt("plain", Value::Int32(3)), "plain");
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(fmt("%d", Value::Int32(42)), "42");
        assert_eq!(fmt("%05d", Value::Int32(-42)), "-0042");
        assert_eq!(fmt("%-4d|", Value::Int32(7)), "7   |");
        assert_eq!(fmt("%+d", Value::Int32(7)), "+7");
        assert_eq!(fmt("%x", Value::Int32(255)), "ff");
        assert_eq!(fmt("%#X", Value::Int32(255)), "0XFF");
        assert_eq!(fmt("%x", Value::Int32(-1)), "ffffffff");
        assert_eq!(fmt("%o", Value::Int32(8)), "10");
    }

    #[test]
    fn test_every_token_consumes_the_same_value() {
        assert_eq!(fmt("%d-%d", Value::Int32(5)), "5-5");
        assert_eq!(fmt("100%%", Value::Int32(5)), "100%");
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(fmt("%.2f", Value::Float(3.14159)), "3.14");
        assert_eq!(fmt("%e", Value::Double(1500.0)), "1.500000e+03");
        assert_eq!(fmt("%g", Value::Double(0.0001)), "0.0001");
        assert_eq!(fmt("%g", Value::Double(1234567.0)), "1.23457e+06");
        assert_eq!(fmt("%g", Value::Double(100.0)), "100");
    }

    #[test]
    fn test_string_and_char() {
        assert_eq!(fmt("[%5s]", Value::string("ab")), "[   ab]");
        assert_eq!(fmt("%.1s", Value::string("ab")), "a");
        assert_eq!(fmt("%c", Value::Int32(65)), "A");
        assert_eq!(fmt("%s", Value::Int32(9)), "9");
    }

    #[test]
    fn test_invalid_specifier() {
        let err = sprintf("%q", &Value::Int32(1)).unwrap_err();
        assert_eq!(err.detail(), Some(RuntimeErrorDetail::InvalidFormatSpecifier));
    }

    #[test]
    fn test_oversized_width_and_precision_are_rejected() {
        for format in ["%.70000f", "%70000d", "%99999999999999999999999s", "%.513e"] {
            let err = sprintf(format, &Value::Double(1.5)).unwrap_err();
            assert_eq!(err.detail(), Some(RuntimeErrorDetail::InvalidFormatSpecifier), "{format}");
        }
        assert_eq!(fmt("%.512f", Value::Double(1.5)).len(), 514);
    }

    #[test]
    fn test_string_to_numeric_specifier_is_type_mismatch() {
        let err = sprintf("%d", &Value::string("x")).unwrap_err();
        assert!(err.is_type_error());
    }

    #[test]
    fn test_general_trims_zeros() {
        assert_eq!(general(2.5, 6, false), "2.5");
        assert_eq!(general(1.0 / 3.0, 6, false), "0.333333");
        assert_eq!(general(0.1f32 as f64, 6, false), "0.1");
    }
}
