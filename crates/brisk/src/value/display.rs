//! Display and Debug implementations for Value

use std::fmt;

use super::format::general;
use super::Value;

/// Display matches what `print` and string conversion produce.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "invalid"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "{}", s),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", general(*n as f64, 7, false)),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "nan")
                } else if n.is_infinite() {
                    write!(f, "{}", if *n > 0.0 { "inf" } else { "-inf" })
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Function(func) => write!(f, "<Function: {}>", func.name()),
            Value::Object(obj) => match obj.try_borrow() {
                Ok(component) => write!(f, "{}", component),
                Err(_) => write!(f, "<Component: busy>"),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "Invalid"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Int32(n) => write!(f, "Int32({})", n),
            Value::Int64(n) => write!(f, "Int64({})", n),
            Value::Float(n) => write!(f, "Float({})", n),
            Value::Double(n) => write!(f, "Double({})", n),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Object(obj) => match obj.try_borrow() {
                Ok(component) => write!(f, "Object({})", component.name()),
                Err(_) => write!(f, "Object(<borrowed>)"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_intrinsics() {
        assert_eq!(Value::Invalid.to_string(), "invalid");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Int32(-3).to_string(), "-3");
        assert_eq!(Value::Int64(1 << 40).to_string(), "1099511627776");
        assert_eq!(Value::string("hi").to_string(), "hi");
    }

    #[test]
    fn test_display_floats() {
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Float(10.0 / 3.0).to_string(), "3.333333");
        assert_eq!(Value::Double(0.1).to_string(), "0.1");
        assert_eq!(Value::Double(4.0).to_string(), "4");
        assert_eq!(Value::Double(f64::NAN).to_string(), "nan");
    }

    #[test]
    fn test_debug_names_variant() {
        assert_eq!(format!("{:?}", Value::Int32(1)), "Int32(1)");
        assert_eq!(format!("{:?}", Value::string("a")), "String(\"a\")");
    }
}
