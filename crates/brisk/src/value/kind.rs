//! Static value kinds used in signatures and field declarations

use std::fmt;

/// The declared kind of a parameter, return value or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Invalid,
    Boolean,
    String,
    Int32,
    Int64,
    Float,
    Double,
    Callable,
    Object,
    /// Accepts any value
    Dynamic,
    /// No value; the return kind of a `sub`
    Void,
}

impl ValueKind {
    /// Parse a type name as written after `as`, case-insensitively.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "invalid" => ValueKind::Invalid,
            "boolean" => ValueKind::Boolean,
            "string" => ValueKind::String,
            "integer" => ValueKind::Int32,
            "longinteger" => ValueKind::Int64,
            "float" => ValueKind::Float,
            "double" => ValueKind::Double,
            "function" => ValueKind::Callable,
            "object" => ValueKind::Object,
            "dynamic" => ValueKind::Dynamic,
            "void" => ValueKind::Void,
            _ => return None,
        };
        Some(kind)
    }

    /// The name scripts see, e.g. from `type()`.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Invalid => "Invalid",
            ValueKind::Boolean => "Boolean",
            ValueKind::String => "String",
            ValueKind::Int32 => "Integer",
            ValueKind::Int64 => "LongInteger",
            ValueKind::Float => "Float",
            ValueKind::Double => "Double",
            ValueKind::Callable => "Function",
            ValueKind::Object => "Object",
            ValueKind::Dynamic => "Dynamic",
            ValueKind::Void => "Void",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int32 | ValueKind::Int64 | ValueKind::Float | ValueKind::Double)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_type_name_is_case_insensitive() {
        assert_eq!(ValueKind::from_type_name("Integer"), Some(ValueKind::Int32));
        assert_eq!(ValueKind::from_type_name("LONGINTEGER"), Some(ValueKind::Int64));
        assert_eq!(ValueKind::from_type_name("object"), Some(ValueKind::Object));
        assert_eq!(ValueKind::from_type_name("widget"), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(ValueKind::Int32.to_string(), "Integer");
        assert_eq!(ValueKind::Callable.name(), "Function");
    }
}
