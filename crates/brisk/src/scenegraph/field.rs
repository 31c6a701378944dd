//! Typed, observable node fields

use std::fmt;

use super::observer::Observer;
use crate::component::{array, assoc_array, ComponentKind};
use crate::value::json::from_json;
use crate::value::{Value, ValueKind};

/// Declared kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Boolean,
    String,
    Int32,
    Int64,
    Float,
    Double,
    /// A color, stored as given (`"0xRRGGBBAA"` or an integer)
    Color,
    Node,
    Array,
    AssocArray,
    /// Accepts any value
    Object,
}

impl FieldKind {
    /// Parse a field type as written in `addField` or a node type
    /// declaration, accepting the common aliases.
    pub fn from_type_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => FieldKind::Boolean,
            "str" | "string" | "uri" => FieldKind::String,
            "int" | "integer" => FieldKind::Int32,
            "longint" | "longinteger" => FieldKind::Int64,
            "float" => FieldKind::Float,
            "double" | "time" => FieldKind::Double,
            "color" => FieldKind::Color,
            "node" => FieldKind::Node,
            "array" | "roarray" => FieldKind::Array,
            "assocarray" | "roassociativearray" => FieldKind::AssocArray,
            "object" => FieldKind::Object,
            _ => return None,
        };
        Some(kind)
    }

    /// The kind a value would get when it creates a field implicitly.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(FieldKind::Boolean),
            Value::String(_) => Some(FieldKind::String),
            Value::Int32(_) => Some(FieldKind::Int32),
            Value::Int64(_) => Some(FieldKind::Int64),
            Value::Float(_) => Some(FieldKind::Float),
            Value::Double(_) => Some(FieldKind::Double),
            Value::Object(obj) => match obj.try_borrow().ok()?.kind {
                ComponentKind::Node(_) => Some(FieldKind::Node),
                ComponentKind::Array(_) => Some(FieldKind::Array),
                ComponentKind::AssocArray(_) => Some(FieldKind::AssocArray),
                ComponentKind::Boxed(ref inner) => FieldKind::from_value(inner),
            },
            Value::Invalid | Value::Function(_) => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::String => "string",
            FieldKind::Int32 => "integer",
            FieldKind::Int64 => "longinteger",
            FieldKind::Float => "float",
            FieldKind::Double => "double",
            FieldKind::Color => "color",
            FieldKind::Node => "node",
            FieldKind::Array => "array",
            FieldKind::AssocArray => "assocarray",
            FieldKind::Object => "object",
        }
    }

    fn value_kind(self) -> Option<ValueKind> {
        match self {
            FieldKind::Int32 => Some(ValueKind::Int32),
            FieldKind::Int64 => Some(ValueKind::Int64),
            FieldKind::Float => Some(ValueKind::Float),
            FieldKind::Double => Some(ValueKind::Double),
            _ => None,
        }
    }

    /// The value a field of this kind holds before anything is written.
    pub fn default_value(self) -> Value {
        match self {
            FieldKind::Boolean => Value::Bool(false),
            FieldKind::String | FieldKind::Color => Value::from(""),
            FieldKind::Int32 => Value::Int32(0),
            FieldKind::Int64 => Value::Int64(0),
            FieldKind::Float => Value::Float(0.0),
            FieldKind::Double => Value::Double(0.0),
            FieldKind::Array => array::new_value(Vec::new()),
            FieldKind::AssocArray => assoc_array::new_value(Vec::new()),
            FieldKind::Node | FieldKind::Object => Value::Invalid,
        }
    }

    /// Parse a textual default as found in node type declarations.
    pub fn parse_default(self, text: &str) -> Value {
        match self {
            FieldKind::Boolean => Value::Bool(text.trim().eq_ignore_ascii_case("true")),
            FieldKind::String | FieldKind::Color => Value::from(text),
            FieldKind::Int32 => Value::Int32(text.trim().parse().unwrap_or(0)),
            FieldKind::Int64 => Value::Int64(text.trim().parse().unwrap_or(0)),
            FieldKind::Float => Value::Float(text.trim().parse().unwrap_or(0.0)),
            FieldKind::Double => Value::Double(text.trim().parse().unwrap_or(0.0)),
            FieldKind::Array | FieldKind::AssocArray | FieldKind::Object => {
                match serde_json::from_str::<serde_json::Value>(text) {
                    Ok(json) => from_json(&json),
                    Err(_) => self.default_value(),
                }
            }
            FieldKind::Node => Value::Invalid,
        }
    }

    /// Convert `value` for storage in a field of this kind, or `None` when
    /// the field cannot hold it.
    pub fn accept(self, value: Value) -> Option<Value> {
        if let Some(kind) = self.value_kind() {
            if value.is_numeric() {
                return crate::value::coerce_argument(value, kind);
            }
        }
        let found = FieldKind::from_value(&value);
        match (self, value) {
            (FieldKind::Object, value) => Some(value),
            (FieldKind::Node | FieldKind::Array | FieldKind::AssocArray, Value::Invalid) => Some(Value::Invalid),
            (FieldKind::String, Value::Bool(b)) => Some(Value::from(if b { "true" } else { "false" })),
            (FieldKind::Boolean, Value::String(s)) => Some(Value::Bool(s.trim().eq_ignore_ascii_case("true"))),
            (FieldKind::Color, v @ (Value::String(_) | Value::Int32(_) | Value::Int64(_))) => Some(v),
            (kind, value) if found == Some(kind) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a field is in its notification cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyState {
    Idle,
    /// Observers are running
    Notifying,
    /// A write arrived while observers were running; one more pass is due
    RefreshPending,
}

/// What a write did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The field did not exist and was created from the value
    Added,
    /// Value stored, nothing to notify
    Unchanged,
    /// Value stored and observers ran
    Notified,
    /// Value stored during a notification; observers will run once more
    Deferred,
    /// The field's kind cannot hold the value; nothing changed
    Rejected,
}

/// A named slot on a node.
pub struct Field {
    name: String,
    kind: FieldKind,
    value: Value,
    always_notify: bool,
    pub(super) observers: Vec<Observer>,
    pub(super) once: Vec<Observer>,
    pub(super) state: NotifyState,
}

impl Field {
    pub fn new(name: &str, kind: FieldKind, value: Value, always_notify: bool) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value,
            always_notify,
            observers: Vec::new(),
            once: Vec::new(),
            state: NotifyState::Idle,
        }
    }

    /// Field name as first declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn always_notify(&self) -> bool {
        self.always_notify
    }

    pub fn state(&self) -> NotifyState {
        self.state
    }

    pub fn is_observed(&self) -> bool {
        !self.observers.is_empty() || !self.once.is_empty()
    }

    pub fn add_observer(&mut self, observer: Observer, once: bool) {
        if once {
            self.once.push(observer);
        } else {
            self.observers.push(observer);
        }
    }

    pub fn clear_observers(&mut self) {
        self.observers.clear();
        self.once.clear();
    }

    /// Store without notifying. Returns the previous value.
    pub(super) fn replace(&mut self, value: Value) -> Value {
        std::mem::replace(&mut self.value, value)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_writes_take_field_kind() {
        assert_eq!(FieldKind::Float.accept(Value::Int32(2)), Some(Value::Float(2.0)));
        assert_eq!(FieldKind::Int32.accept(Value::Double(2.7)), Some(Value::Int32(2)));
    }

    #[test]
    fn test_boolean_string_conversion() {
        assert_eq!(FieldKind::String.accept(Value::Bool(true)), Some(Value::from("true")));
        assert_eq!(FieldKind::Boolean.accept(Value::from("TRUE")), Some(Value::Bool(true)));
        assert_eq!(FieldKind::Boolean.accept(Value::from("no")), Some(Value::Bool(false)));
    }

    #[test]
    fn test_incompatible_write_is_rejected() {
        assert_eq!(FieldKind::Int32.accept(Value::from("1")), None);
        assert_eq!(FieldKind::Node.accept(Value::Int32(1)), None);
        assert_eq!(FieldKind::Node.accept(Value::Invalid), Some(Value::Invalid));
    }

    #[test]
    fn test_parse_default() {
        assert_eq!(FieldKind::Boolean.parse_default("true"), Value::Bool(true));
        assert_eq!(FieldKind::Float.parse_default("1.0"), Value::Float(1.0));
        let translation = FieldKind::Array.parse_default("[0.0,0.0]");
        assert_eq!(translation.type_name(), "roArray");
    }

    #[test]
    fn test_type_name_aliases() {
        assert_eq!(FieldKind::from_type_name("uri"), Some(FieldKind::String));
        assert_eq!(FieldKind::from_type_name("roAssociativeArray"), Some(FieldKind::AssocArray));
        assert_eq!(FieldKind::from_type_name("widget"), None);
    }
}
