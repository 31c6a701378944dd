//! Components: reference-typed objects with named interfaces
//!
//! Every component carries a method table that groups its methods into
//! named interfaces (`ifAssociativeArray`, `ifToStr`, ...). Tables are
//! built once per component type and shared by all instances.

pub mod array;
pub mod assoc_array;
pub mod boxed;
pub mod node;
mod string_ops;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::scenegraph::Node;
use crate::value::{Callable, FunctionValue, Object, Value};

pub use array::RoArray;
pub use assoc_array::AssocArray;
pub(crate) use string_ops::parse_number_prefix;

/// A named group of methods.
#[derive(Debug, Clone)]
pub struct Interface {
    pub name: String,
    pub methods: Vec<String>,
}

/// Interfaces and methods of one component type, keyed by lowercase name.
#[derive(Debug, Default)]
pub struct MethodTable {
    interfaces: IndexMap<String, Interface>,
    methods: HashMap<String, Rc<Callable>>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `methods` under the interface `name`.
    pub fn interface(mut self, name: &str, methods: Vec<Callable>) -> Self {
        let names = methods.iter().map(|m| m.name.to_lowercase()).collect();
        self.interfaces.insert(
            name.to_lowercase(),
            Interface {
                name: name.to_string(),
                methods: names,
            },
        );
        for method in methods {
            self.methods.insert(method.name.to_lowercase(), Rc::new(method));
        }
        self
    }

    pub fn method(&self, name: &str) -> Option<&Rc<Callable>> {
        self.methods.get(&name.to_lowercase())
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.interfaces.contains_key(&name.to_lowercase())
    }
}

thread_local! {
    static TABLES: RefCell<HashMap<&'static str, Rc<MethodTable>>> = RefCell::new(HashMap::new());
}

/// The shared method table for `key`, built on first use.
pub(crate) fn method_table(key: &'static str, build: fn() -> MethodTable) -> Rc<MethodTable> {
    TABLES.with(|tables| {
        tables
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| Rc::new(build()))
            .clone()
    })
}

/// The concrete state of a component.
pub enum ComponentKind {
    AssocArray(AssocArray),
    Array(RoArray),
    /// An intrinsic wrapped as an object (`roInt`, `roString`, ...)
    Boxed(Value),
    Node(Node),
}

/// A component instance.
pub struct Component {
    name: &'static str,
    table: Rc<MethodTable>,
    pub kind: ComponentKind,
}

impl Component {
    pub fn new(name: &'static str, table: Rc<MethodTable>, kind: ComponentKind) -> Self {
        Self { name, table, kind }
    }

    /// Component type name, e.g. `roAssociativeArray`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn has_interface(&self, name: &str) -> bool {
        self.table.has_interface(name)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.table.interfaces.values()
    }

    pub fn method(&self, name: &str) -> Option<Rc<Callable>> {
        self.table.method(name).cloned()
    }

    pub fn as_assoc_array(&self) -> Option<&AssocArray> {
        match &self.kind {
            ComponentKind::AssocArray(aa) => Some(aa),
            _ => None,
        }
    }

    pub fn as_assoc_array_mut(&mut self) -> Option<&mut AssocArray> {
        match &mut self.kind {
            ComponentKind::AssocArray(aa) => Some(aa),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&RoArray> {
        match &self.kind {
            ComponentKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut RoArray> {
        match &mut self.kind {
            ComponentKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match &self.kind {
            ComponentKind::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match &mut self.kind {
            ComponentKind::Node(node) => Some(node),
            _ => None,
        }
    }
}

/// Nested objects print as a one-line placeholder, so a component that
/// contains itself still prints.
fn nested(value: &Value) -> String {
    match value {
        Value::Object(obj) => match obj.try_borrow() {
            Ok(c) if matches!(c.kind, ComponentKind::Boxed(_)) => c.to_string(),
            Ok(c) => format!("<Component: {}>", c.name()),
            Err(_) => "<Component>".to_string(),
        },
        other => other.to_string(),
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ComponentKind::Boxed(inner) => write!(f, "{}", inner),
            ComponentKind::AssocArray(aa) => {
                writeln!(f, "<Component: {}> =", self.name)?;
                writeln!(f, "{{")?;
                for (key, value) in aa.entries() {
                    writeln!(f, "    {}: {}", key, nested(value))?;
                }
                write!(f, "}}")
            }
            ComponentKind::Array(items) => {
                writeln!(f, "<Component: {}> =", self.name)?;
                writeln!(f, "[")?;
                for value in items.elements() {
                    writeln!(f, "    {}", nested(value))?;
                }
                write!(f, "]")
            }
            ComponentKind::Node(node) => {
                writeln!(f, "<Component: {}:{}> =", self.name, node.subtype())?;
                writeln!(f, "{{")?;
                for (_, field) in node.fields() {
                    writeln!(f, "    {}: {}", field.name(), nested(field.value()))?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            ComponentKind::AssocArray(aa) => format!("AssocArray({} entries)", aa.entries().count()),
            ComponentKind::Array(items) => format!("Array({} elements)", items.elements().len()),
            ComponentKind::Boxed(inner) => format!("Boxed({inner:?})"),
            ComponentKind::Node(node) => format!("Node({})", node.subtype()),
        };
        f.debug_struct("Component").field("name", &self.name).field("kind", &kind).finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Interface Queries
// ═══════════════════════════════════════════════════════════════════════

/// `GetInterface(value, name)`: the object itself when it implements the
/// interface. Intrinsics are boxed first, so `GetInterface(5, "ifInt")`
/// yields a fresh `roInt`. Anything else yields `invalid`.
pub fn get_interface(value: &Value, name: &str) -> Value {
    let object = match value {
        Value::Object(obj) => obj.clone(),
        other => match boxed::box_value(other) {
            Some(obj) => obj,
            None => return Value::Invalid,
        },
    };
    let implements = object.try_borrow().map_or(false, |c| c.has_interface(name));
    if implements {
        Value::Object(object)
    } else {
        Value::Invalid
    }
}

/// `FindMemberFunction(value, name)`: the (boxed) object when one of its
/// interfaces provides the method, else `invalid`.
pub fn find_member_function(value: &Value, method: &str) -> Value {
    let object = match value {
        Value::Object(obj) => obj.clone(),
        other => match boxed::box_value(other) {
            Some(obj) => obj,
            None => return Value::Invalid,
        },
    };
    let found = object.try_borrow().map_or(false, |c| c.method(method).is_some());
    if found {
        Value::Object(object)
    } else {
        Value::Invalid
    }
}

/// A method of `object` bound to it, ready to call.
pub fn bound_method(object: &Object, name: &str) -> Option<FunctionValue> {
    let method = object.try_borrow().ok()?.method(name)?;
    Some(FunctionValue::bound(method, object.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_interface_on_component() {
        let aa = assoc_array::new_value(Vec::new());
        assert_eq!(get_interface(&aa, "ifAssociativeArray"), aa);
        assert_eq!(get_interface(&aa, "IFASSOCIATIVEARRAY"), aa);
        assert!(get_interface(&aa, "ifArray").is_invalid());
    }

    #[test]
    fn test_get_interface_boxes_intrinsics() {
        let result = get_interface(&Value::Int32(5), "ifInt");
        assert_eq!(result.type_name(), "roInt");
        assert!(get_interface(&Value::Int32(5), "ifString").is_invalid());
        assert_eq!(get_interface(&Value::string("s"), "ifString").type_name(), "roString");
        assert!(get_interface(&Value::Invalid, "ifToStr").is_invalid());
    }

    #[test]
    fn test_method_tables_are_shared_between_instances() {
        let a = assoc_array::new_object(Vec::new());
        let b = assoc_array::new_object(Vec::new());
        assert!(Rc::ptr_eq(&a.borrow().table, &b.borrow().table));
    }

    #[test]
    fn test_find_member_function() {
        let arr = array::new_value(vec![]);
        assert_eq!(find_member_function(&arr, "push"), arr);
        assert!(find_member_function(&arr, "nope").is_invalid());
    }

    #[test]
    fn test_debug_summarizes_contents() {
        let aa = assoc_array::new_object(vec![("k".to_string(), Value::Int32(1))]);
        assert_eq!(
            format!("{:?}", aa.borrow()),
            r#"Component { name: "roAssociativeArray", kind: "AssocArray(1 entries)" }"#
        );
        let boxed = boxed::box_value(&Value::Int32(3)).unwrap();
        assert!(format!("{:?}", boxed).contains("Boxed(Int32(3))"));
    }

    #[test]
    fn test_display_nested_placeholder() {
        let inner = assoc_array::new_value(Vec::new());
        let outer = assoc_array::new_value(vec![("child".to_string(), inner), ("n".to_string(), Value::Int32(1))]);
        assert_eq!(
            outer.to_string(),
            "<Component: roAssociativeArray> =\n{\n    child: <Component: roAssociativeArray>\n    n: 1\n}"
        );
    }
}
