//! `roSGNode`: script access to scene-graph nodes

use std::rc::Rc;

use super::{array, assoc_array, bound_method, method_table, Component, ComponentKind, MethodTable};
use crate::error::EvalError;
use crate::eval::Interpreter;
use crate::scenegraph::{self, Callback, FieldKind, Node, Observer, SetOutcome};
use crate::value::{Callable, MethodFn, Object, Param, Signature, Value, ValueKind};

pub const NAME: &str = "roSGNode";

pub fn new_object(node: Node) -> Object {
    Rc::new(std::cell::RefCell::new(Component::new(
        NAME,
        method_table(NAME, build_table),
        ComponentKind::Node(node),
    )))
}

pub fn is_node(object: &Object) -> bool {
    object.try_borrow().map_or(false, |c| c.as_node().is_some())
}

/// Member read: the field if present, else a bound method, else `invalid`.
pub fn get_member(object: &Object, name: &str) -> Value {
    match scenegraph::get_field(object, name) {
        Some(value) => value,
        None => bound_method(object, name).map_or(Value::Invalid, Value::Function),
    }
}

/// Member write through the observer protocol. Rejected writes are
/// reported to the host as warnings.
pub fn set_member(interp: &mut Interpreter, object: &Object, name: &str, value: Value) -> Result<(), EvalError> {
    let kind = value.type_name();
    if scenegraph::set_field(interp, object, name, value, false)? == SetOutcome::Rejected {
        interp.warn(&format!("Type mismatch: field '{name}' cannot accept a value of type {kind}"));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Methods
// ═══════════════════════════════════════════════════════════════════════

fn build_table() -> MethodTable {
    use ValueKind as K;
    let m = |name: &str, params: Vec<Param>, returns: ValueKind, f: MethodFn| {
        Callable::method(name, Signature::new(params, returns), f)
    };
    let name = || Param::required("name", K::String);
    MethodTable::new()
        .interface(
            "ifSGNodeField",
            vec![
                m(
                    "addField",
                    vec![
                        name(),
                        Param::required("type", K::String),
                        Param::optional("alwaysNotify", K::Boolean, Value::Bool(false)),
                    ],
                    K::Boolean,
                    add_field,
                ),
                m("addFields", vec![Param::required("fields", K::Object)], K::Boolean, add_fields),
                m("setField", vec![name(), Param::required("value", K::Dynamic)], K::Boolean, set_field),
                m("setFields", vec![Param::required("fields", K::Object)], K::Boolean, set_fields),
                m("getField", vec![name()], K::Dynamic, get_field),
                m("getFields", vec![], K::Object, get_fields),
                m("hasField", vec![name()], K::Boolean, has_field),
                m("removeField", vec![name()], K::Boolean, remove_field),
                m("observeField", vec![name(), Param::required("callback", K::Dynamic)], K::Boolean, observe_field),
                m(
                    "observeFieldOnce",
                    vec![name(), Param::required("callback", K::Dynamic)],
                    K::Boolean,
                    observe_field_once,
                ),
                m("unobserveField", vec![name()], K::Boolean, unobserve_field),
            ],
        )
        .interface(
            "ifSGNodeChildren",
            vec![
                m("appendChild", vec![Param::required("child", K::Object)], K::Boolean, append_child),
                m("createChild", vec![Param::required("type", K::String)], K::Dynamic, create_child),
                m("removeChild", vec![Param::required("child", K::Object)], K::Boolean, remove_child),
                m("getChildCount", vec![], K::Int32, get_child_count),
                m("getChild", vec![Param::required("index", K::Int32)], K::Dynamic, get_child),
                m(
                    "getChildren",
                    vec![
                        Param::optional("count", K::Int32, Value::Int32(-1)),
                        Param::optional("start", K::Int32, Value::Int32(0)),
                    ],
                    K::Object,
                    get_children,
                ),
                m("getParent", vec![], K::Dynamic, get_parent),
            ],
        )
        .interface(
            "ifSGNodeDict",
            vec![
                m("findNode", vec![Param::required("id", K::String)], K::Dynamic, find_node),
                m("subtype", vec![], K::String, subtype),
            ],
        )
}

fn with_node<T>(this: &Object, f: impl FnOnce(&mut Node) -> T) -> Result<T, EvalError> {
    let mut component = this.borrow_mut();
    let node = component
        .as_node_mut()
        .ok_or_else(|| EvalError::internal("receiver is not a node"))?;
    Ok(f(node))
}

fn str_arg(args: &[Value], i: usize) -> &str {
    args.get(i).and_then(Value::as_str).unwrap_or_default()
}

fn node_arg(args: &[Value], i: usize) -> Result<Object, EvalError> {
    match args.get(i) {
        Some(Value::Object(obj)) if is_node(obj) => Ok(obj.clone()),
        _ => Err(EvalError::type_mismatch("expected an roSGNode")),
    }
}

/// Entries of an associative-array argument.
fn entries_arg(args: &[Value]) -> Result<Vec<(String, Value)>, EvalError> {
    let entries = match args.first() {
        Some(Value::Object(obj)) => obj
            .borrow()
            .as_assoc_array()
            .map(|aa| aa.entries().map(|(k, v)| (k.to_string(), v.clone())).collect()),
        _ => None,
    };
    entries.ok_or_else(|| EvalError::type_mismatch("expected an roAssociativeArray"))
}

fn add_field(interp: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let (name, type_name) = (str_arg(args, 0), str_arg(args, 1));
    let always_notify = args.get(2).and_then(Value::as_bool).unwrap_or(false);
    let Some(kind) = FieldKind::from_type_name(type_name) else {
        interp.warn(&format!("addField: unknown field type '{type_name}'"));
        return Ok(Value::Bool(false));
    };
    // Re-adding an existing field is not an error
    with_node(this, |n| {
        n.add_field(name, kind, always_notify);
    })?;
    Ok(Value::Bool(true))
}

fn add_fields(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    for (name, value) in entries_arg(args)? {
        if let Some(kind) = FieldKind::from_value(&value) {
            scenegraph::add_field(this, &name, kind, value, false)?;
        }
    }
    Ok(Value::Bool(true))
}

fn set_field(interp: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let name = str_arg(args, 0);
    if !with_node(this, |n| n.has_field(name))? {
        return Ok(Value::Bool(false));
    }
    let value = args.get(1).cloned().unwrap_or(Value::Invalid);
    let outcome = scenegraph::set_field(interp, this, name, value, false)?;
    Ok(Value::Bool(outcome != SetOutcome::Rejected))
}

fn set_fields(interp: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    for (name, value) in entries_arg(args)? {
        if with_node(this, |n| n.has_field(&name))? {
            scenegraph::set_field(interp, this, &name, value, false)?;
        }
    }
    Ok(Value::Bool(true))
}

fn get_field(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    Ok(scenegraph::get_field(this, str_arg(args, 0)).unwrap_or(Value::Invalid))
}

fn get_fields(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    let entries = with_node(this, |n| {
        n.fields()
            .map(|(_, f)| (f.name().to_string(), f.value().clone()))
            .collect::<Vec<_>>()
    })?;
    Ok(assoc_array::new_value(entries))
}

fn has_field(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    with_node(this, |n| Value::Bool(n.has_field(str_arg(args, 0))))
}

fn remove_field(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(scenegraph::remove_field(this, str_arg(args, 0))?))
}

fn callback_arg(args: &[Value]) -> Result<Callback, EvalError> {
    match args.get(1) {
        Some(Value::String(name)) => Ok(Callback::Named(name.to_string())),
        Some(Value::Function(f)) => Ok(Callback::Function(f.clone())),
        _ => Err(EvalError::type_mismatch("observer must be a function name or function")),
    }
}

fn observe_field(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let callback = callback_arg(args)?;
    Ok(Value::Bool(scenegraph::observe(this, str_arg(args, 0), Observer::Script(callback), false)?))
}

fn observe_field_once(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let callback = callback_arg(args)?;
    Ok(Value::Bool(scenegraph::observe(this, str_arg(args, 0), Observer::Script(callback), true)?))
}

fn unobserve_field(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(scenegraph::unobserve(this, str_arg(args, 0))?))
}

fn append_child(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let child = node_arg(args, 0)?;
    Ok(Value::Bool(scenegraph::append_child(this, &child)?))
}

fn create_child(interp: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let type_name = str_arg(args, 0);
    let Some(child) = interp.node_types().create(type_name) else {
        interp.warn(&format!("createChild: unknown node type '{type_name}'"));
        return Ok(Value::Invalid);
    };
    scenegraph::append_child(this, &child)?;
    Ok(Value::Object(child))
}

fn remove_child(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let child = node_arg(args, 0)?;
    Ok(Value::Bool(scenegraph::remove_child(this, &child)?))
}

fn get_child_count(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_node(this, |n| Value::Int32(n.children().len() as i32))
}

fn get_child(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let index = args.first().and_then(Value::to_i64).unwrap_or(-1);
    with_node(this, |n| {
        usize::try_from(index)
            .ok()
            .and_then(|i| n.children().get(i).cloned())
            .map_or(Value::Invalid, Value::Object)
    })
}

/// `getChildren(count, start)`; a negative count means all remaining.
fn get_children(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    let count = args.first().and_then(Value::to_i64).unwrap_or(-1);
    let start = args.get(1).and_then(Value::to_i64).unwrap_or(0).max(0) as usize;
    let children = with_node(this, |n| {
        let rest = n.children().iter().skip(start).cloned().map(Value::Object);
        match usize::try_from(count) {
            Ok(count) => rest.take(count).collect::<Vec<_>>(),
            Err(_) => rest.collect(),
        }
    })?;
    Ok(array::new_value(children))
}

fn get_parent(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_node(this, |n| n.parent().map_or(Value::Invalid, Value::Object))
}

fn find_node(_: &mut Interpreter, this: &Object, args: &[Value]) -> Result<Value, EvalError> {
    Ok(scenegraph::find_node(this, str_arg(args, 0)).map_or(Value::Invalid, Value::Object))
}

fn subtype(_: &mut Interpreter, this: &Object, _: &[Value]) -> Result<Value, EvalError> {
    with_node(this, |n| Value::from(n.subtype()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_read_prefers_field() {
        let mut node = Node::new("Node");
        node.add_field_with("count", FieldKind::Int32, Value::Int32(4), false);
        let obj = new_object(node);
        assert_eq!(get_member(&obj, "COUNT"), Value::Int32(4));
        assert!(matches!(get_member(&obj, "getChildCount"), Value::Function(_)));
        assert!(get_member(&obj, "nothing").is_invalid());
    }

    #[test]
    fn test_node_interfaces() {
        let obj = new_object(Node::new("Node"));
        let component = obj.borrow();
        assert_eq!(component.name(), NAME);
        assert!(component.has_interface("ifSGNodeField"));
        assert!(component.has_interface("ifSGNodeChildren"));
        assert!(!component.has_interface("ifArray"));
    }
}
