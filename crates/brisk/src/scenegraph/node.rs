//! Scene-graph nodes and the field notification protocol
//!
//! A node owns its children and its fields. A node stored as another
//! node's field value records that field as a *parent field* through a
//! weak handle, and every notifying change inside the node is forwarded to
//! those parent fields.
//!
//! Observers run with no borrow of the node held, so a callback may read
//! and write any node, including the one being notified. Writes that reach
//! a field while its observers are running are stored immediately and
//! coalesced into a single extra pass once the current pass returns.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::field::{Field, FieldKind, NotifyState, SetOutcome};
use super::observer::{FieldEvent, Observer, ObserverSink};
use crate::component::Component;
use crate::error::EvalError;
use crate::value::{Object, Value};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// A field on another node that holds this node as its value.
#[derive(Debug, Clone)]
struct ParentField {
    owner_id: u64,
    owner: Weak<RefCell<Component>>,
    field: String,
}

pub struct Node {
    id: u64,
    subtype: String,
    fields: IndexMap<String, Field>,
    children: Vec<Object>,
    parent: Option<Weak<RefCell<Component>>>,
    parent_fields: Vec<ParentField>,
}

impl Node {
    pub fn new(subtype: &str) -> Self {
        Self {
            id: NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed),
            subtype: subtype.to_string(),
            fields: IndexMap::new(),
            children: Vec::new(),
            parent: None,
            parent_fields: Vec::new(),
        }
    }

    /// Node type name, e.g. `Group`.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Add a field holding the kind's default. Returns `false` if a field
    /// of that name already exists.
    pub fn add_field(&mut self, name: &str, kind: FieldKind, always_notify: bool) -> bool {
        self.add_field_with(name, kind, kind.default_value(), always_notify)
    }

    pub fn add_field_with(&mut self, name: &str, kind: FieldKind, value: Value, always_notify: bool) -> bool {
        let key = name.to_lowercase();
        if self.fields.contains_key(&key) {
            return false;
        }
        self.fields.insert(key, Field::new(name, kind, value, always_notify));
        true
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(&name.to_lowercase())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(&name.to_lowercase())
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.field(name).map(|f| f.value().clone())
    }

    /// Fields in declaration order, keyed by lowercase name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn children(&self) -> &[Object] {
        &self.children
    }

    pub fn parent(&self) -> Option<Object> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Number of live parent-field links.
    pub fn parent_field_count(&self) -> usize {
        self.parent_fields.iter().filter(|p| p.owner.strong_count() > 0).count()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        // Unregister from nodes held in our fields; their links would
        // otherwise dangle until the next propagation prunes them.
        for field in self.fields.values() {
            if let Value::Object(target) = field.value() {
                if let Ok(mut component) = target.try_borrow_mut() {
                    if let Some(node) = component.as_node_mut() {
                        node.parent_fields.retain(|p| p.owner_id != self.id);
                    }
                }
            }
        }
    }
}

fn with_node<T>(object: &Object, f: impl FnOnce(&mut Node) -> T) -> Result<T, EvalError> {
    let mut component = object
        .try_borrow_mut()
        .map_err(|_| EvalError::internal("node is busy"))?;
    let node = component
        .as_node_mut()
        .ok_or_else(|| EvalError::internal("object is not a node"))?;
    Ok(f(node))
}

fn node_id(object: &Object) -> Option<u64> {
    object.try_borrow().ok()?.as_node().map(|n| n.id)
}

// ═══════════════════════════════════════════════════════════════════════
// Field Protocol
// ═══════════════════════════════════════════════════════════════════════

/// Write `value` to `name` on `node` and notify its observers.
///
/// A missing field is created with the kind implied by the value. A value
/// the field's kind cannot hold is rejected with a warning. An observer
/// error resets the field to idle and is returned to the caller; no
/// further passes run.
pub fn set_field(
    sink: &mut dyn ObserverSink,
    node: &Object,
    name: &str,
    value: Value,
    always_notify: bool,
) -> Result<SetOutcome, EvalError> {
    let key = name.to_lowercase();
    let stored = value.clone();

    let (old, observers) = {
        let mut component = node
            .try_borrow_mut()
            .map_err(|_| EvalError::internal("node is busy"))?;
        let target = component
            .as_node_mut()
            .ok_or_else(|| EvalError::internal("object is not a node"))?;

        if !target.fields.contains_key(&key) {
            let Some(kind) = FieldKind::from_value(&value) else {
                return Ok(SetOutcome::Rejected);
            };
            target.fields.insert(key.clone(), Field::new(name, kind, value, false));
            drop(component);
            relink(node, &key, &Value::Invalid, &stored);
            return Ok(SetOutcome::Added);
        }
        let field = target
            .fields
            .get_mut(&key)
            .ok_or_else(|| EvalError::internal("field vanished during write"))?;

        let Some(value) = field.kind().accept(value) else {
            warn!(
                field = %field.name(),
                kind = %field.kind(),
                value = %stored.type_name(),
                "field cannot accept value"
            );
            return Ok(SetOutcome::Rejected);
        };

        let notify = always_notify || field.always_notify() || field.value() != &value;
        let old = field.replace(value);

        if field.state != NotifyState::Idle {
            if notify {
                debug!(field = %field.name(), "write during notification deferred");
                field.state = NotifyState::RefreshPending;
            }
            let outcome = if notify { SetOutcome::Deferred } else { SetOutcome::Unchanged };
            drop(component);
            relink(node, &key, &old, &stored);
            return Ok(outcome);
        }
        if !notify {
            drop(component);
            relink(node, &key, &old, &stored);
            return Ok(SetOutcome::Unchanged);
        }

        field.state = NotifyState::Notifying;
        (old, take_observers(field))
    };
    relink(node, &key, &old, &stored);

    let first = run_pass(sink, node, &key, &observers).and_then(|()| propagate(sink, node));
    if let Err(err) = first {
        finish(node, &key);
        return Err(err);
    }

    let drain = with_node(node, |n| {
        n.fields.get_mut(&key).and_then(|field| {
            (field.state == NotifyState::RefreshPending).then(|| {
                field.state = NotifyState::Notifying;
                take_observers(field)
            })
        })
    })?;
    if let Some(observers) = drain {
        let result = run_pass(sink, node, &key, &observers);
        let truncated = finish(node, &key);
        result?;
        if truncated {
            debug!(field = %key, "further writes during the refresh pass were coalesced");
        }
    } else {
        finish(node, &key);
    }

    Ok(SetOutcome::Notified)
}

/// Permanent observers, then the one-shot observers, which are consumed.
fn take_observers(field: &mut Field) -> Vec<Observer> {
    let mut observers = field.observers.clone();
    observers.append(&mut field.once);
    observers
}

/// Return the field to idle; reports whether a refresh was still pending.
fn finish(node: &Object, key: &str) -> bool {
    with_node(node, |n| match n.fields.get_mut(key) {
        Some(field) => {
            let pending = field.state == NotifyState::RefreshPending;
            field.state = NotifyState::Idle;
            pending
        }
        None => false,
    })
    .unwrap_or(false)
}

fn run_pass(sink: &mut dyn ObserverSink, node: &Object, key: &str, observers: &[Observer]) -> Result<(), EvalError> {
    if observers.is_empty() {
        return Ok(());
    }
    let Some((field, data)) = with_node(node, |n| n.fields.get(key).map(|f| (f.name().to_string(), f.value().clone())))?
    else {
        return Ok(());
    };
    let event = FieldEvent {
        node: node.clone(),
        field,
        data,
    };
    for observer in observers {
        match observer {
            Observer::Native(f) => f(&event)?,
            Observer::Script(callback) => sink.invoke(callback, &event)?,
        }
    }
    Ok(())
}

/// Re-announce `node` on every field that holds it. Links to fields that
/// no longer exist are dropped rather than followed.
fn propagate(sink: &mut dyn ObserverSink, node: &Object) -> Result<(), EvalError> {
    let parents: Vec<(u64, Object, String)> = with_node(node, |n| {
        n.parent_fields.retain(|p| p.owner.strong_count() > 0);
        n.parent_fields
            .iter()
            .filter_map(|p| p.owner.upgrade().map(|owner| (p.owner_id, owner, p.field.clone())))
            .collect()
    })?;
    for (owner_id, owner, field) in parents {
        let present = owner
            .try_borrow()
            .ok()
            .and_then(|c| c.as_node().map(|n| n.fields.contains_key(&field)))
            .unwrap_or(true);
        if !present {
            debug!(field = %field, "stale parent-field link dropped");
            with_node(node, |n| n.parent_fields.retain(|p| !(p.owner_id == owner_id && p.field == field)))?;
            continue;
        }
        set_field(sink, &owner, &field, Value::Object(node.clone()), true)?;
    }
    Ok(())
}

/// Move the parent-field link for `owner.key` from `old` to `new`.
fn relink(owner: &Object, key: &str, old: &Value, new: &Value) {
    if old == new {
        return;
    }
    let Some(owner_id) = node_id(owner) else {
        return;
    };
    if let Value::Object(previous) = old {
        if !Rc::ptr_eq(previous, owner) {
            let _ = with_node(previous, |n| {
                n.parent_fields.retain(|p| !(p.owner_id == owner_id && p.field == key));
            });
        }
    }
    if let Value::Object(next) = new {
        if !Rc::ptr_eq(next, owner) {
            let _ = with_node(next, |n| {
                if !n.parent_fields.iter().any(|p| p.owner_id == owner_id && p.field == key) {
                    n.parent_fields.push(ParentField {
                        owner_id,
                        owner: Rc::downgrade(owner),
                        field: key.to_string(),
                    });
                }
            });
        }
    }
}

/// Add a field with an initial value, linking a node value back to it.
/// Returns `false` if a field of that name already exists.
pub fn add_field(node: &Object, name: &str, kind: FieldKind, value: Value, always_notify: bool) -> Result<bool, EvalError> {
    let linked = value.clone();
    let added = with_node(node, |n| n.add_field_with(name, kind, value, always_notify))?;
    if added {
        relink(node, &name.to_lowercase(), &Value::Invalid, &linked);
    }
    Ok(added)
}

/// Remove a field, unlinking any node it held.
pub fn remove_field(node: &Object, name: &str) -> Result<bool, EvalError> {
    let key = name.to_lowercase();
    let removed = with_node(node, |n| n.fields.shift_remove(&key))?;
    match removed {
        Some(field) => {
            relink(node, &key, field.value(), &Value::Invalid);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Register an observer on `name`. Returns `false` if there is no such
/// field.
pub fn observe(node: &Object, name: &str, observer: Observer, once: bool) -> Result<bool, EvalError> {
    with_node(node, |n| match n.field_mut(name) {
        Some(field) => {
            field.add_observer(observer, once);
            true
        }
        None => false,
    })
}

pub fn unobserve(node: &Object, name: &str) -> Result<bool, EvalError> {
    with_node(node, |n| match n.field_mut(name) {
        Some(field) => {
            field.clear_observers();
            true
        }
        None => false,
    })
}

/// Current value of a field.
pub fn get_field(node: &Object, name: &str) -> Option<Value> {
    node.try_borrow().ok()?.as_node()?.get(name)
}

// ═══════════════════════════════════════════════════════════════════════
// Tree Structure
// ═══════════════════════════════════════════════════════════════════════

/// Whether `candidate` is `node` or one of its ancestors.
fn is_self_or_ancestor(candidate: &Object, node: &Object) -> bool {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if Rc::ptr_eq(&n, candidate) {
            return true;
        }
        current = n.try_borrow().ok().and_then(|c| c.as_node().and_then(Node::parent));
    }
    false
}

/// Make `child` the last child of `parent`, detaching it from any
/// previous parent. Refuses to create a cycle.
pub fn append_child(parent: &Object, child: &Object) -> Result<bool, EvalError> {
    if node_id(child).is_none() || is_self_or_ancestor(child, parent) {
        return Ok(false);
    }
    let previous = with_node(child, |n| n.parent())?;
    if let Some(previous) = previous {
        remove_child(&previous, child)?;
    }
    with_node(parent, |n| n.children.push(child.clone()))?;
    with_node(child, |n| n.parent = Some(Rc::downgrade(parent)))?;
    Ok(true)
}

pub fn remove_child(parent: &Object, child: &Object) -> Result<bool, EvalError> {
    let removed = with_node(parent, |n| {
        let index = n.children.iter().position(|c| Rc::ptr_eq(c, child));
        index.map(|i| n.children.remove(i)).is_some()
    })?;
    if removed {
        with_node(child, |n| n.parent = None)?;
    }
    Ok(removed)
}

/// First node in the subtree rooted at `root` (inclusive) whose `id`
/// field equals `id`.
pub fn find_node(root: &Object, id: &str) -> Option<Object> {
    let (matches, children) = {
        let component = root.try_borrow().ok()?;
        let node = component.as_node()?;
        let matches = node.get("id").and_then(|v| v.as_str().map(|s| s == id)).unwrap_or(false);
        (matches, node.children.clone())
    };
    if matches {
        return Some(root.clone());
    }
    children.iter().find_map(|child| find_node(child, id))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::component::node::new_object;
    use crate::scenegraph::observer::NativeSink;

    fn node_with_value() -> Object {
        let mut node = Node::new("Node");
        node.add_field("value", FieldKind::Int32, false);
        new_object(node)
    }

    fn counter(node: &Object, count: &Rc<Cell<u32>>) {
        let count = count.clone();
        observe(node, "value", Observer::native(move |_| {
            count.set(count.get() + 1);
            Ok(())
        }), false)
        .unwrap();
    }

    #[test]
    fn test_unchanged_write_does_not_notify() {
        let node = node_with_value();
        let count = Rc::new(Cell::new(0));
        counter(&node, &count);
        assert_eq!(set_field(&mut NativeSink, &node, "value", Value::Int32(0), false).unwrap(), SetOutcome::Unchanged);
        assert_eq!(count.get(), 0);
        assert_eq!(set_field(&mut NativeSink, &node, "value", Value::Int32(0), true).unwrap(), SetOutcome::Notified);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_one_shot_observer_runs_once() {
        let node = node_with_value();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        observe(&node, "value", Observer::native(move |_| {
            c.set(c.get() + 1);
            Ok(())
        }), true)
        .unwrap();
        set_field(&mut NativeSink, &node, "value", Value::Int32(1), false).unwrap();
        set_field(&mut NativeSink, &node, "value", Value::Int32(2), false).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_reentrant_writes_coalesce_into_one_pass() {
        let node = node_with_value();
        let passes = Rc::new(Cell::new(0));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (p, s, target) = (passes.clone(), seen.clone(), Rc::downgrade(&node));
        observe(&node, "value", Observer::native(move |event| {
            p.set(p.get() + 1);
            s.borrow_mut().push(event.data.clone());
            if let Some(node) = target.upgrade() {
                for n in 10..15 {
                    set_field(&mut NativeSink, &node, "value", Value::Int32(n), false)?;
                }
            }
            Ok(())
        }), false)
        .unwrap();

        set_field(&mut NativeSink, &node, "value", Value::Int32(1), false).unwrap();
        assert_eq!(passes.get(), 2);
        assert_eq!(*seen.borrow(), vec![Value::Int32(1), Value::Int32(14)]);
        let state = node.borrow().as_node().and_then(|n| n.field("value").map(Field::state));
        assert_eq!(state, Some(NotifyState::Idle));
    }

    #[test]
    fn test_observer_error_resets_field() {
        let node = node_with_value();
        observe(&node, "value", Observer::native(|_| Err(EvalError::internal("boom"))), false).unwrap();
        assert!(set_field(&mut NativeSink, &node, "value", Value::Int32(1), false).is_err());
        assert_eq!(get_field(&node, "value"), Some(Value::Int32(1)));
        let state = node.borrow().as_node().and_then(|n| n.field("value").map(Field::state));
        assert_eq!(state, Some(NotifyState::Idle));
    }

    #[test]
    fn test_missing_field_is_added_from_value() {
        let node = new_object(Node::new("Node"));
        let outcome = set_field(&mut NativeSink, &node, "Title", Value::from("x"), false).unwrap();
        assert_eq!(outcome, SetOutcome::Added);
        let kind = node.borrow().as_node().and_then(|n| n.field("title").map(Field::kind));
        assert_eq!(kind, Some(FieldKind::String));
    }

    #[test]
    fn test_parent_field_is_notified_and_weak() {
        let parent = new_object(Node::new("Node"));
        let child = node_with_value();
        set_field(&mut NativeSink, &parent, "content", Value::Object(child.clone()), false).unwrap();
        assert_eq!(child.borrow().as_node().map(Node::parent_field_count), Some(1));

        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        observe(&parent, "content", Observer::native(move |_| {
            c.set(c.get() + 1);
            Ok(())
        }), false)
        .unwrap();
        set_field(&mut NativeSink, &child, "value", Value::Int32(3), false).unwrap();
        assert_eq!(count.get(), 1);

        drop(parent);
        assert_eq!(child.borrow().as_node().map(Node::parent_field_count), Some(0));
    }

    #[test]
    fn test_replacing_node_value_moves_link() {
        let parent = new_object(Node::new("Node"));
        let first = new_object(Node::new("Node"));
        let second = new_object(Node::new("Node"));
        set_field(&mut NativeSink, &parent, "content", Value::Object(first.clone()), false).unwrap();
        set_field(&mut NativeSink, &parent, "content", Value::Object(second.clone()), false).unwrap();
        assert_eq!(first.borrow().as_node().map(Node::parent_field_count), Some(0));
        assert_eq!(second.borrow().as_node().map(Node::parent_field_count), Some(1));
    }

    #[test]
    fn test_added_field_links_node_value() {
        let parent = new_object(Node::new("Node"));
        let child = node_with_value();
        let kind = FieldKind::from_value(&Value::Object(child.clone())).unwrap();
        assert!(add_field(&parent, "content", kind, Value::Object(child.clone()), false).unwrap());
        assert_eq!(child.borrow().as_node().map(Node::parent_field_count), Some(1));
        assert!(!add_field(&parent, "content", kind, Value::Invalid, false).unwrap());
    }

    #[test]
    fn test_removed_field_unlinks_node_value() {
        let parent = new_object(Node::new("Node"));
        let child = node_with_value();
        set_field(&mut NativeSink, &parent, "content", Value::Object(child.clone()), false).unwrap();
        assert!(remove_field(&parent, "CONTENT").unwrap());
        assert!(!remove_field(&parent, "content").unwrap());
        assert_eq!(child.borrow().as_node().map(Node::parent_field_count), Some(0));

        set_field(&mut NativeSink, &child, "value", Value::Int32(5), false).unwrap();
        assert_eq!(parent.borrow().as_node().map(|n| n.has_field("content")), Some(false));
    }

    #[test]
    fn test_append_child_reparents_and_refuses_cycles() {
        let a = new_object(Node::new("Group"));
        let b = new_object(Node::new("Group"));
        let c = new_object(Node::new("Node"));
        assert!(append_child(&a, &c).unwrap());
        assert!(append_child(&b, &c).unwrap());
        assert_eq!(a.borrow().as_node().map(|n| n.children().len()), Some(0));
        assert!(!append_child(&c, &b).unwrap());
        assert!(!append_child(&b, &b).unwrap());
        assert!(Rc::ptr_eq(&c.borrow().as_node().and_then(Node::parent).unwrap(), &b));
    }

    #[test]
    fn test_find_node_searches_subtree() {
        let root = new_object(Node::new("Group"));
        let mut leaf = Node::new("Label");
        leaf.add_field_with("id", FieldKind::String, Value::from("title"), false);
        let leaf = new_object(leaf);
        append_child(&root, &leaf).unwrap();
        assert!(find_node(&root, "title").is_some_and(|n| Rc::ptr_eq(&n, &leaf)));
        assert!(find_node(&root, "missing").is_none());
    }
}
