//! Node type registry
//!
//! Each engine owns one registry. Types form a single-inheritance chain
//! through `extends`; creating a node runs every initializer from the root
//! type down, so a `Label` gets the fields of `Node` and `Group` first.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use super::field::FieldKind;
use super::node::Node;
use crate::component::node::new_object;
use crate::value::Object;

/// Adds a type's fields to a freshly created node.
pub type NodeInit = Arc<dyn Fn(&mut Node) + Send + Sync>;

#[derive(Clone)]
pub struct NodeType {
    pub name: String,
    pub extends: Option<String>,
    pub init: NodeInit,
}

impl NodeType {
    pub fn new(name: &str, extends: Option<&str>, init: impl Fn(&mut Node) + Send + Sync + 'static) -> Self {
        Self {
            name: name.to_string(),
            extends: extends.map(str::to_string),
            init: Arc::new(init),
        }
    }
}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeType")
            .field("name", &self.name)
            .field("extends", &self.extends)
            .finish()
    }
}

/// Deepest inheritance chain followed before giving up on a type.
const MAX_DEPTH: usize = 64;

pub struct NodeTypeRegistry {
    types: DashMap<String, NodeType>,
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTypeRegistry {
    /// A registry holding the built-in node types.
    pub fn new() -> Self {
        let registry = Self { types: DashMap::new() };
        registry.add_node_types(builtin_types());
        registry
    }

    /// A registry with no types at all.
    pub fn empty() -> Self {
        Self { types: DashMap::new() }
    }

    /// Register node types, replacing existing ones of the same name.
    pub fn add_node_types(&self, types: impl IntoIterator<Item = NodeType>) {
        for node_type in types {
            debug!(name = %node_type.name, extends = ?node_type.extends, "node type registered");
            self.types.insert(node_type.name.to_lowercase(), node_type);
        }
    }

    pub fn can_resolve(&self, name: &str) -> bool {
        self.chain(name).is_some()
    }

    /// The type named `name` and its ancestors, root first.
    fn chain(&self, name: &str) -> Option<Vec<NodeType>> {
        let mut chain = Vec::new();
        let mut next = Some(name.to_lowercase());
        while let Some(current) = next {
            if chain.len() >= MAX_DEPTH {
                return None;
            }
            let node_type = self.types.get(&current)?.value().clone();
            next = node_type.extends.as_deref().map(str::to_lowercase);
            chain.push(node_type);
        }
        chain.reverse();
        Some(chain)
    }

    /// Create a node of type `name`, or `None` if the type (or one of its
    /// ancestors) is unknown.
    pub fn create(&self, name: &str) -> Option<Object> {
        let chain = self.chain(name)?;
        let subtype = chain.last().map(|t| t.name.clone())?;
        let mut node = Node::new(&subtype);
        for node_type in &chain {
            (node_type.init)(&mut node);
        }
        Some(new_object(node))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in Types
// ═══════════════════════════════════════════════════════════════════════

/// `(name, kind, default, always_notify)`
type FieldSpec = (&'static str, FieldKind, Option<&'static str>, bool);

fn fields(specs: &'static [FieldSpec]) -> impl Fn(&mut Node) + Send + Sync {
    move |node| {
        for &(name, kind, default, always_notify) in specs {
            let value = default.map_or_else(|| kind.default_value(), |text| kind.parse_default(text));
            node.add_field_with(name, kind, value, always_notify);
        }
    }
}

use FieldKind as F;

const NODE: &[FieldSpec] = &[
    ("id", F::String, None, false),
    ("focusedChild", F::Node, None, true),
    ("focusable", F::Boolean, None, false),
    ("change", F::AssocArray, None, false),
];

const GROUP: &[FieldSpec] = &[
    ("visible", F::Boolean, Some("true"), false),
    ("opacity", F::Float, Some("1.0"), false),
    ("translation", F::Array, Some("[0.0,0.0]"), false),
    ("rotation", F::Float, Some("0.0"), false),
    ("scale", F::Array, Some("[1.0,1.0]"), false),
    ("scaleRotateCenter", F::Array, Some("[0.0,0.0]"), false),
    ("childRenderOrder", F::String, Some("renderLast"), false),
    ("inheritParentTransform", F::Boolean, Some("true"), false),
    ("inheritParentOpacity", F::Boolean, Some("true"), false),
    ("clippingRect", F::Array, Some("[0.0,0.0,0.0,0.0]"), false),
    ("renderPass", F::Int32, Some("0"), false),
];

const CONTENT_NODE: &[FieldSpec] = &[
    ("title", F::String, None, false),
    ("description", F::String, None, false),
    ("url", F::String, None, false),
    ("hdPosterUrl", F::String, None, false),
    ("contentType", F::String, None, false),
    ("length", F::Int32, None, false),
];

const SCENE: &[FieldSpec] = &[
    ("backgroundURI", F::String, None, false),
    ("backgroundColor", F::Color, Some("0x2F3140FF"), false),
    ("backExitsScene", F::Boolean, Some("true"), false),
    ("dialog", F::Node, None, false),
    ("currentDesignResolution", F::AssocArray, None, false),
];

const LABEL: &[FieldSpec] = &[
    ("text", F::String, Some(""), false),
    ("color", F::Color, Some("0xddddddff"), false),
    ("horizAlign", F::String, Some("left"), false),
    ("vertAlign", F::String, Some("top"), false),
    ("width", F::Float, Some("0"), false),
    ("height", F::Float, Some("0"), false),
    ("numLines", F::Int32, Some("0"), false),
    ("maxLines", F::Int32, Some("0"), false),
    ("wrap", F::Boolean, Some("false"), false),
    ("lineSpacing", F::Float, Some("0"), false),
];

const RECTANGLE: &[FieldSpec] = &[
    ("width", F::Float, Some("0.0"), false),
    ("height", F::Float, Some("0.0"), false),
    ("color", F::Color, Some("0xFFFFFFFF"), false),
    ("blendingEnabled", F::Boolean, Some("true"), false),
];

const TIMER: &[FieldSpec] = &[
    ("control", F::String, None, false),
    ("repeat", F::Boolean, None, false),
    ("duration", F::Float, None, false),
    ("fire", F::Object, None, true),
];

fn builtin_types() -> Vec<NodeType> {
    vec![
        NodeType::new("Node", None, fields(NODE)),
        NodeType::new("Group", Some("Node"), fields(GROUP)),
        NodeType::new("ContentNode", Some("Node"), fields(CONTENT_NODE)),
        NodeType::new("Scene", Some("Group"), fields(SCENE)),
        NodeType::new("Label", Some("Group"), fields(LABEL)),
        NodeType::new("Rectangle", Some("Group"), fields(RECTANGLE)),
        NodeType::new("Timer", Some("Node"), fields(TIMER)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_inherited_fields() {
        let registry = NodeTypeRegistry::new();
        let label = registry.create("label").unwrap();
        let component = label.borrow();
        let node = component.as_node().unwrap();
        assert_eq!(node.subtype(), "Label");
        assert!(node.has_field("id"));
        assert!(node.has_field("visible"));
        assert_eq!(node.get("color"), Some(Value::from("0xddddddff")));
        assert_eq!(node.get("opacity"), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_unknown_types() {
        let registry = NodeTypeRegistry::new();
        assert!(registry.create("Poster").is_none());
        assert!(!registry.can_resolve("Poster"));
        registry.add_node_types([NodeType::new("Widget", Some("Missing"), |_| {})]);
        assert!(!registry.can_resolve("Widget"));
    }

    #[test]
    fn test_registered_type_extends_builtin() {
        let registry = NodeTypeRegistry::new();
        registry.add_node_types([NodeType::new("Badge", Some("Rectangle"), |node| {
            node.add_field("count", FieldKind::Int32, false);
        })]);
        assert!(registry.can_resolve("BADGE"));
        let badge = registry.create("Badge").unwrap();
        let component = badge.borrow();
        let node = component.as_node().unwrap();
        assert!(node.has_field("count"));
        assert!(node.has_field("blendingEnabled"));
    }

    #[test]
    fn test_registries_are_independent() {
        let a = NodeTypeRegistry::new();
        let b = NodeTypeRegistry::new();
        a.add_node_types([NodeType::new("Only", None, |_| {})]);
        assert!(a.can_resolve("Only"));
        assert!(!b.can_resolve("Only"));
    }

    #[test]
    fn test_self_extending_type_is_unresolvable() {
        let registry = NodeTypeRegistry::empty();
        registry.add_node_types([NodeType::new("Loop", Some("Loop"), |_| {})]);
        assert!(!registry.can_resolve("Loop"));
    }
}
