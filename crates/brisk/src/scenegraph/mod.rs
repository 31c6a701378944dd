//! Retained scene graph: nodes, typed fields and change observers

pub mod field;
pub mod node;
pub mod observer;
pub mod registry;

pub use field::{Field, FieldKind, NotifyState, SetOutcome};
pub use node::{
    add_field, append_child, find_node, get_field, observe, remove_child, remove_field, set_field, unobserve, Node,
};
pub use observer::{Callback, FieldEvent, NativeObserver, NativeSink, Observer, ObserverSink};
pub use registry::{NodeType, NodeTypeRegistry};
