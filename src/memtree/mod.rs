//! In-memory (transient) XML trees
//!
//! - `document` - struct-of-arrays arena holding one tree
//! - `builder` - event-driven construction with eager text coalescing
//! - `reference` - handles to nodes owned by other trees
//! - `events` - owned construction events for record and replay
//! - `serialize` - XML output for inspection

pub mod builder;
pub mod document;
pub mod events;
pub mod node;
pub mod reference;
pub mod serialize;

pub use builder::{Attribute, TreeBuilder};
pub use document::{AttributeRef, ChildIter, TransientDocument};
pub use events::{BuildEvent, OwnedAttribute};
pub use node::{AttrType, CharSpan, Link, NodeData, NodeKind, NodeNumber};
pub use reference::{ExternalAttribute, ExternalNode, ExternalRef};
pub use serialize::{serialize_document, serialize_node};
