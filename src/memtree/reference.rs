//! External node handles
//!
//! A reference node in the transient tree points at a node that already
//! lives in another tree (usually a persisted document). The builder only
//! keeps the handle; the referenced subtree is read when the tree is
//! materialized.

use super::node::{AttrType, NodeKind};
use crate::core::{DocumentType, QName};
use crate::storage::NodeId;
use std::fmt;
use std::sync::Arc;

/// Shared handle to an external node
pub type ExternalRef = Arc<dyn ExternalNode + Send + Sync>;

/// Attribute of an external element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalAttribute {
    pub name: QName,
    pub value: String,
    pub attr_type: AttrType,
}

/// Read access to a node owned by another tree
pub trait ExternalNode: fmt::Debug {
    /// Kind of the node (Document, Element, Text, CData, Comment,
    /// ProcessingInstruction or Attribute)
    fn kind(&self) -> NodeKind;

    /// Name of an element, attribute or PI target
    fn name(&self) -> Option<QName>;

    /// Concatenated character data of the node and its descendants; for a
    /// PI this is its data
    fn string_value(&self) -> String;

    /// Child nodes in document order (attributes excluded)
    fn children(&self) -> Vec<ExternalRef>;

    /// Attributes of an element
    fn attributes(&self) -> Vec<ExternalAttribute> {
        Vec::new()
    }

    /// Namespace mappings declared on an element, as (prefix, uri)
    fn namespaces(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Doctype of a document node
    fn doctype(&self) -> Option<DocumentType> {
        None
    }

    /// Persistent identity, if the node is stored
    fn node_id(&self) -> Option<NodeId> {
        None
    }
}
