//! Persistent node records and target documents

use super::node_id::NodeId;
use crate::core::{DocumentType, QName};
use crate::error::Error;
use crate::memtree::AttrType;

/// Identifier of a persistent document
pub type DocId = u32;

/// Kinds of persistent nodes the materializer writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredKind {
    Element,
    Attribute,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

impl StoredKind {
    pub const ALL: [StoredKind; 6] = [
        StoredKind::Element,
        StoredKind::Attribute,
        StoredKind::Text,
        StoredKind::CData,
        StoredKind::Comment,
        StoredKind::ProcessingInstruction,
    ];

    #[inline]
    pub fn is_text_like(self) -> bool {
        matches!(self, StoredKind::Text | StoredKind::CData)
    }

    #[inline]
    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// A persistent node as handed to the storage broker
///
/// Instances are drawn from a per-kind pool during a store and reset
/// before each reuse, so brokers must copy what they keep.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    pub kind: StoredKind,
    pub doc: DocId,
    pub node_id: NodeId,
    /// Element, attribute or PI target name
    pub name: Option<QName>,
    /// Character data, attribute value or PI data
    pub value: String,
    pub child_count: u32,
    pub attribute_count: u32,
    pub attr_type: AttrType,
    /// Namespace mappings declared on an element, as (prefix, uri)
    pub namespaces: Vec<(String, String)>,
}

impl StoredNode {
    pub fn new(kind: StoredKind) -> Self {
        StoredNode {
            kind,
            doc: 0,
            node_id: NodeId::DOCUMENT,
            name: None,
            value: String::new(),
            child_count: 0,
            attribute_count: 0,
            attr_type: AttrType::CData,
            namespaces: Vec::new(),
        }
    }

    /// Clear every field except the kind, keeping allocations
    pub fn reset(&mut self) {
        self.doc = 0;
        self.node_id = NodeId::DOCUMENT;
        self.name = None;
        self.value.clear();
        self.child_count = 0;
        self.attribute_count = 0;
        self.attr_type = AttrType::CData;
        self.namespaces.clear();
    }

    pub fn declare_namespace(&mut self, prefix: &str, uri: &str) {
        self.namespaces.push((prefix.to_owned(), uri.to_owned()));
    }
}

/// The persistent document a materializer writes into
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDocument {
    id: DocId,
    collection: String,
    doctype: Option<DocumentType>,
    /// Top-level persistent nodes
    children: Vec<NodeId>,
}

impl TargetDocument {
    pub fn new(id: DocId, collection: impl Into<String>) -> Self {
        TargetDocument {
            id,
            collection: collection.into(),
            doctype: None,
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> DocId {
        self.id
    }

    /// Path of the collection holding the document
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn doctype(&self) -> Option<&DocumentType> {
        self.doctype.as_ref()
    }

    /// Declare the document type; only possible before any node is attached
    pub fn set_document_type(&mut self, doctype: DocumentType) -> Result<(), Error> {
        if !self.children.is_empty() {
            return Err(Error::DocumentType(format!(
                "document {} already has content; cannot declare {}",
                self.id, doctype
            )));
        }
        self.doctype = Some(doctype);
        Ok(())
    }

    pub fn append_child(&mut self, node_id: NodeId) {
        self.children.push(node_id);
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}
