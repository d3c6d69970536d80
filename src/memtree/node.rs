//! Transient node representation
//!
//! Node numbers are dense indices into the transient tree's columns.
//! Slot 0 is the document node; constructed nodes start at 1.

use std::fmt;

/// Compact node identifier (index into the transient arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeNumber(u32);

impl NodeNumber {
    /// The document node, parent of every top-level node
    pub const DOCUMENT: NodeNumber = NodeNumber(0);

    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        NodeNumber(index as u32)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_document(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for NodeNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Text,
    /// CDATA section
    CData,
    /// Comment
    Comment,
    /// Processing instruction
    ProcessingInstruction,
    /// Placeholder for an already materialized external node
    Reference,
    /// Namespace node (lives in the namespace table)
    Namespace,
    /// Attribute (lives in the attribute table)
    Attribute,
    /// Document type declaration
    DocumentType,
}

impl NodeKind {
    /// Text and CDATA carry coalescable character data
    #[inline]
    pub fn is_text_like(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::CData)
    }
}

/// Sibling-or-ascend link of a node.
///
/// `Sibling` points at the next node on the same level. `Parent` means the
/// node is the last of its siblings and names the node whose post-order
/// processing resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Sibling(NodeNumber),
    Parent(NodeNumber),
    /// Only the document node has no link
    End,
}

/// Attribute type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttrType {
    #[default]
    CData,
    Id,
    IdRef,
    IdRefs,
}

impl AttrType {
    /// Classify a declared type hint (`ID`, `IDREF`, `IDREFS`, anything else is CDATA)
    pub fn from_hint(hint: &str) -> Self {
        match hint {
            "ID" => AttrType::Id,
            "IDREF" => AttrType::IdRef,
            "IDREFS" => AttrType::IdRefs,
            _ => AttrType::CData,
        }
    }
}

/// Byte range in the shared character buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CharSpan {
    pub start: u32,
    pub len: u32,
}

impl CharSpan {
    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self { start, len }
    }

    #[inline]
    pub const fn end(&self) -> u32 {
        self.start + self.len
    }

    #[inline]
    pub fn slice<'a>(&self, chars: &'a str) -> &'a str {
        chars
            .get(self.start as usize..self.end() as usize)
            .unwrap_or("")
    }
}

/// Per-node payload, interpreted according to the node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeData {
    None,
    /// Character-bearing kinds (text, CDATA, comment, PI data)
    Chars(CharSpan),
    /// First attribute and first namespace entry owned by an element
    Element {
        attrs: Option<u32>,
        namespaces: Option<u32>,
    },
    /// Index into the external reference table
    Reference(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_node_number() {
        assert!(NodeNumber::DOCUMENT.is_document());
        assert!(!NodeNumber::new(1).is_document());
        assert_eq!(NodeNumber::new(3).to_string(), "#3");
    }

    #[test]
    fn test_attr_type_hints() {
        assert_eq!(AttrType::from_hint("ID"), AttrType::Id);
        assert_eq!(AttrType::from_hint("IDREFS"), AttrType::IdRefs);
        assert_eq!(AttrType::from_hint("NMTOKEN"), AttrType::CData);
    }

    #[test]
    fn test_char_span_slice() {
        let chars = "helloworld";
        assert_eq!(CharSpan::new(5, 5).slice(chars), "world");
        assert_eq!(CharSpan::new(8, 5).slice(chars), "");
    }
}
