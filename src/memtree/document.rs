//! Transient Document - struct-of-arrays XML tree
//!
//! Dense storage for one in-memory document:
//! - One column per node property, indexed by node number
//! - A single shared character buffer for all character data
//! - Attribute, namespace and reference tables owned by their element
//! - Interned names for elements, attributes and PI targets
//!
//! Only the builder mutates a document; once handed out it is read-only.

use super::node::{AttrType, CharSpan, Link, NodeData, NodeKind, NodeNumber};
use super::reference::ExternalRef;
use crate::config::BuilderConfig;
use crate::core::{DocumentType, QName, SymbolId, SymbolTable};

/// An in-memory document produced by the tree builder
#[derive(Debug)]
pub struct TransientDocument {
    // Node columns
    kind: Vec<NodeKind>,
    level: Vec<u32>,
    name: Vec<Option<SymbolId>>,
    data: Vec<NodeData>,
    next: Vec<Link>,

    /// Character data of every text-bearing node and attribute value
    chars: String,

    // Attribute table
    attr_name: Vec<SymbolId>,
    attr_value: Vec<CharSpan>,
    attr_parent: Vec<NodeNumber>,
    attr_type: Vec<AttrType>,

    // Namespace table
    ns_name: Vec<SymbolId>,
    ns_parent: Vec<NodeNumber>,

    references: Vec<ExternalRef>,
    names: SymbolTable,
    doctype: Option<DocumentType>,
    explicit: bool,
}

/// Borrowed view of one attribute table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRef<'a> {
    pub name: &'a QName,
    pub value: &'a str,
    pub attr_type: AttrType,
}

impl Default for TransientDocument {
    fn default() -> Self {
        Self::new(&BuilderConfig::default(), false)
    }
}

impl TransientDocument {
    /// Create an empty document sized from the capacity hints in `config`
    pub fn new(config: &BuilderConfig, explicit: bool) -> Self {
        let nodes = config.initial_nodes.max(1);
        let mut doc = TransientDocument {
            kind: Vec::with_capacity(nodes),
            level: Vec::with_capacity(nodes),
            name: Vec::with_capacity(nodes),
            data: Vec::with_capacity(nodes),
            next: Vec::with_capacity(nodes),
            chars: String::with_capacity(config.initial_chars),
            attr_name: Vec::with_capacity(config.initial_attributes),
            attr_value: Vec::with_capacity(config.initial_attributes),
            attr_parent: Vec::with_capacity(config.initial_attributes),
            attr_type: Vec::with_capacity(config.initial_attributes),
            ns_name: Vec::with_capacity(config.initial_namespaces),
            ns_parent: Vec::with_capacity(config.initial_namespaces),
            references: Vec::new(),
            names: SymbolTable::new(),
            doctype: None,
            explicit,
        };
        doc.push_document_node();
        doc
    }

    fn push_document_node(&mut self) {
        self.kind.push(NodeKind::Document);
        self.level.push(0);
        self.name.push(None);
        self.data.push(NodeData::None);
        self.next.push(Link::End);
    }

    /// Empty every table, keeping allocated capacity
    pub(crate) fn clear(&mut self, explicit: bool) {
        self.kind.clear();
        self.level.clear();
        self.name.clear();
        self.data.clear();
        self.next.clear();
        self.chars.clear();
        self.attr_name.clear();
        self.attr_value.clear();
        self.attr_parent.clear();
        self.attr_type.clear();
        self.ns_name.clear();
        self.ns_parent.clear();
        self.references.clear();
        self.names.clear();
        self.doctype = None;
        self.explicit = explicit;
        self.push_document_node();
    }

    // === Builder methods (used by TreeBuilder) ===

    /// Allocate the next node number
    pub(crate) fn add_node(&mut self, kind: NodeKind, level: u32, name: Option<&QName>) -> NodeNumber {
        let nr = NodeNumber::new(self.kind.len());
        let name_id = name.map(|qn| self.names.intern(qn));
        let data = match kind {
            NodeKind::Element => NodeData::Element {
                attrs: None,
                namespaces: None,
            },
            _ => NodeData::None,
        };
        self.kind.push(kind);
        self.level.push(level);
        self.name.push(name_id);
        self.data.push(data);
        self.next.push(Link::End);
        nr
    }

    #[inline]
    pub(crate) fn set_next(&mut self, nr: NodeNumber, link: Link) {
        self.next[nr.index()] = link;
    }

    fn push_chars(&mut self, s: &str) -> CharSpan {
        let start = self.chars.len() as u32;
        self.chars.push_str(s);
        CharSpan::new(start, s.len() as u32)
    }

    /// Set the character data of a freshly added node
    pub(crate) fn add_chars(&mut self, nr: NodeNumber, s: &str) {
        let span = self.push_chars(s);
        self.data[nr.index()] = NodeData::Chars(span);
    }

    /// Append to a node's character data, growing in place when its span
    /// ends the buffer and relocating it to the end otherwise
    pub(crate) fn append_chars(&mut self, nr: NodeNumber, s: &str) {
        let span = match self.data[nr.index()] {
            NodeData::Chars(span) => span,
            _ => CharSpan::new(self.chars.len() as u32, 0),
        };
        let grown = if span.end() as usize == self.chars.len() {
            self.chars.push_str(s);
            CharSpan::new(span.start, span.len + s.len() as u32)
        } else {
            let start = self.chars.len();
            self.chars
                .extend_from_within(span.start as usize..span.end() as usize);
            self.chars.push_str(s);
            CharSpan::new(start as u32, (self.chars.len() - start) as u32)
        };
        self.data[nr.index()] = NodeData::Chars(grown);
    }

    /// Turn a reference node into a text node holding `s`
    pub(crate) fn replace_reference_node(&mut self, nr: NodeNumber, s: &str) {
        let span = self.push_chars(s);
        self.kind[nr.index()] = NodeKind::Text;
        self.data[nr.index()] = NodeData::Chars(span);
    }

    pub(crate) fn add_reference(&mut self, nr: NodeNumber, node: ExternalRef) {
        let idx = self.references.len() as u32;
        self.references.push(node);
        self.data[nr.index()] = NodeData::Reference(idx);
    }

    /// Append an attribute entry owned by `owner`, returning its table index
    pub(crate) fn add_attribute(
        &mut self,
        owner: NodeNumber,
        name: &QName,
        value: &str,
        attr_type: AttrType,
    ) -> u32 {
        let idx = self.attr_name.len() as u32;
        let name_id = self.names.intern(name);
        let span = self.push_chars(value);
        self.attr_name.push(name_id);
        self.attr_value.push(span);
        self.attr_parent.push(owner);
        self.attr_type.push(attr_type);
        if let NodeData::Element { attrs, .. } = &mut self.data[owner.index()] {
            attrs.get_or_insert(idx);
        }
        idx
    }

    /// Find an attribute of `owner` by expanded name
    pub(crate) fn find_attribute(&self, owner: NodeNumber, name: &QName) -> Option<u32> {
        self.attribute_range(owner)
            .find(|&i| self.names.get(self.attr_name[i]).is_some_and(|qn| qn.matches(name)))
            .map(|i| i as u32)
    }

    pub(crate) fn set_attribute_value(&mut self, idx: u32, value: &str, attr_type: AttrType) {
        let span = self.push_chars(value);
        self.attr_value[idx as usize] = span;
        self.attr_type[idx as usize] = attr_type;
    }

    /// Append a namespace entry owned by `owner`, returning its table index
    pub(crate) fn add_namespace(&mut self, owner: NodeNumber, name: &QName) -> u32 {
        let idx = self.ns_name.len() as u32;
        let name_id = self.names.intern(name);
        self.ns_name.push(name_id);
        self.ns_parent.push(owner);
        if let NodeData::Element { namespaces, .. } = &mut self.data[owner.index()] {
            namespaces.get_or_insert(idx);
        }
        idx
    }

    pub(crate) fn set_doctype(&mut self, doctype: DocumentType) {
        self.doctype = Some(doctype);
    }

    // === Accessors ===

    /// Number of constructed nodes (the document node is not counted)
    #[inline]
    pub fn len(&self) -> usize {
        self.kind.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recently allocated node, or the document node if none
    #[inline]
    pub fn last_node(&self) -> NodeNumber {
        NodeNumber::new(self.kind.len() - 1)
    }

    #[inline]
    fn contains(&self, nr: NodeNumber) -> bool {
        nr.index() < self.kind.len()
    }

    /// Node kind; references report `Reference`
    #[inline]
    pub fn kind(&self, nr: NodeNumber) -> Option<NodeKind> {
        self.kind.get(nr.index()).copied()
    }

    /// Depth in the tree; top-level nodes are on level 1
    #[inline]
    pub fn level(&self, nr: NodeNumber) -> Option<u32> {
        self.level.get(nr.index()).copied()
    }

    /// Name of an element or PI target
    pub fn name(&self, nr: NodeNumber) -> Option<&QName> {
        let id = (*self.name.get(nr.index())?)?;
        self.names.get(id)
    }

    #[inline]
    pub fn link(&self, nr: NodeNumber) -> Option<Link> {
        self.next.get(nr.index()).copied()
    }

    /// First child of an element or of the document node
    pub fn first_child(&self, nr: NodeNumber) -> Option<NodeNumber> {
        match self.kind(nr)? {
            NodeKind::Element | NodeKind::Document => {}
            _ => return None,
        }
        let candidate = NodeNumber::new(nr.index() + 1);
        if self.contains(candidate) && self.level[candidate.index()] > self.level[nr.index()] {
            Some(candidate)
        } else {
            None
        }
    }

    #[inline]
    pub fn next_sibling(&self, nr: NodeNumber) -> Option<NodeNumber> {
        match self.link(nr)? {
            Link::Sibling(next) => Some(next),
            _ => None,
        }
    }

    /// Parent node; the document node for top-level nodes
    pub fn parent(&self, nr: NodeNumber) -> Option<NodeNumber> {
        let mut current = nr;
        loop {
            match self.link(current)? {
                Link::Sibling(next) => current = next,
                Link::Parent(parent) => return Some(parent),
                Link::End => return None,
            }
        }
    }

    /// Iterate over the children of an element or of the document node
    pub fn children(&self, nr: NodeNumber) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.first_child(nr),
        }
    }

    pub fn child_count(&self, nr: NodeNumber) -> usize {
        self.children(nr).count()
    }

    fn attribute_range(&self, owner: NodeNumber) -> impl Iterator<Item = usize> + '_ {
        let start = match self.data.get(owner.index()) {
            Some(NodeData::Element { attrs: Some(start), .. }) => *start as usize,
            _ => self.attr_parent.len(),
        };
        (start..self.attr_parent.len()).take_while(move |&i| self.attr_parent[i] == owner)
    }

    pub fn attribute_count(&self, owner: NodeNumber) -> usize {
        self.attribute_range(owner).count()
    }

    /// Attributes of an element in insertion order
    pub fn attributes(&self, owner: NodeNumber) -> impl Iterator<Item = AttributeRef<'_>> + '_ {
        self.attribute_range(owner).filter_map(move |i| {
            Some(AttributeRef {
                name: self.names.get(self.attr_name[i])?,
                value: self.attr_value[i].slice(&self.chars),
                attr_type: self.attr_type[i],
            })
        })
    }

    /// Namespace nodes of an element, as `xmlns` / `xmlns:prefix` names
    pub fn namespaces(&self, owner: NodeNumber) -> impl Iterator<Item = &QName> + '_ {
        let start = match self.data.get(owner.index()) {
            Some(NodeData::Element { namespaces: Some(start), .. }) => *start as usize,
            _ => self.ns_parent.len(),
        };
        (start..self.ns_parent.len())
            .take_while(move |&i| self.ns_parent[i] == owner)
            .filter_map(move |i| self.names.get(self.ns_name[i]))
    }

    /// Character data of a text, CDATA, comment or PI node
    pub fn text(&self, nr: NodeNumber) -> Option<&str> {
        match self.data.get(nr.index())? {
            NodeData::Chars(span) => Some(span.slice(&self.chars)),
            _ => match self.kind(nr)? {
                NodeKind::Text | NodeKind::CData | NodeKind::Comment | NodeKind::ProcessingInstruction => Some(""),
                _ => None,
            },
        }
    }

    /// External node behind a reference node
    pub fn reference(&self, nr: NodeNumber) -> Option<&ExternalRef> {
        match self.data.get(nr.index())? {
            NodeData::Reference(idx) => self.references.get(*idx as usize),
            _ => None,
        }
    }

    /// XPath string value: the node's own data for leaves, concatenated
    /// descendant text for elements and the document node
    pub fn string_value(&self, nr: NodeNumber) -> String {
        match self.kind(nr) {
            Some(NodeKind::Element) | Some(NodeKind::Document) => {}
            Some(NodeKind::Reference) => {
                return self.reference(nr).map(|r| r.string_value()).unwrap_or_default()
            }
            _ => return self.text(nr).unwrap_or_default().to_owned(),
        }
        let mut value = String::new();
        let base = self.level[nr.index()];
        let mut i = nr.index() + 1;
        while i < self.kind.len() && self.level[i] > base {
            let child = NodeNumber::new(i);
            match self.kind[i] {
                NodeKind::Text | NodeKind::CData => value.push_str(self.text(child).unwrap_or_default()),
                NodeKind::Reference => {
                    if let Some(r) = self.reference(child) {
                        if matches!(r.kind(), NodeKind::Element | NodeKind::Text | NodeKind::CData) {
                            value.push_str(&r.string_value());
                        }
                    }
                }
                _ => {}
            }
            i += 1;
        }
        value
    }

    pub fn doctype(&self) -> Option<&DocumentType> {
        self.doctype.as_ref()
    }

    /// True if the document was created by an explicit document constructor
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Size of the shared character buffer in bytes
    pub fn chars_len(&self) -> usize {
        self.chars.len()
    }
}

/// Iterator over the children of a node, following sibling links
pub struct ChildIter<'a> {
    doc: &'a TransientDocument,
    next: Option<NodeNumber>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeNumber;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}
