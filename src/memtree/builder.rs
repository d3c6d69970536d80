//! Tree Builder
//!
//! Builds a TransientDocument from construction events.
//!
//! Siblings are linked through a per-level tracker holding the last node
//! seen on each nesting level: the previous sibling gets a `Sibling` link
//! to the new node and the new node gets a `Parent` link to the last node
//! one level up, so a reader can always ascend once the siblings run out.
//!
//! Adjacent character data is merged eagerly, so no two neighbouring
//! siblings are ever both text or CDATA.

use super::document::TransientDocument;
use super::node::{AttrType, Link, NodeKind, NodeNumber};
use super::reference::ExternalRef;
use crate::config::BuilderConfig;
use crate::core::{split_qname, DocumentType, QName};
use crate::error::{Error, Result};
use tracing::trace;

/// An attribute passed to [`TreeBuilder::start_element`]
#[derive(Debug, Clone)]
pub struct Attribute<'a> {
    pub name: QName,
    pub value: &'a str,
    /// Declared type (`ID`, `IDREF`, `IDREFS`, `CDATA`, ...)
    pub type_hint: &'a str,
}

impl<'a> Attribute<'a> {
    pub fn new(name: QName, value: &'a str) -> Self {
        Attribute {
            name,
            value,
            type_hint: "CDATA",
        }
    }

    pub fn with_type(mut self, type_hint: &'a str) -> Self {
        self.type_hint = type_hint;
        self
    }
}

/// Builder state for constructing a TransientDocument
///
/// A builder is confined to one construction context at a time; after
/// [`reset`](Self::reset) it can be reused and will recycle the previous
/// document's allocations.
#[derive(Debug)]
pub struct TreeBuilder {
    config: BuilderConfig,
    /// The document being built
    doc: Option<TransientDocument>,
    /// A cleared document kept for reuse after reset()
    spare: Option<TransientDocument>,
    /// Current nesting level; top-level nodes live on level 1
    level: u32,
    /// Last node seen on each level (slot 0 is the document node)
    prev_node_in_level: Vec<Option<NodeNumber>>,
    default_namespace: String,
    /// Prefixes bound in the surrounding static context, as (prefix, uri)
    prefixes: Vec<(String, String)>,
    replace_attribute: bool,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::with_config(BuilderConfig::default())
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        let prev_node_in_level = Self::fresh_tracker(config.initial_levels);
        TreeBuilder {
            config,
            doc: None,
            spare: None,
            level: 1,
            prev_node_in_level,
            default_namespace: String::new(),
            prefixes: Vec::new(),
            replace_attribute: false,
        }
    }

    fn fresh_tracker(levels: usize) -> Vec<Option<NodeNumber>> {
        let mut tracker = vec![None; levels.max(2)];
        tracker[0] = Some(NodeNumber::DOCUMENT);
        tracker
    }

    fn reset_tracker(&mut self) {
        self.level = 1;
        self.prev_node_in_level.fill(None);
        self.prev_node_in_level[0] = Some(NodeNumber::DOCUMENT);
    }

    /// Forget the current document and all builder state. The document's
    /// allocations are kept for the next start_document().
    pub fn reset(&mut self) {
        if let Some(doc) = self.doc.take() {
            self.spare = Some(doc);
        }
        self.reset_tracker();
        self.default_namespace.clear();
        self.prefixes.clear();
        self.replace_attribute = false;
    }

    /// Start building a new document
    pub fn start_document(&mut self) {
        self.start_document_explicit(false);
    }

    /// Start building a new document; `explicit` marks a document created
    /// by a document constructor rather than an implicit fragment
    pub fn start_document_explicit(&mut self, explicit: bool) {
        let doc = match self.doc.take().or_else(|| self.spare.take()) {
            Some(mut doc) => {
                doc.clear(explicit);
                doc
            }
            None => TransientDocument::new(&self.config, explicit),
        };
        self.doc = Some(doc);
        self.reset_tracker();
        self.replace_attribute = false;
    }

    /// End building the document
    pub fn end_document(&mut self) {}

    /// The document under construction
    pub fn document(&self) -> Option<&TransientDocument> {
        self.doc.as_ref()
    }

    /// Take ownership of the built document
    pub fn take_document(&mut self) -> Option<TransientDocument> {
        self.reset_tracker();
        self.doc.take()
    }

    /// Number of nodes constructed so far
    pub fn size(&self) -> usize {
        self.doc.as_ref().map_or(0, TransientDocument::len)
    }

    /// Current nesting level
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn set_default_namespace(&mut self, uri: &str) {
        self.default_namespace.clear();
        self.default_namespace.push_str(uri);
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    /// Bind a prefix in the static context consulted by start_element_ns
    pub fn bind_prefix(&mut self, prefix: &str, uri: &str) {
        self.prefixes.push((prefix.to_owned(), uri.to_owned()));
    }

    /// When set, add_attribute overwrites an existing attribute of the same
    /// name. Cleared by start_document().
    pub fn set_replace_attribute(&mut self, replace: bool) {
        self.replace_attribute = replace;
    }

    fn doc_mut(&mut self) -> Result<&mut TransientDocument> {
        self.doc.as_mut().ok_or(Error::NoDocument)
    }

    /// Last sibling on the current level
    #[inline]
    fn prev_in_level(&self) -> Option<NodeNumber> {
        self.prev_node_in_level
            .get(self.level as usize)
            .copied()
            .flatten()
    }

    fn ensure_level(&mut self, level: usize) {
        if self.prev_node_in_level.len() <= level {
            self.prev_node_in_level.resize(level + 1, None);
        }
    }

    /// Link a new node into its parent's child chain
    fn link_node(&mut self, nr: NodeNumber) {
        let level = self.level as usize;
        self.ensure_level(level + 1);
        let parent = self.prev_node_in_level[level - 1].unwrap_or(NodeNumber::DOCUMENT);
        let prev = self.prev_node_in_level[level];
        if let Some(doc) = self.doc.as_mut() {
            if let Some(prev) = prev {
                doc.set_next(prev, Link::Sibling(nr));
            }
            doc.set_next(nr, Link::Parent(parent));
        }
        self.prev_node_in_level[level] = Some(nr);
    }

    fn attribute_type(name: &QName, type_hint: &str) -> AttrType {
        if name.matches(&QName::xml_id()) {
            AttrType::Id
        } else {
            AttrType::from_hint(type_hint)
        }
    }

    /// Create a new element and return its node number
    ///
    /// Namespace declaration attributes are skipped; declare namespaces
    /// with [`namespace_node`](Self::namespace_node).
    pub fn start_element(&mut self, name: &QName, attributes: &[Attribute<'_>]) -> Result<NodeNumber> {
        let level = self.level;
        let doc = self.doc_mut()?;
        let nr = doc.add_node(NodeKind::Element, level, Some(name));

        for attr in attributes {
            if attr.name.is_namespace_declaration() {
                continue;
            }
            let attr_type = Self::attribute_type(&attr.name, attr.type_hint);
            doc.add_attribute(nr, &attr.name, attr.value, attr_type);
        }

        self.link_node(nr);
        self.level += 1;
        trace!(node = %nr, name = %name, level, "start element");
        Ok(nr)
    }

    /// Create a new element from SAX-style name parts
    ///
    /// When `local_name` is empty it is taken from the lexical `qname`.
    /// If the element is not in the default namespace, a prefix bound to its
    /// namespace in the static context wins over the lexical prefix.
    pub fn start_element_ns(
        &mut self,
        namespace_uri: &str,
        local_name: &str,
        qname: &str,
        attributes: &[Attribute<'_>],
    ) -> Result<NodeNumber> {
        let (lexical_prefix, lexical_local) = split_qname(qname);
        let mut prefix = None;
        if self.default_namespace != namespace_uri {
            prefix = self
                .prefixes
                .iter()
                .rev()
                .find(|(_, uri)| uri == namespace_uri)
                .map(|(p, _)| p.clone());
        }
        let prefix = prefix.or_else(|| lexical_prefix.map(str::to_owned));
        let local = if local_name.is_empty() {
            lexical_local
        } else {
            local_name
        };
        let name = QName::new(local, namespace_uri, prefix.as_deref());
        self.start_element(&name, attributes)
    }

    /// Close the last element created
    pub fn end_element(&mut self) -> Result<()> {
        if self.doc.is_none() {
            return Err(Error::NoDocument);
        }
        if self.level <= 1 {
            return Err(Error::UnbalancedEndElement);
        }
        let level = self.level as usize;
        if let Some(slot) = self.prev_node_in_level.get_mut(level) {
            *slot = None;
        }
        self.level -= 1;
        Ok(())
    }

    /// Create a text node, or extend the preceding text sibling
    pub fn characters(&mut self, text: &str) -> Result<NodeNumber> {
        self.character_data(NodeKind::Text, text)
    }

    /// Create a CDATA node, or extend the preceding text sibling
    pub fn cdata_section(&mut self, text: &str) -> Result<NodeNumber> {
        self.character_data(NodeKind::CData, text)
    }

    /// Merge `text` into the previous sibling if it carries character data.
    /// Returns the merged node, or None if a new node is needed.
    fn coalesce(&mut self, text: &str) -> Result<Option<NodeNumber>> {
        let prev = self.prev_in_level();
        let doc = self.doc_mut()?;
        let Some(prev) = prev else {
            return Ok(None);
        };
        match doc.kind(prev) {
            Some(kind) if kind.is_text_like() => {
                doc.append_chars(prev, text);
                trace!(node = %prev, "appended character data");
                Ok(Some(prev))
            }
            Some(NodeKind::Reference) => {
                let merged = doc
                    .reference(prev)
                    .filter(|r| r.kind().is_text_like())
                    .map(|r| {
                        let mut value = r.string_value();
                        value.push_str(text);
                        value
                    });
                match merged {
                    Some(value) => {
                        doc.replace_reference_node(prev, &value);
                        trace!(node = %prev, "replaced text reference with merged text");
                        Ok(Some(prev))
                    }
                    None => Ok(None),
                }
            }
            _ => Ok(None),
        }
    }

    fn character_data(&mut self, kind: NodeKind, text: &str) -> Result<NodeNumber> {
        if let Some(merged) = self.coalesce(text)? {
            return Ok(merged);
        }
        let level = self.level;
        let doc = self.doc_mut()?;
        let nr = doc.add_node(kind, level, None);
        doc.add_chars(nr, text);
        self.link_node(nr);
        Ok(nr)
    }

    /// Create a comment node; comments are never merged
    pub fn comment(&mut self, text: &str) -> Result<NodeNumber> {
        let level = self.level;
        let doc = self.doc_mut()?;
        let nr = doc.add_node(NodeKind::Comment, level, None);
        doc.add_chars(nr, text);
        self.link_node(nr);
        Ok(nr)
    }

    /// Create a processing instruction node
    pub fn processing_instruction(&mut self, target: &str, data: Option<&str>) -> Result<NodeNumber> {
        let level = self.level;
        let doc = self.doc_mut()?;
        let nr = doc.add_node(NodeKind::ProcessingInstruction, level, Some(&QName::local(target)));
        doc.add_chars(nr, data.unwrap_or(""));
        self.link_node(nr);
        Ok(nr)
    }

    /// Declare a namespace on the element created last
    ///
    /// `name` uses the namespace-node form built by
    /// [`QName::namespace_decl`]. Returns false when the declaration is
    /// redundant with the element's own namespace and was suppressed.
    /// Declaring the default namespace on an unprefixed element in no
    /// namespace is a namespace error and leaves the tree unchanged.
    pub fn namespace_node(&mut self, name: &QName) -> Result<bool> {
        let doc = self.doc_mut()?;
        let owner = doc.last_node();
        if doc.kind(owner) != Some(NodeKind::Element) {
            return Err(Error::NoOwnerElement {
                operation: "namespace_node",
            });
        }
        let Some(elem) = doc.name(owner) else {
            return Err(Error::NoOwnerElement {
                operation: "namespace_node",
            });
        };

        let elem_prefix = elem.prefix().unwrap_or("");
        let declared = name.declared_prefix();
        if elem_prefix.is_empty() && elem.has_no_namespace() && declared.is_empty() {
            return Err(Error::namespace(
                "Cannot output a namespace node for the default namespace when the element is in no namespace.",
            ));
        }
        if declared == elem_prefix
            && !elem.has_no_namespace()
            && name.namespace_uri() == elem.namespace_uri()
        {
            trace!(node = %owner, prefix = declared, "suppressed redundant namespace node");
            return Ok(false);
        }

        doc.add_namespace(owner, name);
        Ok(true)
    }

    /// Declare `prefix` (empty for the default namespace) bound to `uri`
    pub fn namespace_node_for(&mut self, prefix: &str, uri: &str) -> Result<bool> {
        self.namespace_node(&QName::namespace_decl(prefix, uri))
    }

    /// Attach an attribute to the node created last, which must be an
    /// element. Returns the attribute's index in the attribute table.
    pub fn add_attribute(&mut self, name: &QName, value: &str) -> Result<usize> {
        let replace = self.replace_attribute;
        let doc = self.doc_mut()?;
        let owner = doc.last_node();
        if doc.kind(owner) != Some(NodeKind::Element) {
            return Err(Error::NoOwnerElement {
                operation: "add_attribute",
            });
        }
        let attr_type = Self::attribute_type(name, "CDATA");
        if replace {
            if let Some(idx) = doc.find_attribute(owner, name) {
                doc.set_attribute_value(idx, value, attr_type);
                return Ok(idx as usize);
            }
        }
        Ok(doc.add_attribute(owner, name, value, attr_type) as usize)
    }

    /// Add a reference to an already materialized node
    ///
    /// A document node is flattened: each of its children is added as its
    /// own reference, and at the top level its doctype is adopted. Text
    /// references merge with a preceding text sibling like characters()
    /// does. Returns the first node added, if any.
    pub fn add_reference_node(&mut self, node: ExternalRef) -> Result<Option<NodeNumber>> {
        if node.kind() != NodeKind::Document {
            return self.add_single_reference(node).map(Some);
        }

        let level = self.level;
        if level == 1 {
            if let Some(doctype) = node.doctype() {
                self.doc_mut()?.set_doctype(doctype);
            }
        }
        let mut first = None;
        for child in node.children() {
            let nr = self.add_single_reference(child)?;
            first.get_or_insert(nr);
        }
        Ok(first)
    }

    fn add_single_reference(&mut self, node: ExternalRef) -> Result<NodeNumber> {
        if node.kind().is_text_like() {
            let value = node.string_value();
            if let Some(merged) = self.coalesce(&value)? {
                return Ok(merged);
            }
        }
        let level = self.level;
        let doc = self.doc_mut()?;
        let nr = doc.add_node(NodeKind::Reference, level, None);
        doc.add_reference(nr, node);
        self.link_node(nr);
        Ok(nr)
    }

    /// Declare the document type of the tree; ignored below the top level
    pub fn document_type(&mut self, name: &str, public_id: Option<&str>, system_id: Option<&str>) -> Result<()> {
        let level = self.level;
        let doc = self.doc_mut()?;
        if level == 1 {
            doc.set_doctype(DocumentType::new(name, public_id, system_id));
        }
        Ok(())
    }
}
