//! Persistent Materializer
//!
//! Writes a finished TransientDocument into a persistent document in one
//! depth-first pass. A synthetic `exist:temp` wrapper element becomes the
//! persisted root and the transient top-level nodes become its children,
//! so fragments with several top-level nodes can be stored.
//!
//! The walk is iterative: an explicit stack holds the persistent elements
//! that are currently open. Nodes are handed to the broker in document
//! order, elements are closed in post order.
//!
//! Reference nodes are resolved here by their effective kind. Text read
//! through a reference can end up next to stored text the transient tree
//! never saw, so adjacent text of the same kind is merged again via
//! `append_characters`.

use super::pool::NodePool;
use crate::config::{CollectionConfiguration, IndexSpec};
use crate::core::{ns, DocumentType, QName};
use crate::error::{Error, Result, StorageError};
use crate::memtree::{AttrType, ExternalRef, Link, NodeKind, NodeNumber, TransientDocument};
use crate::storage::{NodeId, NodePath, StorageBroker, StoredKind, StoredNode, TargetDocument, Txn};
use std::sync::Arc;
use tracing::{debug, trace};

/// Maximum free wrappers kept per node kind
const POOL_SIZE: usize = 16;

/// Outcome of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    /// Id of the wrapper element
    pub root: NodeId,
    /// Nodes handed to the broker, wrapper and attributes included
    pub nodes_stored: usize,
    /// Text nodes merged into a preceding stored sibling
    pub coalesced: usize,
    /// Nodes of unsupported kinds that were left out
    pub skipped: usize,
}

/// An element whose subtree is being written
#[derive(Debug)]
struct OpenElement {
    node: StoredNode,
    /// Id handed to the last attribute or child
    last_child: Option<NodeId>,
}

/// The sibling stored last on the current level
#[derive(Debug, Clone)]
struct PrevNode {
    kind: StoredKind,
    id: NodeId,
}

/// The wrapper stays open for the whole walk
fn unbalanced() -> Error {
    StorageError::Corrupted("no open element during store".to_owned()).into()
}

enum ExpandStep {
    Enter(ExternalRef),
    Close,
}

pub struct Materializer<'a, B: StorageBroker + ?Sized> {
    broker: &'a mut B,
    txn: &'a Txn,
    doc: &'a TransientDocument,
    target: &'a mut TargetDocument,
    config: Option<Arc<CollectionConfiguration>>,
    scanned: bool,
    stack: Vec<OpenElement>,
    prev: Option<PrevNode>,
    pool: NodePool<StoredNode>,
    nodes_stored: usize,
    coalesced: usize,
    skipped: usize,
}

impl<'a, B: StorageBroker + ?Sized> Materializer<'a, B> {
    /// Prepare to write `doc` into `target`. The target collection's
    /// configuration is looked up once, here.
    pub fn new(
        broker: &'a mut B,
        txn: &'a Txn,
        doc: &'a TransientDocument,
        target: &'a mut TargetDocument,
    ) -> Self {
        let config = broker.collection_configuration(target.collection());
        Materializer {
            broker,
            txn,
            doc,
            target,
            config,
            scanned: false,
            stack: Vec::new(),
            prev: None,
            pool: NodePool::new(POOL_SIZE),
            nodes_stored: 0,
            coalesced: 0,
            skipped: 0,
        }
    }

    /// Declare the placeholder document type on the target document.
    /// Fails without writing anything if the target already has content.
    pub fn scan(&mut self) -> Result<()> {
        self.target.set_document_type(DocumentType::placeholder())?;
        self.scanned = true;
        Ok(())
    }

    /// Write the tree. Runs `scan` first if it has not been called.
    ///
    /// Storage errors are returned as soon as they occur; nodes written
    /// before the failure stay in the transaction.
    pub fn store(mut self) -> Result<StoreSummary> {
        if !self.scanned {
            self.scan()?;
        }
        let config = self.config.clone();
        let index = config.as_ref().and_then(|c| c.index.as_ref());
        debug!(
            doc = self.target.id(),
            collection = self.target.collection(),
            nodes = self.doc.len(),
            indexed = index.is_some(),
            "storing transient document"
        );

        let mut path = NodePath::new();
        let root = self.store_wrapper(&mut path, index)?;

        let doc = self.doc;
        for top in doc.children(NodeNumber::DOCUMENT) {
            self.store_subtree(top, &mut path, index)?;
        }
        self.close_element(&mut path, index)?;

        debug!(
            doc = self.target.id(),
            stored = self.nodes_stored,
            coalesced = self.coalesced,
            skipped = self.skipped,
            "stored transient document"
        );
        Ok(StoreSummary {
            root,
            nodes_stored: self.nodes_stored,
            coalesced: self.coalesced,
            skipped: self.skipped,
        })
    }

    fn store_wrapper(&mut self, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<NodeId> {
        let mut wrapper = self.pool.borrow_node(StoredKind::Element);
        wrapper.doc = self.target.id();
        wrapper.node_id = self.broker.node_factory().create_root();
        wrapper.name = Some(QName::wrapper());
        wrapper.child_count = self.doc.child_count(NodeNumber::DOCUMENT) as u32;
        wrapper.declare_namespace(ns::EXIST_PREFIX, ns::EXIST);

        path.add_component(QName::wrapper());
        self.broker.symbols().intern(&QName::wrapper());
        self.broker.store_node(self.txn, &wrapper, Some(&*path), index)?;
        self.nodes_stored += 1;
        self.target.append_child(wrapper.node_id.clone());
        trace!(node_id = %wrapper.node_id, "stored wrapper");

        let root = wrapper.node_id.clone();
        wrapper.child_count = 0;
        self.stack.push(OpenElement {
            node: wrapper,
            last_child: None,
        });
        self.prev = None;
        Ok(root)
    }

    /// Depth-first walk of one top-level node
    fn store_subtree(&mut self, top: NodeNumber, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<()> {
        let doc = self.doc;
        let mut nr = top;
        loop {
            self.start_node(nr, path, index)?;
            if let Some(child) = doc.first_child(nr) {
                nr = child;
                continue;
            }

            let mut current = nr;
            loop {
                self.end_node(current, path, index)?;
                if current == top {
                    return Ok(());
                }
                match doc.link(current) {
                    Some(Link::Sibling(next)) => {
                        nr = next;
                        break;
                    }
                    Some(Link::Parent(parent)) if !parent.is_document() => current = parent,
                    _ => return Ok(()),
                }
            }
        }
    }

    fn start_node(&mut self, nr: NodeNumber, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<()> {
        let doc = self.doc;
        let Some(kind) = doc.kind(nr) else {
            return Ok(());
        };
        match kind {
            NodeKind::Element => {
                let mut node = self.pool.borrow_node(StoredKind::Element);
                node.name = doc.name(nr).cloned();
                node.child_count = doc.child_count(nr) as u32;
                node.attribute_count = doc
                    .attributes(nr)
                    .filter(|a| !a.name.is_namespace_declaration())
                    .count() as u32;
                for decl in doc.namespaces(nr) {
                    node.declare_namespace(decl.declared_prefix(), decl.namespace_uri());
                }
                self.open_element(node, path, index)?;
                for attr in doc.attributes(nr) {
                    if attr.name.is_namespace_declaration() {
                        continue;
                    }
                    self.store_attribute(attr.name, attr.value, attr.attr_type, path, index)?;
                }
                self.prev = None;
            }
            NodeKind::Text | NodeKind::CData => {
                let kind = if kind == NodeKind::Text {
                    StoredKind::Text
                } else {
                    StoredKind::CData
                };
                self.store_character_data(kind, doc.text(nr).unwrap_or(""), index)?;
            }
            NodeKind::Comment => {
                self.store_leaf(StoredKind::Comment, None, doc.text(nr).unwrap_or(""), index)?;
            }
            NodeKind::ProcessingInstruction => {
                let target = doc.name(nr).cloned();
                self.store_leaf(StoredKind::ProcessingInstruction, target, doc.text(nr).unwrap_or(""), index)?;
            }
            NodeKind::Reference => match doc.reference(nr) {
                Some(node) => self.expand_reference(node.clone(), path, index)?,
                None => self.skip(nr, kind),
            },
            _ => self.skip(nr, kind),
        }
        Ok(())
    }

    fn end_node(&mut self, nr: NodeNumber, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<()> {
        if self.doc.kind(nr) == Some(NodeKind::Element) {
            self.close_element(path, index)?;
        }
        Ok(())
    }

    fn skip(&mut self, nr: NodeNumber, kind: NodeKind) {
        debug!(node = %nr, ?kind, "skipping unsupported node kind");
        self.skipped += 1;
    }

    /// Assign the id of the next node under the open element; attributes
    /// do not count as children
    fn attach(&mut self, is_child: bool) -> Result<NodeId> {
        let factory = self.broker.node_factory();
        let open = self.stack.last_mut().ok_or_else(unbalanced)?;
        let id = match &open.last_child {
            Some(previous) => factory.next_sibling(previous),
            None => factory.first_child(&open.node.node_id),
        };
        open.last_child = Some(id.clone());
        if is_child {
            open.node.child_count += 1;
        }
        Ok(id)
    }

    fn open_element(&mut self, mut node: StoredNode, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<()> {
        node.doc = self.target.id();
        node.node_id = self.attach(true)?;
        if let Some(name) = &node.name {
            self.broker.symbols().intern(name);
        }
        self.broker.store_node(self.txn, &node, Some(&*path), index)?;
        self.nodes_stored += 1;
        trace!(node_id = %node.node_id, path = %path, "stored element");

        if let Some(name) = &node.name {
            path.add_component(name.clone());
        }
        node.child_count = 0;
        self.stack.push(OpenElement {
            node,
            last_child: None,
        });
        Ok(())
    }

    fn close_element(&mut self, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<()> {
        let open = self.stack.pop().ok_or_else(unbalanced)?;
        self.broker.end_element(&open.node, path, index)?;
        path.remove_last_component();
        self.prev = Some(PrevNode {
            kind: StoredKind::Element,
            id: open.node.node_id.clone(),
        });
        self.pool.return_node(open.node);
        Ok(())
    }

    fn store_attribute(
        &mut self,
        name: &QName,
        value: &str,
        attr_type: AttrType,
        path: &NodePath,
        index: Option<&IndexSpec>,
    ) -> Result<()> {
        let mut attr = self.pool.borrow_node(StoredKind::Attribute);
        attr.doc = self.target.id();
        attr.node_id = self.attach(false)?;
        attr.name = Some(name.clone());
        attr.value.push_str(value);
        self.broker.symbols().intern(name);
        attr.attr_type = attr_type;
        self.broker.store_node(self.txn, &attr, Some(path), index)?;
        self.nodes_stored += 1;
        self.pool.return_node(attr);
        Ok(())
    }

    fn store_character_data(&mut self, kind: StoredKind, text: &str, index: Option<&IndexSpec>) -> Result<()> {
        if let Some(prev) = self.prev.as_ref().filter(|p| p.kind == kind) {
            self.broker
                .append_characters(self.txn, self.target.id(), &prev.id, text)?;
            self.coalesced += 1;
            trace!(node_id = %prev.id, "appended characters to stored sibling");
            return Ok(());
        }
        self.store_leaf(kind, None, text, index)
    }

    fn store_leaf(&mut self, kind: StoredKind, name: Option<QName>, value: &str, index: Option<&IndexSpec>) -> Result<()> {
        let mut node = self.pool.borrow_node(kind);
        node.doc = self.target.id();
        node.node_id = self.attach(true)?;
        node.name = name;
        node.value.push_str(value);
        self.broker.store_node(self.txn, &node, None, index)?;
        self.nodes_stored += 1;
        trace!(node_id = %node.node_id, ?kind, "stored node");
        self.prev = Some(PrevNode {
            kind,
            id: node.node_id.clone(),
        });
        self.pool.return_node(node);
        Ok(())
    }

    /// Write the node behind a reference by its own kind; elements are
    /// copied with their whole subtree
    fn expand_reference(&mut self, root: ExternalRef, path: &mut NodePath, index: Option<&IndexSpec>) -> Result<()> {
        let mut work = vec![ExpandStep::Enter(root)];
        while let Some(step) = work.pop() {
            let node = match step {
                ExpandStep::Close => {
                    self.close_element(path, index)?;
                    continue;
                }
                ExpandStep::Enter(node) => node,
            };
            match node.kind() {
                NodeKind::Element => {
                    let attributes: Vec<_> = node
                        .attributes()
                        .into_iter()
                        .filter(|a| !a.name.is_namespace_declaration())
                        .collect();
                    let children = node.children();
                    let mut stored = self.pool.borrow_node(StoredKind::Element);
                    stored.name = node.name();
                    stored.child_count = children.len() as u32;
                    stored.attribute_count = attributes.len() as u32;
                    for (prefix, uri) in node.namespaces() {
                        stored.declare_namespace(&prefix, &uri);
                    }
                    self.open_element(stored, path, index)?;
                    for attr in &attributes {
                        self.store_attribute(&attr.name, &attr.value, attr.attr_type, path, index)?;
                    }
                    self.prev = None;
                    work.push(ExpandStep::Close);
                    work.extend(children.into_iter().rev().map(ExpandStep::Enter));
                }
                NodeKind::Text => self.store_character_data(StoredKind::Text, &node.string_value(), index)?,
                NodeKind::CData => self.store_character_data(StoredKind::CData, &node.string_value(), index)?,
                NodeKind::Comment => self.store_leaf(StoredKind::Comment, None, &node.string_value(), index)?,
                NodeKind::ProcessingInstruction => {
                    self.store_leaf(StoredKind::ProcessingInstruction, node.name(), &node.string_value(), index)?
                }
                NodeKind::Document => {
                    work.extend(node.children().into_iter().rev().map(ExpandStep::Enter));
                }
                kind => {
                    debug!(?kind, node_id = ?node.node_id(), "skipping unsupported referenced node");
                    self.skipped += 1;
                }
            }
        }
        Ok(())
    }
}
