//! In-memory storage broker
//!
//! Keeps every stored node in a per-document `BTreeMap` keyed by node id,
//! so iteration order is document order. Records each broker call for
//! inspection and can be told to fail after a number of calls.

use super::broker::{DlnFactory, NodeFactory, StorageBroker};
use super::node::{DocId, StoredKind, StoredNode, TargetDocument};
use super::node_id::NodeId;
use super::path::NodePath;
use super::txn::Txn;
use crate::config::{BrokerConfig, CollectionConfiguration, IndexSpec, ValueType};
use crate::core::{DocumentType, QName, SymbolTable};
use crate::error::StorageError;
use crate::memtree::{ExternalAttribute, ExternalNode, ExternalRef, NodeKind};
use lru::LruCache;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::trace;

/// One recorded broker call
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    Store {
        doc: DocId,
        node_id: NodeId,
        kind: StoredKind,
        name: Option<QName>,
        path: Option<String>,
    },
    Append {
        doc: DocId,
        node_id: NodeId,
        text: String,
    },
    EndElement {
        doc: DocId,
        node_id: NodeId,
        path: String,
    },
}

/// A value index entry produced when an indexed element closes
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub doc: DocId,
    pub node_id: NodeId,
    /// Pattern of the value index that matched
    pub pattern: String,
    pub value_type: ValueType,
    pub value: String,
}

type NodeMap = BTreeMap<NodeId, StoredNode>;

pub struct MemoryBroker {
    documents: HashMap<DocId, NodeMap>,
    events: Vec<BrokerEvent>,
    index_entries: Vec<IndexEntry>,
    /// Elements added to the structural index, per document
    structural: Vec<(DocId, NodeId)>,
    symbols: SymbolTable,
    factory: DlnFactory,
    collections: HashMap<String, Arc<CollectionConfiguration>>,
    config_cache: LruCache<String, Option<Arc<CollectionConfiguration>>>,
    /// Remaining calls before an injected failure
    fail_after: Option<usize>,
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBroker")
            .field("documents", &self.documents.len())
            .field("events", &self.events.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_config(&BrokerConfig::default())
    }

    pub fn with_config(config: &BrokerConfig) -> Self {
        let capacity = NonZeroUsize::new(config.config_cache_size).unwrap_or(NonZeroUsize::MIN);
        MemoryBroker {
            documents: HashMap::new(),
            events: Vec::new(),
            index_entries: Vec::new(),
            structural: Vec::new(),
            symbols: SymbolTable::new(),
            factory: DlnFactory,
            collections: HashMap::new(),
            config_cache: LruCache::new(capacity),
            fail_after: None,
        }
    }

    /// Attach a configuration to a collection and its sub-collections
    pub fn register_collection(&mut self, path: &str, config: CollectionConfiguration) {
        self.collections
            .insert(path.trim_end_matches('/').to_owned(), Arc::new(config));
        self.config_cache.clear();
    }

    /// Make the call after the next `calls` successful ones fail
    pub fn fail_after(&mut self, calls: usize) {
        self.fail_after = Some(calls);
    }

    pub fn events(&self) -> &[BrokerEvent] {
        &self.events
    }

    pub fn index_entries(&self) -> &[IndexEntry] {
        &self.index_entries
    }

    /// Elements recorded in the structural index of `doc`
    pub fn structural_entries(&self, doc: DocId) -> impl Iterator<Item = &NodeId> + '_ {
        self.structural
            .iter()
            .filter(move |(d, _)| *d == doc)
            .map(|(_, id)| id)
    }

    pub fn node(&self, doc: DocId, node_id: &NodeId) -> Option<&StoredNode> {
        self.documents.get(&doc)?.get(node_id)
    }

    /// Stored nodes of `doc` in document order
    pub fn nodes(&self, doc: DocId) -> impl Iterator<Item = &StoredNode> + '_ {
        self.documents.get(&doc).into_iter().flat_map(|nodes| nodes.values())
    }

    pub fn node_count(&self, doc: DocId) -> usize {
        self.documents.get(&doc).map_or(0, BTreeMap::len)
    }

    /// Read-only view of a stored document, usable as a reference node
    pub fn snapshot(&self, target: &TargetDocument) -> ExternalRef {
        let nodes = self.documents.get(&target.id()).cloned().unwrap_or_default();
        let snapshot = Arc::new(DocumentSnapshot {
            doc: target.id(),
            doctype: target.doctype().cloned(),
            nodes,
        });
        Arc::new(SnapshotNode {
            snapshot,
            id: NodeId::DOCUMENT,
        })
    }

    fn check_injected_failure(&mut self) -> Result<(), StorageError> {
        match self.fail_after {
            Some(0) => Err(StorageError::Io(io::Error::other("injected storage failure"))),
            Some(ref mut remaining) => {
                *remaining -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn check_txn(txn: &Txn) -> Result<(), StorageError> {
        if txn.is_active() {
            Ok(())
        } else {
            Err(StorageError::TransactionNotActive(txn.id()))
        }
    }

    fn resolve_configuration(&self, collection: &str) -> Option<Arc<CollectionConfiguration>> {
        let mut path = collection.trim_end_matches('/');
        loop {
            if let Some(config) = self.collections.get(path) {
                return Some(Arc::clone(config));
            }
            match path.rfind('/') {
                Some(pos) if pos > 0 => path = &path[..pos],
                _ => return None,
            }
        }
    }

    /// Concatenated character data below an element
    fn element_value(nodes: &NodeMap, node_id: &NodeId) -> String {
        nodes
            .range(node_id.clone()..)
            .filter(|(id, _)| *id != node_id)
            .take_while(|(id, _)| id.is_descendant_of(node_id))
            .filter(|(_, n)| n.kind.is_text_like())
            .map(|(_, n)| n.value.as_str())
            .collect()
    }
}

impl StorageBroker for MemoryBroker {
    fn store_node(
        &mut self,
        txn: &Txn,
        node: &StoredNode,
        path: Option<&NodePath>,
        index: Option<&IndexSpec>,
    ) -> Result<(), StorageError> {
        Self::check_txn(txn)?;
        self.check_injected_failure()?;

        let nodes = self.documents.entry(node.doc).or_default();
        if nodes.contains_key(&node.node_id) {
            return Err(StorageError::DuplicateNodeId {
                doc: node.doc,
                node_id: node.node_id.clone(),
            });
        }
        nodes.insert(node.node_id.clone(), node.clone());

        if node.kind == StoredKind::Element {
            if let Some(spec) = index {
                if node.node_id.level() <= spec.index_depth as usize {
                    self.structural.push((node.doc, node.node_id.clone()));
                }
            }
        }

        trace!(doc = node.doc, node_id = %node.node_id, kind = ?node.kind, "stored node");
        self.events.push(BrokerEvent::Store {
            doc: node.doc,
            node_id: node.node_id.clone(),
            kind: node.kind,
            name: node.name.clone(),
            path: path.map(|p| p.to_string()),
        });
        Ok(())
    }

    fn end_element(
        &mut self,
        node: &StoredNode,
        path: &NodePath,
        index: Option<&IndexSpec>,
    ) -> Result<(), StorageError> {
        self.check_injected_failure()?;
        let nodes = self
            .documents
            .get_mut(&node.doc)
            .ok_or_else(|| StorageError::NodeNotFound {
                doc: node.doc,
                node_id: node.node_id.clone(),
            })?;
        let stored = nodes
            .get_mut(&node.node_id)
            .ok_or_else(|| StorageError::NodeNotFound {
                doc: node.doc,
                node_id: node.node_id.clone(),
            })?;
        // counts are final once the element closes
        stored.child_count = node.child_count;
        stored.attribute_count = node.attribute_count;

        if let Some(value_index) = index.and_then(|spec| spec.index_for_path(path)) {
            let value = Self::element_value(nodes, &node.node_id);
            self.index_entries.push(IndexEntry {
                doc: node.doc,
                node_id: node.node_id.clone(),
                pattern: value_index.path.clone(),
                value_type: value_index.value_type,
                value,
            });
        }

        self.events.push(BrokerEvent::EndElement {
            doc: node.doc,
            node_id: node.node_id.clone(),
            path: path.to_string(),
        });
        Ok(())
    }

    fn append_characters(
        &mut self,
        txn: &Txn,
        doc: DocId,
        node_id: &NodeId,
        text: &str,
    ) -> Result<(), StorageError> {
        Self::check_txn(txn)?;
        self.check_injected_failure()?;
        let stored = self
            .documents
            .get_mut(&doc)
            .and_then(|nodes| nodes.get_mut(node_id))
            .ok_or_else(|| StorageError::NodeNotFound {
                doc,
                node_id: node_id.clone(),
            })?;
        if !stored.kind.is_text_like() {
            return Err(StorageError::Corrupted(format!(
                "cannot append characters to {:?} node {}",
                stored.kind, node_id
            )));
        }
        stored.value.push_str(text);
        self.events.push(BrokerEvent::Append {
            doc,
            node_id: node_id.clone(),
            text: text.to_owned(),
        });
        Ok(())
    }

    fn node_factory(&self) -> &dyn NodeFactory {
        &self.factory
    }

    fn symbols(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    fn collection_configuration(&mut self, collection: &str) -> Option<Arc<CollectionConfiguration>> {
        if let Some(cached) = self.config_cache.get(collection) {
            return cached.clone();
        }
        let resolved = self.resolve_configuration(collection);
        self.config_cache.put(collection.to_owned(), resolved.clone());
        resolved
    }
}

/// Frozen copy of a stored document
#[derive(Debug)]
pub struct DocumentSnapshot {
    doc: DocId,
    doctype: Option<DocumentType>,
    nodes: NodeMap,
}

/// A node of a [`DocumentSnapshot`]
#[derive(Debug, Clone)]
struct SnapshotNode {
    snapshot: Arc<DocumentSnapshot>,
    id: NodeId,
}

impl SnapshotNode {
    fn stored(&self) -> Option<&StoredNode> {
        self.snapshot.nodes.get(&self.id)
    }

    /// Direct children, attributes included
    fn child_records(&self) -> impl Iterator<Item = (&NodeId, &StoredNode)> + '_ {
        let depth = self.id.level() + 1;
        self.snapshot
            .nodes
            .range(self.id.clone()..)
            .filter(|(id, _)| **id != self.id)
            .take_while(|(id, _)| id.is_descendant_of(&self.id))
            .filter(move |(id, _)| id.level() == depth)
    }

    fn handle(&self, id: &NodeId) -> ExternalRef {
        Arc::new(SnapshotNode {
            snapshot: Arc::clone(&self.snapshot),
            id: id.clone(),
        })
    }
}

impl ExternalNode for SnapshotNode {
    fn kind(&self) -> NodeKind {
        match self.stored().map(|n| n.kind) {
            None => NodeKind::Document,
            Some(StoredKind::Element) => NodeKind::Element,
            Some(StoredKind::Attribute) => NodeKind::Attribute,
            Some(StoredKind::Text) => NodeKind::Text,
            Some(StoredKind::CData) => NodeKind::CData,
            Some(StoredKind::Comment) => NodeKind::Comment,
            Some(StoredKind::ProcessingInstruction) => NodeKind::ProcessingInstruction,
        }
    }

    fn name(&self) -> Option<QName> {
        self.stored().and_then(|n| n.name.clone())
    }

    fn string_value(&self) -> String {
        match self.stored() {
            Some(node) if node.kind != StoredKind::Element => node.value.clone(),
            _ => MemoryBroker::element_value(&self.snapshot.nodes, &self.id),
        }
    }

    fn children(&self) -> Vec<ExternalRef> {
        self.child_records()
            .filter(|(_, n)| n.kind != StoredKind::Attribute)
            .map(|(id, _)| self.handle(id))
            .collect()
    }

    fn attributes(&self) -> Vec<ExternalAttribute> {
        self.child_records()
            .filter(|(_, n)| n.kind == StoredKind::Attribute)
            .filter_map(|(_, n)| {
                Some(ExternalAttribute {
                    name: n.name.clone()?,
                    value: n.value.clone(),
                    attr_type: n.attr_type,
                })
            })
            .collect()
    }

    fn namespaces(&self) -> Vec<(String, String)> {
        self.stored().map(|n| n.namespaces.clone()).unwrap_or_default()
    }

    fn doctype(&self) -> Option<DocumentType> {
        if self.id == NodeId::DOCUMENT {
            self.snapshot.doctype.clone()
        } else {
            None
        }
    }

    fn node_id(&self) -> Option<NodeId> {
        if self.id == NodeId::DOCUMENT {
            None
        } else {
            Some(self.id.clone())
        }
    }
}

impl DocumentSnapshot {
    pub fn doc(&self) -> DocId {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueIndexSpec;
    use crate::memtree::AttrType;

    fn element(doc: DocId, id: NodeId, name: &str) -> StoredNode {
        let mut node = StoredNode::new(StoredKind::Element);
        node.doc = doc;
        node.node_id = id;
        node.name = Some(QName::local(name));
        node
    }

    fn text(doc: DocId, id: NodeId, value: &str) -> StoredNode {
        let mut node = StoredNode::new(StoredKind::Text);
        node.doc = doc;
        node.node_id = id;
        node.value.push_str(value);
        node
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut broker = MemoryBroker::new();
        let txn = Txn::begin();
        let node = element(1, NodeId::root(), "a");
        broker.store_node(&txn, &node, None, None).unwrap();
        let err = broker.store_node(&txn, &node, None, None).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateNodeId { doc: 1, .. }));
    }

    #[test]
    fn test_inactive_transaction_rejected() {
        let mut broker = MemoryBroker::new();
        let mut txn = Txn::begin();
        txn.abort();
        let err = broker
            .store_node(&txn, &element(1, NodeId::root(), "a"), None, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::TransactionNotActive(_)));
    }

    #[test]
    fn test_fail_after() {
        let mut broker = MemoryBroker::new();
        let txn = Txn::begin();
        broker.fail_after(1);
        let root = NodeId::root();
        broker.store_node(&txn, &element(1, root.clone(), "a"), None, None).unwrap();
        let err = broker
            .store_node(&txn, &element(1, root.new_child(), "b"), None, None)
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(broker.node_count(1), 1);
    }

    #[test]
    fn test_append_characters() {
        let mut broker = MemoryBroker::new();
        let txn = Txn::begin();
        let id = NodeId::root();
        broker.store_node(&txn, &text(1, id.clone(), "ab"), None, None).unwrap();
        broker.append_characters(&txn, 1, &id, "cd").unwrap();
        assert_eq!(broker.node(1, &id).map(|n| n.value.as_str()), Some("abcd"));
        let missing = broker.append_characters(&txn, 1, &id.new_child(), "x").unwrap_err();
        assert!(matches!(missing, StorageError::NodeNotFound { .. }));
    }

    #[test]
    fn test_collection_configuration_inherited_and_cached() {
        let mut broker = MemoryBroker::with_config(&BrokerConfig { config_cache_size: 2 });
        let config = CollectionConfiguration {
            index: Some(IndexSpec::default()),
        };
        broker.register_collection("/db/data", config.clone());
        let resolved = broker.collection_configuration("/db/data/sub/deeper").unwrap();
        assert_eq!(*resolved, config);
        assert!(broker.collection_configuration("/db/other").is_none());
        // cached lookups still see later registrations
        broker.register_collection("/db/other", CollectionConfiguration::default());
        assert!(broker.collection_configuration("/db/other").is_some());
    }

    #[test]
    fn test_value_index_on_end_element() {
        let mut broker = MemoryBroker::new();
        let txn = Txn::begin();
        let spec = IndexSpec {
            index_depth: 1,
            create: vec![ValueIndexSpec::new("//price", ValueType::Double)],
        };
        let price = element(1, NodeId::root(), "price");
        broker.store_node(&txn, &price, None, Some(&spec)).unwrap();
        broker
            .store_node(&txn, &text(1, NodeId::root().new_child(), "9.50"), None, Some(&spec))
            .unwrap();
        let mut path = NodePath::new();
        path.add_component(QName::local("price"));
        broker.end_element(&price, &path, Some(&spec)).unwrap();

        assert_eq!(broker.structural_entries(1).count(), 1);
        let entry = &broker.index_entries()[0];
        assert_eq!(entry.value, "9.50");
        assert_eq!(entry.value_type, ValueType::Double);
    }

    #[test]
    fn test_snapshot_navigation() {
        let mut broker = MemoryBroker::new();
        let txn = Txn::begin();
        let root = NodeId::root();
        let mut attr = StoredNode::new(StoredKind::Attribute);
        attr.doc = 1;
        attr.node_id = root.new_child();
        attr.name = Some(QName::local("x"));
        attr.value.push_str("1");
        broker.store_node(&txn, &element(1, root.clone(), "a"), None, None).unwrap();
        broker.store_node(&txn, &attr, None, None).unwrap();
        broker
            .store_node(&txn, &text(1, root.new_child().next_sibling(), "hi"), None, None)
            .unwrap();

        let mut target = TargetDocument::new(1, "/db");
        target.append_child(root.clone());
        let document = broker.snapshot(&target);
        assert_eq!(document.kind(), NodeKind::Document);
        let top = document.children();
        assert_eq!(top.len(), 1);
        let a = &top[0];
        assert_eq!(a.kind(), NodeKind::Element);
        assert_eq!(a.attributes().len(), 1);
        assert_eq!(a.attributes()[0].attr_type, AttrType::CData);
        assert_eq!(a.children().len(), 1);
        assert_eq!(a.string_value(), "hi");
        assert_eq!(a.node_id(), Some(root));
    }
}
