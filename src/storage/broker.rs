//! Storage broker contract
//!
//! The materializer writes through this trait one node at a time in
//! document order. Implementations own durability, locking and indexing.

use super::node::{DocId, StoredNode};
use super::node_id::NodeId;
use super::path::NodePath;
use super::txn::Txn;
use crate::config::{CollectionConfiguration, IndexSpec};
use crate::core::SymbolTable;
use crate::error::StorageError;
use std::sync::Arc;

/// Source of persistent node identities
pub trait NodeFactory {
    /// Id of a new document root
    fn create_root(&self) -> NodeId {
        NodeId::root()
    }

    /// Id of the first child of `parent`
    fn first_child(&self, parent: &NodeId) -> NodeId {
        parent.new_child()
    }

    /// Id of the sibling following `previous`
    fn next_sibling(&self, previous: &NodeId) -> NodeId {
        previous.next_sibling()
    }
}

/// Dynamic level numbering factory
#[derive(Debug, Default, Clone, Copy)]
pub struct DlnFactory;

impl NodeFactory for DlnFactory {}

pub trait StorageBroker {
    /// Append one node in document order under `txn`
    ///
    /// `path` is the structural path of the node's context: for elements the
    /// ancestors, for attributes the owning element's full path, None for
    /// character data, comments and PIs.
    fn store_node(
        &mut self,
        txn: &Txn,
        node: &StoredNode,
        path: Option<&NodePath>,
        index: Option<&IndexSpec>,
    ) -> Result<(), StorageError>;

    /// Finalize a just-closed element; `path` still ends with its name
    fn end_element(
        &mut self,
        node: &StoredNode,
        path: &NodePath,
        index: Option<&IndexSpec>,
    ) -> Result<(), StorageError>;

    /// Extend the character data of an already stored text node
    fn append_characters(
        &mut self,
        txn: &Txn,
        doc: DocId,
        node_id: &NodeId,
        text: &str,
    ) -> Result<(), StorageError>;

    fn node_factory(&self) -> &dyn NodeFactory;

    /// Qualified-name interning shared by everything the broker stores
    fn symbols(&mut self) -> &mut SymbolTable;

    /// Configuration of the collection at `collection`, if any
    fn collection_configuration(&mut self, collection: &str) -> Option<Arc<CollectionConfiguration>>;
}
