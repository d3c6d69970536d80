//! Error types for tree construction and materialization.

use crate::storage::{DocId, NodeId};
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the tree builder and the materializer.
#[derive(Debug, Error)]
pub enum Error {
    // Well-formedness errors, raised by the builder before any mutation
    #[error("Namespace error: {message}")]
    Namespace { message: String },

    #[error("No document under construction, call start_document first")]
    NoDocument,

    #[error("end_element called with no open element")]
    UnbalancedEndElement,

    #[error("{operation} requires the last constructed node to be an element")]
    NoOwnerElement { operation: &'static str },

    // Processing errors, raised before any node is written
    #[error("Cannot establish document type: {0}")]
    DocumentType(String),

    // Storage errors, propagated unchanged from the broker
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub(crate) fn namespace(message: impl Into<String>) -> Self {
        Error::Namespace {
            message: message.into(),
        }
    }

    /// True if this error is a well-formedness violation raised by the builder.
    pub fn is_well_formedness(&self) -> bool {
        matches!(self, Error::Namespace { .. })
    }
}

/// Errors surfaced by a storage broker.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Duplicate node id {node_id} in document {doc}")]
    DuplicateNodeId { doc: DocId, node_id: NodeId },

    #[error("Node {node_id} not found in document {doc}")]
    NodeNotFound { doc: DocId, node_id: NodeId },

    #[error("Transaction {0} is not active")]
    TransactionNotActive(u64),

    #[error("Storage corrupted: {0}")]
    Corrupted(String),
}
