//! RustyXML memtree - compact in-memory XML trees and their persistence
//!
//! Two stages:
//! A: Tree building - construction events become a struct-of-arrays
//!    TransientDocument (memtree::TreeBuilder)
//! B: Materialization - a finished tree is written node by node into a
//!    persistent document through a storage broker (persist::Materializer)
//!
//! ```
//! use memtree::{Attribute, Materializer, MemoryBroker, QName, TargetDocument, TreeBuilder, Txn};
//!
//! let mut builder = TreeBuilder::new();
//! builder.start_document();
//! builder.start_element(&QName::local("a"), &[Attribute::new(QName::local("x"), "1")])?;
//! builder.characters("hello")?;
//! builder.end_element()?;
//! builder.end_document();
//!
//! let mut broker = MemoryBroker::new();
//! let txn = Txn::begin();
//! let mut target = TargetDocument::new(1, "/db/fragments");
//! let doc = builder.document().expect("document started");
//! let summary = Materializer::new(&mut broker, &txn, doc, &mut target).store()?;
//! assert_eq!(summary.nodes_stored, 4);
//! # Ok::<(), memtree::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod memtree;
pub mod persist;
pub mod storage;

// ============================================================================
// Public surface
// ============================================================================

pub use config::{BrokerConfig, BuilderConfig, CollectionConfiguration, IndexSpec, ValueIndexSpec, ValueType};
pub use crate::core::{DocumentType, QName};
pub use error::{Error, Result, StorageError};
pub use memtree::{
    Attribute, BuildEvent, ExternalNode, ExternalRef, NodeKind, NodeNumber, TransientDocument, TreeBuilder,
};
pub use persist::{Materializer, StoreSummary};
pub use storage::{MemoryBroker, NodeId, NodePath, StorageBroker, StoredKind, StoredNode, TargetDocument, Txn};
