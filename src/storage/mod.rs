//! Persistent storage contracts
//!
//! What the materializer needs from the database: a broker that appends
//! nodes in document order, node identities, transactions, structural paths
//! and the persistent node records themselves. `MemoryBroker` is a complete
//! in-memory implementation.

pub mod broker;
pub mod memory;
pub mod node;
pub mod node_id;
pub mod path;
pub mod txn;

pub use broker::{DlnFactory, NodeFactory, StorageBroker};
pub use memory::{BrokerEvent, DocumentSnapshot, IndexEntry, MemoryBroker};
pub use node::{DocId, StoredKind, StoredNode, TargetDocument};
pub use node_id::NodeId;
pub use path::NodePath;
pub use txn::{Txn, TxnState};
