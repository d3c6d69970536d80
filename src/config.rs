//! Configuration structures.
//!
//! Builder capacity hints, per-collection index configuration and the
//! reference broker's cache sizing. All structs deserialize with serde.

use crate::storage::NodePath;
use serde::{Deserialize, Serialize};

/// Capacity hints for a freshly started transient tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Initial node slots.
    pub initial_nodes: usize,
    /// Initial size of the shared character buffer in bytes.
    pub initial_chars: usize,
    /// Initial attribute table entries.
    pub initial_attributes: usize,
    /// Initial namespace table entries.
    pub initial_namespaces: usize,
    /// Initial depth of the per-level sibling tracker.
    pub initial_levels: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            initial_nodes: 64,
            initial_chars: 1024,
            initial_attributes: 16,
            initial_namespaces: 4,
            initial_levels: 15,
        }
    }
}

/// Configuration attached to a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfiguration {
    /// Index specification applied to documents stored in the collection.
    pub index: Option<IndexSpec>,
}

/// Index specification of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSpec {
    /// Depth up to which element nodes are added to the structural index.
    #[serde(rename = "index-depth")]
    pub index_depth: u32,
    /// Value indexes, matched against structural paths in order.
    pub create: Vec<ValueIndexSpec>,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            index_depth: 1,
            create: Vec::new(),
        }
    }
}

impl IndexSpec {
    /// First value index whose path pattern matches `path`
    pub fn index_for_path(&self, path: &NodePath) -> Option<&ValueIndexSpec> {
        self.create.iter().find(|spec| spec.matches(path))
    }
}

/// Type of the values kept by a value index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Integer,
    Double,
    Boolean,
}

/// A value index on a path pattern.
///
/// Patterns: `/a/b` matches the full path, `//b` and `//a/b` match any path
/// ending in those steps. A step of `*` matches any name; steps without a
/// prefix compare local names only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueIndexSpec {
    pub path: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

impl ValueIndexSpec {
    pub fn new(path: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            path: path.into(),
            value_type,
        }
    }

    /// True if this index applies to the element at `path`
    pub fn matches(&self, path: &NodePath) -> bool {
        let (descendant, pattern) = match self.path.strip_prefix("//") {
            Some(rest) => (true, rest),
            None => (false, self.path.trim_start_matches('/')),
        };
        let steps: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
        let components = path.components();
        if steps.is_empty() || steps.len() > components.len() {
            return false;
        }
        if !descendant && steps.len() != components.len() {
            return false;
        }
        let tail = &components[components.len() - steps.len()..];
        steps.iter().zip(tail).all(|(step, qn)| {
            *step == "*"
                || if step.contains(':') {
                    qn.lexical() == *step
                } else {
                    qn.local_name() == *step
                }
        })
    }
}

/// Sizing of the in-memory reference broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Number of resolved collection configurations kept in the LRU cache.
    pub config_cache_size: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            config_cache_size: 32,
        }
    }
}
