//! Qualified-Name Symbol Table
//!
//! Interns qualified names so repeated element and attribute names are
//! stored once and referenced by a compact id. Used by the transient tree
//! for its name column and by storage brokers as their symbol table.
//!
//! Uses hash-based lookup to avoid storing duplicate names.

use super::qname::QName;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Compact identifier of an interned name. Id 0 is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Name interning table
///
/// Memory layout:
/// - `entries`: the interned names, indexed by symbol id
/// - `hash_index`: hash -> list of ids (handles rare collisions)
#[derive(Debug)]
pub struct SymbolTable {
    entries: Vec<QName>,
    hash_index: HashMap<u64, Vec<u32>>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// Create a new empty table
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity + 1);
        // Entry 0 is reserved so ids are never zero
        entries.push(QName::local(""));
        SymbolTable {
            entries,
            hash_index: HashMap::with_capacity(capacity),
        }
    }

    #[inline]
    fn compute_hash(name: &QName) -> u64 {
        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        hasher.finish()
    }

    /// Intern a name, returning the id of an equal existing entry if present
    pub fn intern(&mut self, name: &QName) -> SymbolId {
        let hash = Self::compute_hash(name);

        if let Some(ids) = self.hash_index.get(&hash) {
            for &id in ids {
                if self.entries[id as usize] == *name {
                    return SymbolId(id);
                }
            }
        }

        let id = self.entries.len() as u32;
        self.entries.push(name.clone());
        self.hash_index.entry(hash).or_default().push(id);
        SymbolId(id)
    }

    /// Look up an already interned name without inserting it
    pub fn lookup(&self, name: &QName) -> Option<SymbolId> {
        let ids = self.hash_index.get(&Self::compute_hash(name))?;
        ids.iter()
            .copied()
            .find(|&id| self.entries[id as usize] == *name)
            .map(SymbolId)
    }

    /// Resolve an id back to its name
    #[inline]
    pub fn get(&self, id: SymbolId) -> Option<&QName> {
        if id.0 == 0 {
            return None;
        }
        self.entries.get(id.0 as usize)
    }

    /// Number of interned names
    pub fn len(&self) -> usize {
        self.entries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all names, keeping allocated capacity
    pub fn clear(&mut self) {
        self.entries.truncate(1);
        self.hash_index.clear();
    }
}
