//! Per-kind free lists for persistent node wrappers
//!
//! A pool lives for one store and is dropped with it. Every returned
//! object is reset before it goes back on its free list.

use crate::storage::{StoredKind, StoredNode};

/// Clear all state of a previous use
pub trait Reset {
    fn reset(&mut self);
}

/// Objects that can be drawn from a [`NodePool`]
pub trait Poolable: Reset + Sized {
    type Kind: Copy;

    /// Number of distinct kinds (free lists)
    const KINDS: usize;

    fn create(kind: Self::Kind) -> Self;
    fn kind(&self) -> Self::Kind;
    fn slot(kind: Self::Kind) -> usize;
}

impl Reset for StoredNode {
    fn reset(&mut self) {
        StoredNode::reset(self);
    }
}

impl Poolable for StoredNode {
    type Kind = StoredKind;
    const KINDS: usize = StoredKind::ALL.len();

    fn create(kind: StoredKind) -> Self {
        StoredNode::new(kind)
    }

    fn kind(&self) -> StoredKind {
        self.kind
    }

    fn slot(kind: StoredKind) -> usize {
        kind.slot()
    }
}

#[derive(Debug)]
pub struct NodePool<T: Poolable> {
    free: Vec<Vec<T>>,
    /// Upper bound of each free list
    max_free: usize,
    created: usize,
    reused: usize,
}

impl<T: Poolable> NodePool<T> {
    pub fn new(max_free: usize) -> Self {
        NodePool {
            free: (0..T::KINDS).map(|_| Vec::new()).collect(),
            max_free,
            created: 0,
            reused: 0,
        }
    }

    /// Take a clean object of `kind`
    pub fn borrow_node(&mut self, kind: T::Kind) -> T {
        match self.free.get_mut(T::slot(kind)).and_then(Vec::pop) {
            Some(node) => {
                self.reused += 1;
                node
            }
            None => {
                self.created += 1;
                T::create(kind)
            }
        }
    }

    /// Reset `node` and keep it for the next borrow of its kind
    pub fn return_node(&mut self, mut node: T) {
        node.reset();
        let max_free = self.max_free;
        if let Some(list) = self.free.get_mut(T::slot(node.kind())) {
            if list.len() < max_free {
                list.push(node);
            }
        }
    }

    /// Objects allocated because no free one was available
    pub fn created(&self) -> usize {
        self.created
    }

    /// Borrows served from a free list
    pub fn reused(&self) -> usize {
        self.reused
    }
}
