//! Transactions
//!
//! The materializer does not manage transactions; it threads the caller's
//! handle through every storage call. Commit and abort are the caller's
//! business.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    Active,
    Committed,
    Aborted,
}

/// A transaction handle
#[derive(Debug, PartialEq, Eq)]
pub struct Txn {
    id: u64,
    state: TxnState,
}

impl Default for Txn {
    fn default() -> Self {
        Self::begin()
    }
}

impl Txn {
    /// Start a new active transaction
    pub fn begin() -> Self {
        Txn {
            id: NEXT_TXN_ID.fetch_add(1, Ordering::Relaxed),
            state: TxnState::Active,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn state(&self) -> TxnState {
        self.state
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    pub fn commit(&mut self) {
        if self.is_active() {
            self.state = TxnState::Committed;
        }
    }

    pub fn abort(&mut self) {
        if self.is_active() {
            self.state = TxnState::Aborted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut txn = Txn::begin();
        let other = Txn::begin();
        assert_ne!(txn.id(), other.id());
        assert!(txn.is_active());
        txn.commit();
        txn.abort();
        assert_eq!(txn.state(), TxnState::Committed);
    }
}
