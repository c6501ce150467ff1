//! Transaction identifier type.

use std::fmt;

/// Identifies a transaction.
///
/// Ids are handed out in increasing order by
/// [`Database::new_transaction`](crate::Database::new_transaction) and are
/// used only for diagnostics; the lock table does not track which
/// transaction holds a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Create a new TransactionId.
    #[inline]
    pub fn new(id: u64) -> Self {
        TransactionId(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}
