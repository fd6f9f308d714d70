//! Per object-instance transaction bookkeeping.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::protocol::{ALL_INSTANCES, FrameKind};

/// An open acknowledgment expectation for one object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    object_id: u32,
    instance_id: u16,
    expected: FrameKind,
    opened_at: Instant,
    sequence: u64,
}

impl Transaction {
    /// Object id the exchange concerns.
    #[must_use]
    pub const fn object_id(&self) -> u32 {
        self.object_id
    }

    /// Instance id the exchange concerns.
    #[must_use]
    pub const fn instance_id(&self) -> u16 {
        self.instance_id
    }

    /// Frame kind that completes the exchange.
    #[must_use]
    pub const fn expected_response(&self) -> FrameKind {
        self.expected
    }

    /// When the exchange was opened.
    #[must_use]
    pub const fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// Time since the exchange was opened.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }
}

/// At most one open transaction per (object id, instance id).
#[derive(Debug, Default)]
pub struct TransactionTracker {
    open: HashMap<(u32, u16), Transaction>,
    next_sequence: u64,
}

impl TransactionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an exchange expecting `expected`, replacing any exchange already
    /// open for the same instance. Returns the replaced exchange.
    pub fn open(&mut self, expected: FrameKind, object_id: u32, instance_id: u16) -> Option<Transaction> {
        debug_assert!(instance_id != ALL_INSTANCES, "sentinel instance must be expanded");
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.open.insert(
            (object_id, instance_id),
            Transaction {
                object_id,
                instance_id,
                expected,
                opened_at: Instant::now(),
                sequence,
            },
        )
    }

    /// Exchange open for exactly this instance.
    #[must_use]
    pub fn find(&self, object_id: u32, instance_id: u16) -> Option<&Transaction> {
        self.open.get(&(object_id, instance_id))
    }

    /// Close `transaction` if it is still the one open for its instance.
    ///
    /// A superseded transaction leaves its replacement untouched.
    pub fn close(&mut self, transaction: &Transaction) -> bool {
        let key = (transaction.object_id, transaction.instance_id);
        if self.open.get(&key) == Some(transaction) {
            self.open.remove(&key);
            true
        } else {
            false
        }
    }

    /// Drop whatever exchange is open for this instance.
    pub fn cancel(&mut self, object_id: u32, instance_id: u16) -> Option<Transaction> {
        self.open.remove(&(object_id, instance_id))
    }

    /// Drop every exchange open for any instance of `object_id`.
    pub fn cancel_object(&mut self, object_id: u32) -> usize {
        let before = self.open.len();
        self.open.retain(|&(id, _), _| id != object_id);
        before - self.open.len()
    }

    /// Drop every open exchange.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.open.len();
        self.open.clear();
        count
    }

    /// Number of open exchanges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// Whether no exchange is open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Iterate over open exchanges in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.open.values()
    }
}
