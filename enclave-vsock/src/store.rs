//! Delivery records for outbound messages
//!
//! The store is shared between the writer handle, its sender task and its
//! ACK receiver. Every operation takes the lock once, so callers never
//! observe a half-applied read-modify-write.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Delivery state of an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    /// Accepted, not yet acknowledged by the peer
    Pending,
    /// Peer returned an ACK carrying this message's ID
    Acknowledged,
    /// The transport write failed
    Failed,
}

impl MessageStatus {
    /// Acknowledged and Failed records never change again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageStatus::Pending => write!(f, "pending"),
            MessageStatus::Acknowledged => write!(f, "acknowledged"),
            MessageStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A delivery record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: u32,
    pub content: Bytes,
    pub status: MessageStatus,
}

impl Message {
    /// Create a pending record
    pub fn pending(id: u32, content: Bytes) -> Self {
        Self {
            id,
            content,
            status: MessageStatus::Pending,
        }
    }

    /// Create a record with an explicit status
    pub fn with_status(id: u32, content: Bytes, status: MessageStatus) -> Self {
        Self {
            id,
            content,
            status,
        }
    }
}

/// Per-status record counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub acknowledged: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.acknowledged + self.failed
    }
}

/// Concurrent map from message ID to delivery record
#[derive(Clone, Default)]
pub struct MessageStore {
    records: Arc<RwLock<HashMap<u32, Message>>>,
}

impl MessageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::with_capacity(capacity))),
        }
    }

    /// Insert a record, replacing any record with the same ID
    pub fn insert(&self, message: Message) -> Option<Message> {
        self.records.write().insert(message.id, message)
    }

    /// Clone out the record for `id`
    pub fn get(&self, id: u32) -> Option<Message> {
        self.records.read().get(&id).cloned()
    }

    /// Current status of `id`
    pub fn status(&self, id: u32) -> Option<MessageStatus> {
        self.records.read().get(&id).map(|message| message.status)
    }

    /// Set the status of `id`. Returns false if the record is gone.
    pub fn update_status(&self, id: u32, status: MessageStatus) -> bool {
        match self.records.write().get_mut(&id) {
            Some(message) => {
                message.status = status;
                true
            }
            None => false,
        }
    }

    /// Move a pending record to Acknowledged. A failed record keeps its
    /// status. Returns false if `id` is unknown.
    pub fn mark_acknowledged(&self, id: u32) -> bool {
        match self.records.write().get_mut(&id) {
            Some(message) => {
                if message.status == MessageStatus::Pending {
                    message.status = MessageStatus::Acknowledged;
                }
                true
            }
            None => false,
        }
    }

    /// Move a pending record to Failed, leaving settled records untouched.
    /// Returns true if the record changed.
    pub fn mark_failed(&self, id: u32) -> bool {
        match self.records.write().get_mut(&id) {
            Some(message) if message.status == MessageStatus::Pending => {
                message.status = MessageStatus::Failed;
                true
            }
            _ => false,
        }
    }

    /// Remove the record for `id`
    pub fn remove(&self, id: u32) -> Option<Message> {
        self.records.write().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Visit every record until `f` returns false. The read lock is held for
    /// the whole traversal, so `f` must not call back into the store.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&Message) -> bool,
    {
        let records = self.records.read();
        for message in records.values() {
            if !f(message) {
                break;
            }
        }
    }

    /// All tracked IDs in ascending order
    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.records.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Count records by status
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        self.for_each(|message| {
            match message.status {
                MessageStatus::Pending => counts.pending += 1,
                MessageStatus::Acknowledged => counts.acknowledged += 1,
                MessageStatus::Failed => counts.failed += 1,
            }
            true
        });
        counts
    }

    /// Drop every record whose ID is below `cutoff`, whatever its status
    pub fn evict_older_than(&self, cutoff: u32) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|id, _| *id >= cutoff);
        before - records.len()
    }

    /// Drop the lowest IDs until at most `limit` records remain
    pub fn evict_oldest_until(&self, limit: usize) -> usize {
        let mut records = self.records.write();
        if records.len() <= limit {
            return 0;
        }

        let excess = records.len() - limit;
        let mut ids: Vec<u32> = records.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids[..excess] {
            records.remove(id);
        }
        excess
    }
}

impl fmt::Debug for MessageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageStore")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, status: MessageStatus) -> Message {
        Message::with_status(id, Bytes::from_static(b"test"), status)
    }

    #[test]
    fn test_mark_failed_only_moves_pending() {
        let store = MessageStore::new();
        store.insert(record(1, MessageStatus::Pending));
        store.insert(record(2, MessageStatus::Acknowledged));

        assert!(store.mark_failed(1));
        assert!(!store.mark_failed(2));
        assert!(!store.mark_failed(3));
        assert_eq!(store.status(1), Some(MessageStatus::Failed));
        assert_eq!(store.status(2), Some(MessageStatus::Acknowledged));
    }

    #[test]
    fn test_basic_operations() {
        let store = MessageStore::new();
        assert!(store.is_empty());

        assert!(store.insert(Message::pending(1, Bytes::from_static(b"one"))).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.status(1), Some(MessageStatus::Pending));
        assert_eq!(store.get(1).unwrap().content, Bytes::from_static(b"one"));

        assert!(store.update_status(1, MessageStatus::Failed));
        assert_eq!(store.status(1), Some(MessageStatus::Failed));

        assert!(!store.update_status(2, MessageStatus::Failed));
        assert_eq!(store.status(2), None);

        let removed = store.remove(1).unwrap();
        assert_eq!(removed.id, 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_one_record_per_id() {
        let store = MessageStore::new();
        store.insert(record(5, MessageStatus::Pending));
        let previous = store.insert(record(5, MessageStatus::Acknowledged));

        assert_eq!(previous.unwrap().status, MessageStatus::Pending);
        assert_eq!(store.len(), 1);
        assert_eq!(store.status(5), Some(MessageStatus::Acknowledged));
    }

    #[test]
    fn test_mark_acknowledged() {
        let store = MessageStore::new();
        store.insert(record(1, MessageStatus::Pending));
        store.insert(record(2, MessageStatus::Failed));

        assert!(store.mark_acknowledged(1));
        assert_eq!(store.status(1), Some(MessageStatus::Acknowledged));

        // Failed stays failed
        assert!(store.mark_acknowledged(2));
        assert_eq!(store.status(2), Some(MessageStatus::Failed));

        // Unknown IDs are reported, not an error
        assert!(!store.mark_acknowledged(99));
    }

    #[test]
    fn test_eviction_ignores_status() {
        let store = MessageStore::new();
        for id in 1..=10 {
            let status = if id % 2 == 0 {
                MessageStatus::Pending
            } else {
                MessageStatus::Acknowledged
            };
            store.insert(record(id, status));
        }

        assert_eq!(store.evict_older_than(6), 5);
        assert_eq!(store.ids(), vec![6, 7, 8, 9, 10]);

        assert_eq!(store.evict_oldest_until(2), 3);
        assert_eq!(store.ids(), vec![9, 10]);

        assert_eq!(store.evict_oldest_until(5), 0);
    }

    #[test]
    fn test_counts_and_traversal() {
        let store = MessageStore::with_capacity(4);
        store.insert(record(1, MessageStatus::Pending));
        store.insert(record(2, MessageStatus::Acknowledged));
        store.insert(record(3, MessageStatus::Acknowledged));
        store.insert(record(4, MessageStatus::Failed));

        let counts = store.counts();
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.acknowledged, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 4);

        let mut visited = 0;
        store.for_each(|_| {
            visited += 1;
            visited < 2
        });
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_concurrent_updates() {
        let store = MessageStore::new();
        for id in 0..100 {
            store.insert(record(id, MessageStatus::Pending));
        }

        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for id in (worker..100).step_by(4) {
                        store.mark_acknowledged(id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.counts().acknowledged, 100);
    }
}
