//! Channel limits shared by reader and writer

use std::time::Duration;

/// Largest payload accepted on either side of a connection (1 MiB)
pub const MAX_MESSAGE_SIZE: usize = 1 << 20;

/// Number of delivery records a writer retains
pub const MAX_CONCURRENT: usize = 100;

/// How far the store may grow past `MAX_CONCURRENT` before it is pruned
pub const CLEANUP_MARGIN: usize = 10;

/// Capacity of the pending-send queue
pub const QUEUE_CAPACITY: usize = 100;

/// Default time to wait for an acknowledgment
pub const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Limits applied to a single connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Maximum payload length in bytes, enforced on send and receive
    pub max_message_size: usize,
    /// Records retained by the message store after cleanup
    pub max_concurrent: usize,
    /// Overshoot above `max_concurrent` that triggers a cleanup pass
    pub cleanup_margin: usize,
    /// Bound of the pending-send queue; `write` waits while it is full
    pub queue_capacity: usize,
    /// Default timeout used by callers waiting on acknowledgments
    pub ack_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_message_size: MAX_MESSAGE_SIZE,
            max_concurrent: MAX_CONCURRENT,
            cleanup_margin: CLEANUP_MARGIN,
            queue_capacity: QUEUE_CAPACITY,
            ack_timeout: ACK_TIMEOUT,
        }
    }
}

impl ChannelConfig {
    /// Override the maximum payload size
    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Override the store capacity
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Override the cleanup margin
    pub fn with_cleanup_margin(mut self, cleanup_margin: usize) -> Self {
        self.cleanup_margin = cleanup_margin;
        self
    }

    /// Override the send queue bound. Zero is raised to one since tokio
    /// channels require a positive capacity.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }

    /// Override the acknowledgment timeout
    pub fn with_ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.ack_timeout = ack_timeout;
        self
    }

    /// Store size at which a cleanup pass runs
    pub fn cleanup_trigger(&self) -> usize {
        self.max_concurrent.saturating_add(self.cleanup_margin)
    }
}
