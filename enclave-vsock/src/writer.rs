//! Sending side: numbered frames, one background sender, ACK bookkeeping
//!
//! `AckWriter::new` splits the connection. The write half goes to a sender
//! task that drains a bounded queue in FIFO order, so frames never
//! interleave on the wire. The read half goes to an ACK receiver that moves
//! delivery records to `Acknowledged` as 4-byte ACK frames arrive.

use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::codec::{self, ACK_LEN};
use crate::config::ChannelConfig;
use crate::error::{Result, TransportError};
use crate::protocol::MessageEnvelope;
use crate::store::{Message, MessageStatus, MessageStore};

/// Outcome of a successful `send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendReceipt {
    /// ID assigned to the frame
    pub id: u32,
    /// Payload bytes handed to the transport
    pub bytes_written: usize,
}

/// A queued frame together with the channel that reports its send attempt
struct Outbound {
    id: u32,
    content: Bytes,
    done: Option<oneshot::Sender<Result<usize>>>,
}

impl Outbound {
    fn complete(&mut self, outcome: Result<usize>) {
        if let Some(done) = self.done.take() {
            // The caller may have given up already
            let _ = done.send(outcome);
        }
    }
}

/// State shared by the handle and its background tasks
struct Shared {
    config: ChannelConfig,
    store: MessageStore,
    next_id: AtomicU32,
    shutdown: CancellationToken,
    status_changed: Notify,
}

impl Shared {
    fn allocate_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn cleanup_old_messages(&self, threshold_id: u32) -> usize {
        let capacity = self.config.max_concurrent;
        if self.store.len() <= capacity {
            return 0;
        }

        let cutoff = threshold_id.saturating_sub(u32::try_from(capacity).unwrap_or(u32::MAX));
        let evicted = self.store.evict_older_than(cutoff) + self.store.evict_oldest_until(capacity);
        debug!(threshold_id, cutoff, evicted, remaining = self.store.len(), "Cleaned up message store");
        evicted
    }
}

struct WriterTasks {
    sender: JoinHandle<std::io::Result<()>>,
    receiver: JoinHandle<()>,
}

/// Sends payloads as numbered frames and tracks their delivery.
///
/// `write` returns once its frame has been handed to the transport; the
/// peer's acknowledgment is recorded later and can be observed with
/// [`AckWriter::status`] or awaited with [`AckWriter::wait_for_ack`].
pub struct AckWriter {
    shared: Arc<Shared>,
    queue: mpsc::Sender<Outbound>,
    tasks: Mutex<Option<WriterTasks>>,
    closed: AtomicBool,
}

impl AckWriter {
    /// Wrap `conn` with the default limits. Must be called from within a
    /// tokio runtime.
    pub fn new<C>(conn: C) -> Self
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_config(conn, ChannelConfig::default())
    }

    /// Wrap `conn` with explicit limits
    pub fn with_config<C>(conn: C, config: ChannelConfig) -> Self
    where
        C: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(conn);
        let (queue, pending) = mpsc::channel(config.queue_capacity.max(1));

        let shared = Arc::new(Shared {
            store: MessageStore::with_capacity(config.cleanup_trigger()),
            config,
            next_id: AtomicU32::new(1),
            shutdown: CancellationToken::new(),
            status_changed: Notify::new(),
        });

        let sender = tokio::spawn(run_sender(write_half, pending, shared.clone()));
        let receiver = tokio::spawn(run_ack_receiver(read_half, shared.clone()));

        Self {
            shared,
            queue,
            tasks: Mutex::new(Some(WriterTasks { sender, receiver })),
            closed: AtomicBool::new(false),
        }
    }

    /// Send `payload`, returning the number of bytes handed to the transport
    pub async fn write(&self, payload: &[u8]) -> Result<usize> {
        Ok(self.send(payload).await?.bytes_written)
    }

    /// Send `payload`, returning its message ID as well.
    ///
    /// Waits while the send queue is full and until the sender has attempted
    /// this frame's transport write. A failed write marks the record
    /// `Failed`; closing the writer meanwhile yields `Cancelled`.
    pub async fn send(&self, payload: &[u8]) -> Result<SendReceipt> {
        let max = self.shared.config.max_message_size;
        if payload.len() > max {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max,
            });
        }
        if self.shared.shutdown.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let id = self.shared.allocate_id();
        let content = Bytes::copy_from_slice(payload);
        self.shared.store.insert(Message::pending(id, content.clone()));
        if self.shared.store.len() >= self.shared.config.cleanup_trigger() {
            self.shared.cleanup_old_messages(id.wrapping_add(1));
        }

        match self.enqueue(id, content).await {
            Ok(bytes_written) => Ok(SendReceipt { id, bytes_written }),
            Err(TransportError::Cancelled) => {
                // An interrupted frame can no longer be acknowledged
                if self.shared.store.mark_failed(id) {
                    self.shared.status_changed.notify_waiters();
                }
                Err(TransportError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    /// Queue a frame for the sender and wait for its write attempt
    async fn enqueue(&self, id: u32, content: Bytes) -> Result<usize> {
        let (done, outcome) = oneshot::channel();
        let outbound = Outbound {
            id,
            content,
            done: Some(done),
        };

        tokio::select! {
            biased;
            _ = self.shared.shutdown.cancelled() => return Err(TransportError::Cancelled),
            queued = self.queue.send(outbound) => {
                queued.map_err(|_| TransportError::Cancelled)?;
            }
        }

        tokio::select! {
            biased;
            outcome = outcome => outcome.map_err(|_| TransportError::Cancelled)?,
            _ = self.shared.shutdown.cancelled() => Err(TransportError::Cancelled),
        }
    }

    /// Serialize `message` as JSON and send it
    pub async fn write_message<T>(&self, message: &T) -> Result<SendReceipt>
    where
        T: Serialize,
    {
        let payload =
            serde_json::to_vec(message).map_err(|e| TransportError::Serialization(e.to_string()))?;
        self.send(&payload).await
    }

    /// Wrap `message` in a versioned envelope and send it
    pub async fn write_envelope<T>(&self, message: T) -> Result<SendReceipt>
    where
        T: Serialize,
    {
        self.write_message(&MessageEnvelope::new(message)).await
    }

    /// Wait until message `id` is acknowledged or has failed.
    ///
    /// Returns the terminal status. Nothing is resent on timeout.
    pub async fn wait_for_ack(&self, id: u32, timeout: Duration) -> Result<MessageStatus> {
        let wait = async {
            loop {
                // Register before checking so an update in between is not missed
                let changed = self.shared.status_changed.notified();
                match self.shared.store.status(id) {
                    None => return Err(TransportError::UnknownMessage { id }),
                    Some(status) if status.is_terminal() => return Ok(status),
                    Some(_) => {}
                }
                tokio::select! {
                    _ = changed => {}
                    _ = self.shared.shutdown.cancelled() => return Err(TransportError::Cancelled),
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| TransportError::AckTimeout { id })?
    }

    /// Wait for an acknowledgment using the configured timeout
    pub async fn wait_for_ack_default(&self, id: u32) -> Result<MessageStatus> {
        self.wait_for_ack(id, self.shared.config.ack_timeout).await
    }

    /// Evict old delivery records once the store holds more than
    /// `max_concurrent` of them. Records with IDs below
    /// `threshold_id - max_concurrent` go first, then the lowest IDs until
    /// the store is back at capacity. Status is not considered. Returns the
    /// number of evicted records.
    pub fn cleanup_old_messages(&self, threshold_id: u32) -> usize {
        self.shared.cleanup_old_messages(threshold_id)
    }

    /// Delivery status of message `id`, if still tracked
    pub fn status(&self, id: u32) -> Option<MessageStatus> {
        self.shared.store.status(id)
    }

    /// Number of tracked delivery records
    pub fn message_count(&self) -> usize {
        self.shared.store.len()
    }

    /// The delivery record store
    pub fn store(&self) -> &MessageStore {
        &self.shared.store
    }

    /// Limits in effect for this writer
    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the background tasks and shut the connection down.
    ///
    /// Outstanding `write` calls return `Cancelled` and their records are
    /// marked `Failed`. Calling `close` again is a no-op.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        self.shared.shutdown.cancel();
        let tasks = self.tasks.lock().take();
        let Some(tasks) = tasks else {
            return Ok(());
        };

        if let Err(e) = tasks.receiver.await {
            warn!(error = %e, "ACK receiver task did not finish cleanly");
        }
        match tasks.sender.await {
            Ok(shutdown) => shutdown?,
            Err(e) => warn!(error = %e, "Sender task did not finish cleanly"),
        }

        info!(tracked = self.shared.store.len(), "Writer closed");
        Ok(())
    }
}

impl Drop for AckWriter {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl std::fmt::Debug for AckWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AckWriter")
            .field("config", &self.shared.config)
            .field("store", &self.shared.store)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Drain the queue in order, one frame write at a time. Shuts the write
/// half down when cancelled or when every handle is gone.
async fn run_sender<W>(
    mut conn: WriteHalf<W>,
    mut pending: mpsc::Receiver<Outbound>,
    shared: Arc<Shared>,
) -> std::io::Result<()>
where
    W: AsyncRead + AsyncWrite,
{
    loop {
        let mut outbound = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            next = pending.recv() => match next {
                Some(outbound) => outbound,
                None => break,
            },
        };

        let frame = match codec::encode(outbound.id, &outbound.content, shared.config.max_message_size) {
            Ok(frame) => frame,
            Err(e) => {
                shared.store.update_status(outbound.id, MessageStatus::Failed);
                shared.status_changed.notify_waiters();
                outbound.complete(Err(e));
                continue;
            }
        };

        let written = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => {
                if shared.store.mark_failed(outbound.id) {
                    shared.status_changed.notify_waiters();
                }
                outbound.complete(Err(TransportError::Cancelled));
                break;
            }
            written = write_frame(&mut conn, &frame) => written,
        };

        match written {
            Ok(()) => {
                debug!(message_id = outbound.id, length = outbound.content.len(), "Sent frame");
                outbound.complete(Ok(outbound.content.len()));
            }
            Err(e) => {
                warn!(message_id = outbound.id, error = %e, "Failed to send frame");
                shared.store.update_status(outbound.id, MessageStatus::Failed);
                shared.status_changed.notify_waiters();
                outbound.complete(Err(e.into()));
            }
        }
    }

    pending.close();
    conn.shutdown().await
}

async fn write_frame<W>(conn: &mut WriteHalf<W>, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncRead + AsyncWrite,
{
    conn.write_all(frame).await?;
    conn.flush().await
}

/// Record incoming ACK frames until the peer closes or the writer shuts down
async fn run_ack_receiver<R>(mut conn: ReadHalf<R>, shared: Arc<Shared>)
where
    R: AsyncRead + AsyncWrite,
{
    let mut ack = [0u8; ACK_LEN];
    loop {
        let read = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => break,
            read = conn.read_exact(&mut ack) => read,
        };

        match read {
            Ok(_) => {
                let id = codec::decode_ack(&ack);
                if shared.store.mark_acknowledged(id) {
                    trace!(message_id = id, "Message acknowledged");
                    shared.status_changed.notify_waiters();
                } else {
                    trace!(message_id = id, "Ignoring ACK for untracked message");
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                debug!("Peer closed acknowledgment stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read acknowledgment");
                break;
            }
        }
    }
}
