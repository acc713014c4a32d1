//! Bounded outbound queue, one per connection.
//!
//! Fan-out to a connection is a non-blocking enqueue so that one slow
//! consumer can never stall delivery to its peers. Under overflow the
//! queue sheds the oldest droppable event (typing, presence). A durable
//! event that still does not fit marks the consumer as too slow: the
//! queue closes and the writer task tears the connection down through
//! the normal disconnect path.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, Notify};

use crate::domain::ServerEvent;

/// Why an outbound queue was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The consumer fell persistently behind and a durable event could
    /// not be enqueued
    SlowConsumer,
}

/// Enqueue failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    #[error("outbound queue is closed")]
    Closed,
    #[error("outbound queue overflowed on a durable event")]
    Overflow,
}

/// Item yielded by the receiving side
#[derive(Debug, PartialEq)]
pub enum Outbound {
    Event(ServerEvent),
    Closed(CloseReason),
}

struct QueueState {
    frames: VecDeque<ServerEvent>,
    closed: Option<CloseReason>,
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    senders: AtomicUsize,
    capacity: usize,
}

/// Create a bounded outbound queue with the given capacity.
///
/// Returns the cloneable sending handle and the single receiving half
/// owned by the connection's writer task.
pub fn outbound_channel(capacity: usize) -> (OutboundQueue, OutboundReceiver) {
    let shared = Arc::new(Shared {
        state: Mutex::new(QueueState {
            frames: VecDeque::with_capacity(capacity),
            closed: None,
        }),
        notify: Notify::new(),
        senders: AtomicUsize::new(1),
        capacity,
    });
    (
        OutboundQueue {
            shared: shared.clone(),
        },
        OutboundReceiver { shared },
    )
}

/// Sending handle to a connection's outbound queue
pub struct OutboundQueue {
    shared: Arc<Shared>,
}

impl OutboundQueue {
    /// Enqueue an event without blocking.
    ///
    /// Overflow policy: evict the oldest droppable event to make room;
    /// shed the incoming event itself if it is droppable and nothing can
    /// be evicted; otherwise close the queue with `SlowConsumer` and
    /// return `PushError::Overflow`.
    pub async fn push(&self, event: ServerEvent) -> Result<(), PushError> {
        let mut state = self.shared.state.lock().await;
        if state.closed.is_some() {
            return Err(PushError::Closed);
        }
        if state.frames.len() >= self.shared.capacity {
            if let Some(pos) = state.frames.iter().position(ServerEvent::is_droppable) {
                state.frames.remove(pos);
            } else if event.is_droppable() {
                tracing::trace!("outbound queue full, shedding ephemeral event");
                return Ok(());
            } else {
                state.closed = Some(CloseReason::SlowConsumer);
                drop(state);
                self.shared.notify.notify_one();
                return Err(PushError::Overflow);
            }
        }
        state.frames.push_back(event);
        drop(state);
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Close the queue; the writer task observes the reason on its next
    /// receive
    pub async fn close(&self, reason: CloseReason) {
        let mut state = self.shared.state.lock().await;
        if state.closed.is_none() {
            state.closed = Some(reason);
        }
        drop(state);
        self.shared.notify.notify_one();
    }

    pub async fn is_closed(&self) -> bool {
        self.shared.state.lock().await.closed.is_some()
    }

    /// Number of currently queued events
    pub async fn len(&self) -> usize {
        self.shared.state.lock().await.frames.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Clone for OutboundQueue {
    fn clone(&self) -> Self {
        self.shared.senders.fetch_add(1, Ordering::Relaxed);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl Drop for OutboundQueue {
    fn drop(&mut self) {
        if self.shared.senders.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last sender gone; wake the receiver so it can terminate
            self.shared.notify.notify_one();
        }
    }
}

/// Receiving half, owned by the connection's writer task
pub struct OutboundReceiver {
    shared: Arc<Shared>,
}

impl OutboundReceiver {
    /// Receive the next outbound item.
    ///
    /// Yields `Outbound::Closed` as soon as the queue is closed (pending
    /// frames are discarded; the connection is being torn down), and
    /// `None` once every sending handle is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<Outbound> {
        loop {
            {
                let mut state = self.shared.state.lock().await;
                if let Some(reason) = state.closed {
                    return Some(Outbound::Closed(reason));
                }
                if let Some(event) = state.frames.pop_front() {
                    return Some(Outbound::Event(event));
                }
                if self.shared.senders.load(Ordering::Acquire) == 0 {
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Whether the queue currently holds no frames (test/debug aid)
    pub async fn is_empty(&self) -> bool {
        self.shared.state.lock().await.frames.is_empty()
    }
}
