// crates/mash-harness-net/src/correlator.rs
// ============================================================================
// Module: Request/Response Correlator
// Description: Pending-waiter map and inbound frame routing.
// Purpose: Match responses to outstanding requests by message-id.
// Dependencies: crate::protocol, tokio
// ============================================================================

//! ## Overview
//! The correlator keeps one single-shot waiter per outstanding message-id.
//! The connection's reader task decodes every inbound frame and routes it:
//! responses complete their waiter by id (never by position), notifications
//! and close frames join the notification queue in arrival order, pongs join
//! a dedicated pong queue, and renewal messages join the renewal queue. A
//! second response for an already-completed id is counted and discarded; no
//! waiter is ever completed twice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::protocol::DecodedFrame;
use crate::protocol::RenewalMessage;
use crate::protocol::WireMessage;

// ============================================================================
// SECTION: Correlator
// ============================================================================

/// Pending-waiter map shared between the driver task and the reader task.
///
/// # Invariants
/// - At most one waiter exists per message-id.
/// - After `fail_all`, every outstanding waiter observes a closed channel.
#[derive(Debug, Default)]
pub struct Correlator {
    /// Waiters keyed by message-id.
    pending: Mutex<HashMap<u32, oneshot::Sender<WireMessage>>>,
    /// Count of discarded duplicate responses.
    duplicates: AtomicU64,
    /// Count of frames the reader decoded.
    received: AtomicU64,
    /// Set once the reader observed close or a fatal error.
    closed: AtomicBool,
    /// Reader-side error retained for the driver task.
    reader_error: Mutex<Option<String>>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for a message-id.
    ///
    /// A previous waiter under the same id is replaced and observes a closed
    /// channel.
    pub fn register(&self, message_id: u32) -> oneshot::Receiver<WireMessage> {
        let (tx, rx) = oneshot::channel();
        self.lock_pending().insert(message_id, tx);
        rx
    }

    /// Removes a waiter after cancellation or timeout.
    pub fn cancel(&self, message_id: u32) {
        self.lock_pending().remove(&message_id);
    }

    /// Completes the waiter for a message-id.
    ///
    /// Returns false when no waiter was registered (duplicate or unsolicited
    /// response); the message is counted and discarded.
    pub fn complete(&self, message_id: u32, message: WireMessage) -> bool {
        match self.lock_pending().remove(&message_id) {
            Some(waiter) => {
                // A dropped receiver means the step already timed out.
                let _ = waiter.send(message);
                true
            }
            None => {
                self.duplicates.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Drops every outstanding waiter and marks the correlator closed.
    pub fn fail_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.lock_pending().clear();
    }

    /// Returns true once the reader observed close or a fatal error.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns the number of outstanding waiters.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    /// Returns the count of discarded duplicate responses.
    #[must_use]
    pub fn duplicates_discarded(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Records one decoded inbound frame.
    pub fn note_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the count of decoded inbound frames.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Retains the reader-side error for the driver task.
    pub fn set_reader_error(&self, message: impl Into<String>) {
        let mut slot = self.reader_error.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(message.into());
    }

    /// Returns the retained reader-side error.
    #[must_use]
    pub fn reader_error(&self) -> Option<String> {
        self.reader_error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Locks the pending map, recovering from poisoning.
    fn lock_pending(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<u32, oneshot::Sender<WireMessage>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Inbound Queues
// ============================================================================

/// Sender half of the inbound queues, owned by the reader task.
#[derive(Debug, Clone)]
pub struct InboundSenders {
    /// Notifications and close frames, arrival order.
    pub notifications: mpsc::UnboundedSender<WireMessage>,
    /// Pong sequence numbers.
    pub pongs: mpsc::UnboundedSender<u32>,
    /// Renewal messages, arrival order.
    pub renewals: mpsc::UnboundedSender<RenewalMessage>,
}

/// Receiver half of the inbound queues, owned by the connection.
#[derive(Debug)]
pub struct InboundQueues {
    /// Notifications and close frames, arrival order.
    pub notifications: mpsc::UnboundedReceiver<WireMessage>,
    /// Pong sequence numbers.
    pub pongs: mpsc::UnboundedReceiver<u32>,
    /// Renewal messages, arrival order.
    pub renewals: mpsc::UnboundedReceiver<RenewalMessage>,
}

/// Creates the paired inbound queues.
#[must_use]
pub fn inbound_channel() -> (InboundSenders, InboundQueues) {
    let (notif_tx, notif_rx) = mpsc::unbounded_channel();
    let (pong_tx, pong_rx) = mpsc::unbounded_channel();
    let (renewal_tx, renewal_rx) = mpsc::unbounded_channel();
    (
        InboundSenders {
            notifications: notif_tx,
            pongs: pong_tx,
            renewals: renewal_tx,
        },
        InboundQueues {
            notifications: notif_rx,
            pongs: pong_rx,
            renewals: renewal_rx,
        },
    )
}

// ============================================================================
// SECTION: Inbound Routing
// ============================================================================

/// Routes one decoded frame; returns false when the reader should stop.
pub fn dispatch_inbound(
    correlator: &Correlator,
    senders: &InboundSenders,
    frame: DecodedFrame,
) -> bool {
    match frame {
        DecodedFrame::Wire(message) => match message {
            WireMessage::Response {
                message_id, ..
            } => {
                correlator.complete(message_id, message);
                true
            }
            WireMessage::ControlPong {
                sequence,
            } => {
                let _ = senders.pongs.send(sequence);
                true
            }
            WireMessage::ControlClose {
                ..
            } => {
                let _ = senders.notifications.send(message);
                correlator.fail_all();
                false
            }
            WireMessage::Notification {
                ..
            }
            | WireMessage::ControlPing {
                ..
            } => {
                let _ = senders.notifications.send(message);
                true
            }
            WireMessage::Request {
                ..
            }
            | WireMessage::Trigger {
                ..
            } => {
                // Outbound-only kinds arriving inbound join the notification
                // queue so malformed-peer suites can assert on them.
                let _ = senders.notifications.send(message);
                true
            }
        },
        DecodedFrame::Renewal(message) => {
            let _ = senders.renewals.send(message);
            true
        }
    }
}
