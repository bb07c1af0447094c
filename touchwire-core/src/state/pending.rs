//! Reply correlation.
//!
//! The wire carries no request id, so the only way to pair a reply with
//! its request is order: the next frame after an `AwaitReply` command is
//! its answer. [`PendingSlot`] therefore holds at most one
//! [`PendingRequest`]; the connection serializes callers in front of it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Result, TouchwireError};
use crate::message::status;
use crate::packet::DecodedFrame;

// ── Reply ─────────────────────────────────────────────────────────

/// A successful reply from the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub opcode: u8,
    pub status: u8,
    pub payload: Bytes,
}

/// Continuation half handed to the reader task.
pub type ReplySender = oneshot::Sender<Result<Reply>>;

/// Map a correlated frame to the outcome its request should see.
pub fn classify_reply(request_opcode: u8, frame: DecodedFrame) -> Result<Reply> {
    if !frame.checksum_valid {
        return Err(TouchwireError::ChecksumMismatch {
            received: frame.received_checksum,
            computed: frame.computed_checksum,
        });
    }
    if frame.opcode != request_opcode {
        debug!(
            request = request_opcode,
            reply = frame.opcode,
            "reply opcode differs from request; correlating by order"
        );
    }
    match frame.sub_opcode {
        status::OK => Ok(Reply {
            opcode: frame.opcode,
            status: frame.sub_opcode,
            payload: frame.payload,
        }),
        status::FAILED => Err(TouchwireError::RequestFailed {
            opcode: request_opcode,
            status: frame.sub_opcode,
        }),
        other => Err(TouchwireError::UnexpectedReply {
            opcode: request_opcode,
            status: other,
        }),
    }
}

// ── PendingRequest ────────────────────────────────────────────────

/// The one request currently waiting for its reply.
#[derive(Debug)]
pub struct PendingRequest {
    /// Identifies this registration; later registrations get larger tickets.
    pub ticket: u64,
    /// Opcode of the command that was sent.
    pub opcode: u8,
    /// When the request was registered.
    pub sent_at: Instant,
    /// How long the caller is prepared to wait.
    pub deadline: Duration,
    reply_tx: ReplySender,
}

impl PendingRequest {
    /// Returns `true` if this request has exceeded its deadline.
    pub fn is_expired(&self) -> bool {
        self.sent_at.elapsed() > self.deadline
    }

    /// How long this request has been in-flight.
    pub fn elapsed(&self) -> Duration {
        self.sent_at.elapsed()
    }

    fn complete(self, outcome: Result<Reply>) -> bool {
        // The caller may have stopped waiting; nothing to do then.
        self.reply_tx.send(outcome).is_ok()
    }
}

// ── PendingSlot ──────────────────────────────────────────────────

/// Holder for the single outstanding request.
#[derive(Debug, Default)]
pub struct PendingSlot {
    slot: Mutex<Option<PendingRequest>>,
    next_ticket: AtomicU64,
}

impl PendingSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingRequest>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a request. Fails with `RequestInFlight` if one is already
    /// waiting; the existing continuation is never replaced.
    pub fn register(&self, opcode: u8, deadline: Duration, reply_tx: ReplySender) -> Result<u64> {
        let mut slot = self.lock();
        if slot.is_some() {
            return Err(TouchwireError::RequestInFlight);
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        *slot = Some(PendingRequest {
            ticket,
            opcode,
            sent_at: Instant::now(),
            deadline,
            reply_tx,
        });
        Ok(ticket)
    }

    /// Check if a request is waiting.
    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Hand `frame` to the waiting request.
    ///
    /// Returns `false` if nothing was waiting; the frame is then dropped.
    /// A frame that lands after the request's deadline is the late reply to
    /// it: the request fails with `Timeout` and the frame is dropped.
    pub fn resolve(&self, frame: DecodedFrame) -> bool {
        let Some(request) = self.lock().take() else {
            debug!(?frame, "no request waiting; frame ignored");
            return false;
        };
        if request.is_expired() {
            debug!(
                ticket = request.ticket,
                opcode = request.opcode,
                "reply arrived after the deadline; frame ignored"
            );
            let deadline = request.deadline;
            return request.complete(Err(TouchwireError::Timeout(deadline)));
        }
        debug!(
            ticket = request.ticket,
            elapsed_ms = request.elapsed().as_millis() as u64,
            "reply correlated"
        );
        let outcome = classify_reply(request.opcode, frame);
        request.complete(outcome)
    }

    /// Fail the waiting request with `error`.
    ///
    /// Returns `false` if nothing was waiting.
    pub fn fail(&self, error: TouchwireError) -> bool {
        match self.lock().take() {
            Some(request) => request.complete(Err(error)),
            None => false,
        }
    }

    /// Drop the registration identified by `ticket` if it is still current.
    pub fn cancel(&self, ticket: u64) -> bool {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|r| r.ticket == ticket) {
            *slot = None;
            true
        } else {
            false
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Opcode, ResponseMode};
    use crate::packet::{decode_frame, encode_frame};

    fn reply_frame(opcode: u8, status: u8, payload: &[u8]) -> DecodedFrame {
        let bytes = encode_frame(opcode, status, ResponseMode::AwaitReply, payload).unwrap();
        decode_frame(&bytes).unwrap()
    }

    #[test]
    fn register_and_resolve() {
        let slot = PendingSlot::new();
        let (tx, mut rx) = oneshot::channel();
        slot.register(Opcode::Ping as u8, Duration::from_secs(5), tx).unwrap();
        assert!(slot.is_pending());

        assert!(slot.resolve(reply_frame(0xA0, status::OK, b"pong")));
        assert!(!slot.is_pending());

        let reply = rx.try_recv().unwrap().unwrap();
        assert_eq!(&reply.payload[..], b"pong");
    }

    #[test]
    fn second_registration_is_refused() {
        let slot = PendingSlot::new();
        let (tx1, mut rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        slot.register(0xA0, Duration::from_secs(5), tx1).unwrap();
        let err = slot.register(0xC1, Duration::from_secs(5), tx2).unwrap_err();
        assert!(matches!(err, TouchwireError::RequestInFlight));

        // The first caller still gets its own reply.
        slot.resolve(reply_frame(0xA0, status::OK, b"first"));
        assert_eq!(&rx1.try_recv().unwrap().unwrap().payload[..], b"first");
    }

    #[test]
    fn resolve_without_waiter_is_ignored() {
        let slot = PendingSlot::new();
        assert!(!slot.resolve(reply_frame(0xA0, status::OK, &[])));
    }

    #[test]
    fn failure_status_rejects() {
        let slot = PendingSlot::new();
        let (tx, mut rx) = oneshot::channel();
        slot.register(0xB1, Duration::from_secs(5), tx).unwrap();
        slot.resolve(reply_frame(0xB1, status::FAILED, &[]));
        let err = rx.try_recv().unwrap().unwrap_err();
        assert!(matches!(err, TouchwireError::RequestFailed { opcode: 0xB1, status: 0x01 }));
    }

    #[test]
    fn unknown_status_is_unexpected() {
        let err = classify_reply(0xC1, reply_frame(0xC1, 0x7E, &[])).unwrap_err();
        assert!(matches!(err, TouchwireError::UnexpectedReply { status: 0x7E, .. }));
    }

    #[test]
    fn corrupted_reply_rejects_with_checksum_error() {
        let mut bytes = encode_frame(0xC1, status::OK, ResponseMode::AwaitReply, &[1, 2, 3])
            .unwrap()
            .to_vec();
        bytes[9] ^= 0x80;
        let frame = decode_frame(&bytes).unwrap();
        let err = classify_reply(0xC1, frame).unwrap_err();
        assert!(matches!(err, TouchwireError::ChecksumMismatch { .. }));
    }

    #[test]
    fn cancel_only_matches_current_ticket() {
        let slot = PendingSlot::new();
        let (tx, _rx) = oneshot::channel();
        let ticket = slot.register(0xA0, Duration::from_secs(5), tx).unwrap();
        assert!(!slot.cancel(ticket + 1));
        assert!(slot.is_pending());
        assert!(slot.cancel(ticket));
        assert!(!slot.is_pending());
    }

    #[test]
    fn fail_delivers_error() {
        let slot = PendingSlot::new();
        let (tx, mut rx) = oneshot::channel();
        slot.register(0xA0, Duration::from_secs(5), tx).unwrap();
        assert!(slot.fail(TouchwireError::ConnectionClosed));
        assert!(matches!(
            rx.try_recv().unwrap().unwrap_err(),
            TouchwireError::ConnectionClosed
        ));
        assert!(!slot.fail(TouchwireError::ConnectionClosed));
    }

    #[test]
    fn reply_after_deadline_times_out() {
        let slot = PendingSlot::new();
        let (tx, mut rx) = oneshot::channel();
        slot.register(0xA0, Duration::ZERO, tx).unwrap();
        std::thread::sleep(Duration::from_millis(1));

        assert!(slot.resolve(reply_frame(0xA0, status::OK, b"late")));
        assert!(!slot.is_pending());
        assert!(matches!(
            rx.try_recv().unwrap().unwrap_err(),
            TouchwireError::Timeout(d) if d == Duration::ZERO
        ));
    }
}
