//! Transport seam: where frames leave and enter the process.
//!
//! The physical bus bridge lives outside this workspace. Anything that can
//! move [`BusFrame`]s implements [`FrameSink`] (outbound) and
//! [`FrameSource`] (inbound). [`LoopbackEndpoint::pair`] provides an
//! in-process bus for tests and for the simulated gantry.
//!
//! # Timing Contracts
//!
//! | Operation | Blocking | Used from |
//! |-----------|----------|-----------|
//! | `FrameSink::send` | never | control cycle |
//! | `FrameSource::recv_timeout` | up to `timeout` | inbound handler |

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

use thiserror::Error;

use super::frame::BusFrame;

/// Transport-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Outbound queue full; the frame was not sent.
    #[error("transport queue full, frame {id:#x} dropped")]
    Full { id: u16 },

    /// The other side has gone away.
    #[error("transport closed")]
    Closed,

    /// Backend-specific failure.
    #[error("transport error: {0}")]
    Backend(String),
}

/// Outbound half of a transport. `send` must not block.
pub trait FrameSink: Send {
    /// Queue one frame for transmission.
    fn send(&mut self, frame: &BusFrame) -> Result<(), TransportError>;
}

/// Inbound half of a transport.
pub trait FrameSource: Send {
    /// Wait up to `timeout` for the next frame. `Ok(None)` on timeout.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<BusFrame>, TransportError>;

    /// Next frame if one is already queued.
    fn try_recv(&mut self) -> Result<Option<BusFrame>, TransportError> {
        self.recv_timeout(Duration::ZERO)
    }
}

// ─── Loopback ───────────────────────────────────────────────────────

/// Sending half of a loopback endpoint.
#[derive(Debug, Clone)]
pub struct LoopbackSink {
    tx: SyncSender<BusFrame>,
}

/// Receiving half of a loopback endpoint.
#[derive(Debug)]
pub struct LoopbackSource {
    rx: Receiver<BusFrame>,
}

/// One end of an in-process, bounded, bidirectional frame channel.
#[derive(Debug)]
pub struct LoopbackEndpoint {
    pub sink: LoopbackSink,
    pub source: LoopbackSource,
}

impl LoopbackEndpoint {
    /// Two connected endpoints; each direction queues at most `capacity` frames.
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::sync_channel(capacity);
        let (b_tx, a_rx) = mpsc::sync_channel(capacity);
        (
            Self {
                sink: LoopbackSink { tx: a_tx },
                source: LoopbackSource { rx: a_rx },
            },
            Self {
                sink: LoopbackSink { tx: b_tx },
                source: LoopbackSource { rx: b_rx },
            },
        )
    }

    /// Split into independently owned halves.
    pub fn split(self) -> (LoopbackSink, LoopbackSource) {
        (self.sink, self.source)
    }
}

impl FrameSink for LoopbackSink {
    fn send(&mut self, frame: &BusFrame) -> Result<(), TransportError> {
        self.tx.try_send(frame.clone()).map_err(|e| match e {
            TrySendError::Full(f) => TransportError::Full { id: f.id },
            TrySendError::Disconnected(_) => TransportError::Closed,
        })
    }
}

impl FrameSource for LoopbackSource {
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<BusFrame>, TransportError> {
        if timeout.is_zero() {
            return match self.rx.try_recv() {
                Ok(frame) => Ok(Some(frame)),
                Err(mpsc::TryRecvError::Empty) => Ok(None),
                Err(mpsc::TryRecvError::Disconnected) => Err(TransportError::Closed),
            };
        }
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

impl LoopbackSource {
    /// Drain every frame currently queued.
    pub fn drain(&mut self) -> Vec<BusFrame> {
        self.rx.try_iter().collect()
    }
}
