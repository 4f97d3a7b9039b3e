//! Per-tick state reports.
//!
//! The control cycle publishes one [`StateReport`] per tick through a
//! [`StateReporter`]. Reporters must not block the cycle; anything that does
//! I/O runs behind a [`BackgroundReporter`].

use std::io::{self, Write};
use std::sync::mpsc::{self, Sender, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use bitflags::bitflags;
use serde::Serialize;
use tracing::{debug, warn};

use gantry_common::consts::AXIS_COUNT;

use crate::command::{ControlMode, ControlTarget};
use crate::state::AxisState;

bitflags! {
    /// Per-axis status in a report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AxisFlags: u8 {
        /// Every encoder entry known and fresh.
        const READY       = 0x01;
        /// An encoder entry has never been received.
        const UNKNOWN     = 0x02;
        /// An encoder entry is older than the staleness threshold.
        const STALE       = 0x04;
        /// A speed command was encoded this tick.
        const COMMANDED   = 0x08;
        /// The transport refused the speed command.
        const SEND_FAILED = 0x10;
    }
}

/// One axis in a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisReport {
    /// Derived state, absent when the axis is not ready.
    pub state: Option<AxisState>,
    /// Commanded speed in wire units, absent when nothing was sent.
    pub command_wire: Option<f64>,
    /// Raw [`AxisFlags`] bits.
    pub flags: u8,
}

impl AxisReport {
    #[inline]
    pub fn flags(&self) -> AxisFlags {
        AxisFlags::from_bits_truncate(self.flags)
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.flags().contains(AxisFlags::READY)
    }
}

/// Snapshot published once per control tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateReport {
    pub tick: u64,
    pub mode: ControlMode,
    pub target: ControlTarget,
    pub axes: [AxisReport; AXIS_COUNT],
}

/// Sink for state reports.
pub trait StateReporter: Send {
    fn publish(&mut self, report: &StateReport);
}

// ─── Implementations ────────────────────────────────────────────────

/// Discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl StateReporter for NullReporter {
    fn publish(&mut self, _report: &StateReport) {}
}

/// Emits each report as a `debug!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StateReporter for TracingReporter {
    fn publish(&mut self, r: &StateReport) {
        let [x, y] = &r.axes;
        debug!(
            tick = r.tick,
            mode = %r.mode,
            x_pos = x.state.map(|s| s.position_m),
            y_pos = y.state.map(|s| s.position_m),
            x_cmd = x.command_wire,
            y_cmd = y.command_wire,
            "state"
        );
    }
}

/// Writes each report as one JSON line and flushes.
///
/// Blocks on the writer. The binary runs it behind a [`BackgroundReporter`].
#[derive(Debug)]
pub struct JsonLinesReporter<W> {
    writer: W,
    failures: u64,
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failures: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, report: &StateReport) -> Result<(), String> {
        serde_json::to_writer(&mut self.writer, report).map_err(|e| e.to_string())?;
        self.writer.write_all(b"\n").map_err(|e| e.to_string())?;
        self.writer.flush().map_err(|e| e.to_string())
    }
}

impl<W: Write + Send> StateReporter for JsonLinesReporter<W> {
    fn publish(&mut self, report: &StateReport) {
        if let Err(e) = self.write_line(report) {
            self.failures += 1;
            if self.failures <= 10 || self.failures % 1000 == 0 {
                warn!("state report write failed (#{}): {e}", self.failures);
            }
        }
    }
}

/// Forwards copies over a channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<StateReport>,
}

impl ChannelReporter {
    pub fn new(tx: Sender<StateReport>) -> Self {
        Self { tx }
    }
}

impl StateReporter for ChannelReporter {
    fn publish(&mut self, report: &StateReport) {
        let _ = self.tx.send(*report);
    }
}

/// Runs another reporter on its own thread.
///
/// `publish` queues a copy with `try_send`; when the queue is full the report
/// is dropped and counted. Dropping the reporter closes the queue and joins
/// the thread once the queued reports are written.
pub struct BackgroundReporter {
    tx: Option<SyncSender<StateReport>>,
    handle: Option<JoinHandle<()>>,
    dropped: u64,
}

impl BackgroundReporter {
    pub fn spawn<R: StateReporter + 'static>(mut inner: R, capacity: usize) -> io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel::<StateReport>(capacity);
        let handle = thread::Builder::new()
            .name("gantry-report".into())
            .spawn(move || {
                for report in rx {
                    inner.publish(&report);
                }
            })?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            dropped: 0,
        })
    }

    /// Reports discarded because the queue was full.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl StateReporter for BackgroundReporter {
    fn publish(&mut self, report: &StateReport) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(*report) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                if self.dropped <= 10 || self.dropped % 1000 == 0 {
                    warn!("state report queue full, dropped #{}", self.dropped);
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("state report thread gone, reports disabled");
                self.tx = None;
            }
        }
    }
}

impl Drop for BackgroundReporter {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("state report thread panicked");
            }
        }
    }
}
