//! Inbound frame handler.
//!
//! Drains a [`FrameSource`] into the state table. Rejected frames and
//! receive errors are counted and logged at a bounded rate (first 10, then
//! every 1000th). After a receive error the handler backs off for one poll
//! interval.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, trace, warn};

use gantry_common::bus::{BusFrame, FrameSource, TransportError};

use crate::context::GantryContext;

/// Counters kept by the inbound handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundStats {
    pub accepted: u64,
    pub dropped: u64,
    pub receive_errors: u64,
}

pub struct InboundHandler {
    ctx: Arc<GantryContext>,
    source: Box<dyn FrameSource>,
    stats: InboundStats,
}

impl InboundHandler {
    pub fn new(ctx: Arc<GantryContext>, source: Box<dyn FrameSource>) -> Self {
        Self {
            ctx,
            source,
            stats: InboundStats::default(),
        }
    }

    #[inline]
    pub fn stats(&self) -> InboundStats {
        self.stats
    }

    /// Store one frame, logging rejections.
    pub fn handle(&mut self, frame: &BusFrame) {
        match self.ctx.table.on_frame(frame) {
            Ok(name) => {
                self.stats.accepted += 1;
                trace!(signal = name, id = frame.id, "frame accepted");
            }
            Err(e) => {
                self.stats.dropped += 1;
                let n = self.stats.dropped;
                if n <= 10 || n % 1000 == 0 {
                    warn!("Dropped frame #{n}: {e}");
                }
            }
        }
    }

    /// Handle every frame already queued. Returns how many were read.
    pub fn drain(&mut self) -> Result<usize, TransportError> {
        let mut count = 0;
        while let Some(frame) = self.source.try_recv()? {
            self.handle(&frame);
            count += 1;
        }
        Ok(count)
    }

    /// Receive until `running` is cleared or the transport closes. Waits at
    /// most `poll` per receive so the flag is observed promptly.
    pub fn run(&mut self, running: &AtomicBool, poll: Duration) {
        info!("Inbound handler started");
        while running.load(Ordering::SeqCst) {
            match self.source.recv_timeout(poll) {
                Ok(Some(frame)) => self.handle(&frame),
                Ok(None) => {}
                Err(TransportError::Closed) => {
                    warn!("Transport closed, inbound handler exiting");
                    break;
                }
                Err(e) => {
                    self.stats.receive_errors += 1;
                    let n = self.stats.receive_errors;
                    if n <= 10 || n % 1000 == 0 {
                        warn!("Receive failure #{n}: {e}");
                    }
                    std::thread::sleep(poll);
                }
            }
        }
        info!(
            "Inbound handler stopped ({} accepted, {} dropped)",
            self.stats.accepted, self.stats.dropped
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GantryConfig;
    use gantry_common::bus::codec::encode;
    use gantry_common::bus::{FrameSink, LoopbackEndpoint, SignalValue};

    #[test]
    fn drain_stores_and_counts() {
        let ctx = GantryContext::canonical(&GantryConfig::default()).unwrap();
        let (local, mut remote) = LoopbackEndpoint::pair(8);
        let mut handler = InboundHandler::new(Arc::clone(&ctx), Box::new(local.source));

        let d = ctx.registry.describe("laser_distance_0").unwrap();
        remote
            .sink
            .send(&encode(d, SignalValue::Int32(1200)).unwrap())
            .unwrap();
        remote.sink.send(&BusFrame::new(0x7ff, &[0]).unwrap()).unwrap();
        remote.sink.send(&BusFrame::new(0x104, &[1]).unwrap()).unwrap();

        assert_eq!(handler.drain().unwrap(), 3);
        assert_eq!(
            handler.stats(),
            InboundStats {
                accepted: 1,
                dropped: 2,
                receive_errors: 0,
            }
        );
        assert_eq!(ctx.table.read("laser_distance_0"), Some(SignalValue::Int32(1200)));
        assert_eq!(ctx.table.read("encoder_abs_0"), None);
    }

    #[test]
    fn run_exits_when_transport_closes() {
        let ctx = GantryContext::canonical(&GantryConfig::default()).unwrap();
        let (local, remote) = LoopbackEndpoint::pair(8);
        let mut handler = InboundHandler::new(ctx, Box::new(local.source));
        drop(remote);
        let running = AtomicBool::new(true);
        handler.run(&running, Duration::from_millis(5));
    }

    struct FailingSource {
        calls: Arc<std::sync::atomic::AtomicU64>,
    }

    impl FrameSource for FailingSource {
        fn recv_timeout(&mut self, _: Duration) -> Result<Option<BusFrame>, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Backend("bus-off".into()))
        }
    }

    #[test]
    fn receive_errors_back_off_and_count() {
        let ctx = GantryContext::canonical(&GantryConfig::default()).unwrap();
        let calls = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let source = FailingSource {
            calls: Arc::clone(&calls),
        };
        let mut handler = InboundHandler::new(ctx, Box::new(source));
        let running = Arc::new(AtomicBool::new(true));

        let flag = Arc::clone(&running);
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            flag.store(false, Ordering::SeqCst);
        });
        handler.run(&running, Duration::from_millis(10));
        stopper.join().unwrap();

        // One poll interval of back-off per error: ~10 in 100ms, never thousands.
        let n = calls.load(Ordering::SeqCst);
        assert!((1..=20).contains(&n), "{n} receive attempts");
        assert_eq!(handler.stats().receive_errors, n);
        assert_eq!(handler.stats().accepted, 0);
    }
}
