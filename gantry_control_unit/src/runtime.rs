//! Thread ownership and lifecycle.
//!
//! Startup order:
//! 1. Wire the control loop (fails fast on configuration defects).
//! 2. Start the inbound handler.
//! 3. Wait, bounded, for the startup signals to be populated.
//! 4. Start the control thread.
//!
//! Shutdown clears the shared running flag; both threads observe it within
//! one period and are joined before [`GantryRuntime::shutdown`] returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use gantry_common::bus::{FrameSink, FrameSource};

use crate::config::GantryConfig;
use crate::context::GantryContext;
use crate::cycle::{ControlLoop, CycleStats};
use crate::error::CycleError;
use crate::inbound::{InboundHandler, InboundStats};
use crate::report::StateReporter;

/// Poll interval of the startup readiness wait.
const READY_POLL: Duration = Duration::from_millis(10);

/// Upper bound on the inbound receive wait.
const INBOUND_POLL_MAX: Duration = Duration::from_millis(20);

/// Thread totals returned by [`GantryRuntime::shutdown`].
#[derive(Debug, Clone, Default)]
pub struct RuntimeSummary {
    pub inbound: InboundStats,
    pub cycle: CycleStats,
}

/// Running inbound and control threads.
pub struct GantryRuntime {
    ctx: Arc<GantryContext>,
    running: Arc<AtomicBool>,
    inbound: Option<JoinHandle<InboundStats>>,
    control: Option<JoinHandle<CycleStats>>,
}

impl GantryRuntime {
    /// Start both threads. The running flag is created here.
    pub fn start(
        config: &GantryConfig,
        ctx: Arc<GantryContext>,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
        reporter: Box<dyn StateReporter>,
    ) -> Result<Self, CycleError> {
        Self::start_with_flag(
            config,
            ctx,
            sink,
            source,
            reporter,
            Arc::new(AtomicBool::new(true)),
        )
    }

    /// Start both threads under an externally owned running flag.
    pub fn start_with_flag(
        config: &GantryConfig,
        ctx: Arc<GantryContext>,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
        reporter: Box<dyn StateReporter>,
        running: Arc<AtomicBool>,
    ) -> Result<Self, CycleError> {
        let mut control_loop = ControlLoop::new(config, Arc::clone(&ctx), sink, reporter)?;
        running.store(true, Ordering::SeqCst);

        let mut runtime = Self {
            ctx: Arc::clone(&ctx),
            running: Arc::clone(&running),
            inbound: None,
            control: None,
        };

        let poll = control_loop.period().min(INBOUND_POLL_MAX);
        let mut handler = InboundHandler::new(Arc::clone(&ctx), source);
        let flag = Arc::clone(&running);
        runtime.inbound = Some(
            thread::Builder::new()
                .name("gantry-inbound".into())
                .spawn(move || {
                    handler.run(&flag, poll);
                    handler.stats()
                })
                .map_err(|source| CycleError::Spawn {
                    name: "inbound",
                    source,
                })?,
        );

        let startup = &config.startup;
        if !startup.await_signals.is_empty() {
            info!(
                "Waiting up to {}ms for {:?}",
                startup.await_timeout_ms, startup.await_signals
            );
            if wait_ready(&ctx, &startup.await_signals, startup.timeout(), &running) {
                info!("Startup signals present");
            } else {
                warn!(
                    "Startup signals still missing after {}ms: {:?}; starting anyway",
                    startup.await_timeout_ms,
                    ctx.table.missing(&startup.await_signals)
                );
            }
        }

        let flag = Arc::clone(&running);
        runtime.control = Some(
            thread::Builder::new()
                .name("gantry-control".into())
                .spawn(move || {
                    control_loop.run(&flag);
                    control_loop.stats().clone()
                })
                .map_err(|source| CycleError::Spawn {
                    name: "control",
                    source,
                })?,
        );

        info!("Gantry runtime started");
        Ok(runtime)
    }

    #[inline]
    pub fn context(&self) -> &Arc<GantryContext> {
        &self.ctx
    }

    /// Flag shared with both threads. Clearing it requests shutdown.
    #[inline]
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Block until the running flag is cleared (e.g. by a signal handler).
    pub fn wait(&self) {
        while self.is_running() {
            thread::sleep(READY_POLL);
        }
    }

    /// Stop both threads and join them.
    pub fn shutdown(mut self) -> RuntimeSummary {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> RuntimeSummary {
        self.running.store(false, Ordering::SeqCst);
        let mut summary = RuntimeSummary::default();
        if let Some(handle) = self.control.take() {
            match handle.join() {
                Ok(stats) => summary.cycle = stats,
                Err(_) => warn!("control thread panicked"),
            }
        }
        if let Some(handle) = self.inbound.take() {
            match handle.join() {
                Ok(stats) => summary.inbound = stats,
                Err(_) => warn!("inbound thread panicked"),
            }
        }
        summary
    }
}

impl Drop for GantryRuntime {
    fn drop(&mut self) {
        if self.control.is_some() || self.inbound.is_some() {
            self.stop_and_join();
        }
    }
}

/// Wait until every signal in `signals` has been received at least once.
///
/// Returns `false` on timeout or when `running` is cleared first.
pub fn wait_ready(
    ctx: &GantryContext,
    signals: &[String],
    timeout: Duration,
    running: &AtomicBool,
) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if ctx.table.missing(signals).is_empty() {
            return true;
        }
        if !running.load(Ordering::SeqCst) || Instant::now() >= deadline {
            return false;
        }
        thread::sleep(READY_POLL);
    }
}
