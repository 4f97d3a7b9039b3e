//! Fixed-rate control cycle: read → control → write.
//!
//! ## Tick Body
//! 1. Advance the state table tick.
//! 2. Derive each axis' physical state. Unknown or stale encoder data skips
//!    the axis: no frame is sent for it this tick.
//! 3. Run the controller selected by the current target's mode on every
//!    ready axis. Velocity mode tracks the commanded velocity; position mode
//!    feeds the measured position back into the PID.
//! 4. Scale to wire units, encode one Float64 frame per ready axis and hand
//!    it to the transport without blocking.
//! 5. Publish a [`StateReport`].
//!
//! Encode and send failures are logged and cost only the affected axis for
//! this tick; the loop carries on next period.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use gantry_common::bus::codec::encode;
use gantry_common::bus::{FrameSink, SignalValue};
use gantry_common::config::ConfigError;
use gantry_common::consts::AXIS_COUNT;

use crate::command::ControlMode;
use crate::config::GantryConfig;
use crate::context::GantryContext;
use crate::control::ControllerBank;
use crate::error::CycleError;
use crate::report::{AxisFlags, AxisReport, StateReport, StateReporter};
use crate::state::{AxisWiring, NotReady};

/// Cycles between periodic statistics log lines (one minute at 20 Hz).
const STATS_LOG_INTERVAL: u64 = 1200;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Per-cycle timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [µs].
    pub last_cycle_us: u64,
    /// Minimum cycle duration [µs].
    pub min_cycle_us: u64,
    /// Maximum cycle duration [µs].
    pub max_cycle_us: u64,
    /// Running sum for average computation.
    pub sum_cycle_us: u64,
    /// Cycles whose body took longer than the period.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_us: 0,
            min_cycle_us: u64::MAX,
            max_cycle_us: 0,
            sum_cycle_us: 0,
            overruns: 0,
        }
    }

    /// Record one cycle body duration.
    #[inline]
    pub fn record(&mut self, duration: Duration, period: Duration) {
        let us = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.cycle_count += 1;
        self.last_cycle_us = us;
        self.min_cycle_us = self.min_cycle_us.min(us);
        self.max_cycle_us = self.max_cycle_us.max(us);
        self.sum_cycle_us = self.sum_cycle_us.saturating_add(us);
        if duration > period {
            self.overruns += 1;
        }
    }

    /// Average cycle time [µs] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_us(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_us / self.cycle_count
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Axis Readiness ─────────────────────────────────────────────────

/// Last logged readiness of an axis, for transition logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Initial,
    Ready,
    NotReady,
}

// ─── Control Loop ───────────────────────────────────────────────────

/// The periodic controller.
pub struct ControlLoop {
    ctx: Arc<GantryContext>,
    axes: [AxisWiring; AXIS_COUNT],
    controllers: ControllerBank,
    sink: Box<dyn FrameSink>,
    reporter: Box<dyn StateReporter>,
    period: Duration,
    stale_threshold: u64,
    counts_per_m: f64,
    wire_per_m: f64,
    last_tick: Option<Instant>,
    readiness: [Readiness; AXIS_COUNT],
    last_mode: Option<ControlMode>,
    send_failures: u64,
    stats: CycleStats,
}

impl ControlLoop {
    /// Wire the loop to `ctx`. Fails if any signal an axis reads or writes
    /// is missing from the registry or has the wrong wire type.
    pub fn new(
        config: &GantryConfig,
        ctx: Arc<GantryContext>,
        sink: Box<dyn FrameSink>,
        reporter: Box<dyn StateReporter>,
    ) -> Result<Self, CycleError> {
        let wired = config
            .axes
            .iter()
            .map(|axis| AxisWiring::resolve(axis, &ctx.registry))
            .collect::<Result<Vec<_>, _>>()?;
        let count = wired.len();
        let axes: [AxisWiring; AXIS_COUNT] = wired.try_into().map_err(|_| {
            ConfigError::invalid(format!("expected {AXIS_COUNT} axes, found {count}"))
        })?;

        info!(
            "Control loop wired: period={}ms, stale_threshold={} ticks, axes=[{}]",
            config.control.cycle_time_ms,
            config.control.stale_threshold,
            axes.iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            ctx,
            axes,
            controllers: ControllerBank::from_config(config),
            sink,
            reporter,
            period: config.control.period(),
            stale_threshold: config.control.stale_threshold,
            counts_per_m: config.control.counts_per_m,
            wire_per_m: config.control.wire_per_m,
            last_tick: None,
            readiness: [Readiness::Initial; AXIS_COUNT],
            last_mode: None,
            send_failures: 0,
            stats: CycleStats::new(),
        })
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn controllers(&self) -> &ControllerBank {
        &self.controllers
    }

    #[inline]
    pub fn context(&self) -> &Arc<GantryContext> {
        &self.ctx
    }

    /// Run one tick with `dt` measured from the previous tick. The first
    /// tick uses the nominal period.
    pub fn tick(&mut self) -> StateReport {
        let now = Instant::now();
        let dt = self
            .last_tick
            .map_or(self.period, |prev| now.duration_since(prev));
        self.last_tick = Some(now);
        self.tick_with_dt(dt.as_secs_f64())
    }

    /// Run one tick with an explicit `dt` [s].
    pub fn tick_with_dt(&mut self, dt: f64) -> StateReport {
        let tick = self.ctx.table.advance_tick();
        let target = self.ctx.target.snapshot();
        let mode = target.mode();
        if self.last_mode != Some(mode) {
            debug!(tick, %mode, "controller selected");
            self.last_mode = Some(mode);
        }

        let mut axes = [AxisReport::default(); AXIS_COUNT];
        let setpoints = target.values();
        let controller = self.controllers.select(mode);

        for (i, wiring) in self.axes.iter().enumerate() {
            let report = &mut axes[i];
            let derived = wiring.derive(&self.ctx.table, self.stale_threshold, self.counts_per_m);
            log_readiness(&mut self.readiness[i], wiring, &derived);

            let state = match derived {
                Ok(state) => state,
                Err(NotReady::Unknown(_)) => {
                    report.flags = AxisFlags::UNKNOWN.bits();
                    continue;
                }
                Err(NotReady::Stale(_)) => {
                    report.flags = AxisFlags::STALE.bits();
                    continue;
                }
            };
            let mut flags = AxisFlags::READY;
            report.state = Some(state);

            let current = match mode {
                ControlMode::VelocityHold => state.velocity_mps,
                ControlMode::PositionHold => state.position_m,
            };
            let command_mps = controller.compute_axis(i, current, setpoints[i], dt);
            let wire = command_mps * self.wire_per_m;

            let Some(descriptor) = self.ctx.registry.get(wiring.output_index()) else {
                warn!(axis = %wiring.name, "output signal vanished from registry");
                report.flags = flags.bits();
                continue;
            };
            let frame = match encode(descriptor, SignalValue::Float64(wire)) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(axis = %wiring.name, "encode failed: {e}");
                    report.flags = flags.bits();
                    continue;
                }
            };

            flags |= AxisFlags::COMMANDED;
            report.command_wire = Some(wire);
            if let Err(e) = self.sink.send(&frame) {
                flags |= AxisFlags::SEND_FAILED;
                self.send_failures += 1;
                if self.send_failures <= 10 || self.send_failures % 1000 == 0 {
                    warn!(
                        "Send failure #{} on {}: {e}",
                        self.send_failures, descriptor.name
                    );
                }
            }
            report.flags = flags.bits();
        }

        let report = StateReport {
            tick,
            mode,
            target,
            axes,
        };
        self.reporter.publish(&report);
        report
    }

    /// Run until `running` is cleared. Each iteration runs one tick, then
    /// sleeps for the rest of the period.
    pub fn run(&mut self, running: &AtomicBool) {
        info!(
            "Entering control loop (cycle_time={}ms)",
            self.period.as_millis()
        );

        while running.load(Ordering::SeqCst) {
            let cycle_start = Instant::now();
            self.tick();

            let elapsed = cycle_start.elapsed();
            self.stats.record(elapsed, self.period);
            if elapsed > self.period
                && (self.stats.overruns <= 10 || self.stats.overruns % 1000 == 0)
            {
                warn!(
                    "Cycle overrun #{}: took {}µs (period {}ms)",
                    self.stats.overruns,
                    elapsed.as_micros(),
                    self.period.as_millis()
                );
            }

            if self.stats.cycle_count % STATS_LOG_INTERVAL == 0 {
                log_stats(&self.stats);
            }

            if elapsed < self.period {
                std::thread::sleep(self.period - elapsed);
            }
        }

        log_stats(&self.stats);
        info!("Control loop stopped after {} cycles", self.stats.cycle_count);
    }
}

fn log_readiness(
    last: &mut Readiness,
    wiring: &AxisWiring,
    derived: &Result<crate::state::AxisState, NotReady>,
) {
    match derived {
        Ok(_) if *last != Readiness::Ready => {
            if *last == Readiness::NotReady {
                info!(axis = %wiring.name, "axis recovered");
            } else {
                info!(axis = %wiring.name, "axis ready");
            }
            *last = Readiness::Ready;
        }
        Err(reason) if *last != Readiness::NotReady => {
            warn!(axis = %wiring.name, "axis not ready: {reason}");
            *last = Readiness::NotReady;
        }
        _ => {}
    }
}

fn log_stats(stats: &CycleStats) {
    if stats.cycle_count == 0 {
        return;
    }
    info!(
        "Cycle stats: count={}, min={}µs, avg={}µs, max={}µs, overruns={}",
        stats.cycle_count,
        stats.min_cycle_us,
        stats.avg_cycle_us(),
        stats.max_cycle_us,
        stats.overruns
    );
}
