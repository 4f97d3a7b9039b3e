//! Simulated gantry.
//!
//! Plays the microcontroller side of the bus: consumes `control_*_speed`
//! frames, integrates motion with an acceleration limit and hard stops at
//! the travel bounds, and publishes what the real boards publish:
//!
//! | Signal | Value |
//! |--------|-------|
//! | `encoder_abs_k` | (position − offset) · counts_per_m |
//! | `encoder_speed_k` | velocity · counts_per_m |
//! | `encoder_ppr_k` | counts per revolution |
//! | `laser_distance_0/1` | x / y position [mm] |
//! | `main_crane_driver_status` | all drivers OK |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use gantry_common::bus::codec::{decode, encode};
use gantry_common::bus::signal::names;
use gantry_common::bus::{
    BoolSet, FrameSink, FrameSource, LoopbackEndpoint, SignalRegistry, SignalValue,
    TransportError,
};
use gantry_common::consts::AXIS_COUNT;

use crate::command::AxisBounds;
use crate::config::GantryConfig;

/// Encoder resolution [counts/rev].
pub const ENCODER_PPR: i32 = 2048;

/// Motion limits of the simulated drives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Maximum acceleration [m/s²].
    pub max_acceleration: f64,
    /// Simulation step [s] used by [`SimulatedGantry::spawn`].
    pub step: Duration,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            max_acceleration: 1.0,
            step: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone)]
struct SimAxis {
    name: String,
    output: String,
    encoders: Vec<u8>,
    offset: f64,
    bounds: AxisBounds,
    position: f64,
    velocity: f64,
    commanded: f64,
}

impl SimAxis {
    fn update(&mut self, dt: f64, max_acc: f64) {
        let max_change = max_acc * dt;
        self.velocity += (self.commanded - self.velocity).clamp(-max_change, max_change);
        self.position += self.velocity * dt;

        if self.position <= self.bounds.min && self.velocity < 0.0 {
            self.position = self.bounds.min;
            self.velocity = 0.0;
        } else if self.position >= self.bounds.max && self.velocity > 0.0 {
            self.position = self.bounds.max;
            self.velocity = 0.0;
        }

        trace!(
            "Sim axis {}: pos={:.4}, vel={:.4}, cmd={:.4}",
            self.name, self.position, self.velocity, self.commanded
        );
    }
}

/// The remote half of a bus, simulating the gantry hardware.
pub struct SimulatedGantry {
    registry: Arc<SignalRegistry>,
    endpoint: LoopbackEndpoint,
    axes: Vec<SimAxis>,
    params: SimulationParams,
    counts_per_m: f64,
    wire_per_m: f64,
    dropped: u64,
}

impl SimulatedGantry {
    /// Simulated gantry at rest, each axis at its lower bound (or 0 when 0
    /// is inside the travel).
    pub fn new(
        config: &GantryConfig,
        registry: Arc<SignalRegistry>,
        endpoint: LoopbackEndpoint,
        params: SimulationParams,
    ) -> Self {
        let axes = config
            .axes
            .iter()
            .map(|a| {
                let bounds = AxisBounds::from(a);
                SimAxis {
                    name: a.name.clone(),
                    output: a.output.clone(),
                    encoders: a.encoders.clone(),
                    offset: a.offset,
                    bounds,
                    position: bounds.clamp(0.0),
                    velocity: 0.0,
                    commanded: 0.0,
                }
            })
            .collect();
        Self {
            registry,
            endpoint,
            axes,
            params,
            counts_per_m: config.control.counts_per_m,
            wire_per_m: config.control.wire_per_m,
            dropped: 0,
        }
    }

    /// Place `axis` at `position` [m], at rest.
    pub fn set_position(&mut self, axis: usize, position: f64) {
        if let Some(a) = self.axes.get_mut(axis) {
            a.position = a.bounds.clamp(position);
            a.velocity = 0.0;
        }
    }

    pub fn position(&self, axis: usize) -> Option<f64> {
        self.axes.get(axis).map(|a| a.position)
    }

    pub fn velocity(&self, axis: usize) -> Option<f64> {
        self.axes.get(axis).map(|a| a.velocity)
    }

    /// Commanded velocity last received for `axis` [m/s].
    pub fn commanded(&self, axis: usize) -> Option<f64> {
        self.axes.get(axis).map(|a| a.commanded)
    }

    /// Consume queued commands, advance physics by `dt` and publish sensor
    /// frames. Returns the number of frames published.
    pub fn step(&mut self, dt: Duration) -> Result<usize, TransportError> {
        self.consume_commands()?;
        let dt_s = dt.as_secs_f64();
        for axis in &mut self.axes {
            axis.update(dt_s, self.params.max_acceleration);
        }
        self.publish()
    }

    /// Publish sensor frames without advancing time.
    pub fn publish(&mut self) -> Result<usize, TransportError> {
        let mut frames: Vec<(String, SignalValue)> = Vec::with_capacity(16);
        for axis in &self.axes {
            let abs = to_counts((axis.position - axis.offset) * self.counts_per_m);
            let speed = to_counts(axis.velocity * self.counts_per_m);
            for &ch in &axis.encoders {
                frames.push((names::encoder_abs(ch), SignalValue::Int32(abs)));
                frames.push((names::encoder_speed(ch), SignalValue::Int32(speed)));
                frames.push((format!("encoder_ppr_{ch}"), SignalValue::Int32(ENCODER_PPR)));
            }
        }
        for (i, name) in [names::LASER_DISTANCE_0, names::LASER_DISTANCE_1]
            .into_iter()
            .enumerate()
            .take(AXIS_COUNT)
        {
            if let Some(axis) = self.axes.get(i) {
                let mm = to_counts(axis.position * 1000.0);
                frames.push((name.to_string(), SignalValue::Int32(mm)));
            }
        }
        frames.push((
            names::MAIN_CRANE_DRIVER_STATUS.to_string(),
            SignalValue::BoolSet(BoolSet::from_flags(&[true; 3])),
        ));

        let mut sent = 0;
        for (name, value) in frames {
            let Ok(descriptor) = self.registry.describe(&name) else {
                continue;
            };
            let frame = match encode(descriptor, value) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("sim: cannot encode {name}: {e}");
                    continue;
                }
            };
            match self.endpoint.sink.send(&frame) {
                Ok(()) => sent += 1,
                Err(TransportError::Full { .. }) => {
                    self.dropped += 1;
                    if self.dropped <= 10 || self.dropped % 1000 == 0 {
                        warn!("sim: outbound queue full, {} frames dropped", self.dropped);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(sent)
    }

    fn consume_commands(&mut self) -> Result<(), TransportError> {
        while let Some(frame) = self.endpoint.source.try_recv()? {
            let Ok(descriptor) = self.registry.describe_id(frame.id) else {
                continue;
            };
            let Some(axis) = self.axes.iter_mut().find(|a| a.output == descriptor.name) else {
                continue;
            };
            match decode(descriptor, frame.payload()) {
                Ok(SignalValue::Float64(wire)) if wire.is_finite() => {
                    axis.commanded = wire / self.wire_per_m;
                }
                Ok(other) => debug!("sim: ignoring {} = {other:?}", descriptor.name),
                Err(e) => debug!("sim: bad command frame: {e}"),
            }
        }
        Ok(())
    }

    /// Run on a background thread until `running` is cleared or the bus
    /// closes.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<Self>> {
        thread::Builder::new()
            .name("gantry-sim".into())
            .spawn(move || {
                info!("Simulated gantry running (step={}ms)", self.params.step.as_millis());
                let mut last = Instant::now();
                while running.load(Ordering::SeqCst) {
                    let start = Instant::now();
                    let dt = start.duration_since(last);
                    last = start;
                    if let Err(e) = self.step(dt) {
                        info!("Simulated gantry stopping: {e}");
                        break;
                    }
                    let elapsed = start.elapsed();
                    if elapsed < self.params.step {
                        thread::sleep(self.params.step - elapsed);
                    }
                }
                self
            })
    }
}

#[inline]
fn to_counts(value: f64) -> i32 {
    // `as` saturates at the i32 range.
    value.round() as i32
}
