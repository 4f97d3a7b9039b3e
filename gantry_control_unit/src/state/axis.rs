//! Axis wiring and physical state.
//!
//! An axis averages one or more encoder channels. Position comes from the
//! absolute counts, velocity from the speed counts:
//!
//! ```text
//! position_m   = mean(encoder_abs_k)   / counts_per_m + offset
//! velocity_mps = mean(encoder_speed_k) / counts_per_m
//! ```

use heapless::Vec as FixedVec;
use serde::Serialize;
use thiserror::Error;

use gantry_common::bus::signal::names;
use gantry_common::bus::{SignalRegistry, SignalValue, WireType};
use gantry_common::config::ConfigError;

use crate::config::{AxisConfig, MAX_ENCODERS_PER_AXIS};
use crate::error::CycleError;
use crate::state::BusStateTable;

/// Physical state of one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AxisState {
    pub position_m: f64,
    pub velocity_mps: f64,
}

/// Why an axis cannot be controlled this tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotReady {
    #[error("'{0}' not yet received")]
    Unknown(String),
    #[error("'{0}' is stale")]
    Stale(String),
}

type Channels = FixedVec<usize, MAX_ENCODERS_PER_AXIS>;

/// An axis resolved against the registry: dense indices of every signal it
/// reads and writes.
#[derive(Debug, Clone)]
pub struct AxisWiring {
    pub name: String,
    pub offset: f64,
    abs: Channels,
    speed: Channels,
    output: usize,
}

impl AxisWiring {
    /// Resolve every signal `axis` is wired to. Fails naming the first
    /// signal that is missing or carries the wrong wire type.
    pub fn resolve(axis: &AxisConfig, registry: &SignalRegistry) -> Result<Self, CycleError> {
        let mut abs = Channels::new();
        let mut speed = Channels::new();

        for &ch in &axis.encoders {
            for (signal, list) in [
                (names::encoder_abs(ch), &mut abs),
                (names::encoder_speed(ch), &mut speed),
            ] {
                let index = resolve_signal(axis, registry, &signal, WireType::Int32)?;
                list.push(index).map_err(|_| {
                    CycleError::Config(ConfigError::invalid(format!(
                        "axis '{}' averages more than {MAX_ENCODERS_PER_AXIS} encoders",
                        axis.name
                    )))
                })?;
            }
        }
        let output = resolve_signal(axis, registry, &axis.output, WireType::Float64)?;

        Ok(Self {
            name: axis.name.clone(),
            offset: axis.offset,
            abs,
            speed,
            output,
        })
    }

    /// Dense index of the speed-command signal.
    #[inline]
    pub fn output_index(&self) -> usize {
        self.output
    }

    /// Derive physical state from the table.
    pub fn derive(
        &self,
        table: &BusStateTable,
        stale_threshold: u64,
        counts_per_m: f64,
    ) -> Result<AxisState, NotReady> {
        let abs = mean_counts(table, &self.abs, stale_threshold)?;
        let speed = mean_counts(table, &self.speed, stale_threshold)?;
        Ok(AxisState {
            position_m: abs / counts_per_m + self.offset,
            velocity_mps: speed / counts_per_m,
        })
    }
}

fn resolve_signal(
    axis: &AxisConfig,
    registry: &SignalRegistry,
    signal: &str,
    expected: WireType,
) -> Result<usize, CycleError> {
    let index = registry
        .index_of(signal)
        .ok_or_else(|| CycleError::MissingSignal {
            axis: axis.name.clone(),
            signal: signal.to_string(),
        })?;
    let actual = registry
        .get(index)
        .map(|d| d.wire_type)
        .ok_or_else(|| CycleError::MissingSignal {
            axis: axis.name.clone(),
            signal: signal.to_string(),
        })?;
    if actual != expected {
        return Err(CycleError::WrongWireType {
            axis: axis.name.clone(),
            signal: signal.to_string(),
            expected,
            actual,
        });
    }
    Ok(index)
}

fn mean_counts(table: &BusStateTable, indices: &[usize], threshold: u64) -> Result<f64, NotReady> {
    let mut sum = 0.0;
    for &index in indices {
        let name = || {
            table
                .registry()
                .get(index)
                .map(|d| d.name.clone())
                .unwrap_or_default()
        };
        let Some(sample) = table.sample_index(index) else {
            return Err(NotReady::Unknown(name()));
        };
        if table.is_stale_index(index, threshold) {
            return Err(NotReady::Stale(name()));
        }
        let SignalValue::Int32(counts) = sample.value else {
            return Err(NotReady::Unknown(name()));
        };
        sum += f64::from(counts);
    }
    Ok(sum / indices.len().max(1) as f64)
}
