//! Control target and mode state machine.
//!
//! ```text
//!   ┌──────────────┐  command{position}  ┌──────────────┐
//!   │ VelocityHold │ ─────────────────► │ PositionHold │
//!   │              │ ◄───────────────── │              │
//!   └──────────────┘  command{velocity}  └──────────────┘
//! ```
//!
//! The mode is the variant of the active [`ControlTarget`]. It changes only
//! when an external command arrives; there is no terminal state. A command
//! replaces the whole target under one lock, so the control cycle never
//! observes a half-written target. Targets with a non-finite component are
//! rejected and the previous target stays in force.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gantry_common::consts::AXIS_COUNT;

use crate::config::AxisConfig;
use crate::error::TargetError;

/// Which controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    VelocityHold,
    PositionHold,
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VelocityHold => write!(f, "velocity_hold"),
            Self::PositionHold => write!(f, "position_hold"),
        }
    }
}

/// Desired motion, per axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlTarget {
    /// Velocity [m/s].
    Velocity([f64; AXIS_COUNT]),
    /// Position [m].
    Position([f64; AXIS_COUNT]),
}

impl Default for ControlTarget {
    fn default() -> Self {
        Self::Velocity([0.0; AXIS_COUNT])
    }
}

impl ControlTarget {
    #[inline]
    pub fn mode(&self) -> ControlMode {
        match self {
            Self::Velocity(_) => ControlMode::VelocityHold,
            Self::Position(_) => ControlMode::PositionHold,
        }
    }

    /// Setpoint values regardless of mode.
    #[inline]
    pub fn values(&self) -> [f64; AXIS_COUNT] {
        match *self {
            Self::Velocity(v) | Self::Position(v) => v,
        }
    }
}

/// Command as received from outside.
///
/// When both fields are present, `position` wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GantryCommand {
    #[serde(default)]
    pub position: Option<[f64; AXIS_COUNT]>,
    #[serde(default)]
    pub velocity: Option<[f64; AXIS_COUNT]>,
}

impl GantryCommand {
    /// The target this command selects, if any.
    pub fn target(&self) -> Option<ControlTarget> {
        match (self.position, self.velocity) {
            (Some(p), Some(_)) => {
                debug!("command carries position and velocity, velocity ignored");
                Some(ControlTarget::Position(p))
            }
            (Some(p), None) => Some(ControlTarget::Position(p)),
            (None, Some(v)) => Some(ControlTarget::Velocity(v)),
            (None, None) => None,
        }
    }
}

/// Travel limits of one axis [m].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    /// No limits.
    pub const UNBOUNDED: Self = Self {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    #[inline]
    pub fn clamp(&self, position: f64) -> f64 {
        position.clamp(self.min, self.max)
    }
}

impl From<&AxisConfig> for AxisBounds {
    fn from(axis: &AxisConfig) -> Self {
        Self {
            min: axis.min_position,
            max: axis.max_position,
        }
    }
}

/// Shared, lock-protected control target.
///
/// Cloning yields another handle to the same target.
#[derive(Debug, Clone)]
pub struct TargetHandle {
    inner: Arc<Mutex<ControlTarget>>,
    bounds: [AxisBounds; AXIS_COUNT],
}

impl TargetHandle {
    /// Handle starting at zero velocity.
    pub fn new(bounds: [AxisBounds; AXIS_COUNT]) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ControlTarget::default())),
            bounds,
        }
    }

    /// Handle with bounds taken from axis configuration. Missing axes are
    /// left unbounded.
    pub fn from_axes(axes: &[AxisConfig]) -> Self {
        let mut bounds = [AxisBounds::UNBOUNDED; AXIS_COUNT];
        for (slot, axis) in bounds.iter_mut().zip(axes) {
            *slot = AxisBounds::from(axis);
        }
        Self::new(bounds)
    }

    /// Replace the target. Position targets are clamped into the axis
    /// bounds. Returns the target actually stored.
    pub fn set(&self, target: ControlTarget) -> Result<ControlTarget, TargetError> {
        if let Err(e) = check_finite(&target) {
            warn!("{e}; keeping previous target");
            return Err(e);
        }
        let target = self.clamp(target);
        let previous = {
            let mut guard = self.inner.lock();
            std::mem::replace(&mut *guard, target)
        };
        if previous.mode() != target.mode() {
            info!("Control mode {} → {}", previous.mode(), target.mode());
        }
        debug!(?target, "target updated");
        Ok(target)
    }

    /// Apply an external command. Empty commands are ignored.
    pub fn apply(&self, command: &GantryCommand) -> Result<Option<ControlTarget>, TargetError> {
        match command.target() {
            Some(target) => self.set(target).map(Some),
            None => {
                debug!("empty command ignored");
                Ok(None)
            }
        }
    }

    /// Current target.
    #[inline]
    pub fn snapshot(&self) -> ControlTarget {
        *self.inner.lock()
    }

    #[inline]
    pub fn mode(&self) -> ControlMode {
        self.snapshot().mode()
    }

    fn clamp(&self, target: ControlTarget) -> ControlTarget {
        let ControlTarget::Position(mut p) = target else {
            return target;
        };
        for (axis, (value, bounds)) in p.iter_mut().zip(&self.bounds).enumerate() {
            let clamped = bounds.clamp(*value);
            if clamped != *value {
                warn!(
                    axis,
                    requested = *value,
                    clamped,
                    "position target outside travel, clamped"
                );
                *value = clamped;
            }
        }
        ControlTarget::Position(p)
    }
}

fn check_finite(target: &ControlTarget) -> Result<(), TargetError> {
    match target.values().iter().position(|v| !v.is_finite()) {
        Some(axis) => Err(TargetError::NonFinite {
            mode: target.mode(),
            axis,
            value: target.values()[axis],
        }),
        None => Ok(()),
    }
}
