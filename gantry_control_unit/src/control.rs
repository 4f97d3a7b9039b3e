//! Axis controllers.
//!
//! Two trackers share the [`Controller`] seam:
//! - [`lowpass::LowPassController`] eases the output toward a velocity target.
//! - [`pid::PidController`] drives the measured position toward a position target.
//!
//! [`ControllerBank`] owns one of each and dispatches on [`ControlMode`]. The
//! controller that is not selected is never called, so its memory stays
//! frozen until the mode selects it again. Switching modes does not reset
//! either controller.

pub mod lowpass;
pub mod pid;

use gantry_common::consts::AXIS_COUNT;

use crate::command::ControlMode;
use crate::config::GantryConfig;
use lowpass::LowPassController;
use pid::{PidController, PidGains};

/// A per-axis tracker producing a commanded velocity [m/s].
pub trait Controller {
    /// One step for `axis`.
    ///
    /// `current` is the measured quantity the controller tracks (position
    /// for PID; ignored by the low-pass tracker). `dt` must be strictly
    /// positive; otherwise 0 is returned and no state changes.
    fn compute_axis(&mut self, axis: usize, current: f64, target: f64, dt: f64) -> f64;

    /// One step for every axis.
    fn compute(
        &mut self,
        current: [f64; AXIS_COUNT],
        target: [f64; AXIS_COUNT],
        dt: f64,
    ) -> [f64; AXIS_COUNT] {
        let mut out = [0.0; AXIS_COUNT];
        for (axis, slot) in out.iter_mut().enumerate() {
            *slot = self.compute_axis(axis, current[axis], target[axis], dt);
        }
        out
    }

    /// Clear all internal memory.
    fn reset(&mut self);
}

/// Both trackers, selected by mode.
#[derive(Debug, Clone)]
pub struct ControllerBank {
    pub velocity: LowPassController,
    pub position: PidController,
}

impl ControllerBank {
    pub fn new(velocity: LowPassController, position: PidController) -> Self {
        Self { velocity, position }
    }

    /// Build both controllers from configuration.
    pub fn from_config(config: &GantryConfig) -> Self {
        Self::new(
            LowPassController::new(config.lowpass.alpha),
            PidController::new(PidGains::from(config.pid)),
        )
    }

    /// The controller serving `mode`.
    #[inline]
    pub fn select(&mut self, mode: ControlMode) -> &mut dyn Controller {
        match mode {
            ControlMode::VelocityHold => &mut self.velocity,
            ControlMode::PositionHold => &mut self.position,
        }
    }

    /// Reset both controllers.
    pub fn reset(&mut self) {
        self.velocity.reset();
        self.position.reset();
    }
}
