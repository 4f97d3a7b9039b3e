//! PID position tracker.
//!
//! Backward Euler integral with a symmetric clamp, raw (unfiltered)
//! difference for the derivative. Zero Ki disables the integral; zero Kd
//! disables the derivative.

use gantry_common::consts::AXIS_COUNT;

use super::Controller;
use crate::config::PidConfig;

/// Per-axis PID memory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Integral accumulator [m·s].
    pub integral: f64,
    /// Position error of the previous call [m].
    pub prev_error: f64,
}

impl PidState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// PID gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Symmetric clamp on `integral` (0 = integral pinned at zero).
    pub integral_limit: f64,
}

impl From<PidConfig> for PidGains {
    fn from(c: PidConfig) -> Self {
        Self {
            kp: c.kp,
            ki: c.ki,
            kd: c.kd,
            integral_limit: c.integral_limit,
        }
    }
}

/// One PID step.
///
/// - `error`: target − actual [m]
/// - `dt`: time since the previous step [s]
///
/// Returns the commanded velocity [m/s]. Non-positive `dt` returns 0 and
/// leaves `state` untouched.
#[inline]
pub fn pid_compute(state: &mut PidState, gains: &PidGains, error: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    // ── P term ──────────────────────────────────────────────
    let p_term = gains.kp * error;

    // ── I term (backward Euler, clamped) ────────────────────
    let limit = gains.integral_limit.abs();
    state.integral = (state.integral + error * dt).clamp(-limit, limit);
    let i_term = gains.ki * state.integral;

    // ── D term ──────────────────────────────────────────────
    let d_term = gains.kd * (error - state.prev_error) / dt;

    state.prev_error = error;
    p_term + i_term + d_term
}

/// Two-axis PID controller.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    state: [PidState; AXIS_COUNT],
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            state: [PidState::default(); AXIS_COUNT],
        }
    }

    #[inline]
    pub fn gains(&self) -> &PidGains {
        &self.gains
    }

    /// Memory of `axis`.
    #[inline]
    pub fn state(&self, axis: usize) -> PidState {
        self.state[axis]
    }
}

impl Controller for PidController {
    fn compute_axis(&mut self, axis: usize, current: f64, target: f64, dt: f64) -> f64 {
        let Some(state) = self.state.get_mut(axis) else {
            return 0.0;
        };
        pid_compute(state, &self.gains, target - current, dt)
    }

    fn reset(&mut self) {
        self.state.iter_mut().for_each(PidState::reset);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
