//! First-order low-pass velocity tracker.
//!
//! `y[n] = y[n-1] + α · (target − y[n-1])`. The measured velocity is not
//! fed back; the output eases toward the commanded velocity.

use gantry_common::consts::AXIS_COUNT;

use super::Controller;

/// Per-axis filter memory.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowPassState {
    /// Previous output [m/s].
    pub output: f64,
}

impl LowPassState {
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Apply one sample through the filter.
#[inline]
pub fn lowpass_apply(state: &mut LowPassState, alpha: f64, target: f64) -> f64 {
    state.output += alpha * (target - state.output);
    state.output
}

/// Two-axis low-pass velocity tracker.
#[derive(Debug, Clone)]
pub struct LowPassController {
    alpha: f64,
    state: [LowPassState; AXIS_COUNT],
}

impl LowPassController {
    /// `alpha` in (0, 1]; 1 passes the target straight through.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            state: [LowPassState::default(); AXIS_COUNT],
        }
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn state(&self, axis: usize) -> LowPassState {
        self.state[axis]
    }
}

impl Controller for LowPassController {
    fn compute_axis(&mut self, axis: usize, _current: f64, target: f64, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        match self.state.get_mut(axis) {
            Some(state) => lowpass_apply(state, self.alpha, target),
            None => 0.0,
        }
    }

    fn reset(&mut self) {
        self.state.iter_mut().for_each(LowPassState::reset);
    }
}
