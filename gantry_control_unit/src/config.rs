//! Control unit configuration.
//!
//! One TOML file, loaded through [`ConfigLoader`]. Every section has
//! defaults matching the deployed gantry, so an empty file is a valid
//! configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gantry_common::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
use gantry_common::consts::{
    AXIS_COUNT, COUNTS_PER_M, CYCLE_TIME_MS, LOWPASS_ALPHA_DEFAULT, STALE_THRESHOLD_DEFAULT,
    WIRE_PER_M,
};
use gantry_common::bus::signal::names;

/// Encoder channels one axis may average.
pub const MAX_ENCODERS_PER_AXIS: usize = 4;

// ─── Sections ───────────────────────────────────────────────────────

/// Loop timing and unit conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Control period [ms].
    pub cycle_time_ms: u64,
    /// Ticks after which an unrefreshed encoder entry is stale.
    pub stale_threshold: u64,
    /// Encoder counts per meter.
    pub counts_per_m: f64,
    /// Wire speed units per m/s.
    pub wire_per_m: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: CYCLE_TIME_MS,
            stale_threshold: STALE_THRESHOLD_DEFAULT,
            counts_per_m: COUNTS_PER_M,
            wire_per_m: WIRE_PER_M,
        }
    }
}

impl ControlConfig {
    /// Control period as a Duration.
    #[inline]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }
}

/// Position tracker gains.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Symmetric clamp on the integral accumulator [m·s].
    pub integral_limit: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.001,
            kd: 0.001,
            integral_limit: 10.0,
        }
    }
}

/// Velocity tracker smoothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LowPassConfig {
    /// Smoothing constant in (0, 1].
    pub alpha: f64,
}

impl Default for LowPassConfig {
    fn default() -> Self {
        Self {
            alpha: LOWPASS_ALPHA_DEFAULT,
        }
    }
}

/// Wiring and limits of one axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Axis label used in logs and reports.
    pub name: String,
    /// Added to the converted position [m].
    #[serde(default)]
    pub offset: f64,
    /// Encoder channels averaged for this axis.
    pub encoders: Vec<u8>,
    /// Float64 signal carrying the speed command.
    pub output: String,
    /// Lower position bound [m].
    pub min_position: f64,
    /// Upper position bound [m].
    pub max_position: f64,
}

fn default_axes() -> Vec<AxisConfig> {
    vec![
        AxisConfig {
            name: "x".to_string(),
            offset: 0.0,
            encoders: vec![0, 1],
            output: names::CONTROL_X_SPEED.to_string(),
            min_position: 0.0,
            max_position: 2.0,
        },
        AxisConfig {
            name: "y".to_string(),
            offset: 0.0,
            encoders: vec![2],
            output: names::CONTROL_Y_SPEED.to_string(),
            min_position: -1.0,
            max_position: 1.0,
        },
    ]
}

/// Startup readiness gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupConfig {
    /// Signals that must have been seen once before the loop starts.
    pub await_signals: Vec<String>,
    /// Upper bound on the wait [ms].
    pub await_timeout_ms: u64,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            await_signals: vec![
                names::LASER_DISTANCE_0.to_string(),
                names::LASER_DISTANCE_1.to_string(),
            ],
            await_timeout_ms: 5000,
        }
    }
}

impl StartupConfig {
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.await_timeout_ms)
    }
}

// ─── Top Level ──────────────────────────────────────────────────────

/// Complete control unit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GantryConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub pid: PidConfig,
    #[serde(default)]
    pub lowpass: LowPassConfig,
    #[serde(default = "default_axes")]
    pub axes: Vec<AxisConfig>,
    #[serde(default)]
    pub startup: StartupConfig,
}

impl Default for GantryConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            control: ControlConfig::default(),
            pid: PidConfig::default(),
            lowpass: LowPassConfig::default(),
            axes: default_axes(),
            startup: StartupConfig::default(),
        }
    }
}

impl Validate for GantryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let c = &self.control;
        if c.cycle_time_ms == 0 {
            return Err(ConfigError::invalid("control.cycle_time_ms must be > 0"));
        }
        if !(c.counts_per_m > 0.0) {
            return Err(ConfigError::invalid(format!(
                "control.counts_per_m must be > 0 (got {})",
                c.counts_per_m
            )));
        }
        if !c.wire_per_m.is_finite() || c.wire_per_m == 0.0 {
            return Err(ConfigError::invalid(format!(
                "control.wire_per_m must be finite and nonzero (got {})",
                c.wire_per_m
            )));
        }

        let a = self.lowpass.alpha;
        if !(a > 0.0 && a <= 1.0) {
            return Err(ConfigError::invalid(format!(
                "lowpass.alpha must be in (0, 1] (got {a})"
            )));
        }
        if !(self.pid.integral_limit >= 0.0) {
            return Err(ConfigError::invalid(format!(
                "pid.integral_limit must be >= 0 (got {})",
                self.pid.integral_limit
            )));
        }

        if self.axes.len() != AXIS_COUNT {
            return Err(ConfigError::invalid(format!(
                "expected {AXIS_COUNT} axes, found {}",
                self.axes.len()
            )));
        }
        for (i, axis) in self.axes.iter().enumerate() {
            if axis.encoders.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "axis '{}' has no encoders",
                    axis.name
                )));
            }
            if axis.encoders.len() > MAX_ENCODERS_PER_AXIS {
                return Err(ConfigError::invalid(format!(
                    "axis '{}' averages {} encoders (max {MAX_ENCODERS_PER_AXIS})",
                    axis.name,
                    axis.encoders.len()
                )));
            }
            if !(axis.min_position < axis.max_position) {
                return Err(ConfigError::invalid(format!(
                    "axis '{}': min_position {} must be below max_position {}",
                    axis.name, axis.min_position, axis.max_position
                )));
            }
            if self.axes[..i].iter().any(|other| other.name == axis.name) {
                return Err(ConfigError::invalid(format!(
                    "duplicate axis name '{}'",
                    axis.name
                )));
            }
            if self.axes[..i].iter().any(|other| other.output == axis.output) {
                return Err(ConfigError::invalid(format!(
                    "axes share output signal '{}'",
                    axis.output
                )));
            }
        }
        Ok(())
    }
}

impl GantryConfig {
    /// Render the effective configuration back to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Load and validate the control unit configuration.
pub fn load_config(path: &Path) -> Result<GantryConfig, ConfigError> {
    GantryConfig::load_validated(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_deployed_defaults() {
        let cfg = GantryConfig::from_toml("").unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.control.cycle_time_ms, 50);
        assert_eq!(cfg.control.counts_per_m, 5530.0);
        assert_eq!(cfg.control.wire_per_m, 37.0);
        assert_eq!(cfg.pid.kp, 1.0);
        assert_eq!(cfg.lowpass.alpha, 0.1);
        assert_eq!(cfg.axes[0].encoders, vec![0, 1]);
        assert_eq!(cfg.axes[1].output, "control_y_speed");
        assert_eq!(cfg.startup.await_signals.len(), 2);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = GantryConfig::from_toml("[pid]\nkp = 2.5\n").unwrap();
        assert_eq!(cfg.pid.kp, 2.5);
        assert_eq!(cfg.pid.ki, 0.001);
        assert_eq!(cfg.control.period(), Duration::from_millis(50));
    }

    #[test]
    fn rejects_bad_alpha() {
        let cfg = GantryConfig::from_toml("[lowpass]\nalpha = 0.0\n").unwrap();
        assert!(cfg.validate().unwrap_err().to_string().contains("alpha"));
        let cfg = GantryConfig::from_toml("[lowpass]\nalpha = 1.5\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_period_and_scale() {
        let cfg = GantryConfig::from_toml("[control]\ncycle_time_ms = 0\n").unwrap();
        assert!(cfg.validate().is_err());
        let cfg = GantryConfig::from_toml("[control]\ncounts_per_m = -1.0\n").unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_inverted_bounds_and_empty_encoders() {
        let mut cfg = GantryConfig::default();
        cfg.axes[0].min_position = 3.0;
        assert!(cfg.validate().unwrap_err().to_string().contains("min_position"));

        let mut cfg = GantryConfig::default();
        cfg.axes[1].encoders.clear();
        assert!(cfg.validate().unwrap_err().to_string().contains("no encoders"));
    }

    #[test]
    fn rejects_wrong_axis_count() {
        let mut cfg = GantryConfig::default();
        cfg.axes.pop();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_shared_output() {
        let mut cfg = GantryConfig::default();
        cfg.axes[1].output = cfg.axes[0].output.clone();
        assert!(cfg.validate().unwrap_err().to_string().contains("output"));
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let mut cfg = GantryConfig::default();
        cfg.pid.kp = 3.0;
        let text = cfg.to_toml().unwrap();
        let back = GantryConfig::from_toml(&text).unwrap();
        assert_eq!(back.pid.kp, 3.0);
        assert_eq!(back.axes.len(), 2);
    }
}
