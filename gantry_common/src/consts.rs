//! System-wide constants for the gantry workspace.
//!
//! Single source of truth for numeric limits and deployment defaults.

/// Maximum payload carried by one bus frame [bytes].
pub const MAX_PAYLOAD: usize = 8;

/// Maximum width of a boolean-set signal.
pub const MAX_BOOL_SET: u8 = 8;

/// Number of driven gantry axes (x, y).
pub const AXIS_COUNT: usize = 2;

/// Default control period in milliseconds (20 Hz).
pub const CYCLE_TIME_MS: u64 = 50;

/// Encoder counts per meter of travel (measured on the deployed gantry).
pub const COUNTS_PER_M: f64 = 5530.0;

/// Wire velocity units (rad/s at the motor) per meter/second of travel.
pub const WIRE_PER_M: f64 = 37.0;

/// Ticks after which an unrefreshed sensor entry is considered stale.
pub const STALE_THRESHOLD_DEFAULT: u64 = 10;

/// Default low-pass smoothing constant for the velocity tracker.
pub const LOWPASS_ALPHA_DEFAULT: f64 = 0.1;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gantry/gantry.toml";
