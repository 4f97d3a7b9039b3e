//! Prelude module for common re-exports.
//!
//! ```rust
//! use gantry_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{AXIS_COUNT, CYCLE_TIME_MS, MAX_PAYLOAD};

// ─── Bus Protocol ───────────────────────────────────────────────────
pub use crate::bus::codec::{decode, encode};
pub use crate::bus::signal::names;
pub use crate::bus::{
    BoolSet, BusFrame, CodecError, FrameSink, FrameSource, RegistryError, SignalDescriptor,
    SignalRegistry, SignalValue, TransportError, WireType,
};

/// Default control period as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_millis(CYCLE_TIME_MS);
