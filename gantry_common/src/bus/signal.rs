//! Signal descriptors, wire types and the canonical signal table.

use std::fmt;

use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::consts::{MAX_BOOL_SET, MAX_PAYLOAD};

// ─── Wire Type ──────────────────────────────────────────────────────

/// Binary encoding of a signal payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    /// Signed 32-bit integer, little-endian.
    Int32,
    /// IEEE-754 double, little-endian.
    Float64,
    /// `n` independent booleans, one byte each (zero / nonzero).
    BoolSet(u8),
}

impl WireType {
    /// Payload length on the wire [bytes].
    #[inline]
    pub const fn byte_length(self) -> usize {
        match self {
            Self::Int32 => 4,
            Self::Float64 => 8,
            Self::BoolSet(n) => n as usize,
        }
    }

    /// True if the type fits a bus frame.
    pub const fn is_valid(self) -> bool {
        match self {
            Self::BoolSet(n) => n >= 1 && n <= MAX_BOOL_SET,
            _ => true,
        }
    }
}

const_assert!(WireType::Float64.byte_length() <= MAX_PAYLOAD);
const_assert!(WireType::BoolSet(MAX_BOOL_SET).byte_length() <= MAX_PAYLOAD);

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int32 => write!(f, "int32"),
            Self::Float64 => write!(f, "float64"),
            Self::BoolSet(n) => write!(f, "bool{n}"),
        }
    }
}

// ─── Boolean Set ────────────────────────────────────────────────────

/// A small packed set of independent booleans (up to 8).
///
/// Bits at or above `len` are always zero, so two sets compare equal
/// exactly when their widths and visible flags match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoolSet {
    len: u8,
    bits: u8,
}

impl BoolSet {
    /// Build a set from individual flags. Flags past the eighth are ignored.
    pub fn from_flags(flags: &[bool]) -> Self {
        let len = flags.len().min(MAX_BOOL_SET as usize);
        let bits = flags[..len]
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &on)| if on { acc | (1 << i) } else { acc });
        Self {
            len: len as u8,
            bits,
        }
    }

    /// Number of flags in the set.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Flag `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<bool> {
        (index < self.len()).then(|| self.bits & (1 << index) != 0)
    }

    /// Iterate the flags in wire order.
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len()).map(move |i| self.bits & (1 << i) != 0)
    }

    /// True if every flag is set.
    pub fn all(&self) -> bool {
        self.iter().all(|b| b)
    }
}

// ─── Signal Value ───────────────────────────────────────────────────

/// A decoded physical or status value. The tag follows the owning
/// descriptor's [`WireType`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SignalValue {
    Int32(i32),
    Float64(f64),
    BoolSet(BoolSet),
}

impl SignalValue {
    /// Short tag name, used in error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Int32(_) => "int32",
            Self::Float64(_) => "float64",
            Self::BoolSet(_) => "bool set",
        }
    }

    /// True if the value's tag is compatible with `wire_type`.
    pub fn matches(&self, wire_type: WireType) -> bool {
        match (self, wire_type) {
            (Self::Int32(_), WireType::Int32) | (Self::Float64(_), WireType::Float64) => true,
            (Self::BoolSet(set), WireType::BoolSet(n)) => set.len() == n as usize,
            _ => false,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Self::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool_set(&self) -> Option<BoolSet> {
        match *self {
            Self::BoolSet(v) => Some(v),
            _ => None,
        }
    }
}

// ─── Descriptor ─────────────────────────────────────────────────────

/// Static description of one bus signal.
///
/// The payload length is derived from the wire type, never stored, so the
/// two cannot disagree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalDescriptor {
    /// Bus frame identifier.
    pub id: u16,
    /// Unique signal name.
    pub name: String,
    /// Payload encoding.
    pub wire_type: WireType,
}

impl SignalDescriptor {
    pub fn new(id: u16, name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            id,
            name: name.into(),
            wire_type,
        }
    }

    /// Payload length on the wire [bytes].
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.wire_type.byte_length()
    }
}

impl fmt::Display for SignalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#x}, {})", self.name, self.id, self.wire_type)
    }
}

// ─── Canonical Table ────────────────────────────────────────────────

/// Signal names the control loop is wired to.
pub mod names {
    /// Commanded x speed [rad/s], float64.
    pub const CONTROL_X_SPEED: &str = "control_x_speed";
    /// Commanded y speed [rad/s], float64.
    pub const CONTROL_Y_SPEED: &str = "control_y_speed";
    /// Main crane driver status, bool×3.
    pub const MAIN_CRANE_DRIVER_STATUS: &str = "main_crane_driver_status";
    /// Laser distance sensors [mm], int32.
    pub const LASER_DISTANCE_0: &str = "laser_distance_0";
    pub const LASER_DISTANCE_1: &str = "laser_distance_1";

    /// Absolute encoder count of `channel`.
    pub fn encoder_abs(channel: u8) -> String {
        format!("encoder_abs_{channel}")
    }

    /// Encoder speed [counts/s] of `channel`.
    pub fn encoder_speed(channel: u8) -> String {
        format!("encoder_speed_{channel}")
    }
}

/// The deployed signal table: `(id, name, wire type)`.
///
/// Encoders: 2048 counts per revolution, 300 mm per revolution at the drum.
pub const CANONICAL_SIGNALS: &[(u16, &str, WireType)] = &[
    // Speed setpoints [rad/s]
    (0x01, "control_x_speed", WireType::Float64),
    (0x02, "control_y_speed", WireType::Float64),
    // Driver status
    (0x10, "main_crane_driver_status", WireType::BoolSet(3)),
    (0x20, "sub_crane_driver_status", WireType::Float64),
    // Speeds reported back by the drivers
    (0x11, "x_axis_actual_control_speed_0", WireType::Float64),
    (0x12, "x_axis_actual_control_speed_1", WireType::Float64),
    (0x13, "y_axis_actual_control_speed", WireType::Float64),
    (0x21, "y_axis_actual_control_speed_mirror", WireType::Float64),
    // Laser distance [mm]
    (0x101, "laser_distance_0", WireType::Int32),
    (0x111, "laser_distance_1", WireType::Int32),
    // Encoder 0
    (0x102, "encoder_ppr_0", WireType::Int32),
    (0x103, "encoder_inc_0", WireType::Int32),
    (0x104, "encoder_abs_0", WireType::Int32),
    (0x105, "encoder_speed_0", WireType::Int32),
    // Encoder 1
    (0x112, "encoder_ppr_1", WireType::Int32),
    (0x113, "encoder_inc_1", WireType::Int32),
    (0x114, "encoder_abs_1", WireType::Int32),
    (0x115, "encoder_speed_1", WireType::Int32),
    // Encoder 2
    (0x122, "encoder_ppr_2", WireType::Int32),
    (0x123, "encoder_inc_2", WireType::Int32),
    (0x124, "encoder_abs_2", WireType::Int32),
    (0x125, "encoder_speed_2", WireType::Int32),
];

/// The canonical table as owned descriptors.
pub fn canonical_descriptors() -> Vec<SignalDescriptor> {
    CANONICAL_SIGNALS
        .iter()
        .map(|&(id, name, wire_type)| SignalDescriptor::new(id, name, wire_type))
        .collect()
}
