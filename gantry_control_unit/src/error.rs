//! Error types for the control unit.
//!
//! Inbound protocol errors are per-frame and never stop the process.
//! Rejected targets leave the previous target in force.
//! [`CycleError`] covers startup wiring defects; the binary exits on them.

use std::io;

use thiserror::Error;

use gantry_common::bus::{RegistryError, WireType};
use gantry_common::config::ConfigError;

use crate::command::ControlMode;

/// Per-frame inbound failure. The frame is dropped, the table is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Frame id not present in the registry.
    #[error("unknown frame id {id:#x} ({len} bytes)")]
    UnknownId { id: u16, len: usize },

    /// Payload shorter than the signal's declared length.
    #[error("frame {id:#x} ('{name}') carries {actual} bytes, expected {expected}")]
    LengthMismatch {
        id: u16,
        name: String,
        expected: usize,
        actual: usize,
    },
}

/// Rejected control target. The previously stored target stays active.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TargetError {
    #[error("non-finite {mode} setpoint on axis {axis}: {value}")]
    NonFinite {
        mode: ControlMode,
        axis: usize,
        value: f64,
    },
}

/// Control-loop construction and runtime startup failure.
#[derive(Debug, Error)]
pub enum CycleError {
    /// A signal the loop reads or writes is absent from the registry.
    #[error("signal '{signal}' required by axis '{axis}' is not registered")]
    MissingSignal { axis: String, signal: String },

    /// A wired signal has the wrong wire type.
    #[error("signal '{signal}' is {actual}, axis '{axis}' needs {expected}")]
    WrongWireType {
        axis: String,
        signal: String,
        expected: WireType,
        actual: WireType,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Worker thread could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },
}
