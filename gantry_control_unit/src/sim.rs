//! Simulated remote side of the bus.
//!
//! - [`gantry`] - Two-axis gantry answering speed commands with encoder,
//!   laser and driver-status frames

pub mod gantry;

pub use gantry::{SimulatedGantry, SimulationParams};
