//! Gantry Common Library
//!
//! Shared protocol definitions and configuration loading for the gantry
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`bus`] - Signal table, registry, wire codec, frames and transport seam
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use gantry_common::bus::{codec, SignalRegistry, SignalValue};
//!
//! let registry = SignalRegistry::canonical().unwrap();
//! let speed = registry.describe("control_x_speed").unwrap();
//! let frame = codec::encode(speed, SignalValue::Float64(1.5)).unwrap();
//! assert_eq!(frame.id, 0x01);
//! assert_eq!(frame.len(), 8);
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod prelude;
