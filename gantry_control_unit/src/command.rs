//! External command handling.
//!
//! - [`target`] - Control target, mode and the shared target handle
//! - [`input`] - Newline-delimited JSON command reader

pub mod input;
pub mod target;

pub use target::{AxisBounds, ControlMode, ControlTarget, GantryCommand, TargetHandle};
