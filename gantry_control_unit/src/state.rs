//! Sensor state.
//!
//! - [`bus_table`] - Latest decoded value of every signal, with arrival tick
//! - [`axis`] - Per-axis wiring and physical state derivation

pub mod axis;
pub mod bus_table;

pub use axis::{AxisState, AxisWiring, NotReady};
pub use bus_table::{BusStateTable, Sample};
