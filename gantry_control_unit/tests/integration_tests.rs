//! Integration tests for the gantry control unit.
//!
//! These tests drive the public API across modules: configuration files,
//! the state table fed through a transport, the control cycle and the
//! threaded runtime against the simulated gantry.

mod integration;
