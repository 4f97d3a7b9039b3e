//! # Gantry Control Unit Library
//!
//! Closes the position/velocity loop of a two-axis gantry over a shared
//! frame bus. Remote microcontrollers publish encoder and sensor frames; the
//! control unit folds them into a [`state::BusStateTable`], derives physical
//! axis state every period, runs the active controller and emits one speed
//! frame per ready axis.
//!
//! ## Threads
//!
//! | Thread | Module | Work |
//! |--------|--------|------|
//! | inbound | [`inbound`] | transport → decode → state table |
//! | control | [`cycle`] | state table → controller → transport |
//! | command | caller | [`command::TargetHandle::set`] |
//!
//! [`runtime::GantryRuntime`] owns the first two and joins them on shutdown.

pub mod command;
pub mod config;
pub mod context;
pub mod control;
pub mod cycle;
pub mod error;
pub mod inbound;
pub mod report;
pub mod runtime;
pub mod sim;
pub mod state;
