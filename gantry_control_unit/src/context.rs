//! Shared runtime context.
//!
//! One [`GantryContext`] per process, shared by `Arc` between the inbound
//! handler, the control cycle and command sources.

use std::sync::Arc;

use gantry_common::bus::{RegistryError, SignalRegistry};

use crate::command::TargetHandle;
use crate::config::GantryConfig;
use crate::state::BusStateTable;

#[derive(Debug)]
pub struct GantryContext {
    pub registry: Arc<SignalRegistry>,
    pub table: BusStateTable,
    pub target: TargetHandle,
}

impl GantryContext {
    /// Context over `registry`, with position bounds from `config`.
    pub fn new(registry: SignalRegistry, config: &GantryConfig) -> Arc<Self> {
        let registry = Arc::new(registry);
        Arc::new(Self {
            table: BusStateTable::new(Arc::clone(&registry)),
            target: TargetHandle::from_axes(&config.axes),
            registry,
        })
    }

    /// Context over the deployed signal table.
    pub fn canonical(config: &GantryConfig) -> Result<Arc<Self>, RegistryError> {
        Ok(Self::new(SignalRegistry::canonical()?, config))
    }
}
