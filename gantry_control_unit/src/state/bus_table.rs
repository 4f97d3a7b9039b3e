//! Bus state table: latest value per signal.
//!
//! One entry per registry descriptor, addressed by the registry's dense
//! index. Each entry sits behind its own lock so the inbound handler writing
//! one signal never blocks the control cycle reading another. Entries start
//! unknown, are overwritten in place and never removed.
//!
//! Freshness is measured in control ticks. The control cycle calls
//! [`BusStateTable::advance_tick`] once per period; every write records the
//! tick current at arrival.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use gantry_common::bus::codec::decode;
use gantry_common::bus::{BusFrame, SignalRegistry, SignalValue};

use crate::error::ProtocolError;

/// A decoded value and the tick it arrived in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: SignalValue,
    pub updated_tick: u64,
}

/// Shared table of the latest value of every registered signal.
#[derive(Debug)]
pub struct BusStateTable {
    registry: Arc<SignalRegistry>,
    entries: Vec<Mutex<Option<Sample>>>,
    tick: AtomicU64,
}

impl BusStateTable {
    /// Table with every entry unknown, at tick 0.
    pub fn new(registry: Arc<SignalRegistry>) -> Self {
        let entries = (0..registry.len()).map(|_| Mutex::new(None)).collect();
        Self {
            registry,
            entries,
            tick: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn registry(&self) -> &Arc<SignalRegistry> {
        &self.registry
    }

    // ─── Writes ─────────────────────────────────────────────────────

    /// Decode `frame` and store it. Returns the signal name.
    ///
    /// Unknown ids and short payloads are rejected without touching any
    /// entry.
    pub fn on_frame(&self, frame: &BusFrame) -> Result<&str, ProtocolError> {
        let Some(index) = self.registry.index_of_id(frame.id) else {
            return Err(ProtocolError::UnknownId {
                id: frame.id,
                len: frame.len(),
            });
        };
        let Some(descriptor) = self.registry.get(index) else {
            return Err(ProtocolError::UnknownId {
                id: frame.id,
                len: frame.len(),
            });
        };

        let value = decode(descriptor, frame.payload()).map_err(|_| {
            ProtocolError::LengthMismatch {
                id: frame.id,
                name: descriptor.name.clone(),
                expected: descriptor.byte_length(),
                actual: frame.len(),
            }
        })?;

        self.store_index(index, value);
        trace!(signal = %descriptor.name, ?value, "frame stored");
        Ok(descriptor.name.as_str())
    }

    /// Overwrite entry `index` with `value` at the current tick.
    /// Out-of-range indices are ignored.
    pub fn store_index(&self, index: usize, value: SignalValue) {
        if let Some(entry) = self.entries.get(index) {
            let updated_tick = self.current_tick();
            *entry.lock() = Some(Sample {
                value,
                updated_tick,
            });
        }
    }

    // ─── Reads ──────────────────────────────────────────────────────

    /// Latest value of `name`, or `None` if unknown or unregistered.
    #[inline]
    pub fn read(&self, name: &str) -> Option<SignalValue> {
        self.sample(name).map(|s| s.value)
    }

    #[inline]
    pub fn read_index(&self, index: usize) -> Option<SignalValue> {
        self.sample_index(index).map(|s| s.value)
    }

    /// Latest sample of `name` with its arrival tick.
    pub fn sample(&self, name: &str) -> Option<Sample> {
        self.registry
            .index_of(name)
            .and_then(|index| self.sample_index(index))
    }

    #[inline]
    pub fn sample_index(&self, index: usize) -> Option<Sample> {
        self.entries.get(index).and_then(|entry| *entry.lock())
    }

    /// Names from `names` that have never been received.
    pub fn missing<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|name| self.read(name).is_none())
            .map(String::as_str)
            .collect()
    }

    // ─── Freshness ──────────────────────────────────────────────────

    /// Move to the next tick. Returns the new tick.
    #[inline]
    pub fn advance_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::AcqRel) + 1
    }

    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    /// True if `name` is unknown or older than `threshold` ticks.
    pub fn is_stale(&self, name: &str, threshold: u64) -> bool {
        match self.registry.index_of(name) {
            Some(index) => self.is_stale_index(index, threshold),
            None => true,
        }
    }

    pub fn is_stale_index(&self, index: usize, threshold: u64) -> bool {
        match self.sample_index(index) {
            Some(s) => self.current_tick().saturating_sub(s.updated_tick) > threshold,
            None => true,
        }
    }
}
