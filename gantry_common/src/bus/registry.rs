//! Signal registry: id ↔ name ↔ descriptor lookup.
//!
//! Built once at startup from a descriptor list. Immutable after
//! construction. Lookups are O(1) `HashMap` hits; descriptors are also
//! addressable by their dense index so per-signal state can live in a `Vec`
//! next to the registry.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

use super::signal::{SignalDescriptor, WireType, canonical_descriptors};

/// Lookup key used in error reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKey {
    Id(u16),
    Name(String),
}

impl fmt::Display for SignalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id:#x}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Registry construction or lookup error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two descriptors share an id.
    #[error("duplicate signal id {id:#x} ('{first}' and '{second}')")]
    DuplicateId {
        id: u16,
        first: String,
        second: String,
    },

    /// Two descriptors share a name.
    #[error("duplicate signal name '{name}' (ids {first:#x} and {second:#x})")]
    DuplicateName { name: String, first: u16, second: u16 },

    /// Wire type cannot be carried by a bus frame.
    #[error("signal '{name}' has unsupported wire type {wire_type}")]
    InvalidWireType { name: String, wire_type: WireType },

    /// No descriptor matches the key.
    #[error("unknown signal {0}")]
    UnknownSignal(SignalKey),
}

/// Immutable id/name → descriptor table.
#[derive(Debug, Clone)]
pub struct SignalRegistry {
    descriptors: Vec<SignalDescriptor>,
    by_id: HashMap<u16, usize>,
    by_name: HashMap<String, usize>,
}

impl SignalRegistry {
    /// Build the registry, rejecting duplicate ids, duplicate names and
    /// wire types a frame cannot carry.
    pub fn new(descriptors: impl IntoIterator<Item = SignalDescriptor>) -> Result<Self, RegistryError> {
        let descriptors: Vec<SignalDescriptor> = descriptors.into_iter().collect();
        let mut by_id = HashMap::with_capacity(descriptors.len());
        let mut by_name = HashMap::with_capacity(descriptors.len());

        for (idx, d) in descriptors.iter().enumerate() {
            if !d.wire_type.is_valid() {
                return Err(RegistryError::InvalidWireType {
                    name: d.name.clone(),
                    wire_type: d.wire_type,
                });
            }
            if let Some(&prev) = by_id.get(&d.id) {
                let prev: &SignalDescriptor = &descriptors[prev];
                return Err(RegistryError::DuplicateId {
                    id: d.id,
                    first: prev.name.clone(),
                    second: d.name.clone(),
                });
            }
            if let Some(&prev) = by_name.get(&d.name) {
                let prev: &SignalDescriptor = &descriptors[prev];
                return Err(RegistryError::DuplicateName {
                    name: d.name.clone(),
                    first: prev.id,
                    second: d.id,
                });
            }
            by_id.insert(d.id, idx);
            by_name.insert(d.name.clone(), idx);
        }

        Ok(Self {
            descriptors,
            by_id,
            by_name,
        })
    }

    /// Registry holding the deployed signal table.
    pub fn canonical() -> Result<Self, RegistryError> {
        Self::new(canonical_descriptors())
    }

    /// Descriptor for a frame id.
    pub fn describe_id(&self, id: u16) -> Result<&SignalDescriptor, RegistryError> {
        self.index_of_id(id)
            .map(|idx| &self.descriptors[idx])
            .ok_or(RegistryError::UnknownSignal(SignalKey::Id(id)))
    }

    /// Descriptor for a signal name.
    pub fn describe(&self, name: &str) -> Result<&SignalDescriptor, RegistryError> {
        self.index_of(name)
            .map(|idx| &self.descriptors[idx])
            .ok_or_else(|| RegistryError::UnknownSignal(SignalKey::Name(name.to_string())))
    }

    /// Dense index of a signal name.
    #[inline]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Dense index of a frame id.
    #[inline]
    pub fn index_of_id(&self, id: u16) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Descriptor at a dense index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&SignalDescriptor> {
        self.descriptors.get(index)
    }

    /// Number of registered signals.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// All descriptors in index order.
    pub fn iter(&self) -> impl Iterator<Item = &SignalDescriptor> {
        self.descriptors.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(id: u16, name: &str, wire_type: WireType) -> SignalDescriptor {
        SignalDescriptor::new(id, name, wire_type)
    }

    #[test]
    fn canonical_registry_builds() {
        let reg = SignalRegistry::canonical().unwrap();
        assert_eq!(reg.len(), 22);
        let abs = reg.describe_id(0x104).unwrap();
        assert_eq!(abs.name, "encoder_abs_0");
        assert_eq!(abs.wire_type, WireType::Int32);
        assert_eq!(reg.describe("control_y_speed").unwrap().id, 0x02);
    }

    #[test]
    fn lookup_by_id_and_name_agree() {
        let reg = SignalRegistry::canonical().unwrap();
        for desc in reg.iter() {
            assert_eq!(reg.describe_id(desc.id).unwrap(), desc);
            assert_eq!(reg.describe(&desc.name).unwrap(), desc);
            assert_eq!(reg.index_of(&desc.name), reg.index_of_id(desc.id));
        }
    }

    #[test]
    fn unknown_lookups_fail() {
        let reg = SignalRegistry::canonical().unwrap();
        assert_eq!(
            reg.describe_id(0x7ff).unwrap_err(),
            RegistryError::UnknownSignal(SignalKey::Id(0x7ff))
        );
        let err = reg.describe("reset_encoder_0").unwrap_err();
        assert!(err.to_string().contains("'reset_encoder_0'"));
    }

    #[test]
    fn duplicate_id_rejected() {
        let err = SignalRegistry::new([
            d(0x01, "a", WireType::Int32),
            d(0x01, "b", WireType::Float64),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateId {
                id: 0x01,
                first: "a".into(),
                second: "b".into()
            }
        );
    }

    #[test]
    fn duplicate_name_rejected() {
        let err = SignalRegistry::new([
            d(0x01, "speed", WireType::Float64),
            d(0x02, "speed", WireType::Float64),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { ref name, .. } if name == "speed"));
        assert!(err.to_string().contains("speed"));
    }

    #[test]
    fn invalid_bool_width_rejected() {
        let err = SignalRegistry::new([d(0x10, "flags", WireType::BoolSet(0))]).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidWireType { .. }));
    }

    #[test]
    fn empty_registry_is_valid() {
        let reg = SignalRegistry::new(Vec::new()).unwrap();
        assert!(reg.is_empty());
        assert!(reg.describe_id(0x01).is_err());
    }
}
