//! Wire codec: typed values ↔ payload bytes.
//!
//! Both ends of the bus use one canonical layout: little-endian two's
//! complement for `Int32`, little-endian IEEE-754 bit pattern for `Float64`,
//! one byte per flag for `BoolSet`. Conversions go through
//! `from_le_bytes` / `to_le_bytes`; nothing depends on host memory layout.

use thiserror::Error;

use super::frame::{BusFrame, FrameError, Payload};
use crate::consts::MAX_BOOL_SET;
use super::signal::{BoolSet, SignalDescriptor, SignalValue, WireType};

/// Encode/decode error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Supplied buffer shorter than the descriptor's byte length.
    #[error("signal '{name}' needs {expected} bytes, got {actual}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Value tag does not match the descriptor's wire type.
    #[error("signal '{name}' is {expected}, cannot encode a {actual} value")]
    TypeMismatch {
        name: String,
        expected: WireType,
        actual: &'static str,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Decode the first `descriptor.byte_length()` bytes of `bytes`.
///
/// Trailing bytes past the declared length are ignored.
pub fn decode(descriptor: &SignalDescriptor, bytes: &[u8]) -> Result<SignalValue, CodecError> {
    let len = descriptor.byte_length();
    let Some(raw) = bytes.get(..len) else {
        return Err(CodecError::LengthMismatch {
            name: descriptor.name.clone(),
            expected: len,
            actual: bytes.len(),
        });
    };

    Ok(match descriptor.wire_type {
        WireType::Int32 => SignalValue::Int32(i32::from_le_bytes(take_array(raw))),
        WireType::Float64 => SignalValue::Float64(f64::from_le_bytes(take_array(raw))),
        WireType::BoolSet(_) => {
            let mut flags = [false; MAX_BOOL_SET as usize];
            let n = raw.len().min(flags.len());
            for (flag, &byte) in flags.iter_mut().zip(raw) {
                *flag = byte != 0;
            }
            SignalValue::BoolSet(BoolSet::from_flags(&flags[..n]))
        }
    })
}

/// Encode `value` into a payload of exactly `descriptor.byte_length()` bytes.
pub fn encode_payload(
    descriptor: &SignalDescriptor,
    value: SignalValue,
) -> Result<Payload, CodecError> {
    if !value.matches(descriptor.wire_type) {
        return Err(CodecError::TypeMismatch {
            name: descriptor.name.clone(),
            expected: descriptor.wire_type,
            actual: value.kind(),
        });
    }

    let mut payload = Payload::new();
    let pushed = match value {
        SignalValue::Int32(v) => payload.extend_from_slice(&v.to_le_bytes()).map_err(drop),
        SignalValue::Float64(v) => payload.extend_from_slice(&v.to_le_bytes()).map_err(drop),
        SignalValue::BoolSet(set) => set
            .iter()
            .try_for_each(|on| payload.push(u8::from(on)).map_err(drop)),
    };
    pushed.map_err(|_| FrameError::PayloadTooLong {
        len: descriptor.byte_length(),
    })?;
    Ok(payload)
}

/// Encode `value` as a complete frame addressed to `descriptor.id`.
pub fn encode(descriptor: &SignalDescriptor, value: SignalValue) -> Result<BusFrame, CodecError> {
    let payload = encode_payload(descriptor, value)?;
    Ok(BusFrame::from_payload(descriptor.id, payload))
}

/// Copy a slice of known length into a fixed array.
#[inline]
fn take_array<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}
