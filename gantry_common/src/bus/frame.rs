//! Bus frame: a numeric id plus up to 8 payload bytes.

use heapless::Vec as FixedVec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MAX_PAYLOAD;

/// Fixed-capacity payload buffer. No heap allocation per frame.
pub type Payload = FixedVec<u8, MAX_PAYLOAD>;

/// Frame construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Payload longer than a bus frame can carry.
    #[error("payload of {len} bytes exceeds the {MAX_PAYLOAD}-byte frame limit")]
    PayloadTooLong { len: usize },
}

/// One message on the bus.
///
/// Produced by the transport on receipt or by the encoder before
/// transmission; not retained beyond one processing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusFrame {
    /// Signal identifier (fits in two bytes).
    pub id: u16,
    payload: Payload,
}

impl BusFrame {
    /// Build a frame, copying `data` into the fixed payload buffer.
    pub fn new(id: u16, data: &[u8]) -> Result<Self, FrameError> {
        let payload =
            Payload::from_slice(data).map_err(|_| FrameError::PayloadTooLong { len: data.len() })?;
        Ok(Self { id, payload })
    }

    /// Build a frame from an already-filled payload buffer.
    #[inline]
    pub fn from_payload(id: u16, payload: Payload) -> Self {
        Self { id, payload }
    }

    /// Payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length (the data length code on the wire).
    #[inline]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
