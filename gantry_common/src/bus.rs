//! Bus protocol shared by both ends of the gantry bus.
//!
//! ```text
//!  inbound:  BusFrame ──► SignalRegistry::describe_id ──► codec::decode ──► SignalValue
//!  outbound: SignalValue ──► SignalRegistry::describe ──► codec::encode ──► BusFrame
//! ```
//!
//! The signal table in [`signal::CANONICAL_SIGNALS`] is a compatibility
//! contract with the remote microcontrollers: ids, names and wire types must
//! match the firmware exactly.

pub mod codec;
pub mod frame;
pub mod registry;
pub mod signal;
pub mod transport;

pub use codec::CodecError;
pub use frame::{BusFrame, FrameError};
pub use registry::{RegistryError, SignalKey, SignalRegistry};
pub use signal::{BoolSet, SignalDescriptor, SignalValue, WireType};
pub use transport::{
    FrameSink, FrameSource, LoopbackEndpoint, LoopbackSink, LoopbackSource, TransportError,
};
