//! Wire format spoken between the relay and its worker.
//!
//! Every frame is a JSON object with a `type` discriminator.

pub mod frames;
pub mod handshake;
pub mod names;

pub use frames::{EventData, OutboundFrame, WorkerCommand, WorkerEvent, WorkerMessage};
