//! Event relay and consolidation engine.
//!
//! Worker events flow `Relay::on_event` → [`classifier`] → [`task_buffer`] →
//! [`dispatcher`]; chat input flows through the [`forwarder`] methods on
//! [`Relay`] to the live worker connection.

pub mod classifier;
pub mod dispatcher;
pub mod forwarder;
pub mod relay;
pub mod task_buffer;

pub use classifier::{classify, Classification, NormalizedMessage, Suggestion, Suppression};
pub use dispatcher::Dispatcher;
pub use relay::{Connection, Relay, RelayOptions};
pub use task_buffer::TaskBuffer;
