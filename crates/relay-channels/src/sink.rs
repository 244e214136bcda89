use async_trait::async_trait;

use crate::error::ChannelError;

/// Outbound half of a chat platform: deliver text to a named destination.
///
/// Implementations must be `Send + Sync` so a single sink can be shared by
/// the relay and every connection task that dispatches through it.
#[async_trait]
pub trait ChatSink: Send + Sync {
    /// Stable lowercase identifier for the platform (e.g. `"discord"`).
    fn name(&self) -> &str;

    /// Deliver one message to `destination`.
    ///
    /// The caller is responsible for size limits; a sink sends exactly the
    /// text it is given as a single platform message. Returns once the
    /// platform has accepted the message, so sequential calls arrive in order.
    async fn send_text(&self, destination: &str, text: &str) -> Result<(), ChannelError>;
}
