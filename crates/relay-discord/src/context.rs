//! What the Discord layer needs from the hosting application.

use std::sync::Arc;

use relay_core::config::DiscordSettings;
use relay_engine::Relay;

pub trait DiscordAppContext: Send + Sync {
    fn relay(&self) -> &Arc<Relay>;

    fn discord(&self) -> &DiscordSettings;

    /// Begin a clean process shutdown. Returns immediately; the host closes
    /// the worker connection and stops the gateway.
    fn request_shutdown(&self);
}
