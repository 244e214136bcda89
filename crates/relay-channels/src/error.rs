use thiserror::Error;

/// Errors that can occur while delivering to a chat platform.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The destination identifier is not valid for this platform.
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// The destination does not exist or the bot cannot see it.
    #[error("Unknown destination: {0}")]
    UnknownDestination(String),

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),
}
