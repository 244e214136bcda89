use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::{Http, HttpError};
use serenity::model::id::ChannelId;

use relay_channels::{ChannelError, ChatSink};

/// Chat sink that posts plain text to Discord channels over REST.
///
/// Holds its own `Http` client so the relay can deliver messages whether or
/// not the gateway is currently connected.
pub struct DiscordSink {
    http: Arc<Http>,
}

impl DiscordSink {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl ChatSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send_text(&self, destination: &str, text: &str) -> Result<(), ChannelError> {
        let channel = parse_destination(destination)?;
        channel
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| classify_error(destination, e))
    }
}

/// Parse a destination string into a Discord channel id.
pub fn parse_destination(destination: &str) -> Result<ChannelId, ChannelError> {
    destination
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
        .ok_or_else(|| ChannelError::InvalidDestination(destination.to_string()))
}

fn classify_error(destination: &str, err: serenity::Error) -> ChannelError {
    match &err {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(resp))
            if resp.status_code.as_u16() == 404 =>
        {
            ChannelError::UnknownDestination(destination.to_string())
        }
        _ => ChannelError::SendFailed(err.to_string()),
    }
}
