use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::context::DiscordAppContext;
use crate::error::DiscordError;
use crate::handler::DiscordHandler;

/// Discord channel adapter.
///
/// Wraps a serenity `Client` and drives the gateway until `cancel` fires.
/// A dropped gateway is rebuilt after a short pause.
pub struct DiscordAdapter<C: DiscordAppContext + 'static> {
    ctx: Arc<C>,
}

impl<C: DiscordAppContext + 'static> DiscordAdapter<C> {
    pub fn new(ctx: Arc<C>) -> Self {
        Self { ctx }
    }

    /// Connect to Discord and run until `cancel` fires.
    ///
    /// Fails only when the client cannot be built (e.g. an unusable token).
    pub async fn run(self, cancel: CancellationToken) -> Result<(), DiscordError> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        loop {
            let mut client = self.build_client(intents).await?;

            let shards = Arc::clone(&client.shard_manager);
            let stop = cancel.clone();
            let watcher = tokio::spawn(async move {
                stop.cancelled().await;
                shards.shutdown_all().await;
            });

            info!("Discord: gateway connecting");
            let result = client.start().await;
            watcher.abort();

            if cancel.is_cancelled() {
                info!("Discord: gateway stopped");
                return Ok(());
            }

            match result {
                Err(e) => warn!(error = %e, "Discord: gateway error, reconnecting in 5s"),
                Ok(()) => info!("Discord: gateway stopped unexpectedly, reconnecting in 5s"),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_secs(5)) => {}
            }
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, DiscordError> {
        let token = self.ctx.discord().bot_token.as_str();
        if token.is_empty() {
            return Err(DiscordError::NoToken);
        }

        let handler = DiscordHandler {
            ctx: Arc::clone(&self.ctx),
        };

        Ok(Client::builder(token, intents).event_handler(handler).await?)
    }
}
