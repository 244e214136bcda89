use std::sync::Arc;

use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, info, warn};

use relay_core::config::DiscordSettings;

use crate::commands::{self, parse_bang, RelayCommand};
use crate::context::DiscordAppContext;

/// Serenity event handler wired to the relay.
pub struct DiscordHandler<C: DiscordAppContext + 'static> {
    pub ctx: Arc<C>,
}

/// Where an accepted chat message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The configured relay channel.
    RelayChannel,
    /// A direct message from the owner (only with `dm_allowed`).
    OwnerDm,
}

/// Decide whether a human message should reach the worker at all.
pub fn accept_origin(
    settings: &DiscordSettings,
    channel_id: u64,
    in_guild: bool,
    author_id: u64,
) -> Option<Origin> {
    if channel_id == settings.channel_id {
        Some(Origin::RelayChannel)
    } else if !in_guild && settings.dm_allowed && author_id == settings.owner_id {
        Some(Origin::OwnerDm)
    } else {
        None
    }
}

/// What an accepted chat message turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<'a> {
    Command(RelayCommand),
    /// Text forwarded to the worker exactly as typed.
    Text(&'a str),
}

/// Blank messages are dropped; bang commands are intercepted; anything else
/// keeps its original whitespace.
pub fn inbound<'a>(content: &'a str, prefix: &str) -> Option<Inbound<'a>> {
    if content.trim().is_empty() {
        return None;
    }
    Some(match parse_bang(content, prefix) {
        Some(cmd) => Inbound::Command(cmd),
        None => Inbound::Text(content),
    })
}

#[async_trait]
impl<C: DiscordAppContext + 'static> EventHandler for DiscordHandler<C> {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, id = %ready.user.id, "Discord bot connected");
        let guild = GuildId::new(self.ctx.discord().guild_id);
        commands::register_commands(&ctx, guild).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let settings = self.ctx.discord();
        let Some(origin) = accept_origin(
            settings,
            msg.channel_id.get(),
            msg.guild_id.is_some(),
            msg.author.id.get(),
        ) else {
            return;
        };

        let Some(inbound) = inbound(&msg.content, &settings.command_prefix) else {
            return;
        };

        info!(author = %msg.author.name, channel = %msg.channel_id, ?origin, "chat message");

        let content = match inbound {
            Inbound::Command(cmd) => {
                let reply = commands::run(
                    self.ctx.as_ref(),
                    cmd,
                    msg.channel_id.get(),
                    msg.author.id.get(),
                );
                if let Err(e) = msg.channel_id.say(&ctx.http, reply.text).await {
                    warn!(error = %e, "failed to acknowledge command");
                }
                if reply.shutdown {
                    self.ctx.request_shutdown();
                }
                return;
            }
            Inbound::Text(text) => text,
        };

        let destination = msg.channel_id.to_string();
        if !self.ctx.relay().forward(&destination, content) {
            debug!(channel = %destination, "message not forwarded, worker unavailable");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            commands::handle_interaction(&self.ctx, &ctx, &command).await;
        }
    }
}
