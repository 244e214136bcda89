//! Discord commands: `/new`, `/shutdown` and their `!` prefixed twins.
//!
//! Slash commands are registered to the configured guild in `ready()`.
//! Interactions are dispatched from `interaction_create` in the event handler.

use std::sync::Arc;

use serenity::builder::{CreateCommand, CreateInteractionResponse, CreateInteractionResponseMessage};
use serenity::http::Http;
use serenity::model::application::{Command, CommandInteraction};
use serenity::model::id::GuildId;
use serenity::prelude::Context;
use tracing::{info, warn};

use crate::context::DiscordAppContext;
use crate::error::DiscordError;

pub const NEW_TASK_STARTED: &str = "\u{1f680} New task started!";
pub const NEW_TASK_UNAVAILABLE: &str = "Cannot start a new task.";
pub const WRONG_CHANNEL: &str = "This command can only be used in the designated testing channel.";
pub const SHUTTING_DOWN: &str = "Shutting down...";
pub const OWNER_ONLY: &str = "Only the bot owner can do that.";

/// A relay command, however it was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    New,
    Shutdown,
}

impl RelayCommand {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "new" => Some(Self::New),
            "shutdown" => Some(Self::Shutdown),
            _ => None,
        }
    }
}

/// Recognise `!new` / `!shutdown` style messages. Anything else is chat text.
pub fn parse_bang(content: &str, prefix: &str) -> Option<RelayCommand> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.trim().strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let name = words.next()?;
    if words.next().is_some() {
        return None;
    }
    RelayCommand::from_name(&name.to_ascii_lowercase())
}

/// Register guild slash commands. Call from `ready()`.
pub async fn register_commands(ctx: &Context, guild_id: GuildId) {
    let commands = vec![
        CreateCommand::new("new").description("Starts a new task."),
        CreateCommand::new("shutdown").description("Shuts down the bot (Owner only)."),
    ];

    match guild_id.set_commands(&ctx.http, commands).await {
        Ok(cmds) => info!(guild = %guild_id, count = cmds.len(), "registered guild slash commands"),
        Err(e) => warn!(guild = %guild_id, error = %e, "failed to register guild commands"),
    }
}

/// Remove every application command from `guild_id` and globally.
pub async fn clear_commands(token: &str, guild_id: u64) -> Result<(), DiscordError> {
    let guild_id = GuildId::new(guild_id);
    let http = Http::new(token);
    let app = http.get_current_application_info().await?;
    http.set_application_id(app.id);

    guild_id.set_commands(&http, Vec::new()).await?;
    info!(guild = %guild_id, "cleared guild application commands");

    Command::set_global_commands(&http, Vec::new()).await?;
    info!("cleared global application commands");
    Ok(())
}

/// Dispatch a slash command interaction.
pub async fn handle_interaction<C: DiscordAppContext + 'static>(
    app: &Arc<C>,
    ctx: &Context,
    command: &CommandInteraction,
) {
    let Some(cmd) = RelayCommand::from_name(&command.data.name) else {
        respond_ephemeral(ctx, command, "Unknown command.").await;
        return;
    };

    let reply = run(app.as_ref(), cmd, command.channel_id.get(), command.user.id.get());
    respond_ephemeral(ctx, command, reply.text).await;

    if reply.shutdown {
        app.request_shutdown();
    }
}

/// Outcome of one command: what to tell the user, and whether to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub text: &'static str,
    pub shutdown: bool,
}

impl Reply {
    fn say(text: &'static str) -> Self {
        Self { text, shutdown: false }
    }
}

/// Execute a command on behalf of `user` in `channel`; returns the reply text.
///
/// `/shutdown` is only acknowledged here. The caller triggers the actual
/// shutdown after the reply is on its way.
pub fn run<C: DiscordAppContext + ?Sized>(
    app: &C,
    cmd: RelayCommand,
    channel: u64,
    user: u64,
) -> Reply {
    let settings = app.discord();
    match cmd {
        RelayCommand::New if channel != settings.channel_id => Reply::say(WRONG_CHANNEL),
        RelayCommand::New => {
            if app.relay().start_new_task(&channel.to_string()) {
                info!(channel, "new task requested from chat");
                Reply::say(NEW_TASK_STARTED)
            } else {
                Reply::say(NEW_TASK_UNAVAILABLE)
            }
        }
        RelayCommand::Shutdown if user != settings.owner_id => {
            warn!(user, "shutdown refused: not the owner");
            Reply::say(OWNER_ONLY)
        }
        RelayCommand::Shutdown => {
            info!(user, "shutdown requested from chat");
            Reply {
                text: SHUTTING_DOWN,
                shutdown: true,
            }
        }
    }
}

/// Send an ephemeral response to a slash command (only visible to the invoker).
pub async fn respond_ephemeral(ctx: &Context, command: &CommandInteraction, content: &str) {
    let _ = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use relay_channels::{ChannelError, ChatSink};
    use relay_core::config::DiscordSettings;
    use relay_engine::{Relay, RelayOptions};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct NullSink;

    #[async_trait]
    impl ChatSink for NullSink {
        fn name(&self) -> &str {
            "null"
        }

        async fn send_text(&self, _: &str, _: &str) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    struct TestApp {
        relay: Arc<Relay>,
        settings: DiscordSettings,
        stopped: AtomicBool,
    }

    impl TestApp {
        fn new() -> Self {
            Self {
                relay: Arc::new(Relay::new(Arc::new(NullSink), RelayOptions::default())),
                settings: DiscordSettings {
                    bot_token: "token".into(),
                    owner_id: 1,
                    guild_id: 2,
                    channel_id: 3,
                    dm_allowed: false,
                    command_prefix: "!".into(),
                },
                stopped: AtomicBool::new(false),
            }
        }
    }

    impl DiscordAppContext for TestApp {
        fn relay(&self) -> &Arc<Relay> {
            &self.relay
        }

        fn discord(&self) -> &DiscordSettings {
            &self.settings
        }

        fn request_shutdown(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn bang_commands_are_recognised() {
        assert_eq!(parse_bang("!new", "!"), Some(RelayCommand::New));
        assert_eq!(parse_bang("  !shutdown ", "!"), Some(RelayCommand::Shutdown));
        assert_eq!(parse_bang("!NEW", "!"), Some(RelayCommand::New));
        assert_eq!(parse_bang("?new", "?"), Some(RelayCommand::New));
    }

    #[test]
    fn other_text_is_not_a_command() {
        assert_eq!(parse_bang("new", "!"), None);
        assert_eq!(parse_bang("!new feature please", "!"), None);
        assert_eq!(parse_bang("!deploy", "!"), None);
        assert_eq!(parse_bang("!", "!"), None);
        assert_eq!(parse_bang("!new", ""), None);
    }

    #[tokio::test]
    async fn new_outside_relay_channel_is_refused() {
        let app = TestApp::new();
        assert_eq!(run(&app, RelayCommand::New, 99, 1).text, WRONG_CHANNEL);
    }

    #[tokio::test]
    async fn new_without_worker_reports_unavailable() {
        let app = TestApp::new();
        assert_eq!(run(&app, RelayCommand::New, 3, 1).text, NEW_TASK_UNAVAILABLE);
    }

    #[tokio::test]
    async fn new_with_worker_sends_command() {
        let app = TestApp::new();
        let mut conn = app.relay.accept();
        conn.outbound.recv().await.unwrap(); // handshake

        assert_eq!(run(&app, RelayCommand::New, 3, 7).text, NEW_TASK_STARTED);
        let frame = conn.outbound.recv().await.unwrap();
        assert!(frame.contains("\"command\":\"new\""));
        assert!(frame.contains("\"channelId\":\"3\""));
    }

    #[tokio::test]
    async fn shutdown_is_owner_only() {
        let app = TestApp::new();
        let refused = run(&app, RelayCommand::Shutdown, 3, 7);
        assert_eq!(refused.text, OWNER_ONLY);
        assert!(!refused.shutdown);

        let accepted = run(&app, RelayCommand::Shutdown, 3, 1);
        assert_eq!(accepted.text, SHUTTING_DOWN);
        assert!(accepted.shutdown);
        assert!(!app.stopped.load(Ordering::SeqCst), "run only acknowledges");
    }
}
