use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use relay_core::config::{DiscordSettings, RelayConfig};
use relay_discord::{DiscordAdapter, DiscordSink};
use relay_engine::{Relay, RelayOptions};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod app;
mod http;
mod ws;

#[derive(Parser)]
#[command(
    name = "relay-gateway",
    version,
    about = "Relay between a Discord channel and a coding-agent worker"
)]
struct Cli {
    /// Config file (default: ~/.relay/relay.toml)
    #[arg(long, short, env = "RELAY_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Run the relay (default)
    Serve,
    /// Remove all guild and global slash commands, then exit
    ClearCommands,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_gateway=info,relay_engine=info,relay_discord=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = RelayConfig::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let discord = config.validate()?;
            serve(config, discord).await
        }
        Command::ClearCommands => clear_commands(&config).await,
    }
}

async fn serve(config: RelayConfig, discord: DiscordSettings) -> anyhow::Result<()> {
    let sink = Arc::new(DiscordSink::new(&discord.bot_token));
    let relay = Arc::new(Relay::new(
        sink,
        RelayOptions {
            track_active_task_per_destination: config.worker.track_active_task_per_destination,
            ..RelayOptions::default()
        },
    ));

    let shutdown = CancellationToken::new();
    let state = Arc::new(app::AppState::new(config, discord, relay, shutdown.clone()));

    // bind the worker listener first: a busy port is fatal before Discord connects
    let addr: SocketAddr = format!("{}:{}", state.config.worker.bind, state.config.worker.port)
        .parse()
        .context("invalid worker listen address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind worker listener on {addr}"))?;
    info!("relay gateway listening for worker on {}", addr);

    let router = app::build_router(Arc::clone(&state));
    let stop = shutdown.clone();
    let worker_server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(stop.cancelled_owned())
            .await
    });

    let admin_server = if state.config.admin.enabled {
        let admin = &state.config.admin;
        let addr: SocketAddr = format!("{}:{}", admin.bind, admin.port)
            .parse()
            .context("invalid admin listen address")?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot bind admin listener on {addr}"))?;
        info!("admin terminal at http://{}/", addr);

        let router = http::admin::build_router(Arc::new(http::admin::AdminState::from_config(admin)));
        let stop = shutdown.clone();
        Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        }))
    } else {
        None
    };

    let adapter = DiscordAdapter::new(Arc::clone(&state));
    let stop = shutdown.clone();
    let discord_task = tokio::spawn(async move {
        if let Err(e) = adapter.run(stop.clone()).await {
            error!(error = %e, "Discord adapter failed");
            stop.cancel();
        }
    });
    info!("Discord bot started");

    let stop = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                stop.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupt signal"),
        }
    });

    shutdown.cancelled().await;
    info!("shutting down");

    state.relay.shutdown().await;

    if let Ok(Err(e)) = worker_server.await {
        warn!(error = %e, "worker listener ended with error");
    }
    if let Some(server) = admin_server {
        if let Ok(Err(e)) = server.await {
            warn!(error = %e, "admin listener ended with error");
        }
    }
    let _ = discord_task.await;

    info!("relay gateway stopped");
    Ok(())
}

async fn clear_commands(config: &RelayConfig) -> anyhow::Result<()> {
    let token = config
        .discord
        .bot_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .context("discord.bot_token (DISCORD_TOKEN) must be set")?;
    let guild = config
        .discord
        .guild_id
        .filter(|g| *g != 0)
        .context("discord.guild_id (GUILD_ID) must be set")?;

    relay_discord::commands::clear_commands(token, guild).await?;
    info!("application commands cleared");
    Ok(())
}
