use figment::{
    providers::{Env, Format, Toml},
    value::{Uncased, UncasedStr},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_WORKER_PORT: u16 = 8080;
pub const DEFAULT_ADMIN_PORT: u16 = 8000;
pub const DEFAULT_COMMAND_PREFIX: &str = "!";
pub const CHUNK_LIMIT: usize = 2000; // characters per chat message
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024; // 1 MB hard cap per worker frame
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64; // frames queued for the worker socket

/// Bare variable names honoured for compatibility with `.env`-style deployments.
const LEGACY_ENV_KEYS: [&str; 4] = ["DISCORD_TOKEN", "OWNER_ID", "GUILD_ID", "TESTING_CHANNEL_ID"];

/// Top-level config (relay.toml + legacy env + RELAY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener the worker process connects to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_worker_port")]
    pub port: u16,
    /// Attach an advisory `new_task` flag to forwarded messages.
    #[serde(default)]
    pub track_active_task_per_destination: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: DEFAULT_WORKER_PORT,
            track_active_task_per_destination: false,
        }
    }
}

/// Raw Discord section. Every identifier is optional here so that
/// [`DiscordConfig::resolve`] can report all missing values at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub bot_token: Option<String>,
    /// Only this user may run `/shutdown`.
    pub owner_id: Option<u64>,
    /// Guild that slash commands are registered to.
    pub guild_id: Option<u64>,
    /// The channel whose messages are relayed to the worker.
    pub channel_id: Option<u64>,
    /// Also relay direct messages from the owner.
    #[serde(default)]
    pub dm_allowed: bool,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            owner_id: None,
            guild_id: None,
            channel_id: None,
            dm_allowed: false,
            command_prefix: default_command_prefix(),
        }
    }
}

/// Discord settings after validation: every required identifier is present.
#[derive(Debug, Clone)]
pub struct DiscordSettings {
    pub bot_token: String,
    pub owner_id: u64,
    pub guild_id: u64,
    pub channel_id: u64,
    pub dm_allowed: bool,
    pub command_prefix: String,
}

impl DiscordConfig {
    /// Check that every required identifier is set and non-zero.
    pub fn resolve(&self) -> crate::error::Result<DiscordSettings> {
        let mut missing = Vec::new();

        let bot_token = self
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if bot_token.is_none() {
            missing.push("discord.bot_token");
        }

        let mut id = |value: Option<u64>, name: &'static str| {
            let v = value.filter(|v| *v != 0);
            if v.is_none() {
                missing.push(name);
            }
            v.unwrap_or_default()
        };
        let owner_id = id(self.owner_id, "discord.owner_id");
        let guild_id = id(self.guild_id, "discord.guild_id");
        let channel_id = id(self.channel_id, "discord.channel_id");

        if !missing.is_empty() {
            return Err(crate::error::RelayError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        Ok(DiscordSettings {
            bot_token: bot_token.unwrap_or_default().to_string(),
            owner_id,
            guild_id,
            channel_id,
            dm_allowed: self.dm_allowed,
            command_prefix: self.command_prefix.clone(),
        })
    }
}

/// Local admin UI with raw command/response logs on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_admin_port")]
    pub port: u16,
    #[serde(default = "default_commands_file")]
    pub commands_file: String,
    #[serde(default = "default_responses_file")]
    pub responses_file: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_bind(),
            port: DEFAULT_ADMIN_PORT,
            commands_file: default_commands_file(),
            responses_file: default_responses_file(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_worker_port() -> u16 {
    DEFAULT_WORKER_PORT
}
fn default_admin_port() -> u16 {
    DEFAULT_ADMIN_PORT
}
fn default_command_prefix() -> String {
    DEFAULT_COMMAND_PREFIX.to_string()
}
fn default_commands_file() -> String {
    "commands.json".to_string()
}
fn default_responses_file() -> String {
    "responses.json".to_string()
}

impl RelayConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Sources, later ones winning:
    ///   1. Explicit path argument, else ~/.relay/relay.toml
    ///   2. DISCORD_TOKEN / OWNER_ID / GUILD_ID / TESTING_CHANNEL_ID
    ///   3. RELAY_* (nested with `__`, e.g. RELAY_WORKER__PORT)
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::raw().only(&LEGACY_ENV_KEYS).map(legacy_env_key))
            .merge(Env::prefixed("RELAY_").split("__"))
    }

    /// Validate everything the relay cannot start without.
    pub fn validate(&self) -> crate::error::Result<DiscordSettings> {
        self.discord.resolve()
    }
}

fn legacy_env_key(key: &UncasedStr) -> Uncased<'_> {
    let mapped = if key == "DISCORD_TOKEN" {
        "discord.bot_token"
    } else if key == "OWNER_ID" {
        "discord.owner_id"
    } else if key == "GUILD_ID" {
        "discord.guild_id"
    } else if key == "TESTING_CHANNEL_ID" {
        "discord.channel_id"
    } else {
        return key.as_str().into();
    };
    mapped.into()
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.relay/relay.toml", home)
}
