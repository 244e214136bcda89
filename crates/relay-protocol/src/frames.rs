use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::names::{EVENT_MESSAGE, FRAME_EVENT};

/// Worker → Relay frame.
/// Wire: `{ "type": "event", "eventName": "message", "channelId": "123",
///          "data": { "taskId": "t1", "message": { "say": "...", "text": "...", "partial": true } } }`
///
/// Every field except `type` is optional so that unrelated frames still parse
/// and can be filtered out by name instead of being rejected as malformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEvent {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    #[serde(
        rename = "channelId",
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub data: EventData,
}

impl WorkerEvent {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// True for `type == "event"` frames named `message`.
    pub fn is_message(&self) -> bool {
        self.frame_type == FRAME_EVENT && self.event_name == EVENT_MESSAGE
    }

    pub fn task_id(&self) -> Option<&str> {
        self.data.task_id.as_deref().filter(|t| !t.is_empty())
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref().filter(|c| !c.is_empty())
    }

    pub fn message(&self) -> Option<&WorkerMessage> {
        self.data.message.as_ref()
    }

    /// A missing `partial` flag means the event is final.
    pub fn is_partial(&self) -> bool {
        self.message().and_then(|m| m.partial).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventData {
    #[serde(
        rename = "taskId",
        default,
        deserialize_with = "opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<WorkerMessage>,
}

/// The worker's chat message. Either `say` (a status category) or `ask`
/// (an interactive prompt) is normally set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub say: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial: Option<bool>,
    /// Fields the relay does not interpret (`ts`, `images`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerMessage {
    pub fn is_empty(&self) -> bool {
        self.say.is_none()
            && self.ask.is_none()
            && self.text.is_none()
            && self.partial.is_none()
            && self.extra.is_empty()
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Relay → Worker frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame {
    /// Wire: `{ "type": "connection", "isActive": true }`
    Connection {
        #[serde(rename = "isActive")]
        is_active: bool,
    },
    /// Wire: `{ "type": "message", "content": "...", "channelId": "123" }`
    Message {
        content: String,
        #[serde(rename = "channelId")]
        channel_id: String,
        /// Advisory hint, only present when active-task tracking is on.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        new_task: Option<bool>,
    },
    /// Wire: `{ "type": "command", "command": "new", "channelId": "123" }`
    Command {
        command: WorkerCommand,
        #[serde(rename = "channelId")]
        channel_id: String,
    },
}

impl OutboundFrame {
    pub fn message(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Message {
            content: content.into(),
            channel_id: channel_id.into(),
            new_task: None,
        }
    }

    pub fn command(channel_id: impl Into<String>, command: WorkerCommand) -> Self {
        Self::Command {
            command,
            channel_id: channel_id.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerCommand {
    /// Start a fresh task context for the channel.
    New,
}

/// Accept identifiers sent either as strings or as bare JSON numbers.
fn opt_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
