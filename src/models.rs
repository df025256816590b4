use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GatewayPayload {

    pub op: u8,

    pub d: Option<Value>,

    pub s: Option<u64>,

    pub t: Option<String>,
}

pub type Payload = GatewayPayload;

#[allow(dead_code)]
pub mod op {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RESUME: u8 = 6;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

pub mod intent {
    pub const GUILDS: u32             = 1 << 0;
    pub const GUILD_MESSAGES: u32     = 1 << 9;
    pub const MESSAGE_CONTENT: u32    = 1 << 15;
}

#[derive(Debug, Deserialize, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub discriminator: Option<String>,
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn avatar_url(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("https://cdn.discordapp.com/avatars/{}/{}.png", self.id, hash),
            None => "https://cdn.discordapp.com/embed/avatars/0.png".to_string(),
        }
    }

    /// `name#1234` for legacy accounts, plain username otherwise.
    pub fn tag(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if d != "0" && !d.is_empty() => format!("{}#{}", self.username, d),
            _ => self.username.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub guild_id: Option<String>,
    pub channel_id: String,
    pub author: User,
    #[serde(default)]
    pub content: String,
    /// Partial member, present on guild `MESSAGE_CREATE` dispatches.
    pub member: Option<Member>,
    pub message_reference: Option<MessageReference>,
    /// Filled by Discord when the message is a reply and the parent still exists.
    pub referenced_message: Option<Box<Message>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MessageReference {
    pub message_id: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyData {
    pub session_id: String,
    #[serde(rename = "v")]
    pub version: u8,
    pub user: User,
    pub application: PartialApplication,
}

#[derive(Debug, Deserialize)]
pub struct PartialApplication {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct Interaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<InteractionData>,
    pub guild_id: Option<String>,
    pub member: Option<Member>,
    pub user: Option<User>,
    pub token: String,
}

impl Interaction {
    pub fn invoker(&self) -> Option<&User> {
        self.member.as_ref().and_then(|m| m.user.as_ref()).or(self.user.as_ref())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Member {
    pub user: Option<User>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Member {
    pub fn has_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r == role_id)
    }
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    pub name: Option<String>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
    pub resolved: Option<ResolvedData>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    pub value: Option<Value>,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ResolvedData {
    #[serde(default)]
    pub users: HashMap<String, User>,
}

pub mod interaction_type {
    pub const PING: u8 = 1;
    pub const APPLICATION_COMMAND: u8 = 2;
}

pub mod option_type {
    pub const SUB_COMMAND: u8 = 1;
    pub const INTEGER: u8 = 4;
    pub const USER: u8 = 6;
}

pub mod callback_type {
    pub const PONG: u8 = 1;
    pub const CHANNEL_MESSAGE: u8 = 4;
}

pub const EPHEMERAL: u64 = 1 << 6;
