//! Test doubles shared by the unit tests.

use crate::classifier::provider::CompletionProvider;
use crate::classifier::AiClassifier;
use crate::config::Settings;
use crate::models::Message;
use crate::rest::DiscordApi;
use crate::state::AppState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send { channel_id: String, content: String },
    Embed { channel_id: String, embed: Value },
    Delete { channel_id: String, message_id: String },
    BulkDelete { channel_id: String, ids: Vec<String> },
    Timeout { guild_id: String, user_id: String, until: Option<String> },
    Kick { guild_id: String, user_id: String },
    Callback { interaction_id: String, body: Value },
}

/// Records every Discord call instead of performing it.
#[derive(Default)]
pub struct FakeDiscord {
    calls: Mutex<Vec<Call>>,
    sent: AtomicUsize,
    fail_timeouts: bool,
    messages: Mutex<HashMap<String, String>>,
}

impl FakeDiscord {
    pub fn failing_timeouts() -> Self {
        Self { fail_timeouts: true, ..Self::default() }
    }

    /// Makes `get_message_content` answer for `message_id`.
    pub fn with_message(self, message_id: &str, content: &str) -> Self {
        self.messages.lock().unwrap().insert(message_id.to_string(), content.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Whether any timeout or kick reached Discord.
    pub fn punished(&self) -> bool {
        self.calls().iter().any(|c| matches!(c, Call::Timeout { .. } | Call::Kick { .. }))
    }

    pub fn embeds(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Embed { embed, .. } => Some(embed),
                _ => None,
            })
            .collect()
    }

    pub fn callbacks(&self) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Callback { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DiscordApi for FakeDiscord {
    async fn send_message(&self, channel_id: &str, content: &str) -> anyhow::Result<String> {
        self.record(Call::Send { channel_id: channel_id.into(), content: content.into() });
        let n = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("sent-{}", n))
    }

    async fn send_embed(&self, channel_id: &str, embed: Value) -> anyhow::Result<()> {
        self.record(Call::Embed { channel_id: channel_id.into(), embed });
        Ok(())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> anyhow::Result<()> {
        self.record(Call::Delete { channel_id: channel_id.into(), message_id: message_id.into() });
        Ok(())
    }

    async fn bulk_delete_messages(&self, channel_id: &str, messages: Vec<String>) -> anyhow::Result<()> {
        self.record(Call::BulkDelete { channel_id: channel_id.into(), ids: messages });
        Ok(())
    }

    async fn timeout_member(&self, guild_id: &str, user_id: &str, until: Option<&str>, _reason: &str) -> anyhow::Result<()> {
        if self.fail_timeouts {
            anyhow::bail!("Discord API error 403 Forbidden: Missing Permissions");
        }
        self.record(Call::Timeout {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
            until: until.map(str::to_string),
        });
        Ok(())
    }

    async fn kick_user(&self, guild_id: &str, user_id: &str, _reason: &str) -> anyhow::Result<()> {
        self.record(Call::Kick { guild_id: guild_id.into(), user_id: user_id.into() });
        Ok(())
    }

    async fn get_channel_name(&self, channel_id: &str) -> anyhow::Result<String> {
        Ok(format!("channel-{}", channel_id))
    }

    async fn get_message_content(&self, _channel_id: &str, message_id: &str) -> anyhow::Result<String> {
        self.messages
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Discord API error 404 Not Found: Unknown Message"))
    }

    async fn interaction_callback(&self, interaction_id: &str, _token: &str, body: Value) -> anyhow::Result<()> {
        self.record(Call::Callback { interaction_id: interaction_id.into(), body });
        Ok(())
    }
}

/// Completion provider that always answers with the same reply.
pub struct Canned(pub String);

#[async_trait]
impl CompletionProvider for Canned {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }
}

pub fn settings() -> Settings {
    let mut s = Settings::from_json(r#"{
        "staffRoleId": "staff-role",
        "staffChannelId": "staff",
        "rules": ["No slurs", "No advertising"],
        "warningDeleteAfter": 10,
        "violation": { "racialSlurs": ["badword"] }
    }"#)
    .unwrap();
    s.filters.suspect = true;
    s.filters.bots = true;
    s
}

pub async fn app_state(
    settings: Settings,
    fake: &Arc<FakeDiscord>,
    ai_reply: Option<&str>,
) -> (Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ai = ai_reply.map(|r| AiClassifier::new(Box::new(Canned(r.to_string())), &settings.rules));
    let api: Arc<dyn DiscordApi> = fake.clone();
    let state = AppState::build(settings, api, ai, dir.path()).await.unwrap();
    (Arc::new(state), dir)
}

/// Guild message in channel `c` of guild `g` from `user_id`.
pub fn message(id: &str, user_id: &str, content: &str, roles: &[&str]) -> Message {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "guild_id": "g",
        "channel_id": "c",
        "author": { "id": user_id, "username": format!("user{}", user_id), "discriminator": "0" },
        "content": content,
        "member": { "roles": roles }
    }))
    .unwrap()
}
