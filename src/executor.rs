use crate::constants::{colors, emojis, BULK_DELETE_LIMIT, EMBED_FIELD_LIMIT};
use crate::escalation::{format_duration, Action};
use crate::rest::DiscordApi;
use crate::store::{now_millis, Case, CaseLog, DecisionMethod, HistoryEntry};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Everything the executor needs to know about the offending message.
#[derive(Debug, Clone)]
pub struct Incident {
    /// Case `type`: `spam`, `slur`, `violation`, `bot`.
    pub kind: &'static str,
    pub title: String,
    pub method: DecisionMethod,
    pub ai_reason: Option<String>,
    pub guild_id: String,
    pub user_id: String,
    pub username: String,
    pub channel_id: String,
    pub message_id: String,
    pub content: String,
}

/// Performs moderation side effects. Each step is attempted on its own and
/// logged on failure; nothing is rolled back.
pub struct ActionExecutor {
    api: Arc<dyn DiscordApi>,
    cases: Arc<CaseLog>,
    staff_channel_id: String,
    warning_lifetime: Duration,
}

impl ActionExecutor {
    pub fn new(api: Arc<dyn DiscordApi>, cases: Arc<CaseLog>, staff_channel_id: &str, warning_lifetime: Duration) -> Self {
        Self { api, cases, staff_channel_id: staff_channel_id.to_string(), warning_lifetime }
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> bool {
        match self.api.delete_message(channel_id, message_id).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to delete message {} in {}: {:?}", message_id, channel_id, e);
                false
            }
        }
    }

    /// Deletes the messages behind `entries`, bulk-deleting per channel when
    /// a channel holds more than one. Returns how many were removed.
    pub async fn delete_entries(&self, entries: &[HistoryEntry]) -> usize {
        let mut by_channel: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for entry in entries {
            if let (Some(channel), Some(id)) = (entry.channel_id.as_deref(), entry.message_id.as_deref()) {
                let ids = by_channel.entry(channel).or_default();
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            }
        }

        let mut deleted = 0;
        for (channel, ids) in by_channel {
            for chunk in ids.chunks(BULK_DELETE_LIMIT) {
                if chunk.len() == 1 {
                    if self.delete_message(channel, &chunk[0]).await {
                        deleted += 1;
                    }
                    continue;
                }
                let count = chunk.len();
                match self.api.bulk_delete_messages(channel, chunk.to_vec()).await {
                    Ok(()) => deleted += count,
                    Err(e) => error!("Failed to bulk delete {} messages in {}: {:?}", count, channel, e),
                }
            }
        }
        deleted
    }

    /// Posts a warning that removes itself after the configured lifetime.
    pub async fn warn_in_channel(&self, channel_id: &str, content: &str) {
        if content.is_empty() {
            return;
        }
        let message_id = match self.api.send_message(channel_id, content).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to send warning in {}: {:?}", channel_id, e);
                return;
            }
        };

        let api = Arc::clone(&self.api);
        let channel_id = channel_id.to_string();
        let lifetime = self.warning_lifetime;
        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;
            if let Err(e) = api.delete_message(&channel_id, &message_id).await {
                warn!("Failed to remove warning {} in {}: {:?}", message_id, channel_id, e);
            }
        });
    }

    pub async fn timeout(&self, guild_id: &str, user_id: &str, duration: Duration, reason: &str) -> bool {
        let until = chrono::Utc::now()
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::minutes(1));
        let iso8601 = until.to_rfc3339();

        match self.api.timeout_member(guild_id, user_id, Some(&iso8601), reason).await {
            Ok(()) => {
                info!("Timed out {} for {} ({})", user_id, format_duration(duration), reason);
                true
            }
            Err(e) => {
                error!("Could not timeout {}: {:?}", user_id, e);
                false
            }
        }
    }

    pub async fn kick(&self, guild_id: &str, user_id: &str, reason: &str) -> bool {
        match self.api.kick_user(guild_id, user_id, reason).await {
            Ok(()) => true,
            Err(e) => {
                error!("Could not kick {}: {:?}", user_id, e);
                false
            }
        }
    }

    pub async fn notify_staff(&self, embed: Value) {
        if self.staff_channel_id.is_empty() {
            return;
        }
        if let Err(e) = self.api.send_embed(&self.staff_channel_id, embed).await {
            error!("Failed to notify staff channel {}: {:?}", self.staff_channel_id, e);
        }
    }

    pub async fn record_case(&self, incident: &Incident, action_taken: &str) {
        let channel_name = match self.api.get_channel_name(&incident.channel_id).await {
            Ok(name) => name,
            Err(e) => {
                warn!("Could not resolve channel name for {}: {:?}", incident.channel_id, e);
                incident.channel_id.clone()
            }
        };

        let case = Case {
            kind: incident.kind.to_string(),
            decision_method: incident.method,
            ai_reason: incident.ai_reason.clone(),
            user_id: incident.user_id.clone(),
            username: incident.username.clone(),
            channel_id: incident.channel_id.clone(),
            channel_name,
            message_content: incident.content.clone(),
            action_taken: action_taken.to_string(),
            timestamp: now_millis(),
        };
        let id = self.cases.append(case).await;
        info!("Recorded case #{} ({}) for {}", id, incident.kind, incident.username);
    }

    /// Carries out an escalation decision and returns the text stored as the
    /// case's `actionTaken`.
    ///
    /// Once the policy answers [`Action::StaffReview`] nothing is done to the
    /// member; staff only get the review notice.
    pub async fn apply(&self, action: &Action, incident: &Incident, warning: &str) -> String {
        if !action.is_punishment() {
            warn!("{} reached the ban threshold for {} violations", incident.username, incident.kind);
        }
        match action {
            Action::Warn { .. } => {
                self.warn_in_channel(&incident.channel_id, warning).await;
                action.describe()
            }
            Action::Timeout { duration, offense } => {
                self.warn_in_channel(&incident.channel_id, warning).await;
                let reason = format!("{} (offense {})", incident.title, offense);
                let applied = self.timeout(&incident.guild_id, &incident.user_id, *duration, &reason).await;
                let taken = if applied { action.describe() } else { format!("{} failed", action.describe()) };
                self.notify_staff(incident_embed(
                    incident,
                    colors::RED,
                    &format!("User <@{}> has been timed out", incident.user_id),
                    &taken,
                    &[],
                )).await;
                taken
            }
            Action::Kick { offense } => {
                let reason = format!("{} (kick {})", incident.title, offense);
                let applied = self.kick(&incident.guild_id, &incident.user_id, &reason).await;
                let taken = if applied { action.describe() } else { format!("{} failed", action.describe()) };
                self.notify_staff(incident_embed(
                    incident,
                    colors::RED,
                    &format!("User <@{}> has been kicked", incident.user_id),
                    &taken,
                    &[],
                )).await;
                taken
            }
            Action::StaffReview { total } => {
                self.notify_staff(incident_embed(
                    incident,
                    colors::ORANGE,
                    &format!(
                        "User <@{}> has reached {} violations. No automatic punishment was applied; a ban is recommended.",
                        incident.user_id, total
                    ),
                    &action.describe(),
                    &[],
                )).await;
                action.describe()
            }
        }
    }
}

/// Staff-channel summary of one incident.
pub fn incident_embed(
    incident: &Incident,
    color: u32,
    description: &str,
    action_taken: &str,
    extra: &[(&str, String)],
) -> Value {
    let mut fields = vec![
        json!({ "name": "User", "value": format!("{} (<@{}>)", incident.username, incident.user_id) }),
        json!({ "name": "Channel", "value": format!("<#{}>", incident.channel_id) }),
        json!({ "name": "Content", "value": clip(non_empty(&incident.content), EMBED_FIELD_LIMIT) }),
        json!({ "name": "Action Taken", "value": clip(action_taken, EMBED_FIELD_LIMIT) }),
    ];
    if let Some(reason) = &incident.ai_reason {
        fields.push(json!({ "name": "AI Detection", "value": clip(reason, EMBED_FIELD_LIMIT) }));
    }
    for (name, value) in extra {
        fields.push(json!({ "name": name, "value": clip(value, EMBED_FIELD_LIMIT) }));
    }
    if !incident.message_id.is_empty() {
        fields.push(json!({
            "name": "Message Link",
            "value": format!(
                "[Click to view message](https://discord.com/channels/{}/{}/{})",
                incident.guild_id, incident.channel_id, incident.message_id
            )
        }));
    }

    json!({
        "title": format!("{} {}", emojis::WARNING, incident.title),
        "color": color,
        "description": description,
        "fields": fields,
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

fn non_empty(s: &str) -> &str {
    if s.trim().is_empty() { "*(no text content)*" } else { s }
}

/// Truncates to at most `max` characters, marking the cut with an ellipsis.
pub fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
