use super::incident;
use crate::constants::colors;
use crate::escalation::format_duration;
use crate::executor::incident_embed;
use crate::models::Message;
use crate::state::AppState;
use crate::store::{now_millis, DecisionMethod, HistoryEntry};
use tracing::warn;

/// Tracks the message in the sender's window and, on a burst of repeated
/// content, times the sender out and removes the burst.
pub async fn check(state: &AppState, msg: &Message, guild_id: &str) {
    let now = now_millis();
    let entry = HistoryEntry::new(now, msg.content.clone()).with_message(&msg.channel_id, &msg.id);
    let window = state.spam.push(guild_id, &msg.author.id, entry).await;

    let matched: Vec<HistoryEntry> = match state.spam_rule.matches(&window, now) {
        Some(hit) => hit.into_iter().cloned().collect(),
        None => return,
    };
    state.spam.clear(guild_id, &msg.author.id).await;

    warn!(
        "Spam from {} ({}): {} messages in {}ms",
        msg.author.tag(),
        msg.author.id,
        matched.len(),
        state.spam_rule.window_ms
    );

    let executor = &state.executor;
    let duration = state.settings.timeout();
    let applied = executor.timeout(guild_id, &msg.author.id, duration, "Spam Detection").await;
    let deleted = executor.delete_entries(&matched).await;

    let action_taken = if applied {
        format!("Timeout ({})", format_duration(duration))
    } else {
        format!("Timeout ({}) failed", format_duration(duration))
    };

    let inc = incident(msg, guild_id, "spam", "Spam Detection", DecisionMethod::Auto, None);
    let details = [
        (
            "Spam Details",
            format!("{} messages in {}s", matched.len(), state.spam_rule.window_ms / 1000),
        ),
        ("Messages Deleted", deleted.to_string()),
    ];
    executor
        .notify_staff(incident_embed(
            &inc,
            colors::RED,
            &format!("User <@{}> has been timed out for spamming", msg.author.id),
            &action_taken,
            &details,
        ))
        .await;
    executor.record_case(&inc, &action_taken).await;
}
