use super::{incident, warning_text};
use crate::classifier::{Severity, Verdict};
use crate::models::Message;
use crate::state::AppState;
use crate::store::{DecisionMethod, RuleSet};
use tracing::{debug, info, warn};

const OFFENSE: &str = "that message broke the server rules";

/// AI rule check. Harmful messages are deleted; heavy ones also escalate.
pub async fn check(state: &AppState, msg: &Message, guild_id: &str) {
    let Some(ai) = state.ai.as_ref() else { return };
    if msg.content.trim().is_empty() {
        return;
    }

    let context = reply_context(state, msg).await;
    let (severity, reason) = match ai.classify_message(&msg.content, context.as_deref()).await {
        Verdict::Violation { severity, reason } => (severity, reason),
        _ => {
            debug!("Message {} from {} is safe", msg.id, msg.author.tag());
            return;
        }
    };

    info!(
        "{} violation from {} in {}, deleting message {}",
        severity.label(),
        msg.author.tag(),
        msg.channel_id,
        msg.id
    );
    let executor = &state.executor;
    let deleted = executor.delete_message(&msg.channel_id, &msg.id).await;

    let ai_reason = reason.unwrap_or_else(|| format!("{} violation", severity.label()));
    let inc = incident(msg, guild_id, "violation", "Rule Violation", DecisionMethod::Ai, Some(ai_reason));

    let taken = match severity {
        Severity::Harmful => {
            if deleted { "Message deleted".to_string() } else { "Message deletion failed".to_string() }
        }
        Severity::Heavy => {
            let action = state
                .policies
                .violation
                .escalate(&state.violations, &msg.author.id, RuleSet::Violation)
                .await;
            executor.apply(&action, &inc, &warning_text(&action, &msg.author.id, OFFENSE)).await
        }
    };
    executor.record_case(&inc, &taken).await;
}

/// Content of the message being replied to, if any.
async fn reply_context(state: &AppState, msg: &Message) -> Option<String> {
    if let Some(parent) = &msg.referenced_message {
        return Some(parent.content.clone());
    }

    let reference = msg.message_reference.as_ref()?;
    let message_id = reference.message_id.as_deref()?;
    let channel_id = reference.channel_id.as_deref().unwrap_or(&msg.channel_id);
    match state.api.get_message_content(channel_id, message_id).await {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("Could not fetch replied-to message {}: {:?}", message_id, e);
            None
        }
    }
}
