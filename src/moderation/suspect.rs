use super::incident;
use crate::classifier::Verdict;
use crate::constants::{colors, emojis};
use crate::executor::incident_embed;
use crate::models::Message;
use crate::state::AppState;
use crate::store::DecisionMethod;
use serde_json::json;
use tracing::info;

/// Flags questionable messages to staff. Never deletes or punishes.
pub async fn check(state: &AppState, msg: &Message, guild_id: &str) {
    let Some(ai) = state.ai.as_ref() else { return };
    if msg.content.trim().is_empty() {
        return;
    }

    let reason = match ai.classify_suspect(&msg.content).await {
        Verdict::Violation { reason, .. } => reason.unwrap_or_else(|| "unspecified".to_string()),
        _ => return,
    };
    info!("Suspicious message {} from {}: {}", msg.id, msg.author.tag(), reason);

    let inc = incident(msg, guild_id, "violation", "Suspicious Message Detected", DecisionMethod::Ai, Some(reason));
    let mut embed = incident_embed(
        &inc,
        colors::ORANGE,
        &format!("Message from <@{}> may break the rules", msg.author.id),
        "None (staff alert)",
        &[],
    );
    embed["title"] = json!(format!("{} {}", emojis::SIREN, inc.title));
    state.executor.notify_staff(embed).await;
}
