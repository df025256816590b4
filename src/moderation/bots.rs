use super::{incident, warning_text};
use crate::classifier::Verdict;
use crate::models::Message;
use crate::state::AppState;
use crate::store::{now_millis, DecisionMethod, HistoryEntry, RuleSet};
use tracing::{debug, warn};

const OFFENSE: &str = "automated posting is not allowed here";

/// Once the sender's rolling history is full, asks the classifier whether it
/// reads like an automated account.
pub async fn check(state: &AppState, msg: &Message, guild_id: &str) {
    let Some(ai) = state.ai.as_ref() else { return };

    let entry = HistoryEntry::new(now_millis(), msg.content.clone()).with_message(&msg.channel_id, &msg.id);
    let window = state.history.push(&msg.author.id, entry).await;
    if window.len() < state.history.capacity() {
        return;
    }

    let contents: Vec<String> = window.into_iter().map(|e| e.content).collect();
    if ai.classify_history(&contents).await != Verdict::Spam {
        debug!("Recent messages from {} look human", msg.author.tag());
        return;
    }

    warn!("Bot-like behaviour from {}: {}", msg.author.tag(), contents.join(" | "));
    state.history.clear(&msg.author.id).await;

    let action = state.policies.bot.escalate(&state.violations, &msg.author.id, RuleSet::Bot).await;
    let inc = incident(
        msg,
        guild_id,
        "bot",
        "Bot/Spam Behaviour Detected",
        DecisionMethod::Ai,
        Some(format!("BOT_SPAM: {}", contents.join(" | "))),
    );
    let taken = state
        .executor
        .apply(&action, &inc, &warning_text(&action, &msg.author.id, OFFENSE))
        .await;
    state.executor.record_case(&inc, &taken).await;
}
