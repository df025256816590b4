pub mod bots;
pub mod slurs;
pub mod spam;
pub mod suspect;
pub mod violations;

use crate::escalation::{format_duration, Action};
use crate::executor::Incident;
use crate::models::Message;
use crate::state::AppState;
use crate::store::DecisionMethod;
use std::sync::Arc;
use tracing::{debug, error};

/// One message filter. Each runs in its own task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Spam,
    Slurs,
    Violations,
    Suspect,
    Bots,
}

/// Filters that apply to `msg`. Bots, staff, DMs and excepted channels are
/// left alone; the AI-backed filters need a configured classifier.
pub fn enabled_filters(state: &AppState, msg: &Message) -> Vec<Filter> {
    if msg.author.bot || msg.guild_id.is_none() || state.is_staff(msg.member.as_ref()) {
        return Vec::new();
    }

    let settings = &state.settings;
    let toggles = &settings.filters;
    let excepted = |channels: &[String]| channels.iter().any(|c| c == &msg.channel_id);
    let has_ai = state.ai.is_some();

    let mut filters = Vec::new();
    if toggles.spam && !excepted(&settings.spam.exceptions) {
        filters.push(Filter::Spam);
    }
    if toggles.slurs && !excepted(&settings.violation.exceptions) {
        filters.push(Filter::Slurs);
    }
    if toggles.violations && has_ai && !excepted(&settings.violation.exceptions) {
        filters.push(Filter::Violations);
    }
    if toggles.suspect && has_ai {
        filters.push(Filter::Suspect);
    }
    if toggles.bots && has_ai {
        filters.push(Filter::Bots);
    }
    filters
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) {
    let filters = enabled_filters(&state, &msg);
    if filters.is_empty() {
        return;
    }

    let msg = Arc::new(msg);
    for filter in filters {
        let state = Arc::clone(&state);
        let msg = Arc::clone(&msg);
        tokio::spawn(async move {
            if let Err(e) = run(filter, &state, &msg).await {
                error!("{:?} filter failed on message {}: {:?}", filter, msg.id, e);
            }
        });
    }
}

pub async fn run(filter: Filter, state: &AppState, msg: &Message) -> anyhow::Result<()> {
    let guild_id = msg
        .guild_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("message {} has no guild", msg.id))?;

    match filter {
        Filter::Spam => spam::check(state, msg, guild_id).await,
        Filter::Slurs => slurs::check(state, msg, guild_id).await,
        Filter::Violations => violations::check(state, msg, guild_id).await,
        Filter::Suspect => suspect::check(state, msg, guild_id).await,
        Filter::Bots => bots::check(state, msg, guild_id).await,
    }
    Ok(())
}

pub(crate) fn incident(
    msg: &Message,
    guild_id: &str,
    kind: &'static str,
    title: &str,
    method: DecisionMethod,
    ai_reason: Option<String>,
) -> Incident {
    Incident {
        kind,
        title: title.to_string(),
        method,
        ai_reason,
        guild_id: guild_id.to_string(),
        user_id: msg.author.id.clone(),
        username: msg.author.tag(),
        channel_id: msg.channel_id.clone(),
        message_id: msg.id.clone(),
        content: msg.content.clone(),
    }
}

/// In-channel notice for the offender. `offense` reads like "racial slurs are
/// not allowed here".
pub(crate) fn warning_text(action: &Action, user_id: &str, offense: &str) -> String {
    match action {
        Action::Warn { count, limit } => format!("<@{}>, {}. Warning {}/{}", user_id, offense, count, limit),
        Action::Timeout { duration, .. } => format!(
            "<@{}>, {}. You have been timed out for {}.",
            user_id,
            offense,
            format_duration(*duration)
        ),
        Action::Kick { .. } | Action::StaffReview { .. } => {
            debug!("No channel warning for {:?}", action);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, message, FakeDiscord};
    use std::time::Duration;

    #[tokio::test]
    async fn every_filter_runs_for_a_regular_member() {
        let fake = Arc::new(FakeDiscord::default());
        let (state, _dir) = testing::app_state(testing::settings(), &fake, Some("SAFE")).await;

        let filters = enabled_filters(&state, &message("1", "u", "hello", &[]));
        assert_eq!(filters, vec![Filter::Spam, Filter::Slurs, Filter::Violations, Filter::Suspect, Filter::Bots]);
    }

    #[tokio::test]
    async fn staff_and_bots_are_skipped() {
        let fake = Arc::new(FakeDiscord::default());
        let (state, _dir) = testing::app_state(testing::settings(), &fake, Some("SAFE")).await;

        assert!(enabled_filters(&state, &message("1", "u", "hello", &["staff-role"])).is_empty());

        let mut bot = message("2", "u", "hello", &[]);
        bot.author.bot = true;
        assert!(enabled_filters(&state, &bot).is_empty());

        let mut dm = message("3", "u", "hello", &[]);
        dm.guild_id = None;
        assert!(enabled_filters(&state, &dm).is_empty());
    }

    #[tokio::test]
    async fn exception_channels_and_missing_ai_narrow_the_set() {
        let fake = Arc::new(FakeDiscord::default());
        let mut settings = testing::settings();
        settings.spam.exceptions = vec!["c".into()];
        let (state, _dir) = testing::app_state(settings, &fake, None).await;

        let filters = enabled_filters(&state, &message("1", "u", "hello", &[]));
        assert_eq!(filters, vec![Filter::Slurs]);
    }

    #[tokio::test]
    async fn handle_message_ignores_staff() {
        let fake = Arc::new(FakeDiscord::default());
        let (state, _dir) = testing::app_state(testing::settings(), &fake, Some("HEAVY_VIOLATION")).await;

        handle_message(message("1", "u", "badword", &["staff-role"]), Arc::clone(&state)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn warnings_name_the_count() {
        let text = warning_text(&Action::Warn { count: 1, limit: 3 }, "42", "racial slurs are not allowed here");
        assert_eq!(text, "<@42>, racial slurs are not allowed here. Warning 1/3");
        assert!(warning_text(&Action::StaffReview { total: 9 }, "42", "x").is_empty());
    }
}
