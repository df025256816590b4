use super::{incident, warning_text};
use crate::classifier::Verdict;
use crate::models::Message;
use crate::state::AppState;
use crate::store::{DecisionMethod, RuleSet};
use tracing::info;

const OFFENSE: &str = "racial slurs are not allowed here";

pub async fn check(state: &AppState, msg: &Message, guild_id: &str) {
    if state.slurs.classify(&msg.content) != Verdict::Slur {
        return;
    }
    info!("Slur from {} in {}, deleting message {}", msg.author.tag(), msg.channel_id, msg.id);

    let executor = &state.executor;
    executor.delete_message(&msg.channel_id, &msg.id).await;

    let action = state.policies.slur.escalate(&state.violations, &msg.author.id, RuleSet::Slur).await;
    let inc = incident(msg, guild_id, "slur", "Racial Slur Violation", DecisionMethod::Auto, None);
    let taken = executor.apply(&action, &inc, &warning_text(&action, &msg.author.id, OFFENSE)).await;
    executor.record_case(&inc, &taken).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, message, Call, FakeDiscord};
    use std::sync::Arc;

    #[tokio::test]
    async fn leetspeak_slur_is_deleted_and_warned() {
        let fake = Arc::new(FakeDiscord::default());
        let (state, _dir) = testing::app_state(testing::settings(), &fake, None).await;

        check(&state, &message("7", "u", "B 4 D w 0 r d !!", &[]), "g").await;

        let calls = fake.calls();
        assert_eq!(calls[0], Call::Delete { channel_id: "c".into(), message_id: "7".into() });
        assert!(calls.iter().any(|c| matches!(c, Call::Send { content, .. } if content.ends_with("Warning 1/3"))));
        assert!(!fake.punished());

        let cases = state.cases.for_user("u").await;
        assert_eq!(cases[0].1.action_taken, "Warning 1/3");
    }

    #[tokio::test]
    async fn third_slur_times_out() {
        let fake = Arc::new(FakeDiscord::default());
        let (state, _dir) = testing::app_state(testing::settings(), &fake, None).await;

        for i in 0..3 {
            check(&state, &message(&i.to_string(), "u", "badword", &[]), "g").await;
        }
        assert!(fake.calls().iter().any(|c| matches!(c, Call::Timeout { user_id, .. } if user_id == "u")));
        assert_eq!(fake.embeds().len(), 1);
        assert_eq!(state.cases.len().await, 3);
    }

    #[tokio::test]
    async fn timeout_uses_configured_duration() {
        let fake = Arc::new(FakeDiscord::default());
        let settings = crate::config::Settings::from_json(r#"{
            "staffRoleId": "staff-role",
            "staffChannelId": "staff",
            "timeoutDuration": 300000,
            "violation": { "racialSlurs": ["badword"] }
        }"#)
        .unwrap();
        let (state, _dir) = testing::app_state(settings, &fake, None).await;

        for i in 0..3 {
            check(&state, &message(&i.to_string(), "u", "badword", &[]), "g").await;
        }

        let cases = state.cases.for_user("u").await;
        assert_eq!(cases[2].1.action_taken, "Timeout (5m)");
    }

    #[tokio::test]
    async fn ban_threshold_only_alerts_staff() {
        let fake = Arc::new(FakeDiscord::default());
        let mut settings = testing::settings();
        settings.escalation.slur.ban_threshold = 2;
        let (state, _dir) = testing::app_state(settings, &fake, None).await;

        check(&state, &message("1", "u", "badword", &[]), "g").await;
        check(&state, &message("2", "u", "badword", &[]), "g").await;
        check(&state, &message("3", "u", "badword", &[]), "g").await;

        assert!(!fake.punished());
        let reviews = fake
            .embeds()
            .iter()
            .filter(|e| e["description"].as_str().unwrap_or_default().contains("ban is recommended"))
            .count();
        assert_eq!(reviews, 2);
    }

    #[tokio::test]
    async fn clean_message_does_nothing() {
        let fake = Arc::new(FakeDiscord::default());
        let (state, _dir) = testing::app_state(testing::settings(), &fake, None).await;

        check(&state, &message("1", "u", "what a good word", &[]), "g").await;
        assert!(fake.calls().is_empty());
    }
}
