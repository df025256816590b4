use crate::classifier::{AiClassifier, SlurFilter, SpamRule};
use crate::config::Settings;
use crate::escalation::EscalationPolicy;
use crate::executor::ActionExecutor;
use crate::rest::DiscordApi;
use crate::store::{CaseLog, HistoryWindow, MessageHistory, SpamTracker, ViolationStore};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub struct Policies {
    pub slur: EscalationPolicy,
    pub violation: EscalationPolicy,
    pub bot: EscalationPolicy,
}

/// Everything a handler needs, shared behind one `Arc`.
pub struct AppState {
    pub settings: Settings,
    pub api: Arc<dyn DiscordApi>,
    pub cases: Arc<CaseLog>,
    pub violations: ViolationStore,
    pub history: MessageHistory,
    pub spam: SpamTracker,
    pub spam_rule: SpamRule,
    pub slurs: SlurFilter,
    /// `None` when no AI key is configured; the AI-backed filters then stay off.
    pub ai: Option<AiClassifier>,
    pub policies: Policies,
    pub executor: ActionExecutor,
}

impl AppState {
    pub async fn build(
        settings: Settings,
        api: Arc<dyn DiscordApi>,
        ai: Option<AiClassifier>,
        data_dir: &Path,
    ) -> anyhow::Result<Self> {
        let slurs = SlurFilter::new(&settings.violation.racial_slurs)?;

        let cases = Arc::new(CaseLog::open(data_dir.join("cases.json")).await);
        let violations = ViolationStore::open(data_dir.join("violations.json")).await;
        let history = MessageHistory::open(
            data_dir.join("messageHistory.json"),
            HistoryWindow::by_count(settings.bot_detection.history_size),
        )
        .await;

        let spam_window_ms = settings.spam.time_window as i64;
        let spam = SpamTracker::new(HistoryWindow::by_age(
            settings.spam.threshold.saturating_mul(2),
            spam_window_ms,
        ));
        let spam_rule = SpamRule {
            threshold: settings.spam.threshold,
            window_ms: spam_window_ms,
            similarity: settings.spam.similarity_threshold,
        };

        let policies = Policies {
            slur: EscalationPolicy::from_config(&settings.escalation.slur),
            violation: EscalationPolicy::from_config(&settings.escalation.violation),
            bot: EscalationPolicy::from_config(&settings.escalation.bot),
        };

        let executor = ActionExecutor::new(
            Arc::clone(&api),
            Arc::clone(&cases),
            &settings.staff_channel_id,
            settings.warning_lifetime(),
        );

        info!("Opened moderation data in {}", data_dir.display());

        Ok(Self { settings, api, cases, violations, history, spam, spam_rule, slurs, ai, policies, executor })
    }

    pub fn is_staff(&self, member: Option<&crate::models::Member>) -> bool {
        member.map(|m| m.has_role(&self.settings.staff_role_id)).unwrap_or(false)
    }
}
